// Public API - what other modules can use
pub use models::{FixtureModel, FixtureStatus, MatchOutcome};
pub use repository::{FixtureRepository, InMemoryFixtureRepository, PostgresFixtureRepository};

pub mod models;
pub mod repository;
