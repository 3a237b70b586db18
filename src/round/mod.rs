// Public API - what other modules can use
pub use detector::{DetectionOutcome, RoundCompletionDetector};
pub use models::{RoundModel, RoundStatus};
pub use repository::{
    InMemoryRoundRepository, PostgresRoundRepository, RoundRepository, StatusUpdateResult,
};

pub mod detector;
pub mod models;
pub mod repository;
