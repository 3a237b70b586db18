// Public API - what other modules can use
pub use models::{BetModel, BetPoints};
pub use repository::{BetRepository, InMemoryBetRepository, PostgresBetRepository};
pub use scoring::{score_bet, ScoringError, ScoringPolicy};
pub use service::{BetScoringService, RescoreOutcome, RoundScoringOutcome};

pub mod models;
pub mod repository;
pub mod scoring;
pub mod service;
