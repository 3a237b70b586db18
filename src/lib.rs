// Library crate for the matchday prediction league server
// This file exposes the public API for integration tests

pub mod bets;
pub mod config;
pub mod cron;
pub mod event;
pub mod fixture;
pub mod notify;
pub mod questionnaire;
pub mod round;
pub mod season;
pub mod shared;
pub mod standings;
pub mod user;
pub mod winners;

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use cron::{Alerter, CronPipeline, LogAlerter, PipelineOutcome};
pub use event::{EventBus, PipelineEvent};
pub use shared::{AppError, AppState};
