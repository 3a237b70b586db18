// Public API - what other modules can use
pub use alerter::{Alerter, LogAlerter};
pub use pipeline::{CronPipeline, PipelineOutcome};

pub mod alerter;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
