use async_trait::async_trait;
use tracing::{error, info, warn};

use super::pipeline::PipelineOutcome;

/// Operational alerting boundary for pipeline runs.
///
/// Every run's outcome is reported here, success or not. Delivery is
/// best-effort; an alerter must never fail the pipeline, so the method
/// returns nothing.
#[async_trait]
pub trait Alerter {
    async fn report_pipeline_outcome(&self, outcome: &PipelineOutcome);
}

/// Default alerter that reports through the process log.
pub struct LogAlerter;

#[async_trait]
impl Alerter for LogAlerter {
    async fn report_pipeline_outcome(&self, outcome: &PipelineOutcome) {
        if !outcome.success {
            error!(
                error_count = outcome.error_count,
                duration_ms = outcome.duration_ms,
                errors = ?outcome.detailed_errors,
                "Pipeline run failed"
            );
        } else if outcome.error_count > 0 {
            warn!(
                winners = outcome.total_winners_determined,
                error_count = outcome.error_count,
                duration_ms = outcome.duration_ms,
                errors = ?outcome.detailed_errors,
                "Pipeline run degraded"
            );
        } else {
            info!(
                winners = outcome.total_winners_determined,
                duration_ms = outcome.duration_ms,
                "Pipeline run succeeded"
            );
        }
    }
}
