use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::{RoundModel, RoundStatus};
use super::repository::{RoundRepository, StatusUpdateResult};
use crate::event::{EventBus, PipelineEvent};
use crate::fixture::FixtureRepository;
use crate::shared::AppError;

/// Outcome of one detection sweep over the open rounds
#[derive(Debug, Default)]
pub struct DetectionOutcome {
    /// Rounds that moved from open to scoring in this sweep
    pub completed_round_ids: Vec<i64>,
    /// Per-round failures; siblings keep processing
    pub errors: Vec<String>,
}

/// Scans open rounds and moves the ones whose fixtures have all finished
/// into scoring.
pub struct RoundCompletionDetector {
    rounds: Arc<dyn RoundRepository + Send + Sync>,
    fixtures: Arc<dyn FixtureRepository + Send + Sync>,
    event_bus: Arc<EventBus>,
}

impl RoundCompletionDetector {
    pub fn new(
        rounds: Arc<dyn RoundRepository + Send + Sync>,
        fixtures: Arc<dyn FixtureRepository + Send + Sync>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            rounds,
            fixtures,
            event_bus,
        }
    }

    /// Runs one detection sweep.
    ///
    /// A failure to fetch the open rounds aborts the whole run; anything
    /// that goes wrong while evaluating a single round is collected into
    /// the outcome and does not stop the remaining rounds.
    #[instrument(skip(self))]
    pub async fn detect_and_mark_completed_rounds(&self) -> Result<DetectionOutcome, AppError> {
        let open_rounds = self.rounds.get_rounds_by_status(RoundStatus::Open).await?;

        if open_rounds.is_empty() {
            debug!("No open rounds to evaluate");
            return Ok(DetectionOutcome::default());
        }

        info!(open_rounds = open_rounds.len(), "Evaluating open rounds for completion");

        let mut outcome = DetectionOutcome::default();

        for round in open_rounds {
            match self.evaluate_round(&round).await {
                Ok(true) => outcome.completed_round_ids.push(round.id),
                Ok(false) => {}
                Err(e) => {
                    warn!(round_id = round.id, error = %e, "Failed to evaluate round");
                    outcome.errors.push(format!("round {}: {}", round.id, e));
                }
            }
        }

        info!(
            completed = outcome.completed_round_ids.len(),
            errors = outcome.errors.len(),
            "Round completion sweep finished"
        );
        Ok(outcome)
    }

    /// Evaluates one open round; returns true when it was marked scoring.
    async fn evaluate_round(&self, round: &RoundModel) -> Result<bool, AppError> {
        let fixture_ids = self.rounds.get_linked_fixture_ids(round.id).await?;

        if fixture_ids.is_empty() {
            // A round without fixtures is ambiguous, never auto-completed
            warn!(round_id = round.id, "Round has no linked fixtures, skipping");
            return Ok(false);
        }

        let fixtures = self.fixtures.get_fixtures_by_ids(&fixture_ids).await?;

        if fixtures.len() != fixture_ids.len() {
            // Data-consistency guard: some linked fixtures are missing
            warn!(
                round_id = round.id,
                linked = fixture_ids.len(),
                fetched = fixtures.len(),
                "Linked fixture count mismatch, treating round as incomplete"
            );
            return Ok(false);
        }

        let all_finished = fixtures.iter().all(|f| f.status.is_finished());
        if !all_finished {
            let unfinished = fixtures.iter().filter(|f| !f.status.is_finished()).count();
            debug!(round_id = round.id, unfinished, "Round still has unfinished fixtures");
            return Ok(false);
        }

        match self
            .rounds
            .update_status(round.id, RoundStatus::Open, RoundStatus::Scoring)
            .await?
        {
            StatusUpdateResult::Updated => {
                info!(round_id = round.id, name = %round.name, "Round completed, moved to scoring");
                self.event_bus.emit(PipelineEvent::RoundCompleted {
                    round_id: round.id,
                    round_name: round.name.clone(),
                });
                Ok(true)
            }
            StatusUpdateResult::NotInExpectedStatus => {
                // Another run already advanced it; nothing left to do here
                debug!(round_id = round.id, "Round already advanced past open");
                Ok(false)
            }
            StatusUpdateResult::RoundNotFound => Err(AppError::NotFound(format!(
                "round {} disappeared during detection",
                round.id
            ))),
        }
    }
}
