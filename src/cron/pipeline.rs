use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::bets::BetScoringService;
use crate::questionnaire::QuestionnaireScoringService;
use crate::round::RoundCompletionDetector;
use crate::shared::AppError;
use crate::winners::{WinnerDeterminationResult, WinnerDeterminationService};

/// Summary of one pipeline run, returned as the cron endpoint's body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub success: bool,
    pub total_winners_determined: usize,
    pub error_count: usize,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detailed_errors: Vec<String>,
}

/// The scheduled orchestration run: detect completed rounds, score match
/// bets, score questionnaire answers, determine season winners.
///
/// Stages run strictly in this order so each one sees the previous
/// stage's writes. Every stage is bounded by the configured timeout, and
/// a failed or timed-out stage never prevents the later stages from
/// running; all writes along the way are individually guarded, so a rerun
/// picks up whatever this run left unfinished.
pub struct CronPipeline {
    detector: RoundCompletionDetector,
    bet_scoring: BetScoringService,
    questionnaire_scoring: QuestionnaireScoringService,
    winner_determination: WinnerDeterminationService,
    stage_timeout: Duration,
}

impl CronPipeline {
    pub fn new(
        detector: RoundCompletionDetector,
        bet_scoring: BetScoringService,
        questionnaire_scoring: QuestionnaireScoringService,
        winner_determination: WinnerDeterminationService,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            detector,
            bet_scoring,
            questionnaire_scoring,
            winner_determination,
            stage_timeout,
        }
    }

    /// Runs the full pipeline once and classifies the outcome.
    ///
    /// Zero errors is a success even when nothing was determined. Errors
    /// alongside determined winners count as a degraded but successful
    /// run; errors with zero winners fail the run.
    #[instrument(skip(self))]
    pub async fn run(&self) -> PipelineOutcome {
        let started = Instant::now();
        let mut errors: Vec<String> = Vec::new();
        let mut total_winners = 0usize;

        if let Some(outcome) = self
            .bounded(
                "round detection",
                &mut errors,
                self.detector.detect_and_mark_completed_rounds(),
            )
            .await
        {
            info!(
                completed = outcome.completed_round_ids.len(),
                "Detection stage finished"
            );
            errors.extend(
                outcome
                    .errors
                    .into_iter()
                    .map(|e| format!("round detection: {}", e)),
            );
        }

        if let Some(outcome) = self
            .bounded(
                "bet scoring",
                &mut errors,
                self.bet_scoring.score_pending_rounds(),
            )
            .await
        {
            info!(
                rounds = outcome.scored_round_ids.len(),
                bets = outcome.bets_scored,
                "Bet scoring stage finished"
            );
            errors.extend(
                outcome
                    .errors
                    .into_iter()
                    .map(|e| format!("bet scoring: {}", e)),
            );
        }

        if let Some(outcome) = self
            .bounded(
                "questionnaire scoring",
                &mut errors,
                self.questionnaire_scoring.score_pending_answers(),
            )
            .await
        {
            info!(
                answers = outcome.answers_scored,
                "Questionnaire scoring stage finished"
            );
            errors.extend(
                outcome
                    .errors
                    .into_iter()
                    .map(|e| format!("questionnaire scoring: {}", e)),
            );
        }

        if let Some(results) = self
            .bounded(
                "winner determination",
                &mut errors,
                self.winner_determination
                    .determine_winners_for_completed_seasons(),
            )
            .await
        {
            for result in results {
                let WinnerDeterminationResult {
                    season_id,
                    competition_type,
                    is_season_already_determined,
                    winners,
                    errors: season_errors,
                } = result;

                if !is_season_already_determined {
                    total_winners += winners.len();
                }
                errors.extend(season_errors.into_iter().map(|e| {
                    format!(
                        "winner determination season {} {}: {}",
                        season_id, competition_type, e
                    )
                }));
            }
        }

        let error_count = errors.len();
        let success = error_count == 0 || total_winners > 0;

        let outcome = PipelineOutcome {
            success,
            total_winners_determined: total_winners,
            error_count,
            duration_ms: started.elapsed().as_millis() as u64,
            detailed_errors: errors,
        };

        info!(
            success = outcome.success,
            winners = outcome.total_winners_determined,
            errors = outcome.error_count,
            duration_ms = outcome.duration_ms,
            "Pipeline run finished"
        );

        outcome
    }

    /// Runs one stage under the timeout guard. A failure or timeout is
    /// recorded and the pipeline moves to the next stage.
    async fn bounded<T>(
        &self,
        stage: &str,
        errors: &mut Vec<String>,
        work: impl Future<Output = Result<T, AppError>>,
    ) -> Option<T> {
        match timeout(self.stage_timeout, work).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(stage, error = %e, "Pipeline stage failed");
                errors.push(format!("{}: {}", stage, e));
                None
            }
            Err(_) => {
                warn!(stage, timeout = ?self.stage_timeout, "Pipeline stage timed out");
                errors.push(format!("{}: timed out after {:?}", stage, self.stage_timeout));
                None
            }
        }
    }
}
