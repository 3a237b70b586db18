use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::BetModel;
use super::repository::BetRepository;
use super::scoring::{score_bet, ScoringPolicy};
use crate::event::{EventBus, PipelineEvent};
use crate::fixture::{FixtureModel, FixtureRepository};
use crate::round::{RoundModel, RoundRepository, RoundStatus, StatusUpdateResult};
use crate::shared::AppError;

/// Outcome of one scoring sweep over rounds awaiting points.
#[derive(Debug, Default)]
pub struct RoundScoringOutcome {
    /// Rounds that finished scoring and moved to scored
    pub scored_round_ids: Vec<i64>,
    /// Number of bets that received points this sweep
    pub bets_scored: usize,
    /// Per-round and per-bet failures; the affected rounds stay in
    /// scoring and are retried on the next sweep
    pub errors: Vec<String>,
}

/// Outcome of a retroactive correction of a single round.
#[derive(Debug, Default)]
pub struct RescoreOutcome {
    pub bets_rescored: usize,
    pub errors: Vec<String>,
}

/// Awards points to bets on completed rounds.
///
/// Works through rounds in scoring status: every unscored bet on the round
/// is scored against its fixture's full-time result, and the round moves to
/// scored only when no bet on it failed. A round with failures keeps its
/// scoring status so the next sweep picks it up again; the set-once point
/// writes make that retry safe.
pub struct BetScoringService {
    rounds: Arc<dyn RoundRepository + Send + Sync>,
    fixtures: Arc<dyn FixtureRepository + Send + Sync>,
    bets: Arc<dyn BetRepository + Send + Sync>,
    policy: ScoringPolicy,
    event_bus: Arc<EventBus>,
}

impl BetScoringService {
    pub fn new(
        rounds: Arc<dyn RoundRepository + Send + Sync>,
        fixtures: Arc<dyn FixtureRepository + Send + Sync>,
        bets: Arc<dyn BetRepository + Send + Sync>,
        policy: ScoringPolicy,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            rounds,
            fixtures,
            bets,
            policy,
            event_bus,
        }
    }

    /// Scores every round currently awaiting points.
    ///
    /// A failure to list the rounds is systemic and aborts the sweep; a
    /// failure inside one round is recorded and the sweep moves on.
    #[instrument(skip(self))]
    pub async fn score_pending_rounds(&self) -> Result<RoundScoringOutcome, AppError> {
        let pending = self.rounds.get_rounds_by_status(RoundStatus::Scoring).await?;
        info!(count = pending.len(), "Scoring sweep over pending rounds");

        let mut outcome = RoundScoringOutcome::default();

        for round in pending {
            match self.score_round(&round).await {
                Ok((newly_scored, round_errors)) => {
                    outcome.bets_scored += newly_scored;
                    if round_errors.is_empty() {
                        self.finish_round(&round, newly_scored, &mut outcome).await;
                    } else {
                        warn!(
                            round_id = round.id,
                            failures = round_errors.len(),
                            "Round kept in scoring for retry"
                        );
                        outcome.errors.extend(round_errors);
                    }
                }
                Err(e) => {
                    warn!(round_id = round.id, error = %e, "Failed to score round");
                    outcome
                        .errors
                        .push(format!("round {}: {}", round.id, e));
                }
            }
        }

        info!(
            rounds_scored = outcome.scored_round_ids.len(),
            bets_scored = outcome.bets_scored,
            errors = outcome.errors.len(),
            "Scoring sweep finished"
        );
        Ok(outcome)
    }

    /// Recomputes points for every bet on an already-scored round.
    ///
    /// This is the one path that overwrites existing points, used after a
    /// result correction upstream. The round must already be scored.
    #[instrument(skip(self))]
    pub async fn rescore_round(&self, round_id: i64) -> Result<RescoreOutcome, AppError> {
        let round = self
            .rounds
            .get_round(round_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Round {} not found", round_id)))?;

        if round.status != RoundStatus::Scored {
            return Err(AppError::Validation(format!(
                "Round {} is {}, only scored rounds can be rescored",
                round_id, round.status
            )));
        }

        let bets = self.bets.get_bets_for_round(round_id).await?;
        let fixtures = self.fetch_fixtures_for(&bets).await?;

        let mut outcome = RescoreOutcome::default();
        for bet in &bets {
            match self.compute_points(bet, &fixtures) {
                Ok(points) => {
                    match self
                        .bets
                        .overwrite_points(bet.user_id, bet.fixture_id, points)
                        .await
                    {
                        Ok(true) => outcome.bets_rescored += 1,
                        Ok(false) => outcome.errors.push(format!(
                            "bet by {} on fixture {}: gone during rescore",
                            bet.user_id, bet.fixture_id
                        )),
                        Err(e) => outcome.errors.push(format!(
                            "bet by {} on fixture {}: {}",
                            bet.user_id, bet.fixture_id, e
                        )),
                    }
                }
                Err(message) => outcome.errors.push(message),
            }
        }

        info!(
            round_id,
            bets_rescored = outcome.bets_rescored,
            errors = outcome.errors.len(),
            "Round rescored"
        );
        Ok(outcome)
    }

    /// Scores the bets of a single round. Returns the number of bets that
    /// newly received points plus any per-bet failures.
    async fn score_round(&self, round: &RoundModel) -> Result<(usize, Vec<String>), AppError> {
        let bets = self.bets.get_bets_for_round(round.id).await?;
        if bets.is_empty() {
            debug!(round_id = round.id, "Round has no bets, nothing to score");
            return Ok((0, Vec::new()));
        }

        let fixtures = self.fetch_fixtures_for(&bets).await?;

        let mut newly_scored = 0;
        let mut errors = Vec::new();

        for bet in &bets {
            if bet.points.is_scored() {
                // Left over from an earlier partially-failed sweep
                continue;
            }

            match self.compute_points(bet, &fixtures) {
                Ok(points) => {
                    match self
                        .bets
                        .record_points(bet.user_id, bet.fixture_id, points)
                        .await
                    {
                        Ok(true) => newly_scored += 1,
                        Ok(false) => {
                            debug!(
                                user_id = %bet.user_id,
                                fixture_id = bet.fixture_id,
                                "Bet already scored by a concurrent sweep"
                            );
                        }
                        Err(e) => errors.push(format!(
                            "bet by {} on fixture {}: {}",
                            bet.user_id, bet.fixture_id, e
                        )),
                    }
                }
                Err(message) => errors.push(message),
            }
        }

        Ok((newly_scored, errors))
    }

    /// Moves a fully scored round to scored status and announces it.
    async fn finish_round(
        &self,
        round: &RoundModel,
        bets_scored: usize,
        outcome: &mut RoundScoringOutcome,
    ) {
        match self
            .rounds
            .update_status(round.id, RoundStatus::Scoring, RoundStatus::Scored)
            .await
        {
            Ok(StatusUpdateResult::Updated) => {
                info!(round_id = round.id, round_name = %round.name, bets_scored, "Round scored");
                outcome.scored_round_ids.push(round.id);
                self.event_bus.emit(PipelineEvent::RoundScored {
                    round_id: round.id,
                    round_name: round.name.clone(),
                    bets_scored,
                });
            }
            Ok(StatusUpdateResult::NotInExpectedStatus) => {
                debug!(round_id = round.id, "Round already moved on, skipping");
            }
            Ok(StatusUpdateResult::RoundNotFound) => {
                outcome
                    .errors
                    .push(format!("round {}: vanished while scoring", round.id));
            }
            Err(e) => {
                outcome
                    .errors
                    .push(format!("round {}: {}", round.id, e));
            }
        }
    }

    async fn fetch_fixtures_for(
        &self,
        bets: &[BetModel],
    ) -> Result<HashMap<i64, FixtureModel>, AppError> {
        let fixture_ids: Vec<i64> = bets
            .iter()
            .map(|b| b.fixture_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let fixtures = self.fixtures.get_fixtures_by_ids(&fixture_ids).await?;
        Ok(fixtures.into_iter().map(|f| (f.id, f)).collect())
    }

    fn compute_points(
        &self,
        bet: &BetModel,
        fixtures: &HashMap<i64, FixtureModel>,
    ) -> Result<i32, String> {
        let fixture = fixtures.get(&bet.fixture_id).ok_or_else(|| {
            format!(
                "bet by {} on fixture {}: fixture not found",
                bet.user_id, bet.fixture_id
            )
        })?;

        score_bet(&self.policy, fixture, bet).map_err(|e| {
            format!("bet by {} on fixture {}: {}", bet.user_id, bet.fixture_id, e)
        })
    }
}
