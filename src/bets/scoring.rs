use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::BetModel;
use crate::fixture::FixtureModel;

/// Point values for the match bet calculator.
///
/// The scheme is a policy object rather than hardcoded constants: the
/// league can run plain 1X2 scoring (the default) or reward exact score
/// predictions by raising the bonus above zero. Values come from
/// configuration; scoring stays deterministic for a given policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Points for predicting the right 1X2 outcome
    pub correct_outcome_points: i32,
    /// Extra points when the exact score was predicted; 0 disables the bonus
    pub exact_score_bonus: i32,
    /// Points for a wrong prediction
    pub incorrect_points: i32,
    /// Points for a correct season questionnaire answer
    pub questionnaire_correct_points: i32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            correct_outcome_points: 1,
            exact_score_bonus: 0,
            incorrect_points: 0,
            questionnaire_correct_points: 1,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    /// The fixture has no final result; scoring must be refused, never
    /// silently defaulted to zero points
    #[error("fixture {0} has no final result yet")]
    FixtureNotScorable(i64),
}

/// Computes the points a bet earns against a fixture's final result.
///
/// Refuses unfinished fixtures (or finished ones with missing goal data)
/// with a precondition error.
pub fn score_bet(
    policy: &ScoringPolicy,
    fixture: &FixtureModel,
    bet: &BetModel,
) -> Result<i32, ScoringError> {
    let result = fixture
        .result()
        .ok_or(ScoringError::FixtureNotScorable(fixture.id))?;

    if bet.predicted != result {
        return Ok(policy.incorrect_points);
    }

    let mut points = policy.correct_outcome_points;

    // An exact score prediction implies a correct outcome, so the bonus
    // stacks on top of the outcome points.
    let exact = bet.predicted_home == fixture.home_goals && bet.predicted_away == fixture.away_goals;
    if exact && bet.predicted_home.is_some() {
        points += policy.exact_score_bonus;
    }

    Ok(points)
}
