use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fixture::MatchOutcome;

/// Scoring state of a single bet.
///
/// An explicit sum type instead of a bare nullable integer, so "not yet
/// scored" can never be mistaken for "scored zero points". The bets table
/// stores this as a nullable column; `Unscored` maps to NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetPoints {
    Unscored,
    Scored(i32),
}

impl BetPoints {
    /// Converts from the nullable database column
    pub fn from_column(value: Option<i32>) -> Self {
        match value {
            Some(points) => BetPoints::Scored(points),
            None => BetPoints::Unscored,
        }
    }

    /// Converts to the nullable database column
    pub fn to_column(self) -> Option<i32> {
        match self {
            BetPoints::Scored(points) => Some(points),
            BetPoints::Unscored => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, BetPoints::Scored(_))
    }
}

/// Database model for the bets table: one user's prediction for one
/// fixture in one round.
///
/// Points are written exactly once per (user, fixture) pair when the
/// round is scored; the only sanctioned overwrite path afterwards is the
/// explicit retroactive re-score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetModel {
    pub user_id: Uuid,
    pub fixture_id: i64,
    pub round_id: i64,
    /// Predicted 1X2 outcome
    pub predicted: MatchOutcome,
    /// Optional exact-score prediction, used for the bonus scheme
    pub predicted_home: Option<i32>,
    pub predicted_away: Option<i32>,
    pub points: BetPoints,
}
