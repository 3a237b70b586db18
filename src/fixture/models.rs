use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Lifecycle status of a fixture, as synchronized from the football data
/// provider. Stored as the provider's short code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum FixtureStatus {
    /// Kickoff has not happened yet
    #[strum(serialize = "NS")]
    NotStarted,
    /// Match is currently being played
    #[strum(serialize = "LIVE")]
    InPlay,
    /// Finished after regular time
    #[strum(serialize = "FT")]
    Finished,
    /// Finished after extra time
    #[strum(serialize = "AET")]
    FinishedAfterExtraTime,
    /// Finished after a penalty shootout
    #[strum(serialize = "PEN")]
    FinishedAfterPenalties,
    /// Postponed by the governing body
    #[strum(serialize = "PST")]
    Postponed,
    /// Cancelled and will not be played
    #[strum(serialize = "CANC")]
    Cancelled,
}

impl FixtureStatus {
    /// True for every status in the finished set. Only finished fixtures
    /// carry a final result and count towards round completion.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            FixtureStatus::Finished
                | FixtureStatus::FinishedAfterExtraTime
                | FixtureStatus::FinishedAfterPenalties
        )
    }
}

/// The 1X2 outcome of a finished match, and the shape of a user's
/// match prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum MatchOutcome {
    #[strum(serialize = "HOME")]
    HomeWin,
    #[strum(serialize = "DRAW")]
    Draw,
    #[strum(serialize = "AWAY")]
    AwayWin,
}

/// Database model for the fixtures table.
///
/// Fixtures are created and updated by the external sync job; the core
/// pipeline only ever reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureModel {
    /// Stable ID from the football data provider
    pub id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub kickoff: DateTime<Utc>,
    pub status: FixtureStatus,
    /// Null until the fixture reaches a finished status
    pub home_goals: Option<i32>,
    pub away_goals: Option<i32>,
}

impl FixtureModel {
    /// Derives the final outcome of the fixture.
    ///
    /// Returns None while the fixture is unfinished or while goal data is
    /// missing, so callers can refuse to score instead of defaulting.
    pub fn result(&self) -> Option<MatchOutcome> {
        if !self.status.is_finished() {
            return None;
        }
        match (self.home_goals, self.away_goals) {
            (Some(home), Some(away)) if home > away => Some(MatchOutcome::HomeWin),
            (Some(home), Some(away)) if home < away => Some(MatchOutcome::AwayWin),
            (Some(_), Some(_)) => Some(MatchOutcome::Draw),
            _ => None,
        }
    }
}
