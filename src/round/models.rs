use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Lifecycle status of a betting round.
///
/// Status only ever advances: Open → Scoring → Scored. Cancelled is a
/// terminal branch out of Open. Every transition site goes through
/// `can_transition_to`, and the repositories additionally guard writes on
/// the expected current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum RoundStatus {
    /// Accepting bets; fixtures not all finished yet
    #[strum(serialize = "open")]
    Open,
    /// All fixtures finished; bets are being scored
    #[strum(serialize = "scoring")]
    Scoring,
    /// All bets scored; round is final
    #[strum(serialize = "scored")]
    Scored,
    /// Round was abandoned and will never be scored
    #[strum(serialize = "cancelled")]
    Cancelled,
}

impl RoundStatus {
    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(&self, next: RoundStatus) -> bool {
        matches!(
            (self, next),
            (RoundStatus::Open, RoundStatus::Scoring)
                | (RoundStatus::Scoring, RoundStatus::Scored)
                | (RoundStatus::Open, RoundStatus::Cancelled)
        )
    }
}

/// Database model for the betting_rounds table.
///
/// Fixture links live in the round_fixtures join table and are read
/// through the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundModel {
    pub id: i64,
    pub season_id: i64,
    pub name: String,
    pub status: RoundStatus,
    /// Part of the "last round special" cup stretch
    pub is_cup_round: bool,
    /// Betting deadline, the earliest kickoff of the linked fixtures
    pub deadline: DateTime<Utc>,
}
