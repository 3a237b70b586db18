use serde::{Deserialize, Serialize};

use crate::user::UserModel;
use crate::winners::CompetitionType;

/// Events emitted by the scoring pipeline after the corresponding state
/// has been committed to the store.
///
/// Events represent facts about things that have already happened. The
/// notification layer consumes them to drive best-effort side effects
/// (emails, alerts) without coupling delivery to core correctness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Every fixture in the round finished; the round moved to scoring
    RoundCompleted { round_id: i64, round_name: String },

    /// All bets in the round were scored; the round is final
    RoundScored {
        round_id: i64,
        round_name: String,
        bets_scored: usize,
    },

    /// Winners were persisted for a season competition
    WinnersDetermined {
        season_id: i64,
        competition: CompetitionType,
        winners: Vec<UserModel>,
        total_points: i64,
    },
}

impl PipelineEvent {
    /// Get a human-readable description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::RoundCompleted { .. } => "round_completed",
            PipelineEvent::RoundScored { .. } => "round_scored",
            PipelineEvent::WinnersDetermined { .. } => "winners_determined",
        }
    }
}
