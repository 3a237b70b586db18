use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of a computed standings table.
///
/// Never persisted; standings are recomputed wholesale from the point
/// records on every request so they cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsEntry {
    pub user_id: Uuid,
    /// Sum of scored match-bet points
    pub game_points: i64,
    /// Sum of scored questionnaire points
    pub dynamic_points: i64,
    pub combined_total: i64,
    /// Dense rank: tied totals share a rank and the next distinct total
    /// takes the following rank
    pub rank: u32,
}
