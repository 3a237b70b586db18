use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database model for the seasons table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonModel {
    pub id: i64,
    pub name: String,
    /// Scheduled end of the season; winner determination only considers
    /// seasons whose end has passed
    pub ends_at: DateTime<Utc>,
}
