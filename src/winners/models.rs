use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::user::UserModel;

/// The competitions a season crowns winners for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
pub enum CompetitionType {
    /// Season-long table: all match bets plus questionnaire points
    #[strum(serialize = "league")]
    League,
    /// Cup prize over the rounds flagged as cup rounds, bets only
    #[strum(serialize = "last_round_special")]
    LastRoundSpecial,
}

/// Database model for the season_winners table (the hall of fame).
///
/// One row per winning user; ties at the top produce several rows for the
/// same (season, competition). The unique constraint over (season_id,
/// competition_type, user_id) is what makes determination idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonWinnerModel {
    pub season_id: i64,
    pub competition_type: CompetitionType,
    pub user_id: Uuid,
    /// The winning combined total, kept for display
    pub final_points: i64,
}

/// Outcome of processing one (season, competition) pair.
#[derive(Debug, Clone)]
pub struct WinnerDeterminationResult {
    pub season_id: i64,
    pub competition_type: CompetitionType,
    /// True when winners were already recorded and nothing was written
    pub is_season_already_determined: bool,
    pub winners: Vec<UserModel>,
    pub errors: Vec<String>,
}

impl WinnerDeterminationResult {
    pub fn new(season_id: i64, competition_type: CompetitionType) -> Self {
        Self {
            season_id,
            competition_type,
            is_season_already_determined: false,
            winners: Vec::new(),
            errors: Vec::new(),
        }
    }
}
