use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::bets::BetPoints;

/// The season-long questions users answer before the first deadline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
pub enum QuestionType {
    #[strum(serialize = "league_winner")]
    LeagueWinner,
    #[strum(serialize = "top_scorer")]
    TopScorer,
    #[strum(serialize = "best_goal_difference")]
    BestGoalDifference,
    #[strum(serialize = "last_place")]
    LastPlace,
}

/// Database model for the season_questions table.
///
/// `valid_answers` is recorded by an admin once the real-world outcome is
/// known. It usually holds an array of IDs; a single bare ID survives from
/// the legacy format. Ties are represented by multiple IDs in the array.
/// Null means the outcome has not been recorded yet and the question is
/// not scorable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonQuestionModel {
    pub season_id: i64,
    pub question_type: QuestionType,
    pub valid_answers: Value,
}

/// Database model for the season_answers table.
///
/// `answer` carries the user's predicted ID(s) in the same loose JSON
/// shape as `valid_answers`; normalization happens at scoring time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonAnswerModel {
    pub user_id: Uuid,
    pub season_id: i64,
    pub question_type: QuestionType,
    pub answer: Value,
    pub points: BetPoints,
}
