use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{QuestionType, SeasonAnswerModel, SeasonQuestionModel};
use crate::bets::BetPoints;
use crate::shared::AppError;

/// Trait for season questionnaire repository operations.
///
/// Questions and answers are written by the out-of-scope CRUD surface;
/// the core reads them and records points, with the same set-once write
/// rule as match bets.
#[async_trait]
pub trait QuestionnaireRepository {
    async fn get_questions_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonQuestionModel>, AppError>;

    async fn get_answers_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonAnswerModel>, AppError>;

    /// Writes points for an unscored answer. Returns false when the answer
    /// is already scored or does not exist; never overwrites.
    async fn record_points(
        &self,
        user_id: Uuid,
        season_id: i64,
        question_type: QuestionType,
        points: i32,
    ) -> Result<bool, AppError>;

    /// Sums scored questionnaire points per user for the season.
    async fn sum_scored_points_by_user(
        &self,
        season_id: i64,
    ) -> Result<HashMap<Uuid, i64>, AppError>;

    /// Seasons that have at least one question with recorded valid
    /// answers, i.e. where a scoring sweep can do work.
    async fn get_scorable_season_ids(&self) -> Result<Vec<i64>, AppError>;
}

/// In-memory implementation of QuestionnaireRepository for development and
/// testing
pub struct InMemoryQuestionnaireRepository {
    questions: Mutex<HashMap<(i64, QuestionType), SeasonQuestionModel>>,
    answers: Mutex<HashMap<(Uuid, i64, QuestionType), SeasonAnswerModel>>,
}

impl Default for InMemoryQuestionnaireRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQuestionnaireRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            questions: Mutex::new(HashMap::new()),
            answers: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or replaces a season question
    pub fn upsert_question(&self, question: SeasonQuestionModel) {
        self.questions
            .lock()
            .unwrap()
            .insert((question.season_id, question.question_type), question);
    }

    /// Inserts a user's answer, standing in for the CRUD surface
    pub fn insert_answer(&self, answer: SeasonAnswerModel) {
        self.answers.lock().unwrap().insert(
            (answer.user_id, answer.season_id, answer.question_type),
            answer,
        );
    }
}

#[async_trait]
impl QuestionnaireRepository for InMemoryQuestionnaireRepository {
    #[instrument(skip(self))]
    async fn get_questions_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonQuestionModel>, AppError> {
        debug!(season_id, "Fetching season questions from memory");

        let questions = self.questions.lock().unwrap();
        let mut matching: Vec<SeasonQuestionModel> = questions
            .values()
            .filter(|q| q.season_id == season_id)
            .cloned()
            .collect();
        matching.sort_by_key(|q| q.question_type);

        Ok(matching)
    }

    #[instrument(skip(self))]
    async fn get_answers_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonAnswerModel>, AppError> {
        debug!(season_id, "Fetching season answers from memory");

        let answers = self.answers.lock().unwrap();
        let mut matching: Vec<SeasonAnswerModel> = answers
            .values()
            .filter(|a| a.season_id == season_id)
            .cloned()
            .collect();
        matching.sort_by_key(|a| (a.user_id, a.question_type));

        Ok(matching)
    }

    #[instrument(skip(self))]
    async fn record_points(
        &self,
        user_id: Uuid,
        season_id: i64,
        question_type: QuestionType,
        points: i32,
    ) -> Result<bool, AppError> {
        let mut answers = self.answers.lock().unwrap();
        let answer = match answers.get_mut(&(user_id, season_id, question_type)) {
            Some(answer) => answer,
            None => {
                warn!(%user_id, season_id, %question_type, "Answer not found for scoring");
                return Ok(false);
            }
        };

        if answer.points.is_scored() {
            debug!(%user_id, season_id, %question_type, "Answer already scored, leaving untouched");
            return Ok(false);
        }

        answer.points = BetPoints::Scored(points);
        debug!(%user_id, season_id, %question_type, points, "Answer points recorded in memory");
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn sum_scored_points_by_user(
        &self,
        season_id: i64,
    ) -> Result<HashMap<Uuid, i64>, AppError> {
        debug!(season_id, "Summing scored answer points from memory");

        let answers = self.answers.lock().unwrap();
        let mut totals: HashMap<Uuid, i64> = HashMap::new();
        for answer in answers.values() {
            if answer.season_id != season_id {
                continue;
            }
            if let BetPoints::Scored(points) = answer.points {
                *totals.entry(answer.user_id).or_insert(0) += points as i64;
            }
        }

        Ok(totals)
    }

    #[instrument(skip(self))]
    async fn get_scorable_season_ids(&self) -> Result<Vec<i64>, AppError> {
        let questions = self.questions.lock().unwrap();
        let mut ids: Vec<i64> = questions
            .values()
            .filter(|q| !q.valid_answers.is_null())
            .map(|q| q.season_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();

        Ok(ids)
    }
}

/// PostgreSQL implementation of questionnaire repository
pub struct PostgresQuestionnaireRepository {
    pool: PgPool,
}

impl PostgresQuestionnaireRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_question_type(raw: &str) -> Result<QuestionType, AppError> {
    raw.parse().map_err(|_| {
        warn!(question_type = raw, "Unknown question type in database");
        AppError::DatabaseError(format!("unknown question type: {}", raw))
    })
}

#[async_trait]
impl QuestionnaireRepository for PostgresQuestionnaireRepository {
    #[instrument(skip(self))]
    async fn get_questions_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonQuestionModel>, AppError> {
        debug!(season_id, "Fetching season questions from database");

        let rows = sqlx::query(
            "SELECT season_id, question_type, valid_answers \
             FROM season_questions WHERE season_id = $1 ORDER BY question_type",
        )
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, season_id, "Failed to fetch season questions");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter()
            .map(|row| {
                let type_text: String = row.get("question_type");
                Ok(SeasonQuestionModel {
                    season_id: row.get("season_id"),
                    question_type: parse_question_type(&type_text)?,
                    valid_answers: row
                        .get::<Option<serde_json::Value>, _>("valid_answers")
                        .unwrap_or(serde_json::Value::Null),
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn get_answers_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonAnswerModel>, AppError> {
        debug!(season_id, "Fetching season answers from database");

        let rows = sqlx::query(
            "SELECT user_id, season_id, question_type, answer, points \
             FROM season_answers WHERE season_id = $1 ORDER BY user_id, question_type",
        )
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, season_id, "Failed to fetch season answers");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter()
            .map(|row| {
                let type_text: String = row.get("question_type");
                Ok(SeasonAnswerModel {
                    user_id: row.get("user_id"),
                    season_id: row.get("season_id"),
                    question_type: parse_question_type(&type_text)?,
                    answer: row
                        .get::<Option<serde_json::Value>, _>("answer")
                        .unwrap_or(serde_json::Value::Null),
                    points: BetPoints::from_column(row.get("points")),
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn record_points(
        &self,
        user_id: Uuid,
        season_id: i64,
        question_type: QuestionType,
        points: i32,
    ) -> Result<bool, AppError> {
        // NULL guard keeps the write set-once under retries
        let result = sqlx::query(
            "UPDATE season_answers SET points = $4 \
             WHERE user_id = $1 AND season_id = $2 AND question_type = $3 AND points IS NULL",
        )
        .bind(user_id)
        .bind(season_id)
        .bind(question_type.to_string())
        .bind(points)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, %user_id, season_id, "Failed to record answer points");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn sum_scored_points_by_user(
        &self,
        season_id: i64,
    ) -> Result<HashMap<Uuid, i64>, AppError> {
        debug!(season_id, "Summing scored answer points from database");

        let rows = sqlx::query(
            "SELECT user_id, COALESCE(SUM(points), 0) AS total \
             FROM season_answers WHERE season_id = $1 AND points IS NOT NULL GROUP BY user_id",
        )
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, season_id, "Failed to sum answer points");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows
            .iter()
            .map(|row| (row.get("user_id"), row.get("total")))
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_scorable_season_ids(&self) -> Result<Vec<i64>, AppError> {
        let rows = sqlx::query(
            "SELECT DISTINCT season_id FROM season_questions \
             WHERE valid_answers IS NOT NULL ORDER BY season_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch scorable seasons");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows.iter().map(|row| row.get("season_id")).collect())
    }
}
