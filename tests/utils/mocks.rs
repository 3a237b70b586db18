use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use matchday::cron::{Alerter, PipelineOutcome};
use matchday::notify::{EmailSender, NotifyError};
use matchday::questionnaire::{
    InMemoryQuestionnaireRepository, QuestionType, QuestionnaireRepository, SeasonAnswerModel,
    SeasonQuestionModel,
};
use matchday::shared::AppError;
use matchday::user::UserModel;
use matchday::winners::CompetitionType;

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Records every email the pipeline would send
#[derive(Clone)]
pub struct RecordingEmailSender {
    round_emails: Arc<RwLock<Vec<(String, usize)>>>,
    winner_emails: Arc<RwLock<Vec<(i64, CompetitionType, Vec<String>, i64)>>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self {
            round_emails: Arc::new(RwLock::new(Vec::new())),
            winner_emails: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// (round_name, bets_scored) per round results email
    pub async fn round_emails(&self) -> Vec<(String, usize)> {
        self.round_emails.read().await.clone()
    }

    /// (season_id, competition, winner names, total points) per announcement
    pub async fn winner_emails(&self) -> Vec<(i64, CompetitionType, Vec<String>, i64)> {
        self.winner_emails.read().await.clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_round_scored(
        &self,
        round_name: &str,
        bets_scored: usize,
    ) -> Result<(), NotifyError> {
        self.round_emails
            .write()
            .await
            .push((round_name.to_string(), bets_scored));
        Ok(())
    }

    async fn send_winners_announcement(
        &self,
        season_id: i64,
        competition: CompetitionType,
        winners: &[UserModel],
        total_points: i64,
    ) -> Result<(), NotifyError> {
        let names = winners.iter().map(|u| u.username.clone()).collect();
        self.winner_emails
            .write()
            .await
            .push((season_id, competition, names, total_points));
        Ok(())
    }
}

/// Records every pipeline outcome handed to the alerter
#[derive(Clone)]
pub struct RecordingAlerter {
    outcomes: Arc<RwLock<Vec<PipelineOutcome>>>,
}

impl RecordingAlerter {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn reported(&self) -> Vec<PipelineOutcome> {
        self.outcomes.read().await.clone()
    }
}

#[async_trait]
impl Alerter for RecordingAlerter {
    async fn report_pipeline_outcome(&self, outcome: &PipelineOutcome) {
        self.outcomes.write().await.push(outcome.clone());
    }
}

/// Questionnaire repository whose scorable-season listing always fails,
/// wrapping a working in-memory store for everything else
pub struct BrokenQuestionnaireRepository {
    inner: Arc<InMemoryQuestionnaireRepository>,
}

impl BrokenQuestionnaireRepository {
    pub fn new(inner: Arc<InMemoryQuestionnaireRepository>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl QuestionnaireRepository for BrokenQuestionnaireRepository {
    async fn get_questions_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonQuestionModel>, AppError> {
        self.inner.get_questions_for_season(season_id).await
    }

    async fn get_answers_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonAnswerModel>, AppError> {
        self.inner.get_answers_for_season(season_id).await
    }

    async fn record_points(
        &self,
        user_id: Uuid,
        season_id: i64,
        question_type: QuestionType,
        points: i32,
    ) -> Result<bool, AppError> {
        self.inner
            .record_points(user_id, season_id, question_type, points)
            .await
    }

    async fn sum_scored_points_by_user(
        &self,
        season_id: i64,
    ) -> Result<HashMap<Uuid, i64>, AppError> {
        self.inner.sum_scored_points_by_user(season_id).await
    }

    async fn get_scorable_season_ids(&self) -> Result<Vec<i64>, AppError> {
        Err(AppError::DatabaseError(
            "season_questions scan failed".to_string(),
        ))
    }
}
