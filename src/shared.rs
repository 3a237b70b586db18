use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::bets::BetRepository;
use crate::config::AppConfig;
use crate::cron::Alerter;
use crate::event::EventBus;
use crate::fixture::FixtureRepository;
use crate::questionnaire::QuestionnaireRepository;
use crate::round::RoundRepository;
use crate::season::SeasonRepository;
use crate::user::UserRepository;
use crate::winners::SeasonWinnerRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub round_repository: Arc<dyn RoundRepository + Send + Sync>,
    pub fixture_repository: Arc<dyn FixtureRepository + Send + Sync>,
    pub bet_repository: Arc<dyn BetRepository + Send + Sync>,
    pub questionnaire_repository: Arc<dyn QuestionnaireRepository + Send + Sync>,
    pub season_repository: Arc<dyn SeasonRepository + Send + Sync>,
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub winner_repository: Arc<dyn SeasonWinnerRepository + Send + Sync>,
    pub event_bus: Arc<EventBus>,
    pub alerter: Arc<dyn Alerter + Send + Sync>,
    pub config: AppConfig,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        round_repository: Arc<dyn RoundRepository + Send + Sync>,
        fixture_repository: Arc<dyn FixtureRepository + Send + Sync>,
        bet_repository: Arc<dyn BetRepository + Send + Sync>,
        questionnaire_repository: Arc<dyn QuestionnaireRepository + Send + Sync>,
        season_repository: Arc<dyn SeasonRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        winner_repository: Arc<dyn SeasonWinnerRepository + Send + Sync>,
        event_bus: Arc<EventBus>,
        alerter: Arc<dyn Alerter + Send + Sync>,
        config: AppConfig,
    ) -> Self {
        Self {
            round_repository,
            fixture_repository,
            bet_repository,
            questionnaire_repository,
            season_repository,
            user_repository,
            winner_repository,
            event_bus,
            alerter,
            config,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
