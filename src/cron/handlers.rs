use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{info, instrument};

use super::pipeline::CronPipeline;
use crate::bets::BetScoringService;
use crate::questionnaire::QuestionnaireScoringService;
use crate::round::RoundCompletionDetector;
use crate::shared::AppState;
use crate::standings::StandingsService;
use crate::winners::WinnerDeterminationService;

/// HTTP handler for the scheduled pipeline trigger
///
/// GET /api/cron/pipeline (behind the cron_auth middleware)
/// Always answers JSON: 200 for a successful or degraded run, 500 for a
/// failed one.
#[instrument(name = "run_pipeline", skip(state))]
pub async fn run_pipeline(State(state): State<AppState>) -> impl IntoResponse {
    info!("Cron pipeline triggered");

    // Use injected repositories from app state
    let detector = RoundCompletionDetector::new(
        Arc::clone(&state.round_repository),
        Arc::clone(&state.fixture_repository),
        Arc::clone(&state.event_bus),
    );
    let bet_scoring = BetScoringService::new(
        Arc::clone(&state.round_repository),
        Arc::clone(&state.fixture_repository),
        Arc::clone(&state.bet_repository),
        state.config.scoring_policy,
        Arc::clone(&state.event_bus),
    );
    let questionnaire_scoring = QuestionnaireScoringService::new(
        Arc::clone(&state.questionnaire_repository),
        state.config.scoring_policy,
    );
    let standings = Arc::new(StandingsService::new(
        Arc::clone(&state.round_repository),
        Arc::clone(&state.bet_repository),
        Arc::clone(&state.questionnaire_repository),
    ));
    let winner_determination = WinnerDeterminationService::new(
        Arc::clone(&state.season_repository),
        Arc::clone(&state.round_repository),
        standings,
        Arc::clone(&state.winner_repository),
        Arc::clone(&state.user_repository),
        Arc::clone(&state.event_bus),
    );

    let pipeline = CronPipeline::new(
        detector,
        bet_scoring,
        questionnaire_scoring,
        winner_determination,
        state.config.stage_timeout,
    );
    let outcome = pipeline.run().await;

    state.alerter.report_pipeline_outcome(&outcome).await;

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bets::models::{BetModel, BetPoints};
    use crate::bets::repository::InMemoryBetRepository;
    use crate::cron::pipeline::PipelineOutcome;
    use crate::fixture::{FixtureModel, FixtureStatus, InMemoryFixtureRepository, MatchOutcome};
    use crate::round::{InMemoryRoundRepository, RoundModel, RoundRepository, RoundStatus};
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`
    use uuid::Uuid;

    fn pipeline_router(state: AppState) -> Router {
        Router::new()
            .route("/api/cron/pipeline", get(run_pipeline))
            .with_state(state)
    }

    async fn response_outcome(response: axum::response::Response) -> PipelineOutcome {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_clean_run_answers_200_with_summary() {
        let state = AppStateBuilder::new().build();
        let app = pipeline_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/cron/pipeline")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let outcome = response_outcome(response).await;
        assert!(outcome.success);
        assert_eq!(outcome.error_count, 0);
    }

    #[tokio::test]
    async fn test_run_scores_rounds_through_the_endpoint() {
        let rounds = Arc::new(InMemoryRoundRepository::new());
        let fixtures = Arc::new(InMemoryFixtureRepository::with_fixtures(vec![
            FixtureModel {
                id: 10,
                home_team_id: 100,
                away_team_id: 101,
                kickoff: Utc::now() - Duration::hours(3),
                status: FixtureStatus::Finished,
                home_goals: Some(2),
                away_goals: Some(0),
            },
        ]));
        let bets = Arc::new(InMemoryBetRepository::new());

        rounds.insert_round(
            RoundModel {
                id: 1,
                season_id: 1,
                name: "Round 1".to_string(),
                status: RoundStatus::Open,
                is_cup_round: false,
                deadline: Utc::now() - Duration::hours(4),
            },
            vec![10],
        );
        bets.insert_bet(BetModel {
            user_id: Uuid::new_v4(),
            fixture_id: 10,
            round_id: 1,
            predicted: MatchOutcome::HomeWin,
            predicted_home: None,
            predicted_away: None,
            points: BetPoints::Unscored,
        });

        let state = AppStateBuilder::new()
            .with_round_repository(rounds.clone())
            .with_fixture_repository(fixtures)
            .with_bet_repository(bets.clone())
            .build();
        let app = pipeline_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/cron/pipeline")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let stored = rounds.get_round(1).await.unwrap().unwrap();
        assert_eq!(stored.status, RoundStatus::Scored);
    }
}
