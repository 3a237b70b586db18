use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use tokio::time::{sleep, Duration};
use tower::ServiceExt;

use matchday::bets::{BetModel, BetPoints};
use matchday::cron::PipelineOutcome;
use matchday::fixture::{FixtureModel, FixtureStatus, MatchOutcome};
use matchday::questionnaire::{QuestionType, SeasonAnswerModel, SeasonQuestionModel};
use matchday::round::{RoundModel, RoundStatus};
use matchday::season::SeasonModel;
use matchday::standings::StandingsEntry;

use super::setup::{TestSetup, TEST_CRON_SECRET};

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Seed a season ending the given number of days from now
    /// (negative = already ended)
    pub fn seed_season(&self, season_id: i64, ends_in_days: i64) {
        self.seasons.insert_season(SeasonModel {
            id: season_id,
            name: format!("Season {}", season_id),
            ends_at: Utc::now() + ChronoDuration::days(ends_in_days),
        });
    }

    /// Seed an open league round linked to the given fixtures
    pub fn seed_round(&self, round_id: i64, season_id: i64, fixture_ids: Vec<i64>) {
        self.seed_round_with(round_id, season_id, false, fixture_ids);
    }

    /// Seed an open cup round for the last-round-special competition
    pub fn seed_cup_round(&self, round_id: i64, season_id: i64, fixture_ids: Vec<i64>) {
        self.seed_round_with(round_id, season_id, true, fixture_ids);
    }

    fn seed_round_with(
        &self,
        round_id: i64,
        season_id: i64,
        is_cup_round: bool,
        fixture_ids: Vec<i64>,
    ) {
        self.rounds.insert_round(
            RoundModel {
                id: round_id,
                season_id,
                name: format!("Round {}", round_id),
                status: RoundStatus::Open,
                is_cup_round,
                deadline: Utc::now() - ChronoDuration::hours(2),
            },
            fixture_ids,
        );
    }

    pub fn seed_finished_fixture(&self, fixture_id: i64, home_goals: i32, away_goals: i32) {
        self.fixtures.upsert_fixture(FixtureModel {
            id: fixture_id,
            home_team_id: fixture_id * 10,
            away_team_id: fixture_id * 10 + 1,
            kickoff: Utc::now() - ChronoDuration::hours(3),
            status: FixtureStatus::Finished,
            home_goals: Some(home_goals),
            away_goals: Some(away_goals),
        });
    }

    pub fn seed_pending_fixture(&self, fixture_id: i64) {
        self.fixtures.upsert_fixture(FixtureModel {
            id: fixture_id,
            home_team_id: fixture_id * 10,
            away_team_id: fixture_id * 10 + 1,
            kickoff: Utc::now() + ChronoDuration::hours(3),
            status: FixtureStatus::NotStarted,
            home_goals: None,
            away_goals: None,
        });
    }

    pub fn seed_bet(&self, user: &str, fixture_id: i64, round_id: i64, predicted: MatchOutcome) {
        let user_id = self.user_id(user);
        self.bets.insert_bet(BetModel {
            user_id,
            fixture_id,
            round_id,
            predicted,
            predicted_home: None,
            predicted_away: None,
            points: BetPoints::Unscored,
        });
    }

    pub fn seed_question(&self, season_id: i64, question_type: QuestionType, valid_answers: Value) {
        self.questionnaire.upsert_question(SeasonQuestionModel {
            season_id,
            question_type,
            valid_answers,
        });
    }

    pub fn seed_answer(
        &self,
        user: &str,
        season_id: i64,
        question_type: QuestionType,
        answer: Value,
    ) {
        let user_id = self.user_id(user);
        self.questionnaire.insert_answer(SeasonAnswerModel {
            user_id,
            season_id,
            question_type,
            answer,
            points: BetPoints::Unscored,
        });
    }

    // ========================================================================
    // HTTP Actions
    // ========================================================================

    /// Trigger the cron pipeline with the valid secret and parse the
    /// run summary
    pub async fn run_pipeline(&self) -> PipelineOutcome {
        let (_, outcome) = self.run_pipeline_raw().await;
        outcome
    }

    /// Trigger the pipeline expecting a specific HTTP status
    pub async fn run_pipeline_expecting_status(&self, expected: StatusCode) -> PipelineOutcome {
        let (status, outcome) = self.run_pipeline_raw().await;
        assert_eq!(status, expected, "unexpected pipeline status: {:?}", outcome);
        outcome
    }

    async fn run_pipeline_raw(&self) -> (StatusCode, PipelineOutcome) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/cron/pipeline")
                    .header("Authorization", format!("Bearer {}", TEST_CRON_SECRET))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let outcome = serde_json::from_slice(&body).unwrap();

        // Give the notification task a chance to drain the emitted events
        sleep(Duration::from_millis(25)).await;

        (status, outcome)
    }

    /// Trigger the pipeline with a different (or missing) bearer token
    pub async fn trigger_pipeline_with_token(&self, token: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri("/api/cron/pipeline");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = self
            .app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    /// Fetch the ranked standings table through the HTTP surface
    pub async fn fetch_standings(&self, season_id: i64) -> Vec<StandingsEntry> {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/standings?season_id={}", season_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}
