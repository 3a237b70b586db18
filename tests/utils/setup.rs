use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use axum::{middleware, routing::get, Router};

use matchday::bets::InMemoryBetRepository;
use matchday::config::AppConfig;
use matchday::cron;
use matchday::event::EventBus;
use matchday::fixture::InMemoryFixtureRepository;
use matchday::notify::NotificationSubscriber;
use matchday::questionnaire::{InMemoryQuestionnaireRepository, QuestionnaireRepository};
use matchday::round::InMemoryRoundRepository;
use matchday::season::InMemorySeasonRepository;
use matchday::shared::AppState;
use matchday::standings;
use matchday::user::{InMemoryUserRepository, UserModel};
use matchday::winners::InMemorySeasonWinnerRepository;

use super::mocks::{BrokenQuestionnaireRepository, RecordingAlerter, RecordingEmailSender};

pub const TEST_CRON_SECRET: &str = "test-cron-secret";

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub rounds: Arc<InMemoryRoundRepository>,
    pub fixtures: Arc<InMemoryFixtureRepository>,
    pub bets: Arc<InMemoryBetRepository>,
    pub questionnaire: Arc<InMemoryQuestionnaireRepository>,
    pub seasons: Arc<InMemorySeasonRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub winners: Arc<InMemorySeasonWinnerRepository>,
    pub event_bus: Arc<EventBus>,
    pub email: RecordingEmailSender,
    pub alerter: RecordingAlerter,
    pub app: Router,
    user_ids: Mutex<HashMap<String, Uuid>>,
    pub _subscription_handle: JoinHandle<()>,
}

impl TestSetup {
    /// Stable per-name user ID; registers the user on first use
    pub fn user_id(&self, name: &str) -> Uuid {
        let mut ids = self.user_ids.lock().unwrap();
        if let Some(id) = ids.get(name) {
            return *id;
        }
        let id = Uuid::new_v4();
        ids.insert(name.to_string(), id);
        self.users.insert_user(UserModel {
            id,
            username: name.to_string(),
            email: format!("{}@example.com", name),
        });
        id
    }
}

pub struct TestSetupBuilder {
    stage_timeout: Duration,
    questionnaire_listing_fails: bool,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            stage_timeout: Duration::from_secs(5),
            questionnaire_listing_fails: false,
        }
    }

    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = stage_timeout;
        self
    }

    /// Makes the questionnaire scoring stage fail systemically while the
    /// rest of the pipeline keeps working
    pub fn with_failing_questionnaire_listing(mut self) -> Self {
        self.questionnaire_listing_fails = true;
        self
    }

    pub fn build(self) -> TestSetup {
        let rounds = Arc::new(InMemoryRoundRepository::new());
        let fixtures = Arc::new(InMemoryFixtureRepository::new());
        let bets = Arc::new(InMemoryBetRepository::new());
        let questionnaire = Arc::new(InMemoryQuestionnaireRepository::new());
        let seasons = Arc::new(InMemorySeasonRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let winners = Arc::new(InMemorySeasonWinnerRepository::new());
        let event_bus = Arc::new(EventBus::default());
        let email = RecordingEmailSender::new();
        let alerter = RecordingAlerter::new();

        // Seeding goes through the inner store even when the state gets
        // the broken wrapper
        let questionnaire_for_state: Arc<dyn QuestionnaireRepository + Send + Sync> =
            if self.questionnaire_listing_fails {
                Arc::new(BrokenQuestionnaireRepository::new(questionnaire.clone()))
            } else {
                questionnaire.clone()
            };

        let config = AppConfig {
            cron_secret: TEST_CRON_SECRET.to_string(),
            stage_timeout: self.stage_timeout,
            ..AppConfig::default()
        };

        let state = AppState::new(
            rounds.clone(),
            fixtures.clone(),
            bets.clone(),
            questionnaire_for_state,
            seasons.clone(),
            users.clone(),
            winners.clone(),
            event_bus.clone(),
            Arc::new(alerter.clone()),
            config,
        );

        let subscription_handle =
            NotificationSubscriber::new(Arc::new(email.clone()), event_bus.clone()).start();

        // Same surface main() wires up
        let protected = Router::new()
            .route("/api/cron/pipeline", get(cron::handlers::run_pipeline))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                cron::middleware::cron_auth,
            ));
        let app = Router::new()
            .route("/api/standings", get(standings::handlers::get_standings))
            .merge(protected)
            .with_state(state);

        TestSetup {
            rounds,
            fixtures,
            bets,
            questionnaire,
            seasons,
            users,
            winners,
            event_bus,
            email,
            alerter,
            app,
            user_ids: Mutex::new(HashMap::new()),
            _subscription_handle: subscription_handle,
        }
    }
}
