use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matchday::bets::{InMemoryBetRepository, PostgresBetRepository};
use matchday::config::AppConfig;
use matchday::cron;
use matchday::cron::LogAlerter;
use matchday::event::EventBus;
use matchday::fixture::{InMemoryFixtureRepository, PostgresFixtureRepository};
use matchday::notify::{LoggingEmailSender, NotificationSubscriber};
use matchday::questionnaire::{InMemoryQuestionnaireRepository, PostgresQuestionnaireRepository};
use matchday::round::{InMemoryRoundRepository, PostgresRoundRepository};
use matchday::season::{InMemorySeasonRepository, PostgresSeasonRepository};
use matchday::shared::AppState;
use matchday::standings;
use matchday::user::{InMemoryUserRepository, PostgresUserRepository};
use matchday::winners::{InMemorySeasonWinnerRepository, PostgresSeasonWinnerRepository};

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matchday=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting matchday prediction league server");

    let config = AppConfig::from_env();
    let event_bus = Arc::new(EventBus::default());

    // Create shared application state with dependency injection
    // Easy to switch between implementations:
    let app_state = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url)
                .await
                .expect("Failed to connect to database");
            info!("Connected to PostgreSQL");

            AppState::new(
                Arc::new(PostgresRoundRepository::new(pool.clone())),
                Arc::new(PostgresFixtureRepository::new(pool.clone())),
                Arc::new(PostgresBetRepository::new(pool.clone())),
                Arc::new(PostgresQuestionnaireRepository::new(pool.clone())),
                Arc::new(PostgresSeasonRepository::new(pool.clone())),
                Arc::new(PostgresUserRepository::new(pool.clone())),
                Arc::new(PostgresSeasonWinnerRepository::new(pool)),
                event_bus.clone(),
                Arc::new(LogAlerter),
                config,
            )
        }
        None => {
            info!("No DATABASE_URL set, using in-memory repositories");

            AppState::new(
                Arc::new(InMemoryRoundRepository::new()),
                Arc::new(InMemoryFixtureRepository::new()),
                Arc::new(InMemoryBetRepository::new()),
                Arc::new(InMemoryQuestionnaireRepository::new()),
                Arc::new(InMemorySeasonRepository::new()),
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemorySeasonWinnerRepository::new()),
                event_bus.clone(),
                Arc::new(LogAlerter),
                config,
            )
        }
    };

    // Email notifications ride on the pipeline events, decoupled from
    // the scoring path
    let _notification_task =
        NotificationSubscriber::new(Arc::new(LoggingEmailSender), event_bus).start();

    // build our application: public reads plus the secret-guarded cron trigger
    let protected = Router::new()
        .route("/api/cron/pipeline", get(cron::handlers::run_pipeline))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            cron::middleware::cron_auth,
        ));

    let app = Router::new()
        .route("/", get(|| async { "matchday prediction league API" }))
        .route("/health", get(health))
        .route("/api/standings", get(standings::handlers::get_standings))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state.clone());

    // run our app with hyper, listening on the configured address
    let bind_addr = app_state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await.unwrap();
}
