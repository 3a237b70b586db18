use std::time::Duration;

use crate::bets::ScoringPolicy;

/// Application configuration sourced from the environment.
///
/// The server runs against Postgres when `DATABASE_URL` is set and falls
/// back to in-memory repositories otherwise (local development and tests).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Postgres connection string; None selects the in-memory repositories
    pub database_url: Option<String>,
    /// Shared secret expected in the cron endpoint's bearer token
    pub cron_secret: String,
    /// Upper bound for each pipeline stage (detector, scoring, winners)
    pub stage_timeout: Duration,
    /// Point values for the match bet calculator
    pub scoring_policy: ScoringPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            cron_secret: "dev-cron-secret".to_string(),
            stage_timeout: Duration::from_secs(60),
            scoring_policy: ScoringPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from environment variables, using defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let stage_timeout = std::env::var("PIPELINE_STAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.stage_timeout);

        let mut scoring_policy = ScoringPolicy::default();
        if let Some(points) = std::env::var("POINTS_CORRECT_OUTCOME")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
        {
            scoring_policy.correct_outcome_points = points;
        }
        if let Some(bonus) = std::env::var("POINTS_EXACT_SCORE_BONUS")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
        {
            scoring_policy.exact_score_bonus = bonus;
        }
        if let Some(points) = std::env::var("POINTS_QUESTIONNAIRE_CORRECT")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
        {
            scoring_policy.questionnaire_correct_points = points;
        }

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: std::env::var("DATABASE_URL").ok(),
            cron_secret: std::env::var("CRON_SECRET").unwrap_or(defaults.cron_secret),
            stage_timeout,
            scoring_policy,
        }
    }
}
