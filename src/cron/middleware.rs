use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{instrument, warn};

use crate::shared::{AppError, AppState};

/// Shared-secret authentication for the cron trigger - validates the
/// Authorization Bearer header against the configured secret.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), cron::middleware::cron_auth))
#[instrument(skip(state, req, next))]
pub async fn cron_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header on cron request");
            AppError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    if token != state.config.cron_secret {
        warn!("Cron request rejected, secret mismatch");
        return Err(AppError::Unauthorized("Invalid cron secret".to_string()));
    }

    Ok(next.run(req).await)
}
