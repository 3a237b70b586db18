use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use super::models::StandingsEntry;
use super::service::StandingsService;
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct StandingsQuery {
    pub season_id: i64,
}

/// HTTP handler for the league standings table
///
/// GET /api/standings?season_id=1
/// Returns the full ranked table; pagination is the caller's business
#[instrument(name = "get_standings", skip(state))]
pub async fn get_standings(
    State(state): State<AppState>,
    Query(query): Query<StandingsQuery>,
) -> Result<Json<Vec<StandingsEntry>>, AppError> {
    info!(season_id = query.season_id, "Computing standings");

    // Use injected repositories from app state
    let service = StandingsService::new(
        Arc::clone(&state.round_repository),
        Arc::clone(&state.bet_repository),
        Arc::clone(&state.questionnaire_repository),
    );
    let table = service.calculate_standings(query.season_id).await?;

    info!(
        season_id = query.season_id,
        entries = table.len(),
        "Standings computed successfully"
    );

    Ok(Json(table))
}
