use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::SeasonModel;
use crate::shared::AppError;

/// Trait for season repository operations
#[async_trait]
pub trait SeasonRepository {
    async fn get_season(&self, season_id: i64) -> Result<Option<SeasonModel>, AppError>;

    /// Seasons whose scheduled end has passed. The cutoff is explicit so
    /// callers control the clock.
    async fn get_ended_seasons(&self, cutoff: DateTime<Utc>)
        -> Result<Vec<SeasonModel>, AppError>;
}

/// In-memory implementation of SeasonRepository for development and testing
pub struct InMemorySeasonRepository {
    seasons: Mutex<HashMap<i64, SeasonModel>>,
}

impl Default for InMemorySeasonRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySeasonRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            seasons: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or replaces a season
    pub fn insert_season(&self, season: SeasonModel) {
        self.seasons.lock().unwrap().insert(season.id, season);
    }
}

#[async_trait]
impl SeasonRepository for InMemorySeasonRepository {
    #[instrument(skip(self))]
    async fn get_season(&self, season_id: i64) -> Result<Option<SeasonModel>, AppError> {
        debug!(season_id, "Fetching season from memory");

        let seasons = self.seasons.lock().unwrap();
        Ok(seasons.get(&season_id).cloned())
    }

    #[instrument(skip(self))]
    async fn get_ended_seasons(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SeasonModel>, AppError> {
        let seasons = self.seasons.lock().unwrap();
        let mut ended: Vec<SeasonModel> = seasons
            .values()
            .filter(|s| s.ends_at <= cutoff)
            .cloned()
            .collect();
        ended.sort_by_key(|s| s.id);

        debug!(count = ended.len(), "Ended seasons fetched from memory");
        Ok(ended)
    }
}

/// PostgreSQL implementation of season repository
pub struct PostgresSeasonRepository {
    pool: PgPool,
}

impl PostgresSeasonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_season(row: &sqlx::postgres::PgRow) -> SeasonModel {
    SeasonModel {
        id: row.get("id"),
        name: row.get("name"),
        ends_at: row.get("ends_at"),
    }
}

#[async_trait]
impl SeasonRepository for PostgresSeasonRepository {
    #[instrument(skip(self))]
    async fn get_season(&self, season_id: i64) -> Result<Option<SeasonModel>, AppError> {
        debug!(season_id, "Fetching season from database");

        let row = sqlx::query("SELECT id, name, ends_at FROM seasons WHERE id = $1")
            .bind(season_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, season_id, "Failed to fetch season from database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(row.as_ref().map(row_to_season))
    }

    #[instrument(skip(self))]
    async fn get_ended_seasons(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SeasonModel>, AppError> {
        let rows = sqlx::query("SELECT id, name, ends_at FROM seasons WHERE ends_at <= $1 ORDER BY id")
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch ended seasons from database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(rows.iter().map(row_to_season).collect())
    }
}
