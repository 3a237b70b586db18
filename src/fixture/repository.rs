use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{FixtureModel, FixtureStatus};
use crate::shared::AppError;

/// Trait for fixture read access. Fixtures are written by the external
/// sync job, so the core only exposes reads.
#[async_trait]
pub trait FixtureRepository {
    async fn get_fixture(&self, fixture_id: i64) -> Result<Option<FixtureModel>, AppError>;
    async fn get_fixtures_by_ids(&self, fixture_ids: &[i64]) -> Result<Vec<FixtureModel>, AppError>;
}

/// In-memory implementation of FixtureRepository for development and testing
pub struct InMemoryFixtureRepository {
    fixtures: Mutex<HashMap<i64, FixtureModel>>,
}

impl Default for InMemoryFixtureRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFixtureRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            fixtures: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated fixtures
    pub fn with_fixtures(fixtures: Vec<FixtureModel>) -> Self {
        let mut fixture_map = HashMap::new();
        for fixture in fixtures {
            fixture_map.insert(fixture.id, fixture);
        }

        Self {
            fixtures: Mutex::new(fixture_map),
        }
    }

    /// Inserts or replaces a fixture, standing in for the external sync job
    pub fn upsert_fixture(&self, fixture: FixtureModel) {
        self.fixtures.lock().unwrap().insert(fixture.id, fixture);
    }

    /// Returns the current number of fixtures in the repository
    pub fn fixture_count(&self) -> usize {
        self.fixtures.lock().unwrap().len()
    }
}

#[async_trait]
impl FixtureRepository for InMemoryFixtureRepository {
    #[instrument(skip(self))]
    async fn get_fixture(&self, fixture_id: i64) -> Result<Option<FixtureModel>, AppError> {
        debug!(fixture_id, "Fetching fixture from memory");

        let fixtures = self.fixtures.lock().unwrap();
        Ok(fixtures.get(&fixture_id).cloned())
    }

    #[instrument(skip(self, fixture_ids))]
    async fn get_fixtures_by_ids(
        &self,
        fixture_ids: &[i64],
    ) -> Result<Vec<FixtureModel>, AppError> {
        debug!(requested = fixture_ids.len(), "Fetching fixtures from memory");

        let fixtures = self.fixtures.lock().unwrap();
        let found: Vec<FixtureModel> = fixture_ids
            .iter()
            .filter_map(|id| fixtures.get(id).cloned())
            .collect();

        debug!(
            requested = fixture_ids.len(),
            found = found.len(),
            "Fixtures fetched from memory"
        );
        Ok(found)
    }
}

/// PostgreSQL implementation of fixture repository
pub struct PostgresFixtureRepository {
    pool: PgPool,
}

impl PostgresFixtureRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_fixture(row: &sqlx::postgres::PgRow) -> Result<FixtureModel, AppError> {
    let status_text: String = row.get("status");
    let status: FixtureStatus = status_text.parse().map_err(|_| {
        warn!(status = %status_text, "Unknown fixture status in database");
        AppError::DatabaseError(format!("unknown fixture status: {}", status_text))
    })?;

    Ok(FixtureModel {
        id: row.get("id"),
        home_team_id: row.get("home_team_id"),
        away_team_id: row.get("away_team_id"),
        kickoff: row.get("kickoff"),
        status,
        home_goals: row.get("home_goals"),
        away_goals: row.get("away_goals"),
    })
}

#[async_trait]
impl FixtureRepository for PostgresFixtureRepository {
    #[instrument(skip(self))]
    async fn get_fixture(&self, fixture_id: i64) -> Result<Option<FixtureModel>, AppError> {
        debug!(fixture_id, "Fetching fixture from database");

        let row = sqlx::query(
            "SELECT id, home_team_id, away_team_id, kickoff, status, home_goals, away_goals \
             FROM fixtures WHERE id = $1",
        )
        .bind(fixture_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, fixture_id, "Failed to fetch fixture from database");
            AppError::DatabaseError(e.to_string())
        })?;

        row.as_ref().map(row_to_fixture).transpose()
    }

    #[instrument(skip(self, fixture_ids))]
    async fn get_fixtures_by_ids(
        &self,
        fixture_ids: &[i64],
    ) -> Result<Vec<FixtureModel>, AppError> {
        debug!(requested = fixture_ids.len(), "Fetching fixtures from database");

        let rows = sqlx::query(
            "SELECT id, home_team_id, away_team_id, kickoff, status, home_goals, away_goals \
             FROM fixtures WHERE id = ANY($1)",
        )
        .bind(fixture_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch fixtures from database");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter().map(row_to_fixture).collect()
    }
}
