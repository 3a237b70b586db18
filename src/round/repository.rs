use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::models::{RoundModel, RoundStatus};
use crate::shared::AppError;

/// Result of a guarded round status update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdateResult {
    /// Status advanced as requested
    Updated,
    /// The round was not in the expected status; a concurrent or earlier
    /// run already advanced it
    NotInExpectedStatus,
    /// Round does not exist
    RoundNotFound,
}

/// Trait for betting round repository operations
#[async_trait]
pub trait RoundRepository {
    async fn get_round(&self, round_id: i64) -> Result<Option<RoundModel>, AppError>;
    async fn get_rounds_by_status(&self, status: RoundStatus)
        -> Result<Vec<RoundModel>, AppError>;
    async fn get_rounds_for_season(&self, season_id: i64) -> Result<Vec<RoundModel>, AppError>;

    /// Fixture IDs linked to the round via the round_fixtures join table
    async fn get_linked_fixture_ids(&self, round_id: i64) -> Result<Vec<i64>, AppError>;

    /// Advances the round status with a conditional write guarded on the
    /// expected current status, so retried and concurrent runs cannot
    /// regress or double-apply a transition.
    async fn update_status(
        &self,
        round_id: i64,
        expected: RoundStatus,
        next: RoundStatus,
    ) -> Result<StatusUpdateResult, AppError>;
}

/// In-memory implementation of RoundRepository for development and testing
pub struct InMemoryRoundRepository {
    rounds: Mutex<HashMap<i64, RoundModel>>,
    fixture_links: Mutex<HashMap<i64, Vec<i64>>>,
}

impl Default for InMemoryRoundRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoundRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            rounds: Mutex::new(HashMap::new()),
            fixture_links: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts a round with its linked fixture IDs
    pub fn insert_round(&self, round: RoundModel, fixture_ids: Vec<i64>) {
        self.fixture_links
            .lock()
            .unwrap()
            .insert(round.id, fixture_ids);
        self.rounds.lock().unwrap().insert(round.id, round);
    }

    /// Returns the current number of rounds in the repository
    pub fn round_count(&self) -> usize {
        self.rounds.lock().unwrap().len()
    }
}

#[async_trait]
impl RoundRepository for InMemoryRoundRepository {
    #[instrument(skip(self))]
    async fn get_round(&self, round_id: i64) -> Result<Option<RoundModel>, AppError> {
        debug!(round_id, "Fetching round from memory");

        let rounds = self.rounds.lock().unwrap();
        Ok(rounds.get(&round_id).cloned())
    }

    #[instrument(skip(self))]
    async fn get_rounds_by_status(
        &self,
        status: RoundStatus,
    ) -> Result<Vec<RoundModel>, AppError> {
        debug!(status = %status, "Fetching rounds by status from memory");

        let rounds = self.rounds.lock().unwrap();
        let mut matching: Vec<RoundModel> = rounds
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.id);

        debug!(status = %status, count = matching.len(), "Rounds fetched from memory");
        Ok(matching)
    }

    #[instrument(skip(self))]
    async fn get_rounds_for_season(&self, season_id: i64) -> Result<Vec<RoundModel>, AppError> {
        debug!(season_id, "Fetching season rounds from memory");

        let rounds = self.rounds.lock().unwrap();
        let mut matching: Vec<RoundModel> = rounds
            .values()
            .filter(|r| r.season_id == season_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.id);

        Ok(matching)
    }

    #[instrument(skip(self))]
    async fn get_linked_fixture_ids(&self, round_id: i64) -> Result<Vec<i64>, AppError> {
        debug!(round_id, "Fetching linked fixture IDs from memory");

        let links = self.fixture_links.lock().unwrap();
        Ok(links.get(&round_id).cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        round_id: i64,
        expected: RoundStatus,
        next: RoundStatus,
    ) -> Result<StatusUpdateResult, AppError> {
        if !expected.can_transition_to(next) {
            return Err(AppError::Validation(format!(
                "illegal round status transition {} -> {}",
                expected, next
            )));
        }

        debug!(round_id, expected = %expected, next = %next, "Updating round status in memory");

        let mut rounds = self.rounds.lock().unwrap();
        let round = match rounds.get_mut(&round_id) {
            Some(round) => round,
            None => {
                warn!(round_id, "Round not found for status update");
                return Ok(StatusUpdateResult::RoundNotFound);
            }
        };

        if round.status != expected {
            debug!(
                round_id,
                current = %round.status,
                expected = %expected,
                "Round not in expected status"
            );
            return Ok(StatusUpdateResult::NotInExpectedStatus);
        }

        round.status = next;
        info!(round_id, status = %next, "Round status updated in memory");
        Ok(StatusUpdateResult::Updated)
    }
}

/// PostgreSQL implementation of round repository
pub struct PostgresRoundRepository {
    pool: PgPool,
}

impl PostgresRoundRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_round(row: &sqlx::postgres::PgRow) -> Result<RoundModel, AppError> {
    let status_text: String = row.get("status");
    let status: RoundStatus = status_text.parse().map_err(|_| {
        warn!(status = %status_text, "Unknown round status in database");
        AppError::DatabaseError(format!("unknown round status: {}", status_text))
    })?;

    Ok(RoundModel {
        id: row.get("id"),
        season_id: row.get("season_id"),
        name: row.get("name"),
        status,
        is_cup_round: row.get("is_cup_round"),
        deadline: row.get("deadline"),
    })
}

#[async_trait]
impl RoundRepository for PostgresRoundRepository {
    #[instrument(skip(self))]
    async fn get_round(&self, round_id: i64) -> Result<Option<RoundModel>, AppError> {
        debug!(round_id, "Fetching round from database");

        let row = sqlx::query(
            "SELECT id, season_id, name, status, is_cup_round, deadline \
             FROM betting_rounds WHERE id = $1",
        )
        .bind(round_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, round_id, "Failed to fetch round from database");
            AppError::DatabaseError(e.to_string())
        })?;

        row.as_ref().map(row_to_round).transpose()
    }

    #[instrument(skip(self))]
    async fn get_rounds_by_status(
        &self,
        status: RoundStatus,
    ) -> Result<Vec<RoundModel>, AppError> {
        debug!(status = %status, "Fetching rounds by status from database");

        let rows = sqlx::query(
            "SELECT id, season_id, name, status, is_cup_round, deadline \
             FROM betting_rounds WHERE status = $1 ORDER BY id",
        )
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch rounds by status from database");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter().map(row_to_round).collect()
    }

    #[instrument(skip(self))]
    async fn get_rounds_for_season(&self, season_id: i64) -> Result<Vec<RoundModel>, AppError> {
        debug!(season_id, "Fetching season rounds from database");

        let rows = sqlx::query(
            "SELECT id, season_id, name, status, is_cup_round, deadline \
             FROM betting_rounds WHERE season_id = $1 ORDER BY id",
        )
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, season_id, "Failed to fetch season rounds from database");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter().map(row_to_round).collect()
    }

    #[instrument(skip(self))]
    async fn get_linked_fixture_ids(&self, round_id: i64) -> Result<Vec<i64>, AppError> {
        debug!(round_id, "Fetching linked fixture IDs from database");

        let rows = sqlx::query(
            "SELECT fixture_id FROM round_fixtures WHERE round_id = $1 ORDER BY fixture_id",
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, round_id, "Failed to fetch linked fixtures from database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows.iter().map(|row| row.get("fixture_id")).collect())
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        round_id: i64,
        expected: RoundStatus,
        next: RoundStatus,
    ) -> Result<StatusUpdateResult, AppError> {
        if !expected.can_transition_to(next) {
            return Err(AppError::Validation(format!(
                "illegal round status transition {} -> {}",
                expected, next
            )));
        }

        debug!(round_id, expected = %expected, next = %next, "Updating round status in database");

        // Conditional write: only advances when the row still carries the
        // expected status
        let result = sqlx::query("UPDATE betting_rounds SET status = $3 WHERE id = $1 AND status = $2")
            .bind(round_id)
            .bind(expected.to_string())
            .bind(next.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, round_id, "Failed to update round status in database");
                AppError::DatabaseError(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 AS one FROM betting_rounds WHERE id = $1")
                .bind(round_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    warn!(error = %e, round_id, "Failed to check round existence");
                    AppError::DatabaseError(e.to_string())
                })?;

            return Ok(if exists.is_some() {
                StatusUpdateResult::NotInExpectedStatus
            } else {
                StatusUpdateResult::RoundNotFound
            });
        }

        info!(round_id, status = %next, "Round status updated in database");
        Ok(StatusUpdateResult::Updated)
    }
}
