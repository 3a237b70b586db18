use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{BetModel, BetPoints};
use crate::fixture::MatchOutcome;
use crate::shared::AppError;

/// Trait for bet repository operations.
///
/// Bets are created through the out-of-scope CRUD surface; the core reads
/// them and writes points. `record_points` is set-once (NULL-guarded) so
/// retried runs cannot double-award; `overwrite_points` is the explicit
/// retroactive-correction path.
#[async_trait]
pub trait BetRepository {
    async fn get_bets_for_round(&self, round_id: i64) -> Result<Vec<BetModel>, AppError>;

    /// Writes points for an unscored bet. Returns false when the bet is
    /// already scored or does not exist; never overwrites.
    async fn record_points(
        &self,
        user_id: Uuid,
        fixture_id: i64,
        points: i32,
    ) -> Result<bool, AppError>;

    /// Overwrites points regardless of the current value. Only the
    /// retroactive re-score goes through here.
    async fn overwrite_points(
        &self,
        user_id: Uuid,
        fixture_id: i64,
        points: i32,
    ) -> Result<bool, AppError>;

    /// Sums scored points per user over the given rounds. Unscored bets
    /// contribute nothing.
    async fn sum_scored_points_by_user(
        &self,
        round_ids: &[i64],
    ) -> Result<HashMap<Uuid, i64>, AppError>;
}

/// In-memory implementation of BetRepository for development and testing
pub struct InMemoryBetRepository {
    bets: Mutex<HashMap<(Uuid, i64), BetModel>>,
}

impl Default for InMemoryBetRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBetRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            bets: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts a bet, standing in for the user-facing CRUD surface
    pub fn insert_bet(&self, bet: BetModel) {
        self.bets
            .lock()
            .unwrap()
            .insert((bet.user_id, bet.fixture_id), bet);
    }

    /// Returns the current number of bets in the repository
    pub fn bet_count(&self) -> usize {
        self.bets.lock().unwrap().len()
    }
}

#[async_trait]
impl BetRepository for InMemoryBetRepository {
    #[instrument(skip(self))]
    async fn get_bets_for_round(&self, round_id: i64) -> Result<Vec<BetModel>, AppError> {
        debug!(round_id, "Fetching bets for round from memory");

        let bets = self.bets.lock().unwrap();
        let mut matching: Vec<BetModel> = bets
            .values()
            .filter(|b| b.round_id == round_id)
            .cloned()
            .collect();
        matching.sort_by_key(|b| (b.user_id, b.fixture_id));

        debug!(round_id, count = matching.len(), "Bets fetched from memory");
        Ok(matching)
    }

    #[instrument(skip(self))]
    async fn record_points(
        &self,
        user_id: Uuid,
        fixture_id: i64,
        points: i32,
    ) -> Result<bool, AppError> {
        let mut bets = self.bets.lock().unwrap();
        let bet = match bets.get_mut(&(user_id, fixture_id)) {
            Some(bet) => bet,
            None => {
                warn!(%user_id, fixture_id, "Bet not found for scoring");
                return Ok(false);
            }
        };

        if bet.points.is_scored() {
            debug!(%user_id, fixture_id, "Bet already scored, leaving untouched");
            return Ok(false);
        }

        bet.points = BetPoints::Scored(points);
        debug!(%user_id, fixture_id, points, "Bet points recorded in memory");
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn overwrite_points(
        &self,
        user_id: Uuid,
        fixture_id: i64,
        points: i32,
    ) -> Result<bool, AppError> {
        let mut bets = self.bets.lock().unwrap();
        let bet = match bets.get_mut(&(user_id, fixture_id)) {
            Some(bet) => bet,
            None => {
                warn!(%user_id, fixture_id, "Bet not found for retroactive correction");
                return Ok(false);
            }
        };

        bet.points = BetPoints::Scored(points);
        info!(%user_id, fixture_id, points, "Bet points overwritten in memory");
        Ok(true)
    }

    #[instrument(skip(self, round_ids))]
    async fn sum_scored_points_by_user(
        &self,
        round_ids: &[i64],
    ) -> Result<HashMap<Uuid, i64>, AppError> {
        debug!(rounds = round_ids.len(), "Summing scored bet points from memory");

        let bets = self.bets.lock().unwrap();
        let mut totals: HashMap<Uuid, i64> = HashMap::new();
        for bet in bets.values() {
            if !round_ids.contains(&bet.round_id) {
                continue;
            }
            if let BetPoints::Scored(points) = bet.points {
                *totals.entry(bet.user_id).or_insert(0) += points as i64;
            }
        }

        Ok(totals)
    }
}

/// PostgreSQL implementation of bet repository
pub struct PostgresBetRepository {
    pool: PgPool,
}

impl PostgresBetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_bet(row: &sqlx::postgres::PgRow) -> Result<BetModel, AppError> {
    let predicted_text: String = row.get("predicted");
    let predicted: MatchOutcome = predicted_text.parse().map_err(|_| {
        warn!(predicted = %predicted_text, "Unknown predicted outcome in database");
        AppError::DatabaseError(format!("unknown predicted outcome: {}", predicted_text))
    })?;

    Ok(BetModel {
        user_id: row.get("user_id"),
        fixture_id: row.get("fixture_id"),
        round_id: row.get("round_id"),
        predicted,
        predicted_home: row.get("predicted_home"),
        predicted_away: row.get("predicted_away"),
        points: BetPoints::from_column(row.get("points")),
    })
}

#[async_trait]
impl BetRepository for PostgresBetRepository {
    #[instrument(skip(self))]
    async fn get_bets_for_round(&self, round_id: i64) -> Result<Vec<BetModel>, AppError> {
        debug!(round_id, "Fetching bets for round from database");

        let rows = sqlx::query(
            "SELECT user_id, fixture_id, round_id, predicted, predicted_home, predicted_away, points \
             FROM bets WHERE round_id = $1 ORDER BY user_id, fixture_id",
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, round_id, "Failed to fetch bets from database");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter().map(row_to_bet).collect()
    }

    #[instrument(skip(self))]
    async fn record_points(
        &self,
        user_id: Uuid,
        fixture_id: i64,
        points: i32,
    ) -> Result<bool, AppError> {
        // NULL guard keeps the write set-once under retries
        let result = sqlx::query(
            "UPDATE bets SET points = $3 WHERE user_id = $1 AND fixture_id = $2 AND points IS NULL",
        )
        .bind(user_id)
        .bind(fixture_id)
        .bind(points)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, %user_id, fixture_id, "Failed to record bet points");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn overwrite_points(
        &self,
        user_id: Uuid,
        fixture_id: i64,
        points: i32,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE bets SET points = $3 WHERE user_id = $1 AND fixture_id = $2")
            .bind(user_id)
            .bind(fixture_id)
            .bind(points)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, %user_id, fixture_id, "Failed to overwrite bet points");
                AppError::DatabaseError(e.to_string())
            })?;

        if result.rows_affected() > 0 {
            info!(%user_id, fixture_id, points, "Bet points overwritten in database");
        }
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, round_ids))]
    async fn sum_scored_points_by_user(
        &self,
        round_ids: &[i64],
    ) -> Result<HashMap<Uuid, i64>, AppError> {
        debug!(rounds = round_ids.len(), "Summing scored bet points from database");

        let rows = sqlx::query(
            "SELECT user_id, COALESCE(SUM(points), 0) AS total \
             FROM bets WHERE round_id = ANY($1) AND points IS NOT NULL GROUP BY user_id",
        )
        .bind(round_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to sum bet points from database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows
            .iter()
            .map(|row| (row.get("user_id"), row.get("total")))
            .collect())
    }
}
