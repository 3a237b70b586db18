use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{CompetitionType, SeasonWinnerModel};
use crate::shared::AppError;

/// Trait for season winner repository operations.
///
/// Writes are conflict-guarded on (season_id, competition_type, user_id)
/// so retried or concurrent determinations cannot produce duplicates.
#[async_trait]
pub trait SeasonWinnerRepository {
    async fn winners_exist(
        &self,
        season_id: i64,
        competition_type: CompetitionType,
    ) -> Result<bool, AppError>;

    /// Inserts winner rows, ignoring any that already exist. Returns the
    /// number of rows actually written.
    async fn insert_winners(&self, winners: &[SeasonWinnerModel]) -> Result<u64, AppError>;

    async fn get_winners_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonWinnerModel>, AppError>;
}

/// In-memory implementation of SeasonWinnerRepository for development and
/// testing
pub struct InMemorySeasonWinnerRepository {
    winners: Mutex<HashMap<(i64, CompetitionType, Uuid), SeasonWinnerModel>>,
}

impl Default for InMemorySeasonWinnerRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySeasonWinnerRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            winners: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the current number of winner rows
    pub fn winner_count(&self) -> usize {
        self.winners.lock().unwrap().len()
    }
}

#[async_trait]
impl SeasonWinnerRepository for InMemorySeasonWinnerRepository {
    #[instrument(skip(self))]
    async fn winners_exist(
        &self,
        season_id: i64,
        competition_type: CompetitionType,
    ) -> Result<bool, AppError> {
        let winners = self.winners.lock().unwrap();
        Ok(winners
            .keys()
            .any(|(s, c, _)| *s == season_id && *c == competition_type))
    }

    #[instrument(skip(self, winners))]
    async fn insert_winners(&self, winners: &[SeasonWinnerModel]) -> Result<u64, AppError> {
        let mut store = self.winners.lock().unwrap();
        let mut written = 0;

        for winner in winners {
            let key = (winner.season_id, winner.competition_type, winner.user_id);
            // Mirror of the unique-constraint guard: existing rows win
            if let std::collections::hash_map::Entry::Vacant(entry) = store.entry(key) {
                entry.insert(winner.clone());
                written += 1;
            }
        }

        debug!(requested = winners.len(), written, "Winner rows inserted in memory");
        Ok(written)
    }

    #[instrument(skip(self))]
    async fn get_winners_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonWinnerModel>, AppError> {
        let winners = self.winners.lock().unwrap();
        let mut matching: Vec<SeasonWinnerModel> = winners
            .values()
            .filter(|w| w.season_id == season_id)
            .cloned()
            .collect();
        matching.sort_by_key(|w| (w.competition_type, w.user_id));

        Ok(matching)
    }
}

/// PostgreSQL implementation of season winner repository
pub struct PostgresSeasonWinnerRepository {
    pool: PgPool,
}

impl PostgresSeasonWinnerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SeasonWinnerRepository for PostgresSeasonWinnerRepository {
    #[instrument(skip(self))]
    async fn winners_exist(
        &self,
        season_id: i64,
        competition_type: CompetitionType,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM season_winners \
             WHERE season_id = $1 AND competition_type = $2) AS present",
        )
        .bind(season_id)
        .bind(competition_type.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, season_id, "Failed to check for existing winners");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.get("present"))
    }

    #[instrument(skip(self, winners))]
    async fn insert_winners(&self, winners: &[SeasonWinnerModel]) -> Result<u64, AppError> {
        let mut written = 0;

        for winner in winners {
            // ON CONFLICT keeps retried and concurrent runs duplicate-free
            let result = sqlx::query(
                "INSERT INTO season_winners (season_id, competition_type, user_id, final_points) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (season_id, competition_type, user_id) DO NOTHING",
            )
            .bind(winner.season_id)
            .bind(winner.competition_type.to_string())
            .bind(winner.user_id)
            .bind(winner.final_points)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(
                    error = %e,
                    season_id = winner.season_id,
                    user_id = %winner.user_id,
                    "Failed to insert winner row"
                );
                AppError::DatabaseError(e.to_string())
            })?;

            written += result.rows_affected();
        }

        if written > 0 {
            info!(written, "Winner rows inserted in database");
        }
        Ok(written)
    }

    #[instrument(skip(self))]
    async fn get_winners_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<SeasonWinnerModel>, AppError> {
        let rows = sqlx::query(
            "SELECT season_id, competition_type, user_id, final_points \
             FROM season_winners WHERE season_id = $1 ORDER BY competition_type, user_id",
        )
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, season_id, "Failed to fetch season winners");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter()
            .map(|row| {
                let type_text: String = row.get("competition_type");
                let competition_type: CompetitionType = type_text.parse().map_err(|_| {
                    warn!(competition_type = %type_text, "Unknown competition type in database");
                    AppError::DatabaseError(format!("unknown competition type: {}", type_text))
                })?;
                Ok(SeasonWinnerModel {
                    season_id: row.get("season_id"),
                    competition_type,
                    user_id: row.get("user_id"),
                    final_points: row.get("final_points"),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winner(season_id: i64, user_id: Uuid) -> SeasonWinnerModel {
        SeasonWinnerModel {
            season_id,
            competition_type: CompetitionType::League,
            user_id,
            final_points: 50,
        }
    }

    #[tokio::test]
    async fn test_insert_winners_is_conflict_guarded() {
        let repo = InMemorySeasonWinnerRepository::new();
        let user = Uuid::new_v4();

        let first = repo.insert_winners(&[winner(1, user)]).await.unwrap();
        let second = repo.insert_winners(&[winner(1, user)]).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(repo.winner_count(), 1);
    }

    #[tokio::test]
    async fn test_winners_exist_is_scoped_to_competition() {
        let repo = InMemorySeasonWinnerRepository::new();
        repo.insert_winners(&[winner(1, Uuid::new_v4())])
            .await
            .unwrap();

        assert!(repo
            .winners_exist(1, CompetitionType::League)
            .await
            .unwrap());
        assert!(!repo
            .winners_exist(1, CompetitionType::LastRoundSpecial)
            .await
            .unwrap());
        assert!(!repo
            .winners_exist(2, CompetitionType::League)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_tied_winners_both_stored() {
        let repo = InMemorySeasonWinnerRepository::new();
        let rows = vec![winner(1, Uuid::new_v4()), winner(1, Uuid::new_v4())];

        let written = repo.insert_winners(&rows).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(repo.get_winners_for_season(1).await.unwrap().len(), 2);
    }
}
