use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::UserModel;
use crate::shared::AppError;

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError>;

    /// Fetches users for the given IDs. Missing IDs are skipped rather
    /// than failing the batch.
    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<UserModel>, AppError>;
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or replaces a user
    pub fn insert_user(&self, user: UserModel) {
        self.users.lock().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self))]
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError> {
        debug!(%user_id, "Fetching user from memory");

        let users = self.users.lock().unwrap();
        Ok(users.get(&user_id).cloned())
    }

    #[instrument(skip(self, user_ids))]
    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<UserModel>, AppError> {
        let users = self.users.lock().unwrap();
        let mut found: Vec<UserModel> = user_ids
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect();
        found.sort_by_key(|u| u.id);

        debug!(requested = user_ids.len(), found = found.len(), "Users fetched from memory");
        Ok(found)
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> UserModel {
    UserModel {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self))]
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError> {
        debug!(%user_id, "Fetching user from database");

        let row = sqlx::query("SELECT id, username, email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, %user_id, "Failed to fetch user from database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(row.as_ref().map(row_to_user))
    }

    #[instrument(skip(self, user_ids))]
    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<UserModel>, AppError> {
        let rows =
            sqlx::query("SELECT id, username, email FROM users WHERE id = ANY($1) ORDER BY id")
                .bind(user_ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    warn!(error = %e, "Failed to fetch users from database");
                    AppError::DatabaseError(e.to_string())
                })?;

        Ok(rows.iter().map(row_to_user).collect())
    }
}
