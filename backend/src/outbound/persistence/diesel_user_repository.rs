//! PostgreSQL-backed `UserCreator` implementation.
//!
//! Passwords are hashed through the injected [`CredentialHasher`] on the
//! blocking pool before the insert; only the hash is stored.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{CredentialHasher, UserCreationError, UserCreator};
use crate::domain::{Claims, NewUser, User};

use super::error_mapping::{StoreFailure, classify};
use super::models::{NewUserRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the [`UserCreator`] port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
    hasher: Arc<dyn CredentialHasher>,
}

impl DieselUserRepository {
    /// Create a repository writing through `pool`.
    pub fn new(pool: DbPool, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { pool, hasher }
    }

    async fn hash_password(&self, request: &NewUser) -> Result<String, UserCreationError> {
        let hasher = Arc::clone(&self.hasher);
        let password = request.password.clone();
        tokio::task::spawn_blocking(move || hasher.hash(password.as_str()))
            .await
            .map_err(|err| UserCreationError::credentials(err.to_string()))?
            .map_err(|err| UserCreationError::credentials(err.to_string()))
    }
}

fn map_pool_error(error: PoolError) -> UserCreationError {
    UserCreationError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> UserCreationError {
    match classify(error, "insert user") {
        StoreFailure::Connection(message) => UserCreationError::connection(message),
        StoreFailure::Conflict(constraint) => UserCreationError::conflict(constraint),
        StoreFailure::NotFound => UserCreationError::query("inserted user was not returned"),
        StoreFailure::Query(message) => UserCreationError::query(message),
    }
}

#[async_trait]
impl UserCreator for DieselUserRepository {
    async fn create(
        &self,
        claims: &Claims,
        request: &NewUser,
        now: DateTime<Utc>,
    ) -> Result<User, UserCreationError> {
        let password_hash = self.hash_password(request).await?;
        let row = NewUserRow {
            id: Uuid::new_v4(),
            first_name: &request.first_name,
            last_name: &request.last_name,
            email: &request.email,
            password_hash: &password_hash,
            timezone: request.timezone.as_deref(),
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let created: UserRow = diesel::insert_into(users::table)
            .values(&row)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        debug!(user_id = %created.id, actor = ?claims.subject(), "user row inserted");
        Ok(created.into())
    }
}
