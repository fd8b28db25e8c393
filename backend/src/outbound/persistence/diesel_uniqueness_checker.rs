//! PostgreSQL-backed `UniquenessChecker` implementation.
//!
//! Lookups mirror the unique indexes: emails compare case-insensitively and
//! account names only clash with non-archived accounts.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UniquenessCheckError, UniquenessChecker};
use crate::domain::{AccountId, UserId, normalize_email};

use super::error_mapping::{StoreFailure, classify};
use super::pool::{DbPool, PoolError};
use super::schema::{accounts, users};

diesel::define_sql_function!(fn lower(value: Text) -> Text);

/// Diesel-backed implementation of the [`UniquenessChecker`] port.
#[derive(Clone)]
pub struct DieselUniquenessChecker {
    pool: DbPool,
}

impl DieselUniquenessChecker {
    /// Create a checker reading through `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UniquenessCheckError {
    UniquenessCheckError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> UniquenessCheckError {
    match classify(error, operation) {
        StoreFailure::Connection(message) => UniquenessCheckError::connection(message),
        StoreFailure::Conflict(message) | StoreFailure::Query(message) => {
            UniquenessCheckError::query(message)
        }
        StoreFailure::NotFound => UniquenessCheckError::query("record not found"),
    }
}

#[async_trait]
impl UniquenessChecker for DieselUniquenessChecker {
    async fn is_email_unique(
        &self,
        email: &str,
        exclude: Option<UserId>,
    ) -> Result<bool, UniquenessCheckError> {
        let mut query = users::table
            .filter(lower(users::email).eq(normalize_email(email)))
            .into_boxed();
        if let Some(id) = exclude {
            query = query.filter(users::id.ne(*id.as_uuid()));
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let holders: i64 = query
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "email uniqueness lookup"))?;
        Ok(holders == 0)
    }

    async fn is_account_name_unique(
        &self,
        name: &str,
        exclude: Option<AccountId>,
    ) -> Result<bool, UniquenessCheckError> {
        let mut query = accounts::table
            .filter(accounts::name.eq(name.trim().to_owned()))
            .filter(accounts::archived_at.is_null())
            .into_boxed();
        if let Some(id) = exclude {
            query = query.filter(accounts::id.ne(*id.as_uuid()));
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let holders: i64 = query
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "account name uniqueness lookup"))?;
        Ok(holders == 0)
    }
}
