//! PostgreSQL-backed `AccountCreator` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{AccountCreationError, AccountCreator};
use crate::domain::{Account, Claims, NewAccount};

use super::error_mapping::{StoreFailure, classify};
use super::models::{AccountRow, NewAccountRow};
use super::pool::{DbPool, PoolError};
use super::schema::accounts;

/// Diesel-backed implementation of the [`AccountCreator`] port.
#[derive(Clone)]
pub struct DieselAccountRepository {
    pool: DbPool,
}

impl DieselAccountRepository {
    /// Create a repository writing through `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> AccountCreationError {
    AccountCreationError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> AccountCreationError {
    match classify(error, "insert account") {
        StoreFailure::Connection(message) => AccountCreationError::connection(message),
        StoreFailure::Conflict(constraint) => AccountCreationError::conflict(constraint),
        StoreFailure::NotFound => AccountCreationError::query("inserted account was not returned"),
        StoreFailure::Query(message) => AccountCreationError::query(message),
    }
}

#[async_trait]
impl AccountCreator for DieselAccountRepository {
    async fn create(
        &self,
        claims: &Claims,
        request: &NewAccount,
        now: DateTime<Utc>,
    ) -> Result<Account, AccountCreationError> {
        let status = request.status.unwrap_or_default();
        let row = NewAccountRow {
            id: Uuid::new_v4(),
            name: &request.name,
            address1: &request.address1,
            address2: request.address2.as_deref(),
            city: &request.city,
            region: &request.region,
            country: &request.country,
            zipcode: &request.zipcode,
            status: status.as_str(),
            timezone: request.timezone.as_deref(),
            signup_user_id: request.signup_user_id.map(|id| *id.as_uuid()),
            billing_user_id: request.billing_user_id.map(|id| *id.as_uuid()),
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let created: AccountRow = diesel::insert_into(accounts::table)
            .values(&row)
            .returning(AccountRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        debug!(account_id = %created.id, actor = ?claims.subject(), "account row inserted");
        created.into_domain().ok_or_else(|| {
            AccountCreationError::query("inserted account carries an unknown status")
        })
    }
}
