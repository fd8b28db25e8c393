//! PostgreSQL-backed `MembershipRepository` implementation.
//!
//! Roles are stored as `text[]` and status as `text`, both guarded by check
//! constraints. Every row read back is decoded through the closed enums; a
//! row holding an unknown value surfaces as
//! [`MembershipRepositoryError::InvalidEnumValue`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{MembershipRepository, MembershipRepositoryError};
use crate::domain::{
    AccountId, Claims, Membership, MembershipChanges, NewMembership, UserId,
};

use super::error_mapping::{StoreFailure, classify};
use super::models::{MembershipChangeset, MembershipRow, NewMembershipRow};
use super::pool::{DbPool, PoolError};
use super::schema::user_accounts;

/// Diesel-backed implementation of the [`MembershipRepository`] port.
#[derive(Clone)]
pub struct DieselMembershipRepository {
    pool: DbPool,
}

impl DieselMembershipRepository {
    /// Create a repository working through `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// What `create` found for the pair inside its transaction.
enum CreateOutcome {
    Inserted(MembershipRow),
    Revived(MembershipRow),
    AlreadyActive,
}

fn map_pool_error(error: PoolError) -> MembershipRepositoryError {
    MembershipRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> MembershipRepositoryError {
    match classify(error, operation) {
        StoreFailure::Connection(message) => MembershipRepositoryError::connection(message),
        StoreFailure::Conflict(constraint) => MembershipRepositoryError::conflict(constraint),
        StoreFailure::NotFound => MembershipRepositoryError::not_found(operation.to_owned()),
        StoreFailure::Query(message) => MembershipRepositoryError::query(message),
    }
}

fn decode(row: MembershipRow) -> Result<Membership, MembershipRepositoryError> {
    Membership::try_from(row).map_err(MembershipRepositoryError::invalid_enum_value)
}

fn pair_label(user_id: UserId, account_id: AccountId) -> String {
    format!("user {user_id} in account {account_id}")
}

#[async_trait]
impl MembershipRepository for DieselMembershipRepository {
    async fn create(
        &self,
        claims: &Claims,
        request: &NewMembership,
        now: DateTime<Utc>,
    ) -> Result<Membership, MembershipRepositoryError> {
        let user_id = *request.user_id.as_uuid();
        let account_id = *request.account_id.as_uuid();
        let roles = request.roles.encode();
        let status = request.effective_status().encode();

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let outcome = conn
            .transaction(|conn| {
                let roles = &roles;
                async move {
                    let existing: Option<MembershipRow> = user_accounts::table
                        .filter(user_accounts::user_id.eq(user_id))
                        .filter(user_accounts::account_id.eq(account_id))
                        .select(MembershipRow::as_select())
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;

                    match existing {
                        Some(row) if row.archived_at.is_none() => Ok(CreateOutcome::AlreadyActive),
                        Some(row) => {
                            let revived = diesel::update(user_accounts::table.find(row.id))
                                .set((
                                    user_accounts::roles.eq(roles),
                                    user_accounts::status.eq(status),
                                    user_accounts::updated_at.eq(now),
                                    user_accounts::archived_at.eq(None::<DateTime<Utc>>),
                                ))
                                .returning(MembershipRow::as_returning())
                                .get_result(conn)
                                .await?;
                            Ok(CreateOutcome::Revived(revived))
                        }
                        None => {
                            let new_row = NewMembershipRow {
                                id: Uuid::new_v4(),
                                user_id,
                                account_id,
                                roles,
                                status,
                                created_at: now,
                                updated_at: now,
                            };
                            let inserted = diesel::insert_into(user_accounts::table)
                                .values(&new_row)
                                .returning(MembershipRow::as_returning())
                                .get_result(conn)
                                .await?;
                            Ok(CreateOutcome::Inserted(inserted))
                        }
                    }
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "create membership"))?;

        let row = match outcome {
            CreateOutcome::Inserted(row) => row,
            CreateOutcome::Revived(row) => {
                debug!(membership_id = %row.id, "archived membership revived");
                row
            }
            CreateOutcome::AlreadyActive => {
                return Err(MembershipRepositoryError::conflict(pair_label(
                    request.user_id,
                    request.account_id,
                )));
            }
        };
        debug!(membership_id = %row.id, actor = ?claims.subject(), "membership row written");
        decode(row)
    }

    async fn find(
        &self,
        user_id: UserId,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Option<Membership>, MembershipRepositoryError> {
        let mut query = user_accounts::table
            .filter(user_accounts::user_id.eq(*user_id.as_uuid()))
            .filter(user_accounts::account_id.eq(*account_id.as_uuid()))
            .select(MembershipRow::as_select())
            .into_boxed();
        if !include_archived {
            query = query.filter(user_accounts::archived_at.is_null());
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<MembershipRow> = query
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find membership"))?;
        row.map(decode).transpose()
    }

    async fn list_for_account(
        &self,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Vec<Membership>, MembershipRepositoryError> {
        let mut query = user_accounts::table
            .filter(user_accounts::account_id.eq(*account_id.as_uuid()))
            .select(MembershipRow::as_select())
            .order_by((user_accounts::created_at.asc(), user_accounts::id.asc()))
            .into_boxed();
        if !include_archived {
            query = query.filter(user_accounts::archived_at.is_null());
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MembershipRow> = query
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list memberships"))?;
        rows.into_iter().map(decode).collect()
    }

    async fn update(
        &self,
        user_id: UserId,
        account_id: AccountId,
        changes: &MembershipChanges,
        now: DateTime<Utc>,
    ) -> Result<Membership, MembershipRepositoryError> {
        let roles = changes.roles.as_ref().map(|roles| roles.encode());
        let changeset = MembershipChangeset {
            roles: roles.as_deref(),
            status: changes.status.map(|status| status.encode()),
            updated_at: now,
        };

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<MembershipRow> = diesel::update(user_accounts::table)
            .filter(user_accounts::user_id.eq(*user_id.as_uuid()))
            .filter(user_accounts::account_id.eq(*account_id.as_uuid()))
            .filter(user_accounts::archived_at.is_null())
            .set(&changeset)
            .returning(MembershipRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "update membership"))?;

        match row {
            Some(row) => decode(row),
            None => Err(MembershipRepositoryError::not_found(pair_label(
                user_id, account_id,
            ))),
        }
    }

    async fn archive(
        &self,
        user_id: UserId,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<(), MembershipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let archived = diesel::update(user_accounts::table)
            .filter(user_accounts::user_id.eq(*user_id.as_uuid()))
            .filter(user_accounts::account_id.eq(*account_id.as_uuid()))
            .filter(user_accounts::archived_at.is_null())
            .set((
                user_accounts::archived_at.eq(Some(now)),
                user_accounts::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "archive membership"))?;

        if archived == 0 {
            return Err(MembershipRepositoryError::not_found(pair_label(
                user_id, account_id,
            )));
        }
        Ok(())
    }

    async fn delete(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<(), MembershipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            user_accounts::table
                .filter(user_accounts::user_id.eq(*user_id.as_uuid()))
                .filter(user_accounts::account_id.eq(*account_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(|err| map_diesel_error(err, "delete membership"))?;

        if deleted == 0 {
            return Err(MembershipRepositoryError::not_found(pair_label(
                user_id, account_id,
            )));
        }
        Ok(())
    }
}
