//! Driven port for membership persistence.
//!
//! Memberships are keyed by the `(user_id, account_id)` pair. Creating a
//! membership for a pair whose row is archived revives that row with the new
//! roles and status instead of inserting a second one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AccountId, Claims, InvalidEnumValue, Membership, MembershipChanges, NewMembership, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by membership repositories.
    pub enum MembershipRepositoryError {
        /// Store connection could not be established.
        Connection { message: String } => "membership store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "membership store query failed: {message}",
        /// An active membership already links the pair.
        Conflict { message: String } => "membership already exists: {message}",
        /// No membership links the pair.
        NotFound { message: String } => "membership not found: {message}",
        /// A stored row carries a role or status outside the enumerations.
        InvalidEnumValue { value: InvalidEnumValue } => "membership row is corrupt: {value}",
    }
}

/// Port for creating, reading and retiring memberships.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Create (or un-archive) the membership for the request's pair.
    async fn create(
        &self,
        claims: &Claims,
        request: &NewMembership,
        now: DateTime<Utc>,
    ) -> Result<Membership, MembershipRepositoryError>;

    /// Fetch the membership for a pair.
    async fn find(
        &self,
        user_id: UserId,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Option<Membership>, MembershipRepositoryError>;

    /// List memberships of an account, oldest first.
    async fn list_for_account(
        &self,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Vec<Membership>, MembershipRepositoryError>;

    /// Replace roles and/or status of a non-archived membership.
    async fn update(
        &self,
        user_id: UserId,
        account_id: AccountId,
        changes: &MembershipChanges,
        now: DateTime<Utc>,
    ) -> Result<Membership, MembershipRepositoryError>;

    /// Soft delete a non-archived membership.
    async fn archive(
        &self,
        user_id: UserId,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<(), MembershipRepositoryError>;

    /// Remove a membership row entirely.
    async fn delete(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<(), MembershipRepositoryError>;
}
