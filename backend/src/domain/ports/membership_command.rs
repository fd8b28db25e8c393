//! Driving port for administering account memberships.
//!
//! Requests arrive with raw text identifiers, roles and statuses; the service
//! validates and decodes them before any storage call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{AccountId, Claims, Error, Membership, UserId};

/// Raw request to add a user to an account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct MembershipRequest {
    /// Member user identifier (UUID).
    pub user_id: String,
    /// Target account identifier (UUID).
    pub account_id: String,
    /// Roles to grant; must name at least one of `admin`, `user`.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Optional status; defaults to `invited` for invitations.
    #[serde(default)]
    pub status: Option<String>,
}

/// Raw request to change an existing membership.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct MembershipUpdateRequest {
    /// Member user identifier (UUID).
    pub user_id: String,
    /// Account identifier (UUID).
    pub account_id: String,
    /// Replacement roles, when changing them.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    /// Replacement status, when changing it.
    #[serde(default)]
    pub status: Option<String>,
}

/// Driving port for membership administration by account admins.
#[async_trait]
pub trait MembershipCommand: Send + Sync {
    /// Invite a user into an account, reviving an archived membership.
    async fn invite(
        &self,
        claims: &Claims,
        request: MembershipRequest,
        now: DateTime<Utc>,
    ) -> Result<Membership, Error>;

    /// Replace roles and/or status of a membership.
    async fn update(
        &self,
        claims: &Claims,
        request: MembershipUpdateRequest,
        now: DateTime<Utc>,
    ) -> Result<Membership, Error>;

    /// Soft delete a membership.
    async fn archive(
        &self,
        claims: &Claims,
        user_id: UserId,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Remove a membership permanently.
    async fn delete(
        &self,
        claims: &Claims,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<(), Error>;

    /// Fetch one membership.
    async fn find(
        &self,
        claims: &Claims,
        user_id: UserId,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Membership, Error>;

    /// List the memberships of an account.
    async fn list_for_account(
        &self,
        claims: &Claims,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Vec<Membership>, Error>;
}
