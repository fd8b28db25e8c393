//! Membership administration for account admins.
//!
//! Every operation first checks that the caller administers the target
//! account, so field failures are only reported to that account's admins.
//! Requests are validated and decoded before any storage call.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::ports::{
    MembershipCommand, MembershipRepository, MembershipRepositoryError, MembershipRequest,
    MembershipUpdateRequest,
};
use crate::domain::validation::{ContextualValidator, FieldErrors};
use crate::domain::{AccountId, Claims, Error, Membership, Status, UserId};

/// Domain service implementing [`MembershipCommand`].
#[derive(Clone)]
pub struct MembershipService<M> {
    memberships: Arc<M>,
    validator: ContextualValidator,
}

impl<M> MembershipService<M> {
    /// Create a new membership service.
    pub fn new(memberships: Arc<M>, validator: ContextualValidator) -> Self {
        Self {
            memberships,
            validator,
        }
    }
}

#[async_trait]
impl<M> MembershipCommand for MembershipService<M>
where
    M: MembershipRepository,
{
    async fn invite(
        &self,
        claims: &Claims,
        request: MembershipRequest,
        now: DateTime<Utc>,
    ) -> Result<Membership, Error> {
        authorize_raw(claims, &request.account_id)?;
        let mut membership = self
            .validator
            .validate_membership(&request)
            .map_err(invalid_membership)?;
        membership.status.get_or_insert(Status::Invited);

        let created = self
            .memberships
            .create(claims, &membership, now)
            .await
            .map_err(map_repository_error)?;
        info!(
            user_id = %created.user_id,
            account_id = %created.account_id,
            status = %created.status,
            "membership invited"
        );
        Ok(created)
    }

    async fn update(
        &self,
        claims: &Claims,
        request: MembershipUpdateRequest,
        now: DateTime<Utc>,
    ) -> Result<Membership, Error> {
        authorize_raw(claims, &request.account_id)?;
        let (user_id, account_id, changes) = self
            .validator
            .validate_membership_update(&request)
            .map_err(invalid_membership)?;

        self.memberships
            .update(user_id, account_id, &changes, now)
            .await
            .map_err(map_repository_error)
    }

    async fn archive(
        &self,
        claims: &Claims,
        user_id: UserId,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        authorize(claims, &account_id)?;
        self.memberships
            .archive(user_id, account_id, now)
            .await
            .map_err(map_repository_error)?;
        info!(%user_id, %account_id, "membership archived");
        Ok(())
    }

    async fn delete(
        &self,
        claims: &Claims,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<(), Error> {
        authorize(claims, &account_id)?;
        self.memberships
            .delete(user_id, account_id)
            .await
            .map_err(map_repository_error)?;
        info!(%user_id, %account_id, "membership deleted");
        Ok(())
    }

    async fn find(
        &self,
        claims: &Claims,
        user_id: UserId,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Membership, Error> {
        authorize(claims, &account_id)?;
        self.memberships
            .find(user_id, account_id, include_archived)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("no membership for user {user_id} in account {account_id}")))
    }

    async fn list_for_account(
        &self,
        claims: &Claims,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Vec<Membership>, Error> {
        authorize(claims, &account_id)?;
        self.memberships
            .list_for_account(account_id, include_archived)
            .await
            .map_err(map_repository_error)
    }
}

fn authorize(claims: &Claims, account_id: &AccountId) -> Result<(), Error> {
    if claims.is_admin_of(account_id) {
        return Ok(());
    }
    Err(Error::forbidden(format!(
        "caller does not administer account {account_id}"
    )))
}

/// Authorize against the undecoded account id. An id that does not parse names
/// no account and is left for validation to report.
fn authorize_raw(claims: &Claims, raw_account_id: &str) -> Result<(), Error> {
    match AccountId::new(raw_account_id) {
        Ok(account_id) => authorize(claims, &account_id),
        Err(_) => Ok(()),
    }
}

fn invalid_membership(fields: FieldErrors) -> Error {
    Error::invalid_request("membership request is invalid").with_details(fields.to_json())
}

fn map_repository_error(error: MembershipRepositoryError) -> Error {
    match error {
        MembershipRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("membership store unavailable: {message}"))
        }
        MembershipRepositoryError::Conflict { message } => {
            Error::conflict(format!("membership already exists: {message}"))
        }
        MembershipRepositoryError::NotFound { message } => {
            Error::not_found(format!("membership not found: {message}"))
        }
        other => Error::internal(other.to_string()),
    }
}
