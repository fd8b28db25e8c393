//! In-process implementation of every storage port.
//!
//! Applies the same uniqueness rules as the PostgreSQL schema (case-insensitive
//! email, account name unique among non-archived accounts, one membership per
//! pair), so workflows behave identically without a database. Used by
//! integration tests and local dry runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    AccountCreationError, AccountCreator, MembershipRepository, MembershipRepositoryError,
    UniquenessCheckError, UniquenessChecker, UserCreationError, UserCreator,
};
use crate::domain::{
    Account, AccountId, Claims, Membership, MembershipChanges, MembershipId, NewAccount,
    NewMembership, NewUser, User, UserId, normalize_email,
};

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    accounts: Vec<Account>,
    memberships: Vec<Membership>,
    account_failure: Option<String>,
    membership_failure: Option<String>,
}

/// Shared in-memory user, account and membership store.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every following account insert fail with a query error.
    pub fn fail_account_creation(&self, message: impl Into<String>) {
        self.state().account_failure = Some(message.into());
    }

    /// Make every following membership insert fail with a query error.
    pub fn fail_membership_creation(&self, message: impl Into<String>) {
        self.state().membership_failure = Some(message.into());
    }

    /// Snapshot of stored users.
    pub fn users(&self) -> Vec<User> {
        self.state().users.clone()
    }

    /// Snapshot of stored accounts.
    pub fn accounts(&self) -> Vec<Account> {
        self.state().accounts.clone()
    }

    /// Snapshot of stored memberships, archived ones included.
    pub fn memberships(&self) -> Vec<Membership> {
        self.state().memberships.clone()
    }
}

fn email_taken(state: &State, email: &str, exclude: Option<UserId>) -> bool {
    let email = normalize_email(email);
    state
        .users
        .iter()
        .any(|user| Some(user.id) != exclude && normalize_email(&user.email) == email)
}

fn name_taken(state: &State, name: &str, exclude: Option<AccountId>) -> bool {
    let name = name.trim();
    state.accounts.iter().any(|account| {
        Some(account.id) != exclude && account.archived_at.is_none() && account.name == name
    })
}

fn pair_label(user_id: UserId, account_id: AccountId) -> String {
    format!("user {user_id} in account {account_id}")
}

#[async_trait]
impl UniquenessChecker for InMemoryDirectory {
    async fn is_email_unique(
        &self,
        email: &str,
        exclude: Option<UserId>,
    ) -> Result<bool, UniquenessCheckError> {
        Ok(!email_taken(&self.state(), email, exclude))
    }

    async fn is_account_name_unique(
        &self,
        name: &str,
        exclude: Option<AccountId>,
    ) -> Result<bool, UniquenessCheckError> {
        Ok(!name_taken(&self.state(), name, exclude))
    }
}

#[async_trait]
impl UserCreator for InMemoryDirectory {
    async fn create(
        &self,
        _claims: &Claims,
        request: &NewUser,
        now: DateTime<Utc>,
    ) -> Result<User, UserCreationError> {
        let mut state = self.state();
        if email_taken(&state, &request.email, None) {
            return Err(UserCreationError::conflict("users_email_lower_key"));
        }
        let user = User {
            id: UserId::random(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: normalize_email(&request.email),
            timezone: request.timezone.clone(),
            created_at: now,
            updated_at: now,
            archived_at: None,
        };
        state.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl AccountCreator for InMemoryDirectory {
    async fn create(
        &self,
        _claims: &Claims,
        request: &NewAccount,
        now: DateTime<Utc>,
    ) -> Result<Account, AccountCreationError> {
        let mut state = self.state();
        if let Some(message) = &state.account_failure {
            return Err(AccountCreationError::query(message.clone()));
        }
        if name_taken(&state, &request.name, None) {
            return Err(AccountCreationError::conflict("accounts_name_active_key"));
        }
        let account = Account {
            id: AccountId::random(),
            name: request.name.trim().to_owned(),
            address1: request.address1.clone(),
            address2: request.address2.clone(),
            city: request.city.clone(),
            region: request.region.clone(),
            country: request.country.clone(),
            zipcode: request.zipcode.clone(),
            status: request.status.unwrap_or_default(),
            timezone: request.timezone.clone(),
            signup_user_id: request.signup_user_id,
            billing_user_id: request.billing_user_id,
            created_at: now,
            updated_at: now,
            archived_at: None,
        };
        state.accounts.push(account.clone());
        Ok(account)
    }
}

#[async_trait]
impl MembershipRepository for InMemoryDirectory {
    async fn create(
        &self,
        _claims: &Claims,
        request: &NewMembership,
        now: DateTime<Utc>,
    ) -> Result<Membership, MembershipRepositoryError> {
        let mut state = self.state();
        if let Some(message) = &state.membership_failure {
            return Err(MembershipRepositoryError::query(message.clone()));
        }
        let existing = state
            .memberships
            .iter_mut()
            .find(|m| m.user_id == request.user_id && m.account_id == request.account_id);
        match existing {
            Some(membership) if !membership.is_archived() => Err(
                MembershipRepositoryError::conflict(pair_label(request.user_id, request.account_id)),
            ),
            Some(membership) => {
                membership.roles = request.roles.clone();
                membership.status = request.effective_status();
                membership.updated_at = now;
                membership.archived_at = None;
                Ok(membership.clone())
            }
            None => {
                let membership = Membership {
                    id: MembershipId::random(),
                    user_id: request.user_id,
                    account_id: request.account_id,
                    roles: request.roles.clone(),
                    status: request.effective_status(),
                    created_at: now,
                    updated_at: now,
                    archived_at: None,
                };
                state.memberships.push(membership.clone());
                Ok(membership)
            }
        }
    }

    async fn find(
        &self,
        user_id: UserId,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Option<Membership>, MembershipRepositoryError> {
        Ok(self
            .state()
            .memberships
            .iter()
            .find(|m| {
                m.user_id == user_id
                    && m.account_id == account_id
                    && (include_archived || !m.is_archived())
            })
            .cloned())
    }

    async fn list_for_account(
        &self,
        account_id: AccountId,
        include_archived: bool,
    ) -> Result<Vec<Membership>, MembershipRepositoryError> {
        Ok(self
            .state()
            .memberships
            .iter()
            .filter(|m| m.account_id == account_id && (include_archived || !m.is_archived()))
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        user_id: UserId,
        account_id: AccountId,
        changes: &MembershipChanges,
        now: DateTime<Utc>,
    ) -> Result<Membership, MembershipRepositoryError> {
        let mut state = self.state();
        let membership = state
            .memberships
            .iter_mut()
            .find(|m| m.user_id == user_id && m.account_id == account_id && !m.is_archived())
            .ok_or_else(|| MembershipRepositoryError::not_found(pair_label(user_id, account_id)))?;
        if let Some(roles) = &changes.roles {
            membership.roles = roles.clone();
        }
        if let Some(status) = changes.status {
            membership.status = status;
        }
        membership.updated_at = now;
        Ok(membership.clone())
    }

    async fn archive(
        &self,
        user_id: UserId,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<(), MembershipRepositoryError> {
        let mut state = self.state();
        let membership = state
            .memberships
            .iter_mut()
            .find(|m| m.user_id == user_id && m.account_id == account_id && !m.is_archived())
            .ok_or_else(|| MembershipRepositoryError::not_found(pair_label(user_id, account_id)))?;
        membership.archived_at = Some(now);
        membership.updated_at = now;
        Ok(())
    }

    async fn delete(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<(), MembershipRepositoryError> {
        let mut state = self.state();
        let before = state.memberships.len();
        state
            .memberships
            .retain(|m| !(m.user_id == user_id && m.account_id == account_id));
        if state.memberships.len() == before {
            return Err(MembershipRepositoryError::not_found(pair_label(
                user_id, account_id,
            )));
        }
        Ok(())
    }
}
