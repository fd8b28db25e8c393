//! Caller identity and permission scope.
//!
//! Claims are issued by an external authentication collaborator. The domain
//! only reads them: creators receive them for auditing, and the membership
//! service uses them to authorise administrative actions.

use super::ids::{AccountId, UserId};
use super::membership::Role;

/// Authenticated (or anonymous) caller of a domain operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Claims {
    subject: Option<UserId>,
    account_id: Option<AccountId>,
    roles: Vec<Role>,
}

impl Claims {
    /// Claims for an unauthenticated caller such as a public signup form.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Claims for a user acting within one of their accounts.
    pub fn for_member(subject: UserId, account_id: AccountId, roles: Vec<Role>) -> Self {
        Self {
            subject: Some(subject),
            account_id: Some(account_id),
            roles,
        }
    }

    /// The authenticated user, if any.
    pub fn subject(&self) -> Option<&UserId> {
        self.subject.as_ref()
    }

    /// The account the caller is currently acting in.
    pub fn account_id(&self) -> Option<&AccountId> {
        self.account_id.as_ref()
    }

    /// Whether the caller holds `role` in their current account.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the caller administers `account_id`.
    pub fn is_admin_of(&self, account_id: &AccountId) -> bool {
        self.subject.is_some()
            && self.account_id.as_ref() == Some(account_id)
            && self.has_role(Role::Admin)
    }
}
