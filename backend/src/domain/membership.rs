//! Membership of a user in an account, with its role set and lifecycle status.
//!
//! Roles and statuses are closed enumerations. Their persisted form is plain
//! text (`text[]` for roles, `text` for status); every conversion from text
//! goes through [`Role::decode`] or [`Status::decode`], so a row or request
//! carrying an unknown value is rejected as a whole.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, MembershipId, UserId};

/// Which closed enumeration a rejected value was decoded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumKind {
    /// [`Role`].
    Role,
    /// [`Status`].
    Status,
}

impl fmt::Display for EnumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role => f.write_str("membership role"),
            Self::Status => f.write_str("membership status"),
        }
    }
}

/// A raw value outside the membership role or status enumeration.
///
/// Only reachable when a row or request bypassed validation, so callers treat
/// it as data corruption rather than user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value `{value}`")]
pub struct InvalidEnumValue {
    kind: EnumKind,
    value: String,
}

impl InvalidEnumValue {
    /// Record a rejected raw value.
    pub fn new(kind: EnumKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Enumeration the value was decoded against.
    pub fn kind(&self) -> EnumKind {
        self.kind
    }

    /// The rejected raw value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Capability label on a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Role {
    /// Full access to the account.
    Admin,
    /// Least-privilege access to the account.
    User,
}

impl Role {
    /// Every member of the enumeration, in declaration order.
    pub const ALL: [Self; 2] = [Self::Admin, Self::User];

    /// Decode the persisted text form.
    pub fn decode(raw: &str) -> Result<Self, InvalidEnumValue> {
        match raw {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(InvalidEnumValue::new(EnumKind::Role, other)),
        }
    }

    /// Persisted text form.
    pub const fn encode(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

impl FromStr for Role {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl TryFrom<String> for Role {
    type Error = InvalidEnumValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::decode(&value)
    }
}

impl From<Role> for &'static str {
    fn from(value: Role) -> Self {
        value.encode()
    }
}

/// Lifecycle label on a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Status {
    /// The user can access the account.
    #[default]
    Active,
    /// The user has been invited but has not joined yet.
    Invited,
    /// The user is blocked from the account.
    Disabled,
}

impl Status {
    /// Every member of the enumeration, in declaration order.
    pub const ALL: [Self; 3] = [Self::Active, Self::Invited, Self::Disabled];

    /// Decode the persisted text form.
    pub fn decode(raw: &str) -> Result<Self, InvalidEnumValue> {
        match raw {
            "active" => Ok(Self::Active),
            "invited" => Ok(Self::Invited),
            "disabled" => Ok(Self::Disabled),
            other => Err(InvalidEnumValue::new(EnumKind::Status, other)),
        }
    }

    /// Persisted text form.
    pub const fn encode(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Invited => "invited",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

impl FromStr for Status {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl TryFrom<String> for Status {
    type Error = InvalidEnumValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::decode(&value)
    }
}

impl From<Status> for &'static str {
    fn from(value: Status) -> Self {
        value.encode()
    }
}

/// Structural problems with membership values built in memory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipValidationError {
    /// A membership must carry at least one role.
    #[error("a membership requires at least one role")]
    EmptyRoles,
}

/// Non-empty role collection for one membership.
///
/// Order follows insertion and duplicates are kept as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Roles(Vec<Role>);

impl Roles {
    /// Build a role collection, rejecting an empty one.
    pub fn new(roles: Vec<Role>) -> Result<Self, MembershipValidationError> {
        if roles.is_empty() {
            return Err(MembershipValidationError::EmptyRoles);
        }
        Ok(Self(roles))
    }

    /// The single-role collection granted to an account's first member.
    pub fn admin() -> Self {
        Self(vec![Role::Admin])
    }

    /// Encode as the persisted array of role strings.
    pub fn encode(&self) -> Vec<String> {
        self.0.iter().map(|role| role.encode().to_owned()).collect()
    }

    /// Decode a persisted array; any unknown element fails the whole decode.
    ///
    /// An empty array decodes to an error as well because the collection can
    /// never be empty in memory.
    pub fn decode<S: AsRef<str>>(raw: &[S]) -> Result<Self, InvalidEnumValue> {
        let roles = raw
            .iter()
            .map(|value| Role::decode(value.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if roles.is_empty() {
            return Err(InvalidEnumValue::new(EnumKind::Role, ""));
        }
        Ok(Self(roles))
    }

    /// Whether the collection grants `role`.
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Iterate roles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the roles as a slice.
    pub fn as_slice(&self) -> &[Role] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Roles {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Vec::<String>::deserialize(deserializer)?;
        Self::decode(&raw).map_err(serde::de::Error::custom)
    }
}

/// Association of exactly one user with exactly one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    /// Row identifier.
    pub id: MembershipId,
    /// Member user.
    pub user_id: UserId,
    /// Account the user belongs to.
    pub account_id: AccountId,
    /// Granted roles.
    pub roles: Roles,
    /// Lifecycle status.
    pub status: Status,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Set when the membership has been soft deleted.
    pub archived_at: Option<DateTime<Utc>>,
}

impl Membership {
    /// Whether the membership has been soft deleted.
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// Typed creation request for a membership.
///
/// `status` of `None` lets the creator apply [`Status::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMembership {
    /// Member user.
    pub user_id: UserId,
    /// Target account.
    pub account_id: AccountId,
    /// Roles to grant.
    pub roles: Roles,
    /// Explicit status, if any.
    pub status: Option<Status>,
}

impl NewMembership {
    /// Status that will be persisted for this request.
    pub fn effective_status(&self) -> Status {
        self.status.unwrap_or_default()
    }
}

/// Replacement values for an existing membership.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MembershipChanges {
    /// New role set, if changing.
    pub roles: Option<Roles>,
    /// New status, if changing.
    pub status: Option<Status>,
}
