//! Account (tenant) model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, UserId};

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Usable account.
    #[default]
    Active,
    /// Awaiting activation.
    Pending,
    /// Blocked account.
    Disabled,
}

impl AccountStatus {
    /// Persisted text form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Disabled => "disabled",
        }
    }

    /// Parse the persisted text form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tenant that owns billing and resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Stable identifier generated on creation.
    pub id: AccountId,
    /// Display name, unique among non-archived accounts.
    pub name: String,
    /// First address line.
    pub address1: String,
    /// Second address line.
    pub address2: Option<String>,
    /// City.
    pub city: String,
    /// Region or state.
    pub region: String,
    /// Country.
    pub country: String,
    /// Postal code.
    pub zipcode: String,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// IANA timezone preference.
    pub timezone: Option<String>,
    /// User who signed the account up.
    pub signup_user_id: Option<UserId>,
    /// User who is billed for the account.
    pub billing_user_id: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Set when the account has been soft deleted.
    pub archived_at: Option<DateTime<Utc>>,
}

/// Creation parameters for an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Display name.
    pub name: String,
    /// First address line.
    pub address1: String,
    /// Second address line.
    pub address2: Option<String>,
    /// City.
    pub city: String,
    /// Region or state.
    pub region: String,
    /// Country.
    pub country: String,
    /// Postal code.
    pub zipcode: String,
    /// Initial status; `None` applies [`AccountStatus::default`].
    pub status: Option<AccountStatus>,
    /// IANA timezone preference.
    pub timezone: Option<String>,
    /// User who signed the account up.
    pub signup_user_id: Option<UserId>,
    /// User who is billed for the account.
    pub billing_user_id: Option<UserId>,
}
