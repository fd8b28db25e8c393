//! User identity model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use zeroize::Zeroizing;

use super::ids::UserId;

/// Application user.
///
/// Users are global; access to an account is granted through a
/// [`Membership`](super::Membership). Credentials never leave the user
/// creator, so the domain type carries no password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Stable identifier generated on creation.
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Login email, stored lowercase.
    pub email: String,
    /// IANA timezone preference.
    pub timezone: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Set when the user has been soft deleted.
    pub archived_at: Option<DateTime<Utc>>,
}

/// Creation parameters for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Login email as submitted.
    pub email: String,
    /// Plain-text password, hashed by the creator before persistence.
    pub password: Zeroizing<String>,
    /// IANA timezone preference.
    pub timezone: Option<String>,
}

/// Canonical storage form of an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
