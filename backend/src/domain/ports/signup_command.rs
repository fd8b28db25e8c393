//! Driving port for self-service signup.
//!
//! A signup creates a user, the account they will administer and the
//! membership joining the two. The request is validated as a whole before
//! anything is written; once creation starts, stages run strictly in order and
//! a failure leaves the already created rows in place.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::cancellation::CancellationScope;
use crate::domain::validation::{FieldErrors, UniquenessContext, not_blank, unique_email, unique_name};
use crate::domain::{Account, Claims, Error, InvalidEnumValue, User};

use super::{
    AccountCreationError, MembershipRepositoryError, UniquenessCheckError, UserCreationError,
};

/// User half of a signup request.
#[derive(Clone, PartialEq, Eq, Deserialize, Validate)]
#[validate(context = UniquenessContext)]
pub struct SignupUser {
    /// Given name.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub first_name: String,
    /// Family name.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub last_name: String,
    /// Login email; stored lowercased.
    #[validate(
        custom(function = "not_blank"),
        email,
        custom(function = "unique_email", use_context)
    )]
    pub email: String,
    /// Plain-text password, hashed before storage.
    #[validate(custom(function = "not_blank"))]
    pub password: String,
    /// Must repeat `password` exactly.
    #[validate(custom(function = "not_blank"), must_match(other = "password"))]
    pub password_confirm: String,
}

impl fmt::Debug for SignupUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupUser")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("password_confirm", &"<redacted>")
            .finish()
    }
}

/// Account half of a signup request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[validate(context = UniquenessContext)]
pub struct SignupAccount {
    /// Display name, unique among active accounts.
    #[validate(
        custom(function = "not_blank"),
        length(max = 200),
        custom(function = "unique_name", use_context)
    )]
    pub name: String,
    /// First address line.
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub address1: String,
    /// Optional second address line.
    #[serde(default)]
    pub address2: Option<String>,
    /// City.
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub city: String,
    /// Region, state or province.
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub region: String,
    /// ISO country code or name.
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub country: String,
    /// Postal code.
    #[validate(custom(function = "not_blank"), length(max = 20))]
    pub zipcode: String,
    /// IANA timezone shared by the account and its first user.
    #[serde(default)]
    #[validate(length(max = 64))]
    pub timezone: Option<String>,
}

/// Complete signup payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignupRequest {
    /// User to create.
    pub user: SignupUser,
    /// Account to create.
    pub account: SignupAccount,
}

/// Entities created by a successful signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupResult {
    /// The new user.
    pub user: User,
    /// The new account, administered by `user`.
    pub account: Account,
}

/// Ordered stages of a signup, used to report where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupStage {
    /// Email uniqueness lookup.
    CheckEmail,
    /// Account name uniqueness lookup.
    CheckAccountName,
    /// User insert.
    CreateUser,
    /// Account insert.
    CreateAccount,
    /// Membership insert.
    CreateMembership,
}

impl SignupStage {
    /// Stable snake_case label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CheckEmail => "check_email",
            Self::CheckAccountName => "check_account_name",
            Self::CreateUser => "create_user",
            Self::CreateAccount => "create_account",
            Self::CreateMembership => "create_membership",
        }
    }
}

impl fmt::Display for SignupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port failure surfaced unchanged by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness lookup failed.
    #[error(transparent)]
    Uniqueness(#[from] UniquenessCheckError),
    /// The user insert failed.
    #[error(transparent)]
    UserCreation(#[from] UserCreationError),
    /// The account insert failed.
    #[error(transparent)]
    AccountCreation(#[from] AccountCreationError),
    /// The membership insert failed.
    #[error(transparent)]
    Membership(#[from] MembershipRepositoryError),
}

impl StorageError {
    /// Variant name of the underlying port error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Uniqueness(error) => error.kind(),
            Self::UserCreation(error) => error.kind(),
            Self::AccountCreation(error) => error.kind(),
            Self::Membership(error) => error.kind(),
        }
    }

    fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Uniqueness(UniquenessCheckError::Connection { .. })
                | Self::UserCreation(UserCreationError::Connection { .. })
                | Self::AccountCreation(AccountCreationError::Connection { .. })
                | Self::Membership(MembershipRepositoryError::Connection { .. })
        )
    }

    fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::UserCreation(UserCreationError::Conflict { .. })
                | Self::AccountCreation(AccountCreationError::Conflict { .. })
                | Self::Membership(MembershipRepositoryError::Conflict { .. })
        )
    }
}

/// Reasons a signup did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignupError {
    /// A storage port failed; the first failure wins.
    #[error("signup storage failure: {0}")]
    Storage(#[from] StorageError),
    /// The request failed validation; nothing was created.
    #[error("signup request is invalid: {0}")]
    Validation(FieldErrors),
    /// Persisted membership data carried an unknown role or status.
    #[error("signup read back corrupt data: {0}")]
    InvalidEnumValue(InvalidEnumValue),
    /// The caller cancelled before `stage` completed.
    #[error("signup cancelled during {stage}")]
    Cancelled {
        /// Stage that was interrupted.
        stage: SignupStage,
    },
    /// The deadline passed before `stage` completed.
    #[error("signup deadline exceeded during {stage}")]
    DeadlineExceeded {
        /// Stage that was interrupted.
        stage: SignupStage,
    },
}

impl SignupError {
    /// Whether the stage was abandoned by cancellation or deadline. The write
    /// it was awaiting may still have been committed.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::DeadlineExceeded { .. })
    }

    /// Short label for log fields; storage failures report the port error's
    /// variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage(storage) => storage.kind(),
            Self::Validation(_) => "validation",
            Self::InvalidEnumValue(_) => "invalid_enum_value",
            Self::Cancelled { .. } => "cancelled",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }
}

impl From<UniquenessCheckError> for SignupError {
    fn from(value: UniquenessCheckError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<UserCreationError> for SignupError {
    fn from(value: UserCreationError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<AccountCreationError> for SignupError {
    fn from(value: AccountCreationError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<MembershipRepositoryError> for SignupError {
    fn from(value: MembershipRepositoryError) -> Self {
        match value {
            MembershipRepositoryError::InvalidEnumValue { value } => Self::InvalidEnumValue(value),
            other => Self::Storage(other.into()),
        }
    }
}

impl From<SignupError> for Error {
    fn from(value: SignupError) -> Self {
        match value {
            SignupError::Validation(fields) => {
                Error::invalid_request("signup request is invalid").with_details(fields.to_json())
            }
            SignupError::Storage(storage) if storage.is_connection() => {
                Error::service_unavailable(storage.to_string())
            }
            SignupError::Storage(storage) if storage.is_conflict() => {
                Error::conflict(storage.to_string())
            }
            SignupError::Cancelled { stage } => {
                Error::service_unavailable(format!("signup cancelled during {stage}"))
            }
            SignupError::DeadlineExceeded { stage } => {
                Error::service_unavailable(format!("signup deadline exceeded during {stage}"))
            }
            other => Error::internal(other.to_string()),
        }
    }
}

/// Driving port for the signup workflow.
#[async_trait]
pub trait SignupCommand: Send + Sync {
    /// Validate the request, then create user, account and admin membership.
    async fn signup(
        &self,
        claims: &Claims,
        request: SignupRequest,
        now: DateTime<Utc>,
        scope: &CancellationScope,
    ) -> Result<SignupResult, SignupError>;
}
