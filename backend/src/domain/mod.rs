//! Domain primitives, services and ports.
//!
//! Purpose: Define strongly typed tenancy entities (users, accounts and the
//! memberships joining them), the signup and membership workflows, and the
//! ports those workflows drive. Nothing here knows about storage or transport.
//!
//! Public surface:
//! - Error / ErrorCode: transport agnostic error payload.
//! - User, Account, Membership and their creation requests.
//! - Role, Status, Roles: closed membership enumerations.
//! - SignupService, MembershipService: domain services behind driving ports.

pub mod account;
pub mod cancellation;
pub mod claims;
pub mod error;
pub mod ids;
pub mod membership;
pub mod membership_service;
pub mod ports;
pub mod signup;
pub mod user;
pub mod validation;

pub use self::account::{Account, AccountStatus, NewAccount};
pub use self::cancellation::{CancellationScope, Interrupted};
pub use self::claims::Claims;
pub use self::error::{Error, ErrorCode};
pub use self::ids::{AccountId, IdValidationError, MembershipId, UserId};
pub use self::membership::{
    EnumKind, InvalidEnumValue, Membership, MembershipChanges, MembershipValidationError,
    NewMembership, Role, Roles, Status,
};
pub use self::membership_service::MembershipService;
pub use self::signup::SignupService;
pub use self::user::{NewUser, User, normalize_email};
pub use self::validation::{ContextualValidator, FieldError, FieldErrors};

/// Convenient domain result alias.
///
/// # Examples
/// ```
/// use tenancy::domain::{DomainResult, Error};
///
/// fn lookup() -> DomainResult<()> {
///     Err(Error::not_found("no such membership"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
