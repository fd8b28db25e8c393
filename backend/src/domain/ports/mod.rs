//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod account_creator;
mod credential_hasher;
mod membership_command;
mod membership_repository;
mod signup_command;
mod uniqueness_checker;
mod user_creator;

pub use account_creator::{AccountCreationError, AccountCreator};
#[cfg(test)]
pub use account_creator::MockAccountCreator;
pub use credential_hasher::{CredentialHashError, CredentialHasher};
pub use membership_command::{MembershipCommand, MembershipRequest, MembershipUpdateRequest};
pub use membership_repository::{MembershipRepository, MembershipRepositoryError};
#[cfg(test)]
pub use membership_repository::MockMembershipRepository;
pub use signup_command::{
    SignupAccount, SignupCommand, SignupError, SignupRequest, SignupResult, SignupStage,
    SignupUser, StorageError,
};
pub use uniqueness_checker::{UniquenessCheckError, UniquenessChecker};
#[cfg(test)]
pub use uniqueness_checker::MockUniquenessChecker;
pub use user_creator::{UserCreationError, UserCreator};
#[cfg(test)]
pub use user_creator::MockUserCreator;

#[cfg(test)]
mod tests;
