//! Driven port creating user records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Claims, NewUser, User};

use super::define_port_error;

define_port_error! {
    /// Errors raised while creating a user.
    pub enum UserCreationError {
        /// Store connection could not be established.
        Connection { message: String } => "user store connection failed: {message}",
        /// Insert failed during execution.
        Query { message: String } => "user store query failed: {message}",
        /// A storage uniqueness constraint rejected the row.
        Conflict { message: String } => "user already exists: {message}",
        /// Credentials could not be prepared for storage.
        Credentials { message: String } => "user credentials rejected: {message}",
    }
}

/// Port creating exactly one user per call.
///
/// Calling twice creates two rows; callers must not retry blindly.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserCreator: Send + Sync {
    /// Persist a new user and return it with its generated identifier.
    async fn create(
        &self,
        claims: &Claims,
        request: &NewUser,
        now: DateTime<Utc>,
    ) -> Result<User, UserCreationError>;
}
