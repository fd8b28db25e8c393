//! Driven port answering "is this email / account name still free?".
//!
//! Lookups are read only and tolerate the candidate entity not existing yet
//! (signup) as well as already existing (updates pass their own id as the
//! exclusion). A failed lookup is an error, never an implicit "unique".

use async_trait::async_trait;

use crate::domain::{AccountId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by uniqueness lookups.
    pub enum UniquenessCheckError {
        /// Store connection could not be established.
        Connection { message: String } => "uniqueness lookup connection failed: {message}",
        /// Lookup query failed during execution.
        Query { message: String } => "uniqueness lookup failed: {message}",
    }
}

/// Port for uniqueness lookups against current user and account records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UniquenessChecker: Send + Sync {
    /// True when no user other than `exclude` holds `email`.
    async fn is_email_unique(
        &self,
        email: &str,
        exclude: Option<UserId>,
    ) -> Result<bool, UniquenessCheckError>;

    /// True when no non-archived account other than `exclude` holds `name`.
    async fn is_account_name_unique(
        &self,
        name: &str,
        exclude: Option<AccountId>,
    ) -> Result<bool, UniquenessCheckError>;
}
