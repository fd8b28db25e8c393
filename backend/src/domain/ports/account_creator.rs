//! Driven port creating account records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Account, Claims, NewAccount};

use super::define_port_error;

define_port_error! {
    /// Errors raised while creating an account.
    pub enum AccountCreationError {
        /// Store connection could not be established.
        Connection { message: String } => "account store connection failed: {message}",
        /// Insert failed during execution.
        Query { message: String } => "account store query failed: {message}",
        /// A storage uniqueness constraint rejected the row.
        Conflict { message: String } => "account already exists: {message}",
    }
}

/// Port creating exactly one account per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountCreator: Send + Sync {
    /// Persist a new account and return it with its generated identifier.
    async fn create(
        &self,
        claims: &Claims,
        request: &NewAccount,
        now: DateTime<Utc>,
    ) -> Result<Account, AccountCreationError>;
}
