//! Driven port turning a plain-text password into a storable hash.

use super::define_port_error;

define_port_error! {
    /// Errors raised while hashing credentials.
    pub enum CredentialHashError {
        /// The hashing primitive rejected the input or its parameters.
        Hash { message: String } => "credential hashing failed: {message}",
    }
}

/// Port used by user creators before a password reaches storage.
pub trait CredentialHasher: Send + Sync {
    /// Produce a self-describing hash string (PHC format for Argon2).
    fn hash(&self, password: &str) -> Result<String, CredentialHashError>;
}
