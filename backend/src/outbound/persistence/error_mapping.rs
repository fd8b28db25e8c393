//! Classification of Diesel failures shared by the tenancy adapters.
//!
//! Each adapter maps [`StoreFailure`] onto its own port error so the port
//! contracts stay independent of Diesel.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

/// Storage failure reduced to the categories the ports distinguish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreFailure {
    /// The connection dropped or could not be used.
    Connection(String),
    /// A unique constraint rejected the write; carries the constraint name.
    Conflict(String),
    /// No row matched.
    NotFound,
    /// Any other failure.
    Query(String),
}

/// Classify a Diesel error, logging the raw detail at `debug`.
pub(crate) fn classify(error: DieselError, operation: &str) -> StoreFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        _ => debug!(%error, %operation, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => StoreFailure::NotFound,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreFailure::Conflict(
                info.constraint_name()
                    .map_or_else(|| info.message().to_owned(), str::to_owned),
            )
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            StoreFailure::Connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
            StoreFailure::Query(format!("check constraint violated: {}", info.message()))
        }
        DieselError::QueryBuilderError(_) => StoreFailure::Query("database query error".to_owned()),
        _ => StoreFailure::Query("database error".to_owned()),
    }
}
