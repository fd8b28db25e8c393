//! PostgreSQL persistence adapters using Diesel.
//!
//! Adapters are thin translators between Diesel rows and domain types:
//!
//! - Row structs (`models.rs`) and table definitions (`schema.rs`) stay
//!   private to this module.
//! - Connections come from a shared `bb8` pool via `diesel-async`.
//! - Diesel failures are classified once and mapped onto each port's error.
//!
//! # Example
//!
//! ```ignore
//! use tenancy::outbound::persistence::{DbPool, DieselMembershipRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/tenancy")).await?;
//! let memberships = DieselMembershipRepository::new(pool);
//! ```

mod diesel_account_repository;
mod diesel_membership_repository;
mod diesel_uniqueness_checker;
mod diesel_user_repository;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_account_repository::DieselAccountRepository;
pub use diesel_membership_repository::DieselMembershipRepository;
pub use diesel_uniqueness_checker::DieselUniquenessChecker;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
