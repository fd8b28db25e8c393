//! Multi-tenant account management.
//!
//! Signup orchestration creates a user, an account and the owning admin
//! membership in one workflow; membership administration manages roles and
//! lifecycle status afterwards. Storage sits behind ports in
//! [`domain::ports`] with PostgreSQL and in-memory adapters in [`outbound`].

pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod outbound;
