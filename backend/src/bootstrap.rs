//! Composition root wiring adapters into the domain services.
//!
//! The validator, clock and storage adapters are built exactly once here and
//! injected; nothing in the domain reaches for global state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AppSettings;
use crate::domain::ports::{
    MembershipCommand, SignupCommand, SignupError, SignupRequest, SignupResult,
};
use crate::domain::{CancellationScope, Claims, ContextualValidator, MembershipService, SignupService};
use crate::outbound::credentials::Argon2CredentialHasher;
use crate::outbound::memory::InMemoryDirectory;
use crate::outbound::persistence::{
    DbPool, DieselAccountRepository, DieselMembershipRepository, DieselUniquenessChecker,
    DieselUserRepository, MigrationError, PoolError, run_pending_migrations,
};

/// Failures while assembling the application.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// No database URL was configured.
    #[error("TENANCY_DATABASE_URL is not set")]
    MissingDatabaseUrl,
    /// The connection pool could not be built.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// Pending migrations could not be applied.
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Wired driving ports plus the clock and deadline policy.
#[derive(Clone)]
pub struct Application {
    signup: Arc<dyn SignupCommand>,
    memberships: Arc<dyn MembershipCommand>,
    clock: Arc<dyn Clock>,
    signup_timeout: Duration,
}

impl Application {
    /// Wire PostgreSQL adapters, applying migrations first when configured.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] when no database is configured, the pool
    /// cannot be built or a migration fails.
    pub async fn connect(settings: &AppSettings) -> Result<Self, BootstrapError> {
        let pool_config = settings
            .pool_config()
            .ok_or(BootstrapError::MissingDatabaseUrl)?;
        if settings.run_migrations {
            let applied = run_pending_migrations(pool_config.database_url()).await?;
            info!(applied = ?applied, "migrations complete");
        }
        let pool = DbPool::new(pool_config).await?;
        let validator = ContextualValidator::new();

        let signup = SignupService::new(
            Arc::new(DieselUniquenessChecker::new(pool.clone())),
            Arc::new(DieselUserRepository::new(
                pool.clone(),
                Arc::new(Argon2CredentialHasher::new()),
            )),
            Arc::new(DieselAccountRepository::new(pool.clone())),
            Arc::new(DieselMembershipRepository::new(pool.clone())),
            validator,
        );
        let memberships =
            MembershipService::new(Arc::new(DieselMembershipRepository::new(pool)), validator);

        Ok(Self::from_parts(
            Arc::new(signup),
            Arc::new(memberships),
            Arc::new(DefaultClock),
            settings.signup_timeout(),
        ))
    }

    /// Wire every port to one shared in-memory directory.
    pub fn in_memory(settings: &AppSettings) -> (Self, Arc<InMemoryDirectory>) {
        let directory = Arc::new(InMemoryDirectory::new());
        let validator = ContextualValidator::new();
        let signup = SignupService::new(
            Arc::clone(&directory),
            Arc::clone(&directory),
            Arc::clone(&directory),
            Arc::clone(&directory),
            validator,
        );
        let memberships = MembershipService::new(Arc::clone(&directory), validator);
        let app = Self::from_parts(
            Arc::new(signup),
            Arc::new(memberships),
            Arc::new(DefaultClock),
            settings.signup_timeout(),
        );
        (app, directory)
    }

    /// Assemble from already wired parts.
    pub fn from_parts(
        signup: Arc<dyn SignupCommand>,
        memberships: Arc<dyn MembershipCommand>,
        clock: Arc<dyn Clock>,
        signup_timeout: Duration,
    ) -> Self {
        Self {
            signup,
            memberships,
            clock,
            signup_timeout,
        }
    }

    /// Replace the clock, typically with a fixed one in tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current time from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Membership administration port.
    pub fn memberships(&self) -> &dyn MembershipCommand {
        self.memberships.as_ref()
    }

    /// Run one signup under the configured deadline, observing `token`.
    ///
    /// # Errors
    ///
    /// Propagates [`SignupError`] from the workflow unchanged.
    pub async fn signup(
        &self,
        claims: &Claims,
        request: SignupRequest,
        token: CancellationToken,
    ) -> Result<SignupResult, SignupError> {
        let scope = CancellationScope::new(token).with_timeout(self.signup_timeout);
        self.signup.signup(claims, request, self.now(), &scope).await
    }
}
