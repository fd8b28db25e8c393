//! Caller-driven cancellation and deadlines for multi-stage operations.
//!
//! A [`CancellationScope`] pairs a [`CancellationToken`] with an optional
//! deadline. Each stage of a workflow runs through [`CancellationScope::run`],
//! which checks the scope before starting and races the stage against it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a guarded future did not run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    /// The token was cancelled.
    #[error("operation cancelled")]
    Cancelled,
    /// The deadline passed.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token plus optional deadline, shared by every stage of a call.
#[derive(Debug, Clone, Default)]
pub struct CancellationScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancellationScope {
    /// Scope observing `token` with no deadline.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Scope that is never cancelled and never expires.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Set an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Token observed by this scope.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast if the scope is already cancelled or expired.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.token.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }

    /// Run `future` unless the scope is cancelled or expires first.
    ///
    /// A future abandoned mid-flight is dropped; whatever it already wrote
    /// stays written.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        self.check()?;
        let guarded = async {
            tokio::select! {
                biased;
                () = self.token.cancelled() => Err(Interrupted::Cancelled),
                output = future => Ok(output),
            }
        };
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or(Err(Interrupted::DeadlineExceeded)),
            None => guarded.await,
        }
    }
}
