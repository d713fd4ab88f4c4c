//! Execution scope attached to every [`MessageContext`](super::MessageContext).
//!
//! An [`ExecutionScope`] bundles a [`CancellationToken`] with an optional
//! deadline. Handlers that start long-running work (rendering, remote
//! completion calls) should race it against [`ExecutionScope::done`].
//!
//! The dispatch engine itself never enforces the scope: a handler that
//! ignores it simply runs to completion.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline carrier for one dispatch.
///
/// Cloning is cheap and clones observe the same cancellation. Use
/// [`child`](Self::child) to derive a scope that can be cancelled on its own
/// while still following its parent.
#[derive(Debug, Clone, Default)]
pub struct ExecutionScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecutionScope {
    /// Creates a scope that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope driven by an existing token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Sets an absolute deadline.
    ///
    /// An earlier deadline already present on the scope is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Sets a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a child scope.
    ///
    /// Cancelling the parent cancels the child; cancelling the child leaves
    /// the parent untouched. The deadline is inherited.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Returns the underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels this scope and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the scope was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left until the deadline, saturating at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns true once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Returns true if the scope is cancelled or expired.
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.is_expired()
    }

    /// Completes when the scope is cancelled or its deadline passes.
    ///
    /// Never completes for a scope without deadline that is never cancelled.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}
