//! Cancellation Context
//!
//! Governs a single invocation: a cancellation token plus an optional deadline.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Why a context finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneReason {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for DoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("context cancelled"),
            Self::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never done unless cancelled explicitly.
    pub fn background() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Wraps an existing token, e.g. one shared with a shutdown handler.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derives a context that is cancelled together with `self`.
    ///
    /// The child keeps the parent's deadline unless `timeout` is shorter.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.deadline, timeout) {
            (Some(parent), Some(t)) => Some(parent.min(Instant::now() + t)),
            (None, Some(t)) => Some(Instant::now() + t),
            (parent, None) => parent,
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check, `None` while the context is still live.
    pub fn is_done(&self) -> Option<DoneReason> {
        if self.token.is_cancelled() {
            return Some(DoneReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(DoneReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the token is cancelled or the deadline passes.
    pub async fn done(&self) -> DoneReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => DoneReason::Cancelled,
                    _ = sleep_until(deadline) => DoneReason::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                DoneReason::Cancelled
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_background_is_not_done() {
        let ctx = Context::background();
        assert_eq!(ctx.is_done(), None);
        assert!(timeout(Duration::from_millis(50), ctx.done()).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_resolves_done() {
        let ctx = Context::background();
        ctx.cancel();
        assert_eq!(ctx.is_done(), Some(DoneReason::Cancelled));
        assert_eq!(ctx.done().await, DoneReason::Cancelled);
    }

    #[tokio::test]
    async fn test_deadline_resolves_done() {
        let ctx = Context::with_timeout(Duration::from_millis(20));
        let reason = timeout(Duration::from_secs(2), ctx.done()).await.unwrap();
        assert_eq!(reason, DoneReason::DeadlineExceeded);
        assert_eq!(ctx.is_done(), Some(DoneReason::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_child_follows_parent_cancellation() {
        let parent = Context::background();
        let child = parent.child(Some(Duration::from_secs(60)));
        parent.cancel();
        assert_eq!(child.done().await, DoneReason::Cancelled);
    }

    #[tokio::test]
    async fn test_child_keeps_shorter_deadline() {
        let parent = Context::with_timeout(Duration::from_millis(10));
        let child = parent.child(Some(Duration::from_secs(60)));
        assert_eq!(child.deadline(), parent.deadline());
    }
}
