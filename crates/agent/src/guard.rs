//! Cancellation and deadline propagation for external calls.
//!
//! Every suspension point in a request (the classifier call and each
//! responder call) runs through one [`CallGuard`]. Dropping the wrapped
//! future on interruption abandons the in-flight HTTP request.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a guarded call did not finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The caller's cancellation token fired
    Cancelled,
    /// The request-wide deadline passed
    DeadlineExceeded,
    /// The call's own time limit passed
    TimedOut(Duration),
}

/// Request-scoped cancellation token plus optional absolute deadline.
#[derive(Debug, Clone, Default)]
pub struct CallGuard {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallGuard {
    pub fn new(cancel: CancellationToken, deadline: Option<Instant>) -> Self {
        Self { cancel, deadline }
    }

    /// A guard that never interrupts on its own.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Run `fut` until it completes, the token fires, the deadline passes,
    /// or `limit` elapses, whichever comes first.
    pub async fn run<F>(&self, limit: Option<Duration>, fut: F) -> Result<F::Output, Interrupt>
    where
        F: Future,
    {
        let limit_at = limit.map(|d| Instant::now() + d);
        let (wake_at, by_deadline) = match (limit_at, self.deadline) {
            (Some(l), Some(d)) if d <= l => (Some(d), true),
            (Some(l), _) => (Some(l), false),
            (None, Some(d)) => (Some(d), true),
            (None, None) => (None, false),
        };

        let expiry = async move {
            match wake_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupt::Cancelled),
            out = fut => Ok(out),
            _ = expiry => Err(if by_deadline {
                Interrupt::DeadlineExceeded
            } else {
                Interrupt::TimedOut(limit.unwrap_or_default())
            }),
        }
    }
}
