//! Cancellation signals for cancellable admission
//!
//! A [`CancelSignal`] combines an optional [`CancellationToken`] with an optional
//! deadline. It fires with [`CancelError::Canceled`] when the token is
//! cancelled, or with [`CancelError::DeadlineExceeded`] once the deadline
//! passes, whichever comes first.

use std::future;
use std::pin::pin;
use std::time::{Duration, Instant};

use futures::future::{select, Either};
use tokio_util::sync::CancellationToken;

use crate::error::CancelError;

/// Signal that aborts a pending [`BoundedExecutor::add`](crate::BoundedExecutor::add)
///
/// # Example
///
/// ```rust
/// use bounded_executor::{CancelError, CancelSignal};
/// use tokio_util::sync::CancellationToken;
/// use std::time::Duration;
///
/// let token = CancellationToken::new();
/// let signal = CancelSignal::from_token(token.clone()).with_timeout(Duration::from_secs(5));
/// assert_eq!(signal.err(), None);
///
/// token.cancel();
/// assert_eq!(signal.err(), Some(CancelError::Canceled));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// A signal that never fires
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    /// A signal that fires when `token` is cancelled
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token: Some(token),
            deadline: None,
        }
    }

    /// Add a deadline. If one is already set, the earlier of the two wins.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Add a deadline `timeout` from now
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the signal has fired, or `None` if it has not
    ///
    /// Explicit cancellation is reported ahead of an expired deadline.
    #[must_use]
    pub fn err(&self) -> Option<CancelError> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(CancelError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the signal fires, yielding the reason
    ///
    /// Never resolves for [`CancelSignal::never`].
    pub async fn cancelled(&self) -> CancelError {
        if let Some(err) = self.err() {
            return err;
        }

        let token = pin!(async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => future::pending::<()>().await,
            }
        });
        let deadline = pin!(async {
            match self.deadline {
                Some(deadline) => compio::time::sleep_until(deadline).await,
                None => future::pending::<()>().await,
            }
        });

        match select(token, deadline).await {
            Either::Left(((), _)) => CancelError::Canceled,
            Either::Right(((), _)) => CancelError::DeadlineExceeded,
        }
    }
}

impl From<CancellationToken> for CancelSignal {
    fn from(token: CancellationToken) -> Self {
        Self::from_token(token)
    }
}
