//! Error handling and types

use thiserror::Error;

/// Reason a cancellable admission gave up before a slot became free
///
/// This is the only error the executor reports. Work that fails after it was
/// admitted never surfaces here.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelError {
    /// The signal's [`CancellationToken`](tokio_util::sync::CancellationToken) was cancelled
    #[error("admission canceled")]
    Canceled,

    /// The signal's deadline passed
    #[error("admission deadline exceeded")]
    DeadlineExceeded,
}

pub type Result<T> = std::result::Result<T, CancelError>;
