//! Retry policy and fetch limits

use crate::{CancelFlag, Error, Result};
use std::time::Duration;

/// Limits applied to one provider operation.
#[derive(Debug, Clone)]
pub struct FetchLimits {
    /// Wall-clock deadline for a single transfer
    pub timeout: Option<Duration>,
    /// Total time across retries before giving up
    pub max_retry_time: Duration,
    /// Cancellation shared with the caller
    pub cancel: CancelFlag,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(60)),
            max_retry_time: Duration::from_secs(120),
            cancel: CancelFlag::new(),
        }
    }
}

impl FetchLimits {
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Whether a failure is worth retrying.
fn is_transient(error: &Error) -> bool {
    match error {
        Error::Git(e) => matches!(
            e.class(),
            git2::ErrorClass::Net | git2::ErrorClass::Http | git2::ErrorClass::Ssh
        ),
        Error::Fetch { .. } => true,
        _ => false,
    }
}

/// Run `op` with exponential backoff on transient failures.
///
/// Cancellation short-circuits before each attempt; permanent errors and
/// exhausted retries return the last error unchanged.
pub fn with_retry<T>(limits: &FetchLimits, url: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let policy = backoff::ExponentialBackoff {
        max_elapsed_time: Some(limits.max_retry_time),
        ..Default::default()
    };

    backoff::retry(policy, || {
        if limits.cancel.is_cancelled() {
            return Err(backoff::Error::permanent(Error::Aborted {
                url: url.to_string(),
                reason: "cancelled".to_string(),
            }));
        }
        op().map_err(|e| {
            if is_transient(&e) {
                tracing::warn!(url, error = %e, "transient fetch failure, will retry");
                backoff::Error::transient(e)
            } else {
                backoff::Error::permanent(e)
            }
        })
    })
    .map_err(|e| match e {
        backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => err,
    })
}
