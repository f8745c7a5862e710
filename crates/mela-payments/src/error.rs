//! Payment errors

use thiserror::Error;

/// Failures from the synchronous gateway surface
///
/// Signature mismatches are not errors here; verification returns `false`
/// and the caller reports the target as unpaid.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Gateway rejected the request or returned a non-success status
    #[error("gateway error: {0}")]
    Gateway(String),

    /// The bounded request timeout elapsed
    #[error("gateway request timed out")]
    Timeout,

    /// Transport-level failure reaching the gateway
    #[error("gateway unreachable: {0}")]
    Transport(String),

    /// Response arrived but did not match the expected shape
    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PaymentError::Timeout
        } else if err.is_status() {
            PaymentError::Gateway(err.to_string())
        } else {
            PaymentError::Transport(err.to_string())
        }
    }
}
