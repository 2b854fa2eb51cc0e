use thiserror::Error;

/// Failures reported by a [`NetworkCapability`](crate::NetworkCapability).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("network subsystem unavailable: {0}")]
    Unavailable(String),

    #[error("connectivity check timed out")]
    Timeout,
}
