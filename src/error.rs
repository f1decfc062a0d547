use thiserror::Error;

/// Failure of a single trade attempt.
///
/// Every variant is attempt-local: the runner records it as a failed outcome
/// and moves on to the next attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoostError {
    /// The routing service found no route or rejected the quote request.
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    /// Transport, timeout, or malformed-response failure from the routing
    /// service or the RPC endpoint.
    #[error("service error: {0}")]
    ServiceError(String),

    /// The unsigned payload could not be decoded or signed by this credential.
    #[error("signing error: {0}")]
    SigningError(String),

    /// Trade parameters outside their allowed ranges.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl BoostError {
    pub fn service(err: impl std::fmt::Display) -> Self {
        Self::ServiceError(err.to_string())
    }

    pub fn signing(err: impl std::fmt::Display) -> Self {
        Self::SigningError(err.to_string())
    }
}

pub type BoostResult<T> = Result<T, BoostError>;
