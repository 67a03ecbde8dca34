//! Typed authentication failures.
//!
//! Every fallible resolver and backend operation returns one of these
//! variants. Validation failures are resolved before any backend is reached;
//! remote failures are surfaced opaquely in [`AuthError::Remote`] so the
//! caller owns the user-facing messaging.

use store::StoreError;
use thiserror::Error;

/// Unified error for authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login failed on every backend that was attempted.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Registration against an email already present in the backend.
    #[error("an account with this email already exists")]
    EmailAlreadyRegistered,

    /// The operation requires the remote backend and it is not configured.
    #[error("remote auth backend is not configured")]
    BackendUnavailable,

    /// OAuth provider outside the supported set.
    #[error("unknown oauth provider: {0}")]
    UnsupportedProvider(String),

    /// Input rejected before reaching any backend.
    #[error("{0}")]
    Validation(String),

    /// Opaque failure surfaced unchanged from the remote service.
    #[error("remote auth service error: {0}")]
    Remote(String),

    /// Durable store read/write failure.
    #[error(transparent)]
    Persistence(#[from] StoreError),
}
