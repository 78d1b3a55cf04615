//! Authentication error types.

use supabase_backend::BackendError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Backend error, surfaced verbatim (bad credentials, duplicate email,
    /// token-exchange failures).
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Provider SDK login failed for a reason other than user cancellation.
    #[error("{provider} sign in failed")]
    ProviderLoginFailed { provider: &'static str },

    /// No authenticated identity for an operation that needs one.
    #[error("Not logged in")]
    NotLoggedIn,

    /// Configuration error (e.g. missing provider app id); raised before
    /// any network call.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
