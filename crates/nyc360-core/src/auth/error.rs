use thiserror::Error;

/// Why a stored access token could not become an identity.
///
/// Both variants are handled the same way by the session store (clear the
/// credential, publish anonymous); they are kept apart for logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Malformed token: {0}")]
    Decode(String),

    #[error("Token expired at {expires_at_epoch_millis} (epoch ms)")]
    Expired { expires_at_epoch_millis: i64 },
}

impl AuthError {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        AuthError::Decode(reason.into())
    }
}
