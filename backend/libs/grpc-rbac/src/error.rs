//! Startup and per-call error types

use crypto_core::{KeyError, TokenError};
use thiserror::Error;
use tonic::Status;

/// The only message a rejected caller ever sees
pub const REJECTION_MESSAGE: &str = "not authorized";

/// Malformed or inconsistent startup configuration
///
/// Always fatal: the server must not accept traffic with a partial registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to load public key for '{identity}': {source}")]
    Key {
        identity: String,
        #[source]
        source: KeyError,
    },

    #[error("{role} role specified for unknown user '{identity}'")]
    UnknownIdentity { identity: String, role: String },

    #[error("invalid user specification '{0}' (expected 'uid:key_file')")]
    InvalidUserSpec(String),
}

/// Why a single call was refused
///
/// Logged server-side. [`AuthError::into_status`] collapses every variant
/// into the same opaque status so callers cannot probe identities or roles.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("incoming request without metadata")]
    NoMetadata,

    #[error("no token in metadata")]
    NoToken,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("method not configured for security")]
    MethodNotConfigured,

    #[error("'{identity}' does not have a required role")]
    InsufficientRole { identity: String },
}

impl AuthError {
    /// Short label for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::NoMetadata => "no_metadata",
            AuthError::NoToken => "no_token",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::MethodNotConfigured => "method_not_configured",
            AuthError::InsufficientRole { .. } => "insufficient_role",
        }
    }

    /// Uniform client-visible rejection
    pub fn into_status(self) -> Status {
        rejection_status()
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        err.into_status()
    }
}

pub(crate) fn rejection_status() -> Status {
    Status::unauthenticated(REJECTION_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_reason_maps_to_same_status() {
        let errors = vec![
            AuthError::NoMetadata,
            AuthError::NoToken,
            AuthError::InvalidToken(TokenError::EmptyIdentity),
            AuthError::InvalidToken(TokenError::UnknownIdentity("eve".into())),
            AuthError::MethodNotConfigured,
            AuthError::InsufficientRole {
                identity: "mary".into(),
            },
        ];

        for err in errors {
            let status = err.into_status();
            assert_eq!(status.code(), tonic::Code::Unauthenticated);
            assert_eq!(status.message(), REJECTION_MESSAGE);
        }
    }

    #[test]
    fn test_reason_does_not_leak_into_status() {
        let err = AuthError::InvalidToken(TokenError::UnknownIdentity("eve".into()));
        assert!(err.to_string().contains("eve"));

        let status: Status = err.into();
        assert!(!status.message().contains("eve"));
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::UnknownIdentity {
            identity: "bob".into(),
            role: "reader".into(),
        };
        assert_eq!(err.to_string(), "reader role specified for unknown user 'bob'");

        let err = ConfigError::InvalidUserSpec("joe".into());
        assert!(err.to_string().contains("uid:key_file"));
    }
}
