//! Error types
//!
//! Typed errors for chat operations and the collaborators they call, with
//! descriptive messages and recovery suggestions.

use thiserror::Error;

/// Errors returned by the realtime store collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store could not be reached (network, shutdown, offline)
    #[error("Realtime store unavailable: {0}")]
    Unavailable(String),

    /// Store refused access to a path
    #[error("Permission denied writing to '{path}'")]
    PermissionDenied { path: String },

    /// Path is empty or contains empty segments
    #[error("Invalid store path '{0}'")]
    InvalidPath(String),

    /// Record could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by the auth collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must be at least 6 characters")]
    WeakPassword,

    #[error("An account already exists for this email")]
    EmailInUse,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Sign-in provider '{0}' is not supported")]
    UnsupportedProvider(String),

    #[error("Auth backend error: {0}")]
    Backend(String),
}

/// Errors returned by signup notifiers
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Channel or token missing from configuration
    #[error("Signup notifications are not configured (set notify.channel and notify.token)")]
    NotConfigured,

    /// Request failed or returned a non-success status
    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint accepted the request but reported an error
    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// Errors surfaced by chat operations
#[derive(Error, Debug)]
pub enum ChatError {
    /// Operation needs a signed-in identity and there is none
    #[error("Not signed in")]
    Unauthenticated,

    /// Input rejected before reaching the backend
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A store call failed
    #[error("Backend unavailable while trying to {operation}: {source}")]
    BackendUnavailable {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// An auth collaborator call failed
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
}

impl ChatError {
    /// Wrap a store failure with the operation it interrupted
    pub fn backend(operation: &'static str, source: StoreError) -> Self {
        ChatError::BackendUnavailable { operation, source }
    }

    /// Check if retrying the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChatError::BackendUnavailable {
                source: StoreError::Unavailable(_),
                ..
            } | ChatError::Auth(AuthError::Backend(_))
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            ChatError::Unauthenticated => Some("Sign in and try again."),
            ChatError::BackendUnavailable {
                source: StoreError::PermissionDenied { .. },
                ..
            } => Some("Check that your account is allowed to write to this room."),
            ChatError::BackendUnavailable { .. } => {
                Some("Check your connection and retry the operation.")
            }
            ChatError::Auth(AuthError::WeakPassword) => {
                Some("Choose a password with at least 6 characters.")
            }
            _ => None,
        }
    }
}

/// Result type for store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_recoverable() {
        let err = ChatError::backend("send message", StoreError::Unavailable("offline".into()));

        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
        assert!(err.to_string().contains("send message"));
    }

    #[test]
    fn test_permission_denied_not_recoverable() {
        let err = ChatError::backend(
            "create room",
            StoreError::PermissionDenied {
                path: "rooms".into(),
            },
        );

        assert!(!err.is_recoverable());
        assert_eq!(
            err.recovery_suggestion(),
            Some("Check that your account is allowed to write to this room.")
        );
    }

    #[test]
    fn test_auth_error_conversion() {
        let err: ChatError = AuthError::WeakPassword.into();
        assert!(matches!(err, ChatError::Auth(AuthError::WeakPassword)));
        assert!(err.to_string().contains("at least 6"));
    }

    #[test]
    fn test_validation_display() {
        let err = ChatError::Validation("message text is empty".into());
        assert_eq!(err.to_string(), "Invalid input: message text is empty");
        assert!(!err.is_recoverable());
    }
}
