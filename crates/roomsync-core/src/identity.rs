//! Session identity
//!
//! The authenticated principal behind the current client, as reported by
//! the auth collaborator.

use serde::{Deserialize, Serialize};

/// Label used when an identity has neither display name nor email
const ANONYMOUS_LABEL: &str = "Anonymous";

/// An authenticated user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Unique user identifier assigned by the auth backend
    pub uid: String,
    /// Email address, if the account has one
    pub email: Option<String>,
    /// Display name, if the account has one
    pub display_name: Option<String>,
}

impl Identity {
    /// Create an identity with only a user id
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    /// Set the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Label shown next to this user's messages
    ///
    /// Display name, else the local part of the email, else "Anonymous".
    pub fn display_label(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or(ANONYMOUS_LABEL)
            .to_string()
    }
}
