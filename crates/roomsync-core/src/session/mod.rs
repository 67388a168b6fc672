//! Session state
//!
//! `SessionContext` is a read-only projection of the identity published by
//! the auth collaborator. Operations that write on behalf of a user check it
//! before touching the store.

mod auth;
mod notify;

use tokio::sync::watch;

use crate::error::{ChatError, ChatResult};
use crate::identity::Identity;

pub use auth::{AuthProvider, MemoryAuth};
pub use notify::{signup_message, NoopNotifier, SignupNotifier, SlackNotifier};

/// Current identity, kept up to date by the auth collaborator
#[derive(Debug, Clone)]
pub struct SessionContext {
    identity: watch::Receiver<Option<Identity>>,
}

impl SessionContext {
    /// Follow the identity published by an auth provider
    pub fn from_provider(provider: &dyn AuthProvider) -> Self {
        Self::from_receiver(provider.identity())
    }

    /// Follow an identity value published elsewhere
    pub fn from_receiver(identity: watch::Receiver<Option<Identity>>) -> Self {
        Self { identity }
    }

    /// A session that is never signed in
    pub fn anonymous() -> Self {
        let (_, rx) = watch::channel(None);
        Self::from_receiver(rx)
    }

    /// A session fixed to one identity
    pub fn signed_in(identity: Identity) -> Self {
        let (_, rx) = watch::channel(Some(identity));
        Self::from_receiver(rx)
    }

    /// Identity at this moment, if any
    pub fn current(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.borrow().is_some()
    }

    /// Identity at this moment, or `Unauthenticated`
    pub fn require(&self) -> ChatResult<Identity> {
        self.current().ok_or(ChatError::Unauthenticated)
    }

    /// Live identity value; the receiver immediately holds the current one
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.clone()
    }

    /// Wait for the identity to change
    ///
    /// Returns the new value, or `None` once the auth provider is gone.
    pub async fn changed(&mut self) -> Option<Option<Identity>> {
        self.identity.changed().await.ok()?;
        Some(self.identity.borrow_and_update().clone())
    }
}
