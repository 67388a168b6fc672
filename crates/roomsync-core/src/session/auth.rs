//! Auth collaborator
//!
//! The auth backend owns accounts and publishes the current identity.
//! `MemoryAuth` stands in for it in tests and local sessions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{error, info};
use uuid::Uuid;

use super::notify::{NoopNotifier, SignupNotifier};
use crate::error::AuthError;
use crate::identity::Identity;

/// Shortest password the backend accepts
const MIN_PASSWORD_LEN: usize = 6;

/// The auth collaborator
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Live current identity (`None` when signed out)
    fn identity(&self) -> watch::Receiver<Option<Identity>>;

    /// Sign in with email and password
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Create an account and sign in to it
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Sign in through an external identity provider (e.g. "google")
    async fn sign_in_with_provider(&self, provider_id: &str) -> Result<Identity, AuthError>;

    /// Sign out of the current session
    async fn sign_out(&self) -> Result<(), AuthError>;
}

struct Account {
    password: String,
    identity: Identity,
}

#[derive(Default)]
struct Accounts {
    by_email: HashMap<String, Account>,
    providers: HashMap<String, Identity>,
    /// Provider identities that have signed in at least once
    seen: HashSet<String>,
}

/// In-memory auth backend
///
/// Passwords are kept in memory as given; this is not a credential store.
pub struct MemoryAuth {
    accounts: Mutex<Accounts>,
    identity: watch::Sender<Option<Identity>>,
    notifier: Arc<dyn SignupNotifier>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuth {
    /// Create a backend with no accounts and no signup notifications
    pub fn new() -> Self {
        Self::with_notifier(Arc::new(NoopNotifier))
    }

    /// Create a backend that reports new accounts to `notifier`
    pub fn with_notifier(notifier: Arc<dyn SignupNotifier>) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(Accounts::default()),
            identity,
            notifier,
        }
    }

    /// Register the identity an external provider returns on sign-in
    pub fn register_provider(&self, provider_id: &str, identity: Identity) {
        self.lock()
            .providers
            .insert(provider_id.to_string(), identity);
    }

    fn lock(&self) -> MutexGuard<'_, Accounts> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_identity(&self, identity: Option<Identity>) {
        self.identity.send_replace(identity);
    }

    /// Report a new account without waiting for the notifier
    fn announce_signup(&self, identity: &Identity) {
        let notifier = Arc::clone(&self.notifier);
        let identity = identity.clone();

        tokio::spawn(async move {
            if let Err(e) = notifier.notify_signup(&identity).await {
                error!(uid = %identity.uid, "signup notification failed: {}", e);
            }
        });
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    fn identity(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        let identity = {
            let accounts = self.lock();
            let account = accounts
                .by_email
                .get(&email)
                .filter(|a| a.password == password)
                .ok_or(AuthError::InvalidCredentials)?;
            account.identity.clone()
        };

        info!(uid = %identity.uid, "signed in");
        self.set_identity(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let identity = {
            let mut accounts = self.lock();
            if accounts.by_email.contains_key(&email) {
                return Err(AuthError::EmailInUse);
            }

            let identity = Identity::new(Uuid::new_v4().simple().to_string()).with_email(&email);
            accounts.by_email.insert(
                email,
                Account {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
            identity
        };

        info!(uid = %identity.uid, "account created");
        self.announce_signup(&identity);
        self.set_identity(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in_with_provider(&self, provider_id: &str) -> Result<Identity, AuthError> {
        let (identity, first_time) = {
            let mut accounts = self.lock();
            let identity = accounts
                .providers
                .get(provider_id)
                .cloned()
                .ok_or_else(|| AuthError::UnsupportedProvider(provider_id.to_string()))?;
            let first_time = accounts.seen.insert(identity.uid.clone());
            (identity, first_time)
        };

        if first_time {
            self.announce_signup(&identity);
        }
        info!(uid = %identity.uid, provider = %provider_id, "signed in with provider");
        self.set_identity(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.identity.borrow().is_some() {
            info!("signed out");
        }
        self.set_identity(None);
        Ok(())
    }
}

/// Lowercase and sanity-check an email address
fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(email)
        }
        _ => Err(AuthError::InvalidEmail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::NotifyError;

    #[derive(Default)]
    struct CountingNotifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SignupNotifier for CountingNotifier {
        async fn notify_signup(&self, _identity: &Identity) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Ada@Example.com ").unwrap(), "ada@example.com");
        assert_eq!(normalize_email("ada"), Err(AuthError::InvalidEmail));
        assert_eq!(normalize_email("@example.com"), Err(AuthError::InvalidEmail));
        assert_eq!(normalize_email("ada@"), Err(AuthError::InvalidEmail));
    }

    #[tokio::test]
    async fn test_sign_up_and_sign_in() {
        let auth = MemoryAuth::new();
        let rx = auth.identity();
        assert!(rx.borrow().is_none());

        let created = auth.sign_up("ada@example.com", "secret1").await.unwrap();
        assert_eq!(created.email.as_deref(), Some("ada@example.com"));
        assert_eq!(rx.borrow().as_ref(), Some(&created));

        auth.sign_out().await.unwrap();
        assert!(rx.borrow().is_none());

        let signed_in = auth.sign_in("ADA@example.com", "secret1").await.unwrap();
        assert_eq!(signed_in, created);
    }

    #[tokio::test]
    async fn test_sign_up_errors() {
        let auth = MemoryAuth::new();
        assert_eq!(
            auth.sign_up("ada@example.com", "short").await,
            Err(AuthError::WeakPassword)
        );
        assert_eq!(
            auth.sign_up("not-an-email", "secret1").await,
            Err(AuthError::InvalidEmail)
        );

        auth.sign_up("ada@example.com", "secret1").await.unwrap();
        assert_eq!(
            auth.sign_up("ada@example.com", "secret2").await,
            Err(AuthError::EmailInUse)
        );
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let auth = MemoryAuth::new();
        auth.sign_up("ada@example.com", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();

        assert_eq!(
            auth.sign_in("ada@example.com", "wrong!!").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.sign_in("bob@example.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        );
        assert!(auth.identity().borrow().is_none());
    }

    #[tokio::test]
    async fn test_signup_notifies_once_per_account() {
        let notifier = Arc::new(CountingNotifier::default());
        let auth = MemoryAuth::with_notifier(notifier.clone());

        auth.sign_up("ada@example.com", "secret1").await.unwrap();
        auth.register_provider("google", Identity::new("g-1").with_display_name("Grace"));
        auth.sign_in_with_provider("google").await.unwrap();
        auth.sign_in_with_provider("google").await.unwrap();
        settle().await;

        assert_eq!(notifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let auth = MemoryAuth::new();
        assert_eq!(
            auth.sign_in_with_provider("github").await,
            Err(AuthError::UnsupportedProvider("github".into()))
        );
    }
}
