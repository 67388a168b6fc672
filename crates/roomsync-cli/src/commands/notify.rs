//! Signup notification command handler

use anyhow::{Context, Result};

use roomsync_core::{Config, Identity, SignupNotifier, SlackNotifier};

use crate::output::Output;

/// Post a new-user announcement for the given account
pub async fn signup(
    config: &Config,
    uid: String,
    email: Option<String>,
    name: Option<String>,
    output: &Output,
) -> Result<()> {
    let notifier = SlackNotifier::from_config(&config.notify)
        .context("Cannot send signup notification")?;

    let mut identity = Identity::new(uid);
    identity.email = email;
    identity.display_name = name;

    notifier
        .notify_signup(&identity)
        .await
        .context("Failed to send signup notification")?;

    output.success(&format!(
        "Signup notification for {} posted to {}",
        identity.uid,
        notifier.channel()
    ));
    Ok(())
}
