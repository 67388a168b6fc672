//! Interactive chat session
//!
//! Runs the synchronization core against an in-memory backend and reads
//! commands from stdin. Plain lines are sent to the active room.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

use roomsync_core::session::NoopNotifier;
use roomsync_core::{
    AuthProvider, ChatResult, Config, MemoryAuth, MemoryStore, Message, MessageSynchronizer,
    RealtimeStore, RoomRegistry, SessionContext, SignupNotifier, SlackNotifier, SyncConfig,
};

use crate::output::Output;

/// Options for a chat session
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub email: String,
    pub password: String,
    pub room: Option<String>,
}

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatInput {
    Send(String),
    Rooms,
    Join(String),
    Create {
        name: String,
        description: Option<String>,
    },
    Who,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ChatInput {
    fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(command) = line.strip_prefix('/') else {
            if line.trim().is_empty() {
                return ChatInput::Empty;
            }
            return ChatInput::Send(line.to_string());
        };

        let (name, rest) = match command.split_once(' ') {
            Some((name, rest)) => (name, rest.trim()),
            None => (command.trim(), ""),
        };

        match name {
            "rooms" => ChatInput::Rooms,
            "join" if !rest.is_empty() => ChatInput::Join(rest.to_string()),
            "create" if !rest.is_empty() => {
                let (name, description) = match rest.split_once(' ') {
                    Some((name, description)) => (name, Some(description.trim().to_string())),
                    None => (rest, None),
                };
                ChatInput::Create {
                    name: name.to_string(),
                    description,
                }
            }
            "who" => ChatInput::Who,
            "help" => ChatInput::Help,
            "quit" | "exit" => ChatInput::Quit,
            _ => ChatInput::Unknown(line.to_string()),
        }
    }
}

const HELP: &str = "Commands:
  /rooms                      list rooms
  /join <room-id>             switch to a room
  /create <name> [description] create a room and join it
  /who                        show the signed-in user
  /quit                       leave
Anything else is sent as a message.";

/// Run a local chat session until stdin closes or /quit
pub async fn run(config: &Config, options: ChatOptions, output: &Output) -> Result<()> {
    let store: Arc<dyn RealtimeStore> = Arc::new(MemoryStore::new());
    let notifier: Arc<dyn SignupNotifier> = match SlackNotifier::from_config(&config.notify) {
        Ok(notifier) => Arc::new(notifier),
        Err(_) => Arc::new(NoopNotifier),
    };
    let auth = MemoryAuth::with_notifier(notifier);

    let identity = auth
        .sign_up(&options.email, &options.password)
        .await
        .context("Failed to sign up")?;
    output.success(&format!("Signed in as {}", identity.display_label()));

    let session = SessionContext::from_provider(&auth);
    let mut sync = MessageSynchronizer::new(Arc::clone(&store), session, SyncConfig::from(config));
    match options.room.as_deref() {
        Some(room) => sync.switch_room(room)?,
        None => sync.listen()?,
    }
    let mut registry = RoomRegistry::open(Arc::clone(&store))?;

    output.message(&format!("Joined #{} (type /help for commands)", sync.current_room_id()));
    let mut printer = spawn_printer(&sync, print_to(*output, &identity.uid));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match ChatInput::parse(&line) {
            ChatInput::Send(text) => {
                if let Err(e) = sync.send_message(&text).await {
                    output.error(&e.to_string());
                }
            }
            ChatInput::Rooms => output.print_rooms(&registry.rooms(), sync.current_room_id()),
            ChatInput::Join(room) => match follow_room(
                &mut sync,
                &room,
                &mut printer,
                print_to(*output, &identity.uid),
            ) {
                Ok(()) => output.message(&format!("Joined #{}", sync.current_room_id())),
                Err(e) => output.error(&e.to_string()),
            },
            ChatInput::Create { name, description } => {
                match sync.create_room(&name, description.as_deref()).await {
                    Ok(id) => {
                        output.success(&format!("Created room {} ({})", name, id));
                        match follow_room(
                            &mut sync,
                            &id,
                            &mut printer,
                            print_to(*output, &identity.uid),
                        ) {
                            Ok(()) => output.message(&format!("Joined #{}", id)),
                            Err(e) => output.error(&e.to_string()),
                        }
                    }
                    Err(e) => output.error(&e.to_string()),
                }
            }
            ChatInput::Who => match sync.session().current() {
                Some(who) => output.message(&format!(
                    "{} <{}> ({})",
                    who.display_label(),
                    who.email.as_deref().unwrap_or("no email"),
                    who.uid
                )),
                None => output.message("Not signed in"),
            },
            ChatInput::Help => output.message(HELP),
            ChatInput::Quit => break,
            ChatInput::Empty => {}
            ChatInput::Unknown(input) => {
                output.error(&format!("Unknown command: {} (try /help)", input));
            }
        }
    }

    debug!(room = %sync.current_room_id(), "Leaving chat session");
    printer.abort();
    sync.stop();
    registry.close();
    auth.sign_out().await?;

    Ok(())
}

/// Report each message of the view once
///
/// The printer belongs to one room: [`follow_room`] replaces it on every
/// switch so a revisited room is shown again in full.
fn spawn_printer<F>(sync: &MessageSynchronizer, mut on_new: F) -> JoinHandle<()>
where
    F: FnMut(&Message) + Send + 'static,
{
    let mut view = sync.subscribe();

    tokio::spawn(async move {
        let mut shown: HashSet<String> = HashSet::new();

        loop {
            let messages = view.borrow_and_update().clone();
            for message in &messages {
                let Some(id) = message.id.as_ref() else {
                    continue;
                };
                if shown.insert(id.clone()) {
                    on_new(message);
                }
            }

            if view.changed().await.is_err() {
                break;
            }
        }
    })
}

/// Switch rooms and restart the printer on the new room
fn follow_room<F>(
    sync: &mut MessageSynchronizer,
    room_id: &str,
    printer: &mut JoinHandle<()>,
    on_new: F,
) -> ChatResult<()>
where
    F: FnMut(&Message) + Send + 'static,
{
    printer.abort();
    let result = sync.switch_room(room_id);
    *printer = spawn_printer(sync, on_new);
    result
}

fn print_to(output: Output, own_uid: &str) -> impl FnMut(&Message) + Send + 'static {
    let own_uid = own_uid.to_string();
    move |message: &Message| output.print_message(message, &own_uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    fn recorder(seen: &Arc<Mutex<Vec<String>>>) -> impl FnMut(&Message) + Send + 'static {
        let seen = Arc::clone(seen);
        move |message: &Message| seen.lock().unwrap().push(message.text.clone())
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_revisited_room_is_printed_again() {
        let store = Arc::new(MemoryStore::new());
        for (room, text) in [("a", "in a"), ("b", "in b")] {
            store
                .append(
                    &format!("rooms/{}/messages", room),
                    json!({"text": text, "userId": "u1", "timestamp": 1}),
                )
                .await
                .unwrap();
        }

        let mut sync = MessageSynchronizer::new(
            store.clone(),
            SessionContext::anonymous(),
            SyncConfig::default(),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut printer = spawn_printer(&sync, recorder(&seen));

        for room in ["a", "b", "a"] {
            follow_room(&mut sync, room, &mut printer, recorder(&seen)).unwrap();
            settle().await;
        }
        printer.abort();

        assert_eq!(*seen.lock().unwrap(), vec!["in a", "in b", "in a"]);
    }

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(
            ChatInput::parse("hello there\n"),
            ChatInput::Send("hello there".into())
        );
        assert_eq!(ChatInput::parse("   "), ChatInput::Empty);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ChatInput::parse("/rooms"), ChatInput::Rooms);
        assert_eq!(ChatInput::parse("/join ops"), ChatInput::Join("ops".into()));
        assert_eq!(ChatInput::parse("/quit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("/exit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("/who"), ChatInput::Who);
        assert_eq!(ChatInput::parse("/help"), ChatInput::Help);
    }

    #[test]
    fn test_parse_create() {
        assert_eq!(
            ChatInput::parse("/create ops the ops room"),
            ChatInput::Create {
                name: "ops".into(),
                description: Some("the ops room".into()),
            }
        );
        assert_eq!(
            ChatInput::parse("/create ops"),
            ChatInput::Create {
                name: "ops".into(),
                description: None,
            }
        );
    }

    #[test]
    fn test_parse_incomplete_commands() {
        assert_eq!(ChatInput::parse("/join"), ChatInput::Unknown("/join".into()));
        assert_eq!(
            ChatInput::parse("/dance now"),
            ChatInput::Unknown("/dance now".into())
        );
    }
}
