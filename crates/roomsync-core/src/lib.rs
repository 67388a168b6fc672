//! roomsync Core Library
//!
//! This crate provides the client-side core of roomsync, a chat front end
//! whose accounts, storage and push delivery live in a hosted backend.
//!
//! # Architecture
//!
//! - **Realtime store**: source of truth for rooms and messages, reached
//!   through the `RealtimeStore` trait (append + live queries)
//! - **Auth backend**: publishes the signed-in identity through the
//!   `AuthProvider` trait
//!
//! The core keeps a local, ordered view of the active room in step with the
//! store and checks the session before writing.
//!
//! # Quick Start
//!
//! ```text
//! let store: Arc<dyn RealtimeStore> = Arc::new(MemoryStore::new());
//! let auth = MemoryAuth::new();
//! auth.sign_up("ada@example.com", "secret1").await?;
//!
//! let session = SessionContext::from_provider(&auth);
//! let mut sync = MessageSynchronizer::new(store, session, SyncConfig::default());
//! sync.listen()?;
//! sync.send_message("hello").await?;
//! ```
//!
//! # Modules
//!
//! - `sync`: room channels, the message synchronizer and the room registry
//! - `session`: session context, auth collaborator and signup notifications
//! - `store`: realtime store collaborator and its in-memory implementation
//! - `models`: Message and Room records
//! - `identity`: the signed-in user
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod session;
pub mod store;
pub mod sync;

pub use config::{Config, NotifyConfig};
pub use error::{AuthError, ChatError, ChatResult, NotifyError, StoreError, StoreResult};
pub use identity::Identity;
pub use models::{Message, Room};
pub use session::{AuthProvider, MemoryAuth, SessionContext, SignupNotifier, SlackNotifier};
pub use store::{MemoryStore, RealtimeStore};
pub use sync::{MessageSynchronizer, RoomChannel, RoomRegistry, SyncConfig};
