//! Client-side room synchronization
//!
//! Keeps a local, ordered view of chat rooms in step with the realtime store.
//!
//! ## Components
//!
//! - `RoomChannel`: live feed of one room's most recent messages
//! - `MessageSynchronizer`: ordered view of the active room, sends, room
//!   switching and room creation
//! - `RoomRegistry`: live list of all rooms
//!
//! ## Usage
//!
//! ```ignore
//! let mut sync = MessageSynchronizer::new(store, session, SyncConfig::default());
//! sync.listen()?;
//! let mut view = sync.subscribe();
//! sync.send_message("hello").await?;
//! view.changed().await?;
//! ```

mod channel;
mod feed;
mod registry;
mod synchronizer;

pub use channel::{RoomChannel, DEFAULT_MESSAGE_LIMIT};
pub use feed::{FeedRecord, LiveFeed};
pub use registry::RoomRegistry;
pub use synchronizer::{MessageSynchronizer, SyncConfig, DEFAULT_ROOM};
