//! Message History Storage
//!
//! Durable, append-only record of every published message.
//!
//! - **sink**: the `MessageSink` trait the publish path writes through
//! - **sqlite**: SQLite-backed implementation
//! - **types**: `StoredMessage` record
//! - **error**: Error types
//!
//! # Write Path
//!
//! ```text
//! POST /publish → MessageSink::append(channel, content)
//!   → spawn_blocking → INSERT INTO messages → id
//! ```
//!
//! Storage is independent of live delivery: a message can be recorded but
//! never delivered (no subscribers), or delivered but not recorded (append
//! failed after the broker accepted it).
//!
//! # Example
//!
//! ```rust,no_run
//! use relay::storage::{MessageSink, SqliteMessageStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteMessageStore::open("./relay.db")?;
//!
//!     let id = store.append("room1", "hi").await?;
//!     let recent = store.recent("room1", 10).await?;
//!
//!     println!("stored #{id}, {} in history", recent.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod sink;
pub mod sqlite;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use sink::MessageSink;
pub use sqlite::SqliteMessageStore;
pub use types::StoredMessage;
