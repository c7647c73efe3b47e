//! Durable conversation storage for Attune.
//!
//! Single source of truth for conversations, messages, the rolling emotion
//! log, and user preferences. Persists through a key-value abstraction and
//! computes time-windowed emotional insights over stored messages.

pub mod kv;
pub mod store;

pub use kv::{FileKvStore, KvStore, MemoryKvStore};
pub use store::ConversationStore;
