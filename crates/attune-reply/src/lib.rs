//! Reply generation for the Attune companion.
//!
//! Defines the seam to the external reply collaborator (a hosted LLM),
//! the conversation context window handed to it, and the deterministic
//! fallback table used whenever the collaborator fails. Collaborator
//! failure never interrupts the conversation flow.

pub mod context;
pub mod fallback;
pub mod responder;

pub use context::{HistoryTurn, Personality, ReplyContext};
pub use fallback::{fallback_reply, FallbackEmotion};
pub use responder::{ReplyAgent, Responder};
