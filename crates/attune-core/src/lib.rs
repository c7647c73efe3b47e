//! Core domain types for the Attune conversation engine.
//!
//! Defines the shared data model (conversations, messages, speech-analysis
//! results, emotional insights), the error taxonomy, configuration loading,
//! and telemetry bootstrap used by the other Attune crates.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::AttuneConfig;
pub use error::{AttuneError, Result};
pub use types::{
    Conversation, EmotionAnalysis, EmotionHistoryEntry, EmotionScore, EmotionalInsights, Message,
    ProcessingResult, Role, Sentiment, UserPreferences,
};
