use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// The author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Spoken input from the person using the app.
    User,
    /// Generated reply from the companion.
    Assistant,
}

/// Overall sentiment classification of an utterance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Signed score used for averaging: positive counts as `+confidence`,
    /// negative as `-confidence`, neutral as zero.
    pub fn signed_score(&self, confidence: f64) -> f64 {
        match self {
            Sentiment::Positive => confidence,
            Sentiment::Negative => -confidence,
            Sentiment::Neutral => 0.0,
        }
    }
}

// =============================================================================
// Speech analysis results
// =============================================================================

/// One scored emotion from the backend's ranked emotion list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub emotion: String,
    pub score: f64,
}

/// Emotion breakdown for a single utterance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    /// Strongest detected emotion (backend vocabulary, e.g. "joy").
    pub primary_emotion: String,
    /// Coarse grouping of the primary emotion (e.g. "positive_affect").
    pub category: String,
    /// Qualitative strength label (e.g. "mild", "strong").
    pub intensity: String,
    /// Confidence in the primary emotion, 0.0 to 1.0.
    pub confidence: f64,
    /// All detected emotions, strongest first.
    #[serde(default)]
    pub top_emotions: Vec<EmotionScore>,
}

/// Structured output of one backend speech-analysis run.
///
/// Produced once per audio submission and read-only afterward. The backend
/// returns everything except `total_processing_time`, which the API client
/// stamps from the wall clock spanning all attempts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub transcript: String,
    pub sentiment: Sentiment,
    /// Confidence in the sentiment label, 0.0 to 1.0.
    pub sentiment_confidence: f64,
    pub emotions: EmotionAnalysis,
    /// Elapsed seconds from first attempt to final success.
    #[serde(default)]
    pub total_processing_time: f64,
}

// =============================================================================
// Conversations
// =============================================================================

/// A single message in a conversation.
///
/// Immutable once created; owned exclusively by its parent conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_result: Option<ProcessingResult>,
}

impl Message {
    /// Create a user message carrying the speech-analysis result.
    pub fn user(content: impl Into<String>, result: ProcessingResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            processing_result: Some(result),
        }
    }

    /// Create an assistant reply message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            processing_result: None,
        }
    }
}

/// An ordered, persisted sequence of messages.
///
/// Message order is strictly chronological by insertion; messages are never
/// reordered or mutated after the fact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Derived emotional state
// =============================================================================

/// One entry in the rolling emotion log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionHistoryEntry {
    pub emotion: String,
    pub timestamp: DateTime<Utc>,
    /// Strength of the detected emotion, 0.0 to 1.0.
    pub intensity: f64,
}

/// Time-windowed aggregate over analyzed messages.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionalInsights {
    /// Most frequent primary emotion in the window; ties broken by the
    /// most recent occurrence. `None` when the window is empty.
    pub dominant_emotion: Option<String>,
    /// Mean of signed sentiment scores across matched messages.
    pub average_sentiment: f64,
    /// Number of matched messages per emotion category.
    pub category_counts: HashMap<String, usize>,
    /// Number of analyzed messages that fell inside the window.
    pub message_count: usize,
}

// =============================================================================
// Preferences
// =============================================================================

/// Flat record of user-facing behavior toggles, persisted verbatim.
///
/// Every field defaults individually so that stored payloads written by
/// older or newer versions still deserialize (unknown fields are ignored,
/// missing fields fall back to defaults).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Reply personality identifier (e.g. "supportive").
    pub personality: String,
    /// Preferred transcription language code; empty means auto-detect.
    pub language: String,
    /// Let the backend pick the language when none is set.
    pub auto_detect_language: bool,
    /// Speak replies aloud.
    pub voice_replies: bool,
    /// Show the wellness dashboard on launch.
    pub show_dashboard: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            personality: "supportive".to_string(),
            language: String::new(),
            auto_detect_language: true,
            voice_replies: false,
            show_dashboard: true,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
