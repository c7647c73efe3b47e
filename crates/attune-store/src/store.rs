//! Conversation store: persistence and emotional aggregation.
//!
//! Owns the in-memory view of all conversations, the explicit
//! current-conversation pointer, the bounded emotion log, and user
//! preferences. Every mutation is written through to the key-value store;
//! a write failure flips the store into degraded mode (in-memory only)
//! instead of failing the operation.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use attune_core::error::{AttuneError, Result};
use attune_core::types::{
    Conversation, EmotionHistoryEntry, EmotionalInsights, Message, UserPreferences,
};

use crate::kv::{decode_or_default, KvStore};

/// Storage keys for the persisted state.
const KEY_CONVERSATIONS: &str = "conversations";
const KEY_CURRENT: &str = "current_conversation";
const KEY_EMOTION_HISTORY: &str = "emotion_history";
const KEY_PREFERENCES: &str = "preferences";

/// Upper bound on the rolling emotion log; oldest entries evicted first.
const EMOTION_HISTORY_CAP: usize = 100;

/// Explicit record for the current-conversation pointer.
///
/// Kept separate from the conversations themselves so that exactly zero or
/// one conversation is current at any time, and so the pointer can be
/// persisted and validated independently.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct CurrentPointer {
    id: Option<Uuid>,
}

/// Single source of truth for conversations and derived emotional state.
pub struct ConversationStore {
    kv: Box<dyn KvStore>,
    conversations: Vec<Conversation>,
    current: CurrentPointer,
    emotion_history: Vec<EmotionHistoryEntry>,
    preferences: UserPreferences,
    degraded: bool,
}

impl ConversationStore {
    /// Open the store, loading persisted state through defensive parsing.
    ///
    /// Unreadable or malformed payloads degrade to defaults; a read failure
    /// additionally marks the store degraded. Opening never fails.
    pub fn open(kv: Box<dyn KvStore>) -> Self {
        let mut degraded = false;

        let mut read = |key: &str| match kv.get(key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Storage read failed; continuing in memory");
                degraded = true;
                None
            }
        };

        let conversations: Vec<Conversation> = decode_or_default(KEY_CONVERSATIONS, read(KEY_CONVERSATIONS));
        let mut current: CurrentPointer = decode_or_default(KEY_CURRENT, read(KEY_CURRENT));
        let emotion_history: Vec<EmotionHistoryEntry> =
            decode_or_default(KEY_EMOTION_HISTORY, read(KEY_EMOTION_HISTORY));
        let preferences: UserPreferences = decode_or_default(KEY_PREFERENCES, read(KEY_PREFERENCES));

        // A pointer at a conversation that no longer exists is treated as
        // absent, not as an error.
        if let Some(id) = current.id {
            if !conversations.iter().any(|c| c.id == id) {
                warn!(%id, "Dropping dangling current-conversation pointer");
                current.id = None;
            }
        }

        info!(
            conversations = conversations.len(),
            emotion_entries = emotion_history.len(),
            "Conversation store opened"
        );

        Self {
            kv,
            conversations,
            current,
            emotion_history,
            preferences,
            degraded,
        }
    }

    /// Whether a storage failure has been observed this session.
    ///
    /// In degraded mode all operations keep working against the in-memory
    /// view; only durability is lost.
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    // -------------------------------------------------------------------------
    // Conversation lifecycle
    // -------------------------------------------------------------------------

    /// Allocate a new empty conversation, make it current, and persist it.
    pub fn create_conversation(&mut self) -> Conversation {
        let conversation = Conversation::new();
        debug!(id = %conversation.id, "Created conversation");

        self.conversations.push(conversation.clone());
        self.current.id = Some(conversation.id);
        self.persist_conversations();
        self.persist_current();

        conversation
    }

    /// The conversation marked current, or `None` if no valid pointer exists.
    pub fn current_conversation(&self) -> Option<&Conversation> {
        let id = self.current.id?;
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Point the current pointer at an existing conversation.
    ///
    /// Fails with `NotFound` for an unknown id; the pointer is never left
    /// referencing a conversation that does not exist.
    pub fn set_current_conversation(&mut self, id: Uuid) -> Result<()> {
        if !self.conversations.iter().any(|c| c.id == id) {
            return Err(AttuneError::NotFound(format!("conversation {}", id)));
        }
        self.current.id = Some(id);
        self.persist_current();
        Ok(())
    }

    /// All stored conversations, most recently updated first.
    pub fn conversations(&self) -> Vec<&Conversation> {
        let mut all: Vec<&Conversation> = self.conversations.iter().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }

    /// Permanently remove a conversation and all its messages.
    ///
    /// If the deleted conversation was current, the pointer is cleared; the
    /// caller is responsible for establishing a replacement.
    pub fn delete_conversation(&mut self, id: Uuid) -> Result<()> {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.conversations.len() == before {
            return Err(AttuneError::NotFound(format!("conversation {}", id)));
        }

        if self.current.id == Some(id) {
            self.current.id = None;
            self.persist_current();
        }
        self.persist_conversations();
        debug!(%id, "Deleted conversation");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Messages
    // -------------------------------------------------------------------------

    /// Append a message to the end of a conversation.
    ///
    /// Updates the conversation's `updated_at`, and records an entry in the
    /// emotion log when the message carries a speech-analysis result. Fails
    /// with `NotFound` if the conversation does not exist.
    pub fn append_message(&mut self, conversation_id: Uuid, message: Message) -> Result<()> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| AttuneError::NotFound(format!("conversation {}", conversation_id)))?;

        if let Some(ref result) = message.processing_result {
            self.emotion_history.push(EmotionHistoryEntry {
                emotion: result.emotions.primary_emotion.clone(),
                timestamp: message.timestamp,
                intensity: result.emotions.confidence,
            });
            while self.emotion_history.len() > EMOTION_HISTORY_CAP {
                self.emotion_history.remove(0);
            }
        }

        conversation.messages.push(message);
        conversation.updated_at = Utc::now();

        self.persist_conversations();
        self.persist_emotion_history();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Derived state
    // -------------------------------------------------------------------------

    /// The rolling emotion log, oldest first (at most 100 entries).
    pub fn emotion_history(&self) -> &[EmotionHistoryEntry] {
        &self.emotion_history
    }

    /// Aggregate emotional insights over the last `window_days` days.
    ///
    /// Scans analyzed messages across all conversations. An empty window
    /// yields a zeroed value, never an error.
    pub fn emotional_insights(&self, window_days: i64) -> EmotionalInsights {
        let now = Utc::now();
        let cutoff = now - Duration::days(window_days);

        // Per-emotion frequency plus the latest occurrence for tie-breaking.
        let mut emotion_freq: HashMap<&str, (usize, DateTime<Utc>)> = HashMap::new();
        let mut category_counts: HashMap<String, usize> = HashMap::new();
        let mut sentiment_sum = 0.0;
        let mut matched = 0usize;

        for conversation in &self.conversations {
            for message in &conversation.messages {
                if message.timestamp < cutoff || message.timestamp > now {
                    continue;
                }
                let Some(ref result) = message.processing_result else {
                    continue;
                };

                matched += 1;
                sentiment_sum += result.sentiment.signed_score(result.sentiment_confidence);
                *category_counts
                    .entry(result.emotions.category.clone())
                    .or_insert(0) += 1;

                let entry = emotion_freq
                    .entry(result.emotions.primary_emotion.as_str())
                    .or_insert((0, message.timestamp));
                entry.0 += 1;
                if message.timestamp > entry.1 {
                    entry.1 = message.timestamp;
                }
            }
        }

        if matched == 0 {
            return EmotionalInsights::default();
        }

        // Mode of the primary emotion; the most recent occurrence wins ties.
        let dominant_emotion = emotion_freq
            .iter()
            .max_by_key(|(_, (count, last_seen))| (*count, *last_seen))
            .map(|(emotion, _)| emotion.to_string());

        EmotionalInsights {
            dominant_emotion,
            average_sentiment: sentiment_sum / matched as f64,
            category_counts,
            message_count: matched,
        }
    }

    // -------------------------------------------------------------------------
    // Preferences
    // -------------------------------------------------------------------------

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    /// Replace and persist the user preferences verbatim.
    pub fn set_preferences(&mut self, preferences: UserPreferences) {
        self.preferences = preferences;
        self.persist(KEY_PREFERENCES, &self.preferences.clone());
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    fn persist_conversations(&mut self) {
        self.persist(KEY_CONVERSATIONS, &self.conversations.clone());
    }

    fn persist_current(&mut self) {
        self.persist(KEY_CURRENT, &self.current.clone());
    }

    fn persist_emotion_history(&mut self) {
        self.persist(KEY_EMOTION_HISTORY, &self.emotion_history.clone());
    }

    fn persist<T: Serialize>(&mut self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize state; continuing in memory");
                self.degraded = true;
                return;
            }
        };
        if let Err(e) = self.kv.put(key, &payload) {
            warn!(key, error = %e, "Storage write failed; continuing in memory");
            self.degraded = true;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
