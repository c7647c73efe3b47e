//! Conversation context handed to the reply collaborator.

use serde::{Deserialize, Serialize};

use attune_core::types::{Conversation, EmotionAnalysis, ProcessingResult, Role, Sentiment};

/// Number of recent turns included in the collaborator context.
pub const CONTEXT_TURNS: usize = 8;

/// Reply personality selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    /// Warm, validating, emotionally attentive.
    #[default]
    Supportive,
    /// Direct and action-oriented.
    Coach,
    /// Minimal interjection, reflective listening.
    Listener,
}

impl Personality {
    /// Parse a stored personality identifier; unknown values fall back to
    /// the supportive default.
    pub fn from_label(label: &str) -> Self {
        match label {
            "coach" => Personality::Coach,
            "listener" => Personality::Listener,
            _ => Personality::Supportive,
        }
    }

    /// Instruction preamble sent to the collaborator.
    pub fn preamble(&self) -> &'static str {
        match self {
            Personality::Supportive => {
                "You are a warm, supportive companion. Acknowledge the speaker's \
                 feelings before anything else and respond with empathy."
            }
            Personality::Coach => {
                "You are a practical coach. Acknowledge briefly, then offer one \
                 small concrete step the speaker could take."
            }
            Personality::Listener => {
                "You are a quiet listener. Reflect back what you heard in a \
                 sentence or two and invite the speaker to continue."
            }
        }
    }
}

/// One prior turn of the conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// Everything the collaborator needs to produce a reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplyContext {
    /// What the speaker just said.
    pub transcript: String,
    pub sentiment: Sentiment,
    pub emotions: EmotionAnalysis,
    /// The most recent turns, oldest first, at most [`CONTEXT_TURNS`].
    pub history: Vec<HistoryTurn>,
    pub personality: Personality,
}

impl ReplyContext {
    /// Build a context from the conversation so far and the freshly
    /// analyzed utterance. History is truncated to the last
    /// [`CONTEXT_TURNS`] messages.
    pub fn from_conversation(
        conversation: &Conversation,
        result: &ProcessingResult,
        personality: Personality,
    ) -> Self {
        let skip = conversation.messages.len().saturating_sub(CONTEXT_TURNS);
        let history = conversation.messages[skip..]
            .iter()
            .map(|m| HistoryTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();

        Self {
            transcript: result.transcript.clone(),
            sentiment: result.sentiment,
            emotions: result.emotions.clone(),
            history,
            personality,
        }
    }
}
