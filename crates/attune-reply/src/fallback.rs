//! Deterministic fallback replies.
//!
//! When the reply collaborator fails, the reply is selected from a fixed
//! table: first by exact primary-emotion match, then by sentiment, with a
//! neutral default. Tagged enums keep both lookups exhaustive at build
//! time.

use attune_core::types::Sentiment;

/// Emotions with a dedicated fallback template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FallbackEmotion {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    Calm,
}

impl FallbackEmotion {
    /// Match a backend emotion label against the table. Exact,
    /// case-insensitive; unknown labels return `None` and fall through to
    /// the sentiment table.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "joy" => Some(FallbackEmotion::Joy),
            "sadness" => Some(FallbackEmotion::Sadness),
            "anger" => Some(FallbackEmotion::Anger),
            "fear" => Some(FallbackEmotion::Fear),
            "surprise" => Some(FallbackEmotion::Surprise),
            "disgust" => Some(FallbackEmotion::Disgust),
            "calm" => Some(FallbackEmotion::Calm),
            _ => None,
        }
    }

    /// Fixed reply template for this emotion.
    pub fn template(&self) -> &'static str {
        match self {
            FallbackEmotion::Joy => {
                "That sounds wonderful! It's great to hear some brightness in your day. \
                 What made it feel so good?"
            }
            FallbackEmotion::Sadness => {
                "I'm sorry things feel heavy right now. It's okay to sit with that \
                 feeling. Would you like to talk about what's weighing on you?"
            }
            FallbackEmotion::Anger => {
                "It sounds like something really got under your skin. That frustration \
                 is understandable. What happened?"
            }
            FallbackEmotion::Fear => {
                "That sounds unsettling. Feeling anxious about it makes sense. \
                 Sometimes naming the worry helps shrink it a little."
            }
            FallbackEmotion::Surprise => {
                "That sounds unexpected! How are you feeling about it now that it's \
                 sinking in?"
            }
            FallbackEmotion::Disgust => {
                "That clearly didn't sit right with you. It's fair to feel put off. \
                 What bothered you most about it?"
            }
            FallbackEmotion::Calm => {
                "It sounds like you're in a steady place right now. That's worth \
                 noticing and holding onto."
            }
        }
    }
}

/// Select the deterministic fallback reply.
///
/// Keyed first by exact primary-emotion match, then by sentiment,
/// defaulting to the neutral template.
pub fn fallback_reply(primary_emotion: &str, sentiment: Sentiment) -> &'static str {
    if let Some(emotion) = FallbackEmotion::from_label(primary_emotion) {
        return emotion.template();
    }
    match sentiment {
        Sentiment::Positive => {
            "I'm glad to hear a positive note in what you shared. Tell me more about it?"
        }
        Sentiment::Negative => {
            "That sounds hard. Whatever you're carrying, you don't have to sort it \
             out alone. I'm listening."
        }
        Sentiment::Neutral => {
            "Thanks for sharing that with me. I'm here and listening; tell me more \
             whenever you're ready."
        }
    }
}
