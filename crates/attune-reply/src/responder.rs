//! Reply orchestration with absorbed collaborator failure.

use async_trait::async_trait;
use tracing::warn;

use attune_core::error::Result;

use crate::context::ReplyContext;
use crate::fallback::fallback_reply;

/// External reply collaborator (typically a hosted LLM behind HTTP).
#[async_trait]
pub trait ReplyAgent: Send + Sync {
    /// Produce a reply for the given context.
    async fn generate(&self, context: &ReplyContext) -> Result<String>;
}

/// Wraps a [`ReplyAgent`] so that conversation flow never depends on it.
///
/// Any agent failure (or an empty reply) is absorbed into the
/// deterministic fallback table rather than surfaced to the caller.
pub struct Responder {
    agent: Box<dyn ReplyAgent>,
}

impl Responder {
    pub fn new(agent: Box<dyn ReplyAgent>) -> Self {
        Self { agent }
    }

    /// Produce a reply, falling back deterministically on failure.
    pub async fn reply(&self, context: &ReplyContext) -> String {
        match self.agent.generate(context).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("Reply agent returned an empty reply; using fallback");
                self.fallback(context)
            }
            Err(e) => {
                warn!(error = %e, "Reply agent failed; using fallback");
                self.fallback(context)
            }
        }
    }

    fn fallback(&self, context: &ReplyContext) -> String {
        fallback_reply(&context.emotions.primary_emotion, context.sentiment).to_string()
    }
}
