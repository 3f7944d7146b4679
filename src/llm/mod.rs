//! LLM client module.
//!
//! `ChatClient` abstracts over the chat-completion service so the planner
//! and executor never see a wire format, and `Summarizer` is the optional
//! collaborator the registry uses to produce short tool descriptions.

pub mod openai_compatible;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ChatRequest, ChatResponse};

/// The chat-completion service consumed by the agent loop.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a chat completion request and wait for the full response.
    /// Implementations must disable parallel tool calls whenever the
    /// request carries tools; the executor depends on serial execution.
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// One-shot text completion: a single prompt in, plain text out.
    /// Used by the planner and the description summarizer.
    async fn complete_text(&self, model: &str, prompt: &str, max_tokens: u32) -> Result<String>;

    /// The client's display name (for logging).
    fn name(&self) -> &str;
}

/// Produces a concise, audience-friendly description from a tool's
/// signature and doc text. Optional: registries built without one fall
/// back to raw docs.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, signature_text: &str) -> Result<String>;
}

const DESCRIPTION_CLEANUP_PROMPT: &str = "\
You are a helpful assistant responsible for creating concise descriptions \
of functions.

You will be given a function signature and a brief description of the \
function's purpose. You should return a concise summary of what the \
function does (not how it does it) that is understandable to a general \
audience.

Function signature:
{text}
";

/// Summarizer backed by a cheap chat model.
pub struct LlmSummarizer {
    client: Arc<dyn ChatClient>,
    model: String,
    max_tokens: u32,
}

impl LlmSummarizer {
    pub fn new(client: Arc<dyn ChatClient>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, signature_text: &str) -> Result<String> {
        let prompt = DESCRIPTION_CLEANUP_PROMPT.replace("{text}", signature_text);
        let summary = self
            .client
            .complete_text(&self.model, &prompt, self.max_tokens)
            .await?;
        Ok(summary.trim().to_string())
    }
}
