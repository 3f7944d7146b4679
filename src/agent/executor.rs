//! Plan execution loop.
//!
//! Drives the executor model against the tool registry one turn at a time.
//! Tool calls are processed strictly serially (the client disables parallel
//! tool calls whenever tools are attached), failures are fed back to the
//! model as error payloads instead of aborting, and a call to the
//! completion sentinel ends the run.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::llm::ChatClient;
use crate::toolgen::{ToolRegistry, SENTINEL_TOOL};
use crate::types::{ChatRequest, Message};

use super::transcript::{Transcript, TranscriptEvent};

pub const EXECUTOR_PROMPT: &str = "\
You are a helpful assistant responsible for executing the plan on household
management. Your task is to follow the plan exactly as it is written
and perform the necessary actions the tools available to you and asked of you.

You must explain your decision-making process across various steps.

# Steps

1. **Read and Understand plan**: Carefully read and fully understand the given plan on household management.
2. **Identify the exact step in the plan**: Determine which step in the plan you are at, and execute the instructions according to the policy.
3. **Decision Making**: Briefly explain your actions and why you are performing them.
4. **Action Execution**: Perform the actions required by calling any relevant functions and input parameters.

PLAN:
{plan}
";

/// Runs a plan against the registry until the model signals completion.
pub struct Executor<'a> {
    client: &'a dyn ChatClient,
    registry: &'a ToolRegistry,
    model: &'a str,
    max_tokens: u32,
    max_turns: usize,
}

impl<'a> Executor<'a> {
    pub fn new(
        client: &'a dyn ChatClient,
        registry: &'a ToolRegistry,
        model: &'a str,
        max_tokens: u32,
        max_turns: usize,
    ) -> Self {
        Self {
            client,
            registry,
            model,
            max_tokens,
            max_turns,
        }
    }

    /// Executes `plan` and returns the full conversation, sentinel turn
    /// included. Errors only on transport failures or a blown turn budget;
    /// individual tool failures go back to the model.
    pub async fn run(&self, plan: &str, transcript: &mut Transcript) -> Result<Vec<Message>> {
        let mut messages = vec![Message::system(EXECUTOR_PROMPT.replace("{plan}", plan))];

        for turn in 0..self.max_turns {
            let request = ChatRequest {
                model: self.model.to_string(),
                messages: messages.clone(),
                tools: self.registry.schemas().to_vec(),
                max_tokens: self.max_tokens,
            };
            let response = self
                .client
                .chat_completion(&request)
                .await
                .with_context(|| format!("executor turn {} failed", turn))?;

            transcript.push(TranscriptEvent::Assistant(response.content.clone()));
            messages.push(Message::assistant_with_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            if response
                .tool_calls
                .iter()
                .any(|call| call.name == SENTINEL_TOOL)
            {
                debug!(turn, "completion sentinel received");
                return Ok(messages);
            }

            if !response.has_tool_calls() {
                continue;
            }

            for call in &response.tool_calls {
                transcript.push(TranscriptEvent::ToolCall {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                });

                let args: Value = match serde_json::from_str(&call.arguments) {
                    Ok(args) => args,
                    Err(e) => {
                        // Unparseable arguments: the call gets no result
                        // message, matching serial execution of only the
                        // calls we can decode.
                        warn!(tool = %call.name, error = %e,
                              "skipping tool call with malformed arguments");
                        continue;
                    }
                };

                let payload = match self.registry.callable(&call.name) {
                    Some(callable) => match callable(args).await {
                        Ok(value) => value,
                        Err(e) => json!({ "error": e.to_string() }),
                    },
                    None => json!({
                        "error": format!("Function '{}' is not implemented.", call.name)
                    }),
                };

                let serialized = payload.to_string();
                transcript.push(TranscriptEvent::ToolResponse {
                    name: call.name.clone(),
                    response: serialized.clone(),
                });
                messages.push(Message::tool_result(call.id.clone(), serialized));
            }
        }

        bail!("plan execution exceeded {} turns", self.max_turns)
    }
}
