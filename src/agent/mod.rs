//! The plan-then-execute agent.
//!
//! A run is two model phases: the planner turns the goal into a numbered
//! plan, then the executor drives that plan against the tool registry until
//! it calls the completion sentinel. The transcript records both phases.

pub mod executor;
pub mod planner;
pub mod transcript;

use std::sync::Arc;

use anyhow::Result;

use crate::config::AppConfig;
use crate::llm::ChatClient;
use crate::toolgen::ToolRegistry;
use crate::types::Message;

use executor::Executor;
use transcript::{Transcript, TranscriptEvent};

pub struct Agent {
    client: Arc<dyn ChatClient>,
    registry: ToolRegistry,
    config: AppConfig,
}

impl Agent {
    pub fn new(client: Arc<dyn ChatClient>, registry: ToolRegistry, config: AppConfig) -> Self {
        Self {
            client,
            registry,
            config,
        }
    }

    /// Generates a plan for `goal` without executing it.
    pub async fn plan(&self, goal: &str) -> Result<String> {
        planner::call_planner(
            self.client.as_ref(),
            &self.config.llm.planner_model,
            self.registry.descriptions(),
            goal,
            self.config.llm.max_tokens,
        )
        .await
    }

    /// Full run: plan, then execute until the sentinel. Returns the
    /// executor conversation; the transcript captures everything shown to
    /// the user along the way.
    pub async fn run(&self, goal: &str, transcript: &mut Transcript) -> Result<Vec<Message>> {
        transcript.push(TranscriptEvent::Status("Generating plan...".to_string()));
        let plan = self.plan(goal).await?;
        transcript.push(TranscriptEvent::Plan(plan.clone()));

        transcript.push(TranscriptEvent::Status("Executing plan...".to_string()));
        let executor = Executor::new(
            self.client.as_ref(),
            &self.registry,
            &self.config.llm.executor_model,
            self.config.llm.max_tokens,
            self.config.agent.max_turns,
        );
        let messages = executor.run(&plan, transcript).await?;

        transcript.push(TranscriptEvent::Status("Processing complete.".to_string()));
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolgen::{InstanceArena, ToolRegistryBuilder, SENTINEL_TOOL};
    use crate::types::{ChatRequest, ChatResponse, ToolCall};
    use anyhow::bail;
    use async_trait::async_trait;

    /// Returns a canned plan from `complete_text` and a sentinel call from
    /// `chat_completion`.
    struct OneShotClient;

    #[async_trait]
    impl ChatClient for OneShotClient {
        async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse> {
            if request.messages.is_empty() {
                bail!("empty request");
            }
            Ok(ChatResponse {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: "done".to_string(),
                    name: SENTINEL_TOOL.to_string(),
                    arguments: "{}".to_string(),
                }],
            })
        }

        async fn complete_text(
            &self,
            _model: &str,
            prompt: &str,
            _max_tokens: u32,
        ) -> Result<String> {
            assert!(prompt.contains("recipe"));
            Ok("1. call `instructions_complete`".to_string())
        }

        fn name(&self) -> &str {
            "one-shot"
        }
    }

    #[test]
    fn test_run_records_all_phases() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let registry = ToolRegistryBuilder::new(Arc::new(InstanceArena::new()))
                .build()
                .await;
            let agent = Agent::new(Arc::new(OneShotClient), registry, AppConfig::default());

            let mut transcript = Transcript::new();
            agent
                .run("[https://example.com/recipe]", &mut transcript)
                .await
                .unwrap();

            let statuses: Vec<&str> = transcript
                .events()
                .filter_map(|e| match e {
                    TranscriptEvent::Status(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            assert_eq!(
                statuses,
                vec![
                    "Generating plan...",
                    "Executing plan...",
                    "Processing complete."
                ]
            );
            assert!(transcript
                .events()
                .any(|e| matches!(e, TranscriptEvent::Plan(_))));
        });
    }
}
