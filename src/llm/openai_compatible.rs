//! OpenAI-compatible chat client implementation.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ChatClient;
use crate::toolgen::ToolSchema;
use crate::types::{ChatRequest, ChatResponse, Message, Role, ToolCall};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiCompatibleClient {
    api_key: String,
    api_base: String,
    client: reqwest::Client,
}

// --- API request types (OpenAI format) ---

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    /// Always `false` when tools are attached: the executor's serial
    /// dispatch depends on at most one action set per turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel_tool_calls: Option<bool>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct ApiTool {
    r#type: String,
    function: ToolSchema,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiToolCallFunction,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ApiToolCallFunction {
    name: String,
    arguments: String,
}

// --- API response types ---

#[derive(Deserialize, Debug)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize, Debug)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ApiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

impl OpenAiCompatibleClient {
    pub fn new(api_key: String, api_base: Option<String>) -> Self {
        Self {
            api_key,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            client: reqwest::Client::new(),
        }
    }

    fn convert_message(message: &Message) -> ApiMessage {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let tool_calls = if message.tool_calls.is_empty() {
            None
        } else {
            Some(
                message
                    .tool_calls
                    .iter()
                    .map(|tc| ApiToolCall {
                        id: tc.id.clone(),
                        r#type: "function".to_string(),
                        function: ApiToolCallFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect(),
            )
        };

        ApiMessage {
            role: role.to_string(),
            content: Some(message.content.clone()),
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }

    async fn post_chat(&self, body: &ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("API error {}: {}", status, text));
        }

        response
            .json::<ApiResponse>()
            .await
            .context("Failed to decode chat completion response")
    }
}

#[async_trait]
impl ChatClient for OpenAiCompatibleClient {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let tools: Vec<ApiTool> = request
            .tools
            .iter()
            .map(|schema| ApiTool {
                r#type: "function".to_string(),
                function: schema.clone(),
            })
            .collect();

        let body = ApiRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            parallel_tool_calls: if tools.is_empty() { None } else { Some(false) },
            tools,
        };

        let api_response = self.post_chat(&body).await?;
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Chat completion returned no choices"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }

    async fn complete_text(&self, model: &str, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = ApiRequest {
            model: model.to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
                tool_calls: None,
                tool_call_id: None,
            }],
            max_tokens,
            tools: vec![],
            parallel_tool_calls: None,
        };

        let api_response = self.post_chat(&body).await?;
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Text completion returned no choices"))?;

        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }

    fn name(&self) -> &str {
        "openai_compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_tool_result_message() {
        let msg = Message::tool_result("call_1", "{\"error\":\"boom\"}");
        let api = OpenAiCompatibleClient::convert_message(&msg);
        assert_eq!(api.role, "tool");
        assert_eq!(api.tool_call_id.as_deref(), Some("call_1"));
        assert!(api.tool_calls.is_none());
    }

    #[test]
    fn test_convert_assistant_message_with_tool_calls() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall {
                id: "call_2".to_string(),
                name: "add".to_string(),
                arguments: "{\"a\":1,\"b\":2}".to_string(),
            }],
        );
        let api = OpenAiCompatibleClient::convert_message(&msg);
        assert_eq!(api.role, "assistant");
        let calls = api.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "add");
        assert_eq!(calls[0].r#type, "function");
    }

    #[test]
    fn test_parallel_tool_calls_disabled_with_tools() {
        let request = ApiRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![],
            max_tokens: 100,
            tools: vec![ApiTool {
                r#type: "function".to_string(),
                function: ToolSchema {
                    name: "noop".to_string(),
                    description: String::new(),
                    parameters: None,
                },
            }],
            parallel_tool_calls: Some(false),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["parallel_tool_calls"], serde_json::json!(false));
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "noop");
    }
}
