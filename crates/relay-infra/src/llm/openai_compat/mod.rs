//! OpenAI-compatible LLM provider implementation.
//!
//! A single [`OpenAiCompatibleProvider`] serves OpenAI and any endpoint that
//! speaks the chat completions protocol (local gateways, proxies) via a
//! configurable base URL. Streaming uses `reqwest-eventsource`.

pub mod config;
pub mod streaming;
pub mod types;

use secrecy::SecretString;

use relay_core::llm::provider::{EventStream, LlmProvider};
use relay_types::llm::{CompletionRequest, LlmError, PromptMessage};
use relay_types::message::Role;

use self::config::OpenAiCompatConfig;
use self::streaming::create_openai_stream;
use self::types::{
    ChatFunctionCall, ChatFunctionDef, ChatMessage, ChatRequest, ChatTool, ChatToolCall,
    StreamOptions,
};

/// Unified provider for any OpenAI-compatible API.
///
/// # API Key Security
///
/// The key is held as a [`SecretString`] and only exposed when building the
/// `Authorization` header. The type does not derive Debug.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    provider_name: String,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider from a configuration.
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            provider_name: config.provider_name,
            base_url: config.base_url,
            api_key: config.api_key,
            model: config.model,
        })
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build a [`ChatRequest`] from a generic [`CompletionRequest`].
    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: Role::System.to_string(),
                content: Some(system.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        messages.extend(request.messages.iter().map(to_chat_message));

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let tools: Option<Vec<ChatTool>> = request.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|tool| ChatTool {
                    kind: "function".to_string(),
                    function: ChatFunctionDef {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect()
        });
        let tool_choice = tools.as_ref().map(|_| "auto".to_string());

        ChatRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
            tools,
            tool_choice,
        }
    }
}

fn to_chat_message(message: &PromptMessage) -> ChatMessage {
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| ChatToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: ChatFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
        )
    };

    // An assistant turn that only requests tools carries no content.
    let content = if tool_calls.is_some() && message.content.is_empty() {
        None
    } else {
        Some(message.content.clone())
    };

    ChatMessage {
        role: message.role.to_string(),
        content,
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let body = self.build_request(&request);
        create_openai_stream(&self.client, &self.url(), body, self.api_key.as_ref())
    }
}
