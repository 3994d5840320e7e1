//! Completion engine: the streaming and tool-call state machine.
//!
//! A run streams text from the backend as it arrives, buffers tool-call
//! fragments, and at end of turn either finishes or (when tools are allowed
//! and were requested) executes the buffered calls sequentially in arrival
//! order and streams exactly one follow-up round with no tools offered.

pub mod fragment;
pub mod prompt;
mod tool_calls;

use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use serde_json::json;
use tracing::{Span, debug, field, info_span, warn};

use relay_observe::genai_attrs::{
    GEN_AI_RESPONSE_FINISH_REASONS, GEN_AI_USAGE_INPUT_TOKENS, GEN_AI_USAGE_OUTPUT_TOKENS, OP_CHAT,
};
use relay_types::config::LlmConfig;
use relay_types::llm::{CompletionRequest, PromptMessage, StreamEvent, ToolCall};
use relay_types::message::{Message, Role};
use relay_types::tool::ToolInvocation;

use crate::llm::provider::LlmProvider;
use crate::tool::executor::BoxToolExecutor;

pub use fragment::{Fragment, FragmentStream};
use tool_calls::{ToolCallBuffer, parse_arguments};

/// Phases of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Streaming,
    ToolExecuting,
    ToolsResolved,
    FollowupStreaming,
    Done,
}

/// Request parameters shared by every run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl From<&LlmConfig> for EngineSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

pub struct CompletionEngine {
    provider: Arc<dyn LlmProvider>,
    tools: BoxToolExecutor,
    settings: EngineSettings,
}

impl CompletionEngine {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: BoxToolExecutor, settings: EngineSettings) -> Self {
        Self {
            provider,
            tools,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Start a fresh run over `history`.
    ///
    /// The returned stream is lazy: nothing is sent to the backend until it
    /// is first polled. Dropping it cancels the run at its current await.
    pub fn generate(&self, history: &[Message], allow_tools: bool) -> FragmentStream {
        let offered = if allow_tools {
            Some(self.tools.definitions()).filter(|defs| !defs.is_empty())
        } else {
            None
        };
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: prompt_messages(history),
            system: Some(prompt::system_prompt(Utc::now())),
            max_tokens: self.settings.max_tokens,
            temperature: Some(self.settings.temperature),
            stream: true,
            tools: offered,
        };

        let span = info_span!(
            "chat",
            gen_ai.operation.name = OP_CHAT,
            gen_ai.provider.name = %self.provider.name(),
            gen_ai.request.model = %self.settings.model,
            gen_ai.request.max_tokens = self.settings.max_tokens,
            gen_ai.request.temperature = self.settings.temperature,
            gen_ai.response.finish_reasons = field::Empty,
            gen_ai.usage.input_tokens = field::Empty,
            gen_ai.usage.output_tokens = field::Empty,
            allow_tools,
        );

        let provider = Arc::clone(&self.provider);
        let tools = self.tools.clone();

        Box::pin(async_stream::stream! {
            let mut phase = advance(&span, EnginePhase::Idle, EnginePhase::Streaming);
            let mut request = request;

            'run: loop {
                let followup = phase == EnginePhase::FollowupStreaming;
                let mut events = provider.stream(request.clone());
                let mut text = String::new();
                let mut buffer = ToolCallBuffer::default();
                let mut ignored_calls = 0usize;

                while let Some(event) = events.next().await {
                    match event {
                        Ok(StreamEvent::TextDelta { text: delta }) => {
                            if delta.is_empty() {
                                continue;
                            }
                            text.push_str(&delta);
                            yield Fragment::Text(delta);
                        }
                        Ok(StreamEvent::ToolCallDelta { index, id, name, arguments }) => {
                            if followup {
                                ignored_calls += 1;
                            } else {
                                buffer.push(index, id, name, arguments);
                            }
                        }
                        Ok(StreamEvent::MessageDelta { stop_reason }) => {
                            span.record(GEN_AI_RESPONSE_FINISH_REASONS, field::display(stop_reason));
                        }
                        Ok(StreamEvent::Usage(usage)) => {
                            span.record(GEN_AI_USAGE_INPUT_TOKENS, usage.input_tokens);
                            span.record(GEN_AI_USAGE_OUTPUT_TOKENS, usage.output_tokens);
                        }
                        Ok(StreamEvent::Connected) => {}
                        Ok(StreamEvent::Done) => break,
                        Err(e) => {
                            warn!(parent: &span, error = %e, ?phase, "backend stream failed");
                            yield Fragment::Error(e.to_string());
                            break 'run;
                        }
                    }
                }

                if followup {
                    if ignored_calls > 0 {
                        debug!(parent: &span, ignored_calls, "tool calls during follow-up not honored");
                    }
                    break 'run;
                }
                if buffer.is_empty() {
                    break 'run;
                }
                if !allow_tools {
                    debug!(parent: &span, "tool calls requested without tools allowed, ignoring");
                    break 'run;
                }

                let calls = buffer.finish();
                yield Fragment::ToolNotice {
                    tools: calls.iter().map(|c| c.name.clone()).collect(),
                };
                phase = advance(&span, phase, EnginePhase::ToolExecuting);

                let mut invocations = Vec::with_capacity(calls.len());
                for call in &calls {
                    invocations.push(resolve(&tools, call).await);
                }
                phase = advance(&span, phase, EnginePhase::ToolsResolved);

                request.tools = None;
                request
                    .messages
                    .push(PromptMessage::assistant_with_tool_calls(text, calls));
                for invocation in &invocations {
                    request.messages.push(PromptMessage::tool_result(
                        invocation.id.clone(),
                        invocation.result.to_string(),
                    ));
                }
                phase = advance(&span, phase, EnginePhase::FollowupStreaming);
            }

            advance(&span, phase, EnginePhase::Done);
        })
    }
}

fn advance(span: &Span, from: EnginePhase, to: EnginePhase) -> EnginePhase {
    debug!(parent: span, ?from, ?to, "engine phase");
    to
}

/// Conversation history as backend messages. System prompts are synthesized
/// per run and tool traces are not replayed, so both roles are skipped.
fn prompt_messages(history: &[Message]) -> Vec<PromptMessage> {
    history
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        .map(|m| PromptMessage::new(m.role, m.content.clone()))
        .collect()
}

/// Run one call. Failures become an error payload in place of the result.
async fn resolve(tools: &BoxToolExecutor, call: &ToolCall) -> ToolInvocation {
    let (arguments, result) = match parse_arguments(&call.arguments) {
        Ok(arguments) => {
            let result = match tools.execute(&call.name, &arguments).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "tool execution failed");
                    json!({ "error": e.to_string() })
                }
            };
            (arguments, result)
        }
        Err(e) => {
            warn!(tool = %call.name, error = %e, "tool arguments rejected");
            (
                serde_json::Value::Null,
                json!({ "error": format!("invalid tool arguments: {e}") }),
            )
        }
    };
    debug!(tool = %call.name, id = %call.id, "tool call resolved");
    ToolInvocation {
        id: call.id.clone(),
        name: call.name.clone(),
        arguments,
        result,
    }
}
