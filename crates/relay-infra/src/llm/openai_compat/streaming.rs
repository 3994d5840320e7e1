//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Each `data:` payload is one [`ChatChunk`]; `data: [DONE]` ends the stream.
//! Tool call fragments are forwarded as-is (keyed by index); accumulation
//! happens in the completion engine.

use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest_eventsource::{Event, EventSource, RequestBuilderExt};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use relay_core::llm::provider::EventStream;
use relay_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::types::{ApiErrorBody, ChatChunk, ChatRequest};

/// Map an OpenAI `finish_reason` to a [`StopReason`].
pub fn map_finish_reason(reason: &str) -> StopReason {
    match reason {
        "tool_calls" | "function_call" => StopReason::ToolUse,
        "length" => StopReason::MaxTokens,
        "content_filter" => StopReason::ContentFilter,
        _ => StopReason::EndTurn,
    }
}

/// Decode one SSE `data:` payload into zero or more stream events.
pub fn parse_chunk(data: &str) -> Result<Vec<StreamEvent>, LlmError> {
    if data.trim() == "[DONE]" {
        return Ok(vec![StreamEvent::Done]);
    }

    let chunk: ChatChunk = serde_json::from_str(data)
        .map_err(|e| LlmError::Deserialization(format!("invalid stream chunk: {e}")))?;

    let mut events = Vec::new();
    for choice in chunk.choices {
        if let Some(text) = choice.delta.content {
            if !text.is_empty() {
                events.push(StreamEvent::TextDelta { text });
            }
        }
        for call in choice.delta.tool_calls.unwrap_or_default() {
            let (name, arguments) = match call.function {
                Some(function) => (function.name, function.arguments),
                None => (None, None),
            };
            events.push(StreamEvent::ToolCallDelta {
                index: call.index,
                id: call.id,
                name,
                arguments,
            });
        }
        if let Some(reason) = choice.finish_reason {
            events.push(StreamEvent::MessageDelta {
                stop_reason: map_finish_reason(&reason),
            });
        }
    }

    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }));
    }

    Ok(events)
}

/// Map a non-2xx response to an [`LlmError`].
async fn status_error(status: StatusCode, response: reqwest::Response) -> LlmError {
    let retry_after_ms = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|secs| secs * 1000);
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);

    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited { retry_after_ms },
        400 => LlmError::InvalidRequest(message),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

/// Open a streaming connection to `{url}` and adapt it to [`StreamEvent`]s.
///
/// The stream ends after `Done` or the first error; the event source never
/// reconnects on its own.
pub fn create_openai_stream(
    client: &reqwest::Client,
    url: &str,
    body: ChatRequest,
    api_key: Option<&SecretString>,
) -> EventStream {
    let Some(api_key) = api_key else {
        return Box::pin(futures_util::stream::once(async {
            Err(LlmError::AuthenticationFailed)
        }));
    };

    let builder = client
        .post(url)
        .bearer_auth(api_key.expose_secret())
        .json(&body);

    let mut source: EventSource = match builder.eventsource() {
        Ok(source) => source,
        Err(e) => {
            let message = format!("failed to open event stream: {e}");
            return Box::pin(futures_util::stream::once(async move {
                Err(LlmError::Provider { message })
            }));
        }
    };
    source.set_retry_policy(Box::new(reqwest_eventsource::retry::Never));

    Box::pin(async_stream::stream! {
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => yield Ok(StreamEvent::Connected),
                Ok(Event::Message(message)) => match parse_chunk(&message.data) {
                    Ok(events) => {
                        let mut done = false;
                        for event in events {
                            done |= event == StreamEvent::Done;
                            yield Ok(event);
                        }
                        if done {
                            break;
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                },
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!("backend closed the event stream");
                    yield Ok(StreamEvent::Done);
                    break;
                }
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    yield Err(status_error(status, response).await);
                    break;
                }
                Err(e) => {
                    yield Err(LlmError::Stream(e.to_string()));
                    break;
                }
            }
        }
        source.close();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_marker() {
        assert_eq!(parse_chunk("[DONE]").unwrap(), vec![StreamEvent::Done]);
    }

    #[test]
    fn test_text_delta() {
        let events = parse_chunk(
            r#"{"id":"c1","choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(
            events,
            vec![StreamEvent::TextDelta {
                text: "Hel".to_string()
            }]
        );
    }

    #[test]
    fn test_empty_content_is_skipped() {
        let events =
            parse_chunk(r#"{"choices":[{"delta":{"content":""},"finish_reason":null}]}"#).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_tool_call_fragments() {
        let first = parse_chunk(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_abc","type":"function","function":{"name":"get_system_metrics","arguments":""}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            first,
            vec![StreamEvent::ToolCallDelta {
                index: 0,
                id: Some("call_abc".to_string()),
                name: Some("get_system_metrics".to_string()),
                arguments: Some(String::new()),
            }]
        );

        let next = parse_chunk(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"metric_type\""}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            next,
            vec![StreamEvent::ToolCallDelta {
                index: 0,
                id: None,
                name: None,
                arguments: Some(r#"{"metric_type""#.to_string()),
            }]
        );
    }

    #[test]
    fn test_finish_reason_and_usage() {
        let events = parse_chunk(
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}],"usage":{"prompt_tokens":20,"completion_tokens":7}}"#,
        )
        .unwrap();
        assert_eq!(
            events,
            vec![
                StreamEvent::MessageDelta {
                    stop_reason: StopReason::ToolUse
                },
                StreamEvent::Usage(Usage {
                    input_tokens: 20,
                    output_tokens: 7
                }),
            ]
        );
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason("stop"), StopReason::EndTurn);
        assert_eq!(map_finish_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(map_finish_reason("length"), StopReason::MaxTokens);
        assert_eq!(map_finish_reason("content_filter"), StopReason::ContentFilter);
    }

    #[test]
    fn test_malformed_chunk_is_deserialization_error() {
        assert!(matches!(
            parse_chunk("{not json"),
            Err(LlmError::Deserialization(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let client = reqwest::Client::new();
        let body = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: Vec::new(),
            max_tokens: 10,
            temperature: None,
            stream: true,
            stream_options: None,
            tools: None,
            tool_choice: None,
        };
        let mut stream = create_openai_stream(
            &client,
            "http://127.0.0.1:9/chat/completions",
            body,
            None,
        );
        assert!(matches!(
            stream.next().await,
            Some(Err(LlmError::AuthenticationFailed))
        ));
        assert!(stream.next().await.is_none());
    }
}
