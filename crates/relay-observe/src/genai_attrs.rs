//! OpenTelemetry GenAI Semantic Convention attribute names.
//!
//! Spans declare these fields literally (`gen_ai.request.model = ...`); the
//! constants are for recording values later with `Span::record`.

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reasons for the response (e.g., "end_turn", "tool_use").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// Streaming chat completion.
pub const OP_CHAT: &str = "chat";
