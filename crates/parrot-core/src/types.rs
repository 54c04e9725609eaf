//! OpenAI chat-completion wire types.
//!
//! The subset of the chat-completion protocol the simulator speaks, plus the
//! simulator's own extension fields (`response_length`, `tool_strategy`,
//! per-request stream timing). Unknown request fields are tolerated and
//! ignored rather than rejected.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Messages
// ============================================================================

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (configures assistant behavior).
    System,
    /// User message.
    #[default]
    User,
    /// Assistant response.
    Assistant,
    /// Tool call result.
    Tool,
}

/// A single chat message.
///
/// `content` is `None` for assistant messages that carry only tool calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    /// Create an assistant message carrying only tool calls.
    pub fn assistant_with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(tool_calls),
        }
    }

    /// The text content, or the empty string when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

// ============================================================================
// Tools
// ============================================================================

/// A tool the caller declares the model may invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type", default)]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

impl Tool {
    /// Create a function tool with the given JSON-Schema parameters.
    pub fn function(name: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: None,
                parameters: Some(parameters),
            },
        }
    }
}

/// Function half of a tool declaration.
///
/// `parameters` stays a raw JSON value on the wire; interpretation happens
/// through [`crate::schema::SchemaNode`], which absorbs malformed schemas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// A fabricated tool invocation as it appears in a response message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

/// Function name plus JSON-encoded arguments string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

// ============================================================================
// Request
// ============================================================================

/// Chat-completion request body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatCompletionRequest {
    pub model: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptionsWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    /// Simulator extension: requested length profile (`short|medium|long`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_length: Option<String>,
    /// Simulator extension: tool-call selection strategy
    /// (`sequence|contextual|random`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Any remaining standard fields we accept but do not act on.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Per-request streaming-timing overrides.
///
/// Each field overrides the matching server default individually; unset
/// fields fall back to the configured defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StreamOptionsWire {
    #[serde(default)]
    pub include_usage: bool,
    /// Words per content chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    /// Fixed per-chunk delay in milliseconds. Prefer the min/max pair for
    /// jitter; this remains for callers that want a flat delay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_min_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_max_ms: Option<u64>,
    /// Approximate token emission rate; >0 throttles chunk output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_per_second: Option<f64>,
}

/// Requested response format.
///
/// Both the flat form (`{"type": "json_schema", "schema": {...}}`) and the
/// nested OpenAI form (`{"type": "json_schema", "json_schema": {"name": ...,
/// "schema": {...}}}`) are accepted; [`Self::schema_value`] normalizes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

impl ResponseFormat {
    /// Whether this format requests structured JSON output.
    pub fn wants_json_schema(&self) -> bool {
        self.format_type == "json_schema"
    }

    /// The effective schema value, unwrapping the nested `schema` key of the
    /// OpenAI `json_schema` envelope when present.
    pub fn schema_value(&self) -> Option<&serde_json::Value> {
        let outer = self.json_schema.as_ref().or(self.schema.as_ref())?;
        match outer.get("schema") {
            Some(inner) if inner.is_object() => Some(inner),
            _ => Some(outer),
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// Terminal status of a completion choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

/// Non-streaming completion document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

/// A single completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: FinishReason,
}

/// Token usage statistics (estimated, ~4 chars per token).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ============================================================================
// Streaming chunks
// ============================================================================

/// One streamed frame body (`object == "chat.completion.chunk"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Choice within a streamed chunk. `finish_reason` is serialized as `null`
/// until the terminal chunk, matching the protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    pub finish_reason: Option<FinishReason>,
}

/// Incremental content delta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Tool-call fragment within a chunk delta. `id`, `type`, and the function
/// name appear only in a call's header chunk; argument slices follow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCallDelta>,
}

/// Function fragment of a streamed tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}
