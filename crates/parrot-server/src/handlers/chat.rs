//! Chat-completion endpoint.
//!
//! `POST /v1/chat/completions` (and the legacy `/chat/completions` alias
//! some UIs still call). Streaming requests are handed to the
//! [`StreamEngine`](crate::streaming::StreamEngine); non-streaming requests
//! are assembled into a single completion document here.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use std::sync::Arc;

use parrot_core::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, FinishReason, Usage,
};
use parrot_core::{
    SchemaNode, TextSynthesizer, ToolCallFabricator, estimate_prompt_tokens, estimate_tokens,
    ids, length, toolgen,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `POST /v1/chat/completions`
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Response> {
    let req: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|err| ApiError::InvalidRequest(format!("invalid request body: {err}")))?;

    tracing::info!(
        model = %req.model,
        stream = req.stream,
        tools = req.tools.len(),
        messages = req.messages.len(),
        "chat completion request"
    );

    if req.stream {
        return Ok(state.engine.sse_response(req));
    }
    Ok(Json(assemble_completion(&state, req)).into_response())
}

/// Build the single-shot completion document.
///
/// Structured-output requests short-circuit straight to the fabricator,
/// bypassing text synthesis. Otherwise the branch mirrors the streaming
/// engine: declared tools that yield at least one fabricated call produce a
/// tool-call message; everything else produces synthesized text.
fn assemble_completion(state: &AppState, req: ChatCompletionRequest) -> ChatCompletionResponse {
    if let Some(format) = &req.response_format {
        if format.wants_json_schema() {
            if let Some(schema_value) = format.schema_value() {
                let schema = SchemaNode::from_value(schema_value);
                let content = ToolCallFabricator::new().generate_structured_output(&schema);
                return text_completion(req.model, &req.messages, content);
            }
        }
    }

    if !req.tools.is_empty() {
        let mut fabricator = ToolCallFabricator::new();
        let calls = fabricator.generate_tool_calls(&req.tools, toolgen::requested_strategy(&req));
        if !calls.is_empty() {
            let prompt_tokens = estimate_prompt_tokens(&req.messages);
            let completion_tokens = estimate_tokens("");
            return ChatCompletionResponse {
                id: ids::completion_id(),
                object: "chat.completion".to_string(),
                created: Utc::now().timestamp(),
                model: req.model,
                choices: vec![Choice {
                    index: 0,
                    message: ChatMessage::assistant_with_tool_calls(calls),
                    finish_reason: FinishReason::ToolCalls,
                }],
                usage: Usage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens + completion_tokens,
                },
            };
        }
    }

    let profile = length::requested_profile(&req).or(state.default_profile);
    let (min_len, max_len) =
        length::resolve_range(profile, &req.messages, &mut rand::thread_rng());
    let content = TextSynthesizer::new().generate_text(min_len, max_len);
    text_completion(req.model, &req.messages, content)
}

fn text_completion(
    model: String,
    messages: &[ChatMessage],
    content: String,
) -> ChatCompletionResponse {
    let prompt_tokens = estimate_prompt_tokens(messages);
    let completion_tokens = estimate_tokens(&content);
    ChatCompletionResponse {
        id: ids::completion_id(),
        object: "chat.completion".to_string(),
        created: Utc::now().timestamp(),
        model,
        choices: vec![Choice {
            index: 0,
            message: ChatMessage::assistant(content),
            finish_reason: FinishReason::Stop,
        }],
        usage: Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        },
    }
}
