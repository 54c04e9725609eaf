//! Streaming protocol engine.
//!
//! Serializes synthesized text or fabricated tool calls into the ordered
//! SSE frame sequence of the chat-completion protocol:
//!
//! ```text
//! INIT -> (TEXT_CHUNKS* | TOOLCALL_CHUNKS*) -> TERMINAL -> [USAGE] -> [DONE]
//! ```
//!
//! Frames are produced by a spawned task into a bounded mpsc channel; the
//! HTTP response body drains that channel, so the transport only ever has a
//! single writer even when parallel tool-call producers overlap. When the
//! client disconnects the receiver drops, the next send fails, and the
//! producer task stops without emitting further frames.

use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures::StreamExt;
use rand::Rng;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;

use parrot_core::types::{
    ChatCompletionChunk, ChatCompletionRequest, ChunkChoice, ChunkDelta, FinishReason,
    FunctionCallDelta, Role, ToolCall, ToolCallDelta, Usage,
};
use parrot_core::{
    LengthProfile, TextSynthesizer, ToolCallFabricator, estimate_prompt_tokens, estimate_tokens,
    ids, length, toolgen,
};

/// Final sentinel frame data, emitted exactly once per stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Words per text chunk when the caller does not override it.
pub const DEFAULT_CHUNK_SIZE: usize = 3;

/// Bytes of a tool call's arguments string carried per frame.
const TOOL_ARG_SLICE_BYTES: usize = 20;

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Effective streaming behavior for one response.
///
/// Server configuration supplies the defaults; per-request `stream_options`
/// override individual fields, never the whole struct.
#[derive(Debug, Clone, Default)]
pub struct StreamSettings {
    /// Emit a usage chunk after the terminal chunk.
    pub include_usage: bool,
    /// Words per text chunk; 0 means [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: usize,
    /// Flat per-chunk delay, used only when no jitter range is set.
    pub delay: Option<Duration>,
    /// Lower bound of the per-chunk jitter range.
    pub delay_min: Option<Duration>,
    /// Upper bound of the per-chunk jitter range.
    pub delay_max: Option<Duration>,
    /// Approximate token emission rate; >0 adds a throughput sleep on top
    /// of the jitter.
    pub tokens_per_second: f64,
    /// Stream each tool call from its own producer task.
    pub parallel_tool_calls: bool,
}

impl StreamSettings {
    /// Apply a request's overrides on top of these defaults, field by field.
    pub fn merge_request(&self, req: &ChatCompletionRequest) -> StreamSettings {
        let mut merged = self.clone();
        merged.parallel_tool_calls = req.parallel_tool_calls.unwrap_or(false);
        if let Some(wire) = &req.stream_options {
            merged.include_usage = wire.include_usage;
            if let Some(size) = wire.chunk_size.filter(|size| *size > 0) {
                merged.chunk_size = size;
            }
            if let Some(ms) = wire.delay_ms.filter(|ms| *ms > 0) {
                merged.delay = Some(Duration::from_millis(ms));
            }
            if let Some(ms) = wire.delay_min_ms.filter(|ms| *ms > 0) {
                merged.delay_min = Some(Duration::from_millis(ms));
            }
            if let Some(ms) = wire.delay_max_ms.filter(|ms| *ms > 0) {
                merged.delay_max = Some(Duration::from_millis(ms));
            }
            if let Some(tps) = wire.tokens_per_second.filter(|tps| *tps > 0.0) {
                merged.tokens_per_second = tps;
            }
        }
        if merged.chunk_size == 0 {
            merged.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        merged
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frames and the single-writer sink
// ─────────────────────────────────────────────────────────────────────────────

/// One unit of the event stream, prior to SSE framing.
#[derive(Debug, Clone)]
pub enum StreamFrame {
    Chunk(ChatCompletionChunk),
    Done,
}

impl StreamFrame {
    /// Frame this unit as an SSE event (`data: <json>` or `data: [DONE]`).
    fn into_event(self) -> Event {
        match self {
            StreamFrame::Chunk(chunk) => {
                let data = serde_json::to_string(&chunk).unwrap_or_else(|_| "{}".to_string());
                Event::default().data(data)
            }
            StreamFrame::Done => Event::default().data(DONE_SENTINEL),
        }
    }
}

/// The receiver side of the sink was dropped (client disconnect).
#[derive(Debug)]
pub struct StreamClosed;

/// Per-stream frame writer: stamps every chunk with the completion id,
/// timestamp, and model. Cloneable so parallel producers can share it; all
/// clones feed the same single-consumer channel.
#[derive(Clone)]
struct ChunkWriter {
    tx: mpsc::Sender<StreamFrame>,
    completion_id: String,
    created: i64,
    model: String,
}

impl ChunkWriter {
    async fn send_choice(&self, choice: ChunkChoice) -> Result<(), StreamClosed> {
        self.send_chunk(ChatCompletionChunk {
            id: self.completion_id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![choice],
            usage: None,
        })
        .await
    }

    async fn send_usage(&self, usage: Usage) -> Result<(), StreamClosed> {
        self.send_chunk(ChatCompletionChunk {
            id: self.completion_id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta::default(),
                finish_reason: None,
            }],
            usage: Some(usage),
        })
        .await
    }

    async fn send_chunk(&self, chunk: ChatCompletionChunk) -> Result<(), StreamClosed> {
        self.tx
            .send(StreamFrame::Chunk(chunk))
            .await
            .map_err(|_| StreamClosed)
    }

    async fn send_done(&self) -> Result<(), StreamClosed> {
        self.tx.send(StreamFrame::Done).await.map_err(|_| StreamClosed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Builds SSE responses for streaming chat-completion requests.
pub struct StreamEngine {
    defaults: StreamSettings,
    default_profile: Option<LengthProfile>,
}

impl StreamEngine {
    /// Create an engine with the given server-default settings and length
    /// profile.
    pub fn new(defaults: StreamSettings, default_profile: Option<LengthProfile>) -> Self {
        Self {
            defaults,
            default_profile,
        }
    }

    /// Produce the SSE response for a streaming request.
    ///
    /// Generation runs on a spawned task; the returned response streams
    /// frames as they are produced (no buffering).
    pub fn sse_response(&self, req: ChatCompletionRequest) -> Response {
        let settings = self.defaults.merge_request(&req);
        let profile = length::requested_profile(&req).or(self.default_profile);

        let (tx, rx) = mpsc::channel::<StreamFrame>(32);
        tokio::spawn(async move {
            if run_stream(req, settings, profile, tx).await.is_err() {
                tracing::debug!("stream client disconnected before completion");
            }
        });

        let stream =
            ReceiverStream::new(rx).map(|frame| Ok::<Event, Infallible>(frame.into_event()));
        (
            [("cache-control", "no-cache"), ("x-accel-buffering", "no")],
            Sse::new(stream),
        )
            .into_response()
    }
}

/// Drive one complete streaming response into the sink.
///
/// Emits the full frame sequence and returns `Err(StreamClosed)` as soon as
/// the sink is gone.
async fn run_stream(
    req: ChatCompletionRequest,
    settings: StreamSettings,
    profile: Option<LengthProfile>,
    tx: mpsc::Sender<StreamFrame>,
) -> Result<(), StreamClosed> {
    let writer = ChunkWriter {
        tx,
        completion_id: ids::completion_id(),
        created: Utc::now().timestamp(),
        model: req.model.clone(),
    };

    let mut tool_calls: Vec<ToolCall> = Vec::new();
    let mut finish_reason = FinishReason::Stop;
    if !req.tools.is_empty() {
        let mut fabricator = ToolCallFabricator::new();
        let calls = fabricator.generate_tool_calls(&req.tools, toolgen::requested_strategy(&req));
        if !calls.is_empty() {
            tool_calls = calls;
            finish_reason = FinishReason::ToolCalls;
        }
    }

    let mut full_text = String::new();
    if tool_calls.is_empty() {
        let (min_len, max_len) =
            length::resolve_range(profile, &req.messages, &mut rand::thread_rng());
        full_text = TextSynthesizer::new().generate_text(min_len, max_len);
    }

    if !full_text.is_empty() {
        stream_text_chunks(&writer, &full_text, &settings).await?;
    }
    if !tool_calls.is_empty() {
        stream_tool_calls(&writer, &tool_calls, &settings).await?;
    }

    // Terminal chunk: empty delta carrying the finish reason.
    writer
        .send_choice(ChunkChoice {
            index: 0,
            delta: ChunkDelta::default(),
            finish_reason: Some(finish_reason),
        })
        .await?;

    if settings.include_usage {
        let prompt_tokens = estimate_prompt_tokens(&req.messages);
        let completion_tokens = estimate_tokens(&full_text);
        writer
            .send_usage(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            })
            .await?;
    }

    writer.send_done().await
}

/// Stream text as word groups of `chunk_size`, pausing after each chunk.
async fn stream_text_chunks(
    writer: &ChunkWriter,
    text: &str,
    settings: &StreamSettings,
) -> Result<(), StreamClosed> {
    let chunk_size = settings.chunk_size.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();

    let mut start = 0;
    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        let mut chunk_text = words[start..end].join(" ");
        if end < words.len() {
            chunk_text.push(' ');
        }
        writer
            .send_choice(ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    role: Some(Role::Assistant),
                    content: Some(chunk_text.clone()),
                    tool_calls: None,
                },
                finish_reason: None,
            })
            .await?;
        pause_after_chunk(settings, &chunk_text).await;
        start = end;
    }
    Ok(())
}

/// Stream the fabricated tool calls, sequentially or with one producer task
/// per call. In parallel mode ordering across calls is unspecified, but each
/// call's own header-then-arguments sequence is preserved, and all producers
/// are joined before the caller emits the terminal chunk.
async fn stream_tool_calls(
    writer: &ChunkWriter,
    calls: &[ToolCall],
    settings: &StreamSettings,
) -> Result<(), StreamClosed> {
    if settings.parallel_tool_calls {
        let mut producers = JoinSet::new();
        for (index, call) in calls.iter().enumerate() {
            let writer = writer.clone();
            let call = call.clone();
            let settings = settings.clone();
            producers.spawn(async move {
                // A closed sink stops this producer; the join below still
                // completes for the rest.
                let _ = stream_single_tool_call(&writer, index as u32, &call, &settings).await;
            });
        }
        while producers.join_next().await.is_some() {}
        if writer.tx.is_closed() {
            return Err(StreamClosed);
        }
        Ok(())
    } else {
        for (index, call) in calls.iter().enumerate() {
            stream_single_tool_call(writer, index as u32, call, settings).await?;
        }
        Ok(())
    }
}

/// One tool call's chunk sequence: a header frame with id/type/name, then
/// the arguments string in fixed-size slices.
async fn stream_single_tool_call(
    writer: &ChunkWriter,
    index: u32,
    call: &ToolCall,
    settings: &StreamSettings,
) -> Result<(), StreamClosed> {
    writer
        .send_choice(ChunkChoice {
            index,
            delta: ChunkDelta {
                role: None,
                content: None,
                tool_calls: Some(vec![ToolCallDelta {
                    index,
                    id: Some(call.id.clone()),
                    call_type: Some(call.call_type.clone()),
                    function: Some(FunctionCallDelta {
                        name: Some(call.function.name.clone()),
                        arguments: None,
                    }),
                }]),
            },
            finish_reason: None,
        })
        .await?;

    for slice in arg_slices(&call.function.arguments, TOOL_ARG_SLICE_BYTES) {
        writer
            .send_choice(ChunkChoice {
                index,
                delta: ChunkDelta {
                    role: None,
                    content: None,
                    tool_calls: Some(vec![ToolCallDelta {
                        index,
                        id: None,
                        call_type: None,
                        function: Some(FunctionCallDelta {
                            name: None,
                            arguments: Some(slice.to_string()),
                        }),
                    }]),
                },
                finish_reason: None,
            })
            .await?;
        pause_after_chunk(settings, slice).await;
    }
    Ok(())
}

/// Split `s` into slices of roughly `size` bytes, extended as needed so a
/// multi-byte character is never cut.
fn arg_slices(s: &str, size: usize) -> Vec<&str> {
    let mut slices = Vec::new();
    let mut start = 0;
    while start < s.len() {
        let mut end = (start + size).min(s.len());
        while !s.is_char_boundary(end) {
            end += 1;
        }
        slices.push(&s[start..end]);
        start = end;
    }
    slices
}

/// Sleep after a chunk: uniform jitter in `[delay_min, delay_max]` (or the
/// flat delay when no range is set), plus the token-rate throttle. The
/// throttle is additive, not an alternative.
async fn pause_after_chunk(settings: &StreamSettings, chunk_text: &str) {
    if settings.delay_min.is_some() || settings.delay_max.is_some() {
        let min = settings.delay_min.unwrap_or(Duration::ZERO);
        let max = settings.delay_max.unwrap_or(Duration::ZERO).max(min);
        let min_ms = min.as_millis() as u64;
        let max_ms = max.as_millis() as u64;
        let jitter_ms = if max_ms > min_ms {
            rand::thread_rng().gen_range(min_ms..=max_ms)
        } else {
            min_ms
        };
        if jitter_ms > 0 {
            tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
        }
    } else if let Some(delay) = settings.delay {
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
    }

    if settings.tokens_per_second > 0.0 {
        let tokens = estimate_tokens(chunk_text) as f64;
        tokio::time::sleep(Duration::from_secs_f64(tokens / settings.tokens_per_second)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parrot_core::types::{ChatMessage, StreamOptionsWire, Tool};
    use serde_json::json;

    fn text_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-sim-1".to_string(),
            messages: vec![ChatMessage::user("Hello")],
            stream: true,
            ..Default::default()
        }
    }

    fn tool_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-sim-1".to_string(),
            messages: vec![ChatMessage::user("check the weather and the time")],
            tools: vec![
                Tool::function(
                    "get_weather",
                    json!({
                        "type": "object",
                        "properties": {
                            "city": {"type": "string"},
                            "days": {"type": "integer"},
                        },
                    }),
                ),
                Tool::function(
                    "get_time",
                    json!({
                        "type": "object",
                        "properties": {"timezone": {"type": "string"}},
                    }),
                ),
            ],
            tool_strategy: Some("sequence".to_string()),
            stream: true,
            ..Default::default()
        }
    }

    async fn collect_frames(
        req: ChatCompletionRequest,
        settings: StreamSettings,
        profile: Option<LengthProfile>,
    ) -> Vec<StreamFrame> {
        let (tx, mut rx) = mpsc::channel(64);
        let producer = tokio::spawn(run_stream(req, settings, profile, tx));
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        producer.await.unwrap().unwrap();
        frames
    }

    fn chunks(frames: &[StreamFrame]) -> Vec<&ChatCompletionChunk> {
        frames
            .iter()
            .filter_map(|f| match f {
                StreamFrame::Chunk(c) => Some(c),
                StreamFrame::Done => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn done_sentinel_is_emitted_exactly_once_and_last() {
        let frames = collect_frames(text_request(), StreamSettings::default(), None).await;
        let done_count = frames
            .iter()
            .filter(|f| matches!(f, StreamFrame::Done))
            .count();
        assert_eq!(done_count, 1);
        assert!(matches!(frames.last(), Some(StreamFrame::Done)));
    }

    #[tokio::test]
    async fn text_chunks_reassemble_and_terminate_with_stop() {
        let frames = collect_frames(
            text_request(),
            StreamSettings {
                chunk_size: 3,
                ..Default::default()
            },
            Some(LengthProfile::Short),
        )
        .await;
        let chunks = chunks(&frames);
        assert!(chunks.len() >= 2, "expected content chunks plus terminal");

        let text: String = chunks
            .iter()
            .filter_map(|c| c.choices[0].delta.content.clone())
            .collect();
        assert!(!text.is_empty());
        assert!(text.len() <= 140, "short profile exceeded: {}", text.len());

        let terminal = chunks
            .iter()
            .find(|c| c.choices[0].finish_reason.is_some())
            .expect("terminal chunk");
        assert_eq!(terminal.choices[0].finish_reason, Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn every_chunk_shares_one_completion_id() {
        let frames = collect_frames(text_request(), StreamSettings::default(), None).await;
        let chunks = chunks(&frames);
        assert!(chunks[0].id.starts_with("chatcmpl-"));
        assert!(chunks.iter().all(|c| c.id == chunks[0].id));
        assert!(
            chunks
                .iter()
                .all(|c| c.object == "chat.completion.chunk" && c.model == "gpt-sim-1")
        );
    }

    #[tokio::test]
    async fn tool_call_stream_suppresses_text() {
        let frames = collect_frames(tool_request(), StreamSettings::default(), None).await;
        let chunks = chunks(&frames);
        assert!(
            chunks
                .iter()
                .all(|c| c.choices[0].delta.content.is_none()),
            "tool-call stream must not carry prose content"
        );
        let terminal = chunks
            .iter()
            .find(|c| c.choices[0].finish_reason.is_some())
            .expect("terminal chunk");
        assert_eq!(
            terminal.choices[0].finish_reason,
            Some(FinishReason::ToolCalls)
        );
    }

    #[tokio::test]
    async fn tool_call_arguments_arrive_in_bounded_slices() {
        let frames = collect_frames(tool_request(), StreamSettings::default(), None).await;
        for chunk in chunks(&frames) {
            if let Some(tool_calls) = &chunk.choices[0].delta.tool_calls {
                if let Some(args) = tool_calls[0]
                    .function
                    .as_ref()
                    .and_then(|f| f.arguments.as_ref())
                {
                    assert!(args.len() <= TOOL_ARG_SLICE_BYTES + 4);
                }
            }
        }
    }

    #[tokio::test]
    async fn parallel_mode_preserves_per_call_ordering() {
        let mut req = tool_request();
        req.parallel_tool_calls = Some(true);
        let settings = StreamSettings {
            parallel_tool_calls: true,
            ..Default::default()
        };
        let frames = collect_frames(req, settings, None).await;
        let chunks = chunks(&frames);

        // Reassemble each call's arguments in arrival order; the header
        // (carrying the function name) must precede every argument slice.
        let mut seen_header = [false, false];
        let mut arguments = [String::new(), String::new()];
        for chunk in &chunks {
            let choice = &chunk.choices[0];
            let Some(tool_calls) = &choice.delta.tool_calls else {
                continue;
            };
            let delta = &tool_calls[0];
            let idx = delta.index as usize;
            match delta.id {
                Some(_) => seen_header[idx] = true,
                None => {
                    assert!(seen_header[idx], "argument slice before header for {idx}");
                    if let Some(args) = delta.function.as_ref().and_then(|f| f.arguments.clone()) {
                        arguments[idx].push_str(&args);
                    }
                }
            }
        }
        assert!(seen_header[0] && seen_header[1]);
        for args in &arguments {
            let parsed: serde_json::Value = serde_json::from_str(args).expect("valid JSON args");
            assert!(parsed.is_object());
        }

        // Terminal follows all producers, sentinel is last.
        let terminal_pos = chunks
            .iter()
            .position(|c| c.choices[0].finish_reason.is_some())
            .expect("terminal chunk");
        assert_eq!(terminal_pos, chunks.len() - 1);
        assert!(matches!(frames.last(), Some(StreamFrame::Done)));
    }

    #[tokio::test]
    async fn usage_chunk_follows_terminal_when_requested() {
        let settings = StreamSettings {
            include_usage: true,
            ..Default::default()
        };
        let frames = collect_frames(text_request(), settings, Some(LengthProfile::Short)).await;
        let chunks = chunks(&frames);

        let usage_chunk = chunks.last().expect("usage chunk");
        let usage = usage_chunk.usage.expect("usage payload");
        assert_eq!(
            usage.total_tokens,
            usage.prompt_tokens + usage.completion_tokens
        );

        let terminal_pos = chunks
            .iter()
            .position(|c| c.choices[0].finish_reason.is_some())
            .expect("terminal");
        assert!(terminal_pos < chunks.len() - 1, "usage must follow terminal");
    }

    #[tokio::test]
    async fn jitter_and_throttle_paths_are_exercised() {
        let settings = StreamSettings {
            delay_min: Some(Duration::from_millis(1)),
            delay_max: Some(Duration::from_millis(2)),
            tokens_per_second: 1000.0,
            ..Default::default()
        };
        let frames = collect_frames(text_request(), settings, Some(LengthProfile::Short)).await;
        assert!(matches!(frames.last(), Some(StreamFrame::Done)));
    }

    #[tokio::test]
    async fn client_disconnect_stops_the_producer() {
        let (tx, mut rx) = mpsc::channel(1);
        let producer = tokio::spawn(run_stream(
            text_request(),
            StreamSettings {
                chunk_size: 1,
                ..Default::default()
            },
            Some(LengthProfile::Long),
            tx,
        ));
        assert!(rx.recv().await.is_some());
        drop(rx);
        let result = producer.await.unwrap();
        assert!(result.is_err(), "producer should observe the closed sink");
    }

    #[test]
    fn settings_merge_is_field_by_field() {
        let defaults = StreamSettings {
            delay_min: Some(Duration::from_millis(5)),
            delay_max: Some(Duration::from_millis(10)),
            tokens_per_second: 50.0,
            ..Default::default()
        };
        let mut req = text_request();
        req.stream_options = Some(StreamOptionsWire {
            include_usage: true,
            chunk_size: Some(5),
            delay_max_ms: Some(20),
            ..Default::default()
        });

        let merged = defaults.merge_request(&req);
        assert!(merged.include_usage);
        // Overridden fields take the request values...
        assert_eq!(merged.delay_max, Some(Duration::from_millis(20)));
        assert_eq!(merged.chunk_size, 5);
        // ...while untouched fields keep the server defaults.
        assert_eq!(merged.delay_min, Some(Duration::from_millis(5)));
        assert_eq!(merged.tokens_per_second, 50.0);
    }

    #[test]
    fn merge_defaults_chunk_size_when_unset() {
        let merged = StreamSettings::default().merge_request(&text_request());
        assert_eq!(merged.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(!merged.include_usage);
    }

    #[test]
    fn arg_slices_respect_char_boundaries() {
        let ascii = "a".repeat(45);
        let slices = arg_slices(&ascii, 20);
        assert_eq!(
            slices.iter().map(|s| s.len()).collect::<Vec<_>>(),
            vec![20, 20, 5]
        );

        let accented = "é".repeat(15); // 2 bytes each
        let slices = arg_slices(&accented, 20);
        assert_eq!(slices.concat(), accented);
        for slice in slices {
            assert!(std::str::from_utf8(slice.as_bytes()).is_ok());
        }
    }
}
