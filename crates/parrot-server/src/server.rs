//! Axum-based HTTP server.
//!
//! [`ParrotServer`] wires the handlers and the streaming engine into a
//! running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/v1/chat/completions` | Simulated chat completion (JSON or SSE). |
//! | `POST` | `/chat/completions` | Legacy alias for older UIs. |
//! | `GET`  | `/v1/models`, `/models` | Static model listing. |
//! | `GET`  | `/health` | Liveness check — always `200 OK`. |
//! | `GET`  | `/` | Service banner. |

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parrot_core::LengthProfile;

use crate::handlers;
use crate::state::AppState;
use crate::streaming::{DEFAULT_CHUNK_SIZE, StreamEngine, StreamSettings};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration for [`ParrotServer`].
pub struct ParrotServerConfig {
    /// TCP port to listen on (default: 8080).
    pub port: u16,
    /// Default lower bound of the per-chunk streaming jitter.
    pub stream_delay_min: Option<Duration>,
    /// Default upper bound of the per-chunk streaming jitter.
    pub stream_delay_max: Option<Duration>,
    /// Default token emission rate for streaming; 0 disables throttling.
    pub stream_tokens_per_second: f64,
    /// Length profile applied when a request does not specify one;
    /// `None` infers the profile from the inbound messages.
    pub default_response_length: Option<LengthProfile>,
}

impl Default for ParrotServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            stream_delay_min: None,
            stream_delay_max: None,
            stream_tokens_per_second: 0.0,
            default_response_length: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// High-level server encapsulating routing, state, and the streaming engine.
pub struct ParrotServer {
    config: ParrotServerConfig,
}

impl ParrotServer {
    /// Create a new server from the given configuration.
    pub fn new(config: ParrotServerConfig) -> Self {
        Self { config }
    }

    /// Build the axum [`Router`]. Call [`start()`](Self::start) to bind and
    /// serve; tests drive this router directly.
    pub fn build_app(&self) -> Router {
        let defaults = StreamSettings {
            include_usage: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            delay: None,
            delay_min: self.config.stream_delay_min,
            delay_max: self.config.stream_delay_max,
            tokens_per_second: self.config.stream_tokens_per_second,
            parallel_tool_calls: false,
        };
        let state = Arc::new(AppState {
            engine: StreamEngine::new(defaults, self.config.default_response_length),
            default_profile: self.config.default_response_length,
        });

        Router::new()
            .route("/v1/chat/completions", post(handlers::chat::chat_completions))
            .route("/chat/completions", post(handlers::chat::chat_completions))
            .route("/v1/models", get(handlers::models::list_models))
            .route("/models", get(handlers::models::list_models))
            .route("/health", get(handlers::health::health))
            .route("/", get(handlers::health::root))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind to `0.0.0.0:{port}` and serve until the process exits.
    pub async fn start(self) -> std::io::Result<()> {
        let addr = format!("0.0.0.0:{}", self.config.port);
        let app = self.build_app();
        info!(addr = %addr, "parrot simulator starting");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await
    }
}
