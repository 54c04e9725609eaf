//! Parrot — entry point.
//!
//! Reads configuration from flags (each with an environment-variable
//! fallback) and starts the axum-based simulator.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PARROT_PORT` | `8080` | TCP port to listen on. |
//! | `STREAM_DELAY_MIN_MS` | `0` | Default min per-chunk delay (ms). |
//! | `STREAM_DELAY_MAX_MS` | `0` | Default max per-chunk delay (ms). |
//! | `STREAM_TOKENS_PER_SECOND` | `0` | Default token emission rate; 0 disables throttling. |
//! | `STREAM_DEFAULT_RESPONSE_LENGTH` | *(infer)* | Default response length: `short\|medium\|long`. |

use clap::Parser;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parrot_core::LengthProfile;
use parrot_server::server::{ParrotServer, ParrotServerConfig};

#[derive(Debug, Parser)]
#[command(name = "parrot", version, about = "OpenAI-compatible mock chat-completion server")]
struct Cli {
    /// Port to run the simulator HTTP server on.
    #[arg(long, env = "PARROT_PORT", default_value_t = 8080)]
    port: u16,

    /// Default min per-chunk delay (ms) to simulate jitter when a request
    /// does not set stream_options.
    #[arg(long, env = "STREAM_DELAY_MIN_MS", default_value_t = 0)]
    stream_delay_min_ms: u64,

    /// Default max per-chunk delay (ms) to simulate jitter when a request
    /// does not set stream_options.
    #[arg(long, env = "STREAM_DELAY_MAX_MS", default_value_t = 0)]
    stream_delay_max_ms: u64,

    /// Default token emission rate for streaming chunks; 0 disables
    /// throttling.
    #[arg(long, env = "STREAM_TOKENS_PER_SECOND", default_value_t = 0.0)]
    stream_tokens_per_second: f64,

    /// Default response length when unspecified: short|medium|long.
    /// Empty = infer from the inbound messages.
    #[arg(long, env = "STREAM_DEFAULT_RESPONSE_LENGTH")]
    default_response_length: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("parrot_server=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let default_response_length: Option<LengthProfile> = match &cli.default_response_length {
        Some(value) => {
            let parsed = value.parse().ok();
            if parsed.is_none() {
                tracing::warn!(
                    value = %value,
                    "unrecognized default response length, inferring from messages instead"
                );
            }
            parsed
        }
        None => None,
    };

    let config = ParrotServerConfig {
        port: cli.port,
        stream_delay_min: (cli.stream_delay_min_ms > 0)
            .then(|| Duration::from_millis(cli.stream_delay_min_ms)),
        stream_delay_max: (cli.stream_delay_max_ms > 0)
            .then(|| Duration::from_millis(cli.stream_delay_max_ms)),
        stream_tokens_per_second: cli.stream_tokens_per_second,
        default_response_length,
    };

    info!(
        port = config.port,
        delay_min_ms = cli.stream_delay_min_ms,
        delay_max_ms = cli.stream_delay_max_ms,
        tokens_per_second = cli.stream_tokens_per_second,
        "parrot configuration loaded"
    );

    if let Err(e) = ParrotServer::new(config).start().await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}
