//! `parrot-server` — HTTP surface of the Parrot mock OpenAI API.
//!
//! The interesting machinery lives in [`streaming`]: the SSE protocol
//! engine that frames synthesized content into ordered `data:` events with
//! configurable timing. The rest is routing glue around `parrot-core`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use parrot_server::server::{ParrotServer, ParrotServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = ParrotServer::new(ParrotServerConfig {
//!         port: 8080,
//!         ..Default::default()
//!     });
//!     server.start().await.unwrap();
//! }
//! ```

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod streaming;

pub use server::{ParrotServer, ParrotServerConfig};
