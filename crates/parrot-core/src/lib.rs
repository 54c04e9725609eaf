//! `parrot-core` — synthesis engines for the Parrot mock OpenAI API.
//!
//! Everything here is synchronous and free of I/O; the HTTP surface lives in
//! `parrot-server`. The crate supplies:
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`types`] | Chat-completion wire types (request, response, chunks) |
//! | [`schema`] | Tagged-union view over caller-supplied JSON schemas |
//! | [`wordbank`] | Static vocabularies and sentence templates |
//! | [`textgen`] | Seedable multi-paragraph text synthesis |
//! | [`length`] | Response-length profile resolution |
//! | [`toolgen`] | Tool-call fabrication and structured output |
//! | [`ids`] | Completion / tool-call id minting |
//! | [`tokens`] | Character-based token estimation |
//!
//! The engines hold no state across calls: each request constructs its own
//! generators (with their own random sources), so concurrent requests never
//! contend and seeded runs are reproducible per call.

pub mod ids;
pub mod length;
pub mod schema;
pub mod textgen;
pub mod tokens;
pub mod toolgen;
pub mod types;
pub mod wordbank;

pub use length::{LengthProfile, requested_profile, resolve_range};
pub use schema::{ObjectSchema, SchemaNode};
pub use textgen::TextSynthesizer;
pub use tokens::{estimate_prompt_tokens, estimate_tokens};
pub use toolgen::{ToolCallFabricator, ToolCallStrategy, requested_strategy};
