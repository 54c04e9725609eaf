//! Shared application state.

use parrot_core::LengthProfile;

use crate::streaming::StreamEngine;

/// State injected into every handler via the axum `State` extractor.
///
/// Holds only configuration-derived values; nothing here mutates between
/// requests (the engines construct per-request generators).
pub struct AppState {
    /// Streaming engine carrying the server-default timing settings.
    pub engine: StreamEngine,
    /// Length profile applied when a request does not specify one.
    pub default_profile: Option<LengthProfile>,
}
