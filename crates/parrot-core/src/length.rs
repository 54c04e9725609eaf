//! Length-profile resolution.
//!
//! Maps a requested (or inferred) response-length intent to a concrete
//! character range. When no profile is given the choice is driven by the
//! average inbound message length plus a random draw, so output size tracks
//! input size without being deterministic.

use rand::Rng;
use std::str::FromStr;

use crate::types::{ChatCompletionRequest, ChatMessage};

/// Friendly response-length intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthProfile {
    Short,
    #[default]
    Medium,
    Long,
}

impl LengthProfile {
    /// Character range for this profile.
    pub fn range(self) -> (usize, usize) {
        match self {
            LengthProfile::Short => (30, 140),
            LengthProfile::Medium => (120, 360),
            LengthProfile::Long => (360, 1200),
        }
    }
}

impl FromStr for LengthProfile {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(LengthProfile::Short),
            "medium" => Ok(LengthProfile::Medium),
            "long" => Ok(LengthProfile::Long),
            _ => Err(()),
        }
    }
}

/// The profile a request asks for, if any. Unrecognized values are treated
/// as absent (the resolver then infers from the messages).
pub fn requested_profile(req: &ChatCompletionRequest) -> Option<LengthProfile> {
    req.response_length.as_deref().and_then(|s| s.parse().ok())
}

/// Average-input thresholds separating the short/long heuristics.
const SHORT_INPUT_AVG: usize = 50;
const LONG_INPUT_AVG: usize = 250;

/// Resolve the character range for a response.
///
/// An explicit profile wins outright. Otherwise the average message length
/// buckets the input and a uniform draw picks a profile per bucket:
/// short inputs favor short replies (80/20 short/medium), long inputs favor
/// long replies (80/20 long/medium), and mid-size inputs mix
/// (20/65/15 short/medium/long). Always returns `min <= max`.
pub fn resolve_range(
    profile: Option<LengthProfile>,
    messages: &[ChatMessage],
    rng: &mut impl Rng,
) -> (usize, usize) {
    if let Some(profile) = profile {
        return profile.range();
    }

    let avg = if messages.is_empty() {
        0
    } else {
        messages.iter().map(|m| m.text().len()).sum::<usize>() / messages.len()
    };

    let p: f32 = rng.gen_range(0.0..1.0);

    if avg < SHORT_INPUT_AVG {
        return if p < 0.8 {
            LengthProfile::Short.range()
        } else {
            LengthProfile::Medium.range()
        };
    }

    if avg > LONG_INPUT_AVG {
        return if p < 0.8 {
            LengthProfile::Long.range()
        } else {
            LengthProfile::Medium.range()
        };
    }

    if p < 0.2 {
        LengthProfile::Short.range()
    } else if p < 0.85 {
        LengthProfile::Medium.range()
    } else {
        LengthProfile::Long.range()
    }
}
