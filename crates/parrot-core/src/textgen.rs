//! Text synthesis engine.
//!
//! Composes pseudo-random multi-paragraph text inside a target length
//! envelope. Deterministic when built with [`TextSynthesizer::with_seed`];
//! otherwise seeded from entropy at construction. One instance per request —
//! instances are never shared across concurrent calls.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::wordbank;

/// Maximum number of padding paragraphs appended when the first pass falls
/// short of the minimum length.
const MAX_PADDING_ATTEMPTS: usize = 5;

/// Generates variable-length coherent English text.
pub struct TextSynthesizer {
    rng: StdRng,
}

impl Default for TextSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSynthesizer {
    /// Create a synthesizer seeded from entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a synthesizer with an explicit seed; identical seeds and
    /// length bounds produce identical output.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate text whose length falls within `[min_len, max_len]`.
    ///
    /// The minimum is best-effort: after [`MAX_PADDING_ATTEMPTS`] padding
    /// paragraphs the result is accepted as-is. The result is never empty
    /// for `max_len >= 1`.
    pub fn generate_text(&mut self, min_len: usize, max_len: usize) -> String {
        // 1-3 paragraphs, weighted toward one: 50% one, 30% two, 20% three.
        let num_paragraphs = match self.rng.gen_range(0..10) {
            0 | 1 => 3,
            2..=4 => 2,
            _ => 1,
        };

        let mut paragraphs = Vec::with_capacity(num_paragraphs);
        let mut total_len = 0;
        for _ in 0..num_paragraphs {
            // Sentence-count band: 25% short (1-2), 45% medium (2-5),
            // 30% long (5-10).
            let band: f32 = self.rng.gen_range(0.0..1.0);
            let (min_sent, max_sent) = match band {
                b if b < 0.25 => (1, 2),
                b if b < 0.7 => (2, 5),
                _ => (5, 10),
            };
            let sentences = self.rng.gen_range(min_sent..=max_sent);
            let paragraph = wordbank::generate_paragraph(&mut self.rng, sentences);
            total_len += paragraph.len();
            paragraphs.push(paragraph);

            if total_len >= max_len {
                break;
            }
        }

        let mut text = paragraphs.join("\n\n");

        // Pad with short paragraphs until the minimum is reached, bounded so
        // a pathological min_len cannot loop forever.
        let mut attempts = 0;
        while text.len() < min_len && attempts < MAX_PADDING_ATTEMPTS {
            let sentences = self.rng.gen_range(1..=3);
            text.push_str("\n\n");
            text.push_str(&wordbank::generate_paragraph(&mut self.rng, sentences));
            attempts += 1;
        }
        if text.len() < min_len {
            tracing::debug!(
                min_len,
                actual = text.len(),
                "minimum length unreachable within padding budget"
            );
        }

        // Truncate at the last sentence boundary at or before max_len;
        // hard-truncate when no boundary fits.
        if text.len() > max_len {
            let mut short = truncate_at_char_boundary(&text, max_len);
            if let Some(pos) = short.rfind('.') {
                if pos > 0 {
                    short = &short[..=pos];
                }
            }
            text = short.to_string();
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            // Degenerate max_len smaller than any sentence prefix.
            let sentence = wordbank::generate_sentence(&mut self.rng);
            return truncate_at_char_boundary(&sentence, max_len.max(1)).to_string();
        }
        trimmed.to_string()
    }
}

/// Slice `s` to at most `max` bytes without splitting a character.
fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    &s[..cut]
}
