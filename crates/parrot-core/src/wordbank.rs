//! Lexical word bank: categorized vocabularies and sentence templates.
//!
//! Static read-only tables shared by every request; callers bring their own
//! random source so generation stays deterministic under an explicit seed.

use rand::Rng;
use rand::seq::SliceRandom;

pub const NOUNS: &[&str] = &[
    "system", "approach", "solution", "framework", "architecture", "pattern",
    "design", "implementation", "strategy", "process", "method", "technique",
    "technology", "platform", "service", "module", "component", "feature",
    "application", "software", "code", "data", "information", "structure",
];

pub const VERBS: &[&str] = &[
    "implement", "develop", "create", "design", "build", "establish",
    "provide", "enable", "support", "enhance", "improve", "optimize",
    "simplify", "streamline", "integrate", "connect", "combine", "merge",
    "handle", "manage", "process", "execute", "perform", "achieve",
];

pub const ADJECTIVES: &[&str] = &[
    "robust", "efficient", "scalable", "reliable", "secure", "flexible",
    "modular", "clean", "elegant", "sophisticated", "advanced", "modern",
    "innovative", "comprehensive", "complete", "effective", "powerful",
];

pub const ADVERBS: &[&str] = &[
    "successfully", "effectively", "efficiently", "carefully", "properly",
    "thoroughly", "systematically", "methodically", "comprehensively", "strategically",
    "seamlessly", "transparently", "reliably", "consistently", "dynamically",
];

pub const TRANSITIONS: &[&str] = &[
    "Furthermore", "Moreover", "Additionally", "In addition", "Similarly",
    "However", "Nevertheless", "On the other hand", "Conversely", "In contrast",
    "Therefore", "Thus", "Consequently", "As a result", "Subsequently",
];

pub const SUBJECTS: &[&str] = &[
    "The system", "This approach", "The framework", "Our solution", "The architecture",
    "The implementation", "This design", "The technology", "Our platform",
];

pub const OBJECTS: &[&str] = &[
    "efficiency", "reliability", "scalability", "security", "flexibility",
    "simplicity", "clarity", "maintainability", "performance", "accuracy",
];

pub const PLACES: &[&str] = &[
    "San Francisco", "New York", "London", "Berlin", "Tokyo",
    "Sydney", "Paris", "Austin", "Seattle", "Toronto",
];

pub const PRONOUNS: &[&str] = &["it", "they", "we", "you", "he", "she", "one"];

/// Sentence templates. Every placeholder maps to one of the categorized
/// lists above; repeated placeholders within one template resolve to the
/// same pick.
const SENTENCE_TEMPLATES: &[&str] = &[
    "{subject} {verb} {adj} {obj}.",
    "{trans}, {subject} {verb} {adj} {obj}.",
    "The {adj} {noun} {verb} {adv}.",
    "This {noun} {verb} {adj} {noun}.",
    "In this {noun}, we {verb} {adj} {noun}.",
    "{subject} is {adj} when {pronoun} {verb} {obj}.",
    "{trans} {subject} and {subject} {verb} {obj}.",
    "{subject} in {place} {verb} {adj} {obj}.",
];

/// Pick a random entry from a word list. Word lists are never empty, but the
/// fallback keeps the contract total.
pub fn pick<'a>(rng: &mut impl Rng, list: &[&'a str]) -> &'a str {
    list.choose(rng).copied().unwrap_or("system")
}

/// Generate a single sentence from a random template.
pub fn generate_sentence(rng: &mut impl Rng) -> String {
    let template = pick(rng, SENTENCE_TEMPLATES);

    let replacements = [
        ("{noun}", pick(rng, NOUNS)),
        ("{verb}", pick(rng, VERBS)),
        ("{adj}", pick(rng, ADJECTIVES)),
        ("{adv}", pick(rng, ADVERBS)),
        ("{trans}", pick(rng, TRANSITIONS)),
        ("{subject}", pick(rng, SUBJECTS)),
        ("{obj}", pick(rng, OBJECTS)),
        ("{place}", pick(rng, PLACES)),
        ("{pronoun}", pick(rng, PRONOUNS)),
    ];

    let mut sentence = template.to_string();
    for (placeholder, word) in replacements {
        sentence = sentence.replace(placeholder, word);
    }
    sentence
}

/// Generate `sentences` sentences joined by single spaces. Zero is bumped to
/// three so a paragraph is never empty.
pub fn generate_paragraph(rng: &mut impl Rng, sentences: usize) -> String {
    let sentences = if sentences == 0 { 3 } else { sentences };
    let mut out = Vec::with_capacity(sentences);
    for _ in 0..sentences {
        out.push(generate_sentence(rng));
    }
    out.join(" ")
}
