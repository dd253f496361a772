//! Detection of refusal / clarification responses.
//!
//! The generation and translation services sometimes answer with an
//! apology or a request for clarification instead of doing the work.
//! Those responses must never be stored as story content, so every
//! accepted output is screened against this marker denylist first.

/// Marker phrases that flag a response as a refusal or a clarification
/// request rather than generated content. Matched case-insensitively.
const REFUSAL_MARKERS: &[&str] = &[
    "i'm sorry",
    "i am sorry",
    "i apologize",
    "i apologise",
    "i cannot",
    "i can't",
    "i can not",
    "as an ai",
    "as a language model",
    "could you please",
    "could you clarify",
    "please clarify",
    "please provide",
    "i'd be happy to help",
    "i need more information",
    "lo siento",
    "no puedo",
];

/// Whether the text reads as a refusal or clarification request.
pub fn is_refusal(text: &str) -> bool {
    let lower = text.to_lowercase();
    REFUSAL_MARKERS.iter().any(|marker| lower.contains(marker))
}
