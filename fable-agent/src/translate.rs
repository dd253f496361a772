//! Best-effort translation with a process-lifetime memo cache.
//!
//! Translation failure must never surface as a user-visible error; the
//! contract is "translated text, or the original unchanged". Rejected
//! and failed results are logged and passed through.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use narrative::Language;

use crate::backend::traits::{GenerationBackend, GenerationRequest};
use crate::refusal::is_refusal;

/// Inputs shorter than this are subject to the length-ratio check.
const RATIO_INPUT_LIMIT: usize = 100;

/// Outputs longer than this multiple of the input are rejected.
const RATIO_LIMIT: usize = 3;

/// Memoizing translator over a generation backend.
///
/// The cache is keyed by `(target, text)` and never evicts; each client
/// process runs one translator for its lifetime.
pub struct Translator {
    backend: Arc<dyn GenerationBackend>,
    cache: DashMap<(Language, String), String>,
}

impl Translator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            cache: DashMap::new(),
        }
    }

    /// Number of memoized translations.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Translate `text` into `target`, returning the original text
    /// unchanged on empty input, service failure, or a rejected result.
    pub async fn translate(&self, text: &str, target: Language) -> String {
        if text.is_empty() {
            return String::new();
        }

        let key = (target, text.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }

        let system = match target {
            Language::Es => {
                "Translate the following English text to Spanish. Reply with only the translation."
            }
            Language::En => {
                "Translate the following Spanish text to English. Reply with only the translation."
            }
        };

        let budget = (text.chars().count() as u32).saturating_mul(2).clamp(60, 1024);
        let result = self
            .backend
            .generate(GenerationRequest::new(system, text, budget))
            .await;

        let translated = match result {
            Ok(raw) => raw.trim().to_string(),
            Err(err) => {
                warn!(error = %err, target = %target, "Translation failed, passing original through");
                return text.to_string();
            }
        };

        if !self.acceptable(text, &translated) {
            warn!(target = %target, "Translation rejected, passing original through");
            return text.to_string();
        }

        debug!(target = %target, chars = translated.len(), "Caching translation");
        self.cache.insert(key, translated.clone());
        translated
    }

    /// Quality gate: reject empty output, refusal/clarification
    /// language, and results disproportionately long for short inputs.
    fn acceptable(&self, input: &str, output: &str) -> bool {
        if output.is_empty() || is_refusal(output) {
            return false;
        }
        let input_len = input.chars().count();
        if input_len < RATIO_INPUT_LIMIT && output.chars().count() > input_len * RATIO_LIMIT {
            return false;
        }
        true
    }
}
