//! Persisted key layout of the backing record store.
//!
//! Per-story records are namespaced as `story-<id>-<suffix>`; the
//! catalog lives under a single global key. The layout is a
//! compatibility contract: clients of the same store rely on these
//! exact strings.

use crate::types::Language;

/// Global key holding the JSON-encoded stories index.
pub const STORIES_INDEX: &str = "stories-index-v1";

/// JSON-encoded passage list.
pub fn data(story_id: &str) -> String {
    format!("story-{story_id}-data-v1")
}

/// Passage count as an integer string.
pub fn count(story_id: &str) -> String {
    format!("story-{story_id}-count-v1")
}

/// Current chapter number as an integer string.
pub fn chapter(story_id: &str) -> String {
    format!("story-{story_id}-chapter-v1")
}

/// JSON-encoded chapter-title map.
pub fn titles(story_id: &str) -> String {
    format!("story-{story_id}-titles-v1")
}

/// Current prompt, stored as a raw string per language.
pub fn prompt(story_id: &str, lang: Language) -> String {
    match lang {
        Language::En => format!("story-{story_id}-prompt-v1"),
        Language::Es => format!("story-{story_id}-prompt-es-v1"),
    }
}

/// Every per-story key, for deletion sweeps.
pub fn all_for_story(story_id: &str) -> Vec<String> {
    vec![
        data(story_id),
        count(story_id),
        chapter(story_id),
        titles(story_id),
        prompt(story_id, Language::En),
        prompt(story_id, Language::Es),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_contract() {
        assert_eq!(data("abc"), "story-abc-data-v1");
        assert_eq!(count("abc"), "story-abc-count-v1");
        assert_eq!(chapter("abc"), "story-abc-chapter-v1");
        assert_eq!(titles("abc"), "story-abc-titles-v1");
        assert_eq!(prompt("abc", Language::En), "story-abc-prompt-v1");
        assert_eq!(prompt("abc", Language::Es), "story-abc-prompt-es-v1");
        assert_eq!(STORIES_INDEX, "stories-index-v1");
    }

    #[test]
    fn deletion_sweep_covers_all_suffixes() {
        let keys = all_for_story("x");
        assert_eq!(keys.len(), 6);
        assert!(keys.iter().all(|k| k.starts_with("story-x-")));
    }
}
