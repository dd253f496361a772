//! Core persisted types for the story model.
//!
//! Field names on persisted structs match the original wire format
//! (camelCase, with explicit `_es` suffixes for the Spanish mirror
//! fields), so records written by this engine are readable by any
//! client of the same store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::style::{Genre, StyleSettings};

/// Supported languages.
///
/// English is the canonical language of every persisted `text` and
/// `prompt` field; Spanish is the lazily back-filled overlay mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English - canonical
    En,
    /// Spanish - overlay mirror
    Es,
}

impl Language {
    /// Suffix used in record keys and field names (e.g. `prompt-es-v1`).
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }

    /// The opposite direction for translation.
    pub fn other(&self) -> Self {
        match self {
            Self::En => Self::Es,
            Self::Es => Self::En,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::En
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "es" | "spanish" | "español" | "espanol" => Ok(Self::Es),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// One unit of narrative contributed by one writer.
///
/// Passages within a story are totally ordered by their position in the
/// persisted list, which always equals append order. `ts` is a stable
/// identity/display key, never the ordering source of truth. Once
/// written, `text` is immutable; only the Spanish mirror fields are
/// back-filled after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passage {
    /// Canonical (English) prose
    pub text: String,
    /// Spanish mirror of `text`, back-filled by the overlay patcher
    #[serde(rename = "text_es", default, skip_serializing_if = "Option::is_none")]
    pub text_es: Option<String>,
    /// The raw answer the writer typed
    pub original_answer: String,
    /// The question this passage answered
    pub prompt: String,
    /// Spanish mirror of `prompt`
    #[serde(rename = "prompt_es", default, skip_serializing_if = "Option::is_none")]
    pub prompt_es: Option<String>,
    /// 1-based contributor ordinal within the story
    pub author: u32,
    /// Optional writer-supplied location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Display-formatted creation time
    pub time: String,
    /// Creation instant in epoch milliseconds
    pub ts: i64,
    /// 1-based chapter number
    pub chapter: u32,
}

impl Passage {
    /// Create a new passage stamped with the current time.
    pub fn new(
        text: impl Into<String>,
        original_answer: impl Into<String>,
        prompt: impl Into<String>,
        author: u32,
        chapter: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            text: text.into(),
            text_es: None,
            original_answer: original_answer.into(),
            prompt: prompt.into(),
            prompt_es: None,
            author,
            location: None,
            time: now.format("%b %e, %Y %H:%M").to_string(),
            ts: now.timestamp_millis(),
            chapter,
        }
    }

    /// Set the writer-supplied location.
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }
}

/// Mapping from chapter number to title.
///
/// Keys are `"<chapter>"` for the canonical title and `"<chapter>_es"`
/// for the Spanish mirror. A chapter acquires a title only once its
/// narrative arc is judged complete; the in-progress chapter has no
/// entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterTitles(pub BTreeMap<String, String>);

impl ChapterTitles {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(chapter: u32, lang: Language) -> String {
        match lang {
            Language::En => chapter.to_string(),
            Language::Es => format!("{}_es", chapter),
        }
    }

    /// Title of a chapter in the given language, if stored.
    pub fn title(&self, chapter: u32, lang: Language) -> Option<&str> {
        self.0.get(&Self::key(chapter, lang)).map(String::as_str)
    }

    /// Whether a chapter has a canonical title.
    pub fn has_title(&self, chapter: u32) -> bool {
        self.0.contains_key(&chapter.to_string())
    }

    /// Store a title.
    pub fn set_title(&mut self, chapter: u32, lang: Language, title: impl Into<String>) {
        self.0.insert(Self::key(chapter, lang), title.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Summary record for one story in the global catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryIndexEntry {
    /// Story identifier (used in record keys)
    pub id: String,
    /// URL-friendly slug derived from the title
    pub slug: String,
    /// Validated genre tag
    pub genre: Genre,
    /// The style sliders chosen at creation
    pub writing_style: StyleSettings,
    /// Canonical (English) story title
    pub title: String,
    /// Spanish mirror of the title
    #[serde(rename = "title_es", default, skip_serializing_if = "Option::is_none")]
    pub title_es: Option<String>,
    /// Number of committed passages; refreshed only after a successful
    /// append, never speculatively
    pub passage_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoryIndexEntry {
    /// Create an entry for a freshly created story.
    pub fn new(id: impl Into<String>, title: impl Into<String>, genre: Genre, style: StyleSettings) -> Self {
        let title = title.into();
        let now = Utc::now();
        Self {
            id: id.into(),
            slug: slug_for(&title),
            genre,
            writing_style: style,
            title,
            title_es: None,
            passage_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Ordered collection of story summaries, stored as a single record.
///
/// There is no partial-index update primitive: every creation, deletion
/// or update rewrites the whole collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoriesIndex {
    pub entries: Vec<StoryIndexEntry>,
}

impl StoriesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find an entry by story id.
    pub fn find(&self, id: &str) -> Option<&StoryIndexEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Find a mutable entry by story id.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut StoryIndexEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Insert or replace the entry with the same id, preserving order.
    pub fn upsert(&mut self, entry: StoryIndexEntry) {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Remove the entry for a story, if present.
    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|e| e.id != id);
    }
}

/// Derive a URL-friendly slug from a story title.
pub fn slug_for(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
