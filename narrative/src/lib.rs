//! Narrative - data model for the Fable collaborative story engine.
//!
//! Defines the persisted shapes shared by every other crate:
//!
//! - **Passage**: one appended unit of story text plus its provenance
//! - **ChapterTitles**: the per-story chapter-title map
//! - **StoriesIndex**: the summary catalog of all stories
//! - **Genre / StyleSettings**: validated story configuration
//! - **keys**: the exact key layout of the backing record store
//!
//! This crate is pure data: no async, no I/O, no service calls.

pub mod keys;
pub mod style;
pub mod types;

// Re-export main types for convenience
pub use style::{Genre, StyleSettings};
pub use types::{
    ChapterTitles, Language, Passage, StoriesIndex, StoryIndexEntry,
};
