//! Typed access to a story's persisted records.
//!
//! Every record is one opaque string in the store, addressed by the key
//! layout in [`narrative::keys`]. Granular readers return `Ok(None)`
//! for a missing record so callers can leave the matching piece of
//! local state untouched; the convenience
//! [`StoryRepository::snapshot`] applies defaults instead.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use narrative::{keys, ChapterTitles, Language, Passage, StoriesIndex};

use crate::error::SyncError;
use crate::store::RecordStore;

/// Full canonical read of one story's state.
#[derive(Debug, Clone, Default)]
pub struct StorySnapshot {
    pub passages: Vec<Passage>,
    pub chapter: u32,
    pub titles: ChapterTitles,
    pub prompt: Option<String>,
    pub prompt_es: Option<String>,
    pub passage_count: usize,
}

/// Typed repository over the record store.
#[derive(Clone)]
pub struct StoryRepository {
    store: Arc<dyn RecordStore>,
}

impl StoryRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.store)
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SyncError> {
        match self.store.get(key).await? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| SyncError::corrupt(key, e)),
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SyncError> {
        let raw = serde_json::to_string(value).map_err(|e| SyncError::corrupt(key, e))?;
        Ok(self.store.set(key, &raw).await?)
    }

    async fn get_integer(&self, key: &str) -> Result<Option<u64>, SyncError> {
        match self.store.get(key).await? {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| SyncError::corrupt(key, e)),
        }
    }

    /// The ordered passage list, `None` if never written.
    pub async fn passages(&self, story_id: &str) -> Result<Option<Vec<Passage>>, SyncError> {
        self.get_json(&keys::data(story_id)).await
    }

    pub async fn save_passages(&self, story_id: &str, passages: &[Passage]) -> Result<(), SyncError> {
        self.set_json(&keys::data(story_id), &passages).await
    }

    pub async fn passage_count(&self, story_id: &str) -> Result<Option<usize>, SyncError> {
        Ok(self.get_integer(&keys::count(story_id)).await?.map(|n| n as usize))
    }

    pub async fn save_passage_count(&self, story_id: &str, count: usize) -> Result<(), SyncError> {
        Ok(self
            .store
            .set(&keys::count(story_id), &count.to_string())
            .await?)
    }

    pub async fn chapter(&self, story_id: &str) -> Result<Option<u32>, SyncError> {
        Ok(self.get_integer(&keys::chapter(story_id)).await?.map(|n| n as u32))
    }

    pub async fn save_chapter(&self, story_id: &str, chapter: u32) -> Result<(), SyncError> {
        Ok(self
            .store
            .set(&keys::chapter(story_id), &chapter.to_string())
            .await?)
    }

    pub async fn titles(&self, story_id: &str) -> Result<Option<ChapterTitles>, SyncError> {
        self.get_json(&keys::titles(story_id)).await
    }

    pub async fn save_titles(&self, story_id: &str, titles: &ChapterTitles) -> Result<(), SyncError> {
        self.set_json(&keys::titles(story_id), titles).await
    }

    /// Current prompt, stored as a raw (non-JSON) string per language.
    pub async fn prompt(&self, story_id: &str, lang: Language) -> Result<Option<String>, SyncError> {
        Ok(self.store.get(&keys::prompt(story_id, lang)).await?)
    }

    pub async fn save_prompt(&self, story_id: &str, lang: Language, prompt: &str) -> Result<(), SyncError> {
        Ok(self.store.set(&keys::prompt(story_id, lang), prompt).await?)
    }

    /// The global stories index; an absent record reads as empty.
    pub async fn index(&self) -> Result<StoriesIndex, SyncError> {
        Ok(self
            .get_json(keys::STORIES_INDEX)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_index(&self, index: &StoriesIndex) -> Result<(), SyncError> {
        self.set_json(keys::STORIES_INDEX, index).await
    }

    /// Remove every per-story record. The index is maintained
    /// separately, by whole-record rewrite.
    pub async fn delete_story_records(&self, story_id: &str) -> Result<(), SyncError> {
        for key in keys::all_for_story(story_id) {
            self.store.delete(&key).await?;
        }
        Ok(())
    }

    /// Full canonical read with defaults applied (no passages, chapter
    /// 1, no titles).
    pub async fn snapshot(&self, story_id: &str) -> Result<StorySnapshot, SyncError> {
        let passages = self.passages(story_id).await?.unwrap_or_default();
        let chapter = self.chapter(story_id).await?.unwrap_or(1);
        let titles = self.titles(story_id).await?.unwrap_or_default();
        let prompt = self.prompt(story_id, Language::En).await?;
        let prompt_es = self.prompt(story_id, Language::Es).await?;
        let passage_count = self
            .passage_count(story_id)
            .await?
            .unwrap_or(passages.len());

        Ok(StorySnapshot {
            passages,
            chapter,
            titles,
            prompt,
            prompt_es,
            passage_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use narrative::{Genre, StoryIndexEntry, StyleSettings};

    fn repo() -> StoryRepository {
        StoryRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn passages_roundtrip() {
        let repo = repo();
        assert!(repo.passages("s").await.unwrap().is_none());

        let list = vec![Passage::new("One.", "a", "Q?", 1, 1)];
        repo.save_passages("s", &list).await.unwrap();

        let read = repo.passages("s").await.unwrap().unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].text, "One.");
    }

    #[tokio::test]
    async fn integer_records_are_plain_strings() {
        let repo = repo();
        repo.save_passage_count("s", 3).await.unwrap();
        repo.save_chapter("s", 2).await.unwrap();

        let store = repo.store();
        assert_eq!(
            store.get("story-s-count-v1").await.unwrap().as_deref(),
            Some("3")
        );
        assert_eq!(
            store.get("story-s-chapter-v1").await.unwrap().as_deref(),
            Some("2")
        );
        assert_eq!(repo.passage_count("s").await.unwrap(), Some(3));
        assert_eq!(repo.chapter("s").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn corrupt_record_is_reported_with_its_key() {
        let repo = repo();
        repo.store().set("story-s-data-v1", "not json").await.unwrap();

        let err = repo.passages("s").await.unwrap_err();
        assert!(matches!(err, SyncError::Corrupt { ref key, .. } if key == "story-s-data-v1"));
    }

    #[tokio::test]
    async fn snapshot_applies_defaults() {
        let repo = repo();
        let snapshot = repo.snapshot("missing").await.unwrap();
        assert!(snapshot.passages.is_empty());
        assert_eq!(snapshot.chapter, 1);
        assert!(snapshot.titles.is_empty());
        assert_eq!(snapshot.prompt, None);
    }

    #[tokio::test]
    async fn index_rewrites_whole_record() {
        let repo = repo();
        let mut index = repo.index().await.unwrap();
        assert!(index.entries.is_empty());

        index.upsert(StoryIndexEntry::new(
            "s",
            "A Story",
            Genre::Mystery,
            StyleSettings::default(),
        ));
        repo.save_index(&index).await.unwrap();

        let read = repo.index().await.unwrap();
        assert_eq!(read.entries.len(), 1);
        assert_eq!(read.find("s").unwrap().slug, "a-story");
    }

    #[tokio::test]
    async fn delete_sweep_clears_story_records() {
        let repo = repo();
        repo.save_passages("s", &[Passage::new("One.", "a", "Q?", 1, 1)])
            .await
            .unwrap();
        repo.save_prompt("s", Language::En, "Next?").await.unwrap();

        repo.delete_story_records("s").await.unwrap();
        assert!(repo.passages("s").await.unwrap().is_none());
        assert!(repo.prompt("s", Language::En).await.unwrap().is_none());
    }
}
