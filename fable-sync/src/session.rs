//! AppSession - the explicit process-wide context.
//!
//! One session holds the store, the generation gateway, the translator
//! and the append coordinator, and is passed to whatever needs shared
//! services. There is no module-level global state: the session is
//! constructed once at startup with an explicit lifetime.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use fable_agent::gateway::PassageSource;
use fable_agent::{fallback, GenerationBackend, GenerationGateway, OpenAiBackend, Translator};
use narrative::{Genre, Language, Passage, StoriesIndex, StoryIndexEntry, StyleSettings};

use crate::coordinator::{AppendCoordinator, CommitOutcome, PassageDraft};
use crate::error::SyncError;
use crate::overlay::{PatchOutcome, TranslationOverlayPatcher};
use crate::poller::ConvergencePoller;
use crate::repository::{StoryRepository, StorySnapshot};
use crate::segmenter::ChapterSegmenter;
use crate::store::RecordStore;

/// Generation backend endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
        }
    }
}

/// Configuration for one client session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The reader's display language. Canonical content is always
    /// written in English; this selects which mirror the client shows.
    pub language: Language,
    /// Convergence polling period in milliseconds
    pub poll_interval_ms: u64,
    /// Generation backend endpoint
    pub backend: BackendSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: Language::En,
            poll_interval_ms: 5_000,
            backend: BackendSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// A committed append plus the provenance of its prose, so the caller
/// can disclose degraded (locally expanded) quality to the writer.
#[derive(Debug, Clone)]
pub struct AppendResult {
    pub commit: CommitOutcome,
    pub source: PassageSource,
}

/// Process-wide context object.
pub struct AppSession {
    config: SessionConfig,
    repo: StoryRepository,
    gateway: Arc<GenerationGateway>,
    translator: Arc<Translator>,
    coordinator: AppendCoordinator,
    patcher: TranslationOverlayPatcher,
}

impl AppSession {
    /// Create a session over an explicit store and backend. Returns the
    /// receiver for overlay-patch outcome reports alongside the session.
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn RecordStore>,
        backend: Arc<dyn GenerationBackend>,
    ) -> (Self, mpsc::UnboundedReceiver<PatchOutcome>) {
        let repo = StoryRepository::new(store);
        let gateway = Arc::new(GenerationGateway::new(Arc::clone(&backend)));
        let translator = Arc::new(Translator::new(backend));

        // Canonical generation is always English; Spanish arrives as
        // the overlay mirror.
        let segmenter = ChapterSegmenter::new(Arc::clone(&gateway), Language::En);
        let coordinator = AppendCoordinator::new(repo.clone(), segmenter);
        let (patcher, outcomes) =
            TranslationOverlayPatcher::new(repo.clone(), Arc::clone(&translator));

        info!(backend = gateway.backend_id(), "Session initialized");

        (
            Self {
                config,
                repo,
                gateway,
                translator,
                coordinator,
                patcher,
            },
            outcomes,
        )
    }

    /// Create a session whose backend is built from the config's
    /// endpoint settings.
    pub fn with_http_backend(
        config: SessionConfig,
        store: Arc<dyn RecordStore>,
    ) -> (Self, mpsc::UnboundedReceiver<PatchOutcome>) {
        let backend = Arc::new(OpenAiBackend::new(
            config.backend.base_url.clone(),
            config.backend.model.clone(),
            config.backend.api_key.clone(),
        ));
        Self::new(config, store, backend)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn repository(&self) -> &StoryRepository {
        &self.repo
    }

    pub fn translator(&self) -> &Arc<Translator> {
        &self.translator
    }

    /// A poller over this session's store, at the configured interval.
    pub fn poller(&self) -> ConvergencePoller {
        ConvergencePoller::new(
            self.repo.clone(),
            Duration::from_millis(self.config.poll_interval_ms),
        )
    }

    /// Create a new story: opener, first passage, initial prompt, index
    /// entry. The first passage is committed before the session returns;
    /// its Spanish mirror arrives via the background patcher.
    pub async fn create_story(
        &self,
        genre: Genre,
        style: StyleSettings,
    ) -> Result<StoryIndexEntry, SyncError> {
        let opener = self
            .gateway
            .generate_story_opener(genre, &style, Language::En)
            .await;

        let story_id = uuid::Uuid::new_v4().to_string();
        let first = Passage::new(opener.paragraph, "", "", 1, 1);
        let first_ts = first.ts;

        let prompt = self
            .gateway
            .generate_prompt(std::slice::from_ref(&first), 1, false, genre, &style, Language::En)
            .await;

        self.repo.save_passages(&story_id, &[first]).await?;
        self.repo.save_passage_count(&story_id, 1).await?;
        self.repo.save_chapter(&story_id, 1).await?;
        self.repo
            .save_prompt(&story_id, Language::En, &prompt)
            .await?;

        let mut entry = StoryIndexEntry::new(&story_id, opener.title, genre, style);
        entry.passage_count = 1;

        let mut index = self.repo.index().await?;
        index.upsert(entry.clone());
        self.repo.save_index(&index).await?;

        info!(story_id, title = %entry.title, "Story created");

        self.patcher.patch_passage(&story_id, first_ts);
        self.patcher.patch_next_prompt(&story_id);
        self.patcher.patch_story_title(&story_id);

        Ok(entry)
    }

    /// Generate prose for a writer's answer and commit it.
    ///
    /// Generation happens once, against this client's current view;
    /// the commit itself re-reads fresh state. On a save failure the
    /// caller keeps the answer and may call again.
    pub async fn append_passage(
        &self,
        story_id: &str,
        author: u32,
        answer: &str,
        location: Option<String>,
    ) -> Result<AppendResult, SyncError> {
        let index = self.repo.index().await?;
        let (genre, style) = index
            .find(story_id)
            .map(|e| (e.genre, e.writing_style))
            .unwrap_or_default();

        let local_view = self.repo.passages(story_id).await?.unwrap_or_default();
        let chapter = self.repo.chapter(story_id).await?.unwrap_or(1);
        let prompt = match self.repo.prompt(story_id, Language::En).await? {
            Some(p) if !p.is_empty() => p,
            _ => fallback::stock_question(local_view.len(), Language::En),
        };

        let generated = self
            .gateway
            .generate_passage(&local_view, &prompt, answer, &style, chapter, genre, Language::En)
            .await;

        let draft = PassageDraft {
            text: generated.text,
            original_answer: answer.to_string(),
            prompt,
            author,
            location,
        };

        let commit = self.coordinator.commit(story_id, draft).await?;
        self.patcher.patch_commit(story_id, &commit);

        Ok(AppendResult {
            commit,
            source: generated.source,
        })
    }

    /// Load a story's canonical state, back-filling titles for any
    /// already-closed chapter that has none. A failed title attempt
    /// leaves the chapter explicitly untitled until the next load; it
    /// is never left pending.
    pub async fn load_story(&self, story_id: &str) -> Result<StorySnapshot, SyncError> {
        let mut snapshot = self.repo.snapshot(story_id).await?;

        for chapter in 1..snapshot.chapter {
            if snapshot.titles.has_title(chapter) {
                continue;
            }
            let chapter_passages: Vec<Passage> = snapshot
                .passages
                .iter()
                .filter(|p| p.chapter == chapter)
                .cloned()
                .collect();

            if let Some(title) = self
                .gateway
                .generate_chapter_title(&chapter_passages, Language::En)
                .await
            {
                // Read-modify-write against current state, then mirror.
                let mut titles = self.repo.titles(story_id).await?.unwrap_or_default();
                titles.set_title(chapter, Language::En, title.clone());
                self.repo.save_titles(story_id, &titles).await?;
                snapshot.titles = titles;
                self.patcher.patch_chapter_title(story_id, chapter, &title);
            }
        }

        Ok(snapshot)
    }

    /// Delete a story's records and its index entry.
    pub async fn delete_story(&self, story_id: &str) -> Result<(), SyncError> {
        self.repo.delete_story_records(story_id).await?;

        let mut index: StoriesIndex = self.repo.index().await?;
        index.remove(story_id);
        self.repo.save_index(&index).await?;

        info!(story_id, "Story deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use fable_agent::MockBackend;

    #[test]
    fn config_roundtrips_through_yaml() {
        let config = SessionConfig {
            language: Language::Es,
            poll_interval_ms: 2_500,
            ..SessionConfig::default()
        };

        let yaml = config.to_yaml().unwrap();
        let back = SessionConfig::from_yaml(&yaml).unwrap();
        assert_eq!(back.language, Language::Es);
        assert_eq!(back.poll_interval_ms, 2_500);
        assert_eq!(back.backend.model, "llama3.2");
    }

    #[tokio::test]
    async fn create_story_persists_every_record() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(
            MockBackend::default()
                .with_responses([
                    r#"{"title": "The Crossing", "paragraph": "They left before first light, and the river was already loud."}"#,
                    "What waits on the far bank?",
                ]),
        );
        let (session, _outcomes) = AppSession::new(SessionConfig::default(), store, backend);

        let entry = session
            .create_story(Genre::Adventure, StyleSettings::default())
            .await
            .unwrap();

        assert_eq!(entry.title, "The Crossing");
        assert_eq!(entry.slug, "the-crossing");
        assert_eq!(entry.passage_count, 1);

        let snapshot = session.load_story(&entry.id).await.unwrap();
        assert_eq!(snapshot.passages.len(), 1);
        assert_eq!(snapshot.passages[0].chapter, 1);
        assert_eq!(snapshot.passages[0].author, 1);
        assert_eq!(snapshot.chapter, 1);
        assert_eq!(snapshot.prompt.as_deref(), Some("What waits on the far bank?"));
    }

    #[tokio::test]
    async fn load_story_backfills_missing_chapter_title() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(MockBackend::default().with_response("Embers"));
        let (session, _outcomes) = AppSession::new(SessionConfig::default(), store, backend);

        let repo = session.repository().clone();
        repo.save_passages(
            "s",
            &(0..4)
                .map(|i| Passage::new(format!("P{i}."), "a", "Q?", 1, 1))
                .collect::<Vec<_>>(),
        )
        .await
        .unwrap();
        repo.save_chapter("s", 2).await.unwrap();

        let snapshot = session.load_story("s").await.unwrap();
        assert_eq!(snapshot.titles.title(1, Language::En), Some("Embers"));

        // Persisted, not just returned
        let stored = repo.titles("s").await.unwrap().unwrap();
        assert!(stored.has_title(1));
    }

    #[tokio::test]
    async fn failed_backfill_leaves_chapter_untitled() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(MockBackend::default().with_failure(true));
        let (session, _outcomes) = AppSession::new(SessionConfig::default(), store, backend);

        let repo = session.repository().clone();
        repo.save_passages("s", &[Passage::new("P.", "a", "Q?", 1, 1)])
            .await
            .unwrap();
        repo.save_chapter("s", 2).await.unwrap();

        let snapshot = session.load_story("s").await.unwrap();
        assert!(!snapshot.titles.has_title(1));
    }

    #[tokio::test]
    async fn delete_story_clears_records_and_index() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(MockBackend::default());
        let (session, _outcomes) = AppSession::new(SessionConfig::default(), store, backend);

        let entry = session
            .create_story(Genre::Mystery, StyleSettings::default())
            .await
            .unwrap();

        session.delete_story(&entry.id).await.unwrap();

        assert!(session.repository().passages(&entry.id).await.unwrap().is_none());
        assert!(session.repository().index().await.unwrap().find(&entry.id).is_none());
    }
}
