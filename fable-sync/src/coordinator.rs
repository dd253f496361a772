//! AppendCoordinator - optimistic concurrency control for appends.
//!
//! The store has no cross-key transactions and no compare-and-swap, so
//! a naive "append to my cached copy, write back" would silently drop
//! passages committed by other clients in the meantime. The coordinator
//! narrows the lost-update window by re-reading the passage list
//! immediately before writing and appending to that fresh copy, never
//! to the caller's view. The residual window between the fresh read and
//! the write is accepted last-writer-wins; no lock is introduced.
//!
//! Prose is generated before commit and never regenerated on retry.
//! A write failure surfaces as a save failure; the caller keeps the
//! draft and may retry. Partial failure (passage list written, index
//! not) is not rolled back - the next successful write converges it.

use tracing::{debug, info, warn};

use chrono::Utc;
use narrative::Passage;

use crate::error::SyncError;
use crate::repository::StoryRepository;
use crate::segmenter::{ChapterSegmenter, ClosedChapter};

/// The uncommitted contribution of one writer.
///
/// `text` is the already-generated prose; generation is never redone
/// when a commit is retried.
#[derive(Debug, Clone)]
pub struct PassageDraft {
    pub text: String,
    pub original_answer: String,
    pub prompt: String,
    pub author: u32,
    pub location: Option<String>,
}

/// Committed state returned to the writer, built from the values
/// actually written - never from pre-commit assumptions.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub passages: Vec<Passage>,
    pub chapter: u32,
    pub closed_chapter: Option<ClosedChapter>,
    pub next_prompt: String,
}

/// Commits passages under the read-fresh-then-write discipline.
pub struct AppendCoordinator {
    repo: StoryRepository,
    segmenter: ChapterSegmenter,
}

impl AppendCoordinator {
    pub fn new(repo: StoryRepository, segmenter: ChapterSegmenter) -> Self {
        Self { repo, segmenter }
    }

    /// Append a drafted passage to a story.
    pub async fn commit(
        &self,
        story_id: &str,
        draft: PassageDraft,
    ) -> Result<CommitOutcome, SyncError> {
        // Story configuration for segmentation prompts.
        let index = self.repo.index().await?;
        let (genre, style) = index
            .find(story_id)
            .map(|e| (e.genre, e.writing_style))
            .unwrap_or_default();

        // 1-2. Re-fetch immediately before appending; append to the
        // fresh list, not to whatever the writer had cached.
        let mut passages = self.repo.passages(story_id).await?.unwrap_or_default();
        let chapter = self.repo.chapter(story_id).await?.unwrap_or(1);
        debug!(story_id, base_len = passages.len(), chapter, "Fresh read before append");

        let passage = Passage::new(
            draft.text,
            draft.original_answer,
            draft.prompt,
            draft.author,
            chapter,
        )
        .with_location(draft.location);
        passages.push(passage);

        // 3. Segmentation runs against the freshly appended list.
        let transition = self
            .segmenter
            .evaluate(&passages, chapter, genre, &style)
            .await;

        // 4. Write the story records back.
        self.repo.save_passages(story_id, &passages).await?;
        self.repo.save_passage_count(story_id, passages.len()).await?;
        self.repo.save_chapter(story_id, transition.chapter).await?;

        if let Some(closed) = &transition.closed {
            if let Some(title) = &closed.title {
                let mut titles = self.repo.titles(story_id).await?.unwrap_or_default();
                titles.set_title(closed.number, narrative::Language::En, title.clone());
                self.repo.save_titles(story_id, &titles).await?;
            }
        }

        self.repo
            .save_prompt(story_id, narrative::Language::En, &transition.next_prompt)
            .await?;

        // 5. Re-read, mutate, and rewrite the whole index; there is no
        // partial-index update primitive.
        let mut index = self.repo.index().await?;
        match index.find_mut(story_id) {
            Some(entry) => {
                entry.passage_count = passages.len();
                entry.updated_at = Utc::now();
                if entry.title.is_empty() {
                    if let Some(title) = transition
                        .closed
                        .as_ref()
                        .and_then(|c| c.title.clone())
                    {
                        entry.title = title;
                    }
                }
                self.repo.save_index(&index).await?;
            }
            None => {
                warn!(story_id, "No index entry for story; skipping index update");
            }
        }

        info!(
            story_id,
            len = passages.len(),
            chapter = transition.chapter,
            closed = transition.closed.is_some(),
            "Passage committed"
        );

        // 6. The outcome reflects committed values only.
        Ok(CommitOutcome {
            passages,
            chapter: transition.chapter,
            closed_chapter: transition.closed,
            next_prompt: transition.next_prompt,
        })
    }
}
