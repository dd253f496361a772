//! Background translation overlay.
//!
//! Runs strictly after a commit has succeeded and the writer is
//! unblocked: translation latency never gates the perceived completion
//! of a contribution. Each sub-resource (passage text, next prompt,
//! chapter title, story title) is patched by its own spawned task that
//! re-reads the current persisted record, fills in only the missing
//! Spanish field, and writes back - never blindly overwriting with
//! pre-commit values. Failures are logged and swallowed; the text
//! simply stays untranslated until a later attempt.
//!
//! Every task reports a [`PatchOutcome`] on a channel, so the
//! fire-and-forget work is still observable and testable.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use fable_agent::Translator;
use narrative::Language;

use crate::coordinator::CommitOutcome;
use crate::repository::StoryRepository;

/// Which sub-resource a patch task targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    /// `text_es` / `prompt_es` on one passage
    Passage,
    /// The per-story current-prompt mirror record
    NextPrompt,
    /// One chapter-title mirror entry
    ChapterTitle,
    /// The story title mirror in the index
    StoryTitle,
}

/// Report from one finished patch task.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub story_id: String,
    pub kind: PatchKind,
    /// Whether anything was written; `false` covers both failures and
    /// no-ops (field already present, record gone, stale prompt).
    pub patched: bool,
}

/// Fire-and-forget patcher that attaches Spanish mirrors to
/// already-committed content.
pub struct TranslationOverlayPatcher {
    repo: StoryRepository,
    translator: Arc<Translator>,
    outcomes: mpsc::UnboundedSender<PatchOutcome>,
}

impl TranslationOverlayPatcher {
    /// Create a patcher and the receiver for its outcome reports.
    pub fn new(
        repo: StoryRepository,
        translator: Arc<Translator>,
    ) -> (Self, mpsc::UnboundedReceiver<PatchOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                repo,
                translator,
                outcomes: tx,
            },
            rx,
        )
    }

    /// Spawn every patch a fresh commit calls for: the new passage,
    /// the next prompt, and - iff a chapter just closed with a title -
    /// that title.
    pub fn patch_commit(&self, story_id: &str, outcome: &CommitOutcome) {
        if let Some(passage) = outcome.passages.last() {
            self.patch_passage(story_id, passage.ts);
        }
        self.patch_next_prompt(story_id);
        if let Some(closed) = &outcome.closed_chapter {
            if let Some(title) = &closed.title {
                self.patch_chapter_title(story_id, closed.number, title);
            }
        }
    }

    /// Patch the Spanish mirror fields of one passage, found by `ts`.
    pub fn patch_passage(&self, story_id: &str, ts: i64) {
        let repo = self.repo.clone();
        let translator = Arc::clone(&self.translator);
        let outcomes = self.outcomes.clone();
        let story_id = story_id.to_string();

        tokio::spawn(async move {
            let patched = patch_passage_task(&repo, &translator, &story_id, ts).await;
            let _ = outcomes.send(PatchOutcome {
                story_id,
                kind: PatchKind::Passage,
                patched,
            });
        });
    }

    /// Patch the Spanish mirror of whatever prompt is current when the
    /// task runs. Translating the re-read value (not a captured one)
    /// keeps a prompt replaced by a later commit from being shadowed by
    /// a stale translation.
    pub fn patch_next_prompt(&self, story_id: &str) {
        let repo = self.repo.clone();
        let translator = Arc::clone(&self.translator);
        let outcomes = self.outcomes.clone();
        let story_id = story_id.to_string();

        tokio::spawn(async move {
            let patched = patch_prompt_task(&repo, &translator, &story_id).await;
            let _ = outcomes.send(PatchOutcome {
                story_id,
                kind: PatchKind::NextPrompt,
                patched,
            });
        });
    }

    /// Patch the Spanish mirror of one chapter title.
    pub fn patch_chapter_title(&self, story_id: &str, chapter: u32, title: &str) {
        let repo = self.repo.clone();
        let translator = Arc::clone(&self.translator);
        let outcomes = self.outcomes.clone();
        let story_id = story_id.to_string();
        let title = title.to_string();

        tokio::spawn(async move {
            let patched =
                patch_chapter_title_task(&repo, &translator, &story_id, chapter, &title).await;
            let _ = outcomes.send(PatchOutcome {
                story_id,
                kind: PatchKind::ChapterTitle,
                patched,
            });
        });
    }

    /// Patch the Spanish mirror of the story title in the index.
    pub fn patch_story_title(&self, story_id: &str) {
        let repo = self.repo.clone();
        let translator = Arc::clone(&self.translator);
        let outcomes = self.outcomes.clone();
        let story_id = story_id.to_string();

        tokio::spawn(async move {
            let patched = patch_story_title_task(&repo, &translator, &story_id).await;
            let _ = outcomes.send(PatchOutcome {
                story_id,
                kind: PatchKind::StoryTitle,
                patched,
            });
        });
    }
}

/// The translator passes the original through on failure, so an output
/// identical to the input is treated as a failed attempt and skipped.
async fn translated_or_none(translator: &Translator, text: &str) -> Option<String> {
    let out = translator.translate(text, Language::Es).await;
    (out != text).then_some(out)
}

async fn patch_passage_task(
    repo: &StoryRepository,
    translator: &Translator,
    story_id: &str,
    ts: i64,
) -> bool {
    let passages = match repo.passages(story_id).await {
        Ok(Some(p)) => p,
        Ok(None) => return false,
        Err(err) => {
            warn!(story_id, error = %err, "Passage patch skipped: read failed");
            return false;
        }
    };
    let Some(passage) = passages.iter().find(|p| p.ts == ts) else {
        return false;
    };

    let want_text = passage.text_es.is_none();
    let want_prompt = passage.prompt_es.is_none() && !passage.prompt.is_empty();
    if !want_text && !want_prompt {
        debug!(story_id, ts, "Passage already mirrored");
        return false;
    }

    let text_es = if want_text {
        translated_or_none(translator, &passage.text).await
    } else {
        None
    };
    let prompt_es = if want_prompt {
        translated_or_none(translator, &passage.prompt).await
    } else {
        None
    };
    if text_es.is_none() && prompt_es.is_none() {
        return false;
    }

    // Re-read before writing; other activity may have landed meanwhile.
    let mut fresh = match repo.passages(story_id).await {
        Ok(Some(p)) => p,
        _ => return false,
    };
    let Some(slot) = fresh.iter_mut().find(|p| p.ts == ts) else {
        return false;
    };

    let mut changed = false;
    if slot.text_es.is_none() {
        if let Some(t) = text_es {
            slot.text_es = Some(t);
            changed = true;
        }
    }
    if slot.prompt_es.is_none() {
        if let Some(t) = prompt_es {
            slot.prompt_es = Some(t);
            changed = true;
        }
    }
    if !changed {
        return false;
    }

    match repo.save_passages(story_id, &fresh).await {
        Ok(()) => {
            debug!(story_id, ts, "Passage mirror patched");
            true
        }
        Err(err) => {
            warn!(story_id, error = %err, "Passage patch write failed");
            false
        }
    }
}

async fn patch_prompt_task(
    repo: &StoryRepository,
    translator: &Translator,
    story_id: &str,
) -> bool {
    let current = match repo.prompt(story_id, Language::En).await {
        Ok(Some(p)) if !p.is_empty() => p,
        Ok(_) => return false,
        Err(err) => {
            warn!(story_id, error = %err, "Prompt patch skipped: read failed");
            return false;
        }
    };

    let Some(translated) = translated_or_none(translator, &current).await else {
        return false;
    };

    match repo.save_prompt(story_id, Language::Es, &translated).await {
        Ok(()) => true,
        Err(err) => {
            warn!(story_id, error = %err, "Prompt patch write failed");
            false
        }
    }
}

async fn patch_chapter_title_task(
    repo: &StoryRepository,
    translator: &Translator,
    story_id: &str,
    chapter: u32,
    title: &str,
) -> bool {
    let Some(translated) = translated_or_none(translator, title).await else {
        return false;
    };

    let mut titles = match repo.titles(story_id).await {
        Ok(t) => t.unwrap_or_default(),
        Err(err) => {
            warn!(story_id, error = %err, "Title patch skipped: read failed");
            return false;
        }
    };
    if titles.title(chapter, Language::Es).is_some() {
        return false;
    }
    titles.set_title(chapter, Language::Es, translated);

    match repo.save_titles(story_id, &titles).await {
        Ok(()) => true,
        Err(err) => {
            warn!(story_id, error = %err, "Title patch write failed");
            false
        }
    }
}

async fn patch_story_title_task(
    repo: &StoryRepository,
    translator: &Translator,
    story_id: &str,
) -> bool {
    let mut index = match repo.index().await {
        Ok(index) => index,
        Err(err) => {
            warn!(story_id, error = %err, "Index patch skipped: read failed");
            return false;
        }
    };
    let Some(entry) = index.find_mut(story_id) else {
        return false;
    };
    if entry.title_es.is_some() || entry.title.is_empty() {
        return false;
    }

    let title = entry.title.clone();
    let Some(translated) = translated_or_none(translator, &title).await else {
        return false;
    };
    entry.title_es = Some(translated);

    match repo.save_index(&index).await {
        Ok(()) => true,
        Err(err) => {
            warn!(story_id, error = %err, "Index patch write failed");
            false
        }
    }
}
