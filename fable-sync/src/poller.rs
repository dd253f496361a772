//! Convergence polling.
//!
//! There is no push notification in this system: a client observes
//! passages committed by other clients only by periodically re-reading
//! the story's canonical records while the story is the active view.
//! A successful read of a record replaces that piece of the shared view
//! outright; a missing or failed read leaves that piece untouched
//! rather than clearing it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use narrative::{ChapterTitles, Language, Passage};

use crate::repository::StoryRepository;

/// The client-local view of one story, refreshed by the poller.
#[derive(Debug, Clone)]
pub struct StoryView {
    pub passages: Vec<Passage>,
    pub chapter: u32,
    pub titles: ChapterTitles,
    pub prompt: Option<String>,
    pub prompt_es: Option<String>,
}

impl Default for StoryView {
    fn default() -> Self {
        Self {
            passages: Vec::new(),
            chapter: 1,
            titles: ChapterTitles::new(),
            prompt: None,
            prompt_es: None,
        }
    }
}

/// Periodic full re-read of a story's canonical state.
///
/// Only one interval is ever active: `start` aborts any prior handle
/// first, and dropping the poller (navigating away) stops it.
pub struct ConvergencePoller {
    repo: StoryRepository,
    interval: Duration,
    view: Arc<RwLock<StoryView>>,
    revision: watch::Sender<u64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConvergencePoller {
    pub fn new(repo: StoryRepository, interval: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            repo,
            interval,
            view: Arc::new(RwLock::new(StoryView::default())),
            revision,
            handle: Mutex::new(None),
        }
    }

    /// Shared handle to the refreshed view.
    pub fn view(&self) -> Arc<RwLock<StoryView>> {
        Arc::clone(&self.view)
    }

    /// Subscribe to refresh notifications (a bumped revision counter).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Begin polling a story. Any previously running interval is
    /// cancelled first.
    pub fn start(&self, story_id: impl Into<String>) {
        self.stop();

        let story_id = story_id.into();
        let repo = self.repo.clone();
        let view = Arc::clone(&self.view);
        let revision = self.revision.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                refresh_once(&repo, &story_id, &view).await;
                revision.send_modify(|r| *r += 1);
            }
        });

        *self.handle.lock().expect("poller handle lock") = Some(handle);
    }

    /// Stop polling. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().expect("poller handle lock").take() {
            handle.abort();
            debug!("Convergence polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .expect("poller handle lock")
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for ConvergencePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One refresh pass: per-record read, replace-on-success.
async fn refresh_once(repo: &StoryRepository, story_id: &str, view: &RwLock<StoryView>) {
    match repo.passages(story_id).await {
        Ok(Some(passages)) => view.write().await.passages = passages,
        Ok(None) => {}
        Err(err) => warn!(story_id, error = %err, "Poll read of passages failed"),
    }
    match repo.chapter(story_id).await {
        Ok(Some(chapter)) => view.write().await.chapter = chapter,
        Ok(None) => {}
        Err(err) => warn!(story_id, error = %err, "Poll read of chapter failed"),
    }
    match repo.titles(story_id).await {
        Ok(Some(titles)) => view.write().await.titles = titles,
        Ok(None) => {}
        Err(err) => warn!(story_id, error = %err, "Poll read of titles failed"),
    }
    match repo.prompt(story_id, Language::En).await {
        Ok(Some(prompt)) => view.write().await.prompt = Some(prompt),
        Ok(None) => {}
        Err(err) => warn!(story_id, error = %err, "Poll read of prompt failed"),
    }
    match repo.prompt(story_id, Language::Es).await {
        Ok(Some(prompt)) => view.write().await.prompt_es = Some(prompt),
        Ok(None) => {}
        Err(err) => warn!(story_id, error = %err, "Poll read of prompt mirror failed"),
    }
}
