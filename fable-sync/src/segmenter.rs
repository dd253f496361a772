//! Chapter segmentation.
//!
//! A story's chapter sequence is an unbounded state machine: the open
//! chapter `n` advances to `n + 1` once the completeness check says the
//! arc has closed. Closing a chapter persists a (possibly absent) title
//! and produces an opening prompt for the new chapter; a title failure
//! never blocks the transition.

use std::sync::Arc;

use tracing::{debug, info};

use fable_agent::GenerationGateway;
use narrative::{Genre, Language, Passage, StyleSettings};

/// A chapter that just closed, with the title obtained for it (if any).
#[derive(Debug, Clone)]
pub struct ClosedChapter {
    pub number: u32,
    pub title: Option<String>,
}

/// Result of evaluating segmentation after an append.
#[derive(Debug, Clone)]
pub struct SegmentTransition {
    /// The open chapter after evaluation (same number, or advanced)
    pub chapter: u32,
    /// The chapter that closed, if one did
    pub closed: Option<ClosedChapter>,
    /// The prompt for the next contribution
    pub next_prompt: String,
}

/// Decides when the current chapter closes and the next begins.
pub struct ChapterSegmenter {
    gateway: Arc<GenerationGateway>,
    language: Language,
}

impl ChapterSegmenter {
    pub fn new(gateway: Arc<GenerationGateway>, language: Language) -> Self {
        Self { gateway, language }
    }

    /// Evaluate the freshly appended passage list.
    ///
    /// When the completeness check confirms the arc has closed, the
    /// chapter advances and the new prompt is generated with the
    /// new-chapter instruction (shift setting or thread); otherwise the
    /// prompt continues the current scene.
    pub async fn evaluate(
        &self,
        passages: &[Passage],
        current_chapter: u32,
        genre: Genre,
        style: &StyleSettings,
    ) -> SegmentTransition {
        if self.gateway.should_end_chapter(passages, current_chapter).await {
            let chapter_passages: Vec<Passage> = passages
                .iter()
                .filter(|p| p.chapter == current_chapter)
                .cloned()
                .collect();

            let title = self
                .gateway
                .generate_chapter_title(&chapter_passages, self.language)
                .await;

            let next = current_chapter + 1;
            info!(closed = current_chapter, next, titled = title.is_some(), "Chapter closed");

            let next_prompt = self
                .gateway
                .generate_prompt(passages, next, true, genre, style, self.language)
                .await;

            return SegmentTransition {
                chapter: next,
                closed: Some(ClosedChapter {
                    number: current_chapter,
                    title,
                }),
                next_prompt,
            };
        }

        debug!(chapter = current_chapter, "Chapter stays open");
        let next_prompt = self
            .gateway
            .generate_prompt(passages, current_chapter, false, genre, style, self.language)
            .await;

        SegmentTransition {
            chapter: current_chapter,
            closed: None,
            next_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fable_agent::MockBackend;

    fn story(count: usize, chapter: u32) -> Vec<Passage> {
        (0..count)
            .map(|i| Passage::new(format!("Passage {i}."), "a", "Q?", 1, chapter))
            .collect()
    }

    #[tokio::test]
    async fn short_chapter_stays_open() {
        let backend = Arc::new(MockBackend::default().with_response("What happens next?"));
        let segmenter = ChapterSegmenter::new(
            Arc::new(GenerationGateway::new(backend)),
            Language::En,
        );

        let transition = segmenter
            .evaluate(&story(3, 1), 1, Genre::Fantasy, &StyleSettings::default())
            .await;

        assert_eq!(transition.chapter, 1);
        assert!(transition.closed.is_none());
        assert!(transition.next_prompt.contains('?'));
    }

    #[tokio::test]
    async fn confirmed_close_advances_and_titles() {
        let backend = Arc::new(MockBackend::default().with_responses([
            "yes",                      // completeness check
            "Embers",                   // chapter title
            "Where does the road go?",  // new-chapter prompt
        ]));
        let segmenter = ChapterSegmenter::new(
            Arc::new(GenerationGateway::new(backend)),
            Language::En,
        );

        let transition = segmenter
            .evaluate(&story(4, 1), 1, Genre::Fantasy, &StyleSettings::default())
            .await;

        assert_eq!(transition.chapter, 2);
        let closed = transition.closed.unwrap();
        assert_eq!(closed.number, 1);
        assert_eq!(closed.title.as_deref(), Some("Embers"));
    }

    #[tokio::test]
    async fn title_failure_does_not_block_the_transition() {
        // "yes" then a failing title call, then default prompt response
        let backend = Arc::new(
            MockBackend::default()
                .with_responses(["yes", "", "What now?"])
                .with_default("What now?"),
        );
        let segmenter = ChapterSegmenter::new(
            Arc::new(GenerationGateway::new(backend)),
            Language::En,
        );

        let transition = segmenter
            .evaluate(&story(5, 1), 1, Genre::Horror, &StyleSettings::default())
            .await;

        assert_eq!(transition.chapter, 2);
        assert_eq!(transition.closed.unwrap().title, None);
    }
}
