//! GenerationGateway - validated story generation with local fallback.
//!
//! Every operation calls the backend with a role-specific instruction,
//! validates the response, and degrades to deterministic local content
//! instead of propagating failures. The only signal a caller gets about
//! degraded quality is the [`PassageSource`] tag.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use narrative::{Genre, Language, Passage, StyleSettings};

use crate::backend::traits::{GenerationBackend, GenerationRequest};
use crate::fallback;
use crate::refusal::is_refusal;

/// How many trailing passages are quoted back to the generator.
const STORY_TAIL: usize = 3;

/// A chapter must hold at least this many passages before the
/// completeness question is even asked.
const MIN_CHAPTER_PASSAGES: usize = 4;

/// Where a generated passage came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassageSource {
    /// Accepted output of the generation service
    Ai,
    /// Deterministic local expansion
    Local,
}

impl PassageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Local => "local",
        }
    }
}

/// A generated passage plus its provenance tag.
#[derive(Debug, Clone)]
pub struct GeneratedPassage {
    pub text: String,
    pub source: PassageSource,
}

/// Title and opening paragraph for a brand-new story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opener {
    pub title: String,
    pub paragraph: String,
}

/// Validated gateway over a generation backend.
pub struct GenerationGateway {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationGateway {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Identifier of the underlying backend.
    pub fn backend_id(&self) -> &str {
        self.backend.id()
    }

    /// Generate the next question to put to the writers.
    ///
    /// Validation: length strictly between 5 and 150 characters, must
    /// contain a question mark, must not read as a refusal. On any
    /// service or validation failure, falls back to a stock question
    /// keyed by language.
    pub async fn generate_prompt(
        &self,
        passages: &[Passage],
        chapter: u32,
        is_new_chapter: bool,
        genre: Genre,
        style: &StyleSettings,
        lang: Language,
    ) -> String {
        let system = format!(
            "You are the narrator of a collaborative {} story, currently in chapter {}. {}{}",
            genre,
            chapter,
            genre.context_line(),
            language_clause(lang),
        );

        let direction = if is_new_chapter {
            "A new chapter is starting. Ask one short question that shifts the setting or picks up a different thread, rather than continuing the last scene."
        } else {
            "Ask one short question that invites the next contribution to the current scene."
        };

        let user = format!(
            "{}\n\n{}\n{}\nReply with the question only.",
            story_tail(passages),
            direction,
            style.pace_hint(),
        );

        match self
            .backend
            .generate(GenerationRequest::new(system, user, 80))
            .await
        {
            Ok(raw) => {
                let question = raw.trim().to_string();
                let len = question.chars().count();
                if len > 5 && len < 150 && question.contains('?') && !is_refusal(&question) {
                    return question;
                }
                warn!(len, "Generated prompt failed validation, using stock question");
            }
            Err(err) => {
                warn!(error = %err, "Prompt generation failed, using stock question");
            }
        }

        fallback::stock_question(passages.len(), lang)
    }

    /// Transform a writer's short answer into story prose.
    ///
    /// Rejects outputs that are empty, shorter than 10 characters,
    /// case-insensitively identical to the raw answer (the service
    /// echoed instead of transforming), or refusal-shaped. On rejection
    /// or service failure, falls back to the deterministic local
    /// expansion - never a hard error.
    #[allow(clippy::too_many_arguments)]
    pub async fn generate_passage(
        &self,
        passages: &[Passage],
        prompt: &str,
        answer: &str,
        style: &StyleSettings,
        chapter: u32,
        genre: Genre,
        lang: Language,
    ) -> GeneratedPassage {
        let system = format!(
            "You are the narrator of a collaborative {} story, currently in chapter {}. {} Transform the writer's answer into prose that continues the story. Do not repeat the answer verbatim.{}\n\nStyle:\n{}",
            genre,
            chapter,
            genre.context_line(),
            language_clause(lang),
            style.directive(),
        );

        let user = format!(
            "{}\n\nThe question asked: {}\nThe writer answered: {}",
            story_tail(passages),
            prompt,
            answer,
        );

        let request = GenerationRequest::new(system, user, style.max_output_tokens());

        match self.backend.generate(request).await {
            Ok(raw) => {
                let text = raw.trim().to_string();
                if accept_passage(&text, answer) {
                    debug!(chars = text.len(), "Accepted generated passage");
                    return GeneratedPassage {
                        text,
                        source: PassageSource::Ai,
                    };
                }
                warn!("Generated passage failed validation, expanding locally");
            }
            Err(err) => {
                warn!(error = %err, "Passage generation failed, expanding locally");
            }
        }

        GeneratedPassage {
            text: fallback::expand_locally(answer, passages.len(), lang),
            source: PassageSource::Local,
        }
    }

    /// Invent a title and opening paragraph for a brand-new story.
    ///
    /// Falls back to a deterministic per-genre opener on any failure.
    pub async fn generate_story_opener(
        &self,
        genre: Genre,
        style: &StyleSettings,
        lang: Language,
    ) -> Opener {
        let system = format!(
            "You begin a collaborative {} story. {}{}\n\nStyle:\n{}",
            genre,
            genre.context_line(),
            language_clause(lang),
            style.directive(),
        );
        let user = "Invent a story title of one to four words and an opening paragraph of two to three sentences. Respond with only a JSON object: {\"title\": \"...\", \"paragraph\": \"...\"}".to_string();

        match self
            .backend
            .generate(GenerationRequest::new(system, user, 300))
            .await
        {
            Ok(raw) => {
                if let Ok(opener) = serde_json::from_str::<Opener>(strip_code_fence(&raw)) {
                    let title = opener.title.trim();
                    let paragraph = opener.paragraph.trim();
                    if !title.is_empty()
                        && paragraph.chars().count() >= 10
                        && !is_refusal(paragraph)
                    {
                        return Opener {
                            title: title.to_string(),
                            paragraph: paragraph.to_string(),
                        };
                    }
                }
                warn!("Opener response unusable, using local opener");
            }
            Err(err) => {
                warn!(error = %err, "Opener generation failed, using local opener");
            }
        }

        fallback::local_opener(genre, lang)
    }

    /// Title a completed chapter.
    ///
    /// Returns `None` on any failure; callers treat that as "chapter
    /// remains untitled", never as an error. The anti-formula rule is
    /// an instruction to the generator only - the shape of the result
    /// is not re-validated.
    pub async fn generate_chapter_title(
        &self,
        chapter_passages: &[Passage],
        lang: Language,
    ) -> Option<String> {
        if chapter_passages.is_empty() {
            return None;
        }

        let system = format!(
            "You title chapters of a collaborative story.{} Reply with only the title, one to five words. Avoid formulaic titles shaped like \"The <adjective> <noun>\".",
            language_clause(lang),
        );
        let user = chapter_text(chapter_passages);

        match self
            .backend
            .generate(GenerationRequest::new(system, user, 30))
            .await
        {
            Ok(raw) => {
                let title = raw.trim().trim_matches('"').trim().to_string();
                if title.is_empty() || is_refusal(&title) {
                    warn!("Chapter title response unusable, leaving untitled");
                    return None;
                }
                Some(title)
            }
            Err(err) => {
                warn!(error = %err, "Chapter title generation failed, leaving untitled");
                None
            }
        }
    }

    /// Ask whether the current chapter has reached a natural close.
    ///
    /// Hard gate: always `false` while the chapter holds fewer than
    /// four passages, regardless of content. Otherwise only an answer
    /// prefixed "yes" ends the chapter; failure means "not yet".
    pub async fn should_end_chapter(&self, passages: &[Passage], current_chapter: u32) -> bool {
        let chapter_passages: Vec<&Passage> = passages
            .iter()
            .filter(|p| p.chapter == current_chapter)
            .collect();

        if chapter_passages.len() < MIN_CHAPTER_PASSAGES {
            return false;
        }

        let system = "You judge narrative structure. Given the text of one chapter of a collaborative story, answer strictly \"yes\" or \"no\": has this chapter reached a natural narrative close?".to_string();
        let user = chapter_passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        match self
            .backend
            .generate(GenerationRequest::new(system, user, 10))
            .await
        {
            Ok(raw) => raw.trim().to_lowercase().starts_with("yes"),
            Err(err) => {
                warn!(error = %err, "Chapter-end check failed, keeping chapter open");
                false
            }
        }
    }
}

/// Trailing story context quoted back to the generator.
fn story_tail(passages: &[Passage]) -> String {
    if passages.is_empty() {
        return "The story has not started yet.".to_string();
    }
    let tail: Vec<&str> = passages
        .iter()
        .rev()
        .take(STORY_TAIL)
        .map(|p| p.text.as_str())
        .collect();
    let mut context = String::from("The story so far (most recent last):\n");
    for text in tail.iter().rev() {
        context.push_str(text);
        context.push('\n');
    }
    context
}

fn chapter_text(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn language_clause(lang: Language) -> &'static str {
    match lang {
        Language::En => "",
        Language::Es => " Respond in Spanish.",
    }
}

fn accept_passage(text: &str, answer: &str) -> bool {
    !text.is_empty()
        && text.chars().count() >= 10
        && !text.eq_ignore_ascii_case(answer.trim())
        && !is_refusal(text)
}

/// Strip a Markdown code fence if the model wrapped its JSON in one.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}
