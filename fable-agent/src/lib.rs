//! Fable Agent - generation and translation services.
//!
//! Wraps an external text-generation service behind a trait, validates
//! everything it returns, and degrades locally instead of failing:
//!
//! - Trait-based generation backends (OpenAI-compatible HTTP, mock)
//! - [`GenerationGateway`]: prompts, passages, openers, chapter titles,
//!   chapter-completeness verdicts, each with validation and fallback
//! - [`Translator`]: memoized best-effort translation that returns the
//!   original text on any failure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────┐
//! │  GenerationGateway   │   │  Translator  │
//! │  (validate/fallback) │   │  (memo cache)│
//! └──────────┬───────────┘   └──────┬───────┘
//!            └───────┬──────────────┘
//!                    ▼
//!          ┌───────────────────┐
//!          │ GenerationBackend │
//!          │ (OpenAI / Mock)   │
//!          └───────────────────┘
//! ```

pub mod backend;
pub mod fallback;
pub mod gateway;
pub mod refusal;
pub mod translate;

// Re-export main types for convenience
pub use backend::traits::{GenerationBackend, GenerationError, GenerationRequest};
pub use backend::{MockBackend, OpenAiBackend};
pub use gateway::{GeneratedPassage, GenerationGateway, Opener, PassageSource};
pub use translate::Translator;
