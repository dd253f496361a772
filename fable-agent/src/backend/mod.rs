//! Generation backend abstraction layer.
//!
//! A backend is the raw external text-generation service: one system
//! instruction, one user message, one text response. All validation and
//! fallback policy lives above this layer, in the gateway.

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::MockBackend;
pub use openai::OpenAiBackend;
pub use traits::{GenerationBackend, GenerationError, GenerationRequest};
