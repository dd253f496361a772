//! Fable Sync - the synchronization and consistency core.
//!
//! Many independent, unauthenticated clients append to a shared,
//! ever-growing story held in an external key-value store with no
//! cross-key transactions. This crate is the part with real
//! invariants:
//!
//! - **AppendCoordinator**: optimistic concurrency control - read the
//!   passage list fresh immediately before writing, append to that,
//!   accept the residual last-writer-wins window
//! - **ChapterSegmenter**: decides when a chapter closes and the next
//!   opens
//! - **TranslationOverlayPatcher**: attaches the Spanish mirror to
//!   already-committed content after the writer is unblocked
//! - **ConvergencePoller**: periodic canonical re-read so a stale
//!   client view self-heals; there is no push channel
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      AppSession                      │
//! │                                                      │
//! │  ┌───────────────────┐      ┌──────────────────┐    │
//! │  │ AppendCoordinator │──────│ ChapterSegmenter │    │
//! │  └─────────┬─────────┘      └──────────────────┘    │
//! │            │ commit                                  │
//! │            ▼                                         │
//! │  ┌───────────────────┐      ┌──────────────────┐    │
//! │  │  StoryRepository  │◄─────│ OverlayPatcher / │    │
//! │  └─────────┬─────────┘      │ ConvergencePoller│    │
//! │            ▼                └──────────────────┘    │
//! │      ┌───────────┐                                  │
//! │      │RecordStore│  (per-key atomic, no CAS)        │
//! │      └───────────┘                                  │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod coordinator;
pub mod error;
pub mod overlay;
pub mod poller;
pub mod repository;
pub mod segmenter;
pub mod session;
pub mod store;

// Re-export main types
pub use coordinator::{AppendCoordinator, CommitOutcome, PassageDraft};
pub use error::{StoreError, SyncError};
pub use overlay::{PatchKind, PatchOutcome, TranslationOverlayPatcher};
pub use poller::{ConvergencePoller, StoryView};
pub use repository::{StoryRepository, StorySnapshot};
pub use segmenter::{ChapterSegmenter, ClosedChapter, SegmentTransition};
pub use session::{AppSession, AppendResult, BackendSettings, SessionConfig};
pub use store::{MemoryStore, RecordStore};
