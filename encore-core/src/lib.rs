//! # encore-core
//!
//! Voice-command resolution engine for a networked media player.
//!
//! ## Architecture
//!
//! ```text
//! recognizer text ─► EncoreEngine::submit ─► DispatchQueue (wake word flushes stale)
//!                                                  │
//!                                       worker thread (one at a time)
//!                                                  │
//!                        normalize ─► SessionMachine ─► interpret ─► ActionExecutor
//!                                                                        │
//!                                       EntityResolver / GenericResolver ◄┤
//!                                                  │                     │
//!                                       CatalogCache / LibrarySearch   PlaybackControl, Announcer
//! ```
//!
//! The interpreter is pure. Everything that talks to the outside world sits
//! behind a trait (`CatalogSource`, `LibrarySearch`, `PlaybackControl`,
//! `Speaker`) so the engine runs unchanged against a real media server, an
//! in-memory library, or a test double.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod announce;
pub mod catalog;
pub mod control;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod interpret;
pub mod lexicon;
pub mod library;
pub mod matching;
pub mod normalize;
pub mod retry;
pub mod session;

// Convenience re-exports for downstream crates
pub use announce::{Announcer, InputGate, Speaker};
pub use control::{NowPlaying, PlaybackControl, VolumeStep};
pub use engine::{Collaborators, EncoreEngine, EngineConfig};
pub use error::{EncoreError, Result};
pub use events::{EngineStatus, EngineStatusEvent, SessionEvent, SessionStateKind};
pub use lexicon::Lexicon;
pub use library::{CatalogSource, InMemoryLibrary, LibraryEntity, LibrarySearch, SearchQuery};
pub use matching::{FieldKind, MatchThresholds};
pub use retry::{PollPolicy, RetryPolicy};
