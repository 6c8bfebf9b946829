//! Conversational state: wake word, command-mode window, pending selection.
//!
//! ## States
//!
//! ```text
//!  Listening ──wake word alone──► CommandMode ──several candidates──► WaitingSelection
//!      ▲                              │                                    │
//!      ├──────── deadline passed ─────┘                                    │
//!      └─────────── valid ordinal, "cancel" or "stop" ─────────────────────┘
//! ```
//!
//! A command run straight from `Listening` may also open a selection. A
//! reply naming no candidate re-prompts and keeps the selection open.
//!
//! `Listening` also runs "wake word + command" utterances directly without
//! changing state. The machine is owned by the worker; nothing else mutates
//! the session.

pub mod selection;
pub mod wake;

pub use wake::WakeWordDetector;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::events::SessionStateKind;
use crate::lexicon::Lexicon;
use crate::matching::FieldKind;

/// Source of monotonic time for the command-mode deadline.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic timeout handling.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// What kind of candidates a pending selection holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Field(FieldKind),
    /// Albums matching a named work (symphony, concerto, ...).
    SpecificWork,
}

/// The query that produced a disambiguation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionContext {
    pub anchor: String,
    pub kind: SelectionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Listening,
    CommandMode {
        deadline: Instant,
    },
    /// `candidates` is never empty.
    WaitingSelection {
        candidates: Vec<String>,
        context: SelectionContext,
    },
}

/// The single conversational session of a running assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Listening,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn kind(&self) -> SessionStateKind {
        match self.state {
            SessionState::Listening => SessionStateKind::Listening,
            SessionState::CommandMode { .. } => SessionStateKind::CommandMode,
            SessionState::WaitingSelection { .. } => SessionStateKind::WaitingSelection,
        }
    }

    pub fn pending_candidates(&self) -> &[String] {
        match &self.state {
            SessionState::WaitingSelection { candidates, .. } => candidates,
            _ => &[],
        }
    }

    pub fn command_mode_deadline(&self) -> Option<Instant> {
        match self.state {
            SessionState::CommandMode { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn is_waiting_selection(&self) -> bool {
        matches!(self.state, SessionState::WaitingSelection { .. })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// What the worker should do with one transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// No wake word while listening.
    Ignored,
    /// Bare wake word: acknowledge and wait for a command.
    Acknowledge,
    /// Command body to interpret.
    Command(String),
    /// A pending candidate was chosen.
    Selected {
        value: String,
        context: SelectionContext,
    },
    /// The pending selection was abandoned.
    Cancelled,
    /// The reply named no valid candidate; ask again.
    Reprompt,
}

pub struct SessionMachine {
    session: Session,
    detector: WakeWordDetector,
    lexicon: Arc<Lexicon>,
    timeout: Duration,
    max_candidates: usize,
    clock: Arc<dyn Clock>,
}

impl SessionMachine {
    pub fn new(
        detector: WakeWordDetector,
        lexicon: Arc<Lexicon>,
        timeout: Duration,
        max_candidates: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session: Session::new(),
            detector,
            lexicon,
            timeout,
            max_candidates: max_candidates.max(1),
            clock,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Advance the session with one normalized transcript.
    pub fn accept(&mut self, text: &str) -> Turn {
        let now = self.clock.now();
        let text = text.trim();

        if let SessionState::CommandMode { deadline } = self.session.state {
            if now > deadline {
                info!("command mode timed out");
                self.session.state = SessionState::Listening;
            }
        }

        match self.session.kind() {
            SessionStateKind::Listening => match self.detector.strip(text) {
                None => Turn::Ignored,
                Some("") => {
                    debug!("wake word detected; entering command mode");
                    self.session.state = SessionState::CommandMode {
                        deadline: now + self.timeout,
                    };
                    Turn::Acknowledge
                }
                Some(body) => Turn::Command(body.to_string()),
            },
            SessionStateKind::CommandMode => {
                if text.is_empty() {
                    return Turn::Ignored;
                }
                self.session.state = SessionState::CommandMode {
                    deadline: now + self.timeout,
                };
                match self.detector.strip(text) {
                    Some("") => Turn::Acknowledge,
                    Some(body) => Turn::Command(body.to_string()),
                    None => Turn::Command(text.to_string()),
                }
            }
            SessionStateKind::WaitingSelection => self.accept_selection(text),
        }
    }

    /// Enter `WaitingSelection` with up to `max_candidates` candidates.
    ///
    /// Returns `false` (and leaves the session untouched) when `candidates`
    /// is empty.
    pub fn begin_selection(
        &mut self,
        mut candidates: Vec<String>,
        context: SelectionContext,
    ) -> bool {
        if candidates.is_empty() {
            warn!(anchor = %context.anchor, "refusing to wait on an empty selection");
            return false;
        }
        candidates.truncate(self.max_candidates);
        debug!(count = candidates.len(), anchor = %context.anchor, "waiting for selection");
        self.session.state = SessionState::WaitingSelection {
            candidates,
            context,
        };
        true
    }

    fn accept_selection(&mut self, text: &str) -> Turn {
        let corrected = self.lexicon.correct_pronunciation(text);
        let SessionState::WaitingSelection {
            candidates,
            context,
        } = std::mem::replace(&mut self.session.state, SessionState::Listening)
        else {
            return Turn::Ignored;
        };

        match selection::parse_ordinal(&corrected) {
            Some(idx) if idx < candidates.len() => {
                let value = candidates[idx].clone();
                info!(choice = idx + 1, value = %value, "selection made");
                Turn::Selected { value, context }
            }
            _ if selection::is_cancel(&corrected) => {
                info!("selection cancelled");
                Turn::Cancelled
            }
            _ => {
                debug!(reply = %corrected, "selection reply not understood");
                self.session.state = SessionState::WaitingSelection {
                    candidates,
                    context,
                };
                Turn::Reprompt
            }
        }
    }
}

impl std::fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMachine")
            .field("session", &self.session)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
