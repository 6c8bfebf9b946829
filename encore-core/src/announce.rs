//! Spoken feedback and the input gate.
//!
//! While the assistant speaks, the microphone hears it. `Announcer` closes
//! the `InputGate` for the duration of every announcement; the recognition
//! flow drops transcripts captured while the gate is closed. The gate is
//! reopened by a guard, so a failing or panicking speaker cannot leave input
//! suspended.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Speech synthesis backend. Blocks until playback of `text` finishes.
pub trait Speaker: Send + Sync {
    /// # Errors
    /// `EncoreError::Announce` when no synthesis path worked.
    fn speak(&self, text: &str) -> Result<()>;
}

/// Suspends live input while announcements play.
///
/// Suspensions nest: input resumes when the last guard drops.
#[derive(Debug, Default)]
pub struct InputGate {
    suspensions: AtomicUsize,
}

impl InputGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspensions.load(Ordering::SeqCst) > 0
    }

    /// Suspend input until the returned guard drops.
    pub fn suspend(&self) -> InputSuspension<'_> {
        self.suspensions.fetch_add(1, Ordering::SeqCst);
        InputSuspension { gate: self }
    }
}

/// Guard returned by `InputGate::suspend`.
#[must_use = "input resumes as soon as the suspension is dropped"]
pub struct InputSuspension<'a> {
    gate: &'a InputGate,
}

impl Drop for InputSuspension<'_> {
    fn drop(&mut self) {
        self.gate.suspensions.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Speaks through a `Speaker` with input suspended.
#[derive(Clone)]
pub struct Announcer {
    speaker: Arc<dyn Speaker>,
    gate: Arc<InputGate>,
}

impl Announcer {
    pub fn new(speaker: Arc<dyn Speaker>, gate: Arc<InputGate>) -> Self {
        Self { speaker, gate }
    }

    pub fn gate(&self) -> &Arc<InputGate> {
        &self.gate
    }

    /// Speak `text`. Failures are logged, never propagated.
    pub fn say(&self, text: &str) {
        info!(text, "announce");
        let _suspended = self.gate.suspend();
        if let Err(e) = self.speaker.speak(text) {
            warn!(error = %e, "announcement failed");
        }
        debug!("announcement finished; input resumes");
    }
}

impl std::fmt::Debug for Announcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Announcer")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

/// A `Speaker` that only records what it was asked to say.
#[derive(Debug, Default)]
pub struct TranscriptSpeaker {
    spoken: Mutex<Vec<String>>,
}

impl TranscriptSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

impl Speaker for TranscriptSpeaker {
    fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().push(text.to_string());
        Ok(())
    }
}
