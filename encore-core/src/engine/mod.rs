//! `EncoreEngine`: top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! EncoreEngine::new()
//!     └─► start()          → fresh session + queue, worker spawned, status = Running
//!         └─► submit(text)* → transcripts queued for the worker
//!             └─► stop()   → queue shut down, worker joined, status = Stopped
//! ```
//!
//! Saying "quit" ends the worker on its own; the engine then reports
//! `EngineStatus::Quit` and the application decides how to exit.
//!
//! `start()`/`stop()` return an error in the wrong state rather than
//! panicking.
//!
//! ## Threading
//!
//! The worker is a plain OS thread: every action is synchronous and may
//! block on bounded polling, so it must not occupy an async executor.
//! `submit()` never blocks and may be called from any thread.

pub mod executor;
pub mod metrics;
pub mod worker;

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    announce::{Announcer, InputGate, Speaker},
    catalog::CatalogCache,
    control::PlaybackControl,
    dispatch::DispatchQueue,
    error::{EncoreError, Result},
    events::{EngineStatus, EngineStatusEvent, SessionEvent},
    lexicon::Lexicon,
    library::{CatalogSource, LibrarySearch},
    matching::{EntityResolver, MatchThresholds},
    normalize::normalize,
    retry::PollPolicy,
    session::{Clock, SessionMachine, SystemClock, WakeWordDetector},
};

use executor::ActionExecutor;
use metrics::{LatencySnapshot, LatencyWindow};
use worker::{DiagnosticsSnapshot, WorkerContext, WorkerDiagnostics};

/// Broadcast channel capacity: events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// Configuration for `EncoreEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Spoken word that opens a command. Default: "alice".
    pub wake_word: String,
    pub lexicon: Lexicon,
    /// How long command mode stays open after the last command. Default: 5 s.
    pub command_timeout: Duration,
    pub thresholds: MatchThresholds,
    /// Confirmation polling after playback requests.
    pub poll: PollPolicy,
    /// Pause after next/previous before reading the new track. Default: 500 ms.
    pub settle_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wake_word: "alice".into(),
            lexicon: Lexicon::default(),
            command_timeout: Duration::from_secs(5),
            thresholds: MatchThresholds::default(),
            poll: PollPolicy::default(),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// External services the engine drives.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogSource>,
    pub library: Arc<dyn LibrarySearch>,
    pub playback: Arc<dyn PlaybackControl>,
    pub speaker: Arc<dyn Speaker>,
    /// Shared with the recognition flow, which drops input while suspended.
    pub gate: Arc<InputGate>,
}

/// The top-level engine handle.
///
/// `EncoreEngine` is `Send + Sync`; share it behind an `Arc`.
pub struct EncoreEngine {
    config: EngineConfig,
    collaborators: Collaborators,
    lexicon: Arc<Lexicon>,
    detector: WakeWordDetector,
    /// Catalogs live for the engine's lifetime, across restarts.
    catalogs: Arc<CatalogCache>,
    announcer: Announcer,
    clock: Arc<dyn Clock>,
    /// `true` while the worker accepts transcripts.
    running: Arc<AtomicBool>,
    status: Arc<Mutex<EngineStatus>>,
    status_tx: broadcast::Sender<EngineStatusEvent>,
    session_tx: broadcast::Sender<SessionEvent>,
    /// Monotonically increasing session event sequence counter.
    seq: Arc<AtomicU64>,
    diagnostics: Arc<WorkerDiagnostics>,
    latency: Arc<Mutex<LatencyWindow>>,
    queue: Mutex<Option<Arc<DispatchQueue>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EncoreEngine {
    /// Create a new engine. Nothing runs until `start()`.
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (session_tx, _) = broadcast::channel(BROADCAST_CAP);
        let lexicon = Arc::new(config.lexicon.clone());
        let detector = WakeWordDetector::new(&config.wake_word, &lexicon.wake_word_aliases);
        let catalogs = Arc::new(CatalogCache::new(Arc::clone(&collaborators.catalog)));
        let announcer = Announcer::new(
            Arc::clone(&collaborators.speaker),
            Arc::clone(&collaborators.gate),
        );

        Self {
            config,
            collaborators,
            lexicon,
            detector,
            catalogs,
            announcer,
            clock: Arc::new(SystemClock),
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(EngineStatus::Idle)),
            status_tx,
            session_tx,
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::new(WorkerDiagnostics::default()),
            latency: Arc::new(Mutex::new(LatencyWindow::default())),
            queue: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Replace the clock used for the command-mode deadline.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Start a fresh session and spawn the worker thread.
    ///
    /// # Errors
    /// - `EncoreError::AlreadyRunning` if already started.
    /// - `EncoreError::Io` if the thread cannot be spawned.
    pub fn start(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(EncoreError::AlreadyRunning);
        }

        self.diagnostics.reset();
        let queue = Arc::new(DispatchQueue::new());
        let ctx = WorkerContext {
            machine: SessionMachine::new(
                self.detector.clone(),
                Arc::clone(&self.lexicon),
                self.config.command_timeout,
                self.config.thresholds.disambiguation_limit,
                Arc::clone(&self.clock),
            ),
            executor: ActionExecutor::new(
                EntityResolver::new(self.config.thresholds.clone(), Arc::clone(&self.lexicon)),
                Arc::clone(&self.catalogs),
                Arc::clone(&self.collaborators.library),
                Arc::clone(&self.collaborators.playback),
                self.announcer.clone(),
                self.config.poll,
                self.config.settle_delay,
            ),
            queue: Arc::clone(&queue),
            running: Arc::clone(&self.running),
            status: Arc::clone(&self.status),
            status_tx: self.status_tx.clone(),
            session_tx: self.session_tx.clone(),
            seq: Arc::clone(&self.seq),
            diagnostics: Arc::clone(&self.diagnostics),
            latency: Arc::clone(&self.latency),
        };

        self.running.store(true, Ordering::SeqCst);
        let handle = match std::thread::Builder::new()
            .name("encore-worker".into())
            .spawn(move || worker::run(ctx))
        {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        *self.queue.lock() = Some(queue);
        *self.worker.lock() = Some(handle);
        self.set_status(EngineStatus::Running, None);
        info!(wake_word = self.detector.wake_word(), "engine started");
        Ok(())
    }

    /// Stop the worker after its current transcript. Queued transcripts are
    /// dropped.
    ///
    /// # Errors
    /// - `EncoreError::NotRunning` if not currently running.
    pub fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(EncoreError::NotRunning);
        }

        if let Some(queue) = self.queue.lock().take() {
            queue.shutdown();
        }
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
        self.set_status(EngineStatus::Stopped, None);
        info!("engine stopped");
        Ok(())
    }

    /// Queue one recognized transcript. Returns its sequence number.
    ///
    /// A transcript that starts with the wake word discards everything still
    /// waiting in the queue.
    ///
    /// # Errors
    /// - `EncoreError::NotRunning` before `start()` or after stop/quit.
    pub fn submit(&self, text: &str) -> Result<u64> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(EncoreError::NotRunning);
        }
        let queue = self
            .queue
            .lock()
            .clone()
            .ok_or(EncoreError::NotRunning)?;

        if self.detector.detects(&normalize(text)) {
            let (seq, dropped) = queue.enqueue_fresh(text).ok_or(EncoreError::QueueClosed)?;
            debug!(seq, dropped, "wake-word transcript queued");
            Ok(seq)
        } else {
            let seq = queue.enqueue(text).ok_or(EncoreError::QueueClosed)?;
            debug!(seq, "transcript queued");
            Ok(seq)
        }
    }

    /// Speak outside the worker (e.g. a startup greeting).
    pub fn announce(&self, text: &str) {
        self.announcer.say(text);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current engine status (snapshot).
    pub fn status(&self) -> EngineStatus {
        *self.status.lock()
    }

    /// Subscribe to live status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<EngineStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Subscribe to one event per handled transcript.
    pub fn subscribe_session(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_tx.subscribe()
    }

    /// Snapshot of worker counters for observability.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Transcript handling latency over the recent window.
    pub fn latency_snapshot(&self) -> LatencySnapshot {
        self.latency.lock().snapshot()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn set_status(&self, new_status: EngineStatus, detail: Option<String>) {
        publish_status(&self.status, &self.status_tx, new_status, detail);
    }
}

impl Drop for EncoreEngine {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.lock().take() {
            queue.shutdown();
        }
    }
}

pub(crate) fn publish_status(
    status: &Mutex<EngineStatus>,
    tx: &broadcast::Sender<EngineStatusEvent>,
    new_status: EngineStatus,
    detail: Option<String>,
) {
    *status.lock() = new_status;
    let _ = tx.send(EngineStatusEvent {
        status: new_status,
        detail,
    });
}
