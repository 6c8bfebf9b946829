//! The single worker loop.
//!
//! ## Per transcript
//!
//! ```text
//! 1. Dequeue (blocks) → stop when the queue shuts down
//! 2. Normalize
//! 3. SessionMachine::accept → Turn
//! 4. Interpret + execute, or play the chosen candidate
//! 5. Record latency, broadcast a SessionEvent
//! ```
//!
//! Steps 2–4 run inside `catch_unwind`: an error or panic is logged and
//! apologized for, and the loop keeps going. Only a quit ends it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, info_span, warn};

use crate::dispatch::{DispatchQueue, Transcript};
use crate::engine::executor::{ActionExecutor, Outcome};
use crate::engine::metrics::LatencyWindow;
use crate::engine::publish_status;
use crate::error::Result;
use crate::events::{EngineStatus, EngineStatusEvent, SessionEvent};
use crate::interpret::{interpret, Action};
use crate::normalize::normalize;
use crate::session::{SessionMachine, Turn};

const APOLOGY_UNREACHABLE: &str = "I couldn't reach the media server.";
const APOLOGY_GENERIC: &str = "Something went wrong.";
const REPROMPT: &str = "Please say a number like one, two, or three.";

#[derive(Debug, Default)]
pub struct WorkerDiagnostics {
    pub transcripts_in: AtomicUsize,
    pub ignored: AtomicUsize,
    pub commands: AtomicUsize,
    pub selections: AtomicUsize,
    pub action_errors: AtomicUsize,
    pub panics: AtomicUsize,
}

impl WorkerDiagnostics {
    pub fn reset(&self) {
        self.transcripts_in.store(0, Ordering::Relaxed);
        self.ignored.store(0, Ordering::Relaxed);
        self.commands.store(0, Ordering::Relaxed);
        self.selections.store(0, Ordering::Relaxed);
        self.action_errors.store(0, Ordering::Relaxed);
        self.panics.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            transcripts_in: self.transcripts_in.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            selections: self.selections.load(Ordering::Relaxed),
            action_errors: self.action_errors.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub transcripts_in: usize,
    pub ignored: usize,
    pub commands: usize,
    pub selections: usize,
    pub action_errors: usize,
    pub panics: usize,
}

/// Everything the worker owns or shares, moved onto its thread.
pub struct WorkerContext {
    pub machine: SessionMachine,
    pub executor: ActionExecutor,
    pub queue: Arc<DispatchQueue>,
    pub running: Arc<AtomicBool>,
    pub status: Arc<Mutex<EngineStatus>>,
    pub status_tx: broadcast::Sender<EngineStatusEvent>,
    pub session_tx: broadcast::Sender<SessionEvent>,
    pub seq: Arc<AtomicU64>,
    pub diagnostics: Arc<WorkerDiagnostics>,
    pub latency: Arc<Mutex<LatencyWindow>>,
}

/// How one transcript was handled.
struct Handled {
    outcome: &'static str,
    quit: bool,
}

impl Handled {
    fn new(outcome: &'static str) -> Self {
        Self {
            outcome,
            quit: false,
        }
    }
}

/// Run until the queue shuts down or the user quits.
pub fn run(mut ctx: WorkerContext) {
    info!("worker started");

    while let Some(transcript) = ctx.queue.dequeue() {
        if !ctx.running.load(Ordering::SeqCst) {
            break;
        }
        let started = Instant::now();
        let span = info_span!("transcript", seq = transcript.seq);
        let _enter = span.enter();

        let handled = match panic::catch_unwind(AssertUnwindSafe(|| {
            handle_transcript(&mut ctx, &transcript)
        })) {
            Ok(handled) => handled,
            Err(payload) => {
                ctx.diagnostics.panics.fetch_add(1, Ordering::Relaxed);
                error!(panic = %panic_message(payload.as_ref()), "transcript handling panicked");
                // The speaker itself may be what panicked.
                if panic::catch_unwind(AssertUnwindSafe(|| {
                    ctx.executor.announcer().say(APOLOGY_GENERIC)
                }))
                .is_err()
                {
                    warn!("apology after panic also panicked");
                }
                Handled::new("panic")
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        ctx.latency.lock().record(elapsed_ms);
        debug!(
            outcome = handled.outcome,
            elapsed_ms = format_args!("{elapsed_ms:.1}"),
            "transcript handled"
        );
        emit_session_event(&ctx, transcript.seq, handled.outcome);

        if handled.quit {
            info!("quit requested");
            ctx.running.store(false, Ordering::SeqCst);
            ctx.queue.shutdown();
            publish_status(
                &ctx.status,
                &ctx.status_tx,
                EngineStatus::Quit,
                Some("user requested quit".into()),
            );
            break;
        }
    }

    info!("worker stopped");
}

fn handle_transcript(ctx: &mut WorkerContext, transcript: &Transcript) -> Handled {
    ctx.diagnostics
        .transcripts_in
        .fetch_add(1, Ordering::Relaxed);
    let text = normalize(&transcript.text);
    debug!(
        raw = %transcript.text,
        normalized = %text,
        state = ?ctx.machine.session().kind(),
        "transcript received"
    );

    match ctx.machine.accept(&text) {
        Turn::Ignored => {
            ctx.diagnostics.ignored.fetch_add(1, Ordering::Relaxed);
            debug!(text = %text, "ignored: no wake word");
            Handled::new("ignored")
        }
        Turn::Acknowledge => {
            ctx.executor.announcer().say("Yes?");
            Handled::new("acknowledged")
        }
        Turn::Command(body) => {
            let action = interpret(&body, ctx.machine.session());
            debug!(body = %body, action = ?action, "interpreted");
            if action == Action::Unrecognized {
                ctx.diagnostics.ignored.fetch_add(1, Ordering::Relaxed);
                info!(text = %body, "ignored: not a command");
                return Handled::new("unrecognized");
            }
            ctx.diagnostics.commands.fetch_add(1, Ordering::Relaxed);
            let result = ctx.executor.execute(action);
            finish(ctx, result)
        }
        Turn::Selected { value, context } => {
            ctx.diagnostics.selections.fetch_add(1, Ordering::Relaxed);
            let result = ctx.executor.play_selection(&value, &context);
            finish(ctx, result)
        }
        Turn::Cancelled => {
            ctx.executor.announcer().say("Selection cancelled.");
            Handled::new("cancelled")
        }
        Turn::Reprompt => {
            ctx.executor.announcer().say(REPROMPT);
            Handled::new("reprompt")
        }
    }
}

fn finish(ctx: &mut WorkerContext, result: Result<Outcome>) -> Handled {
    match result {
        Ok(Outcome::Done) => Handled::new("command"),
        Ok(Outcome::Disambiguate {
            candidates,
            context,
        }) => {
            if ctx.machine.begin_selection(candidates, context) {
                Handled::new("disambiguate")
            } else {
                Handled::new("command")
            }
        }
        Ok(Outcome::Quit) => Handled {
            outcome: "quit",
            quit: true,
        },
        Err(e) => {
            ctx.diagnostics
                .action_errors
                .fetch_add(1, Ordering::Relaxed);
            if e.is_transient() {
                warn!(error = %e, "media server unreachable; action skipped");
                ctx.executor.announcer().say(APOLOGY_UNREACHABLE);
            } else {
                error!(error = %e, "action failed");
                ctx.executor.announcer().say(APOLOGY_GENERIC);
            }
            Handled::new("error")
        }
    }
}

fn emit_session_event(ctx: &WorkerContext, transcript_seq: u64, outcome: &str) {
    let session = ctx.machine.session();
    let event = SessionEvent {
        seq: ctx.seq.fetch_add(1, Ordering::Relaxed),
        transcript_seq,
        state: session.kind(),
        outcome: outcome.to_string(),
        candidates: session.pending_candidates().to_vec(),
    };
    if ctx.session_tx.send(event).is_err() {
        debug!("no session event subscribers");
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
