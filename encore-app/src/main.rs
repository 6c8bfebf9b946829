//! Encore voice assistant entry point.
//!
//! ## Runtime note
//!
//! The engine worker and the MCWS adapter are synchronous (the adapter uses
//! `reqwest::blocking`, which must not run inside an async context). Setup
//! and teardown therefore happen on the main thread; Tokio only drives the
//! transcript feed, ctrl-c and the status watch.

mod feed;
mod mcws;
mod settings;
mod speech;

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use encore_core::{
    control::SimulatedPlayer, Collaborators, EncoreEngine, EngineStatus, InMemoryLibrary,
    InputGate, PollPolicy, Speaker,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use feed::run_feed;
use mcws::{McwsClient, McwsConfig};
use settings::{interactive_setup, load_settings, resolve_settings_path, AppSettings};
use speech::{ConsoleSpeaker, PiperSpeaker};

/// How long to wait for a freshly launched media server.
const LAUNCH_WAIT: PollPolicy = PollPolicy {
    attempts: 15,
    interval: Duration::from_secs(1),
};

#[derive(Debug, Parser)]
#[command(name = "encore", version, about = "Voice control for a networked media player")]
struct Cli {
    /// Settings file (default: ./encore.json, then the platform config dir).
    #[arg(long, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the wake word for this run.
    #[arg(long)]
    wake_word: Option<String>,

    /// Run against a JSON track list with a simulated player.
    #[arg(long, value_name = "TRACKS_JSON")]
    offline: Option<PathBuf>,

    /// Print announcements instead of speaking them.
    #[arg(long)]
    silent: bool,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Ask for connection details and save them.
    Setup,
}

/// Why the run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Quit,
    Interrupted,
    InputClosed,
    EngineGone,
}

fn main() -> anyhow::Result<()> {
    // ── Tracing ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("encore=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // ── Settings ─────────────────────────────────────────────────────────────
    let settings_path = resolve_settings_path(cli.config.as_deref());
    let mut settings = load_settings(&settings_path);
    settings.apply_env_overrides();
    if let Some(wake_word) = &cli.wake_word {
        settings.wake_word = wake_word.clone();
    }
    settings.normalize();
    info!(path = %settings_path.display(), "settings loaded");

    if matches!(cli.command, Some(CliCommand::Setup)) {
        interactive_setup(&settings_path, &mut settings)?;
        return Ok(());
    }

    // ── Collaborators ────────────────────────────────────────────────────────
    let gate = Arc::new(InputGate::new());
    let speaker: Arc<dyn Speaker> = if cli.silent {
        Arc::new(ConsoleSpeaker)
    } else {
        Arc::new(PiperSpeaker::new(
            settings.piper_binary.as_deref(),
            settings.piper_model.as_deref(),
        ))
    };

    let collaborators = match &cli.offline {
        Some(tracks) => {
            let library = Arc::new(
                InMemoryLibrary::from_json_file(tracks)
                    .with_context(|| format!("loading track list {}", tracks.display()))?,
            );
            info!(tracks = library.entities().len(), "offline mode");
            Collaborators {
                catalog: library.clone(),
                library: library.clone(),
                playback: Arc::new(SimulatedPlayer::new(library)),
                speaker,
                gate: Arc::clone(&gate),
            }
        }
        None => {
            if settings.access_key.is_none() {
                info!("no access key configured; starting setup");
                if !interactive_setup(&settings_path, &mut settings)? {
                    bail!("an access key is required; run `encore setup`");
                }
            }
            let client = Arc::new(connect(&settings)?);
            Collaborators {
                catalog: client.clone(),
                library: client.clone(),
                playback: client,
                speaker,
                gate: Arc::clone(&gate),
            }
        }
    };

    // ── Engine ───────────────────────────────────────────────────────────────
    let engine = Arc::new(EncoreEngine::new(settings.engine_config(), collaborators));
    engine.start()?;
    info!(
        wake_word = %settings.wake_word,
        "listening for transcripts on stdin"
    );
    engine.announce("I am ready.");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let exit = runtime.block_on(serve(Arc::clone(&engine), gate));
    // Stdin reads park a blocking thread; don't wait on it.
    runtime.shutdown_timeout(Duration::from_millis(200));
    info!(reason = ?exit, "shutting down");

    if engine.is_running() {
        engine.stop()?;
    }
    match serde_json::to_string(&engine.diagnostics_snapshot()) {
        Ok(json) => info!(diagnostics = %json, "session diagnostics"),
        Err(e) => warn!(error = %e, "diagnostics serialization failed"),
    }
    match serde_json::to_string(&engine.latency_snapshot()) {
        Ok(json) => info!(latency = %json, "transcript latency"),
        Err(e) => warn!(error = %e, "latency serialization failed"),
    }
    Ok(())
}

/// Build the MCWS client and make sure the server answers, launching it if
/// configured to.
fn connect(settings: &AppSettings) -> anyhow::Result<McwsClient> {
    let client = McwsClient::new(McwsConfig {
        base_url: settings.base_url(),
        access_key: settings.access_key.clone(),
        timeout: settings.request_timeout(),
        retry: settings.retry_policy(),
    })?;

    if client.alive() {
        info!(url = %settings.base_url(), "media server is running");
        return Ok(client);
    }

    let Some(launch) = &settings.launch_command else {
        warn!(url = %settings.base_url(), "media server is not answering; continuing");
        return Ok(client);
    };
    warn!(command = %launch, "media server is not answering; launching");
    match Command::new("sh")
        .arg("-c")
        .arg(launch)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(_) => {
            if LAUNCH_WAIT.until("media server startup", || client.alive().then_some(())).is_some() {
                info!("media server is running");
            } else {
                warn!("media server still not answering; continuing");
            }
        }
        Err(e) => warn!(error = %e, "could not launch the media server; start it manually"),
    }
    Ok(client)
}

/// Drive the stdin feed until quit, ctrl-c, or end of input.
///
/// At end of input the loop waits for the last submitted transcript to be
/// handled so piped scripts run to completion.
async fn serve(engine: Arc<EncoreEngine>, gate: Arc<InputGate>) -> Exit {
    let mut status = engine.subscribe_status();
    let mut sessions = engine.subscribe_session();
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    let feed = run_feed(stdin, Arc::clone(&engine), gate);
    tokio::pin!(feed);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut handled: Option<u64> = None;
    let mut awaiting: Option<u64> = None;
    let mut feed_done = false;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => return Exit::Interrupted,
            summary = &mut feed, if !feed_done => {
                feed_done = true;
                info!(submitted = summary.submitted, "transcript feed finished");
                match summary.last_seq {
                    Some(last) if handled < Some(last) && engine.is_running() => {
                        awaiting = Some(last);
                    }
                    _ => return Exit::InputClosed,
                }
            }
            event = sessions.recv() => match event {
                Ok(event) => {
                    info!(
                        outcome = %event.outcome,
                        state = ?event.state,
                        candidates = event.candidates.len(),
                        "transcript handled"
                    );
                    handled = Some(event.transcript_seq);
                    if awaiting.is_some_and(|last| event.transcript_seq >= last) {
                        return Exit::InputClosed;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "session events lagged"),
                Err(RecvError::Closed) => return Exit::EngineGone,
            },
            event = status.recv() => match event {
                Ok(event) if event.status == EngineStatus::Quit => return Exit::Quit,
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Exit::EngineGone,
            },
        }
    }
}
