//! Transcript feed: one recognized utterance per stdin line.
//!
//! Lines are either plain text or a recognizer result object
//! (`{"text": "alice pause"}`). Partial results and blank transcripts are
//! skipped, as is anything heard while an announcement is playing.

use std::sync::Arc;

use encore_core::{EncoreEngine, EncoreError, InputGate};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct RecognizerResult {
    #[serde(default)]
    text: String,
}

/// Extract the transcript from one feed line.
pub fn parse_line(line: &str) -> Option<String> {
    let line = line.trim();
    let text = if line.starts_with('{') {
        match serde_json::from_str::<RecognizerResult>(line) {
            Ok(result) => result.text,
            Err(e) => {
                warn!(error = %e, "skipping malformed recognizer line");
                return None;
            }
        }
    } else {
        line.to_string()
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedSummary {
    pub submitted: usize,
    /// Sequence number of the last accepted transcript.
    pub last_seq: Option<u64>,
}

/// Feed lines from `reader` into the engine until EOF or the engine stops.
pub async fn run_feed<R>(reader: R, engine: Arc<EncoreEngine>, gate: Arc<InputGate>) -> FeedSummary
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut summary = FeedSummary::default();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("transcript feed closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "transcript feed read failed");
                break;
            }
        };
        let Some(text) = parse_line(&line) else {
            continue;
        };
        if gate.is_suspended() {
            debug!(text = %text, "dropped while speaking");
            continue;
        }
        match engine.submit(&text) {
            Ok(seq) => {
                summary.submitted += 1;
                summary.last_seq = Some(seq);
                debug!(seq, text = %text, "transcript submitted");
            }
            Err(EncoreError::NotRunning) | Err(EncoreError::QueueClosed) => {
                info!("engine no longer accepting transcripts");
                break;
            }
            Err(e) => warn!(error = %e, "transcript rejected"),
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::announce::TranscriptSpeaker;
    use encore_core::control::SimulatedPlayer;
    use encore_core::{Collaborators, EngineConfig, InMemoryLibrary, LibraryEntity};

    #[test]
    fn plain_and_json_lines_are_accepted() {
        assert_eq!(parse_line("  alice pause \n").as_deref(), Some("alice pause"));
        assert_eq!(
            parse_line(r#"{"text": "alice next"}"#).as_deref(),
            Some("alice next")
        );
    }

    #[test]
    fn partials_blanks_and_garbage_are_skipped() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line(r#"{"partial": "ali"}"#), None);
        assert_eq!(parse_line(r#"{"text": ""}"#), None);
        assert_eq!(parse_line("{not json"), None);
    }

    fn engine(gate: Arc<InputGate>) -> Arc<EncoreEngine> {
        let library = Arc::new(InMemoryLibrary::new(vec![LibraryEntity::new()
            .with("Name", "Pigs")
            .with("Artist", "Pink Floyd")
            .with("Album", "Animals")]));
        let collaborators = Collaborators {
            catalog: library.clone(),
            library: library.clone(),
            playback: Arc::new(SimulatedPlayer::new(library)),
            speaker: Arc::new(TranscriptSpeaker::new()),
            gate,
        };
        Arc::new(EncoreEngine::new(EngineConfig::default(), collaborators))
    }

    #[tokio::test]
    async fn feed_submits_until_eof() {
        // The worker's "Yes?" suspends the engine's gate, not the feed's, so
        // no line is dropped here however the two threads interleave.
        let engine = engine(Arc::new(InputGate::new()));
        engine.start().expect("start");

        let feed_gate = Arc::new(InputGate::new());
        let input: &[u8] = b"alice\n{\"partial\": \"pa\"}\n{\"text\": \"pause\"}\n\n";
        let summary = run_feed(input, Arc::clone(&engine), feed_gate).await;
        assert_eq!(summary.submitted, 2);
        assert_eq!(summary.last_seq, Some(1));

        engine.stop().expect("stop");
    }

    #[tokio::test]
    async fn feed_drops_lines_while_speaking() {
        let gate = Arc::new(InputGate::new());
        let engine = engine(Arc::clone(&gate));
        engine.start().expect("start");

        let summary = {
            let _speaking = gate.suspend();
            run_feed(&b"alice pause\n"[..], Arc::clone(&engine), Arc::clone(&gate)).await
        };
        assert_eq!(summary, FeedSummary::default());

        engine.stop().expect("stop");
    }

    #[tokio::test]
    async fn feed_stops_when_engine_is_not_running() {
        let gate = Arc::new(InputGate::new());
        let engine = engine(Arc::clone(&gate));

        let summary = run_feed(&b"alice\nalice pause\n"[..], engine, gate).await;
        assert_eq!(summary.submitted, 0);
    }
}
