//! Spoken output: Piper piped into `aplay`, falling back to `espeak-ng`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use encore_core::{EncoreError, Result, Speaker};
use tracing::{debug, info, warn};

const DEFAULT_VOICE: &str = "en_GB-cori-high.onnx";
/// Piper voices emit 16-bit mono PCM at this rate.
const PIPER_SAMPLE_RATE: &str = "22050";

/// Neural voice through Piper when installed, otherwise espeak-ng.
#[derive(Debug, Clone)]
pub struct PiperSpeaker {
    piper: Option<(PathBuf, PathBuf)>,
}

impl PiperSpeaker {
    /// Use the given binary and model, or the defaults under the platform
    /// data directory. Piper is skipped unless both files exist.
    pub fn new(binary: Option<&Path>, model: Option<&Path>) -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("encore");
        let binary = binary
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base.join("piper").join("piper"));
        let model = model
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base.join("voices").join(DEFAULT_VOICE));

        let piper = if binary.is_file() && model.is_file() {
            info!(binary = %binary.display(), model = %model.display(), "using Piper voice");
            Some((binary, model))
        } else {
            info!("Piper voice not installed; using espeak-ng");
            None
        };
        Self { piper }
    }

    fn speak_piper(binary: &Path, model: &Path, text: &str) -> std::io::Result<()> {
        let mut piper = Command::new(binary)
            .arg("--model")
            .arg(model)
            .arg("--output-raw")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let audio = piper
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("piper stdout unavailable"))?;
        let mut aplay = match Command::new("aplay")
            .args(["-r", PIPER_SAMPLE_RATE, "-f", "S16_LE", "-t", "raw", "-q"])
            .stdin(Stdio::from(audio))
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                let _ = piper.kill();
                let _ = piper.wait();
                return Err(e);
            }
        };

        if let Some(mut stdin) = piper.stdin.take() {
            writeln!(stdin, "{text}")?;
        }
        let piper_status = piper.wait()?;
        let aplay_status = aplay.wait()?;
        if !piper_status.success() || !aplay_status.success() {
            return Err(std::io::Error::other(format!(
                "piper exited with {piper_status}, aplay with {aplay_status}"
            )));
        }
        Ok(())
    }

    fn speak_espeak(text: &str) -> std::io::Result<()> {
        let status = Command::new("espeak-ng")
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if !status.success() {
            return Err(std::io::Error::other(format!("espeak-ng exited with {status}")));
        }
        Ok(())
    }
}

impl Speaker for PiperSpeaker {
    fn speak(&self, text: &str) -> Result<()> {
        debug!(text, "speaking");
        if let Some((binary, model)) = &self.piper {
            match Self::speak_piper(binary, model, text) {
                Ok(()) => return Ok(()),
                Err(e) => warn!(error = %e, "Piper playback failed; falling back to espeak-ng"),
            }
        }
        Self::speak_espeak(text).map_err(|e| EncoreError::Announce(format!("espeak-ng: {e}")))
    }
}

/// Prints announcements instead of speaking them (`--silent`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSpeaker;

impl Speaker for ConsoleSpeaker {
    fn speak(&self, text: &str) -> Result<()> {
        println!("encore: {text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piper_is_skipped_when_files_are_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let speaker = PiperSpeaker::new(
            Some(&dir.path().join("piper")),
            Some(&dir.path().join("voice.onnx")),
        );
        assert!(speaker.piper.is_none());
    }

    #[test]
    fn piper_is_selected_when_both_files_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let binary = dir.path().join("piper");
        let model = dir.path().join("voice.onnx");
        std::fs::write(&binary, b"").expect("binary");
        std::fs::write(&model, b"").expect("model");

        let speaker = PiperSpeaker::new(Some(&binary), Some(&model));
        assert_eq!(speaker.piper, Some((binary, model)));
    }

    #[test]
    fn console_speaker_never_fails() {
        assert!(ConsoleSpeaker.speak("I am ready.").is_ok());
    }
}
