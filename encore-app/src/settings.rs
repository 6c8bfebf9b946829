//! Persistent application settings (JSON file), env overrides and the
//! first-run setup wizard.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use encore_core::{EngineConfig, Lexicon, MatchThresholds, RetryPolicy};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const SETTINGS_FILE_NAME: &str = "settings.json";
const LOCAL_SETTINGS_FILE: &str = "encore.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub access_key: Option<String>,
    pub wake_word: String,
    pub command_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Piper binary and voice model; espeak-ng is used when either is missing.
    pub piper_binary: Option<PathBuf>,
    pub piper_model: Option<PathBuf>,
    /// Run when the media server does not answer at startup.
    pub launch_command: Option<String>,
    pub thresholds: MatchThresholds,
    /// Merged over the built-in lexicon.
    pub lexicon: Option<Lexicon>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 52199,
            access_key: None,
            wake_word: "Alice".into(),
            command_timeout_secs: 5,
            request_timeout_secs: 5,
            retry_attempts: 3,
            retry_backoff_ms: 1000,
            piper_binary: None,
            piper_model: None,
            launch_command: None,
            thresholds: MatchThresholds::default(),
            lexicon: None,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.host = match self.host.trim() {
            "" => "localhost".into(),
            host => host.to_string(),
        };
        if self.port == 0 {
            self.port = 52199;
        }
        self.access_key = trimmed(self.access_key.take());
        self.wake_word = match self.wake_word.trim() {
            "" => "Alice".into(),
            word => word.to_string(),
        };
        self.command_timeout_secs = self.command_timeout_secs.clamp(1, 120);
        self.request_timeout_secs = self.request_timeout_secs.clamp(1, 60);
        self.retry_attempts = self.retry_attempts.clamp(1, 10);
        self.retry_backoff_ms = self.retry_backoff_ms.min(30_000);
        self.launch_command = trimmed(self.launch_command.take());
        self.thresholds.disambiguation_limit = self.thresholds.disambiguation_limit.clamp(1, 10);
    }

    /// Apply `ENCORE_*` environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("ENCORE_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("ENCORE_PORT") {
            match port.trim().parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %port, "ignoring invalid ENCORE_PORT"),
            }
        }
        if let Some(key) = lookup("ENCORE_ACCESS_KEY") {
            self.access_key = Some(key);
        }
        if let Some(word) = lookup("ENCORE_WAKE_WORD") {
            self.wake_word = word;
        }
        if let Some(secs) = lookup("ENCORE_COMMAND_TIMEOUT") {
            match secs.trim().parse() {
                Ok(secs) => self.command_timeout_secs = secs,
                Err(_) => warn!(value = %secs, "ignoring invalid ENCORE_COMMAND_TIMEOUT"),
            }
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}/MCWS/v1/", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut lexicon = Lexicon::default();
        if let Some(extra) = &self.lexicon {
            lexicon.extend(extra);
        }
        EngineConfig {
            wake_word: self.wake_word.to_lowercase(),
            lexicon,
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            thresholds: self.thresholds.clone(),
            ..EngineConfig::default()
        }
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Default settings location inside the platform config directory.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("encore")
        .join(SETTINGS_FILE_NAME)
}

/// Lookup order: explicit path, `./encore.json`, platform config dir.
pub fn resolve_settings_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(LOCAL_SETTINGS_FILE);
    if local.is_file() {
        return local;
    }
    default_settings_path()
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<AppSettings>(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "settings file unreadable; using defaults");
                AppSettings::default()
            }
        },
        Err(_) => AppSettings::default(),
    };
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

/// Prompt for connection details. Returns `false` when the user leaves the
/// access key empty and none is configured yet.
pub fn run_setup_wizard(
    settings: &mut AppSettings,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<bool> {
    writeln!(output, "Encore setup")?;
    writeln!(output, "We need a few details to connect to the media server.")?;
    writeln!(output)?;

    let current_key = settings.access_key.clone().unwrap_or_default();
    match prompt(input, output, "Access key", &current_key)? {
        Some(key) => settings.access_key = Some(key),
        None if current_key.is_empty() => {
            writeln!(output, "An access key is required.")?;
            return Ok(false);
        }
        None => {}
    }

    let current_host = settings.host.clone();
    if let Some(host) = prompt(input, output, "Server address", &current_host)? {
        settings.host = host;
    }

    let current_wake = settings.wake_word.clone();
    if let Some(wake) = prompt(input, output, "Wake word", &current_wake)? {
        settings.wake_word = wake;
    }

    settings.normalize();
    Ok(true)
}

fn prompt(
    input: &mut impl BufRead,
    output: &mut impl Write,
    label: &str,
    current: &str,
) -> io::Result<Option<String>> {
    write!(output, "{label} [{current}]: ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

/// Run the wizard on the terminal and persist the result.
pub fn interactive_setup(path: &Path, settings: &mut AppSettings) -> anyhow::Result<bool> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    if !run_setup_wizard(settings, &mut input, &mut output)? {
        return Ok(false);
    }
    save_settings(path, settings)?;
    info!(path = %path.display(), "settings saved");
    writeln!(output, "Setup complete. Settings are stored in {}", path.display())?;
    Ok(true)
}
