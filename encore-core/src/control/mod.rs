//! Playback control abstraction.
//!
//! Every command is fire-and-forget: success means the server accepted the
//! request, not that playback changed. Callers confirm effects by polling
//! `now_playing`.

pub mod simulated;

pub use simulated::SimulatedPlayer;

use crate::error::Result;
use crate::library::LibraryEntity;

/// Relative volume change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeStep {
    Up,
    Down,
}

/// Snapshot of the playing-now list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NowPlaying {
    pub name: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub file_key: Option<String>,
    /// 0-based index into the playing-now list.
    pub position: usize,
    pub total_tracks: usize,
}

impl NowPlaying {
    pub fn is_empty(&self) -> bool {
        self.total_tracks == 0
    }

    /// "Name by Artist", with placeholders for missing metadata.
    pub fn describe(&self) -> String {
        format!(
            "{} by {}",
            self.name.as_deref().unwrap_or("Unknown"),
            self.artist.as_deref().unwrap_or("Unknown")
        )
    }
}

/// Media player operations used by the action executor.
pub trait PlaybackControl: Send + Sync {
    fn play(&self) -> Result<()>;
    fn pause(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
    /// Stop every zone.
    fn stop_all(&self) -> Result<()>;
    fn next(&self) -> Result<()>;
    fn previous(&self) -> Result<()>;
    fn adjust_volume(&self, step: VolumeStep) -> Result<()>;
    /// Seek to a 0-based position in the playing-now list.
    fn set_playlist_position(&self, position: usize) -> Result<()>;
    /// Replace the playing-now list with `keys` in order and start playing.
    fn play_by_keys(&self, keys: &[String]) -> Result<()>;
    /// Start an open-ended, server-curated playlist seeded by free text.
    fn play_open_search(&self, seed: &str) -> Result<()>;
    fn now_playing(&self) -> Result<NowPlaying>;
    fn playlist(&self) -> Result<Vec<LibraryEntity>>;
    /// Full metadata of one file, if the key is known.
    fn file_info(&self, key: &str) -> Result<Option<LibraryEntity>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_fills_missing_metadata() {
        let np = NowPlaying {
            name: Some("Mars".into()),
            total_tracks: 7,
            ..NowPlaying::default()
        };
        assert_eq!(np.describe(), "Mars by Unknown");
        assert!(!np.is_empty());
        assert!(NowPlaying::default().is_empty());
    }
}
