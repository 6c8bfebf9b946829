//! `SimulatedPlayer`: an in-process player over an `InMemoryLibrary`.
//!
//! Keeps a playing-now list and a request log so offline sessions and tests
//! can observe exactly what a real server would have been asked to do.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::control::{NowPlaying, PlaybackControl, VolumeStep};
use crate::error::Result;
use crate::library::{InMemoryLibrary, LibraryEntity, LibrarySearch, SearchQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug)]
struct PlayerState {
    playing_now: Vec<String>,
    position: usize,
    transport: TransportState,
    volume: f32,
    requests: Vec<String>,
}

pub struct SimulatedPlayer {
    library: Arc<InMemoryLibrary>,
    state: Mutex<PlayerState>,
}

const VOLUME_STEP: f32 = 0.1;

impl SimulatedPlayer {
    pub fn new(library: Arc<InMemoryLibrary>) -> Self {
        Self {
            library,
            state: Mutex::new(PlayerState {
                playing_now: Vec::new(),
                position: 0,
                transport: TransportState::Stopped,
                volume: 0.5,
                requests: Vec::new(),
            }),
        }
    }

    /// Every request received, in order (e.g. `"PlayByKey 3,4"`).
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    pub fn playing_now_keys(&self) -> Vec<String> {
        self.state.lock().playing_now.clone()
    }

    pub fn transport(&self) -> TransportState {
        self.state.lock().transport
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn record(&self, request: String, apply: impl FnOnce(&mut PlayerState)) {
        info!(request = %request, "simulated player request");
        let mut state = self.state.lock();
        state.requests.push(request);
        apply(&mut state);
    }
}

impl std::fmt::Debug for SimulatedPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedPlayer").finish_non_exhaustive()
    }
}

impl PlaybackControl for SimulatedPlayer {
    fn play(&self) -> Result<()> {
        self.record("Play".into(), |s| {
            if !s.playing_now.is_empty() {
                s.transport = TransportState::Playing;
            }
        });
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.record("Pause".into(), |s| {
            s.transport = match s.transport {
                TransportState::Playing => TransportState::Paused,
                TransportState::Paused => TransportState::Playing,
                TransportState::Stopped => TransportState::Stopped,
            };
        });
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.record("Stop".into(), |s| s.transport = TransportState::Stopped);
        Ok(())
    }

    fn stop_all(&self) -> Result<()> {
        self.record("StopAll".into(), |s| s.transport = TransportState::Stopped);
        Ok(())
    }

    fn next(&self) -> Result<()> {
        self.record("Next".into(), |s| {
            if s.position + 1 < s.playing_now.len() {
                s.position += 1;
            }
        });
        Ok(())
    }

    fn previous(&self) -> Result<()> {
        self.record("Previous".into(), |s| s.position = s.position.saturating_sub(1));
        Ok(())
    }

    fn adjust_volume(&self, step: VolumeStep) -> Result<()> {
        self.record(format!("Volume {step:?}"), |s| {
            let delta = match step {
                VolumeStep::Up => VOLUME_STEP,
                VolumeStep::Down => -VOLUME_STEP,
            };
            s.volume = (s.volume + delta).clamp(0.0, 1.0);
        });
        Ok(())
    }

    fn set_playlist_position(&self, position: usize) -> Result<()> {
        self.record(format!("SetPlaylistPosition {position}"), |s| {
            if position < s.playing_now.len() {
                s.position = position;
            }
        });
        Ok(())
    }

    fn play_by_keys(&self, keys: &[String]) -> Result<()> {
        self.record(format!("PlayByKey {}", keys.join(",")), |s| {
            s.playing_now = keys.to_vec();
            s.position = 0;
            s.transport = if keys.is_empty() {
                TransportState::Stopped
            } else {
                TransportState::Playing
            };
        });
        Ok(())
    }

    fn play_open_search(&self, seed: &str) -> Result<()> {
        let keys: Vec<String> = self
            .library
            .search(&SearchQuery::Text(seed.to_string()))?
            .iter()
            .filter_map(|e| e.key().map(str::to_string))
            .collect();
        self.record(format!("PlayDoctor {seed}"), |s| {
            s.playing_now = keys;
            s.position = 0;
            if !s.playing_now.is_empty() {
                s.transport = TransportState::Playing;
            }
        });
        Ok(())
    }

    fn now_playing(&self) -> Result<NowPlaying> {
        let state = self.state.lock();
        let current = state
            .playing_now
            .get(state.position)
            .and_then(|key| self.library.by_key(key));
        Ok(NowPlaying {
            name: current.and_then(|e| e.name()).map(str::to_string),
            artist: current.and_then(|e| e.get("Artist")).map(str::to_string),
            album: current.and_then(|e| e.album()).map(str::to_string),
            file_key: state.playing_now.get(state.position).cloned(),
            position: state.position,
            total_tracks: state.playing_now.len(),
        })
    }

    fn playlist(&self) -> Result<Vec<LibraryEntity>> {
        let state = self.state.lock();
        Ok(state
            .playing_now
            .iter()
            .filter_map(|key| self.library.by_key(key).cloned())
            .collect())
    }

    fn file_info(&self, key: &str) -> Result<Option<LibraryEntity>> {
        Ok(self.library.by_key(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> SimulatedPlayer {
        let library = InMemoryLibrary::new(vec![
            LibraryEntity::new()
                .with("Name", "Mars")
                .with("Artist", "LSO")
                .with("Album", "The Planets"),
            LibraryEntity::new()
                .with("Name", "Venus")
                .with("Artist", "LSO")
                .with("Album", "The Planets"),
        ]);
        SimulatedPlayer::new(Arc::new(library))
    }

    #[test]
    fn play_by_keys_replaces_playing_now() {
        let p = player();
        p.play_by_keys(&["2".into(), "1".into()]).expect("play");
        let np = p.now_playing().expect("now playing");
        assert_eq!(np.total_tracks, 2);
        assert_eq!(np.name.as_deref(), Some("Venus"));
        assert_eq!(p.transport(), TransportState::Playing);
        assert_eq!(p.requests(), vec!["PlayByKey 2,1"]);
    }

    #[test]
    fn navigation_stays_within_playing_now() {
        let p = player();
        p.play_by_keys(&["1".into(), "2".into()]).expect("play");
        p.next().expect("next");
        p.next().expect("next");
        assert_eq!(p.now_playing().expect("np").position, 1);
        p.set_playlist_position(5).expect("seek");
        assert_eq!(p.now_playing().expect("np").position, 1);
        p.set_playlist_position(0).expect("seek");
        assert_eq!(p.now_playing().expect("np").name.as_deref(), Some("Mars"));
    }

    #[test]
    fn open_search_queues_matching_files() {
        let p = player();
        p.play_open_search("venus").expect("play doctor");
        assert_eq!(p.playing_now_keys(), vec!["2"]);
    }

    #[test]
    fn volume_is_clamped() {
        let p = player();
        for _ in 0..8 {
            p.adjust_volume(VolumeStep::Up).expect("volume");
        }
        assert!((p.volume() - 1.0).abs() < f32::EPSILON);
    }
}
