//! Carries out interpreted actions against the collaborators.
//!
//! Everything here runs synchronously on the worker thread. Server requests
//! are fire-and-forget, so effects that matter (a new playing-now list, a new
//! position) are confirmed with the bounded `PollPolicy`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::announce::Announcer;
use crate::catalog::CatalogCache;
use crate::control::{NowPlaying, PlaybackControl, VolumeStep};
use crate::error::{EncoreError, Result};
use crate::interpret::generic::{is_specific_work, GenericResolver, Resolution};
use crate::interpret::{bare_number, Action, ControlKind, SearchTarget};
use crate::library::{LibraryEntity, LibrarySearch, SearchQuery, FIELD_TRACK};
use crate::matching::{EntityResolver, FieldKind};
use crate::retry::PollPolicy;
use crate::session::{SelectionContext, SelectionKind};

/// Playlist entries written to the log by "list tracks".
const PLAYLIST_LOG_LIMIT: usize = 20;

const HELP_TEXT: &str =
    "You can say play followed by an artist or album, stop, next, quit, or what's playing.";

/// What the worker must do after an action completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The prompt has been spoken; wait for an ordinal reply.
    Disambiguate {
        candidates: Vec<String>,
        context: SelectionContext,
    },
    Quit,
}

pub struct ActionExecutor {
    resolver: EntityResolver,
    catalogs: Arc<CatalogCache>,
    library: Arc<dyn LibrarySearch>,
    playback: Arc<dyn PlaybackControl>,
    announcer: Announcer,
    poll: PollPolicy,
    settle_delay: Duration,
}

impl ActionExecutor {
    pub fn new(
        resolver: EntityResolver,
        catalogs: Arc<CatalogCache>,
        library: Arc<dyn LibrarySearch>,
        playback: Arc<dyn PlaybackControl>,
        announcer: Announcer,
        poll: PollPolicy,
        settle_delay: Duration,
    ) -> Self {
        Self {
            resolver,
            catalogs,
            library,
            playback,
            announcer,
            poll,
            settle_delay,
        }
    }

    pub fn announcer(&self) -> &Announcer {
        &self.announcer
    }

    /// Carry out one action.
    ///
    /// # Errors
    /// Collaborator failures that were not recovered locally.
    pub fn execute(&self, action: Action) -> Result<Outcome> {
        match action {
            Action::PlaybackControl(kind) => self.control(kind),
            Action::TrackJump(n) => self.go_to_track(n).map(|()| Outcome::Done),
            Action::EntitySearch { term, target } => match target {
                SearchTarget::Artist => self.search_artist(&term),
                SearchTarget::Album => self.search_album(&term),
                SearchTarget::Generic => self.search_generic(&term),
            },
            Action::SelectionReply(text) => {
                debug!(text = %text, "selection reply outside a selection; ignoring");
                Ok(Outcome::Done)
            }
            Action::Unrecognized => Ok(Outcome::Done),
        }
    }

    /// Play the candidate chosen from a disambiguation prompt.
    ///
    /// # Errors
    /// Collaborator failures during playback.
    pub fn play_selection(&self, album: &str, context: &SelectionContext) -> Result<Outcome> {
        if context.kind == SelectionKind::SpecificWork {
            self.announcer.say(&format!("Playing {album}"));
        }
        self.play_album(album)
    }

    // ── Playback control ─────────────────────────────────────────────────────

    fn control(&self, kind: ControlKind) -> Result<Outcome> {
        match kind {
            ControlKind::Quit => {
                if let Err(e) = self.playback.stop() {
                    warn!(error = %e, "stop before quit failed");
                }
                self.announcer.say("Goodbye.");
                return Ok(Outcome::Quit);
            }
            ControlKind::Pause => self.playback.pause()?,
            ControlKind::Stop => self.playback.stop()?,
            ControlKind::StopAll => {
                self.playback.stop_all()?;
                self.announcer.say("Stopping all playback.");
            }
            ControlKind::Resume => self.playback.play()?,
            ControlKind::Next => {
                self.playback.next()?;
                self.settle();
                self.log_now_playing();
            }
            ControlKind::Previous => {
                self.playback.previous()?;
                self.settle();
                self.log_now_playing();
            }
            ControlKind::VolumeUp => self.playback.adjust_volume(VolumeStep::Up)?,
            ControlKind::VolumeDown => self.playback.adjust_volume(VolumeStep::Down)?,
            ControlKind::WhatsPlaying => self.whats_playing()?,
            ControlKind::ListTracks => self.list_tracks()?,
            ControlKind::ListCommands => self.announcer.say(HELP_TEXT),
        }
        Ok(Outcome::Done)
    }

    fn whats_playing(&self) -> Result<()> {
        let np = self.playing_now()?;
        if np.is_empty() {
            self.announcer.say("Nothing is playing.");
            return Ok(());
        }

        let mut response = format!("Playing {}", np.describe());
        if let Some((track, disc)) = self.track_and_disc(&np) {
            match disc {
                Some(disc) if disc != "1" => {
                    response.push_str(&format!(", track {track} of disc {disc}"));
                }
                _ => response.push_str(&format!(", track {track}")),
            }
        }
        response.push('.');
        self.announcer.say(&response);
        Ok(())
    }

    fn list_tracks(&self) -> Result<()> {
        let np = self.playing_now()?;
        if np.is_empty() {
            info!("playing-now list is empty");
            self.announcer.say("The playlist is empty.");
            return Ok(());
        }

        let position = np.position + 1;
        info!(position, total = np.total_tracks, "playing-now list");
        match self.playback.playlist() {
            Ok(entries) => {
                for (idx, entry) in entries.iter().take(PLAYLIST_LOG_LIMIT).enumerate() {
                    let marker = if idx == np.position { ">" } else { " " };
                    info!(
                        "{marker} {}. {}",
                        idx + 1,
                        entry.name().unwrap_or("Unknown Track")
                    );
                }
                if entries.len() > PLAYLIST_LOG_LIMIT {
                    info!("... and {} more tracks", entries.len() - PLAYLIST_LOG_LIMIT);
                }
            }
            Err(e) => warn!(error = %e, "could not read the playing-now list"),
        }

        self.announcer.say(&format!(
            "There are {} tracks in the playlist. You're at position {position}.",
            np.total_tracks
        ));
        Ok(())
    }

    /// Jump to a 1-based track of the playing-now list.
    fn go_to_track(&self, track: u32) -> Result<()> {
        let np = self.playing_now()?;
        if np.is_empty() {
            self.announcer
                .say("The playlist is still loading. Try again in a moment.");
            return Ok(());
        }
        let n = track as usize;
        if n < 1 || n > np.total_tracks {
            self.announcer.say(&format!(
                "Track {track} is out of range. There are {} tracks.",
                np.total_tracks
            ));
            return Ok(());
        }

        let target = n - 1;
        if target == np.position {
            self.announcer.say(&format!("Already on track {track}."));
            self.log_now_playing();
            return Ok(());
        }

        self.announcer.say(&format!("Going to track {track}."));
        self.playback.set_playlist_position(target)?;
        let reached = self.poll.until("playlist position", || {
            self.current()
                .filter(|np| np.position == target)
                .map(|_| ())
        });
        if reached.is_none() {
            warn!(target = track, "player did not confirm the new position");
        }
        self.log_now_playing();
        Ok(())
    }

    // ── Searches ─────────────────────────────────────────────────────────────

    fn search_artist(&self, term: &str) -> Result<Outcome> {
        if term.is_empty() {
            self.announcer.say("Please say the artist name.");
            return Ok(Outcome::Done);
        }

        let artist = self
            .resolver
            .resolve_cached(term, FieldKind::Artist, &self.catalogs);
        let composer = self
            .resolver
            .resolve_cached(term, FieldKind::Composer, &self.catalogs);
        let best = if artist.score >= composer.score {
            artist
        } else {
            composer
        };

        match best.value {
            Some(name) if best.score > self.resolver.thresholds().explicit_search_min => {
                self.announcer
                    .say(&format!("Found {}: {name}", best.field));
                self.offer_performer(&name, best.field)
            }
            _ => {
                self.announcer.say(&format!("I couldn't find artist {term}"));
                Ok(Outcome::Done)
            }
        }
    }

    fn search_album(&self, term: &str) -> Result<Outcome> {
        if term.is_empty() {
            self.announcer.say("Please say the album name.");
            return Ok(Outcome::Done);
        }

        let album = self
            .resolver
            .resolve_cached(term, FieldKind::Album, &self.catalogs);
        match album.value {
            Some(name) if album.score > self.resolver.thresholds().explicit_search_min => {
                self.announcer.say(&format!("Playing {name}"));
                self.play_album(&name)
            }
            _ => {
                self.announcer.say(&format!("I couldn't find album {term}"));
                Ok(Outcome::Done)
            }
        }
    }

    fn search_generic(&self, term: &str) -> Result<Outcome> {
        if term.is_empty() {
            self.announcer.say("Please say what to search for.");
            return Ok(Outcome::Done);
        }

        if let Some(n) = bare_number(term) {
            if self.current().is_some_and(|np| !np.is_empty()) {
                debug!(track = n, "bare number while playing; jumping to track");
                self.go_to_track(n)?;
                return Ok(Outcome::Done);
            }
        }

        self.announcer.say(&format!("Searching for {term}"));
        let resolution =
            GenericResolver::new(&self.resolver, &self.catalogs, self.library.as_ref())
                .resolve(term);
        info!(term, resolution = ?resolution, "generic resolution");

        match resolution {
            Resolution::Field { name, field } => {
                self.announcer.say(&format!("Found {field}: {name}"));
                match field {
                    FieldKind::Album => self.play_album(&name),
                    person => self.offer_performer(&name, person),
                }
            }
            Resolution::Album(album) => {
                self.announcer.say(&format!("Found {album}"));
                self.play_album(&album)
            }
            Resolution::Disambiguate {
                candidates,
                context,
                total,
            } => Ok(self.prompt(candidates, total, context)),
            Resolution::OpenSearch(phrase) => {
                if is_specific_work(&phrase) {
                    self.announcer.say(&format!("Searching for {phrase}."));
                } else {
                    self.announcer.say(&format!(
                        "I couldn't find an exact match, so I'll search for {phrase}."
                    ));
                }
                self.open_search(&phrase)?;
                Ok(Outcome::Done)
            }
        }
    }

    /// List a performer's albums: play a single one, or ask which.
    fn offer_performer(&self, name: &str, field: FieldKind) -> Result<Outcome> {
        let albums = GenericResolver::new(&self.resolver, &self.catalogs, self.library.as_ref())
            .performer_albums(name, field);
        debug!(name, field = %field, albums = albums.len(), "performer albums");

        match albums.len() {
            0 => {
                self.announcer.say(&format!(
                    "I found {name}, but couldn't find any albums in the library."
                ));
                Ok(Outcome::Done)
            }
            1 => self.play_album(&albums[0]),
            total => Ok(self.prompt(
                albums,
                total,
                SelectionContext {
                    anchor: name.to_string(),
                    kind: SelectionKind::Field(field),
                },
            )),
        }
    }

    /// Speak a numbered list of candidates and hand them to the session.
    fn prompt(&self, candidates: Vec<String>, total: usize, context: SelectionContext) -> Outcome {
        let shown: Vec<String> = candidates
            .into_iter()
            .take(self.resolver.thresholds().disambiguation_limit)
            .collect();
        let list = shown
            .iter()
            .enumerate()
            .map(|(idx, album)| format!("{}. {album}", idx + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let by = match context.kind {
            SelectionKind::Field(FieldKind::Album) => format!(" by {}", context.anchor),
            _ => String::new(),
        };
        self.announcer
            .say(&format!("I found {total} albums{by}. {list}. Which one?"));
        Outcome::Disambiguate {
            candidates: shown,
            context,
        }
    }

    // ── Playback helpers ─────────────────────────────────────────────────────

    /// Replace the playing-now list with `album` in track order.
    fn play_album(&self, album: &str) -> Result<Outcome> {
        let tracks = self.album_tracks(album)?;
        let mut keyed: Vec<(u32, String)> = tracks
            .iter()
            .filter_map(|t| {
                let key = t.key()?;
                Some((t.track_number().unwrap_or(u32::MAX), key.to_string()))
            })
            .collect();
        if keyed.is_empty() {
            self.announcer.say("No tracks found for this album.");
            return Ok(Outcome::Done);
        }
        keyed.sort_by_key(|(track, _)| *track);
        let keys: Vec<String> = keyed.into_iter().map(|(_, key)| key).collect();
        info!(album, tracks = keys.len(), "playing album in track order");

        self.playback.play_by_keys(&keys)?;
        self.await_playlist("album playback");
        self.log_now_playing();
        Ok(Outcome::Done)
    }

    fn album_tracks(&self, album: &str) -> Result<Vec<LibraryEntity>> {
        or_empty(
            self.library.search(&SearchQuery::Album(album.to_string())),
            "album search",
        )
    }

    fn playing_now(&self) -> Result<NowPlaying> {
        or_empty(self.playback.now_playing(), "now playing")
    }

    fn open_search(&self, seed: &str) -> Result<()> {
        self.playback.play_open_search(seed)?;
        self.await_playlist("open search");
        self.log_now_playing();
        Ok(())
    }

    fn await_playlist(&self, what: &str) {
        let ready = self
            .poll
            .until(what, || self.current().filter(|np| !np.is_empty()));
        if ready.is_none() {
            warn!(what, "playing-now list still empty after polling");
        }
    }

    fn current(&self) -> Option<NowPlaying> {
        match self.playback.now_playing() {
            Ok(np) => Some(np),
            Err(e) => {
                debug!(error = %e, "now playing unavailable");
                None
            }
        }
    }

    fn settle(&self) {
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }
    }

    /// Track number and disc number of the current file, when known.
    fn track_and_disc(&self, np: &NowPlaying) -> Option<(String, Option<String>)> {
        let key = np.file_key.as_deref().filter(|k| *k != "-1")?;
        let info = match self.playback.file_info(key) {
            Ok(info) => info?,
            Err(e) => {
                debug!(key, error = %e, "file info unavailable");
                return None;
            }
        };
        let track = info.get(FIELD_TRACK)?.to_string();
        Some((track, info.disc_number().map(|d| d.to_string())))
    }

    fn log_now_playing(&self) {
        let Some(np) = self.current() else {
            return;
        };
        if np.is_empty() {
            info!("nothing playing");
            return;
        }
        let album_track = self
            .track_and_disc(&np)
            .map(|(track, _)| track)
            .unwrap_or_else(|| "?".into());
        info!(
            position = np.position + 1,
            total = np.total_tracks,
            album_track = %album_track,
            title = np.name.as_deref().unwrap_or("Unknown Track"),
            artist = np.artist.as_deref().unwrap_or("Unknown Artist"),
            "now playing"
        );
    }
}

/// A malformed server response reads as an empty result.
fn or_empty<T: Default>(result: Result<T>, what: &str) -> Result<T> {
    match result {
        Err(EncoreError::Parse(detail)) => {
            warn!(what, detail = %detail, "malformed response; treating as empty");
            Ok(T::default())
        }
        other => other,
    }
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("poll", &self.poll)
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::announce::{InputGate, TranscriptSpeaker};
    use crate::control::SimulatedPlayer;
    use crate::lexicon::Lexicon;
    use crate::library::{InMemoryLibrary, LibraryEntity};
    use crate::matching::MatchThresholds;

    struct Harness {
        executor: ActionExecutor,
        player: Arc<SimulatedPlayer>,
        speaker: Arc<TranscriptSpeaker>,
    }

    fn track(name: &str, artist: &str, composer: &str, album: &str, no: u32) -> LibraryEntity {
        LibraryEntity::new()
            .with("Name", name)
            .with("Artist", artist)
            .with("Composer", composer)
            .with("Album", album)
            .with(FIELD_TRACK, no.to_string())
    }

    fn harness() -> Harness {
        let library = pink_floyd_and_holst();
        let player = Arc::new(SimulatedPlayer::new(Arc::clone(&library)));
        let speaker = Arc::new(TranscriptSpeaker::new());
        let executor = executor(
            Arc::clone(&library),
            library,
            player.clone(),
            speaker.clone(),
        );
        Harness {
            executor,
            player,
            speaker,
        }
    }

    fn executor(
        catalog: Arc<InMemoryLibrary>,
        library: Arc<dyn LibrarySearch>,
        playback: Arc<dyn PlaybackControl>,
        speaker: Arc<TranscriptSpeaker>,
    ) -> ActionExecutor {
        ActionExecutor::new(
            EntityResolver::new(MatchThresholds::default(), Arc::new(Lexicon::default())),
            Arc::new(CatalogCache::new(catalog)),
            library,
            playback,
            Announcer::new(speaker, Arc::new(InputGate::new())),
            PollPolicy {
                attempts: 3,
                interval: Duration::from_millis(1),
            },
            Duration::ZERO,
        )
    }

    fn pink_floyd_and_holst() -> Arc<InMemoryLibrary> {
        Arc::new(InMemoryLibrary::new(vec![
            track("Brain Damage", "Pink Floyd", "", "The Dark Side of the Moon", 9),
            track("Speak to Me", "Pink Floyd", "", "The Dark Side of the Moon", 1),
            track("Eclipse", "Pink Floyd", "", "The Dark Side of the Moon", 10),
            track("Pigs", "Pink Floyd", "", "Animals", 2),
            track("Mars", "London Symphony Orchestra", "Gustav Holst", "The Planets", 1),
            track("Venus", "London Symphony Orchestra", "Gustav Holst", "The Planets", 2),
            LibraryEntity::new()
                .with("Name", "Bonus")
                .with("Artist", "Pink Floyd")
                .with("Album", "The Dark Side of the Moon"),
        ]))
    }

    /// Library whose search responses never parse.
    struct MalformedSearch;

    impl LibrarySearch for MalformedSearch {
        fn search(&self, _query: &SearchQuery) -> Result<Vec<LibraryEntity>> {
            Err(EncoreError::Parse("unexpected end of document".into()))
        }
    }

    /// Player whose playing-now responses never parse.
    struct MalformedNowPlaying(SimulatedPlayer);

    impl PlaybackControl for MalformedNowPlaying {
        fn play(&self) -> Result<()> {
            self.0.play()
        }
        fn pause(&self) -> Result<()> {
            self.0.pause()
        }
        fn stop(&self) -> Result<()> {
            self.0.stop()
        }
        fn stop_all(&self) -> Result<()> {
            self.0.stop_all()
        }
        fn next(&self) -> Result<()> {
            self.0.next()
        }
        fn previous(&self) -> Result<()> {
            self.0.previous()
        }
        fn adjust_volume(&self, step: VolumeStep) -> Result<()> {
            self.0.adjust_volume(step)
        }
        fn set_playlist_position(&self, position: usize) -> Result<()> {
            self.0.set_playlist_position(position)
        }
        fn play_by_keys(&self, keys: &[String]) -> Result<()> {
            self.0.play_by_keys(keys)
        }
        fn play_open_search(&self, seed: &str) -> Result<()> {
            self.0.play_open_search(seed)
        }
        fn now_playing(&self) -> Result<NowPlaying> {
            Err(EncoreError::Parse("missing Item element".into()))
        }
        fn playlist(&self) -> Result<Vec<LibraryEntity>> {
            self.0.playlist()
        }
        fn file_info(&self, key: &str) -> Result<Option<LibraryEntity>> {
            self.0.file_info(key)
        }
    }

    fn search(term: &str, target: SearchTarget) -> Action {
        Action::EntitySearch {
            term: term.into(),
            target,
        }
    }

    #[test]
    fn album_plays_in_track_order_with_unnumbered_tracks_last() {
        let h = harness();
        let outcome = h
            .executor
            .execute(search("dark side of the moon", SearchTarget::Album))
            .expect("album search");
        assert_eq!(outcome, Outcome::Done);
        // Keys are 1-based positions: 1 Brain Damage, 2 Speak to Me, 3 Eclipse, 7 Bonus.
        assert_eq!(h.player.playing_now_keys(), vec!["2", "1", "3", "7"]);
        assert_eq!(
            h.speaker.spoken(),
            vec!["Playing The Dark Side of the Moon"]
        );
    }

    #[test]
    fn artist_with_several_albums_asks_which_one() {
        let h = harness();
        let outcome = h
            .executor
            .execute(search("pink floyd", SearchTarget::Artist))
            .expect("artist search");
        match outcome {
            Outcome::Disambiguate {
                candidates,
                context,
            } => {
                assert_eq!(candidates, vec!["Animals", "The Dark Side of the Moon"]);
                assert_eq!(context.kind, SelectionKind::Field(FieldKind::Artist));
            }
            other => panic!("expected disambiguation, got {other:?}"),
        }
        assert_eq!(
            h.speaker.spoken().last().map(String::as_str),
            Some("I found 2 albums. 1. Animals, 2. The Dark Side of the Moon. Which one?")
        );
    }

    #[test]
    fn missing_album_is_reported() {
        let h = harness();
        h.executor
            .execute(search("zzzz qqqq xxxx", SearchTarget::Album))
            .expect("album search");
        assert_eq!(h.speaker.spoken(), vec!["I couldn't find album zzzz qqqq xxxx"]);
        assert!(h.player.playing_now_keys().is_empty());
    }

    #[test]
    fn track_jump_validates_against_the_playlist() {
        let h = harness();
        h.executor.execute(Action::TrackJump(2)).expect("jump");
        h.executor
            .execute(search("animals", SearchTarget::Album))
            .expect("album search");
        h.executor.execute(Action::TrackJump(4)).expect("jump");
        h.executor.execute(Action::TrackJump(1)).expect("jump");

        assert_eq!(
            h.speaker.spoken(),
            vec![
                "The playlist is still loading. Try again in a moment.",
                "Playing Animals",
                "Track 4 is out of range. There are 1 tracks.",
                "Already on track 1.",
            ]
        );
    }

    #[test]
    fn bare_number_jumps_when_something_is_playing() {
        let h = harness();
        h.executor
            .execute(search("dark side of the moon", SearchTarget::Album))
            .expect("album search");
        h.executor
            .execute(search("three", SearchTarget::Generic))
            .expect("generic search");

        assert_eq!(h.speaker.spoken().last().map(String::as_str), Some("Going to track 3."));
        assert!(h
            .player
            .requests()
            .contains(&"SetPlaylistPosition 2".to_string()));
    }

    #[test]
    fn unmatched_generic_search_falls_back_to_open_search() {
        let h = harness();
        h.executor
            .execute(search("quiet evening jazz", SearchTarget::Generic))
            .expect("generic search");
        assert_eq!(
            h.speaker.spoken(),
            vec![
                "Searching for quiet evening jazz",
                "I couldn't find an exact match, so I'll search for quiet evening jazz.",
            ]
        );
        assert!(h
            .player
            .requests()
            .contains(&"PlayDoctor quiet evening jazz".to_string()));
    }

    #[test]
    fn specific_work_selection_announces_the_album() {
        let h = harness();
        let context = SelectionContext {
            anchor: "the planets".into(),
            kind: SelectionKind::SpecificWork,
        };
        h.executor
            .play_selection("The Planets", &context)
            .expect("selection playback");
        assert_eq!(h.speaker.spoken(), vec!["Playing The Planets"]);
        assert_eq!(h.player.playing_now_keys(), vec!["5", "6"]);
    }

    #[test]
    fn quit_stops_and_says_goodbye() {
        let h = harness();
        let outcome = h
            .executor
            .execute(Action::PlaybackControl(ControlKind::Quit))
            .expect("quit");
        assert_eq!(outcome, Outcome::Quit);
        assert_eq!(h.speaker.spoken(), vec!["Goodbye."]);
        assert_eq!(h.player.requests(), vec!["Stop"]);
    }

    #[test]
    fn whats_playing_includes_the_album_track_number() {
        let h = harness();
        h.executor
            .execute(search("the planets", SearchTarget::Album))
            .expect("album search");
        h.executor
            .execute(Action::PlaybackControl(ControlKind::WhatsPlaying))
            .expect("what's playing");
        assert_eq!(
            h.speaker.spoken().last().map(String::as_str),
            Some("Playing Mars by London Symphony Orchestra, track 1.")
        );
    }

    #[test]
    fn malformed_album_search_reads_as_no_tracks() {
        let library = pink_floyd_and_holst();
        let player = Arc::new(SimulatedPlayer::new(Arc::clone(&library)));
        let speaker = Arc::new(TranscriptSpeaker::new());
        let executor = executor(library, Arc::new(MalformedSearch), player.clone(), speaker.clone());

        let outcome = executor
            .execute(search("animals", SearchTarget::Album))
            .expect("malformed search is not an error");
        assert_eq!(outcome, Outcome::Done);
        assert_eq!(
            speaker.spoken(),
            vec!["Playing Animals", "No tracks found for this album."]
        );
        assert!(player.playing_now_keys().is_empty());
    }

    #[test]
    fn malformed_now_playing_reads_as_nothing_playing() {
        let library = pink_floyd_and_holst();
        let player = Arc::new(MalformedNowPlaying(SimulatedPlayer::new(Arc::clone(&library))));
        let speaker = Arc::new(TranscriptSpeaker::new());
        let executor = executor(Arc::clone(&library), library, player, speaker.clone());

        for kind in [ControlKind::WhatsPlaying, ControlKind::ListTracks] {
            executor
                .execute(Action::PlaybackControl(kind))
                .expect("malformed now playing is not an error");
        }
        executor.execute(Action::TrackJump(2)).expect("jump");
        assert_eq!(
            speaker.spoken(),
            vec![
                "Nothing is playing.",
                "The playlist is empty.",
                "The playlist is still loading. Try again in a moment.",
            ]
        );
    }
}
