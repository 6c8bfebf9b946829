//! Maps a normalized command body to an `Action`.
//!
//! Interpretation is pure: it reads the session but never changes it, and it
//! never touches the library. Entity searches are resolved later by
//! `generic::GenericResolver` on the worker.
//!
//! ## Pattern priority
//!
//! | # | Pattern | Action |
//! |---|---------|--------|
//! | 1 | "quit", "exit", "stop listening" | `Quit` |
//! | 2 | "pause" | `Pause` |
//! | 3 | exactly "turn it off" / "shut down" / "stop all" | `StopAll` |
//! | 4 | "stop" | `Stop` |
//! | 5 | exactly "play" / "resume" / "start music" | `Resume` |
//! | 6 | "next track/song", exactly "next" / "skip" | `Next` |
//! | 7 | "previous track/song", exactly "previous" / "back" | `Previous` |
//! | 8 | "volume up" / "volume down" | `VolumeUp` / `VolumeDown` |
//! | 9 | "what's playing", "what song", ... | `WhatsPlaying` |
//! | 10 | "list tracks", "show playlist", ... | `ListTracks` |
//! | 11 | "go to track N", "play track N", ... | `TrackJump(N)` |
//! | 12 | "play artist X", "find artist X", ... | artist search |
//! | 13 | "play album X", "find album X", ... | album search |
//! | 14 | "search for X" | generic search |
//! | 15 | exactly "list commands" | `ListCommands` |
//! | 16 | "play X" | generic search |
//!
//! Phrase patterns match whole words, so "quite" never means "quit".

pub mod generic;

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Quit,
    Pause,
    Stop,
    StopAll,
    Resume,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
    WhatsPlaying,
    ListTracks,
    ListCommands,
}

/// Which catalog an entity search targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    /// Artist or composer, whichever matches better.
    Artist,
    Album,
    /// Decided by the generic resolution policy.
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    PlaybackControl(ControlKind),
    /// 1-based position in the playing-now list.
    TrackJump(u32),
    /// `term` may be empty when the user named no entity.
    EntitySearch {
        term: String,
        target: SearchTarget,
    },
    SelectionReply(String),
    Unrecognized,
}

struct Rule {
    /// Whole-word phrases that may appear anywhere.
    contains: &'static [&'static str],
    /// Complete utterances.
    exact: &'static [&'static str],
    kind: ControlKind,
}

const CONTROL_RULES: &[Rule] = &[
    Rule {
        contains: &["quit", "exit", "stop listening"],
        exact: &[],
        kind: ControlKind::Quit,
    },
    Rule {
        contains: &["pause"],
        exact: &[],
        kind: ControlKind::Pause,
    },
    Rule {
        contains: &[],
        exact: &["turn it off", "shut down", "stop all"],
        kind: ControlKind::StopAll,
    },
    Rule {
        contains: &["stop"],
        exact: &[],
        kind: ControlKind::Stop,
    },
    Rule {
        contains: &[],
        exact: &["play", "resume", "start music"],
        kind: ControlKind::Resume,
    },
    Rule {
        contains: &["next track", "next song"],
        exact: &["next", "skip"],
        kind: ControlKind::Next,
    },
    Rule {
        contains: &["previous track", "previous song"],
        exact: &["previous", "back"],
        kind: ControlKind::Previous,
    },
    Rule {
        contains: &["volume up"],
        exact: &[],
        kind: ControlKind::VolumeUp,
    },
    Rule {
        contains: &["volume down"],
        exact: &[],
        kind: ControlKind::VolumeDown,
    },
    Rule {
        contains: &[
            "what is playing",
            "what's playing",
            "whats playing",
            "what song is this",
            "what track is this",
            "what song",
            "what track",
        ],
        exact: &[],
        kind: ControlKind::WhatsPlaying,
    },
    Rule {
        contains: &["list tracks", "show tracks", "show playlist"],
        exact: &[],
        kind: ControlKind::ListTracks,
    },
];

/// "play track" and the ways recognizers mangle it.
const TRACK_JUMP_PHRASES: &[&str] = &[
    "go to track",
    "jump to track",
    "play track",
    "play truck",
    "play crack",
    "play black",
    "play check",
];

const ARTIST_PREFIXES: &[&str] = &["search for artist", "play artist", "find artist"];
const ALBUM_PREFIXES: &[&str] = &["search for album", "play album", "find album"];

const NUMBER_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
    "twenty",
];

/// Map a normalized command body to an `Action`.
pub fn interpret(text: &str, session: &Session) -> Action {
    let text = text.trim();
    if session.is_waiting_selection() {
        return Action::SelectionReply(text.to_string());
    }
    if text.is_empty() {
        return Action::Unrecognized;
    }

    if let Some(rule) = CONTROL_RULES.iter().find(|rule| {
        rule.exact.contains(&text) || rule.contains.iter().any(|p| contains_phrase(text, p))
    }) {
        return Action::PlaybackControl(rule.kind);
    }

    if TRACK_JUMP_PHRASES.iter().any(|p| contains_phrase(text, p)) {
        return match track_number(text) {
            Some(n) => Action::TrackJump(n),
            None => Action::Unrecognized,
        };
    }

    if let Some(term) = strip_any_prefix(text, ARTIST_PREFIXES) {
        return search(term, SearchTarget::Artist);
    }
    if let Some(term) = strip_any_prefix(text, ALBUM_PREFIXES) {
        return search(term, SearchTarget::Album);
    }
    if let Some(term) = strip_any_prefix(text, &["search for"]) {
        return search(term, SearchTarget::Generic);
    }
    if text == "list commands" {
        return Action::PlaybackControl(ControlKind::ListCommands);
    }
    if let Some(term) = strip_any_prefix(text, &["play"]) {
        return search(term, SearchTarget::Generic);
    }

    Action::Unrecognized
}

/// First positive number in `text`, spelled out ("one".."twenty") or as digits.
pub fn track_number(text: &str) -> Option<u32> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .find_map(|word| {
            NUMBER_WORDS
                .iter()
                .position(|n| *n == word)
                .map(|idx| idx as u32 + 1)
                .or_else(|| word.parse::<u32>().ok())
        })
        .filter(|n| *n > 0)
}

/// A search term that is nothing but a number from one to ten.
pub fn bare_number(term: &str) -> Option<u32> {
    let term = term.trim();
    if term.split_whitespace().count() != 1 {
        return None;
    }
    track_number(term).filter(|n| *n <= 10)
}

fn search(term: &str, target: SearchTarget) -> Action {
    Action::EntitySearch {
        term: term.trim().to_string(),
        target,
    }
}

fn strip_any_prefix<'a>(text: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| {
        let rest = text.strip_prefix(prefix)?;
        (rest.is_empty() || rest.starts_with(char::is_whitespace)).then(|| rest.trim())
    })
}

/// Whether `phrase` occurs in `text` bounded by non-alphanumerics.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    text.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        before.map_or(true, |c| !c.is_alphanumeric()) && after.map_or(true, |c| !c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Action {
        interpret(text, &Session::new())
    }

    fn control(kind: ControlKind) -> Action {
        Action::PlaybackControl(kind)
    }

    fn generic(term: &str) -> Action {
        Action::EntitySearch {
            term: term.into(),
            target: SearchTarget::Generic,
        }
    }

    #[test]
    fn transport_commands() {
        assert_eq!(run("pause"), control(ControlKind::Pause));
        assert_eq!(run("please pause the music"), control(ControlKind::Pause));
        assert_eq!(run("stop"), control(ControlKind::Stop));
        assert_eq!(run("play"), control(ControlKind::Resume));
        assert_eq!(run("start music"), control(ControlKind::Resume));
        assert_eq!(run("skip"), control(ControlKind::Next));
        assert_eq!(run("next song please"), control(ControlKind::Next));
        assert_eq!(run("back"), control(ControlKind::Previous));
        assert_eq!(run("volume down a bit"), control(ControlKind::VolumeDown));
    }

    #[test]
    fn quit_outranks_stop() {
        assert_eq!(run("stop listening"), control(ControlKind::Quit));
        assert_eq!(run("exit"), control(ControlKind::Quit));
    }

    #[test]
    fn stop_all_is_exact_and_outranks_stop() {
        assert_eq!(run("stop all"), control(ControlKind::StopAll));
        assert_eq!(run("shut down"), control(ControlKind::StopAll));
        assert_eq!(run("stop all of it"), control(ControlKind::Stop));
    }

    #[test]
    fn phrases_match_whole_words_only() {
        assert_eq!(run("play quite early"), generic("quite early"));
        assert_eq!(run("play nonstop hits"), generic("nonstop hits"));
    }

    #[test]
    fn queries() {
        assert_eq!(run("what's playing"), control(ControlKind::WhatsPlaying));
        assert_eq!(run("what song is this"), control(ControlKind::WhatsPlaying));
        assert_eq!(run("show playlist"), control(ControlKind::ListTracks));
        assert_eq!(run("list commands"), control(ControlKind::ListCommands));
    }

    #[test]
    fn track_jumps_accept_words_digits_and_misrecognitions() {
        assert_eq!(run("go to track five"), Action::TrackJump(5));
        assert_eq!(run("play track 12"), Action::TrackJump(12));
        assert_eq!(run("play truck three"), Action::TrackJump(3));
        assert_eq!(run("jump to track twenty"), Action::TrackJump(20));
    }

    #[test]
    fn track_jump_without_number_is_unrecognized() {
        assert_eq!(run("go to track"), Action::Unrecognized);
        assert_eq!(run("play track zero"), Action::Unrecognized);
        assert_eq!(run("play track 0"), Action::Unrecognized);
    }

    #[test]
    fn explicit_searches_strip_their_prefix() {
        assert_eq!(
            run("play artist pink floyd"),
            Action::EntitySearch {
                term: "pink floyd".into(),
                target: SearchTarget::Artist
            }
        );
        assert_eq!(
            run("search for album the wall"),
            Action::EntitySearch {
                term: "the wall".into(),
                target: SearchTarget::Album
            }
        );
        assert_eq!(
            run("find artist"),
            Action::EntitySearch {
                term: String::new(),
                target: SearchTarget::Artist
            }
        );
    }

    #[test]
    fn generic_searches() {
        assert_eq!(run("search for holst"), generic("holst"));
        assert_eq!(run("play gustav holst the planets"), generic("gustav holst the planets"));
        assert_eq!(run("play three"), generic("three"));
    }

    #[test]
    fn unknown_text_is_unrecognized() {
        assert_eq!(run("make me a sandwich"), Action::Unrecognized);
        assert_eq!(run("playlist"), Action::Unrecognized);
        assert_eq!(run(""), Action::Unrecognized);
    }

    #[test]
    fn waiting_selection_turns_everything_into_a_reply() {
        use crate::lexicon::Lexicon;
        use crate::matching::FieldKind;
        use crate::session::{
            ManualClock, SelectionContext, SelectionKind, SessionMachine, WakeWordDetector,
        };
        use std::sync::Arc;
        use std::time::Duration;

        let mut machine = SessionMachine::new(
            WakeWordDetector::new("alice", &[]),
            Arc::new(Lexicon::default()),
            Duration::from_secs(5),
            10,
            Arc::new(ManualClock::new()),
        );
        machine.begin_selection(
            vec!["A".into(), "B".into()],
            SelectionContext {
                anchor: "x".into(),
                kind: SelectionKind::Field(FieldKind::Artist),
            },
        );
        assert_eq!(
            interpret("stop", machine.session()),
            Action::SelectionReply("stop".into())
        );
    }

    #[test]
    fn bare_numbers_are_limited_to_ten() {
        assert_eq!(bare_number("three"), Some(3));
        assert_eq!(bare_number("7"), Some(7));
        assert_eq!(bare_number("twelve"), None);
        assert_eq!(bare_number("three little birds"), None);
    }
}
