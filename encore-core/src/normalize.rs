//! Transcript canonicalization.
//!
//! `normalize` lower-cases, collapses whitespace, strips the filler word
//! "the" from both ends and rewrites the spoken forms recognizers produce for
//! work numbers ("number six" → "no. 6", "opus" → "op.", "simply" →
//! "symphony").
//!
//! Replacements are matched against the input once. Earlier table entries
//! claim their windows first; later entries may only use text no earlier
//! entry claimed. Output text is never re-scanned, so `normalize` is
//! idempotent.

/// Filler word stripped from the start and end of an utterance.
const FILLER: &str = "the";

/// Ordered replacement table. Patterns match whole whitespace-bounded words.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("number one", "no. 1"),
    ("number two", "no. 2"),
    ("number three", "no. 3"),
    ("number four", "no. 4"),
    ("number five", "no. 5"),
    ("number six", "no. 6"),
    ("number seven", "no. 7"),
    ("number eight", "no. 8"),
    ("number nine", "no. 9"),
    ("number ten", "no. 10"),
    ("number 1", "no. 1"),
    ("number 2", "no. 2"),
    ("number 3", "no. 3"),
    ("number 4", "no. 4"),
    ("number 5", "no. 5"),
    ("number 6", "no. 6"),
    ("number 7", "no. 7"),
    ("number 8", "no. 8"),
    ("number 9", "no. 9"),
    ("opus", "op."),
    ("op", "op."),
    ("simply", "symphony"),
];

/// Canonicalize a raw transcript. Never fails.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = strip_filler(&collapsed);
    apply_replacements(trimmed)
}

/// Remove leading "the " and trailing " the" until neither is present.
pub fn strip_filler(text: &str) -> &str {
    let mut out = text.trim();
    loop {
        let before = out;
        if let Some(rest) = out.strip_prefix(FILLER).and_then(|r| r.strip_prefix(' ')) {
            out = rest.trim_start();
        }
        if let Some(rest) = out.strip_suffix(FILLER).and_then(|r| r.strip_suffix(' ')) {
            out = rest.trim_end();
        }
        if out == before {
            return out;
        }
    }
}

fn apply_replacements(text: &str) -> String {
    // (start, end, replacement) windows over `text`, claimed in table order.
    let mut claims: Vec<(usize, usize, &str)> = Vec::new();

    for (pattern, replacement) in REPLACEMENTS {
        let mut from = 0;
        while let Some(offset) = text[from..].find(pattern) {
            let start = from + offset;
            let end = start + pattern.len();
            from = end;

            if !is_word_window(text, start, end) {
                continue;
            }
            let overlaps = claims.iter().any(|&(s, e, _)| start < e && s < end);
            if !overlaps {
                claims.push((start, end, replacement));
            }
        }
    }

    if claims.is_empty() {
        return text.to_string();
    }
    claims.sort_by_key(|&(start, _, _)| start);

    let mut out = String::with_capacity(text.len() + 8);
    let mut cursor = 0;
    for (start, end, replacement) in claims {
        out.push_str(&text[cursor..start]);
        out.push_str(replacement);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// A window is a word window when it is bounded by whitespace or the text ends.
fn is_word_window(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .map_or(true, char::is_whitespace);
    let after_ok = text[end..].chars().next().map_or(true, char::is_whitespace);
    before_ok && after_ok
}
