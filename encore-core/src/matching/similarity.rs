//! Character-level sequence similarity.
//!
//! Matching blocks are found the Ratcliff/Obershelp way: take the longest
//! common block, then recurse on the unmatched text to its left and right.
//! Scattered single-character overlaps therefore count far less than they
//! would in a longest-common-subsequence measure.

/// Similarity ratio `2·M / (|a| + |b|)` where `M` counts characters in the
/// matching blocks of `a` and `b`.
///
/// Range is `[0, 1]` and only identical strings score `1.0`. Ties between
/// equally long blocks go to the earliest position in `a`, then in `b`, so
/// the score can differ slightly when the arguments are swapped. Callers
/// lower-case both sides first.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Best ratio between `term` and any whitespace-separated word of `text`.
pub fn best_word_ratio(term: &str, text: &str) -> f64 {
    text.split_whitespace()
        .map(|word| ratio(term, word))
        .fold(0.0, f64::max)
}

/// Total length of all matching blocks.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, len) = longest_block(a, b, alo..ahi, blo..bhi);
        if len == 0 {
            continue;
        }
        matched += len;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + len < ahi && j + len < bhi {
            pending.push((i + len, ahi, j + len, bhi));
        }
    }
    matched
}

/// Longest common run of `a[ar]` and `b[br]` as `(start_a, start_b, len)`.
fn longest_block(
    a: &[char],
    b: &[char],
    ar: std::ops::Range<usize>,
    br: std::ops::Range<usize>,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best) = (ar.start, br.start, 0);
    // Run lengths ending at (i - 1, j) and (i, j), offset by one column.
    let width = br.len() + 1;
    let mut prev = vec![0usize; width];
    let mut curr = vec![0usize; width];
    for i in ar {
        for j in br.clone() {
            let col = j - br.start + 1;
            curr[col] = if a[i] == b[j] { prev[col - 1] + 1 } else { 0 };
            if curr[col] > best {
                best = curr[col];
                best_i = i + 1 - best;
                best_j = j + 1 - best;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    (best_i, best_j, best)
}
