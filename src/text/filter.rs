//! Recognized-text hygiene applied before subtitle assembly.
//!
//! Speech engines under noisy input produce two artifact classes this module
//! suppresses: stutter loops ("go go go go") and isolated junk fragments
//! ("uh", "So"). Filtering happens per recognized segment, upstream of the
//! segmenter, so noise never pollutes a committed line.

/// Collapse runs of identical consecutive words down to `max_repeat`.
///
/// Comparison is case-insensitive; the kept words preserve their original
/// casing. Whitespace is normalized to single spaces as a side effect.
pub fn dedupe_repeated_words(text: &str, max_repeat: usize) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut prev_key: Option<String> = None;
    let mut run = 0usize;

    for word in text.split_whitespace() {
        let key = word.to_lowercase();
        if prev_key.as_deref() == Some(key.as_str()) {
            run += 1;
        } else {
            prev_key = Some(key);
            run = 1;
        }
        if run <= max_repeat {
            out.push(word);
        }
    }

    out.join(" ")
}

/// Whether a fragment is too weak to show as subtitle text.
///
/// True for empty/whitespace input, for fragments of at most 2 characters,
/// and for a single word that does not end a sentence (no `.`, `!` or `?`).
pub fn is_low_value_fragment(text: &str) -> bool {
    let t = text.trim();
    if t.is_empty() {
        return true;
    }
    let word_count = t.split_whitespace().count();
    if word_count == 1 && !t.ends_with(['.', '!', '?']) {
        return true;
    }
    if t.chars().count() <= 2 {
        return true;
    }
    false
}

/// Apply both filters: dedupe first, then drop the fragment entirely if what
/// remains is low-value. Returns `None` when the fragment should be skipped.
pub fn clean_fragment(text: &str, max_repeat: usize) -> Option<String> {
    let deduped = dedupe_repeated_words(text, max_repeat);
    if is_low_value_fragment(&deduped) {
        return None;
    }
    Some(deduped)
}
