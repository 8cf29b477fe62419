//! Subtitle line assembly from recognized-text fragments.

/// A committed subtitle line spanning one or more recognized fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleLine {
    /// Fragments joined with single spaces.
    pub text: String,
    /// Start of the first contributing fragment, seconds since stream start.
    pub t0: f64,
    /// End of the last contributing fragment, seconds since stream start.
    pub t1: f64,
}

/// Regroups timed text fragments into subtitle-sized lines.
///
/// A line commits when the merged text ends a sentence, when a pause longer
/// than `gap_sec` separates fragments, or when the merged text reaches
/// `hard_max_chars` (emergency commit bounding latency and line length).
/// Committed spans are clamped so start ≤ end.
#[derive(Debug)]
pub struct SubtitleSegmenter {
    gap_sec: f64,
    hard_max_chars: usize,
    buf: Vec<String>,
    t0: f64,
    t1: f64,
    last_end: f64,
}

/// Terminal punctuation that ends a subtitle line.
const TERMINALS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

impl SubtitleSegmenter {
    /// Creates a segmenter.
    ///
    /// `gap_sec` is the pause length that forces a commit; `hard_max_chars`
    /// is the merged-length ceiling. Callers resolve configuration floors
    /// before construction (see `SegmenterConfig`).
    pub fn new(gap_sec: f64, hard_max_chars: usize) -> Self {
        Self {
            gap_sec,
            hard_max_chars,
            buf: Vec::new(),
            t0: 0.0,
            t1: 0.0,
            last_end: 0.0,
        }
    }

    /// Feed one recognized fragment. Returns zero, one or two committed
    /// lines: a pause can flush the previous buffer and the new fragment can
    /// complete a sentence in the same call.
    ///
    /// Whitespace-only input is ignored without affecting state.
    pub fn push(&mut self, text: &str, t0: f64, t1: f64) -> Vec<SubtitleLine> {
        let mut out = Vec::new();

        let text = text.trim();
        if text.is_empty() {
            return out;
        }

        if !self.buf.is_empty() && (t0 - self.last_end) > self.gap_sec {
            if let Some(line) = self.commit() {
                out.push(line);
            }
        }

        if self.buf.is_empty() {
            self.t0 = t0;
        }
        self.buf.push(text.to_string());
        self.t1 = t1;
        self.last_end = t1;

        let merged = self.buf.join(" ");
        let ends_sentence = merged.chars().next_back().is_some_and(|c| TERMINALS.contains(&c));
        if ends_sentence || merged.chars().count() >= self.hard_max_chars {
            if let Some(line) = self.commit() {
                out.push(line);
            }
        }

        out
    }

    /// Force-commit whatever is buffered. Returns `None` when empty.
    ///
    /// Called at stream end and on shutdown so trailing speech is not lost.
    pub fn flush(&mut self) -> Option<SubtitleLine> {
        self.commit()
    }

    /// Whether any fragment is currently buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn commit(&mut self) -> Option<SubtitleLine> {
        if self.buf.is_empty() {
            return None;
        }
        let line = SubtitleLine {
            text: self.buf.join(" "),
            t0: self.t0,
            t1: self.t1.max(self.t0),
        };
        self.buf.clear();
        self.t0 = 0.0;
        self.t1 = 0.0;
        Some(line)
    }
}
