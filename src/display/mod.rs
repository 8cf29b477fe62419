//! Display-side line reconciliation.
//!
//! The pipeline pushes lines onto the subtitle bus in two flavors: source
//! text with the translation still pending (empty), and the same line again
//! once the translation lands. The merge policy collapses those into a single
//! displayed entry and keeps the window bounded.

use serde::Serialize;

use crate::bus::DropOldestQueue;

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// A line as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayLine {
    /// Source-language text.
    pub text: String,
    /// Translated text; empty while the translation is pending.
    pub translated: String,
    /// Start offset in seconds since stream start.
    pub t0: f64,
    /// End offset in seconds since stream start.
    pub t1: f64,
}

impl DisplayLine {
    /// A line whose translation is still pending.
    pub fn pending(text: impl Into<String>, t0: f64, t1: f64) -> Self {
        Self {
            text: text.into(),
            translated: String::new(),
            t0,
            t1,
        }
    }

    /// A line with its translation filled in.
    pub fn translated(
        text: impl Into<String>,
        translated: impl Into<String>,
        t0: f64,
        t1: f64,
    ) -> Self {
        Self {
            text: text.into(),
            translated: translated.into(),
            t0,
            t1,
        }
    }

    /// Whether the translation has not arrived yet.
    pub fn is_pending(&self) -> bool {
        self.translated.is_empty()
    }
}

/// The channel between the pipeline thread and the display thread.
pub type SubtitleBus = DropOldestQueue<DisplayLine>;

/// Reconcile `new` into `lines`, then trim to the most recent `max_lines`.
///
/// Policy, in order: an exact duplicate (both texts and both timestamps) is a
/// no-op; a translated line replaces a pending line with the same source text
/// and timestamps in place, preserving position; anything else appends.
pub fn merge_line(lines: &mut Vec<DisplayLine>, new: DisplayLine, max_lines: usize) {
    let duplicate = lines.iter().any(|line| *line == new);

    if !duplicate {
        let pending_slot = if new.is_pending() {
            None
        } else {
            lines.iter().position(|line| {
                line.is_pending() && line.text == new.text && line.t0 == new.t0 && line.t1 == new.t1
            })
        };

        match pending_slot {
            Some(idx) => lines[idx] = new,
            None => lines.push(new),
        }
    }

    if lines.len() > max_lines {
        let excess = lines.len() - max_lines;
        lines.drain(..excess);
    }
}

/// A bounded, ordered window of display lines.
#[derive(Debug, Clone)]
pub struct DisplayWindow {
    lines: Vec<DisplayLine>,
    max_lines: usize,
}

impl DisplayWindow {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Vec::new(),
            max_lines,
        }
    }

    /// Apply one incoming line through the merge policy.
    pub fn apply(&mut self, line: DisplayLine) {
        merge_line(&mut self.lines, line, self.max_lines);
    }

    /// The currently displayed lines, oldest first.
    pub fn lines(&self) -> &[DisplayLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }
}

/// Format one line for terminal output.
///
/// Pending lines render fully dimmed and are superseded on screen by the
/// translated line that follows them; a pending line whose translation never
/// arrives stays visible as source text. `show_source` controls whether
/// translated lines carry the source text alongside the translation.
pub fn format_line(line: &DisplayLine, show_source: bool) -> String {
    if line.is_pending() {
        format!(
            "{DIM}[{:6.2}-{:6.2}] {}{RESET}",
            line.t0, line.t1, line.text
        )
    } else if show_source {
        format!(
            "{DIM}[{:6.2}-{:6.2}]{RESET} {}  {DIM}({}){RESET}",
            line.t0, line.t1, line.translated, line.text
        )
    } else {
        format!(
            "{DIM}[{:6.2}-{:6.2}]{RESET} {}",
            line.t0, line.t1, line.translated
        )
    }
}

/// Drain up to `max_items` pending lines from the bus into the window.
///
/// Returns the applied lines in arrival order so the caller can render them
/// incrementally. Callable at whatever cadence the renderer polls at; the cap
/// keeps one tick from monopolizing the UI thread after a burst.
pub fn drain_into(
    bus: &SubtitleBus,
    window: &mut DisplayWindow,
    max_items: usize,
) -> Vec<DisplayLine> {
    let mut applied = Vec::new();
    while applied.len() < max_items {
        match bus.pop() {
            Some(line) => {
                window.apply(line.clone());
                applied.push(line);
            }
            None => break,
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_fills_pending_slot_in_place() {
        let mut lines = vec![
            DisplayLine::translated("first.", "最初。", 0.0, 1.0),
            DisplayLine::pending("second.", 1.5, 2.5),
        ];

        merge_line(
            &mut lines,
            DisplayLine::translated("second.", "二番目。", 1.5, 2.5),
            4,
        );

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "second.");
        assert_eq!(lines[1].translated, "二番目。");
    }

    #[test]
    fn exact_duplicate_is_a_no_op() {
        let mut lines = vec![DisplayLine::translated("hello.", "やあ。", 0.0, 1.0)];
        merge_line(
            &mut lines,
            DisplayLine::translated("hello.", "やあ。", 0.0, 1.0),
            4,
        );
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn pending_then_translated_yields_one_line() {
        let mut lines = Vec::new();
        merge_line(&mut lines, DisplayLine::pending("on screen.", 0.0, 1.0), 4);
        merge_line(
            &mut lines,
            DisplayLine::translated("on screen.", "画面に。", 0.0, 1.0),
            4,
        );

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].translated, "画面に。");
    }

    #[test]
    fn different_timestamps_append_instead_of_replacing() {
        // Same text spoken twice: the second occurrence is its own line.
        let mut lines = vec![DisplayLine::pending("again.", 0.0, 1.0)];
        merge_line(
            &mut lines,
            DisplayLine::translated("again.", "また。", 5.0, 6.0),
            4,
        );
        assert_eq!(lines.len(), 2);
        assert!(lines[0].is_pending());
    }

    #[test]
    fn window_trims_oldest_beyond_capacity() {
        let mut window = DisplayWindow::new(2);
        window.apply(DisplayLine::pending("one.", 0.0, 1.0));
        window.apply(DisplayLine::pending("two.", 1.0, 2.0));
        window.apply(DisplayLine::pending("three.", 2.0, 3.0));

        assert_eq!(window.len(), 2);
        assert_eq!(window.lines()[0].text, "two.");
        assert_eq!(window.lines()[1].text, "three.");
    }

    #[test]
    fn late_translation_for_evicted_line_appends_then_trims() {
        let mut window = DisplayWindow::new(2);
        window.apply(DisplayLine::pending("gone.", 0.0, 1.0));
        window.apply(DisplayLine::pending("two.", 1.0, 2.0));
        window.apply(DisplayLine::pending("three.", 2.0, 3.0));

        // "gone." was evicted; its translation no longer finds a pending slot.
        window.apply(DisplayLine::translated("gone.", "消えた。", 0.0, 1.0));
        assert_eq!(window.len(), 2);
        assert_eq!(window.lines()[1].text, "gone.");
    }

    #[test]
    fn drain_honors_per_tick_cap() {
        let bus: SubtitleBus = DropOldestQueue::new(10).unwrap();
        for i in 0..5 {
            bus.push(DisplayLine::pending(format!("line {}.", i), i as f64, i as f64 + 0.5));
        }

        let mut window = DisplayWindow::new(10);
        let first = drain_into(&bus, &mut window, 3);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].text, "line 0.");
        assert_eq!(window.len(), 3);
        assert_eq!(bus.len(), 2);

        assert_eq!(drain_into(&bus, &mut window, 3).len(), 2);
        assert_eq!(window.len(), 5);
    }

    #[test]
    fn drain_applies_merge_policy() {
        let bus: SubtitleBus = DropOldestQueue::new(10).unwrap();
        bus.push(DisplayLine::pending("merge me.", 0.0, 1.0));
        bus.push(DisplayLine::translated("merge me.", "マージ。", 0.0, 1.0));

        let mut window = DisplayWindow::new(4);
        assert_eq!(drain_into(&bus, &mut window, 10).len(), 2);
        assert_eq!(window.len(), 1);
        assert_eq!(window.lines()[0].translated, "マージ。");
    }

    #[test]
    fn pending_line_formats_dimmed_source() {
        let rendered = format_line(&DisplayLine::pending("still waiting.", 2.0, 3.5), true);
        assert!(rendered.starts_with(DIM));
        assert!(rendered.contains("[  2.00-  3.50]"));
        assert!(rendered.contains("still waiting."));
    }

    #[test]
    fn pending_line_ignores_show_source_flag() {
        // A pending line is the only visible form of its utterance, so it
        // renders even when source display is off.
        let rendered = format_line(&DisplayLine::pending("keep me.", 0.0, 1.0), false);
        assert!(rendered.contains("keep me."));
    }

    #[test]
    fn translated_line_carries_source_when_enabled() {
        let line = DisplayLine::translated("hello.", "こんにちは。", 0.0, 1.0);
        let rendered = format_line(&line, true);
        assert!(rendered.contains("こんにちは。"));
        assert!(rendered.contains("(hello.)"));
    }

    #[test]
    fn translated_line_omits_source_when_disabled() {
        let line = DisplayLine::translated("hello.", "こんにちは。", 0.0, 1.0);
        let rendered = format_line(&line, false);
        assert!(rendered.contains("こんにちは。"));
        assert!(!rendered.contains("hello."));
    }
}
