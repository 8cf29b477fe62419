//! Recognized-text filtering and subtitle line assembly.

pub mod filter;
pub mod segmenter;

pub use filter::{clean_fragment, dedupe_repeated_words, is_low_value_fragment};
pub use segmenter::{SubtitleLine, SubtitleSegmenter};
