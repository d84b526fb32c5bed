//! Boundary-aware document splitting.
//!
//! Two interchangeable strategies produce the same `TextUnit` shape: a
//! recursive splitter that walks a separator ladder from paragraph breaks
//! down to raw characters, and a fixed-size character splitter with a
//! sentence-boundary lookback. Both guarantee forward progress of at least
//! one character per emitted unit and cap overlap at half the unit length.

use crate::core::config::{ChunkOptions, ChunkStrategy};
use crate::core::error::{Error, Result};
use crate::indexing::tokens::{estimate_tokens, TokenTally};
use serde::{Deserialize, Serialize};

/// A bounded span of one document's text, the atomic item that gets
/// embedded and stored. Offsets are byte offsets into the source document,
/// always on `char` boundaries. Line numbers are 1-indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextUnit {
    pub text: String,
    pub source_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl TextUnit {
    pub fn new(
        text: String,
        source_path: String,
        start_line: usize,
        end_line: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Self {
            text,
            source_path,
            start_line,
            end_line,
            start_offset,
            end_offset,
        }
    }

    fn from_span(doc: &str, source_path: &str, start: usize, end: usize, lines: &LineIndex) -> Self {
        let last = if end > start { end - 1 } else { start };
        Self {
            text: doc[start..end].to_string(),
            source_path: source_path.to_string(),
            start_line: lines.line_at(start),
            end_line: lines.line_at(last),
            start_offset: start,
            end_offset: end,
        }
    }
}

/// Strategy interface for splitting one document into ordered units.
pub trait Chunker: Send + Sync {
    fn chunk(&self, text: &str, source_path: &str) -> Vec<TextUnit>;
}

/// Build the configured chunker.
pub fn chunker_for(options: &ChunkOptions) -> Result<Box<dyn Chunker>> {
    Ok(match options.strategy {
        ChunkStrategy::Recursive => Box::new(RecursiveChunker::new(
            options.target_tokens,
            options.overlap_tokens,
        )?),
        ChunkStrategy::FixedSize => Box::new(FixedSizeChunker::new(
            options.target_tokens,
            options.overlap_tokens,
        )?),
    })
}

/// Byte offsets of line starts, for 1-indexed line lookup by binary search.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn line_at(&self, offset: usize) -> usize {
        self.starts.partition_point(|&s| s <= offset)
    }
}

/// Separator ladder, coarse to fine. Raw characters are the implicit last
/// resort after the ladder is exhausted.
const SEPARATORS: [&str; 8] = ["\n\n", "\n", ". ", "! ", "? ", "; ", ", ", " "];

fn validate_budgets(target_tokens: usize, overlap_tokens: usize) -> Result<()> {
    if target_tokens == 0 {
        return Err(Error::Config("target_tokens must be positive".to_string()));
    }
    if overlap_tokens >= target_tokens {
        return Err(Error::Config(format!(
            "overlap_tokens ({}) must be strictly smaller than target_tokens ({})",
            overlap_tokens, target_tokens
        )));
    }
    Ok(())
}

/// Greedily accumulates separator-inclusive pieces into groups whose token
/// estimate stays within the budget. A group only exceeds the budget when a
/// single piece does so on its own.
struct GroupAccumulator {
    budget: usize,
    pieces: usize,
    groups: usize,
    first_len: usize,
    group_len: usize,
    tally: TokenTally,
}

impl GroupAccumulator {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            pieces: 0,
            groups: 0,
            first_len: 0,
            group_len: 0,
            tally: TokenTally::default(),
        }
    }

    fn push(&mut self, piece: &str) {
        self.pieces += 1;
        let mut extended = self.tally;
        extended.push(piece);
        if self.group_len > 0 && extended.estimate() > self.budget {
            self.close_group();
            self.tally = TokenTally::of(piece);
            self.group_len = piece.len();
        } else {
            self.tally = extended;
            self.group_len += piece.len();
        }
    }

    fn close_group(&mut self) {
        self.groups += 1;
        if self.groups == 1 {
            self.first_len = self.group_len;
        }
    }

    /// Returns (byte length of first group, group count) when the input was
    /// actually split into more than one piece.
    fn finish(mut self) -> Option<(usize, usize)> {
        if self.group_len > 0 {
            self.close_group();
        }
        if self.pieces < 2 {
            None
        } else {
            Some((self.first_len, self.groups))
        }
    }
}

/// Next cursor position after emitting the span `[start, end)`.
///
/// Overlap is capped at half the span's characters and forward progress of
/// at least one character is enforced, so the cursor can never stall.
fn advance_with_overlap(piece: &str, start: usize, end: usize, overlap_tokens: usize) -> usize {
    let estimated = estimate_tokens(piece);
    let char_len = piece.chars().count();
    let ratio = if estimated == 0 {
        0.0
    } else {
        (overlap_tokens as f64 / estimated as f64).min(0.5)
    };
    let overlap_chars = (char_len as f64 * ratio).floor() as usize;
    let overlapped = if overlap_chars == 0 {
        end
    } else {
        piece
            .char_indices()
            .nth(char_len - overlap_chars)
            .map(|(offset, _)| start + offset)
            .unwrap_or(end)
    };
    let first_char = piece.chars().next().map(char::len_utf8).unwrap_or(1);
    overlapped.max(start + first_char)
}

/// Recursive boundary-aware splitter.
///
/// Each emitted unit is the first group of a full recursive split of the
/// remaining document suffix; the rest of that split is discarded and
/// recomputed on the next iteration. That recomputation is a known cost,
/// kept because an eager one-pass split can place boundaries differently
/// once overlap shifts the cursor back into already-split text.
pub struct RecursiveChunker {
    target_tokens: usize,
    overlap_tokens: usize,
}

impl RecursiveChunker {
    pub fn new(target_tokens: usize, overlap_tokens: usize) -> Result<Self> {
        validate_budgets(target_tokens, overlap_tokens)?;
        Ok(Self {
            target_tokens,
            overlap_tokens,
        })
    }

    /// Byte length of the first unit a recursive split of `span` produces.
    ///
    /// Grouping is order-preserving and groups split independently, so the
    /// leading unit only ever depends on the first group chain; recursing
    /// into that group alone yields boundaries identical to the eager split.
    fn first_fragment_len(&self, span: &str, level: usize) -> usize {
        if estimate_tokens(span) <= self.target_tokens {
            return span.len();
        }
        for (next, &sep) in SEPARATORS.iter().enumerate().skip(level) {
            if let Some((first_len, groups)) = self.split_on(span, sep) {
                if groups > 1 {
                    return self.first_fragment_len(&span[..first_len], next + 1);
                }
            }
        }
        if let Some((first_len, groups)) = self.split_chars(span) {
            if groups > 1 {
                return first_len;
            }
        }
        self.truncated_len(span)
    }

    fn split_on(&self, span: &str, sep: &str) -> Option<(usize, usize)> {
        let mut acc = GroupAccumulator::new(self.target_tokens);
        for piece in span.split_inclusive(sep) {
            acc.push(piece);
        }
        acc.finish()
    }

    fn split_chars(&self, span: &str) -> Option<(usize, usize)> {
        let mut acc = GroupAccumulator::new(self.target_tokens);
        let mut buf = [0u8; 4];
        for c in span.chars() {
            acc.push(c.encode_utf8(&mut buf));
        }
        acc.finish()
    }

    /// Proportional truncation for a span no separator can break. May cut
    /// mid-word; the cursor resumes from the cut on the next iteration.
    fn truncated_len(&self, span: &str) -> usize {
        let estimated = estimate_tokens(span);
        let char_len = span.chars().count();
        let keep = ((char_len * self.target_tokens) / estimated).max(1);
        span.char_indices()
            .nth(keep)
            .map(|(offset, _)| offset)
            .unwrap_or(span.len())
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str, source_path: &str) -> Vec<TextUnit> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let lines = LineIndex::new(text);
        let mut units = Vec::new();
        let mut start = 0usize;
        while start < text.len() {
            let suffix = &text[start..];
            let len = self.first_fragment_len(suffix, 0).min(suffix.len());
            let end = start + len;
            let piece = &text[start..end];
            if !piece.trim().is_empty() {
                units.push(TextUnit::from_span(text, source_path, start, end, &lines));
            }
            if end >= text.len() {
                break;
            }
            start = advance_with_overlap(piece, start, end, self.overlap_tokens);
        }
        units
    }
}

/// Characters per estimated token used to size fixed windows.
const CHARS_PER_TOKEN: usize = 4;
/// How far back from a window edge to look for a sentence boundary.
const SENTENCE_LOOKBACK_CHARS: usize = 100;
/// Trailing-period tokens that do not end a sentence.
const ABBREVIATIONS: [&str; 9] = [
    "Mr.", "Mrs.", "Dr.", "Ms.", "St.", "etc.", "e.g.", "i.e.", "vs.",
];

/// Fixed-size character splitter with the same overlap and forward-progress
/// contract as [`RecursiveChunker`].
pub struct FixedSizeChunker {
    window_chars: usize,
    overlap_tokens: usize,
}

impl FixedSizeChunker {
    pub fn new(target_tokens: usize, overlap_tokens: usize) -> Result<Self> {
        validate_budgets(target_tokens, overlap_tokens)?;
        Ok(Self {
            window_chars: target_tokens * CHARS_PER_TOKEN,
            overlap_tokens,
        })
    }

    /// Byte length of the window starting at the cursor, pulled back to the
    /// last sentence boundary within the lookback distance when one exists.
    fn window_len(&self, suffix: &str) -> usize {
        let hard_end = suffix
            .char_indices()
            .nth(self.window_chars)
            .map(|(offset, _)| offset)
            .unwrap_or(suffix.len());
        if hard_end == suffix.len() {
            return hard_end;
        }
        let window = &suffix[..hard_end];
        let lookback_start = window
            .char_indices()
            .rev()
            .nth(SENTENCE_LOOKBACK_CHARS - 1)
            .map(|(offset, _)| offset)
            .unwrap_or(0);
        let mut boundary = None;
        for (offset, c) in window[lookback_start..].char_indices() {
            if !matches!(c, '.' | '!' | '?') {
                continue;
            }
            let at = lookback_start + offset;
            let next_breaks = suffix[at + c.len_utf8()..]
                .chars()
                .next()
                .map(|n| n.is_whitespace())
                .unwrap_or(true);
            if !next_breaks {
                continue;
            }
            if c == '.' && ends_in_abbreviation(&window[..at + 1]) {
                continue;
            }
            boundary = Some(at + c.len_utf8());
        }
        boundary.unwrap_or(hard_end)
    }
}

fn ends_in_abbreviation(prefix: &str) -> bool {
    ABBREVIATIONS.iter().any(|abbr| {
        prefix.ends_with(abbr)
            && prefix[..prefix.len() - abbr.len()]
                .chars()
                .next_back()
                .map(|c| !c.is_alphanumeric())
                .unwrap_or(true)
    })
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, text: &str, source_path: &str) -> Vec<TextUnit> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let lines = LineIndex::new(text);
        let mut units = Vec::new();
        let mut start = 0usize;
        while start < text.len() {
            let suffix = &text[start..];
            let end = start + self.window_len(suffix);
            let piece = &text[start..end];
            if !piece.trim().is_empty() {
                units.push(TextUnit::from_span(text, source_path, start, end, &lines));
            }
            if end >= text.len() {
                break;
            }
            start = advance_with_overlap(piece, start, end, self.overlap_tokens);
        }
        units
    }
}
