//! Byte spans and the per-file line index.
//!
//! Tokens, operations, and statements carry a `Span` into the source text;
//! diagnostics and the emitted `assertion_error(line)` calls resolve spans to
//! line/column through `SourceFile`.

use serde::Serialize;

/// Half-open byte range into a source file.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[inline]
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Zero-width span at a byte offset.
    #[inline]
    pub fn point(at: u32) -> Self {
        Self { start: at, end: at }
    }

    /// Smallest span covering both inputs.
    #[inline]
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    #[inline]
    pub fn range(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }

    #[inline]
    pub fn len(self) -> usize {
        (self.end - self.start) as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

/// 1-based line/column position.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// A source file with its text and a precomputed line-offset index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: String,
    text: String,
    /// Byte offset of the start of each line, first entry always 0.
    line_offsets: Vec<u32>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_offsets = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_offsets.push(i as u32 + 1);
            }
        }
        Self {
            path: path.into(),
            text,
            line_offsets,
        }
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Slice the source text for a span.
    #[inline]
    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.range()]
    }

    /// Number of lines (at least 1, even for empty input).
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    /// Map a byte offset to its 1-based line/column.
    pub fn line_col(&self, offset: u32) -> LineCol {
        let line = match self.line_offsets.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        LineCol {
            line: line as u32 + 1,
            col: offset - self.line_offsets[line] + 1,
        }
    }

    /// 1-based line number of a span's start.
    #[inline]
    pub fn line_of(&self, span: Span) -> u32 {
        self.line_col(span.start).line
    }
}
