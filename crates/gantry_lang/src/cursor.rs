//! Byte cursor over DSL source text.

use crate::location::Location;

/// Cursor position in a source buffer
///
/// Lines and columns are 1-based and counted in bytes.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    src: &'a [u8],
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at the start of `src`
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Byte at `n` positions past the cursor, `0` past the end of input
    #[must_use]
    pub fn peek(&self, n: usize) -> u8 {
        self.offset
            .checked_add(n)
            .and_then(|i| self.src.get(i))
            .copied()
            .unwrap_or(0)
    }

    /// Move forward by `count` bytes, stopping at the end of input
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            let Some(&byte) = self.src.get(self.offset) else {
                return;
            };
            if byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.offset += 1;
        }
    }

    /// Current byte offset
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// True once every byte has been consumed
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.offset >= self.src.len()
    }

    /// Location of the cursor with an empty span
    #[must_use]
    pub const fn location(&self) -> Location {
        Location {
            offset: self.offset,
            line: self.line,
            column: self.column,
            size: 0,
        }
    }

    /// Close a span that started at `location` at the current position
    pub fn finish(&self, location: &mut Location) {
        location.size = self.offset.saturating_sub(location.offset);
    }

    /// Source text between two byte offsets
    #[must_use]
    pub fn text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.src.len());
        let start = start.min(end);
        String::from_utf8_lossy(&self.src[start..end]).into_owned()
    }

    /// Up to `radius` bytes either side of the cursor, for tracing
    #[must_use]
    pub fn context(&self, radius: usize) -> (String, String) {
        let before = self.text(self.offset.saturating_sub(radius), self.offset);
        let after = self.text(self.offset, self.offset.saturating_add(radius));
        (before, after)
    }
}
