//! Text model primitives: ranges, line starts, and indentation lookups.

pub use text_size::{TextRange, TextSize};

/// Converts a byte offset into a [`TextSize`], saturating past `u32::MAX`.
#[inline]
pub fn offset_size(offset: usize) -> TextSize {
    TextSize::try_from(offset).unwrap_or(TextSize::from(u32::MAX))
}

/// Byte-offset view of [`TextRange`] for code that indexes `str` directly.
pub trait TextRangeExt: Copy {
    /// `[start, end)`; an inverted pair yields the empty range at `start`.
    fn from_offsets(start: usize, end: usize) -> Self;
    fn from_len(start: usize, len: usize) -> Self;
    fn insertion(offset: usize) -> Self;

    fn start_offset(self) -> usize;
    fn end_offset(self) -> usize;

    fn byte_len(self) -> usize {
        self.end_offset() - self.start_offset()
    }

    fn contains_offset(self, offset: usize) -> bool {
        self.start_offset() <= offset && offset < self.end_offset()
    }

    /// Whether two ranges compete for the same text.
    ///
    /// Insertion points (empty ranges) only overlap a range they fall strictly
    /// inside, or another insertion point at the same offset.
    fn overlaps(self, other: Self) -> bool;

    /// The covered text, or `""` when the range does not fit `text`.
    fn slice(self, text: &str) -> &str;
}

impl TextRangeExt for TextRange {
    fn from_offsets(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "invalid range: {start}..{end}");
        TextRange::new(offset_size(start), offset_size(end.max(start)))
    }

    fn from_len(start: usize, len: usize) -> Self {
        TextRange::at(offset_size(start), offset_size(len))
    }

    fn insertion(offset: usize) -> Self {
        TextRange::empty(offset_size(offset))
    }

    #[inline]
    fn start_offset(self) -> usize {
        usize::from(self.start())
    }

    #[inline]
    fn end_offset(self) -> usize {
        usize::from(self.end())
    }

    fn overlaps(self, other: Self) -> bool {
        let (start, end) = (self.start(), self.end());
        match (self.is_empty(), other.is_empty()) {
            (false, false) => start < other.end() && other.start() < end,
            (true, true) => start == other.start(),
            (true, false) => other.start() < start && start < other.end(),
            (false, true) => start < other.start() && other.start() < end,
        }
    }

    fn slice(self, text: &str) -> &str {
        let slice = text.get(self.start_offset()..self.end_offset());
        debug_assert!(slice.is_some(), "range {self:?} does not fit text of length {}", text.len());
        slice.unwrap_or("")
    }
}

/// Pre-computed line start offsets for a particular text snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = Vec::with_capacity(128);
        line_starts.push(0);

        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line_starts.push(i + 1);
                    i += 1;
                }
                b'\r' => {
                    if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                        line_starts.push(i + 2);
                        i += 2;
                    } else {
                        line_starts.push(i + 1);
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }

        Self {
            line_starts,
            text_len: text.len(),
        }
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    #[inline]
    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    /// Start offset of the line containing `offset`: the greatest known line
    /// start that does not exceed it.
    pub fn line_start_at(&self, offset: usize) -> usize {
        let offset = offset.min(self.text_len);
        match self.line_starts.binary_search(&offset) {
            Ok(line) => self.line_starts[line],
            Err(insert) => self.line_starts[insert.saturating_sub(1)],
        }
    }
}

/// An immutable source snapshot shared by one cleanup pass.
#[derive(Clone, Debug)]
pub struct SourceText {
    text: String,
    lines: LineIndex,
    line_separator: &'static str,
    indent_unit: String,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = LineIndex::new(&text);
        let line_separator = detect_line_separator(&text);
        let indent_unit = detect_indent_unit(&text);
        Self {
            text,
            lines,
            line_separator,
            indent_unit,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[inline]
    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    /// Line separator used by the snapshot (`\n` when the text has none).
    #[inline]
    pub fn line_separator(&self) -> &'static str {
        self.line_separator
    }

    /// One level of indentation as used by the snapshot.
    #[inline]
    pub fn indent_unit(&self) -> &str {
        &self.indent_unit
    }

    pub fn slice(&self, range: TextRange) -> &str {
        range.slice(&self.text)
    }

    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.text.as_bytes().get(offset).copied()
    }

    /// Range between the start of the line containing `offset` and `offset`.
    pub fn indent_range(&self, offset: usize) -> TextRange {
        TextRange::from_offsets(self.lines.line_start_at(offset), offset)
    }

    /// Indentation of the line holding `offset`.
    ///
    /// Empty when something other than whitespace precedes `offset` on its line.
    pub fn indent_of(&self, offset: usize) -> &str {
        let indent = self.slice(self.indent_range(offset));
        if indent.chars().all(char::is_whitespace) {
            indent
        } else {
            ""
        }
    }
}

fn detect_line_separator(text: &str) -> &'static str {
    match text.find(['\r', '\n']) {
        Some(idx) if text[idx..].starts_with("\r\n") => "\r\n",
        Some(idx) if text.as_bytes()[idx] == b'\r' => "\r",
        _ => "\n",
    }
}

fn detect_indent_unit(text: &str) -> String {
    let mut smallest: Option<usize> = None;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with('\t') {
            return "\t".to_string();
        }
        let spaces = line.len() - line.trim_start_matches(' ').len();
        if spaces > 0 && smallest.map_or(true, |s| spaces < s) {
            smallest = Some(spaces);
        }
    }
    " ".repeat(smallest.unwrap_or(4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_rules_for_insertion_points() {
        let range = TextRange::from_offsets(2, 6);
        assert!(range.overlaps(TextRange::from_offsets(5, 8)));
        assert!(!range.overlaps(TextRange::from_offsets(6, 8)));
        assert!(range.overlaps(TextRange::insertion(4)));
        assert!(!range.overlaps(TextRange::insertion(2)));
        assert!(!range.overlaps(TextRange::insertion(6)));
        assert!(TextRange::insertion(3).overlaps(TextRange::insertion(3)));
        assert!(!TextRange::insertion(3).overlaps(TextRange::insertion(4)));
    }

    #[test]
    fn byte_offset_view_of_ranges() {
        let range = TextRange::from_len(1, 3);
        assert_eq!(range.slice("abcdef"), "bcd");
        assert_eq!((range.start_offset(), range.end_offset(), range.byte_len()), (1, 4, 3));
        assert!(range.contains_offset(3));
        assert!(!range.contains_offset(4));
    }

    #[test]
    fn line_start_lookup_handles_all_separators() {
        let index = LineIndex::new("a\r\nbc\rd\ne");
        assert_eq!(index.line_starts(), &[0, 3, 6, 8]);
        assert_eq!(index.line_start_at(0), 0);
        assert_eq!(index.line_start_at(4), 3);
        assert_eq!(index.line_start_at(6), 6);
        assert_eq!(index.line_start_at(100), 8);
    }

    #[test]
    fn indentation_is_empty_when_code_precedes() {
        let source = SourceText::new("class A {\n    int x; int y;\n}");
        let x = source.as_str().find("int x").unwrap();
        let y = source.as_str().find("int y").unwrap();
        assert_eq!(source.indent_of(x), "    ");
        assert_eq!(source.indent_of(y), "");
        assert_eq!(source.indent_unit(), "    ");
        assert_eq!(source.line_separator(), "\n");
    }

    #[test]
    fn detects_tabs_and_crlf() {
        let source = SourceText::new("class A {\r\n\tint x;\r\n}");
        assert_eq!(source.indent_unit(), "\t");
        assert_eq!(source.line_separator(), "\r\n");
    }
}
