use unicode_segmentation::UnicodeSegmentation;

use crate::fault::LineInfo;

pub struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, starts }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    pub fn line_start(&self, line: usize) -> usize {
        self.starts
            .get(line)
            .copied()
            .unwrap_or(self.text.len())
    }

    // Includes the line break.
    pub fn line_end(&self, line: usize) -> usize {
        self.starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.text.len())
    }

    pub fn line_text(&self, line: usize) -> &'a str {
        let text = &self.text[self.line_start(line)..self.line_end(line)];
        text.trim_end_matches(&['\n', '\r'][..])
    }

    // Columns count grapheme clusters; past the line end they clamp to it.
    pub fn offset(&self, at: LineInfo) -> usize {
        let start = self.line_start(at.line);
        let content = self.line_text(at.line);
        let within: usize = content
            .graphemes(true)
            .take(at.column)
            .map(str::len)
            .sum();
        start + within
    }

    // The column in UTF-16 code units, as LSP clients count them.
    pub fn utf16_column(&self, at: LineInfo) -> usize {
        let start = self.line_start(at.line);
        self.text[start..self.offset(at)].encode_utf16().count()
    }
}
