use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            replacement: text.into(),
        }
    }

    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            replacement: text.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::replace(range, "")
    }

    pub fn apply_to(&self, text: &mut String) {
        let end = self.end.min(text.len());
        let start = self.start.min(end);
        text.replace_range(start..end, &self.replacement);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionHint {
    DataType,
}

pub const DATA_TYPES: &[&str] = &[
    "integer", "longint", "int64", "byte", "word", "cardinal", "real", "double", "extended",
    "boolean", "char", "string", "ansistring", "text",
];

// An auto-fix: edits applied in order, each against the text the previous
// ones produced, then the selection to show in the final text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub edits: Vec<TextEdit>,
    pub selection: Range<usize>,
    #[serde(default)]
    pub hint: Option<CompletionHint>,
}

impl Fix {
    pub fn single(edit: TextEdit, selection: Range<usize>) -> Self {
        Self {
            edits: vec![edit],
            selection,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: CompletionHint) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn apply_to(&self, text: &str) -> String {
        let mut out = text.to_string();
        for edit in &self.edits {
            edit.apply_to(&mut out);
        }
        out
    }
}

pub trait EditableBuffer {
    fn text(&self) -> &str;
    fn replace(&mut self, range: Range<usize>, text: &str);
    fn set_selection(&mut self, range: Range<usize>);
    fn request_focus(&mut self) {}
    fn suggest(&mut self, _hint: CompletionHint) {}
}

pub fn apply_fix<B: EditableBuffer + ?Sized>(buffer: &mut B, fix: &Fix) {
    for edit in &fix.edits {
        let len = buffer.text().len();
        let end = edit.end.min(len);
        buffer.replace(edit.start.min(end)..end, &edit.replacement);
    }
    let len = buffer.text().len();
    let end = fix.selection.end.min(len);
    buffer.set_selection(fix.selection.start.min(end)..end);
    if let Some(hint) = fix.hint {
        buffer.suggest(hint);
    }
    buffer.request_focus();
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBuffer {
    text: String,
    selection: Range<usize>,
    focused: bool,
    hint: Option<CompletionHint>,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    pub fn selected_text(&self) -> &str {
        self.text.get(self.selection.clone()).unwrap_or("")
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn hint(&self) -> Option<CompletionHint> {
        self.hint
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl EditableBuffer for SourceBuffer {
    fn text(&self) -> &str {
        &self.text
    }

    fn replace(&mut self, range: Range<usize>, text: &str) {
        self.text.replace_range(range, text);
    }

    fn set_selection(&mut self, range: Range<usize>) {
        self.selection = range;
    }

    fn request_focus(&mut self) {
        self.focused = true;
    }

    fn suggest(&mut self, hint: CompletionHint) {
        self.hint = Some(hint);
    }
}
