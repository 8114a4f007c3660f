use std::ops::Range;

use regex::{Match, Regex};
use tracing::debug;

use crate::edit::{apply_fix, CompletionHint, EditableBuffer, Fix, TextEdit};
use crate::fault::{Access, AccessKind, DefineKind, Fault, GroupingKind, LineInfo, Scope, ScopeSpan};
use crate::line_index::LineIndex;
use crate::patterns;

pub const TAB: &str = "    ";

// A slice of the buffer plus the absolute offset of its first byte. Anchors
// are searched in `code`, the same slice with non-code blanked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow<'a> {
    pub text: &'a str,
    pub code: String,
    pub offset: usize,
}

impl<'a> TextWindow<'a> {
    pub fn new(text: &'a str, offset: usize) -> Self {
        Self {
            text,
            code: patterns::code_only(text),
            offset,
        }
    }

    fn absolute(&self, range: Range<usize>) -> Range<usize> {
        self.offset + range.start..self.offset + range.end
    }
}

// From `span.start` to the end of `span.end`'s line.
pub fn text_window(text: &str, span: ScopeSpan) -> TextWindow<'_> {
    let index = LineIndex::new(text);
    let end = index.line_end(span.end.line);
    let start = index.offset(span.start).min(end);
    TextWindow::new(&text[start..end], start)
}

pub fn compute_fix(text: &str, fault: &Fault) -> Option<Fix> {
    debug!(fault = fault.name(), "computing auto-fix");
    match fault {
        Fault::TypeIdentifierExpected {
            scope,
            at,
            missing_type,
        } => fix_missing_type(text, ScopeSpan::new(scope.start, *at), missing_type),
        Fault::UnknownIdentifier {
            scope,
            at,
            name,
            fit,
        } => fix_missing_define(text, ScopeSpan::new(scope.start, *at), name, *fit),
        Fault::UnconvertibleType {
            scope,
            at,
            identifier,
            value,
            value_type,
            target_type,
        } => fix_unconvertible_type(
            text,
            scope,
            *at,
            identifier.as_ref(),
            value.as_ref(),
            value_type,
            target_type,
        ),
        Fault::MissingToken { at, token } => Some(insert_token(text, *at, token)),
        Fault::Grouping { grouping, .. } => fix_group_exception(text, *grouping),
        Fault::ChangeValueOfConstant {
            scope,
            at,
            name,
            value,
            value_type,
        } => change_const_to_var(
            text,
            ScopeSpan::new(scope.start, *at),
            name,
            value.as_deref(),
            value_type.as_deref(),
        ),
        Fault::ProgramNotFound => Some(fix_program_not_found(text)),
        Fault::ExpectedToken {
            at,
            current,
            expected,
            insert,
        } => fix_expect_token(text, *at, current, expected, *insert),
    }
}

pub struct AutoFix<'b, B: EditableBuffer + ?Sized> {
    buffer: &'b mut B,
}

impl<'b, B: EditableBuffer + ?Sized> AutoFix<'b, B> {
    pub fn new(buffer: &'b mut B) -> Self {
        Self { buffer }
    }

    // Returns whether the buffer was changed.
    pub fn fix(&mut self, fault: &Fault) -> bool {
        match compute_fix(self.buffer.text(), fault) {
            Some(fix) => {
                apply_fix(self.buffer, &fix);
                true
            }
            None => {
                debug!(fault = fault.name(), "no anchor found, buffer left untouched");
                false
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Place {
    After,
    Before,
    // After the last declaration of the section the match opens.
    AfterSection,
}

// First matching anchor wins.
fn find_anchor(text: &str, anchors: &[(&Regex, Place)]) -> Option<usize> {
    anchors.iter().find_map(|(re, place)| {
        re.find(text).map(|m| match place {
            Place::After => m.end(),
            Place::Before => m.start(),
            Place::AfterSection => section_end(text, m.end()),
        })
    })
}

fn section_limit(text: &str, from: usize) -> usize {
    patterns::SECTION_BREAK
        .find_at(text, from)
        .map_or(text.len(), |m| m.start())
}

fn section_end(text: &str, from: usize) -> usize {
    let limit = section_limit(text, from);
    text[from..limit].rfind(';').map_or(from, |i| from + i + 1)
}

// Without a marker the template is returned as is, with an empty range at its end.
fn expand(template: &str, fill: &str) -> (String, Range<usize>) {
    let Some(marker) = patterns::REPLACE_CURSOR.find(template) else {
        return (template.to_string(), template.len()..template.len());
    };
    let mut text = String::with_capacity(template.len() + fill.len());
    text.push_str(&template[..marker.start()]);
    let start = text.len();
    text.push_str(fill);
    let end = text.len();
    text.push_str(&template[marker.end()..]);
    (text, start..end)
}

fn insertion(window: &TextWindow<'_>, at: usize, template: &str, fill: &str) -> Fix {
    let (text, selection) = expand(template, fill);
    let at = window.offset + at;
    Fix::single(
        TextEdit::insert(at, text),
        at + selection.start..at + selection.end,
    )
}

pub fn fix_missing_type(text: &str, span: ScopeSpan, name: &str) -> Option<Fix> {
    let window = text_window(text, span);
    let (at, template) = match patterns::TYPE.find(&window.code) {
        Some(header) => (header.end(), format!("\n{TAB}{name} = %t;")),
        None => {
            let at = find_anchor(
                &window.code,
                &[
                    (&*patterns::PROGRAM, Place::After),
                    (&*patterns::VAR, Place::Before),
                    (&*patterns::USES, Place::After),
                ],
            )
            .unwrap_or(0);
            (at, format!("\ntype\n{TAB}{name} = %t;\n"))
        }
    };
    Some(insertion(&window, at, &template, "").with_hint(CompletionHint::DataType))
}

pub fn fix_missing_define(text: &str, span: ScopeSpan, name: &str, fit: DefineKind) -> Option<Fix> {
    debug!(name, ?fit, "declaring missing identifier");
    match fit {
        DefineKind::Var => Some(declare_var(text, span, name, "", None)),
        DefineKind::Const => Some(declare_const(text, span, name)),
        DefineKind::Function => declare_function(text, span, name),
        DefineKind::Procedure => None,
    }
}

pub fn declare_var(
    text: &str,
    span: ScopeSpan,
    name: &str,
    ty: &str,
    init: Option<&str>,
) -> Fix {
    declare_var_in(&text_window(text, span), name, ty, init)
}

fn declare_var_in(window: &TextWindow<'_>, name: &str, ty: &str, init: Option<&str>) -> Fix {
    let decl = match init {
        Some(value) => format!("{name}: %t = {value};"),
        None => format!("{name}: %t;"),
    };
    let (at, template) = match patterns::VAR.find(&window.code) {
        Some(header) => (header.end(), format!("\n{TAB}{decl}")),
        None => (
            declaration_anchor(window),
            format!("\nvar\n{TAB}{decl}\n"),
        ),
    };
    insertion(window, at, &template, ty).with_hint(CompletionHint::DataType)
}

pub fn declare_const(text: &str, span: ScopeSpan, name: &str) -> Fix {
    let window = text_window(text, span);
    let (at, template) = match patterns::CONST.find(&window.code) {
        Some(header) => (header.end(), format!("\n{TAB}{name} = %v;")),
        None => (
            declaration_anchor(&window),
            format!("\nconst\n{TAB}{name} = %v;\n"),
        ),
    };
    insertion(&window, at, &template, "")
}

// After the `type` section, else the `uses` clause, else the `program`
// statement, else the header of the routine the window opens with, else the
// window start.
fn declaration_anchor(window: &TextWindow<'_>) -> usize {
    let mut anchors = vec![
        (&*patterns::TYPE, Place::AfterSection),
        (&*patterns::USES, Place::After),
        (&*patterns::PROGRAM, Place::After),
    ];
    // A window at the file start is the program's, whatever it opens with.
    if window.offset > 0 {
        anchors.push((&*patterns::ROUTINE_HEADER, Place::After));
    }
    find_anchor(&window.code, &anchors).unwrap_or(0)
}

fn declare_function(text: &str, span: ScopeSpan, name: &str) -> Option<Fix> {
    let window = text_window(text, span);
    let Some(body) = patterns::BODY_BEGIN.find_iter(&window.code).last() else {
        debug!(name, "no body `begin` to put the function before");
        return None;
    };
    let template = format!("function {name}: %t;\nbegin\nend;\n\n");
    Some(insertion(&window, body.start(), &template, "").with_hint(CompletionHint::DataType))
}

// The assignee's declaration changes if it has one, else the value's.
pub fn fix_unconvertible_type(
    text: &str,
    scope: &Scope,
    at: LineInfo,
    identifier: Option<&Access>,
    value: Option<&Access>,
    value_type: &str,
    target_type: &str,
) -> Option<Fix> {
    let window = text_window(text, ScopeSpan::new(scope.start, at));
    let (access, new_type) = match (identifier, value) {
        (Some(id), _) if id.kind != AccessKind::Other => (id, value_type),
        (_, Some(v)) if v.kind != AccessKind::Other => (v, target_type),
        _ => return None,
    };
    let Some(name) = access.name.as_deref() else {
        debug!("operand is not an identifier");
        return None;
    };
    let pattern = match access.kind {
        AccessKind::Variable => {
            let is_result = scope
                .function
                .as_deref()
                .is_some_and(|f| f.eq_ignore_ascii_case(name));
            if is_result {
                patterns::function_header(name)
            } else {
                patterns::var_declaration(name)
            }
        }
        AccessKind::Constant => patterns::typed_const_declaration(name),
        AccessKind::Other => return None,
    };
    change_declared_type(&window, &pattern, new_type)
}

fn change_declared_type(window: &TextWindow<'_>, pattern: &Regex, new_type: &str) -> Option<Fix> {
    let Some(ty) = pattern.captures(&window.code).and_then(|c| c.name("ty")) else {
        debug!(pattern = pattern.as_str(), "declaration not found");
        return None;
    };
    let (range, replacement, lead) = match trimmed(ty) {
        Some(range) => (range, new_type.to_string(), 0),
        None => (ty.range(), format!(" {new_type}"), 1),
    };
    let range = window.absolute(range);
    let start = range.start + lead;
    Some(
        Fix::single(
            TextEdit::replace(range, replacement),
            start..start + new_type.len(),
        )
        .with_hint(CompletionHint::DataType),
    )
}

fn trimmed(m: Match<'_>) -> Option<Range<usize>> {
    let s = m.as_str();
    let body = s.trim();
    if body.is_empty() {
        return None;
    }
    let lead = s.len() - s.trim_start().len();
    let start = m.start() + lead;
    Some(start..start + body.len())
}

pub fn insert_token(text: &str, at: LineInfo, token: &str) -> Fix {
    let pos = LineIndex::new(text).offset(at);
    Fix::single(TextEdit::insert(pos, token), pos..pos + token.len())
}

// Initializer and type come from the payload when known, else from the
// declaration itself.
pub fn change_const_to_var(
    text: &str,
    span: ScopeSpan,
    name: &str,
    value: Option<&str>,
    value_type: Option<&str>,
) -> Option<Fix> {
    let window = text_window(text, span);
    let entry_re = patterns::const_entry(name);
    let found = patterns::CONST.find_iter(&window.code).find_map(|header| {
        let limit = section_limit(&window.code, header.end());
        let caps = entry_re.captures_at(&window.code, header.end())?;
        let whole = caps.get(0)?;
        (whole.end() <= limit).then_some((header, limit, caps))
    });
    let Some((header, limit, caps)) = found else {
        debug!(name, "constant declaration not found");
        return None;
    };
    let whole = caps.get(0)?;
    let init = value
        .map(str::to_string)
        .or_else(|| caps.name("value").map(|m| window.text[m.range()].to_string()));
    let ty = value_type
        .map(str::to_string)
        .or_else(|| caps.name("ty").map(|m| window.text[m.range()].trim().to_string()))
        .unwrap_or_default();

    let removed = deletion_range(window.text, header, limit, whole);
    let delete = TextEdit::delete(window.absolute(removed.clone()));
    let mut after = text.to_string();
    delete.apply_to(&mut after);

    let window_end = window.offset + window.text.len() - removed.len();
    let shrunk = TextWindow::new(&after[window.offset..window_end], window.offset);
    let declare = declare_var_in(&shrunk, name, &ty, init.as_deref());
    let mut edits = vec![delete];
    edits.extend(declare.edits);
    Some(Fix {
        edits,
        selection: declare.selection,
        hint: declare.hint,
    })
}

// The declaration's line (or just the declaration when it shares a line),
// widened to the whole section when nothing else is left in it.
fn deletion_range(text: &str, header: Match<'_>, limit: usize, entry: Match<'_>) -> Range<usize> {
    let bytes = text.as_bytes();
    let mut start = entry.start();
    while start > header.end() && matches!(bytes[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    let mut end = entry.end();
    while end < bytes.len() && matches!(bytes[end], b' ' | b'\t' | b'\r') {
        end += 1;
    }
    let own_line = start == 0 || bytes[start - 1] == b'\n';
    if own_line && end < bytes.len() && bytes[end] == b'\n' {
        end += 1;
    }
    let rest_before = &text[header.end()..start];
    let rest_after = &text[end.min(limit)..limit];
    if rest_before.trim().is_empty() && rest_after.trim().is_empty() {
        start = header.start();
    }
    start..end
}

pub fn fix_group_exception(text: &str, grouping: GroupingKind) -> Option<Fix> {
    if grouping != GroupingKind::UnfinishedBeginEnd {
        debug!(?grouping, "no fix for grouping fault");
        return None;
    }
    let at = text.len();
    // Select `end` without its newline.
    Some(Fix::single(TextEdit::insert(at, "\nend"), at + 1..at + 4))
}

// The cursor lands on the empty line of the new block.
pub fn fix_program_not_found(text: &str) -> Fix {
    let skeleton = "\nbegin\n    \nend.\n";
    let cursor = text.len() + skeleton.len() - "\nend.\n".len();
    Fix::single(TextEdit::insert(text.len(), skeleton), cursor..cursor)
}

pub fn fix_expect_token(
    text: &str,
    at: LineInfo,
    current: &str,
    expected: &str,
    insert: bool,
) -> Option<Fix> {
    let index = LineIndex::new(text);
    let from = index.offset(at);
    let line_end = index.line_start(at.line) + index.line_text(at.line).len();
    let Some(found) = text[from..line_end].find(current) else {
        debug!(current, line = at.line, "token not found on line");
        return None;
    };
    let start = from + found;
    let fix = if insert {
        let padded = format!(" {expected} ");
        let len = padded.len();
        Fix::single(TextEdit::insert(start, padded), start..start + len)
    } else {
        Fix::single(
            TextEdit::replace(start..start + current.len(), expected),
            start..start + expected.len(),
        )
    };
    Some(fix)
}
