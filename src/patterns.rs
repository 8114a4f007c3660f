use std::sync::LazyLock;

use regex::{Captures, Regex};

// Patterns run over `code_only` text, so keywords in comments, strings and
// parameter lists never match.

pub static PROGRAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bprogram\b[^;]*;").expect("valid PROGRAM pattern"));

pub static USES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\buses\b[^;]*;").expect("valid USES pattern"));

pub static VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bvar\b").expect("valid VAR pattern"));

pub static CONST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bconst\b").expect("valid CONST pattern"));

pub static TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btype\b").expect("valid TYPE pattern"));

pub static SECTION_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(begin|var|const|type|uses|procedure|function|implementation|initialization|finalization)\b",
    )
    .expect("valid SECTION_BREAK pattern")
});

pub static BODY_BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^begin\b").expect("valid BODY_BEGIN pattern"));

// A routine header at the very start of the text.
pub static ROUTINE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\A\s*(?:procedure|function)\b[^;]*;").expect("valid ROUTINE_HEADER pattern")
});

// %t, %v
pub static REPLACE_CURSOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\w").expect("valid REPLACE_CURSOR pattern"));

static NON_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{.*?\}|\(\*.*?\*\)|//[^\n]*|'(?:[^'\n]|'')*'")
        .expect("valid NON_CODE pattern")
});

// `text` with comments, string contents and everything inside parentheses
// blanked out. Byte offsets and line breaks are unchanged, so match ranges
// index the original text.
pub fn code_only(text: &str) -> String {
    let blanked = NON_CODE.replace_all(text, |caps: &Captures<'_>| {
        let m = &caps[0];
        if m.len() >= 2 && m.starts_with('\'') {
            format!("'{}'", blank(&m[1..m.len() - 1]))
        } else {
            blank(m)
        }
    });
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in blanked.chars() {
        match ch {
            '(' => {
                depth += 1;
                out.push(if depth == 1 { '(' } else { ' ' });
            }
            ')' if depth > 0 => {
                depth -= 1;
                out.push(if depth == 0 { ')' } else { ' ' });
            }
            '\n' => out.push('\n'),
            _ if depth > 0 => out.push_str(&" ".repeat(ch.len_utf8())),
            _ => out.push(ch),
        }
    }
    out
}

fn blank(s: &str) -> String {
    s.chars()
        .map(|ch| match ch {
            '\n' => "\n".to_string(),
            _ => " ".repeat(ch.len_utf8()),
        })
        .collect()
}

// `var ... name : type;` with the type in group `ty`.
pub fn var_declaration(name: &str) -> Regex {
    declaration("var", name)
}

pub fn typed_const_declaration(name: &str) -> Regex {
    let name = regex::escape(name);
    Regex::new(&format!(
        r"(?is)(?:^|\s)const\s.*?\b{name}\b\s*:(?P<ty>[^=;]*?)=[^;]*;"
    ))
    .expect("valid const declaration pattern")
}

pub fn function_header(name: &str) -> Regex {
    let name = regex::escape(name);
    Regex::new(&format!(
        r"(?i)(?:^|\s)function\s+{name}\s*(?:\([^)]*\))?\s*:(?P<ty>[^;]*);"
    ))
    .expect("valid function header pattern")
}

pub fn const_entry(name: &str) -> Regex {
    let name = regex::escape(name);
    Regex::new(&format!(
        r"(?is)\b{name}\b\s*(?::\s*(?P<ty>[^=;]*?)\s*)?=\s*(?P<value>[^;]*?)\s*;"
    ))
    .expect("valid const entry pattern")
}

fn declaration(keyword: &str, name: &str) -> Regex {
    let name = regex::escape(name);
    Regex::new(&format!(
        r"(?is)(?:^|\s){keyword}\s.*?\b{name}\b\s*:(?P<ty>[^;=]*);"
    ))
    .expect("valid declaration pattern")
}
