// SPDX-License-Identifier: MIT
// Token-driven indenter for Pascal source

use crate::lexer::Lexer;
use crate::token::{OpKind, Token, TokenKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

const STATEMENT_STOPS: [TokenKind; 10] = [
    TokenKind::Begin,
    TokenKind::If,
    TokenKind::Then,
    TokenKind::Do,
    TokenKind::For,
    TokenKind::To,
    TokenKind::Case,
    TokenKind::Repeat,
    TokenKind::Until,
    TokenKind::While,
];

const DECLARE_STOPS: [TokenKind; 10] = [
    TokenKind::Var,
    TokenKind::Const,
    TokenKind::Uses,
    TokenKind::Function,
    TokenKind::Type,
    TokenKind::Procedure,
    TokenKind::Implementation,
    TokenKind::Interface,
    TokenKind::Semicolon,
    TokenKind::Period,
];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterOptions {
    pub indent_size: usize,
    pub max_blank_lines: usize,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            indent_size: 2,
            max_blank_lines: 1,
        }
    }
}

pub fn format_source(src: &str) -> String {
    format_source_with_options(src, &FormatterOptions::default())
}

pub fn format_source_with_options(src: &str, opts: &FormatterOptions) -> String {
    let toks = Lexer::new(src).lex();
    format_tokens(&toks, opts)
}

// Formats an already lexed token sequence. Lexing the result again yields
// the same tokens minus any `Error` markers.
pub fn format_tokens(toks: &[Token], opts: &FormatterOptions) -> String {
    let mut out = String::new();
    let mut indenter = Indenter {
        cur: TokenCursor::new(toks),
        opts,
    };
    while let Some(tok) = indenter.cur.take() {
        indenter.process_next(0, tok, &mut out);
    }
    debug!(tokens = toks.len(), "formatted token stream");
    finish(&out, opts)
}

struct TokenCursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenCursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).filter(|t| t.kind != TokenKind::Eof)
    }

    fn take(&mut self) -> Option<&'t Token> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn peek_is_any(&self, kinds: &[TokenKind]) -> bool {
        self.peek().is_some_and(|t| kinds.contains(&t.kind))
    }
}

struct Indenter<'t, 'o> {
    cur: TokenCursor<'t>,
    opts: &'o FormatterOptions,
}

impl<'t, 'o> Indenter<'t, 'o> {
    fn process_next(&mut self, depth: usize, tok: &'t Token, out: &mut String) {
        match tok.kind {
            TokenKind::Eof | TokenKind::Error => {}
            TokenKind::Begin => self.compound_statement(depth, tok, out),
            TokenKind::If => self.if_statement(depth, tok, out),
            TokenKind::Case => self.case_statement(depth, tok, out),
            TokenKind::Repeat => self.repeat_until(depth, tok, out),
            TokenKind::Record => self.record(depth, tok, out),
            TokenKind::For => self.for_statement(depth, tok, out),
            TokenKind::While => self.while_statement(depth, tok, out),
            TokenKind::Function | TokenKind::Procedure => self.routine_header(depth, tok, out),
            TokenKind::Var
            | TokenKind::Type
            | TokenKind::Const
            | TokenKind::Uses
            | TokenKind::Interface
            | TokenKind::Implementation
            | TokenKind::Initialization
            | TokenKind::Finalization => self.declare_section(depth, tok, out),
            TokenKind::Program => {
                self.write_indent(out, depth);
                out.push_str(&tok.text);
                out.push(' ');
                self.line_command(depth, false, &[TokenKind::Semicolon], out);
            }
            TokenKind::Semicolon | TokenKind::Comment | TokenKind::Directive => {
                out.push_str(&tok.text);
                out.push('\n');
            }
            TokenKind::Word
            | TokenKind::Value
            | TokenKind::End
            | TokenKind::RightParen
            | TokenKind::RightBracket => {
                out.push_str(&tok.text);
                self.space_before_next(out);
            }
            TokenKind::Operator(OpKind::Deref | OpKind::AddressOf) => {
                out.push_str(&tok.text);
                if !self.cur.peek_is_any(&[TokenKind::Word, TokenKind::Value]) {
                    self.space_before_next(out);
                }
            }
            TokenKind::DotDot
            | TokenKind::Period
            | TokenKind::LeftParen
            | TokenKind::LeftBracket => out.push_str(&tok.text),
            TokenKind::Else
            | TokenKind::Then
            | TokenKind::To
            | TokenKind::Do
            | TokenKind::Of
            | TokenKind::Until
            | TokenKind::Colon
            | TokenKind::Comma
            | TokenKind::Assign
            | TokenKind::Operator(_) => {
                out.push_str(&tok.text);
                out.push(' ');
            }
        }
    }

    fn space_before_next(&self, out: &mut String) {
        match self.cur.peek() {
            Some(next) if next.kind == TokenKind::Operator(OpKind::Deref) => {}
            Some(next) if next.kind.needs_leading_space() => out.push(' '),
            _ => {}
        }
    }

    // Consumes one statement: tokens up to (not including) the first stop
    // token. Comments always stop it. A leading `begin`/`case`/`record`/
    // `repeat` is formatted as a whole construct instead.
    fn line_command(&mut self, depth: usize, tab: bool, stop: &[TokenKind], out: &mut String) {
        while let Some(tok) = self
            .cur
            .peek()
            .filter(|t| matches!(t.kind, TokenKind::Comment | TokenKind::Directive))
        {
            self.cur.take();
            if tab && at_line_start(out) {
                self.write_indent(out, depth);
            }
            out.push_str(&tok.text);
            out.push('\n');
        }
        let group = self.cur.peek().is_some_and(|t| t.kind.is_group());
        if tab && !group {
            self.write_indent(out, depth);
        }
        if group && !self.stops(stop) {
            if let Some(tok) = self.cur.take() {
                self.process_next(depth, tok, out);
            }
            return;
        }
        while !self.stops(stop) {
            match self.cur.take() {
                Some(tok) => self.process_next(depth, tok, out),
                None => break,
            }
        }
    }

    fn stops(&self, stop: &[TokenKind]) -> bool {
        match self.cur.peek() {
            None => true,
            Some(t) => t.kind == TokenKind::Comment || stop.contains(&t.kind),
        }
    }

    fn take_semicolon(&mut self, out: &mut String) {
        if let Some(tok) = self.cur.peek().filter(|t| t.kind == TokenKind::Semicolon) {
            self.cur.take();
            out.push_str(&tok.text);
            out.push('\n');
        }
    }

    // `end` goes on its own line at `depth`; it ends the line unless a `;`,
    // `.` or `else` follows.
    fn closing_end(&mut self, depth: usize, out: &mut String) {
        if let Some(end) = self.cur.peek().filter(|t| t.kind == TokenKind::End) {
            self.cur.take();
            ensure_newline(out);
            self.write_indent(out, depth);
            out.push_str(&end.text);
            if !self.cur.peek_is_any(&[TokenKind::Semicolon, TokenKind::Period, TokenKind::Else])
            {
                out.push('\n');
            }
        }
    }

    fn compound_statement(&mut self, depth: usize, tok: &Token, out: &mut String) {
        let start = out.len();
        out.push('\n');
        self.write_indent(out, depth);
        out.push_str(&tok.text);
        out.push('\n');
        while self.cur.peek().is_some() && !self.cur.peek_is(TokenKind::End) {
            self.line_command(depth + 1, true, &[TokenKind::Semicolon, TokenKind::End], out);
            self.take_semicolon(out);
        }
        out.push('\n');
        self.closing_end(depth, out);
        collapse_blank_lines(out, start);
    }

    fn if_statement(&mut self, depth: usize, tok: &Token, out: &mut String) {
        out.push_str(&tok.text);
        out.push(' ');
        self.line_command(
            depth + 1,
            false,
            &[TokenKind::Then, TokenKind::Else, TokenKind::Semicolon],
            out,
        );
        if let Some(then) = self.cur.peek().filter(|t| t.kind == TokenKind::Then) {
            self.cur.take();
            out.push_str(&then.text);
            out.push('\n');
            self.line_command(depth + 1, true, &[TokenKind::Else, TokenKind::Semicolon], out);
        }
        if let Some(els) = self.cur.peek().filter(|t| t.kind == TokenKind::Else) {
            self.cur.take();
            ensure_newline(out);
            self.write_indent(out, depth);
            out.push_str(&els.text);
            out.push(' ');
            if self.cur.peek_is(TokenKind::If) {
                self.line_command(depth, false, &[TokenKind::Semicolon], out);
            } else {
                out.push('\n');
                self.line_command(depth + 1, true, &[TokenKind::If, TokenKind::Semicolon], out);
            }
        }
    }

    fn for_statement(&mut self, depth: usize, tok: &Token, out: &mut String) {
        out.push_str(&tok.text);
        out.push(' ');
        self.line_command(depth, false, &[TokenKind::Semicolon, TokenKind::Do], out);
        if let Some(tok) = self.cur.peek().filter(|t| t.kind == TokenKind::Do) {
            self.cur.take();
            self.do_body(depth, tok, out);
        }
    }

    fn while_statement(&mut self, depth: usize, tok: &Token, out: &mut String) {
        out.push_str(&tok.text);
        out.push(' ');
        while let Some(next) = self.cur.peek() {
            if matches!(next.kind, TokenKind::Do | TokenKind::Semicolon) {
                break;
            }
            self.cur.take();
            self.process_next(depth, next, out);
        }
        if let Some(tok) = self.cur.peek().filter(|t| t.kind == TokenKind::Do) {
            self.cur.take();
            self.do_body(depth, tok, out);
        }
    }

    fn do_body(&mut self, depth: usize, tok: &Token, out: &mut String) {
        out.push_str(&tok.text);
        out.push('\n');
        self.line_command(depth + 1, true, &[TokenKind::Semicolon], out);
    }

    fn case_statement(&mut self, depth: usize, tok: &Token, out: &mut String) {
        self.write_indent(out, depth);
        out.push_str(&tok.text);
        out.push(' ');
        self.line_command(depth, false, &[TokenKind::Of], out);
        if let Some(of) = self.cur.peek().filter(|t| t.kind == TokenKind::Of) {
            self.cur.take();
            out.push_str(&of.text);
            out.push('\n');
        }
        let arm_stops = [TokenKind::Semicolon, TokenKind::End, TokenKind::Else];
        while self.cur.peek().is_some() && !self.cur.peek_is_any(&[TokenKind::End, TokenKind::Else])
        {
            self.line_command(depth + 1, true, &arm_stops, out);
            self.take_semicolon(out);
        }
        if let Some(els) = self.cur.peek().filter(|t| t.kind == TokenKind::Else) {
            self.cur.take();
            ensure_newline(out);
            self.write_indent(out, depth);
            out.push_str(&els.text);
            out.push('\n');
            self.statement_list(depth + 1, TokenKind::End, out);
        }
        self.closing_end(depth, out);
    }

    fn record(&mut self, depth: usize, tok: &Token, out: &mut String) {
        out.push_str(&tok.text);
        out.push('\n');
        self.statement_list(depth + 1, TokenKind::End, out);
        self.closing_end(depth, out);
    }

    fn repeat_until(&mut self, depth: usize, tok: &Token, out: &mut String) {
        self.write_indent(out, depth);
        out.push_str(&tok.text);
        out.push('\n');
        self.statement_list(depth + 1, TokenKind::Until, out);
        if let Some(until) = self.cur.peek().filter(|t| t.kind == TokenKind::Until) {
            self.cur.take();
            ensure_newline(out);
            self.write_indent(out, depth);
            out.push_str(&until.text);
            out.push(' ');
            self.line_command(depth, false, &[TokenKind::Semicolon], out);
        }
    }

    fn statement_list(&mut self, depth: usize, terminator: TokenKind, out: &mut String) {
        while self.cur.peek().is_some() && !self.cur.peek_is(terminator) {
            self.line_command(depth, true, &[TokenKind::Semicolon, terminator], out);
            self.take_semicolon(out);
        }
    }

    fn declare_section(&mut self, depth: usize, tok: &Token, out: &mut String) {
        out.push('\n');
        self.write_indent(out, depth);
        out.push_str(&tok.text);
        out.push('\n');
        let stops: Vec<TokenKind> = STATEMENT_STOPS
            .iter()
            .chain(DECLARE_STOPS.iter())
            .copied()
            .collect();
        while self.cur.peek().is_some_and(|t| {
            matches!(
                t.kind,
                TokenKind::Word | TokenKind::Operator(_) | TokenKind::Comment
            )
        }) {
            self.line_command(depth + 1, true, &stops, out);
            self.take_semicolon(out);
        }
        out.push('\n');
    }

    fn routine_header(&mut self, depth: usize, tok: &Token, out: &mut String) {
        self.write_indent(out, depth);
        out.push_str(&tok.text);
        out.push(' ');
        while !self.stops(&[TokenKind::Semicolon]) {
            match self.cur.take() {
                Some(open) if open.kind == TokenKind::LeftParen => self.parameter_list(open, out),
                Some(next) => self.process_next(depth, next, out),
                None => break,
            }
        }
        self.take_semicolon(out);
    }

    // Parameters stay on the header line; `var`, `const` and `;` inside them
    // are plain words.
    fn parameter_list(&mut self, open: &Token, out: &mut String) {
        out.push_str(&open.text);
        let mut nesting = 1usize;
        while let Some(tok) = self.cur.take() {
            match tok.kind {
                TokenKind::LeftParen => {
                    nesting += 1;
                    out.push_str(&tok.text);
                }
                TokenKind::RightParen => {
                    nesting -= 1;
                    out.push_str(&tok.text);
                    self.space_before_next(out);
                    if nesting == 0 {
                        return;
                    }
                }
                TokenKind::Semicolon => {
                    out.push_str(&tok.text);
                    out.push(' ');
                }
                TokenKind::Comment | TokenKind::Directive if tok.text.starts_with("//") => {
                    out.push_str(&tok.text);
                    out.push('\n');
                }
                TokenKind::Word
                | TokenKind::Value
                | TokenKind::Colon
                | TokenKind::Comma
                | TokenKind::Assign
                | TokenKind::Operator(_)
                | TokenKind::DotDot
                | TokenKind::Period
                | TokenKind::LeftBracket
                | TokenKind::RightBracket
                | TokenKind::Error => self.process_next(0, tok, out),
                _ => {
                    out.push_str(&tok.text);
                    self.space_before_next(out);
                }
            }
        }
    }

    fn write_indent(&self, out: &mut String, depth: usize) {
        write_indent(out, depth, self.opts.indent_size);
    }
}

fn at_line_start(out: &str) -> bool {
    out.is_empty() || out.ends_with('\n')
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn collapse_blank_lines(out: &mut String, from: usize) {
    let tail = out.split_off(from);
    let mut collapsed = String::with_capacity(tail.len());
    for ch in tail.chars() {
        if ch == '\n' {
            if let Some(line_start) = collapsed.rfind('\n').map(|i| i + 1) {
                if collapsed[line_start..].trim().is_empty() {
                    collapsed.truncate(line_start);
                    continue;
                }
            }
        }
        collapsed.push(ch);
    }
    out.push_str(&collapsed);
}

fn finish(raw: &str, opts: &FormatterOptions) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blanks = 0usize;
    for line in raw.split('\n') {
        let line = line.trim_end();
        if line.is_empty() {
            blanks += 1;
            continue;
        }
        if !out.is_empty() {
            for _ in 0..blanks.min(opts.max_blank_lines) {
                out.push('\n');
            }
        }
        blanks = 0;
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn write_indent(out: &mut String, indent: usize, indent_size: usize) {
    for _ in 0..(indent * indent_size) {
        out.push(' ');
    }
}
