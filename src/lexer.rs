use crate::token::{OpKind, Token, TokenKind};
use logos::Logos;

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum LexToken {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(":=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("@")]
    At,
    #[token("=")]
    Eq,
    #[token("<>")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // 'it''s' #13#10 'next' lexes as one literal
    #[regex(r"('([^'\n]|'')*'|#[0-9]+|#\$[0-9A-Fa-f]+)+")]
    Str,
    #[regex(r"[0-9]+", number_tail)]
    Number,
    #[regex(r"\$[0-9A-Fa-f]+")]
    Hex,
    #[regex(r"%[01]+")]
    Binary,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"//[^\n]*")]
    LineComment,
    #[regex(r"\{[^}]*\}")]
    BraceComment,
    #[regex(r"\(\*([^*]|\*+[^*)])*\*+\)")]
    StarComment,
}

fn number_tail(lex: &mut logos::Lexer<LexToken>) {
    let rest = lex.remainder().as_bytes();
    let mut n = 0usize;
    if rest.len() >= 2 && rest[0] == b'.' && rest[1].is_ascii_digit() {
        n = 1;
        while n < rest.len() && rest[n].is_ascii_digit() {
            n += 1;
        }
    }
    if n < rest.len() && (rest[n] == b'e' || rest[n] == b'E') {
        let mut m = n + 1;
        if m < rest.len() && (rest[m] == b'+' || rest[m] == b'-') {
            m += 1;
        }
        if m < rest.len() && rest[m].is_ascii_digit() {
            while m < rest.len() && rest[m].is_ascii_digit() {
                m += 1;
            }
            n = m;
        }
    }
    lex.bump(n);
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    // Lexes the whole source. The result always ends with an `Eof` token;
    // unlexable input becomes `Error` tokens instead of aborting.
    pub fn lex(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut line = 1usize;
        let mut col = 1usize;
        let mut lex = LexToken::lexer(self.src);
        let mut last_end = 0usize;
        while let Some(tok) = lex.next() {
            let span = lex.span();
            advance(&self.src[last_end..span.start], &mut line, &mut col);
            let text = &self.src[span.start..span.end];
            let kind = match tok {
                Ok(LexToken::LParen) => TokenKind::LeftParen,
                Ok(LexToken::RParen) => TokenKind::RightParen,
                Ok(LexToken::LBracket) => TokenKind::LeftBracket,
                Ok(LexToken::RBracket) => TokenKind::RightBracket,
                Ok(LexToken::Comma) => TokenKind::Comma,
                Ok(LexToken::Dot) => TokenKind::Period,
                Ok(LexToken::DotDot) => TokenKind::DotDot,
                Ok(LexToken::Semicolon) => TokenKind::Semicolon,
                Ok(LexToken::Colon) => TokenKind::Colon,
                Ok(LexToken::Assign) => TokenKind::Assign,
                Ok(LexToken::Plus | LexToken::Minus | LexToken::Star | LexToken::Slash) => {
                    TokenKind::Operator(OpKind::Arithmetic)
                }
                Ok(LexToken::Caret) => TokenKind::Operator(OpKind::Deref),
                Ok(LexToken::At) => TokenKind::Operator(OpKind::AddressOf),
                Ok(
                    LexToken::Eq
                    | LexToken::Ne
                    | LexToken::Le
                    | LexToken::Ge
                    | LexToken::Lt
                    | LexToken::Gt,
                ) => TokenKind::Operator(OpKind::Relational),
                Ok(LexToken::Str | LexToken::Number | LexToken::Hex | LexToken::Binary) => {
                    TokenKind::Value
                }
                Ok(LexToken::Ident) => {
                    TokenKind::keyword(&text.to_ascii_lowercase()).unwrap_or(TokenKind::Word)
                }
                Ok(LexToken::LineComment | LexToken::StarComment) => {
                    if text.starts_with("(*$") {
                        TokenKind::Directive
                    } else {
                        TokenKind::Comment
                    }
                }
                Ok(LexToken::BraceComment) => {
                    if text.starts_with("{$") {
                        TokenKind::Directive
                    } else {
                        TokenKind::Comment
                    }
                }
                Err(_) => TokenKind::Error,
            };
            tokens.push(Token::new(kind, text, line, col));
            advance(text, &mut line, &mut col);
            last_end = span.end;
        }
        advance(&self.src[last_end..], &mut line, &mut col);
        tokens.push(Token::new(TokenKind::Eof, "", line, col));
        tokens
    }
}

fn advance(text: &str, line: &mut usize, col: &mut usize) {
    for ch in text.chars() {
        if ch == '\n' {
            *line += 1;
            *col = 1;
        } else {
            *col += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).lex().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_keywords_case_insensitive_and_keep_spelling() {
        let toks = Lexer::new("BEGIN Writeln; End.").lex();
        assert_eq!(toks[0].kind, TokenKind::Begin);
        assert_eq!(toks[0].text, "BEGIN");
        assert_eq!(toks[1].kind, TokenKind::Word);
        assert_eq!(toks[1].text, "Writeln");
        assert_eq!(toks[3].kind, TokenKind::End);
        assert_eq!(toks[3].text, "End");
        assert_eq!(toks.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn lex_ranges_and_reals() {
        assert_eq!(
            kinds("1..10 1.5 2e3"),
            vec![
                TokenKind::Value,
                TokenKind::DotDot,
                TokenKind::Value,
                TokenKind::Value,
                TokenKind::Value,
                TokenKind::Eof,
            ]
        );
        let toks = Lexer::new("x := 1.5e-3;").lex();
        assert_eq!(toks[2].text, "1.5e-3");
    }

    #[test]
    fn lex_comments_and_directives() {
        let toks = Lexer::new("{$mode objfpc} { note } (* old *) // tail\nx").lex();
        let got: Vec<_> = toks.iter().map(|t| (t.kind, t.text.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (TokenKind::Directive, "{$mode objfpc}"),
                (TokenKind::Comment, "{ note }"),
                (TokenKind::Comment, "(* old *)"),
                (TokenKind::Comment, "// tail"),
                (TokenKind::Word, "x"),
                (TokenKind::Eof, ""),
            ]
        );
        assert_eq!(toks[4].line, 2);
        assert_eq!(toks[4].col, 1);
    }

    #[test]
    fn lex_strings_and_char_codes_as_one_value() {
        let toks = Lexer::new("s := 'it''s'#13#10'ok';").lex();
        assert_eq!(toks[2].kind, TokenKind::Value);
        assert_eq!(toks[2].text, "'it''s'#13#10'ok'");
    }

    #[test]
    fn lex_operators() {
        assert_eq!(
            kinds("p^ <> @q div 2"),
            vec![
                TokenKind::Word,
                TokenKind::Operator(OpKind::Deref),
                TokenKind::Operator(OpKind::Relational),
                TokenKind::Operator(OpKind::AddressOf),
                TokenKind::Word,
                TokenKind::Operator(OpKind::Arithmetic),
                TokenKind::Value,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_comment_is_an_error_token() {
        let toks = Lexer::new("begin { never closed").lex();
        assert_eq!(toks[0].kind, TokenKind::Begin);
        assert!(toks.iter().any(|t| t.kind == TokenKind::Error));
        assert_eq!(toks.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn positions_track_columns() {
        let toks = Lexer::new("program P;\n  var x").lex();
        let var = toks.iter().find(|t| t.kind == TokenKind::Var).unwrap();
        assert_eq!((var.line, var.col), (2, 3));
    }
}
