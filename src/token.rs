use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Arithmetic, // + - * / div mod
    Relational, // = <> < > <= >= in is
    Logical,    // and or not xor shl shr
    Deref,      // ^
    AddressOf,  // @
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    // Statements
    Begin,
    End,
    If,
    Then,
    Else,
    For,
    To,
    Do,
    While,
    Case,
    Of,
    Repeat,
    Until,
    Record,

    // Declarations
    Function,
    Procedure,
    Program,
    Var,
    Const,
    Type,
    Uses,
    Interface,
    Implementation,
    Initialization,
    Finalization,

    // Punctuation
    Semicolon,
    Period,
    DotDot,
    Colon,
    Comma,
    Assign,
    Operator(OpKind),
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    // Literals
    Value,
    Word,

    // Ignored by the parser, kept by the formatter
    Comment,
    Directive,

    Eof,
    Error,
}

impl TokenKind {
    // Keyword lookup; `word` must already be lowercased.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "begin" => TokenKind::Begin,
            "end" => TokenKind::End,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "to" | "downto" => TokenKind::To,
            "do" => TokenKind::Do,
            "while" => TokenKind::While,
            "case" => TokenKind::Case,
            "of" => TokenKind::Of,
            "repeat" => TokenKind::Repeat,
            "until" => TokenKind::Until,
            "record" => TokenKind::Record,
            "function" => TokenKind::Function,
            "procedure" => TokenKind::Procedure,
            "program" | "unit" => TokenKind::Program,
            "var" => TokenKind::Var,
            "const" => TokenKind::Const,
            "type" => TokenKind::Type,
            "uses" => TokenKind::Uses,
            "interface" => TokenKind::Interface,
            "implementation" => TokenKind::Implementation,
            "initialization" => TokenKind::Initialization,
            "finalization" => TokenKind::Finalization,
            "div" | "mod" => TokenKind::Operator(OpKind::Arithmetic),
            "in" | "is" => TokenKind::Operator(OpKind::Relational),
            "and" | "or" | "not" | "xor" | "shl" | "shr" => TokenKind::Operator(OpKind::Logical),
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_group(&self) -> bool {
        matches!(
            self,
            TokenKind::Begin | TokenKind::Case | TokenKind::Record | TokenKind::Repeat
        )
    }

    pub fn needs_leading_space(&self) -> bool {
        !matches!(
            self,
            TokenKind::DotDot
                | TokenKind::Period
                | TokenKind::Colon
                | TokenKind::Comma
                | TokenKind::Semicolon
                | TokenKind::LeftParen
                | TokenKind::LeftBracket
                | TokenKind::RightParen
                | TokenKind::RightBracket
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            col,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}
