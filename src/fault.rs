use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineInfo {
    pub line: usize,
    #[serde(default)]
    pub column: usize,
}

impl LineInfo {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scope {
    pub start: LineInfo,
    // Set when the scope is a function body; its result variable shares the name.
    #[serde(default)]
    pub function: Option<String>,
}

impl Scope {
    pub fn program() -> Self {
        Self::default()
    }

    pub fn function(start: LineInfo, name: impl Into<String>) -> Self {
        Self {
            start,
            function: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeSpan {
    pub start: LineInfo,
    pub end: LineInfo,
}

impl ScopeSpan {
    pub fn new(start: LineInfo, end: LineInfo) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefineKind {
    Var,
    Const,
    Function,
    Procedure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Variable,
    Constant,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    pub kind: AccessKind,
    #[serde(default)]
    pub name: Option<String>,
}

impl Access {
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            kind: AccessKind::Variable,
            name: Some(name.into()),
        }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self {
            kind: AccessKind::Constant,
            name: Some(name.into()),
        }
    }

    pub fn other() -> Self {
        Self {
            kind: AccessKind::Other,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingKind {
    UnfinishedBeginEnd,
    MismatchedBeginEnd,
    MismatchedParens,
    MismatchedBrackets,
    ExtraEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fault {
    TypeIdentifierExpected {
        scope: Scope,
        at: LineInfo,
        missing_type: String,
    },
    UnknownIdentifier {
        scope: Scope,
        at: LineInfo,
        name: String,
        fit: DefineKind,
    },
    UnconvertibleType {
        scope: Scope,
        at: LineInfo,
        #[serde(default)]
        identifier: Option<Access>,
        #[serde(default)]
        value: Option<Access>,
        value_type: String,
        target_type: String,
    },
    MissingToken {
        at: LineInfo,
        token: String,
    },
    Grouping {
        at: LineInfo,
        grouping: GroupingKind,
    },
    ChangeValueOfConstant {
        scope: Scope,
        at: LineInfo,
        name: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        value_type: Option<String>,
    },
    ProgramNotFound,
    ExpectedToken {
        at: LineInfo,
        current: String,
        expected: String,
        insert: bool,
    },
}

impl Fault {
    pub fn name(&self) -> &'static str {
        match self {
            Fault::TypeIdentifierExpected { .. } => "type_identifier_expected",
            Fault::UnknownIdentifier { .. } => "unknown_identifier",
            Fault::UnconvertibleType { .. } => "unconvertible_type",
            Fault::MissingToken { .. } => "missing_token",
            Fault::Grouping { .. } => "grouping",
            Fault::ChangeValueOfConstant { .. } => "change_value_of_constant",
            Fault::ProgramNotFound => "program_not_found",
            Fault::ExpectedToken { .. } => "expected_token",
        }
    }

    pub fn position(&self) -> Option<LineInfo> {
        match self {
            Fault::TypeIdentifierExpected { at, .. }
            | Fault::UnknownIdentifier { at, .. }
            | Fault::UnconvertibleType { at, .. }
            | Fault::MissingToken { at, .. }
            | Fault::Grouping { at, .. }
            | Fault::ChangeValueOfConstant { at, .. }
            | Fault::ExpectedToken { at, .. } => Some(*at),
            Fault::ProgramNotFound => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Fault::TypeIdentifierExpected { missing_type, .. } => {
                format!("type identifier expected: '{missing_type}' is not declared")
            }
            Fault::UnknownIdentifier { name, .. } => format!("unknown identifier '{name}'"),
            Fault::UnconvertibleType {
                value_type,
                target_type,
                ..
            } => format!("cannot convert {value_type} to {target_type}"),
            Fault::MissingToken { token, .. } => format!("missing '{token}'"),
            Fault::Grouping { grouping, .. } => match grouping {
                GroupingKind::UnfinishedBeginEnd => "'begin' is never closed by 'end'".into(),
                GroupingKind::MismatchedBeginEnd => "mismatched 'begin' ... 'end'".into(),
                GroupingKind::MismatchedParens => "mismatched parentheses".into(),
                GroupingKind::MismatchedBrackets => "mismatched brackets".into(),
                GroupingKind::ExtraEnd => "'end' without matching 'begin'".into(),
            },
            Fault::ChangeValueOfConstant { name, .. } => {
                format!("cannot assign to constant '{name}'")
            }
            Fault::ProgramNotFound => "main program block not found".into(),
            Fault::ExpectedToken {
                current, expected, ..
            } => format!("expected '{expected}' but found '{current}'"),
        }
    }
}
