pub mod autofix;
pub mod config;
pub mod edit;
pub mod error;
pub mod fault;
pub mod formatter;
pub mod lexer;
pub mod line_index;
pub mod patterns;
pub mod structure;
pub mod token;

pub use crate::{
    autofix::{compute_fix, AutoFix},
    config::Config,
    edit::{apply_fix, EditableBuffer, Fix, SourceBuffer, TextEdit},
    error::{Error, Result},
    fault::Fault,
    formatter::{format_source, format_source_with_options, FormatterOptions},
    lexer::Lexer,
};
