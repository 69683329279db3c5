//! Parsers for snippet definition files and snippet bodies

pub mod ast;
pub mod body;
pub mod document;
pub mod lexer;

pub use ast::*;
pub use body::parse_body;
pub use document::{parse_document, Action, ActionKind, Global, Statement};
