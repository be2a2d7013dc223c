//! The host language: what transpiled scripts are written in.
//!
//! Source is tokenized line by line, parsed into an indentation-structured
//! statement tree and executed by a tree-walking [`Interpreter`].

pub mod ast;
mod builtins;
pub(crate) mod interp;
pub mod lexer;
pub mod parser;

use thiserror::Error;

pub use interp::{Builtin, BuiltinFn, Function, Interpreter, RuntimeError};
pub use lexer::LexError;
pub use parser::{ParseError, parse_expression, parse_program};

/// Failure to load or run a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("syntax error: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
