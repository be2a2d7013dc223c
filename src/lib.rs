//! A small scripting and command framework.
//!
//! Scripts are written in a terse line notation which is desugared by the
//! [`transpile`] module into host source, parsed into a statement tree and run
//! by the tree-walking evaluator in [`lang`]. Scripts (or Rust code embedding
//! this crate) register named commands with typed parameters; the [`args`]
//! module derives a command-line schema from each parameter list, parses raw
//! tokens against it and projects the result back onto the callable.
//!
//! The [`runner`] module exposes a command set through two surfaces: a
//! one-shot command-line dispatch and an interactive prompt.
//!
//! ```
//! use zzz::transpile::Transpiler;
//!
//! let out = Transpiler::default().compile(&[">> x 1+2", "<<< x"]).unwrap();
//! assert_eq!(out, "x = 1+2\nprint(x)");
//! ```

pub mod args;
pub mod command;
pub mod config;
pub mod console;
pub mod env;
pub mod event;
pub mod external;
pub mod io_adapters;
pub mod lang;
pub mod option;
pub mod requirements;
pub mod runner;
pub mod script;
pub mod transpile;
pub mod value;

pub use command::{Command, CommandRegistry, Handler};
pub use lang::Interpreter;
pub use script::Script;
pub use value::{Value, ValueType};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;
