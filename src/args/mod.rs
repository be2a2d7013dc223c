//! Signature-driven command-line arguments.
//!
//! A command's callable is described by an ordered list of [`Param`]s. From
//! that list [`derive`] builds an [`ArgumentSchema`]; the schema parses raw
//! tokens into [`ParsedArgs`]; and [`project`] maps the parsed values back onto
//! the callable's calling convention as [`CallArgs`].
//!
//! ```
//! use zzz::args::{bind, derive, Param};
//! use zzz::Value;
//!
//! let params = vec![
//!     Param::required("a"),
//!     Param::optional("b", Value::Int(2)),
//!     Param::variadic("rest"),
//! ];
//! let schema = derive("f", &params, &Default::default()).unwrap();
//! let call = bind(&params, &schema, &["x", "--b", "9", "y", "z"]).unwrap();
//! assert_eq!(call.positional, vec![Value::str("x")]);
//! assert_eq!(call.variadic, vec![Value::str("y"), Value::str("z")]);
//! assert_eq!(call.keywords, vec![("b".to_string(), Value::Int(9))]);
//! ```

mod binder;
mod descriptor;
mod parser;
mod signature;

pub use binder::{CallArgs, bind, project};
pub use descriptor::{ArgDescriptor, Arity};
pub use parser::{ArgumentError, ParsedArgs};
pub use signature::{ArgumentSchema, Param, ParamKind, SchemaError, Slot, derive};
