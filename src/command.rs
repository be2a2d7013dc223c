//! Named commands and the registry that owns them.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::args::{self, ArgDescriptor, ArgumentError, ArgumentSchema, CallArgs, Param, SchemaError};
use crate::lang::{Function, Interpreter};
use crate::value::Value;

/// Signature of a command implemented in Rust.
pub type NativeFn = dyn Fn(&mut Interpreter, CallArgs) -> anyhow::Result<Value>;

/// The callable behind a command or event.
#[derive(Clone)]
pub enum Handler {
    Native(Rc<NativeFn>),
    Script(Rc<Function>),
}

impl Handler {
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&mut Interpreter, CallArgs) -> anyhow::Result<Value> + 'static,
    {
        Handler::Native(Rc::new(f))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Native(_) => f.write_str("Native(..)"),
            Handler::Script(func) => write!(f, "Script({})", func.name),
        }
    }
}

/// A callable exposed under a name, with its argument schema derived once at
/// construction.
#[derive(Debug, Clone)]
pub struct Command {
    name: String,
    short: Option<String>,
    description: Option<String>,
    params: Vec<Param>,
    schema: ArgumentSchema,
    handler: Handler,
}

impl Command {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        overrides: &HashMap<String, ArgDescriptor>,
        handler: Handler,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let schema = args::derive(&name, &params, overrides)?;
        Ok(Self {
            name,
            short: None,
            description: None,
            params,
            schema,
            handler,
        })
    }

    /// A command backed by a Rust closure.
    pub fn native<F>(name: impl Into<String>, params: Vec<Param>, f: F) -> Result<Self, SchemaError>
    where
        F: Fn(&mut Interpreter, CallArgs) -> anyhow::Result<Value> + 'static,
    {
        Self::new(name, params, &HashMap::new(), Handler::native(f))
    }

    /// A command backed by a script function; its doc string becomes the description.
    pub fn script(name: impl Into<String>, func: Rc<Function>) -> Result<Self, SchemaError> {
        let params = func.params.clone();
        let description = func.doc.clone();
        let mut command = Self::new(name, params, &HashMap::new(), Handler::Script(func))?;
        command.description = description;
        Ok(command)
    }

    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = Some(short.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line summary: the explicit short text, else the first description line.
    pub fn summary(&self) -> &str {
        self.short
            .as_deref()
            .or_else(|| self.description.as_deref().and_then(|d| d.lines().next()))
            .unwrap_or("")
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn schema(&self) -> &ArgumentSchema {
        &self.schema
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Parse raw tokens and arrange them for the handler.
    pub fn bind<S: AsRef<str>>(&self, argv: &[S]) -> Result<CallArgs, ArgumentError> {
        args::bind(&self.params, &self.schema, argv)
    }

    pub fn usage(&self) -> String {
        self.schema.usage()
    }

    /// Usage, description and per-argument help.
    pub fn help_text(&self) -> String {
        let help = self.schema.help();
        match &self.description {
            Some(description) => match help.split_once("\n\n") {
                Some((usage, rest)) => format!("{usage}\n\n{description}\n\n{rest}"),
                None => format!("{help}\n\n{description}"),
            },
            None => help,
        }
    }
}

/// Errors from dispatching a command by name.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("command not found: {0}")]
    NotFound(String),
    #[error("{usage}\n{command}: error: {source}")]
    Arguments {
        command: String,
        usage: String,
        source: ArgumentError,
    },
    #[error("{0:#}")]
    Failed(anyhow::Error),
}

/// Ordered collection of commands with unique names.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `command`; a command with the same name is replaced in place.
    pub fn add(&mut self, command: Command) {
        debug!(command = command.name(), "registering command");
        match self.commands.iter_mut().find(|c| c.name == command.name) {
            Some(existing) => {
                debug!(command = command.name(), "replacing existing command");
                *existing = command;
            }
            None => self.commands.push(command),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> impl Fn(&mut Interpreter, CallArgs) -> anyhow::Result<Value> {
        |_, _| Ok(Value::None)
    }

    #[test]
    fn registry_keeps_order_and_replaces() {
        let mut registry = CommandRegistry::new();
        registry.add(Command::native("b", vec![], noop()).unwrap());
        registry.add(Command::native("a", vec![], noop()).unwrap());
        registry.add(
            Command::native("b", vec![], noop())
                .unwrap()
                .with_short("second"),
        );
        let names: Vec<&str> = registry.iter().map(Command::name).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(registry.get("b").unwrap().summary(), "second");
    }

    #[test]
    fn schema_errors_surface_at_construction() {
        let params = vec![Param::variadic("rest"), Param::required("a")];
        assert!(Command::native("bad", params, noop()).is_err());
    }

    #[test]
    fn help_includes_description() {
        let command = Command::native("greet", vec![Param::required("name")], noop())
            .unwrap()
            .with_description("Say hello.");
        let help = command.help_text();
        assert!(help.starts_with("usage: greet [-h] name\n\nSay hello.\n\n"));
        assert_eq!(command.summary(), "Say hello.");
    }
}
