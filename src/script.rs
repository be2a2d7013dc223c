use crate::args::{CallArgs, Param, SchemaError};
use crate::command::{Command, CommandRegistry, Handler};
use crate::event::EventRegistry;
use crate::lang::Interpreter;
use crate::option::ScriptOptions;
use crate::value::Value;

pub const DEFAULT_PROMPT: &str = "| ";

/// Everything a script declares: metadata, commands, events and options,
/// plus the raw arguments it was started with.
#[derive(Debug, Clone)]
pub struct Script {
    pub name: String,
    pub version: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub prompt: String,
    pub commands: CommandRegistry,
    pub events: EventRegistry,
    pub options: ScriptOptions,
    pub args: Vec<String>,
}

impl Script {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            author: None,
            description: None,
            prompt: DEFAULT_PROMPT.to_string(),
            commands: CommandRegistry::new(),
            events: EventRegistry::new(),
            options: ScriptOptions::new(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Register a command implemented in Rust.
    pub fn command<F>(&mut self, name: &str, params: Vec<Param>, f: F) -> Result<(), SchemaError>
    where
        F: Fn(&mut Interpreter, CallArgs) -> anyhow::Result<Value> + 'static,
    {
        self.commands.add(Command::native(name, params, f)?);
        Ok(())
    }

    /// Register an event handler implemented in Rust.
    pub fn event<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut Interpreter, CallArgs) -> anyhow::Result<Value> + 'static,
    {
        self.events.set(name, Handler::native(f));
    }

    /// Display title, e.g. `Deploy v1.2`.
    pub fn title(&self) -> String {
        match &self.version {
            Some(version) => format!("{} v{version}", self.name),
            None => self.name.clone(),
        }
    }
}
