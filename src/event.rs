use std::collections::HashMap;

use tracing::debug;

use crate::command::Handler;

/// Lifecycle event fired once when the interactive loop starts.
pub const INIT: &str = "init";
/// Event whose return value replaces the interactive prompt.
pub const PROMPT: &str = "prompt";
/// Event receiving the raw line of an unknown interactive command.
pub const DEFAULT: &str = "default";

/// Name-keyed event handlers; registering a name again replaces its handler.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    handlers: HashMap<String, Handler>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, handler: Handler) {
        let name = name.into();
        debug!(event = %name, "registering event handler");
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
