use std::collections::HashMap;

use super::line::fstring;

/// A macro receives the raw line and its whitespace-split arguments and
/// returns one line of host source (without indentation).
pub type MacroFn = fn(line: &str, args: &[&str]) -> String;

/// Name-keyed macro handlers for `:name arg ...` lines.
#[derive(Debug, Clone)]
pub struct MacroRegistry {
    macros: HashMap<String, MacroFn>,
}

impl MacroRegistry {
    /// A registry without any macros.
    pub fn empty() -> Self {
        Self {
            macros: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, handler: MacroFn) {
        self.macros.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<MacroFn> {
        self.macros.get(name).copied()
    }
}

impl Default for MacroRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("say", say);
        registry
    }
}

/// `:say hello {name}` prints the joined arguments as an interpolated string.
fn say(_line: &str, args: &[&str]) -> String {
    format!("print({})", fstring(&args.join(" ")))
}
