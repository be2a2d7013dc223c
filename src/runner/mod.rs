//! Execution surfaces for a script's commands.
//!
//! [`cli`] dispatches once from the script's own arguments, [`interactive`]
//! runs a prompt loop. [`run_script`] picks between them.

pub mod builtin;
pub mod cli;
pub mod completion;
pub mod interactive;

use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::ExitCode;
use crate::console::{Console, Table};
use crate::lang::Interpreter;
use crate::requirements::find_library;
use crate::script::Script;
use crate::transpile::{Compiled, Transpiler};

pub use builtin::Control;
pub use completion::ScriptCompleter;
pub use interactive::{Interactive, LineReader, ReadOutcome, Readline, ScriptedReader};

const BANNER: &str = r"
███████╗███████╗███████╗
╚══███╔╝╚══███╔╝╚══███╔╝
  ███╔╝   ███╔╝   ███╔╝
 ███╔╝   ███╔╝   ███╔╝
███████╗███████╗███████╗
╚══════╝╚══════╝╚══════╝";

/// Presentation switches for [`run_script`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub intro: bool,
    pub clear: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            intro: true,
            clear: false,
        }
    }
}

/// Transpile `source` and run it, after the libraries its directive requires.
///
/// Libraries are `<name>.zzz` files looked up in `lib_dirs`; each one is
/// loaded at most once.
pub fn load_source(
    interp: &mut Interpreter,
    transpiler: &mut Transpiler,
    source: &str,
    lib_dirs: &[PathBuf],
) -> Result<Compiled> {
    let mut loaded = HashSet::new();
    load(interp, transpiler, source, lib_dirs, &mut loaded)
}

fn load(
    interp: &mut Interpreter,
    transpiler: &mut Transpiler,
    source: &str,
    lib_dirs: &[PathBuf],
    loaded: &mut HashSet<PathBuf>,
) -> Result<Compiled> {
    let lines: Vec<&str> = source.lines().collect();
    let compiled = transpiler.compile_script(&lines)?;
    for name in &compiled.options.libraries {
        let path = find_library(lib_dirs, name)
            .with_context(|| format!("library '{name}' not found"))?;
        if !loaded.insert(path.clone()) {
            continue;
        }
        info!(library = %name, path = %path.display(), "loading library");
        let text = read_script(&path)?;
        load(interp, transpiler, &text, lib_dirs, loaded)
            .with_context(|| format!("in library {}", path.display()))?;
    }
    interp.run_source(&compiled.source, compiled.line_offset)?;
    Ok(compiled)
}

pub fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// One-shot dispatch when the script got arguments, the prompt otherwise.
pub fn run_script(interp: &mut Interpreter, options: RunOptions) -> Result<ExitCode> {
    if interp.script().args.is_empty() {
        debug!(script = %interp.script().name, "starting interactive mode");
        let reader = Readline::new(ScriptCompleter::from_script(interp.script()))?;
        Interactive::new(interp, reader).run(options)
    } else {
        debug!(script = %interp.script().name, "starting cli mode");
        cli::run(interp, options)
    }
}

/// Banner followed by the script header.
pub fn print_intro(console: &mut Console, script: &Script) -> io::Result<()> {
    console.print(BANNER)?;
    print_header(console, script)
}

pub(crate) fn print_header(console: &mut Console, script: &Script) -> io::Result<()> {
    let mut lines = Vec::new();
    if let Some(author) = &script.author {
        lines.push(format!("by {author}"));
    }
    if let Some(description) = &script.description {
        lines.push(description.clone());
    }
    console.print_panel(&script.title(), &lines.join("\n"))?;
    console.br(1)
}

/// Print `message` as an error line.
pub(crate) fn report(console: &mut Console, message: impl Display) -> io::Result<()> {
    console.print(&format!("error: {message}"))
}

/// "Available Commands" table; `full` adds the description column.
pub(crate) fn commands_table(script: &Script, full: bool) -> Table {
    let columns: &[&str] = if full {
        &["Command", "Description"]
    } else {
        &["Command"]
    };
    let mut table = Table::new(columns.iter().copied()).title("Available Commands");
    for command in script.commands.iter() {
        if full {
            table.row([command.name(), command.summary()]);
        } else {
            table.row([command.name()]);
        }
    }
    table
}

pub(crate) fn options_table(script: &Script, required_only: bool) -> Table {
    let title = if required_only {
        "Required Options"
    } else {
        "Options"
    };
    let mut table = Table::new(["Name", "Type", "Value", "Choices", "Required"]).title(title);
    for option in script
        .options
        .iter()
        .filter(|o| !required_only || o.is_required())
    {
        let value = option.peek().map(|v| v.repr()).unwrap_or_else(|| "-".into());
        let choices = if option.choices().is_empty() {
            "-".to_string()
        } else {
            crate::value::Value::List(option.choices().to_vec()).to_string()
        };
        table.row([
            option.name().to_string(),
            option.value_type().to_string(),
            value,
            choices,
            if option.is_required() { "yes" } else { "no" }.to_string(),
        ]);
    }
    table
}
