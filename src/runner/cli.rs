//! Single dispatch from the script's command-line arguments.

use anyhow::Result;
use tracing::warn;

use super::{RunOptions, commands_table, print_header, print_intro, report};
use crate::ExitCode;
use crate::args::ArgumentError;
use crate::command::DispatchError;
use crate::lang::Interpreter;

/// Exit code of a command line that did not match the command's schema.
pub const USAGE_ERROR: ExitCode = 2;

fn print_help(interp: &mut Interpreter) -> Result<()> {
    let table = commands_table(interp.script(), true);
    let usage = format!("Usage: {} command [ARGS] [-h]", interp.script().name);
    let script = interp.script().clone();
    let console = interp.console();
    print_header(console, &script)?;
    console.print(&usage)?;
    console.br(1)?;
    console.print_table(&table)?;
    Ok(())
}

/// Dispatch `script.args` once.
///
/// No arguments or `-h`/`--help` print the command table and succeed. An
/// unknown command, bad arguments or a failing command print an error and
/// return a non-zero code.
pub fn run(interp: &mut Interpreter, options: RunOptions) -> Result<ExitCode> {
    let args = interp.script().args.clone();
    let Some((name, rest)) = args
        .split_first()
        .filter(|(name, _)| !matches!(name.as_str(), "-h" | "--help"))
    else {
        print_help(interp)?;
        return Ok(0);
    };

    if options.intro {
        let script = interp.script().clone();
        print_intro(interp.console(), &script)?;
    }

    match interp.dispatch(name, rest) {
        Ok(_) => Ok(0),
        Err(DispatchError::NotFound(name)) => {
            report(interp.console(), format!("command '{name}' not found"))?;
            Ok(1)
        }
        Err(DispatchError::Arguments {
            source: ArgumentError::HelpRequested(help),
            ..
        }) => {
            interp.console().print(&help)?;
            Ok(0)
        }
        Err(err @ DispatchError::Arguments { .. }) => {
            interp.console().print(&err.to_string())?;
            Ok(USAGE_ERROR)
        }
        Err(DispatchError::Failed(err)) => {
            warn!(command = %name, error = %format!("{err:#}"), "command failed");
            report(interp.console(), format!("{err:#}"))?;
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Param;
    use crate::console::Console;
    use crate::io_adapters::collected;
    use crate::script::Script;
    use crate::value::Value;

    fn interp(args: &[&str]) -> (Interpreter, std::rc::Rc<std::cell::RefCell<Vec<u8>>>) {
        let args = args.iter().map(|a| a.to_string()).collect();
        let mut script = Script::new("demo").with_args(args);
        let params = vec![Param::required("a"), Param::optional("b", Value::Int(2))];
        script
            .command("add", params, |interp, call| {
                let a = call.arg(0).cloned().unwrap_or(Value::None);
                let b = call.get("b").cloned().unwrap_or(Value::None);
                interp.console().print(&format!("{a}+{b}"))?;
                Ok(Value::None)
            })
            .unwrap();
        script
            .command("fail", vec![], |_, _| anyhow::bail!("boom"))
            .unwrap();
        let (console, out) = Console::capture();
        (Interpreter::new(script).with_console(console), out)
    }

    const QUIET: RunOptions = RunOptions {
        intro: false,
        clear: false,
    };

    #[test]
    fn dispatches_with_parsed_arguments() {
        let (mut interp, out) = interp(&["add", "x", "--b", "5"]);
        assert_eq!(run(&mut interp, QUIET).unwrap(), 0);
        assert_eq!(collected(&out), "x+5\n");
    }

    #[test]
    fn no_arguments_prints_help() {
        let (mut interp, out) = interp(&[]);
        assert_eq!(run(&mut interp, QUIET).unwrap(), 0);
        let text = collected(&out);
        assert!(text.contains("Available Commands"));
        assert!(text.contains("Usage: demo command [ARGS] [-h]"));
    }

    #[test]
    fn unknown_command_is_non_zero() {
        let (mut interp, out) = interp(&["nope"]);
        assert_eq!(run(&mut interp, QUIET).unwrap(), 1);
        assert!(collected(&out).contains("error: command 'nope' not found"));
    }

    #[test]
    fn bad_arguments_print_usage() {
        let (mut interp, out) = interp(&["add", "--c", "1"]);
        assert_eq!(run(&mut interp, QUIET).unwrap(), USAGE_ERROR);
        assert!(collected(&out).starts_with("usage: add [-h] [--b B] a"));
    }

    #[test]
    fn command_help() {
        let (mut interp, out) = interp(&["add", "-h"]);
        assert_eq!(run(&mut interp, QUIET).unwrap(), 0);
        assert!(collected(&out).contains("positional arguments:"));
    }

    #[test]
    fn failing_command_is_reported() {
        let (mut interp, out) = interp(&["fail"]);
        assert_eq!(run(&mut interp, QUIET).unwrap(), 1);
        assert_eq!(collected(&out), "error: boom\n");
    }
}
