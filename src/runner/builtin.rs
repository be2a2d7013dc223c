//! Meta-commands of the interactive prompt.

use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use tracing::debug;

use super::{commands_table, options_table, report};
use crate::lang::Interpreter;
use crate::value::Value;

/// What the interactive loop does after a line was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// Commands built into the prompt, parsed with [`argh`] and run in-process
/// against the interpreter.
pub(crate) trait MetaCommand: Sized + FromArgs {
    /// Name typed at the prompt, e.g. "zset".
    fn name() -> &'static str;

    /// One-line description for the help table.
    fn summary() -> &'static str;

    fn execute(self, interp: &mut Interpreter) -> Result<Control>;
}

pub(crate) trait Executable {
    fn execute(self: Box<Self>, interp: &mut Interpreter) -> Result<Control>;
}

impl<T: MetaCommand> Executable for T {
    fn execute(self: Box<Self>, interp: &mut Interpreter) -> Result<Control> {
        T::execute(*self, interp)
    }
}

/// Help text or a parse error produced by argh instead of a command.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl Executable for InvalidArgs {
    fn execute(self: Box<Self>, interp: &mut Interpreter) -> Result<Control> {
        let console = interp.console();
        if self.is_error {
            report(console, self.output.trim_end())?;
        } else {
            console.print(self.output.trim_end())?;
        }
        Ok(Control::Continue)
    }
}

pub(crate) trait MetaFactory {
    fn name(&self) -> &'static str;

    fn summary(&self) -> &'static str;

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn Executable>>;
}

pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: MetaCommand + 'static> MetaFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn summary(&self) -> &'static str {
        T::summary()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn Executable>> {
        if name != T::name() {
            return None;
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

pub(crate) fn meta_commands() -> Vec<Box<dyn MetaFactory>> {
    vec![
        Box::new(Factory::<Help>::default()),
        Box::new(Factory::<ScriptInfo>::default()),
        Box::new(Factory::<Zset>::default()),
        Box::new(Factory::<Clear>::default()),
        Box::new(ShellPassthrough {
            name: "ls",
            summary: "List directory contents",
            program: "ls --color",
        }),
        Box::new(ShellPassthrough {
            name: "pwd",
            summary: "Print the working directory",
            program: "pwd",
        }),
        Box::new(Factory::<Exit>::default()),
    ]
}

/// Run the meta-command `name`, if there is one.
pub(crate) fn run_meta(
    interp: &mut Interpreter,
    name: &str,
    args: &[&str],
) -> Option<Result<Control>> {
    meta_commands()
        .iter()
        .find_map(|factory| factory.try_create(name, args))
        .map(|cmd| cmd.execute(interp))
}

#[derive(FromArgs)]
/// Show the command table, or the usage of one command.
pub struct Help {
    #[argh(positional)]
    /// command to describe
    pub command: Option<String>,
}

impl MetaCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn summary() -> &'static str {
        "Show help for all or one command"
    }

    fn execute(self, interp: &mut Interpreter) -> Result<Control> {
        let Some(name) = self.command else {
            let commands = commands_table(interp.script(), true);
            let mut builtins = crate::console::Table::new(["Command", "Description"])
                .title("Built-in Commands");
            for factory in meta_commands() {
                builtins.row([factory.name(), factory.summary()]);
            }
            let console = interp.console();
            console.print_panel("", "Usage: command [ARGS] [-h]")?;
            console.print_table(&commands)?;
            console.print_table(&builtins)?;
            return Ok(Control::Continue);
        };

        if let Some(command) = interp.script().commands.get(&name) {
            let help = command.help_text();
            interp.console().print(&help)?;
            return Ok(Control::Continue);
        }
        match run_meta(interp, &name, &["--help"]) {
            Some(result) => result,
            None => {
                report(interp.console(), format!("no help for unknown command '{name}'"))?;
                Ok(Control::Continue)
            }
        }
    }
}

#[derive(FromArgs)]
/// Inspect the running script.
pub struct ScriptInfo {
    #[argh(positional)]
    /// one of: commands, commands-full, options, options-required
    pub subcommand: String,
}

impl MetaCommand for ScriptInfo {
    fn name() -> &'static str {
        "script"
    }

    fn summary() -> &'static str {
        "List the script's commands or options"
    }

    fn execute(self, interp: &mut Interpreter) -> Result<Control> {
        match self.subcommand.as_str() {
            "commands" => {
                let names: Vec<String> = interp
                    .script()
                    .commands
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect();
                interp.console().print_list(Some("Commands"), &names)?;
            }
            "commands-full" => {
                let table = commands_table(interp.script(), true);
                interp.console().print_table(&table)?;
            }
            "options" | "options-required" => {
                let table = options_table(interp.script(), self.subcommand == "options-required");
                interp.console().print_table(&table)?;
            }
            other => report(
                interp.console(),
                format!(
                    "invalid choice '{other}' (choose from commands, commands-full, options, options-required)"
                ),
            )?,
        }
        Ok(Control::Continue)
    }
}

#[derive(FromArgs)]
/// Set a script option; the value is cast to the option's type.
pub struct Zset {
    #[argh(positional)]
    /// option name
    pub name: String,
    #[argh(positional)]
    /// new value (remaining words are joined with spaces)
    pub value: Vec<String>,
}

impl MetaCommand for Zset {
    fn name() -> &'static str {
        "zset"
    }

    fn summary() -> &'static str {
        "Set a script option"
    }

    fn execute(self, interp: &mut Interpreter) -> Result<Control> {
        if self.value.is_empty() {
            report(interp.console(), "missing <value>; usage: zset <name> <value>")?;
            return Ok(Control::Continue);
        }
        let value = self.value.join(" ");
        match interp
            .script_mut()
            .options
            .set(&self.name, &Value::Str(value.clone()))
        {
            Ok(()) => interp
                .console()
                .print(&format!("Updated: {}={value}", self.name))?,
            Err(err) => report(interp.console(), err)?,
        }
        Ok(Control::Continue)
    }
}

#[derive(FromArgs)]
/// Clear the screen.
pub struct Clear {}

impl MetaCommand for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn summary() -> &'static str {
        "Clear the screen"
    }

    fn execute(self, interp: &mut Interpreter) -> Result<Control> {
        interp.console().clear()?;
        Ok(Control::Continue)
    }
}

/// Quote `arg` for `sh -c` unless it is made of safe characters only.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Run `program` with `args` through the interpreter's shell.
fn run_shell(interp: &mut Interpreter, program: &str, args: &[String]) -> Result<Control> {
    let line = std::iter::once(program.to_string())
        .chain(args.iter().map(|a| shell_quote(a)))
        .collect::<Vec<_>>()
        .join(" ");
    let (shell, env) = interp.shell_parts();
    let code = shell.run(&line, env)?;
    if code != 0 {
        debug!(command = %line, code, "meta shell command failed");
    }
    Ok(Control::Continue)
}

/// Meta-command handing its raw arguments to an external program, so that
/// flags like `-la` reach the program instead of argh.
pub(crate) struct ShellPassthrough {
    name: &'static str,
    summary: &'static str,
    program: &'static str,
}

struct ShellRun {
    program: &'static str,
    args: Vec<String>,
}

impl Executable for ShellRun {
    fn execute(self: Box<Self>, interp: &mut Interpreter) -> Result<Control> {
        run_shell(interp, self.program, &self.args)
    }
}

impl MetaFactory for ShellPassthrough {
    fn name(&self) -> &'static str {
        self.name
    }

    fn summary(&self) -> &'static str {
        self.summary
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn Executable>> {
        (name == self.name).then(|| {
            Box::new(ShellRun {
                program: self.program,
                args: args.iter().map(|a| a.to_string()).collect(),
            }) as Box<dyn Executable>
        })
    }
}

#[derive(FromArgs)]
/// Leave the prompt.
pub struct Exit {}

impl MetaCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn summary() -> &'static str {
        "Exit the program"
    }

    fn execute(self, _interp: &mut Interpreter) -> Result<Control> {
        Ok(Control::Exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Console;
    use crate::io_adapters::collected;
    use crate::script::Script;
    use crate::value::ValueType;

    fn interp() -> (Interpreter, std::rc::Rc<std::cell::RefCell<Vec<u8>>>) {
        let mut script = Script::new("demo");
        script
            .options
            .add(
                "level",
                Some(Value::Int(1)),
                ValueType::Int,
                vec![Value::Int(1), Value::Int(2)],
                false,
            )
            .unwrap();
        let (console, out) = Console::capture();
        (Interpreter::new(script).with_console(console), out)
    }

    #[test]
    fn zset_goes_through_option_validation() {
        let (mut interp, out) = interp();
        run_meta(&mut interp, "zset", &["level", "2"]).unwrap().unwrap();
        assert_eq!(interp.script().options.get("level"), Ok(&Value::Int(2)));
        run_meta(&mut interp, "zset", &["level", "7"]).unwrap().unwrap();
        assert_eq!(interp.script().options.get("level"), Ok(&Value::Int(2)));
        let text = collected(&out);
        assert!(text.contains("Updated: level=2"));
        assert!(text.contains("invalid value for option 'level'"));
    }

    #[test]
    fn exit_stops_the_loop() {
        let (mut interp, _) = interp();
        let control = run_meta(&mut interp, "exit", &[]).unwrap().unwrap();
        assert_eq!(control, Control::Exit);
    }

    #[test]
    fn argh_errors_are_reported_not_raised() {
        let (mut interp, out) = interp();
        let control = run_meta(&mut interp, "script", &[]).unwrap().unwrap();
        assert_eq!(control, Control::Continue);
        assert!(collected(&out).starts_with("error: "));
    }

    #[test]
    fn unknown_meta_command() {
        let (mut interp, _) = interp();
        assert!(run_meta(&mut interp, "frobnicate", &[]).is_none());
    }

    #[test]
    fn options_listing() {
        let (mut interp, out) = interp();
        run_meta(&mut interp, "script", &["options"]).unwrap().unwrap();
        let text = collected(&out);
        assert!(text.contains("level"));
        assert!(text.contains("int"));
    }

    struct Recorder(std::rc::Rc<std::cell::RefCell<Vec<String>>>);

    impl crate::external::Shell for Recorder {
        fn run(&mut self, command: &str, _env: &crate::env::Environment) -> Result<i32> {
            self.0.borrow_mut().push(command.to_string());
            Ok(0)
        }

        fn capture(
            &mut self,
            command: &str,
            env: &crate::env::Environment,
        ) -> Result<crate::external::ShellOutput> {
            let code = self.run(command, env)?;
            Ok(crate::external::ShellOutput {
                code,
                stdout: String::new(),
            })
        }
    }

    #[test]
    fn ls_and_pwd_go_through_the_shell() {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let (interp, _) = interp();
        let mut interp = interp.with_shell(Box::new(Recorder(seen.clone())));
        run_meta(&mut interp, "ls", &["-la", "my dir"]).unwrap().unwrap();
        run_meta(&mut interp, "pwd", &[]).unwrap().unwrap();
        assert_eq!(*seen.borrow(), ["ls --color -la 'my dir'", "pwd"]);
    }

    #[test]
    fn shell_quoting() {
        assert_eq!(shell_quote("src/main.rs"), "src/main.rs");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
