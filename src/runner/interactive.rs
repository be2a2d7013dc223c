//! The interactive prompt loop.

use std::collections::VecDeque;

use anyhow::Result;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use thiserror::Error;
use tracing::{debug, warn};

use super::builtin::{Control, run_meta};
use super::completion::ScriptCompleter;
use super::{RunOptions, print_intro, report};
use crate::ExitCode;
use crate::args::{ArgumentError, CallArgs};
use crate::command::DispatchError;
use crate::event;
use crate::external;
use crate::lang::{Interpreter, RuntimeError};
use crate::value::Value;

/// One attempt to read a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C while waiting for input.
    Interrupted,
    /// End of input (Ctrl-D).
    Eof,
}

/// Source of prompt input.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    fn add_history(&mut self, _line: &str) {}
}

/// Terminal input with line editing, history and tab completion.
pub struct Readline {
    editor: Editor<ScriptCompleter, DefaultHistory>,
}

impl Readline {
    pub fn new(completer: ScriptCompleter) -> Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(completer));
        Ok(Self { editor })
    }
}

impl LineReader for Readline {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err.into()),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(err) = self.editor.add_history_entry(line) {
            warn!(%err, "failed to record history");
        }
    }
}

/// Replays a fixed list of outcomes, then reports end of input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReader {
    outcomes: VecDeque<ReadOutcome>,
    /// Prompts shown so far.
    pub prompts: Vec<String>,
}

impl ScriptedReader {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_outcomes(lines.into_iter().map(|l| ReadOutcome::Line(l.into())))
    }

    pub fn from_outcomes(outcomes: impl IntoIterator<Item = ReadOutcome>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            prompts: Vec::new(),
        }
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        self.prompts.push(prompt.to_string());
        Ok(self.outcomes.pop_front().unwrap_or(ReadOutcome::Eof))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("unterminated quote")]
    UnterminatedQuote,
    #[error("trailing backslash")]
    TrailingEscape,
}

#[derive(Clone, Copy)]
enum Quote {
    None,
    Single,
    Double,
}

struct WordSplitter {
    input: Vec<char>,
    pos: usize,
}

impl WordSplitter {
    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn split(mut self) -> Result<Vec<String>, SplitError> {
        let mut words = Vec::new();
        let mut word = String::new();
        let mut in_word = false;
        let mut quote = Quote::None;

        while let Some(ch) = self.read_char() {
            match (quote, ch) {
                (Quote::None, c) if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut word));
                        in_word = false;
                    }
                }
                (Quote::None, '\'') => {
                    quote = Quote::Single;
                    in_word = true;
                }
                (Quote::None, '"') => {
                    quote = Quote::Double;
                    in_word = true;
                }
                (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
                (Quote::None, '\\') => {
                    word.push(self.read_char().ok_or(SplitError::TrailingEscape)?);
                    in_word = true;
                }
                (Quote::Double, '\\') if matches!(self.peek_char(), Some('"' | '\\')) => {
                    word.extend(self.read_char());
                }
                (_, c) => {
                    word.push(c);
                    in_word = true;
                }
            }
        }
        if !matches!(quote, Quote::None) {
            return Err(SplitError::UnterminatedQuote);
        }
        if in_word {
            words.push(word);
        }
        Ok(words)
    }
}

/// Split a prompt line into words, honouring shell-style quotes.
pub fn split_words(line: &str) -> Result<Vec<String>, SplitError> {
    WordSplitter {
        input: line.chars().collect(),
        pos: 0,
    }
    .split()
}

/// The prompt loop over one interpreter.
pub struct Interactive<'a, R> {
    interp: &'a mut Interpreter,
    reader: R,
}

impl<'a, R: LineReader> Interactive<'a, R> {
    pub fn new(interp: &'a mut Interpreter, reader: R) -> Self {
        Self { interp, reader }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Read and handle lines until `exit` or end of input.
    pub fn run(&mut self, options: RunOptions) -> Result<ExitCode> {
        if options.clear {
            self.interp.console().clear()?;
        }
        if options.intro {
            let script = self.interp.script().clone();
            print_intro(self.interp.console(), &script)?;
        }
        self.fire(event::INIT, CallArgs::new())?;

        loop {
            if self.interp.watches_interrupts() {
                external::take_interrupt();
            }
            let prompt = self.prompt()?;
            match self.reader.read_line(&prompt)? {
                ReadOutcome::Line(line) => {
                    if !line.trim().is_empty() {
                        self.reader.add_history(&line);
                    }
                    if self.handle(&line)? == Control::Exit {
                        break;
                    }
                }
                ReadOutcome::Interrupted => {
                    debug!("input interrupted");
                    self.interp.console().print("^C")?;
                }
                ReadOutcome::Eof => break,
            }
        }
        debug!("leaving interactive mode");
        Ok(0)
    }

    fn prompt(&mut self) -> Result<String> {
        match self.interp.emit(event::PROMPT, CallArgs::new()) {
            Ok(Some(value)) if !value.is_none() => return Ok(value.to_string()),
            Ok(_) => {}
            Err(err) => report(self.interp.console(), format!("{err:#}"))?,
        }
        Ok(self.interp.script().prompt.clone())
    }

    fn fire(&mut self, name: &str, call: CallArgs) -> Result<()> {
        if let Err(err) = self.interp.emit(name, call) {
            self.report_failure(&err)?;
        }
        Ok(())
    }

    fn report_failure(&mut self, err: &anyhow::Error) -> Result<()> {
        let interrupted = err
            .downcast_ref::<RuntimeError>()
            .is_some_and(RuntimeError::is_interrupted);
        if interrupted {
            self.interp.console().print("Interrupted")?;
        } else {
            report(self.interp.console(), format!("{err:#}"))?;
        }
        Ok(())
    }

    /// Handle one input line.
    pub fn handle(&mut self, line: &str) -> Result<Control> {
        let words = match split_words(line) {
            Ok(words) => words,
            Err(err) => {
                report(self.interp.console(), err)?;
                return Ok(Control::Continue);
            }
        };
        let Some((name, args)) = words.split_first() else {
            return Ok(Control::Continue);
        };

        if self.interp.script().commands.contains(name) {
            match self.interp.dispatch(name, args) {
                Ok(_) => {}
                Err(DispatchError::Arguments {
                    source: ArgumentError::HelpRequested(help),
                    ..
                }) => self.interp.console().print(&help)?,
                Err(DispatchError::Failed(err)) => self.report_failure(&err)?,
                Err(err) => self.interp.console().print(&err.to_string())?,
            }
            return Ok(Control::Continue);
        }

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        if let Some(result) = run_meta(self.interp, name, &args) {
            return result;
        }

        if self.interp.script().events.contains(event::DEFAULT) {
            self.fire(event::DEFAULT, CallArgs::positional(vec![Value::str(line)]))?;
        } else {
            self.interp
                .console()
                .print(&format!("zzz: Unknown command: {name}"))?;
        }
        Ok(Control::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Param;
    use crate::console::Console;
    use crate::io_adapters::collected;
    use crate::script::Script;
    use std::cell::RefCell;
    use std::rc::Rc;

    const QUIET: RunOptions = RunOptions {
        intro: false,
        clear: false,
    };

    fn interp() -> (Interpreter, Rc<RefCell<Vec<u8>>>) {
        let mut script = Script::new("demo");
        script
            .command("echo", vec![Param::variadic("words")], |interp, call| {
                let words: Vec<String> = call.args().map(Value::to_string).collect();
                interp.console().print(&words.join(" "))?;
                Ok(Value::None)
            })
            .unwrap();
        let (console, out) = Console::capture();
        (Interpreter::new(script).with_console(console), out)
    }

    #[test]
    fn splits_quoted_words() {
        assert_eq!(
            split_words(r#"say "hello world" it\'s 'a b'"#).unwrap(),
            ["say", "hello world", "it's", "a b"]
        );
        assert_eq!(split_words("  ").unwrap(), Vec::<String>::new());
        assert_eq!(split_words("a \"\"").unwrap(), ["a", ""]);
        assert_eq!(split_words("'open"), Err(SplitError::UnterminatedQuote));
    }

    #[test]
    fn runs_commands_until_exit() {
        let (mut interp, out) = interp();
        let reader = ScriptedReader::new(["echo a b", "", "exit", "echo never"]);
        let mut repl = Interactive::new(&mut interp, reader);
        assert_eq!(repl.run(QUIET).unwrap(), 0);
        assert_eq!(repl.reader().prompts.len(), 3);
        assert_eq!(collected(&out), "a b\n");
    }

    #[test]
    fn interrupt_reprompts_and_eof_ends() {
        let (mut interp, out) = interp();
        let reader = ScriptedReader::from_outcomes([
            ReadOutcome::Interrupted,
            ReadOutcome::Line("echo ok".into()),
        ]);
        let mut repl = Interactive::new(&mut interp, reader);
        repl.run(QUIET).unwrap();
        assert_eq!(repl.reader().prompts.len(), 3);
        assert_eq!(collected(&out), "^C\nok\n");
    }

    #[test]
    fn unknown_command_without_default_event() {
        let (mut interp, out) = interp();
        let mut repl = Interactive::new(&mut interp, ScriptedReader::default());
        repl.handle("launch now").unwrap();
        assert_eq!(collected(&out), "zzz: Unknown command: launch\n");
    }

    #[test]
    fn events_shape_the_loop() {
        let (mut interp, out) = interp();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let init_seen = seen.clone();
        let default_seen = seen.clone();
        let script = interp.script_mut();
        script.event(event::INIT, move |_, _| {
            init_seen.borrow_mut().push("init".to_string());
            Ok(Value::None)
        });
        script.event(event::PROMPT, |_, _| Ok(Value::str("custom> ")));
        script.event(event::DEFAULT, move |_, call| {
            default_seen.borrow_mut().push(call.arg(0).map(Value::to_string).unwrap_or_default());
            Ok(Value::None)
        });

        let reader = ScriptedReader::new(["launch now"]);
        let mut repl = Interactive::new(&mut interp, reader);
        repl.run(QUIET).unwrap();
        assert_eq!(repl.reader().prompts, ["custom> ", "custom> "]);
        assert_eq!(*seen.borrow(), ["init", "launch now"]);
        assert_eq!(collected(&out), "");
    }

    #[test]
    fn argument_errors_keep_the_loop_alive() {
        let mut script = Script::new("demo");
        script
            .command("one", vec![Param::required("x")], |_, _| Ok(Value::None))
            .unwrap();
        let (console, out) = Console::capture();
        let mut interp = Interpreter::new(script).with_console(console);
        let reader = ScriptedReader::new(["one", "one a b", "exit"]);
        let mut repl = Interactive::new(&mut interp, reader);
        repl.run(QUIET).unwrap();
        assert_eq!(repl.reader().prompts.len(), 3);
        let text = collected(&out);
        assert_eq!(text.matches("usage: one [-h] x").count(), 2);
    }
}
