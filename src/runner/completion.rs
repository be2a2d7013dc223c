//! Tab completion for the interactive prompt.

use std::collections::BTreeMap;

use rustyline::Helper;
use rustyline::completion::Completer;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;

use super::builtin::meta_commands;
use crate::script::Script;

/// What the word under the cursor names.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CompletionContext {
    /// First word: a script or meta command.
    Command,
    /// `zset <name>`
    OptionName,
    /// `zset <name> <value>`
    OptionValue(String),
    None,
}

fn detect_context(words: &[&str]) -> CompletionContext {
    match words {
        [] => CompletionContext::Command,
        ["help"] => CompletionContext::Command,
        ["zset"] => CompletionContext::OptionName,
        ["zset", name] => CompletionContext::OptionValue(name.to_string()),
        _ => CompletionContext::None,
    }
}

/// Candidates drawn from a script's commands and options, captured once
/// when the prompt starts.
#[derive(Debug, Clone, Default)]
pub struct ScriptCompleter {
    commands: Vec<String>,
    /// Option name to its allowed values, empty when unrestricted.
    options: BTreeMap<String, Vec<String>>,
}

impl ScriptCompleter {
    pub fn from_script(script: &Script) -> Self {
        let mut commands: Vec<String> = script
            .commands
            .iter()
            .map(|c| c.name().to_string())
            .chain(meta_commands().iter().map(|m| m.name().to_string()))
            .collect();
        commands.sort();
        commands.dedup();
        let options = script
            .options
            .iter()
            .map(|o| {
                let choices = o.choices().iter().map(ToString::to_string).collect();
                (o.name().to_string(), choices)
            })
            .collect();
        Self { commands, options }
    }

    /// Start of the word ending at `pos` and the matching candidates.
    pub fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let before = line.get(..pos).unwrap_or(line);
        let start = before
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8());
        let prefix = &before[start..];
        let words: Vec<&str> = before[..start].split_whitespace().collect();

        let pool: Vec<&String> = match detect_context(&words) {
            CompletionContext::Command => self.commands.iter().collect(),
            CompletionContext::OptionName => self.options.keys().collect(),
            CompletionContext::OptionValue(name) => {
                self.options.get(&name).into_iter().flatten().collect()
            }
            CompletionContext::None => Vec::new(),
        };
        let matches = pool
            .into_iter()
            .filter(|candidate| candidate.starts_with(prefix))
            .cloned()
            .collect();
        (start, matches)
    }
}

impl Completer for ScriptCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(self.candidates(line, pos))
    }
}

impl Hinter for ScriptCompleter {
    type Hint = String;
}

impl Highlighter for ScriptCompleter {}

impl Validator for ScriptCompleter {}

impl Helper for ScriptCompleter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, ValueType};

    fn completer() -> ScriptCompleter {
        let mut script = Script::new("demo");
        for name in ["deploy", "destroy", "status"] {
            script.command(name, vec![], |_, _| Ok(Value::None)).unwrap();
        }
        let colors = vec![Value::str("red"), Value::str("green"), Value::str("grey")];
        script
            .options
            .add("color", Some(Value::str("red")), ValueType::Str, colors, false)
            .unwrap();
        script
            .options
            .add("count", Some(Value::Int(1)), ValueType::Int, vec![], false)
            .unwrap();
        ScriptCompleter::from_script(&script)
    }

    #[test]
    fn command_names_include_meta_commands() {
        let c = completer();
        assert_eq!(c.candidates("de", 2), (0, vec!["deploy".into(), "destroy".into()]));
        let (_, all) = c.candidates("", 0);
        for name in ["clear", "exit", "help", "ls", "pwd", "script", "status", "zset"] {
            assert!(all.iter().any(|c| c == name), "{name} missing from {all:?}");
        }
        assert_eq!(c.candidates("help st", 7), (5, vec!["status".into()]));
    }

    #[test]
    fn zset_completes_option_names_then_choices() {
        let c = completer();
        assert_eq!(c.candidates("zset c", 6), (5, vec!["color".into(), "count".into()]));
        assert_eq!(c.candidates("zset color gr", 13), (11, vec!["green".into(), "grey".into()]));
        assert_eq!(c.candidates("zset count ", 11), (11, vec![]));
        assert_eq!(c.candidates("zset nope ", 10), (10, vec![]));
    }

    #[test]
    fn arguments_of_script_commands_are_not_completed() {
        let c = completer();
        assert_eq!(c.candidates("deploy x", 8), (7, vec![]));
    }
}
