use std::collections::HashMap;

use thiserror::Error;

use super::descriptor::Arity;
use super::signature::{ArgumentSchema, Slot};
use crate::value::{Value, ValueType};

/// Errors produced while parsing raw tokens against a schema.
///
/// These are recoverable: the runner reports them and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    #[error("unrecognized argument: {0}")]
    UnknownFlag(String),
    #[error("argument {0}: expected a value")]
    MissingValue(String),
    #[error("argument {0}: ignored explicit value")]
    FlagWithValue(String),
    #[error("the following arguments are required: {0}")]
    MissingPositional(String),
    #[error("unrecognized arguments: {}", .0.join(" "))]
    TooMany(Vec<String>),
    #[error("argument {arg}: invalid {expected} value: {value:?}")]
    InvalidValue {
        arg: String,
        value: String,
        expected: ValueType,
    },
    /// `-h`/`--help` was given; carries the rendered help text.
    #[error("{0}")]
    HelpRequested(String),
    #[error("no value for parameter '{0}'")]
    MissingParameter(String),
}

/// Result of parsing: one value per slot, keyed by the slot's destination,
/// plus any `--key value` pairs absorbed for a variadic-keyword parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    values: HashMap<String, Value>,
    extra: Vec<(String, Value)>,
}

impl ParsedArgs {
    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.values.get(dest)
    }

    pub fn take(&mut self, dest: &str) -> Option<Value> {
        self.values.remove(dest)
    }

    pub fn extra(&self) -> &[(String, Value)] {
        &self.extra
    }

    pub fn take_extra(&mut self) -> Vec<(String, Value)> {
        std::mem::take(&mut self.extra)
    }
}

fn looks_like_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

fn convert(slot: &Slot, raw: &str) -> Result<Value, ArgumentError> {
    slot.value_type
        .parse(raw)
        .map_err(|_| ArgumentError::InvalidValue {
            arg: slot.display_name(),
            value: raw.to_string(),
            expected: slot.value_type,
        })
}

/// Cursor over the raw tokens of one invocation.
struct TokenCursor<'a> {
    schema: &'a ArgumentSchema,
    tokens: Vec<String>,
    pos: usize,
    positionals: Vec<String>,
    parsed: ParsedArgs,
}

impl<'a> TokenCursor<'a> {
    fn new(schema: &'a ArgumentSchema, tokens: Vec<String>) -> Self {
        Self {
            schema,
            tokens,
            pos: 0,
            positionals: Vec::new(),
            parsed: ParsedArgs::default(),
        }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn consume(&mut self) -> Option<String> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Next token if it can serve as an option's value.
    fn consume_value(&mut self) -> Option<String> {
        match self.peek() {
            Some(tok) if !looks_like_flag(tok) && tok != "--" => self.consume(),
            _ => None,
        }
    }

    fn run(mut self) -> Result<ParsedArgs, ArgumentError> {
        let mut flags_done = false;
        while let Some(token) = self.consume() {
            if flags_done || !looks_like_flag(&token) {
                if token == "--" && !flags_done {
                    flags_done = true;
                } else {
                    self.positionals.push(token);
                }
                continue;
            }
            if token == "-h" || token == "--help" {
                return Err(ArgumentError::HelpRequested(self.schema.help()));
            }
            self.handle_option(&token)?;
        }
        self.assign_positionals()?;
        self.fill_defaults();
        Ok(self.parsed)
    }

    fn handle_option(&mut self, token: &str) -> Result<(), ArgumentError> {
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) if token.starts_with("--") => (name, Some(value.to_string())),
            _ => (token, None),
        };

        let schema = self.schema;
        let Some(slot) = schema.find_option(name) else {
            return self.absorb_extra(token, name, inline);
        };

        let value = match slot.arity {
            Arity::Flag => {
                if inline.is_some() {
                    return Err(ArgumentError::FlagWithValue(name.to_string()));
                }
                Value::Bool(true)
            }
            Arity::One => {
                let raw = inline
                    .or_else(|| self.consume_value())
                    .ok_or_else(|| ArgumentError::MissingValue(name.to_string()))?;
                convert(slot, &raw)?
            }
            Arity::ZeroOrMore => {
                let mut items = Vec::new();
                if let Some(raw) = inline {
                    items.push(convert(slot, &raw)?);
                } else {
                    while let Some(raw) = self.consume_value() {
                        items.push(convert(slot, &raw)?);
                    }
                }
                Value::List(items)
            }
        };
        self.parsed.values.insert(slot.dest.clone(), value);
        Ok(())
    }

    fn absorb_extra(
        &mut self,
        token: &str,
        name: &str,
        inline: Option<String>,
    ) -> Result<(), ArgumentError> {
        if !self.schema.accepts_extra() || !name.starts_with("--") || name.len() < 3 {
            return Err(ArgumentError::UnknownFlag(token.to_string()));
        }
        let key = name.trim_start_matches('-').replace('-', "_");
        let value = match inline.or_else(|| self.consume_value()) {
            Some(raw) => Value::Str(raw),
            None => Value::Bool(true),
        };
        self.parsed.extra.retain(|(k, _)| *k != key);
        self.parsed.extra.push((key, value));
        Ok(())
    }

    fn assign_positionals(&mut self) -> Result<(), ArgumentError> {
        let schema = self.schema;
        let slots: Vec<&Slot> = schema.positional_slots().collect();
        let mut remaining = std::mem::take(&mut self.positionals).into_iter();
        let mut left = remaining.len();

        for (index, slot) in slots.iter().enumerate() {
            match slot.arity {
                Arity::One => match remaining.next() {
                    Some(raw) => {
                        left -= 1;
                        let value = convert(slot, &raw)?;
                        self.parsed.values.insert(slot.dest.clone(), value);
                    }
                    None if slot.required => {
                        return Err(ArgumentError::MissingPositional(slot.dest.clone()));
                    }
                    None => {}
                },
                Arity::ZeroOrMore | Arity::Flag => {
                    let reserved = slots[index + 1..]
                        .iter()
                        .filter(|s| s.arity == Arity::One && s.required)
                        .count();
                    let take = left.saturating_sub(reserved);
                    let mut items = Vec::with_capacity(take);
                    for raw in remaining.by_ref().take(take) {
                        items.push(convert(slot, &raw)?);
                    }
                    left -= take;
                    self.parsed.values.insert(slot.dest.clone(), Value::List(items));
                }
            }
        }

        let leftover: Vec<String> = remaining.collect();
        if leftover.is_empty() {
            Ok(())
        } else {
            Err(ArgumentError::TooMany(leftover))
        }
    }

    fn fill_defaults(&mut self) {
        let schema = self.schema;
        for slot in schema.slots() {
            if self.parsed.values.contains_key(&slot.dest) {
                continue;
            }
            let value = match (&slot.default, slot.arity) {
                (Some(default), _) => default.clone(),
                (None, Arity::Flag) => Value::Bool(false),
                (None, Arity::ZeroOrMore) => Value::List(Vec::new()),
                (None, Arity::One) => Value::None,
            };
            self.parsed.values.insert(slot.dest.clone(), value);
        }
    }
}

impl ArgumentSchema {
    /// Parse raw tokens into one value per slot.
    ///
    /// Options may appear anywhere; `--` ends option processing. Positional
    /// tokens fill positional slots in declared order, a multi-valued slot
    /// leaving room for the required slots after it.
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S]) -> Result<ParsedArgs, ArgumentError> {
        let tokens = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        TokenCursor::new(self, tokens).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{ArgDescriptor, Param, derive};

    fn schema(params: &[Param]) -> ArgumentSchema {
        derive("cmd", params, &HashMap::new()).unwrap()
    }

    #[test]
    fn positional_and_typed_option() {
        let s = schema(&[
            Param::required("name"),
            Param::optional("count", Value::Int(1)),
        ]);
        let parsed = s.parse(&["--count", "3", "bob"]).unwrap();
        assert_eq!(parsed.get("name"), Some(&Value::str("bob")));
        assert_eq!(parsed.get("count"), Some(&Value::Int(3)));

        let parsed = s.parse(&["bob", "--count=7"]).unwrap();
        assert_eq!(parsed.get("count"), Some(&Value::Int(7)));
    }

    #[test]
    fn defaults_fill_absent_slots() {
        let s = schema(&[
            Param::optional("count", Value::Int(1)),
            Param::variadic("rest"),
        ]);
        let parsed = s.parse::<&str>(&[]).unwrap();
        assert_eq!(parsed.get("count"), Some(&Value::Int(1)));
        assert_eq!(parsed.get("rest"), Some(&Value::List(vec![])));
    }

    #[test]
    fn missing_required_positional() {
        let s = schema(&[Param::required("a"), Param::required("b")]);
        assert_eq!(
            s.parse(&["x"]),
            Err(ArgumentError::MissingPositional("b".into()))
        );
    }

    #[test]
    fn too_many_positionals() {
        let s = schema(&[Param::required("a")]);
        assert_eq!(
            s.parse(&["x", "y"]),
            Err(ArgumentError::TooMany(vec!["y".into()]))
        );
    }

    #[test]
    fn unknown_flag_rejected() {
        let s = schema(&[Param::required("a")]);
        assert_eq!(
            s.parse(&["x", "--nope"]),
            Err(ArgumentError::UnknownFlag("--nope".into()))
        );
    }

    #[test]
    fn unknown_flags_absorbed_with_keywords_param() {
        let s = schema(&[Param::required("a"), Param::keywords("extra")]);
        let parsed = s.parse(&["x", "--color", "red", "--dry-run"]).unwrap();
        assert_eq!(
            parsed.extra(),
            &[
                ("color".to_string(), Value::str("red")),
                ("dry_run".to_string(), Value::Bool(true)),
            ]
        );
    }

    #[test]
    fn invalid_value_reports_slot() {
        let s = schema(&[Param::required("n").typed(ValueType::Int)]);
        let err = s.parse(&["abc"]).unwrap_err();
        assert_eq!(
            err,
            ArgumentError::InvalidValue {
                arg: "n".into(),
                value: "abc".into(),
                expected: ValueType::Int,
            }
        );
    }

    #[test]
    fn negative_numbers_are_positionals() {
        let s = schema(&[Param::required("n").typed(ValueType::Int)]);
        assert_eq!(s.parse(&["-5"]).unwrap().get("n"), Some(&Value::Int(-5)));
    }

    #[test]
    fn double_dash_ends_options() {
        let s = schema(&[Param::variadic("rest")]);
        let parsed = s.parse(&["--", "--literal", "x"]).unwrap();
        assert_eq!(
            parsed.get("rest"),
            Some(&Value::List(vec![Value::str("--literal"), Value::str("x")]))
        );
    }

    #[test]
    fn variadic_leaves_room_for_trailing_positional() {
        let params = vec![
            Param::required("files")
                .with_arg(ArgDescriptor::new(["files"]).arity(Arity::ZeroOrMore)),
            Param::required("dest"),
        ];
        let s = schema(&params);
        let parsed = s.parse(&["a", "b", "c"]).unwrap();
        assert_eq!(
            parsed.get("files"),
            Some(&Value::List(vec![Value::str("a"), Value::str("b")]))
        );
        assert_eq!(parsed.get("dest"), Some(&Value::str("c")));
    }

    #[test]
    fn flag_option() {
        let params = vec![Param::optional("force", Value::Bool(false))
            .with_arg(ArgDescriptor::flag(["-f", "--force"]))];
        let s = schema(&params);
        assert_eq!(s.parse(&["-f"]).unwrap().get("force"), Some(&Value::Bool(true)));
        assert_eq!(
            s.parse::<&str>(&[]).unwrap().get("force"),
            Some(&Value::Bool(false))
        );
        assert_eq!(
            s.parse(&["--force=1"]),
            Err(ArgumentError::FlagWithValue("--force".into()))
        );
    }

    #[test]
    fn help_is_reported() {
        let s = schema(&[Param::required("a")]);
        match s.parse(&["-h"]) {
            Err(ArgumentError::HelpRequested(text)) => assert!(text.starts_with("usage: cmd")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
