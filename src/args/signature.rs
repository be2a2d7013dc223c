use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use thiserror::Error;

use super::descriptor::{ArgDescriptor, Arity};
use crate::value::{Value, ValueType};

/// Calling-convention role of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Positional parameter without a default.
    Required,
    /// Parameter with a default value, passed by keyword.
    Defaulted,
    /// `*rest`: absorbs extra positional values.
    Variadic,
    /// `**extra`: absorbs named values nobody else claimed.
    Keywords,
}

/// Description of one parameter of a callable.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    /// Declared type; `None` falls back to the default's type, then `str`.
    pub declared: Option<ValueType>,
    pub default: Option<Value>,
    /// Explicit descriptor replacing the derived slot.
    pub arg: Option<ArgDescriptor>,
}

impl Param {
    fn new(name: impl Into<String>, kind: ParamKind, default: Option<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            declared: None,
            default,
            arg: None,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Required, None)
    }

    pub fn optional(name: impl Into<String>, default: Value) -> Self {
        Self::new(name, ParamKind::Defaulted, Some(default))
    }

    pub fn variadic(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Variadic, None)
    }

    pub fn keywords(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Keywords, None)
    }

    pub fn typed(mut self, ty: ValueType) -> Self {
        self.declared = Some(ty);
        self
    }

    pub fn with_arg(mut self, arg: ArgDescriptor) -> Self {
        self.arg = Some(arg);
        self
    }
}

/// Errors raised while deriving a schema from a parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{prog}: argument name '{name}' is used more than once")]
    Collision { prog: String, name: String },
    #[error("{prog}: parameter '{param}' follows a variadic parameter")]
    VariadicNotTrailing { prog: String, param: String },
    #[error("{prog}: only one {kind} parameter is allowed")]
    DuplicateVariadic { prog: String, kind: &'static str },
    #[error("{prog}: required parameter '{param}' follows a parameter with a default")]
    RequiredAfterDefault { prog: String, param: String },
    #[error("{prog}: invalid argument descriptor for '{param}': {reason}")]
    InvalidDescriptor {
        prog: String,
        param: String,
        reason: &'static str,
    },
}

/// One derived argument position or option.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Key in the parsed mapping.
    pub dest: String,
    /// External names: one bare name for positionals, `-x`/`--xx` for options.
    pub names: Vec<String>,
    pub positional: bool,
    pub arity: Arity,
    pub value_type: ValueType,
    pub default: Option<Value>,
    pub required: bool,
    pub help: String,
    /// The parameter this slot was derived from.
    pub param: String,
}

impl Slot {
    fn metavar(&self) -> String {
        if self.positional {
            self.dest.clone()
        } else {
            self.dest.to_uppercase()
        }
    }

    /// Name used in error messages.
    pub fn display_name(&self) -> String {
        if self.positional {
            self.dest.clone()
        } else {
            self.names.join("/")
        }
    }

    fn usage_fragment(&self) -> String {
        let metavar = self.metavar();
        match (self.positional, self.arity) {
            (true, Arity::One) => metavar,
            (true, _) => format!("[{metavar} ...]"),
            (false, Arity::Flag) => format!("[{}]", self.names[0]),
            (false, Arity::One) => format!("[{} {metavar}]", self.names[0]),
            (false, Arity::ZeroOrMore) => format!("[{} [{metavar} ...]]", self.names[0]),
        }
    }
}

/// Ordered slots derived from one callable, built once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSchema {
    prog: String,
    slots: Vec<Slot>,
    accepts_extra: bool,
}

impl ArgumentSchema {
    pub fn prog(&self) -> &str {
        &self.prog
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Whether unknown `--key value` options are absorbed instead of rejected.
    pub fn accepts_extra(&self) -> bool {
        self.accepts_extra
    }

    pub fn positional_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.positional)
    }

    pub fn find_option(&self, name: &str) -> Option<&Slot> {
        self.slots
            .iter()
            .filter(|s| !s.positional)
            .find(|s| s.names.iter().any(|n| n == name))
    }

    /// Slot derived from parameter `param`, if any.
    pub fn slot_for(&self, param: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.param == param)
    }

    /// One-line usage, options first then positionals.
    pub fn usage(&self) -> String {
        let mut parts = vec![self.prog.clone(), "[-h]".to_string()];
        parts.extend(
            self.slots
                .iter()
                .filter(|s| !s.positional)
                .map(Slot::usage_fragment),
        );
        parts.extend(self.positional_slots().map(Slot::usage_fragment));
        if self.accepts_extra {
            parts.push("[--KEY VALUE ...]".to_string());
        }
        format!("usage: {}", parts.join(" "))
    }

    /// Full help text: usage plus one line per argument.
    pub fn help(&self) -> String {
        let mut out = self.usage();
        let positionals: Vec<&Slot> = self.positional_slots().collect();
        if !positionals.is_empty() {
            out.push_str("\n\npositional arguments:");
            for slot in positionals {
                let _ = write!(out, "\n  {:<20} {}", slot.dest, slot.help);
            }
        }
        out.push_str("\n\noptions:\n  -h, --help           show this help message and exit");
        for slot in self.slots.iter().filter(|s| !s.positional) {
            let mut label = slot.names.join(", ");
            if slot.arity != Arity::Flag {
                label.push(' ');
                label.push_str(&slot.metavar());
            }
            let mut line = format!("\n  {label:<20} {}", slot.help);
            if let Some(default) = slot.default.as_ref().filter(|d| !d.is_none()) {
                let _ = write!(line, " (default: {})", default.repr());
            }
            out.push_str(line.trim_end());
        }
        out
    }
}

/// Derive the argument schema of a callable from its parameter list.
///
/// Per parameter, in order: a variadic-positional becomes a zero-or-more
/// positional slot; a variadic-keyword emits nothing; an explicit descriptor
/// (from `overrides`, else from [`Param::arg`]) is used verbatim; a parameter
/// without default becomes a required positional; one with a default becomes
/// an optional `--name` slot.
pub fn derive(
    prog: &str,
    params: &[Param],
    overrides: &HashMap<String, ArgDescriptor>,
) -> Result<ArgumentSchema, SchemaError> {
    check_order(prog, params)?;

    let mut slots = Vec::new();
    for param in params {
        let explicit = overrides.get(&param.name).or(param.arg.as_ref());
        let slot = match (param.kind, explicit) {
            (ParamKind::Keywords, _) => continue,
            (ParamKind::Variadic, _) => Slot {
                dest: param.name.clone(),
                names: vec![param.name.clone()],
                positional: true,
                arity: Arity::ZeroOrMore,
                value_type: param.declared.unwrap_or(ValueType::Str),
                default: Some(Value::List(Vec::new())),
                required: false,
                help: format!("extra positional values for {}", param.name),
                param: param.name.clone(),
            },
            (_, Some(desc)) => slot_from_descriptor(prog, param, desc)?,
            (ParamKind::Required, None) => Slot {
                dest: param.name.clone(),
                names: vec![param.name.clone()],
                positional: true,
                arity: Arity::One,
                value_type: param.declared.unwrap_or(ValueType::Str),
                default: None,
                required: true,
                help: String::new(),
                param: param.name.clone(),
            },
            (ParamKind::Defaulted, None) => {
                let default = param.default.clone().unwrap_or(Value::None);
                Slot {
                    dest: param.name.clone(),
                    names: vec![format!("--{}", param.name)],
                    positional: false,
                    arity: Arity::One,
                    value_type: param
                        .declared
                        .or_else(|| default.value_type())
                        .unwrap_or(ValueType::Str),
                    default: Some(default),
                    required: false,
                    help: String::new(),
                    param: param.name.clone(),
                }
            }
        };
        slots.push(slot);
    }

    let mut seen = HashSet::new();
    for slot in &slots {
        let mut keys: Vec<&str> = slot.names.iter().map(String::as_str).collect();
        if !slot.positional {
            keys.push(slot.dest.as_str());
        }
        keys.dedup();
        for key in keys {
            if !seen.insert(key.to_string()) {
                return Err(SchemaError::Collision {
                    prog: prog.to_string(),
                    name: key.to_string(),
                });
            }
        }
    }

    Ok(ArgumentSchema {
        prog: prog.to_string(),
        slots,
        accepts_extra: params.iter().any(|p| p.kind == ParamKind::Keywords),
    })
}

fn check_order(prog: &str, params: &[Param]) -> Result<(), SchemaError> {
    let mut names = HashSet::new();
    let mut seen_default = false;
    let mut seen_variadic = false;
    let mut seen_keywords = false;
    for param in params {
        if !names.insert(param.name.as_str()) {
            return Err(SchemaError::Collision {
                prog: prog.to_string(),
                name: param.name.clone(),
            });
        }
        if seen_keywords {
            return Err(SchemaError::VariadicNotTrailing {
                prog: prog.to_string(),
                param: param.name.clone(),
            });
        }
        match param.kind {
            ParamKind::Required | ParamKind::Defaulted if seen_variadic => {
                return Err(SchemaError::VariadicNotTrailing {
                    prog: prog.to_string(),
                    param: param.name.clone(),
                });
            }
            ParamKind::Required if seen_default => {
                return Err(SchemaError::RequiredAfterDefault {
                    prog: prog.to_string(),
                    param: param.name.clone(),
                });
            }
            ParamKind::Required => {}
            ParamKind::Defaulted => seen_default = true,
            ParamKind::Variadic if seen_variadic => {
                return Err(SchemaError::DuplicateVariadic {
                    prog: prog.to_string(),
                    kind: "variadic-positional",
                });
            }
            ParamKind::Variadic => seen_variadic = true,
            ParamKind::Keywords => seen_keywords = true,
        }
    }
    Ok(())
}

fn slot_from_descriptor(
    prog: &str,
    param: &Param,
    desc: &ArgDescriptor,
) -> Result<Slot, SchemaError> {
    let invalid = |reason| SchemaError::InvalidDescriptor {
        prog: prog.to_string(),
        param: param.name.clone(),
        reason,
    };
    if desc.names().is_empty() {
        return Err(invalid("no names given"));
    }
    let positional = desc.is_positional();
    if positional && desc.names().len() > 1 {
        return Err(invalid("a positional argument takes exactly one name"));
    }
    if !positional && desc.names().iter().any(|n| !n.starts_with('-')) {
        return Err(invalid("option names must all start with '-'"));
    }
    if positional && desc.get_arity() == Arity::Flag {
        return Err(invalid("a positional argument cannot be a flag"));
    }

    let default = match (desc.get_default(), desc.get_arity()) {
        (Some(d), _) => Some(d.clone()),
        (None, Arity::Flag) => Some(Value::Bool(false)),
        (None, Arity::ZeroOrMore) => Some(Value::List(Vec::new())),
        (None, Arity::One) if !positional => Some(Value::None),
        (None, Arity::One) => None,
    };
    Ok(Slot {
        dest: desc.dest(),
        names: desc.names().to_vec(),
        positional,
        arity: desc.get_arity(),
        value_type: desc.get_value_type(),
        required: positional && desc.get_arity() == Arity::One && desc.get_default().is_none(),
        default,
        help: desc.get_help().to_string(),
        param: param.name.clone(),
    })
}
