use crate::value::{Value, ValueType};

/// How many values an argument consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly one value.
    One,
    /// Any number of values, collected into a list.
    ZeroOrMore,
    /// No value; presence sets `True`.
    Flag,
}

/// Explicit description of one command-line argument.
///
/// Attached to a parameter it replaces the automatically derived slot, which
/// lets a parameter be forced positional, flagged or multi-valued regardless
/// of its natural shape. Names beginning with `-` make a named option; a
/// single bare name makes a positional argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgDescriptor {
    names: Vec<String>,
    arity: Arity,
    value_type: ValueType,
    default: Option<Value>,
    help: String,
}

impl ArgDescriptor {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            arity: Arity::One,
            value_type: ValueType::Str,
            default: None,
            help: String::new(),
        }
    }

    /// A boolean switch (`--verbose`) that defaults to `False`.
    pub fn flag<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names)
            .arity(Arity::Flag)
            .value_type(ValueType::Bool)
            .default(Value::Bool(false))
    }

    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get_arity(&self) -> Arity {
        self.arity
    }

    pub fn get_value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn get_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn get_help(&self) -> &str {
        &self.help
    }

    pub fn is_positional(&self) -> bool {
        self.names.first().is_some_and(|n| !n.starts_with('-'))
    }

    /// Key under which the parsed value is stored.
    ///
    /// The first `--long` name wins, then the first short name; dashes inside
    /// the name become underscores.
    pub fn dest(&self) -> String {
        let chosen = self
            .names
            .iter()
            .find(|n| n.starts_with("--"))
            .or_else(|| self.names.first())
            .map(String::as_str)
            .unwrap_or_default();
        chosen.trim_start_matches('-').replace('-', "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dest_prefers_long_name() {
        let desc = ArgDescriptor::new(["-o", "--out-file"]);
        assert_eq!(desc.dest(), "out_file");
        assert!(!desc.is_positional());
    }

    #[test]
    fn dest_of_short_only_option() {
        assert_eq!(ArgDescriptor::new(["-v"]).dest(), "v");
    }

    #[test]
    fn bare_name_is_positional() {
        let desc = ArgDescriptor::new(["files"]).arity(Arity::ZeroOrMore);
        assert!(desc.is_positional());
        assert_eq!(desc.dest(), "files");
    }

    #[test]
    fn flag_defaults_to_false() {
        let desc = ArgDescriptor::flag(["--force"]);
        assert_eq!(desc.get_arity(), Arity::Flag);
        assert_eq!(desc.get_default(), Some(&Value::Bool(false)));
    }
}
