//! Runtime-configurable script options.

use thiserror::Error;
use tracing::debug;

use crate::value::{Value, ValueType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("option '{0}' does not exist")]
    UnknownOption(String),
    #[error("option '{name}' expects type {ty}, but got {value}")]
    TypeMismatch {
        name: String,
        value: String,
        ty: ValueType,
    },
    #[error("invalid value for option '{name}': {value}. Allowed choices: {choices}")]
    InvalidChoice {
        name: String,
        value: String,
        choices: String,
    },
    #[error("choices for option '{name}' cannot be cast to {ty}")]
    BadChoices { name: String, ty: ValueType },
    #[error("required option '{0}' is missing a value")]
    MissingValue(String),
    #[error("option '{0}' must have a value unless it is required")]
    MissingDefault(String),
}

/// A named, typed value a script user can change at runtime.
///
/// Every write casts to the option type and checks the choice set before
/// committing. A required option may start empty; reading it before a value
/// is set fails.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOption {
    name: String,
    value: Option<Value>,
    ty: ValueType,
    choices: Vec<Value>,
    required: bool,
}

impl ScriptOption {
    pub fn new(
        name: impl Into<String>,
        value: Option<Value>,
        ty: ValueType,
        choices: Vec<Value>,
        required: bool,
    ) -> Result<Self, OptionError> {
        let name = name.into();
        let value = value.filter(|v| !v.is_none());
        if !required && value.is_none() {
            return Err(OptionError::MissingDefault(name));
        }
        let mut option = Self {
            name,
            value: None,
            ty,
            choices,
            required,
        };
        if let Some(value) = value {
            option.set(&value)?;
        }
        Ok(option)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.ty
    }

    pub fn choices(&self) -> &[Value] {
        &self.choices
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The current value, without the required check.
    pub fn peek(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn get(&self) -> Result<&Value, OptionError> {
        self.value
            .as_ref()
            .ok_or_else(|| OptionError::MissingValue(self.name.clone()))
    }

    pub fn set(&mut self, raw: &Value) -> Result<(), OptionError> {
        let value = self.ty.cast(raw).map_err(|_| OptionError::TypeMismatch {
            name: self.name.clone(),
            value: raw.repr(),
            ty: self.ty,
        })?;

        if !self.choices.is_empty() {
            let allowed = self
                .choices
                .iter()
                .map(|c| self.ty.cast(c))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| OptionError::BadChoices {
                    name: self.name.clone(),
                    ty: self.ty,
                })?;
            if !allowed.contains(&value) {
                return Err(OptionError::InvalidChoice {
                    name: self.name.clone(),
                    value: value.repr(),
                    choices: Value::List(allowed).to_string(),
                });
            }
        }

        self.value = Some(value);
        Ok(())
    }
}

/// Ordered collection of [`ScriptOption`]s keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptOptions {
    options: Vec<ScriptOption>,
}

impl ScriptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an option.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        value: Option<Value>,
        ty: ValueType,
        choices: Vec<Value>,
        required: bool,
    ) -> Result<&ScriptOption, OptionError> {
        let option = ScriptOption::new(name, value, ty, choices, required)?;
        debug!(option = option.name(), ty = %ty, required, "option added");
        let index = match self.options.iter().position(|o| o.name == option.name) {
            Some(index) => {
                self.options[index] = option;
                index
            }
            None => {
                self.options.push(option);
                self.options.len() - 1
            }
        };
        Ok(&self.options[index])
    }

    pub fn option(&self, name: &str) -> Result<&ScriptOption, OptionError> {
        self.options
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| OptionError::UnknownOption(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<&Value, OptionError> {
        self.option(name)?.get()
    }

    pub fn set(&mut self, name: &str, value: &Value) -> Result<(), OptionError> {
        self.options
            .iter_mut()
            .find(|o| o.name == name)
            .ok_or_else(|| OptionError::UnknownOption(name.to_string()))?
            .set(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScriptOption> {
        self.options.iter()
    }

    /// Required options that still have no value.
    pub fn missing(&self) -> impl Iterator<Item = &ScriptOption> {
        self.options
            .iter()
            .filter(|o| o.required && o.value.is_none())
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_options() -> ScriptOptions {
        let mut options = ScriptOptions::new();
        options
            .add(
                "level",
                Some(Value::Int(1)),
                ValueType::Int,
                vec![Value::Int(1), Value::Int(2), Value::Int(3)],
                false,
            )
            .unwrap();
        options
    }

    #[test]
    fn set_validates_choices_and_type() {
        let mut options = level_options();
        assert!(matches!(
            options.set("level", &Value::Int(5)),
            Err(OptionError::InvalidChoice { .. })
        ));
        assert!(matches!(
            options.set("level", &Value::str("abc")),
            Err(OptionError::TypeMismatch { .. })
        ));
        options.set("level", &Value::str("2")).unwrap();
        assert_eq!(options.get("level"), Ok(&Value::Int(2)));
    }

    #[test]
    fn failed_set_keeps_previous_value() {
        let mut options = level_options();
        let _ = options.set("level", &Value::Int(9));
        assert_eq!(options.get("level"), Ok(&Value::Int(1)));
    }

    #[test]
    fn required_option_fails_on_read_only() {
        let mut options = ScriptOptions::new();
        options
            .add("host", None, ValueType::Str, vec![], true)
            .unwrap();
        assert_eq!(
            options.get("host"),
            Err(OptionError::MissingValue("host".into()))
        );
        assert_eq!(options.missing().count(), 1);
        options.set("host", &Value::str("example.org")).unwrap();
        assert_eq!(options.get("host"), Ok(&Value::str("example.org")));
    }

    #[test]
    fn optional_option_needs_value() {
        let mut options = ScriptOptions::new();
        assert_eq!(
            options.add("port", None, ValueType::Int, vec![], false).err(),
            Some(OptionError::MissingDefault("port".into()))
        );
    }

    #[test]
    fn unknown_option() {
        let options = ScriptOptions::new();
        assert_eq!(
            options.get("nope"),
            Err(OptionError::UnknownOption("nope".into()))
        );
    }

    #[test]
    fn string_choices_are_cast() {
        let mut options = ScriptOptions::new();
        options
            .add(
                "mode",
                Some(Value::str("1")),
                ValueType::Int,
                vec![Value::str("1"), Value::str("2")],
                false,
            )
            .unwrap();
        options.set("mode", &Value::Float(2.0)).unwrap();
        assert_eq!(options.get("mode"), Ok(&Value::Int(2)));
    }
}
