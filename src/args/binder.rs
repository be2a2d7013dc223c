use super::parser::{ArgumentError, ParsedArgs};
use super::signature::{ArgumentSchema, Param, ParamKind};
use crate::value::Value;

/// Arguments arranged in a callable's own calling convention.
///
/// Invocation order is positional values, then variadic values, then keyword
/// values, then absorbed extra keyword values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub variadic: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
    pub extra: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional-only arguments.
    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            ..Self::default()
        }
    }

    /// All positional values, variadic ones included.
    pub fn args(&self) -> impl Iterator<Item = &Value> {
        self.positional.iter().chain(self.variadic.iter())
    }

    /// All named values, absorbed extras included.
    pub fn kwargs(&self) -> impl Iterator<Item = &(String, Value)> {
        self.keywords.iter().chain(self.extra.iter())
    }

    /// The `index`-th positional value, counting variadic values after the declared ones.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args().nth(index)
    }

    /// A named value by key.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.kwargs().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.variadic.len() + self.keywords.len() + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Map parsed values back onto the original parameter list.
///
/// Walks `params` (not the schema) in order. Variadic-positional parameters
/// pull their multi-valued slot, the variadic-keyword parameter collects the
/// absorbed names, required parameters must have a value and defaulted ones
/// fall back to their own default when parsing produced nothing.
pub fn project(
    params: &[Param],
    schema: &ArgumentSchema,
    mut parsed: ParsedArgs,
) -> Result<CallArgs, ArgumentError> {
    let mut call = CallArgs::new();
    for param in params {
        let dest = schema.slot_for(&param.name).map(|slot| slot.dest.as_str());
        match param.kind {
            ParamKind::Keywords => call.extra = parsed.take_extra(),
            ParamKind::Variadic => match dest.and_then(|d| parsed.take(d)) {
                Some(Value::List(items)) => call.variadic.extend(items),
                Some(Value::None) | None => {}
                Some(other) => call.variadic.push(other),
            },
            ParamKind::Required => {
                let value = dest
                    .and_then(|d| parsed.take(d))
                    .ok_or_else(|| ArgumentError::MissingParameter(param.name.clone()))?;
                call.positional.push(value);
            }
            ParamKind::Defaulted => {
                let value = match dest.and_then(|d| parsed.take(d)) {
                    Some(Value::None) | None => param.default.clone().unwrap_or(Value::None),
                    Some(value) => value,
                };
                call.keywords.push((param.name.clone(), value));
            }
        }
    }
    Ok(call)
}

/// Parse `tokens` against `schema` and project the result onto `params`.
pub fn bind<S: AsRef<str>>(
    params: &[Param],
    schema: &ArgumentSchema,
    tokens: &[S],
) -> Result<CallArgs, ArgumentError> {
    let parsed = schema.parse(tokens)?;
    project(params, schema, parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{ArgDescriptor, Arity, derive};
    use crate::value::ValueType;
    use std::collections::HashMap;

    #[test]
    fn projection_follows_calling_convention() {
        let params = vec![
            Param::required("a"),
            Param::optional("b", Value::Int(2)),
            Param::variadic("rest"),
        ];
        let schema = derive("f", &params, &HashMap::new()).unwrap();
        let call = bind(&params, &schema, &["x", "--b", "9", "y", "z"]).unwrap();
        let args: Vec<&Value> = call.args().collect();
        assert_eq!(args, [&Value::str("x"), &Value::str("y"), &Value::str("z")]);
        assert_eq!(call.get("b"), Some(&Value::Int(9)));
    }

    #[test]
    fn optional_falls_back_to_param_default() {
        let params = vec![Param::optional("level", Value::Int(3))
            .with_arg(ArgDescriptor::new(["--level"]).value_type(ValueType::Int))];
        let schema = derive("f", &params, &HashMap::new()).unwrap();
        let call = bind::<&str>(&params, &schema, &[]).unwrap();
        assert_eq!(call.get("level"), Some(&Value::Int(3)));
    }

    #[test]
    fn extra_keywords_are_absorbed() {
        let params = vec![Param::required("a"), Param::keywords("opts")];
        let schema = derive("f", &params, &HashMap::new()).unwrap();
        let call = bind(&params, &schema, &["x", "--mode", "fast"]).unwrap();
        assert_eq!(call.positional, vec![Value::str("x")]);
        assert_eq!(call.extra, vec![("mode".to_string(), Value::str("fast"))]);
        assert_eq!(call.get("mode"), Some(&Value::str("fast")));
    }

    #[test]
    fn override_forces_list_into_positional() {
        let params = vec![Param::required("names")
            .with_arg(ArgDescriptor::new(["--names"]).arity(Arity::ZeroOrMore))];
        let schema = derive("f", &params, &HashMap::new()).unwrap();
        let call = bind(&params, &schema, &["--names", "a", "b"]).unwrap();
        assert_eq!(
            call.positional,
            vec![Value::List(vec![Value::str("a"), Value::str("b")])]
        );
    }
}
