//! Dynamically typed values shared by the argument binder and the evaluator.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use thiserror::Error;

use crate::args::ArgDescriptor;
use crate::lang::interp::{Builtin, Function};

/// Declared type of a parameter, slot or script option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Str,
    Int,
    Float,
    Bool,
}

/// A value could not be converted to the requested [`ValueType`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {ty}, got {value}")]
pub struct CastError {
    /// Rendering of the rejected value.
    pub value: String,
    pub ty: ValueType,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Str => "str",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
        }
    }

    /// Parse a raw command-line token into a value of this type.
    pub fn parse(self, raw: &str) -> Result<Value, CastError> {
        self.cast(&Value::Str(raw.to_string()))
    }

    /// Convert `value` to this type.
    ///
    /// Strings are parsed, numbers are widened or truncated, and booleans map
    /// to `0`/`1`. `None`, lists and callables never convert.
    pub fn cast(self, value: &Value) -> Result<Value, CastError> {
        let fail = || CastError {
            value: value.repr(),
            ty: self,
        };
        let converted = match (self, value) {
            (_, Value::None) => return Err(fail()),
            (ValueType::Str, Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)) => {
                Value::Str(value.to_string())
            }
            (ValueType::Int, Value::Int(i)) => Value::Int(*i),
            (ValueType::Int, Value::Float(f)) if f.is_finite() => Value::Int(f.trunc() as i64),
            (ValueType::Int, Value::Bool(b)) => Value::Int(i64::from(*b)),
            (ValueType::Int, Value::Str(s)) => {
                Value::Int(s.trim().parse::<i64>().map_err(|_| fail())?)
            }
            (ValueType::Float, Value::Int(i)) => Value::Float(*i as f64),
            (ValueType::Float, Value::Float(f)) => Value::Float(*f),
            (ValueType::Float, Value::Bool(b)) => Value::Float(if *b { 1.0 } else { 0.0 }),
            (ValueType::Float, Value::Str(s)) => {
                Value::Float(s.trim().parse::<f64>().map_err(|_| fail())?)
            }
            (ValueType::Bool, Value::Bool(b)) => Value::Bool(*b),
            (ValueType::Bool, Value::Int(i)) => Value::Bool(*i != 0),
            (ValueType::Bool, Value::Float(f)) => Value::Bool(*f != 0.0),
            (ValueType::Bool, Value::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Value::Bool(true),
                "false" | "no" | "off" | "0" => Value::Bool(false),
                _ => return Err(fail()),
            },
            _ => return Err(fail()),
        };
        Ok(converted)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" | "string" => Ok(ValueType::Str),
            "int" => Ok(ValueType::Int),
            "float" => Ok(ValueType::Float),
            "bool" => Ok(ValueType::Bool),
            other => Err(format!("unknown type name '{other}'")),
        }
    }
}

/// Arithmetic progression produced by `range(...)`, iterated lazily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl IntRange {
    /// `None` when `step` is zero.
    pub fn new(start: i64, end: i64, step: i64) -> Option<Self> {
        (step != 0).then_some(Self { start, end, step })
    }

    fn wide(self) -> (i128, i128, i128) {
        (i128::from(self.start), i128::from(self.end), i128::from(self.step))
    }

    pub fn len(self) -> usize {
        let (start, end, step) = self.wide();
        let n = if step > 0 && start < end {
            (end - start - 1) / step + 1
        } else if step < 0 && start > end {
            (start - end - 1) / -step + 1
        } else {
            0
        };
        usize::try_from(n).unwrap_or(usize::MAX)
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn get(self, index: usize) -> Option<i64> {
        if index >= self.len() {
            return None;
        }
        let (start, _, step) = self.wide();
        let index = i128::try_from(index).ok()?;
        i64::try_from(start + index * step).ok()
    }

    pub fn contains(self, n: i64) -> bool {
        let (start, end, step) = self.wide();
        let n = i128::from(n);
        let inside = if step > 0 {
            start <= n && n < end
        } else {
            end < n && n <= start
        };
        inside && (n - start) % step == 0
    }

    pub fn iter(self) -> impl Iterator<Item = i64> {
        let mut next = Some(self.start);
        std::iter::from_fn(move || {
            let current = next?;
            let inside = if self.step > 0 {
                current < self.end
            } else {
                current > self.end
            };
            if !inside {
                return None;
            }
            next = current.checked_add(self.step);
            Some(current)
        })
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.step == 1 {
            write!(f, "range({}, {})", self.start, self.end)
        } else {
            write!(f, "range({}, {}, {})", self.start, self.end, self.step)
        }
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Range(IntRange),
    /// Insertion-ordered string-keyed mapping (absorbs `**extra` arguments).
    Dict(Vec<(String, Value)>),
    Func(Rc<Function>),
    Builtin(Rc<Builtin>),
    /// An argument descriptor built by `arg(...)`, used as a parameter annotation.
    Arg(Rc<ArgDescriptor>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Range(_) => "range",
            Value::Dict(_) => "dict",
            Value::Func(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::Arg(_) => "arg",
        }
    }

    /// The scalar type of this value, if it has one.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Bool(_) => Some(ValueType::Bool),
            Value::Int(_) => Some(ValueType::Int),
            Value::Float(_) => Some(ValueType::Float),
            Value::Str(_) => Some(ValueType::Str),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Range(range) => !range.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            Value::Func(_) | Value::Builtin(_) | Value::Arg(_) => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Quoted rendering used inside containers and error messages.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::Arg(a), Value::Arg(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{x:.1}")
            }
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.repr())?;
                }
                f.write_str("]")
            }
            Value::Range(range) => write!(f, "{range}"),
            Value::Dict(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {}", value.repr())?;
                }
                f.write_str("}")
            }
            Value::Func(func) => write!(f, "<function {}>", func.name),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name),
            Value::Arg(desc) => write!(f, "<arg {}>", desc.names().join("/")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_from_token() {
        assert_eq!(ValueType::Int.parse("42"), Ok(Value::Int(42)));
        assert_eq!(ValueType::Int.parse(" -7 "), Ok(Value::Int(-7)));
        assert!(ValueType::Int.parse("abc").is_err());
    }

    #[test]
    fn cast_between_numbers() {
        assert_eq!(ValueType::Int.cast(&Value::Float(3.9)), Ok(Value::Int(3)));
        assert_eq!(ValueType::Float.cast(&Value::Int(2)), Ok(Value::Float(2.0)));
        assert_eq!(ValueType::Str.cast(&Value::Int(5)), Ok(Value::str("5")));
    }

    #[test]
    fn bool_tokens() {
        assert_eq!(ValueType::Bool.parse("yes"), Ok(Value::Bool(true)));
        assert_eq!(ValueType::Bool.parse("False"), Ok(Value::Bool(false)));
        assert!(ValueType::Bool.parse("maybe").is_err());
    }

    #[test]
    fn none_never_casts() {
        let err = ValueType::Str.cast(&Value::None).unwrap_err();
        assert_eq!(err.ty, ValueType::Str);
    }

    #[test]
    fn display_matches_script_rendering() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::str("a")]).to_string(),
            "[1, \"a\"]"
        );
        assert_eq!(Value::Bool(true).to_string(), "True");
    }

    #[test]
    fn int_and_float_compare_equal() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::str("2"));
    }

    #[test]
    fn range_len_get_and_contains() {
        let down = IntRange::new(5, 0, -2).unwrap();
        assert_eq!(down.iter().collect::<Vec<_>>(), [5, 3, 1]);
        assert_eq!(down.len(), 3);
        assert_eq!(down.get(2), Some(1));
        assert_eq!(down.get(3), None);
        assert!(down.contains(3) && !down.contains(2) && !down.contains(0));
        assert!(IntRange::new(3, 3, 1).unwrap().is_empty());
        assert!(IntRange::new(0, 1, 0).is_none());
    }

    #[test]
    fn range_near_integer_limits() {
        let full = IntRange::new(i64::MIN, i64::MAX, 1).unwrap();
        assert_eq!(full.len(), usize::MAX);
        let tail = IntRange::new(i64::MAX - 1, i64::MAX, 5).unwrap();
        assert_eq!(tail.iter().collect::<Vec<_>>(), [i64::MAX - 1]);
    }
}
