//! Functions available to every script without a `def`.

use tracing::debug;

use super::interp::{Builtin, Interpreter, RuntimeError};
use crate::args::{ArgDescriptor, Arity, CallArgs};
use crate::command::{Command, Handler};
use crate::value::{IntRange, Value, ValueType};

/// Prefix that routes `on(...)` to the event registry instead of the commands.
const EVENT_PREFIX: &str = "zzz:";

pub(super) fn table() -> Vec<Builtin> {
    macro_rules! builtins {
        ($($name:literal => $func:ident),* $(,)?) => {
            vec![$(Builtin { name: $name, func: $func }),*]
        };
    }
    builtins![
        "print" => print,
        "sh" => sh,
        "capture" => capture,
        "range" => range,
        "len" => len,
        "str" => to_str,
        "int" => to_int,
        "float" => to_float,
        "bool" => to_bool,
        "type" => type_of,
        "upper" => upper,
        "lower" => lower,
        "split" => split,
        "join" => join,
        "env" => env,
        "cwd" => cwd,
        "args" => args,
        "option" => option,
        "set_option" => set_option,
        "add_option" => add_option,
        "on" => on,
        "arg" => arg,
        "meta" => meta,
    ]
}

/// Argument `index` by position, else by keyword `name`.
fn param<'a>(call: &'a CallArgs, index: usize, name: &str) -> Option<&'a Value> {
    call.arg(index).or_else(|| call.get(name))
}

fn required<'a>(
    call: &'a CallArgs,
    index: usize,
    name: &str,
    func: &str,
) -> Result<&'a Value, RuntimeError> {
    param(call, index, name).ok_or_else(|| {
        RuntimeError::type_error(format!("{func}() missing required argument '{name}'"))
    })
}

fn text<'a>(value: &'a Value, func: &str) -> Result<&'a str, RuntimeError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(RuntimeError::type_error(format!(
            "{func}() expected str, got {}",
            other.type_name()
        ))),
    }
}

fn integer(value: &Value, func: &str) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(RuntimeError::type_error(format!(
            "{func}() expected int, got {}",
            other.type_name()
        ))),
    }
}

fn print(interp: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let sep = match call.get("sep") {
        Some(sep) => text(sep, "print")?.to_string(),
        None => " ".to_string(),
    };
    let line = call
        .args()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(&sep);
    interp.console().print(&line)?;
    Ok(Value::None)
}

fn sh(interp: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let command = text(required(&call, 0, "cmd", "sh")?, "sh")?;
    let (shell, env) = interp.shell_parts();
    let code = shell.run(command, env).map_err(RuntimeError::External)?;
    if code != 0 {
        debug!(command, code, "shell command failed");
    }
    Ok(Value::Int(i64::from(code)))
}

fn capture(interp: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let command = text(required(&call, 0, "cmd", "capture")?, "capture")?;
    let (shell, env) = interp.shell_parts();
    let output = shell.capture(command, env).map_err(RuntimeError::External)?;
    Ok(Value::Str(output.stdout.trim().to_string()))
}

fn range(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let bounds = call
        .args()
        .map(|v| integer(v, "range"))
        .collect::<Result<Vec<_>, _>>()?;
    let (start, end, step) = match bounds[..] {
        [end] => (0, end, 1),
        [start, end] => (start, end, 1),
        [start, end, step] => (start, end, step),
        _ => {
            return Err(RuntimeError::type_error(format!(
                "range() expected 1 to 3 arguments, got {}",
                bounds.len()
            )));
        }
    };
    IntRange::new(start, end, step)
        .map(Value::Range)
        .ok_or_else(|| RuntimeError::Value("range() step must not be zero".into()))
}

fn len(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let n = match required(&call, 0, "obj", "len")? {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Range(range) => range.len(),
        Value::Dict(entries) => entries.len(),
        other => {
            return Err(RuntimeError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    i64::try_from(n).map(Value::Int).map_err(|_| RuntimeError::Overflow)
}

fn convert(call: &CallArgs, ty: ValueType) -> Result<Value, RuntimeError> {
    let value = required(call, 0, "value", ty.name())?;
    ty.cast(value).map_err(|err| {
        RuntimeError::Value(format!("invalid literal for {}(): {}", ty.name(), err.value))
    })
}

fn to_str(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    Ok(Value::Str(
        param(&call, 0, "value").map(Value::to_string).unwrap_or_default(),
    ))
}

fn to_int(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    convert(&call, ValueType::Int)
}

fn to_float(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    convert(&call, ValueType::Float)
}

fn to_bool(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(param(&call, 0, "value").is_some_and(Value::is_truthy)))
}

fn type_of(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    Ok(Value::str(required(&call, 0, "obj", "type")?.type_name()))
}

fn upper(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    Ok(Value::Str(text(required(&call, 0, "s", "upper")?, "upper")?.to_uppercase()))
}

fn lower(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    Ok(Value::Str(text(required(&call, 0, "s", "lower")?, "lower")?.to_lowercase()))
}

fn split(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let s = text(required(&call, 0, "s", "split")?, "split")?;
    let parts: Vec<Value> = match param(&call, 1, "sep") {
        None | Some(Value::None) => s.split_whitespace().map(Value::from).collect(),
        Some(sep) => {
            let sep = text(sep, "split")?;
            if sep.is_empty() {
                return Err(RuntimeError::Value("empty separator".into()));
            }
            s.split(sep).map(Value::from).collect()
        }
    };
    Ok(Value::List(parts))
}

fn join(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let sep = text(required(&call, 0, "sep", "join")?, "join")?;
    let Value::List(items) = required(&call, 1, "items", "join")? else {
        return Err(RuntimeError::type_error("join() expected a list"));
    };
    let joined = items
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(sep);
    Ok(Value::Str(joined))
}

fn env(interp: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let name = text(required(&call, 0, "name", "env")?, "env")?;
    Ok(match interp.env().get_var(name) {
        Some(value) => Value::Str(value),
        None => param(&call, 1, "default").cloned().unwrap_or(Value::None),
    })
}

fn cwd(interp: &mut Interpreter, _: CallArgs) -> Result<Value, RuntimeError> {
    Ok(Value::Str(interp.env().current_dir.display().to_string()))
}

fn args(interp: &mut Interpreter, _: CallArgs) -> Result<Value, RuntimeError> {
    Ok(Value::List(
        interp.script().args.iter().map(|a| Value::str(a.as_str())).collect(),
    ))
}

fn option(interp: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let name = text(required(&call, 0, "name", "option")?, "option")?;
    Ok(interp.script().options.get(name)?.clone())
}

fn set_option(interp: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let name = text(required(&call, 0, "name", "set_option")?, "set_option")?;
    let value = required(&call, 1, "value", "set_option")?;
    interp.script_mut().options.set(name, value)?;
    Ok(Value::None)
}

fn value_type(value: &Value) -> Result<ValueType, RuntimeError> {
    match value {
        Value::Str(name) => name.parse().map_err(RuntimeError::Type),
        Value::Builtin(b) => b.name.parse().map_err(RuntimeError::Type),
        other => Err(RuntimeError::type_error(format!(
            "expected a type name, got {}",
            other.type_name()
        ))),
    }
}

fn add_option(interp: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let name = text(required(&call, 0, "name", "add_option")?, "add_option")?;
    let value = param(&call, 1, "value").cloned();
    let ty = match param(&call, 2, "type") {
        Some(ty) => value_type(ty)?,
        None => ValueType::Str,
    };
    let choices = match param(&call, 3, "choices") {
        Some(Value::List(items)) => items.clone(),
        None | Some(Value::None) => Vec::new(),
        Some(other) => {
            return Err(RuntimeError::type_error(format!(
                "choices must be a list, got {}",
                other.type_name()
            )));
        }
    };
    let required = param(&call, 4, "required").is_some_and(Value::is_truthy);
    interp
        .script_mut()
        .options
        .add(name, value, ty, choices, required)?;
    Ok(Value::None)
}

/// `on(name, func, short=None)` or `on(func)`.
fn on(interp: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let first = required(&call, 0, "name", "on")?;
    let (name, func) = match (first, param(&call, 1, "func")) {
        (Value::Str(name), Some(Value::Func(func))) => (name.clone(), func.clone()),
        (Value::Func(func), None) => (func.name.clone(), func.clone()),
        _ => return Err(RuntimeError::type_error("on() expects a name and a function")),
    };
    if let Some(event) = name.strip_prefix(EVENT_PREFIX) {
        interp.script_mut().events.set(event, Handler::Script(func));
        return Ok(Value::None);
    }
    let mut command = Command::script(name, func)?;
    if let Some(short) = param(&call, 2, "short").filter(|v| !v.is_none()) {
        command = command.with_short(short.to_string());
    }
    interp.script_mut().commands.add(command);
    Ok(Value::None)
}

/// `arg(*names, nargs=None, type=None, default=None, help=None, flag=False)`.
fn arg(_: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let names = call
        .args()
        .map(|v| text(v, "arg").map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    if names.is_empty() {
        return Err(RuntimeError::type_error("arg() needs at least one name"));
    }
    let mut desc = if call.get("flag").is_some_and(Value::is_truthy) {
        ArgDescriptor::flag(names)
    } else {
        ArgDescriptor::new(names)
    };
    match call.get("nargs") {
        None | Some(Value::None) => {}
        Some(Value::Str(n)) if n == "*" => desc = desc.arity(Arity::ZeroOrMore),
        Some(other) => {
            return Err(RuntimeError::Value(format!(
                "unsupported nargs: {}",
                other.repr()
            )));
        }
    }
    if let Some(ty) = call.get("type").filter(|v| !v.is_none()) {
        desc = desc.value_type(value_type(ty)?);
    }
    if let Some(default) = call.get("default").filter(|v| !v.is_none()) {
        desc = desc.default(default.clone());
    }
    if let Some(help) = call.get("help").filter(|v| !v.is_none()) {
        desc = desc.help(help.to_string());
    }
    Ok(Value::Arg(std::rc::Rc::new(desc)))
}

/// `meta(name=, version=, author=, description=, prompt=)` sets script metadata.
fn meta(interp: &mut Interpreter, call: CallArgs) -> Result<Value, RuntimeError> {
    let script = interp.script_mut();
    for (key, value) in call.kwargs() {
        let value = value.to_string();
        match key.as_str() {
            "name" => script.name = value,
            "version" => script.version = Some(value),
            "author" => script.author = Some(value),
            "description" => script.description = Some(value),
            "prompt" => script.prompt = value,
            other => {
                return Err(RuntimeError::type_error(format!(
                    "meta() got an unexpected keyword argument '{other}'"
                )));
            }
        }
    }
    Ok(Value::None)
}
