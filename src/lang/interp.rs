use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace};

use super::ScriptError;
use super::ast::{BinOp, Expr, FSegment, FuncDef, Stmt, StmtKind, Target, UnaryOp};
use super::builtins;
use super::parser::parse_program;
use crate::args::{CallArgs, Param, ParamKind, SchemaError};
use crate::command::{DispatchError, Handler};
use crate::console::Console;
use crate::env::Environment;
use crate::external::{self, Shell, SystemShell};
use crate::option::OptionError;
use crate::script::Script;
use crate::value::{Value, ValueType};

const MAX_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("name '{0}' is not defined")]
    Undefined(String),
    #[error("{0}")]
    Type(String),
    #[error("{0}")]
    Value(String),
    #[error("division by zero")]
    ZeroDivision,
    #[error("index out of range: {0}")]
    Index(i64),
    #[error("key not found: {0:?}")]
    Key(String),
    #[error("integer overflow")]
    Overflow,
    #[error("cannot allocate {0} items")]
    Memory(usize),
    #[error("maximum recursion depth exceeded")]
    Recursion,
    #[error("'{0}' outside of its block")]
    Misplaced(&'static str),
    #[error("interrupted")]
    Interrupted,
    #[error(transparent)]
    Option(#[from] OptionError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0:#}")]
    External(anyhow::Error),
    #[error("line {line}: {source}")]
    At {
        line: usize,
        source: Box<RuntimeError>,
    },
}

impl RuntimeError {
    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::Type(message.into())
    }

    /// Attach a line number unless one is already attached.
    fn at(self, line: usize) -> Self {
        match self {
            RuntimeError::At { .. } => self,
            other => RuntimeError::At {
                line,
                source: Box::new(other),
            },
        }
    }

    /// The error without line information.
    pub fn root(&self) -> &RuntimeError {
        match self {
            RuntimeError::At { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.root(), RuntimeError::Interrupted)
    }
}

pub type BuiltinFn = fn(&mut Interpreter, CallArgs) -> Result<Value, RuntimeError>;

/// A function implemented by the interpreter itself.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

/// A function defined by a `def` statement.
///
/// Annotations and defaults are evaluated once, when the `def` runs, into the
/// same [`Param`] list that command registration derives a schema from.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub doc: Option<String>,
    def: Rc<FuncDef>,
}

enum Flow {
    Next,
    Break,
    Continue,
    Return(Value),
}

/// Tree-walking evaluator for the host language.
///
/// Owns the [`Script`] being built up by the program, the console that
/// `print` writes to and the shell used by `sh`/`capture`.
pub struct Interpreter {
    globals: HashMap<String, Value>,
    frames: Vec<HashMap<String, Value>>,
    script: Script,
    console: Console,
    shell: Box<dyn Shell>,
    env: Environment,
    watch_interrupts: bool,
}

impl Interpreter {
    pub fn new(script: Script) -> Self {
        let mut globals = HashMap::new();
        for builtin in builtins::table() {
            globals.insert(builtin.name.to_string(), Value::Builtin(Rc::new(builtin)));
        }
        Self {
            globals,
            frames: Vec::new(),
            script,
            console: Console::stdout(),
            shell: Box::new(SystemShell),
            env: Environment::new(),
            watch_interrupts: false,
        }
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn with_shell(mut self, shell: Box<dyn Shell>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Abort running code with [`RuntimeError::Interrupted`] when SIGINT arrives.
    pub fn with_interrupts(mut self) -> Self {
        self.watch_interrupts = true;
        self
    }

    pub fn watches_interrupts(&self) -> bool {
        self.watch_interrupts
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn script_mut(&mut self) -> &mut Script {
        &mut self.script
    }

    pub fn console(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub(crate) fn shell_parts(&mut self) -> (&mut dyn Shell, &Environment) {
        (self.shell.as_mut(), &self.env)
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    /// Parse and run a whole program at top level.
    pub fn run_source(&mut self, source: &str, line_offset: usize) -> Result<(), ScriptError> {
        let program = parse_program(source, line_offset)?;
        debug!(statements = program.len(), "running program");
        self.exec_program(&program)?;
        Ok(())
    }

    pub fn exec_program(&mut self, program: &[Stmt]) -> Result<(), RuntimeError> {
        match self.exec_block(program)? {
            Flow::Next => Ok(()),
            Flow::Return(_) => Err(RuntimeError::Misplaced("return")),
            Flow::Break => Err(RuntimeError::Misplaced("break")),
            Flow::Continue => Err(RuntimeError::Misplaced("continue")),
        }
    }

    /// Invoke a command or event handler.
    pub fn invoke(&mut self, handler: &Handler, call: CallArgs) -> anyhow::Result<Value> {
        if self.watch_interrupts {
            external::take_interrupt();
        }
        match handler {
            Handler::Native(f) => {
                let f = Rc::clone(f);
                f(self, call)
            }
            Handler::Script(func) => Ok(self.call_function(func, call)?),
        }
    }

    /// Look up a command by name, bind `argv` against its schema and run it.
    pub fn dispatch<S: AsRef<str>>(
        &mut self,
        name: &str,
        argv: &[S],
    ) -> Result<Value, DispatchError> {
        let command = self
            .script
            .commands
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::NotFound(name.to_string()))?;
        debug!(command = name, argc = argv.len(), "dispatching");
        let call = command.bind(argv).map_err(|source| DispatchError::Arguments {
            command: name.to_string(),
            usage: command.usage(),
            source,
        })?;
        self.invoke(command.handler(), call)
            .map_err(DispatchError::Failed)
    }

    /// Fire an event; `None` when nothing is registered for it.
    pub fn emit(&mut self, event: &str, call: CallArgs) -> anyhow::Result<Option<Value>> {
        let Some(handler) = self.script.events.get(event).cloned() else {
            return Ok(None);
        };
        debug!(event, "emitting event");
        self.invoke(&handler, call).map(Some)
    }

    /// Call any callable value.
    pub fn call_value(&mut self, callee: &Value, call: CallArgs) -> Result<Value, RuntimeError> {
        match callee {
            Value::Builtin(builtin) => (builtin.func)(self, call),
            Value::Func(func) => self.call_function(func, call),
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(
        &mut self,
        func: &Rc<Function>,
        call: CallArgs,
    ) -> Result<Value, RuntimeError> {
        if self.frames.len() >= MAX_DEPTH {
            return Err(RuntimeError::Recursion);
        }
        let locals = bind_call(func, call)?;
        trace!(function = %func.name, "call");
        self.frames.push(locals);
        let def = Rc::clone(&func.def);
        let flow = self.exec_block(&def.body);
        self.frames.pop();
        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Next => Ok(Value::None),
            Flow::Break => Err(RuntimeError::Misplaced("break")),
            Flow::Continue => Err(RuntimeError::Misplaced("continue")),
        }
    }

    fn check_interrupt(&self) -> Result<(), RuntimeError> {
        if self.watch_interrupts && external::take_interrupt() {
            return Err(RuntimeError::Interrupted);
        }
        Ok(())
    }

    fn exec_block(&mut self, body: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in body {
            let flow = self.exec_stmt(stmt).map_err(|e| e.at(stmt.line))?;
            if !matches!(flow, Flow::Next) {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign(target, expr) => {
                let value = self.eval(expr)?;
                self.assign(target, value)?;
            }
            StmtKind::AugAssign(target, op, expr) => {
                let current = match target {
                    Target::Name(name) => self.lookup(name)?,
                    Target::Index(base, index) => {
                        let base = self.eval(base)?;
                        let index = self.eval(index)?;
                        index_value(&base, &index)?
                    }
                };
                let rhs = self.eval(expr)?;
                let value = binary(*op, &current, &rhs)?;
                self.assign(target, value)?;
            }
            StmtKind::If { branches, orelse } => {
                for (cond, body) in branches {
                    if self.eval(cond)?.is_truthy() {
                        return self.exec_block(body);
                    }
                }
                return self.exec_block(orelse);
            }
            StmtKind::For { var, iter, body } => {
                let items: Box<dyn Iterator<Item = Value>> = match self.eval(iter)? {
                    Value::List(items) => Box::new(items.into_iter()),
                    Value::Range(range) => Box::new(range.iter().map(Value::Int)),
                    Value::Str(s) => Box::new(
                        s.chars()
                            .map(|c| Value::Str(c.to_string()))
                            .collect::<Vec<_>>()
                            .into_iter(),
                    ),
                    Value::Dict(entries) => {
                        Box::new(entries.into_iter().map(|(k, _)| Value::Str(k)))
                    }
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "'{}' object is not iterable",
                            other.type_name()
                        )));
                    }
                };
                for item in items {
                    self.check_interrupt()?;
                    self.bind_name(var, item);
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Next | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval(cond)?.is_truthy() {
                    self.check_interrupt()?;
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Next | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::Def(def) => {
                let func = self.make_function(def)?;
                self.bind_name(&def.name, Value::Func(Rc::new(func)));
            }
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass => {}
        }
        Ok(Flow::Next)
    }

    fn make_function(&mut self, def: &Rc<FuncDef>) -> Result<Function, RuntimeError> {
        let mut params = Vec::with_capacity(def.params.len());
        for decl in &def.params {
            let mut param = match decl.kind {
                ParamKind::Required => Param::required(&decl.name),
                ParamKind::Defaulted => {
                    let default = match &decl.default {
                        Some(expr) => self.eval(expr)?,
                        None => Value::None,
                    };
                    Param::optional(&decl.name, default)
                }
                ParamKind::Variadic => Param::variadic(&decl.name),
                ParamKind::Keywords => Param::keywords(&decl.name),
            };
            if let Some(annotation) = &decl.annotation {
                match self.eval(annotation)? {
                    Value::Arg(desc) => param = param.with_arg((*desc).clone()),
                    Value::Builtin(b) => {
                        if let Ok(ty) = b.name.parse::<ValueType>() {
                            param = param.typed(ty);
                        }
                    }
                    Value::Str(name) => {
                        let ty = name.parse::<ValueType>().map_err(RuntimeError::Type)?;
                        param = param.typed(ty);
                    }
                    other => debug!(param = %decl.name, annotation = %other, "ignoring annotation"),
                }
            }
            params.push(param);
        }
        Ok(Function {
            name: def.name.clone(),
            params,
            doc: def.doc.clone(),
            def: Rc::clone(def),
        })
    }

    fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        self.frames
            .last()
            .and_then(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
            .cloned()
            .ok_or_else(|| RuntimeError::Undefined(name.to_string()))
    }

    fn bind_name(&mut self, name: &str, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => frame.insert(name.to_string(), value),
            None => self.globals.insert(name.to_string(), value),
        };
    }

    fn assign(&mut self, target: &Target, value: Value) -> Result<(), RuntimeError> {
        match target {
            Target::Name(name) => {
                self.bind_name(name, value);
                Ok(())
            }
            Target::Index(base, index) => {
                let Expr::Name(name) = base else {
                    return Err(RuntimeError::type_error(
                        "only variables support item assignment",
                    ));
                };
                let index = self.eval(index)?;
                let mut container = self.lookup(name)?;
                set_index(&mut container, &index, value)?;
                self.bind_name(name, container);
                Ok(())
            }
        }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Const(value) => Ok(value.clone()),
            Expr::Name(name) => self.lookup(name),
            Expr::FString(segments) => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        FSegment::Lit(text) => out.push_str(text),
                        FSegment::Expr(expr) => out.push_str(&self.eval(expr)?.to_string()),
                    }
                }
                Ok(Value::Str(out))
            }
            Expr::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_, _>>()?,
            )),
            Expr::Dict(entries) => {
                let mut dict: Vec<(String, Value)> = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match self.eval(key)? {
                        Value::Str(key) => key,
                        other => {
                            return Err(RuntimeError::type_error(format!(
                                "dict keys must be str, not {}",
                                other.type_name()
                            )));
                        }
                    };
                    let value = self.eval(value)?;
                    dict.retain(|(k, _)| *k != key);
                    dict.push((key, value));
                }
                Ok(Value::Dict(dict))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                unary(*op, &value)
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Call { func, args, kwargs } => {
                let callee = self.eval(func)?;
                let mut call = CallArgs::new();
                for arg in args {
                    call.positional.push(self.eval(arg)?);
                }
                for (name, arg) in kwargs {
                    call.keywords.push((name.clone(), self.eval(arg)?));
                }
                self.check_interrupt()?;
                self.call_value(&callee, call)
            }
            Expr::Index(base, index) => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                index_value(&base, &index)
            }
        }
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("script", &self.script.name)
            .field("depth", &self.frames.len())
            .finish_non_exhaustive()
    }
}

/// Bind call arguments to a function's parameters.
///
/// Keywords bind first; positional values then fill the remaining
/// non-variadic parameters in order, overflowing into `*rest`; keywords
/// nobody claimed go to `**extra`.
fn bind_call(func: &Function, call: CallArgs) -> Result<HashMap<String, Value>, RuntimeError> {
    let mut locals: HashMap<String, Value> = HashMap::new();
    let mut rest = Vec::new();
    let mut extra: Vec<(String, Value)> = Vec::new();
    let variadic = func.params.iter().find(|p| p.kind == ParamKind::Variadic);
    let keywords = func.params.iter().find(|p| p.kind == ParamKind::Keywords);
    let named = |name: &str| {
        func.params.iter().any(|p| {
            p.name == name && matches!(p.kind, ParamKind::Required | ParamKind::Defaulted)
        })
    };

    let CallArgs {
        positional,
        variadic: more,
        keywords: kw,
        extra: kw_extra,
    } = call;

    for (name, value) in kw.into_iter().chain(kw_extra) {
        if named(&name) {
            if locals.insert(name.clone(), value).is_some() {
                return Err(RuntimeError::type_error(format!(
                    "{}() got multiple values for argument '{name}'",
                    func.name
                )));
            }
        } else if keywords.is_some() {
            extra.push((name, value));
        } else {
            return Err(RuntimeError::type_error(format!(
                "{}() got an unexpected keyword argument '{name}'",
                func.name
            )));
        }
    }

    let mut slots = func
        .params
        .iter()
        .filter(|p| matches!(p.kind, ParamKind::Required | ParamKind::Defaulted))
        .filter(|p| !locals.contains_key(&p.name))
        .map(|p| p.name.clone())
        .collect::<Vec<_>>()
        .into_iter();
    for value in positional.into_iter().chain(more) {
        match slots.next() {
            Some(name) => {
                locals.insert(name, value);
            }
            None if variadic.is_some() => rest.push(value),
            None => {
                return Err(RuntimeError::type_error(format!(
                    "{}() got too many positional arguments",
                    func.name
                )));
            }
        }
    }

    for param in &func.params {
        match param.kind {
            ParamKind::Required if !locals.contains_key(&param.name) => {
                return Err(RuntimeError::type_error(format!(
                    "{}() missing required argument '{}'",
                    func.name, param.name
                )));
            }
            ParamKind::Defaulted if !locals.contains_key(&param.name) => {
                let default = param.default.clone().unwrap_or(Value::None);
                locals.insert(param.name.clone(), default);
            }
            ParamKind::Variadic => {
                locals.insert(param.name.clone(), Value::List(std::mem::take(&mut rest)));
            }
            ParamKind::Keywords => {
                locals.insert(param.name.clone(), Value::Dict(std::mem::take(&mut extra)));
            }
            _ => {}
        }
    }
    Ok(locals)
}

fn unary(op: UnaryOp, value: &Value) -> Result<Value, RuntimeError> {
    match (op, value) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Neg, Value::Int(i)) => {
            i.checked_neg().map(Value::Int).ok_or(RuntimeError::Overflow)
        }
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, Value::Bool(b)) => Ok(Value::Int(-i64::from(*b))),
        (UnaryOp::Pos, v @ (Value::Int(_) | Value::Float(_))) => Ok(v.clone()),
        (UnaryOp::Pos, Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
        (_, v) => Err(RuntimeError::type_error(format!(
            "bad operand type for unary operator: '{}'",
            v.type_name()
        ))),
    }
}

enum Num {
    Int(i64),
    Float(f64),
}

fn as_num(value: &Value) -> Option<Num> {
    match value {
        Value::Int(i) => Some(Num::Int(*i)),
        Value::Bool(b) => Some(Num::Int(i64::from(*b))),
        Value::Float(f) => Some(Num::Float(*f)),
        _ => None,
    }
}

/// `None` on overflow (`i64::MIN // -1`).
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    let r = a.checked_rem(b)?;
    if r != 0 && ((a < 0) != (b < 0)) { q.checked_sub(1) } else { Some(q) }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) { r.checked_add(b) } else { Some(r) }
}

fn int_arith(op: BinOp, a: i64, b: i64) -> Result<Value, RuntimeError> {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(RuntimeError::ZeroDivision);
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv | BinOp::Mod if b == 0 => return Err(RuntimeError::ZeroDivision),
        BinOp::FloorDiv => floor_div(a, b),
        BinOp::Mod => floor_mod(a, b),
        BinOp::Pow if b < 0 => return Ok(Value::Float((a as f64).powf(b as f64))),
        BinOp::Pow => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
        _ => unreachable!("non-arithmetic operator"),
    };
    result.map(Value::Int).ok_or(RuntimeError::Overflow)
}

fn float_arith(op: BinOp, a: f64, b: f64) -> Result<Value, RuntimeError> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod if b == 0.0 => {
            return Err(RuntimeError::ZeroDivision);
        }
        BinOp::Div => a / b,
        BinOp::FloorDiv => (a / b).floor(),
        BinOp::Mod => a - b * (a / b).floor(),
        BinOp::Pow => a.powf(b),
        _ => unreachable!("non-arithmetic operator"),
    };
    Ok(Value::Float(result))
}

fn compare(op: BinOp, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        _ => match (as_num(left), as_num(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => a.partial_cmp(&b),
            (Some(a), Some(b)) => to_f64(a).partial_cmp(&to_f64(b)),
            _ => {
                return Err(RuntimeError::type_error(format!(
                    "cannot compare '{}' and '{}'",
                    left.type_name(),
                    right.type_name()
                )));
            }
        },
    };
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    })
}

fn to_f64(num: Num) -> f64 {
    match num {
        Num::Int(i) => i as f64,
        Num::Float(f) => f,
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, RuntimeError> {
    match (container, item) {
        (Value::List(items), item) => Ok(items.contains(item)),
        (Value::Range(range), Value::Int(n)) => Ok(range.contains(*n)),
        (Value::Range(_), _) => Ok(false),
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Dict(entries), Value::Str(key)) => Ok(entries.iter().any(|(k, _)| k == key)),
        _ => Err(RuntimeError::type_error(format!(
            "'in' is not supported between '{}' and '{}'",
            item.type_name(),
            container.type_name()
        ))),
    }
}

/// Size of `len` repeated `times` times; negative counts give zero.
fn repeated_len(len: usize, times: i64) -> Result<(usize, usize), RuntimeError> {
    let times = usize::try_from(times).unwrap_or(0);
    let total = len.checked_mul(times).ok_or(RuntimeError::Overflow)?;
    Ok((times, total))
}

fn repeat_str(s: &str, times: i64) -> Result<String, RuntimeError> {
    let (times, total) = repeated_len(s.len(), times)?;
    let mut out = String::new();
    out.try_reserve_exact(total)
        .map_err(|_| RuntimeError::Memory(total))?;
    for _ in 0..times {
        out.push_str(s);
    }
    Ok(out)
}

fn repeat<T: Clone>(items: &[T], times: i64) -> Result<Vec<T>, RuntimeError> {
    let (times, total) = repeated_len(items.len(), times)?;
    let mut out = Vec::new();
    out.try_reserve_exact(total)
        .map_err(|_| RuntimeError::Memory(total))?;
    for _ in 0..times {
        out.extend_from_slice(items);
    }
    Ok(out)
}

pub(crate) fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinOp::Eq => return Ok(Value::Bool(left == right)),
        BinOp::Ne => return Ok(Value::Bool(left != right)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            return compare(op, left, right).map(Value::Bool);
        }
        BinOp::In => return contains(right, left).map(Value::Bool),
        BinOp::NotIn => return contains(right, left).map(|c| Value::Bool(!c)),
        _ => {}
    }

    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{a}{b}"))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            return Ok(Value::List(a.iter().chain(b).cloned().collect()));
        }
        (BinOp::Mul, Value::Str(s), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::Str(s)) => {
            return repeat_str(s, *n).map(Value::Str);
        }
        (BinOp::Mul, Value::List(items), Value::Int(n))
        | (BinOp::Mul, Value::Int(n), Value::List(items)) => {
            return repeat(items, *n).map(Value::List);
        }
        (BinOp::Mod, Value::Str(fmt), arg) => {
            return Ok(Value::Str(fmt.replacen("%s", &arg.to_string(), 1)));
        }
        _ => {}
    }

    match (as_num(left), as_num(right)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => int_arith(op, a, b),
        (Some(a), Some(b)) => float_arith(op, to_f64(a), to_f64(b)),
        _ => Err(RuntimeError::type_error(format!(
            "unsupported operand types for {op:?}: '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn normalize_index(index: &Value, len: usize) -> Result<usize, RuntimeError> {
    let Value::Int(i) = index else {
        return Err(RuntimeError::type_error(format!(
            "indices must be integers, not {}",
            index.type_name()
        )));
    };
    let len = i64::try_from(len).map_err(|_| RuntimeError::Overflow)?;
    let resolved = if *i < 0 { *i + len } else { *i };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).map_err(|_| RuntimeError::Index(*i))
    } else {
        Err(RuntimeError::Index(*i))
    }
}

fn index_value(base: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match base {
        Value::List(items) => Ok(items[normalize_index(index, items.len())?].clone()),
        Value::Range(range) => {
            let i = normalize_index(index, range.len())?;
            range.get(i).map(Value::Int).ok_or(RuntimeError::Overflow)
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(index, chars.len())?;
            Ok(Value::Str(chars[i].to_string()))
        }
        Value::Dict(entries) => {
            let Value::Str(key) = index else {
                return Err(RuntimeError::Key(index.to_string()));
            };
            entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| RuntimeError::Key(key.clone()))
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn set_index(container: &mut Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match container {
        Value::List(items) => {
            let i = normalize_index(index, items.len())?;
            items[i] = value;
            Ok(())
        }
        Value::Dict(entries) => {
            let Value::Str(key) = index else {
                return Err(RuntimeError::type_error("dict keys must be str"));
            };
            match entries.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key.clone(), value)),
            }
            Ok(())
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::collected;

    fn run(source: &str) -> (Interpreter, String) {
        let (console, handle) = Console::capture();
        let mut interp = Interpreter::new(Script::new("test")).with_console(console);
        interp.run_source(source, 0).unwrap();
        let out = collected(&handle);
        (interp, out)
    }

    fn run_err(source: &str) -> RuntimeError {
        let (console, _) = Console::capture();
        let mut interp = Interpreter::new(Script::new("test")).with_console(console);
        match interp.run_source(source, 0) {
            Err(ScriptError::Runtime(err)) => err,
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_follows_python_rules() {
        let (_, out) = run("print(7 // 2, -7 // 2, -7 % 3, 7 / 2, 2 ** 10, 1 + 2.0)");
        assert_eq!(out, "3 -4 2 3.5 1024 3.0\n");
    }

    #[test]
    fn strings_and_lists() {
        let (_, out) = run("x = [1, 2] + [3]\nprint(len(x), 'ab' * 2, x[-1], 'b' in 'abc')");
        assert_eq!(out, "3 abab 3 True\n");
    }

    #[test]
    fn inclusive_range_loop() {
        let (_, out) = run("for i in range(1, 3 + 1):\n    print(i)");
        assert_eq!(out, "1\n2\n3\n");
    }

    #[test]
    fn while_with_break_and_continue() {
        let source = "n = 0\nwhile True:\n    n += 1\n    if n == 2: continue\n    if n > 3: break\n    print(n)";
        let (_, out) = run(source);
        assert_eq!(out, "1\n3\n");
    }

    #[test]
    fn keywords_bind_before_positionals() {
        let source = "def f(a, b=2, *rest):\n    return f\"{a} {b} {rest}\"\nprint(f('x', 'y', 'z', b=9))";
        let (_, out) = run(source);
        assert_eq!(out, "x 9 [\"y\", \"z\"]\n");
    }

    #[test]
    fn extra_keywords_collected() {
        let source = "def f(**opts): return opts\nprint(f(a=1))";
        let (_, out) = run(source);
        assert_eq!(out, "{\"a\": 1}\n");
    }

    #[test]
    fn locals_do_not_leak() {
        let err = run_err("def f():\n    inner = 1\nf()\nprint(inner)");
        assert!(matches!(err.root(), RuntimeError::Undefined(name) if name == "inner"));
        assert!(matches!(err, RuntimeError::At { line: 4, .. }));
    }

    #[test]
    fn and_or_return_deciding_operand() {
        let (_, out) = run("print(0 or 'x', '' and 1, None or [])");
        assert_eq!(out, "x  []\n");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = run_err("x = 1 // 0");
        assert!(matches!(err.root(), RuntimeError::ZeroDivision));
    }

    #[test]
    fn min_int_division_overflows() {
        let smallest = "x = -9223372036854775807 - 1\n";
        let err = run_err(&format!("{smallest}y = x // -1"));
        assert!(matches!(err.root(), RuntimeError::Overflow));
        let err = run_err(&format!("{smallest}y = x % -1"));
        assert!(matches!(err.root(), RuntimeError::Overflow));
        let (_, out) = run("print(-7 // 2, -7 % 2, 7 % -2)");
        assert_eq!(out, "-4 1 -1\n");
    }

    #[test]
    fn huge_repetition_is_an_error() {
        let err = run_err("s = 'ab' * 9223372036854775807");
        assert!(matches!(err.root(), RuntimeError::Memory(_)), "{err}");
        let err = run_err("s = [1, 2, 3] * 9223372036854775807");
        assert!(matches!(err.root(), RuntimeError::Overflow | RuntimeError::Memory(_)), "{err}");
        let (_, out) = run("print('ab' * 2, [0] * 3, 'x' * -1)");
        assert_eq!(out, "abab [0, 0, 0] \n");
    }

    #[test]
    fn breaking_out_of_a_huge_range() {
        let source = "for i in range(0, 1000000000000 + 1):\n    if i == 2:\n        break\n    print(i)";
        let (_, out) = run(&format!("{source}\nprint(len(range(1000000000000)))"));
        assert_eq!(out, "0\n1\n1000000000000\n");
    }

    #[test]
    fn missing_argument_is_an_error() {
        let err = run_err("def f(a): pass\nf()");
        assert!(err.to_string().contains("missing required argument 'a'"));
    }

    #[test]
    fn recursion_is_capped() {
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let err = run_err("def f(n): return f(n + 1)\nf(0)");
                matches!(err.root(), RuntimeError::Recursion)
            })
            .unwrap();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn item_assignment() {
        let (_, out) = run("d = {'a': 1}\nd['b'] = 2\nxs = [1, 2]\nxs[0] = 5\nprint(d, xs)");
        assert_eq!(out, "{\"a\": 1, \"b\": 2} [5, 2]\n");
    }

    #[test]
    fn annotations_become_param_types() {
        let (interp, _) = run("def f(n: int, flag=False, *rest): pass");
        let Some(Value::Func(func)) = interp.global("f") else {
            panic!("f not defined");
        };
        assert_eq!(func.params[0].declared, Some(ValueType::Int));
        assert_eq!(func.params[1].default, Some(Value::Bool(false)));
        assert_eq!(func.params[2].kind, ParamKind::Variadic);
    }

    #[test]
    fn top_level_return_is_misplaced() {
        let err = run_err("return 1");
        assert!(matches!(err.root(), RuntimeError::Misplaced("return")));
    }
}
