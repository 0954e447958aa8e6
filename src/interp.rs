//! Symbolic evaluation of parsed snippets.
//!
//! Nothing is executed: statements are walked against a [`Scope`] and every
//! call into the graph library is answered by a [`Host`], which records the
//! graph the snippet builds.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::error::ImportError;
use crate::export::{py_float, py_str};
use crate::model::Point;
use crate::snippet_ast::{Expr, Snippet, StmtKind};

/// Deepest nesting of lists, tuples and dicts a snippet may build.
pub const MAX_VALUE_DEPTH: usize = 64;

/// Handle to an object owned by a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Int,
    Float,
    Str,
    Len,
    Range,
    Print,
}

impl Builtin {
    fn lookup(name: &str) -> Option<Builtin> {
        match name {
            "int" => Some(Builtin::Int),
            "float" => Some(Builtin::Float),
            "str" => Some(Builtin::Str),
            "len" => Some(Builtin::Len),
            "range" => Some(Builtin::Range),
            "print" => Some(Builtin::Print),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Str => "str",
            Builtin::Len => "len",
            Builtin::Range => "range",
            Builtin::Print => "print",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion ordered.
    Dict(Vec<(Value, Value)>),
    /// Dotted path of an imported module or of a name inside one.
    Module(String),
    Object(ObjectRef),
    Method(ObjectRef, String),
    Builtin(Builtin),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Module(_) => "module",
            Value::Object(_) => "object",
            Value::Method(..) => "method",
            Value::Builtin(_) => "builtin_function_or_method",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The first two items of a numeric list or tuple.
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Value::List(items) | Value::Tuple(items) if items.len() >= 2 => {
                Some(Point::new(items[0].as_f64()?, items[1].as_f64()?))
            }
            _ => None,
        }
    }

    /// Node identifiers are compared by their text.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(py_float(*f)),
            _ => None,
        }
    }

    /// Items of a list or tuple, or the keys of a dict.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items.clone()),
            Value::Dict(entries) => Some(entries.iter().map(|(k, _)| k.clone()).collect()),
            _ => None,
        }
    }

    /// Data held by the value, in container elements plus string bytes, and
    /// how deeply its containers nest.
    pub fn footprint(&self) -> (usize, usize) {
        match self {
            Value::Str(s) => (s.len(), 0),
            Value::List(items) | Value::Tuple(items) => {
                items.iter().fold((items.len(), 1), |(size, depth), item| {
                    let (n, d) = item.footprint();
                    (size.saturating_add(n), depth.max(d + 1))
                })
            }
            Value::Dict(entries) => {
                entries.iter().fold((entries.len(), 1), |(size, depth), (k, v)| {
                    let (kn, kd) = k.footprint();
                    let (vn, vd) = v.footprint();
                    (size.saturating_add(kn).saturating_add(vn), depth.max(kd.max(vd) + 1))
                })
            }
            _ => (0, 0),
        }
    }

    fn len(&self) -> usize {
        match self {
            Value::List(items) | Value::Tuple(items) => items.len(),
            Value::Dict(entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => py_float(*f),
            Value::Str(s) => py_str(s),
            Value::List(items) => format!("[{}]", join_repr(items)),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", join_repr(items)),
            Value::Dict(entries) => {
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", body.join(", "))
            }
            Value::Module(path) => format!("<module '{path}'>"),
            Value::Object(object) => format!("<object #{}>", object.0),
            Value::Method(_, name) => format!("<bound method {name}>"),
            Value::Builtin(builtin) => format!("<built-in function {}>", builtin.name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => f.write_str(&other.repr()),
        }
    }
}

fn join_repr(items: &[Value]) -> String {
    items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

pub fn dict_get<'v>(entries: &'v [(Value, Value)], key: &Value) -> Option<&'v Value> {
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

pub fn dict_insert(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

/// Values of depth `MAX_VALUE_DEPTH` are complete; nothing may contain them.
fn check_nestable(value: &Value) -> Result<(), String> {
    if value.footprint().1 >= MAX_VALUE_DEPTH {
        return Err(format!(
            "values nest more than {MAX_VALUE_DEPTH} levels deep"
        ));
    }
    Ok(())
}

fn index_data(base: &Value, key: &Value) -> Result<Value, String> {
    match base {
        Value::List(items) | Value::Tuple(items) => {
            let i = list_index(items.len(), key)?;
            Ok(items[i].clone())
        }
        Value::Dict(entries) => dict_get(entries, key)
            .cloned()
            .ok_or_else(|| format!("KeyError: {}", key.repr())),
        other => Err(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        )),
    }
}

fn list_index(len: usize, key: &Value) -> Result<usize, String> {
    let Some(i) = key.as_int() else {
        return Err(format!(
            "list indices must be integers, not {}",
            key.type_name()
        ));
    };
    let resolved = if i < 0 { len as i64 + i } else { i };
    if resolved < 0 || resolved >= len as i64 {
        return Err("list index out of range".to_string());
    }
    Ok(resolved as usize)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Positional argument `index`, or the keyword of the same parameter.
    pub fn arg(&self, index: usize, keyword: &str) -> Option<&Value> {
        self.positional.get(index).or_else(|| self.keyword(keyword))
    }

    pub fn required(&self, index: usize, keyword: &str, function: &str) -> Result<&Value, String> {
        self.arg(index, keyword)
            .ok_or_else(|| format!("{function}() missing required argument '{keyword}'"))
    }
}

/// One graph library as seen by the interpreter.
pub trait Host {
    /// Top-level packages that belong to the library.
    fn roots(&self) -> &'static [&'static str];

    /// Names bound before the first statement runs.
    fn prelude(&mut self) -> Vec<(&'static str, Value)>;

    fn type_name(&self, object: ObjectRef) -> &'static str;

    /// `name` is the last segment of the dotted path, e.g. `Graph` for `nx.Graph`.
    fn call_function(&mut self, name: &str, args: CallArgs) -> Result<Value, String>;

    fn call_method(&mut self, object: ObjectRef, method: &str, args: CallArgs)
    -> Result<Value, String>;

    fn attribute(&mut self, object: ObjectRef, attr: &str) -> Result<Value, String> {
        Ok(Value::Method(object, attr.to_string()))
    }

    fn get_item(&mut self, object: ObjectRef, _key: &Value) -> Result<Value, String> {
        Err(format!(
            "'{}' object is not subscriptable",
            self.type_name(object)
        ))
    }

    fn set_item(&mut self, object: ObjectRef, _key: Value, _value: Value) -> Result<(), String> {
        Err(format!(
            "'{}' object does not support item assignment",
            self.type_name(object)
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_statements: usize,
    pub max_nodes: usize,
    /// Total data the snippet may build or copy, as counted by [`Value::footprint`].
    pub max_items: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    globals: HashMap<String, Value>,
    locals: Vec<(String, Value)>,
    star_modules: Vec<String>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.local(name).or_else(|| self.globals.get(name))
    }

    /// Only names the snippet bound itself.
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Names bound by the snippet, in the order they were first bound.
    pub fn locals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.locals.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self.locals.iter().position(|(n, _)| n == name) {
            Some(i) => Some(&mut self.locals[i].1),
            None => self.globals.get_mut(name),
        }
    }

    fn bind(&mut self, name: &str, value: Value) {
        match self.locals.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.locals.push((name.to_string(), value)),
        }
    }
}

/// Walks every statement of `snippet` against `host`. Errors carry the
/// 1-based line of the failing statement.
pub fn run<H: Host>(snippet: &Snippet, host: &mut H, limits: Limits) -> Result<Scope, ImportError> {
    if snippet.statements.len() > limits.max_statements {
        return Err(ImportError::Execution(format!(
            "snippet has {} statements, more than the limit of {}",
            snippet.statements.len(),
            limits.max_statements
        )));
    }

    let mut scope = Scope::default();
    for (name, value) in host.prelude() {
        scope.globals.insert(name.to_string(), value);
    }

    let mut interpreter = Interpreter {
        host,
        scope,
        limits,
        built: 0,
    };
    for stmt in &snippet.statements {
        interpreter
            .exec(&stmt.kind)
            .map_err(|message| ImportError::Execution(format!("line {}: {message}", stmt.line)))?;
    }
    Ok(interpreter.scope)
}

struct Interpreter<'h, H> {
    host: &'h mut H,
    scope: Scope,
    limits: Limits,
    built: usize,
}

impl<H: Host> Interpreter<'_, H> {
    fn charge(&mut self, items: usize) -> Result<(), String> {
        self.built = self.built.saturating_add(items);
        if self.built > self.limits.max_items {
            return Err(format!(
                "snippet data exceeds the limit of {} items",
                self.limits.max_items
            ));
        }
        Ok(())
    }

    /// Charges a freshly copied value in full.
    fn charge_copy(&mut self, value: &Value) -> Result<(), String> {
        self.charge(value.footprint().0)
    }

    fn exec(&mut self, stmt: &StmtKind) -> Result<(), String> {
        match stmt {
            StmtKind::Import(names) => {
                for import in names {
                    let module = match import.alias {
                        Some(_) => import.name.clone(),
                        None => import.bound_name().to_string(),
                    };
                    self.scope.bind(import.bound_name(), Value::Module(module));
                }
            }
            StmtKind::FromImport { module, names } => {
                for import in names {
                    if import.name == "*" {
                        self.scope.star_modules.push(module.clone());
                    } else {
                        let path = format!("{module}.{}", import.name);
                        self.scope.bind(import.bound_name(), Value::Module(path));
                    }
                }
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(())
    }

    fn assign(&mut self, target: &Expr, value: Value) -> Result<(), String> {
        match target {
            Expr::Name(name) => {
                self.scope.bind(name, value);
                Ok(())
            }
            Expr::Index { value: base, index } => {
                let key = self.eval(index)?;
                if let Expr::Name(name) = base.as_ref() {
                    if matches!(self.scope.get(name), Some(Value::List(_) | Value::Dict(_))) {
                        check_nestable(&key)?;
                        check_nestable(&value)?;
                        self.charge(1)?;
                    }
                    match self.scope.slot_mut(name) {
                        Some(Value::Dict(entries)) => {
                            dict_insert(entries, key, value);
                            return Ok(());
                        }
                        Some(Value::List(items)) => {
                            let i = list_index(items.len(), &key)?;
                            items[i] = value;
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                match self.eval(base)? {
                    Value::Object(object) => self.host.set_item(object, key, value),
                    other => Err(format!(
                        "'{}' object does not support item assignment",
                        other.type_name()
                    )),
                }
            }
            _ => Err("only names and subscripts can be assigned to".to_string()),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, String> {
        Ok(match expr {
            Expr::None => Value::None,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Int(i) => Value::Int(*i),
            Expr::Float(f) => Value::Float(*f),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Name(name) => {
                let value = self.lookup(name)?;
                self.charge_copy(&value)?;
                value
            }
            Expr::Neg(operand) => match self.eval(operand)? {
                Value::Int(i) => Value::Int(i.checked_neg().ok_or("integer overflow")?),
                Value::Float(f) => Value::Float(-f),
                other => {
                    return Err(format!(
                        "bad operand type for unary -: '{}'",
                        other.type_name()
                    ));
                }
            },
            Expr::List(items) => Value::List(self.eval_items(items)?),
            Expr::Tuple(items) => Value::Tuple(self.eval_items(items)?),
            Expr::Dict(entries) => {
                let mut dict = Vec::new();
                for (key, value) in entries {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    check_nestable(&key)?;
                    check_nestable(&value)?;
                    dict_insert(&mut dict, key, value);
                }
                self.charge(dict.len())?;
                Value::Dict(dict)
            }
            Expr::Attr { value, attr } => match self.eval(value)? {
                Value::Module(path) => Value::Module(format!("{path}.{attr}")),
                Value::Object(object) => self.host.attribute(object, attr)?,
                other => {
                    return Err(format!(
                        "'{}' object has no attribute '{attr}'",
                        other.type_name()
                    ));
                }
            },
            Expr::Call { func, args, kwargs } => {
                let positional = self.eval_all(args)?;
                let mut keywords = Vec::with_capacity(kwargs.len());
                for (name, value) in kwargs {
                    keywords.push((name.clone(), self.eval(value)?));
                }
                let result = self.call(func, CallArgs { positional, keywords })?;
                self.charge_copy(&result)?;
                result
            }
            Expr::Index { value, index } => {
                let item = self.subscript(value, index)?;
                self.charge_copy(&item)?;
                item
            }
        })
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, String> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    /// Elements of a list or tuple display.
    fn eval_items(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, String> {
        let mut items = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let item = self.eval(expr)?;
            check_nestable(&item)?;
            items.push(item);
        }
        self.charge(items.len())?;
        Ok(items)
    }

    /// Subscripts of named lists and dicts read the bound value in place.
    fn subscript(&mut self, base: &Expr, index: &Expr) -> Result<Value, String> {
        if let Expr::Name(name) = base {
            let is_data = matches!(
                self.scope.get(name),
                Some(Value::List(_) | Value::Tuple(_) | Value::Dict(_))
            );
            if is_data {
                let key = self.eval(index)?;
                return match self.scope.get(name) {
                    Some(data) => index_data(data, &key),
                    None => Err(format!("name '{name}' is not defined")),
                };
            }
        }
        let base = self.eval(base)?;
        let key = self.eval(index)?;
        match base {
            Value::Object(object) => self.host.get_item(object, &key),
            other => index_data(&other, &key),
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, String> {
        if let Some(value) = self.scope.get(name) {
            return Ok(value.clone());
        }
        if let Some(builtin) = Builtin::lookup(name) {
            return Ok(Value::Builtin(builtin));
        }
        let roots = self.host.roots();
        let star = self.scope.star_modules.iter().find(|module| {
            let root = module.split('.').next().unwrap_or(module);
            roots.contains(&root)
        });
        match star {
            Some(module) => Ok(Value::Module(format!("{module}.{name}"))),
            None => Err(format!("name '{name}' is not defined")),
        }
    }

    fn call(&mut self, func: &Expr, args: CallArgs) -> Result<Value, String> {
        if let Expr::Attr { value, attr } = func {
            if let Expr::Name(name) = value.as_ref() {
                if matches!(self.scope.get(name), Some(Value::List(_) | Value::Dict(_))) {
                    return self.call_data_method(name, attr, args);
                }
            }
        }

        match self.eval(func)? {
            Value::Builtin(builtin) => self.call_builtin(builtin, args),
            Value::Module(path) => {
                let root = path.split('.').next().unwrap_or(&path);
                if self.host.roots().contains(&root) {
                    let name = path.rsplit('.').next().unwrap_or(&path);
                    self.host.call_function(name, args)
                } else {
                    debug!("ignoring call to `{path}`");
                    Ok(Value::None)
                }
            }
            Value::Method(object, method) => self.host.call_method(object, &method, args),
            other => Err(format!("'{}' object is not callable", other.type_name())),
        }
    }

    /// Methods of plain lists and dicts bound to `name`; mutations apply in place.
    fn call_data_method(&mut self, name: &str, method: &str, args: CallArgs) -> Result<Value, String> {
        let growth = match (method, args.positional.first()) {
            ("append", Some(item)) => {
                check_nestable(item)?;
                1
            }
            ("extend" | "update", Some(extra)) => extra.len(),
            _ => 0,
        };
        self.charge(growth)?;

        let Some(slot) = self.scope.slot_mut(name) else {
            return Err(format!("name '{name}' is not defined"));
        };
        match (slot, method) {
            (Value::List(items), "append") => {
                items.push(args.required(0, "object", "append")?.clone());
                Ok(Value::None)
            }
            (Value::List(items), "extend") => {
                let extra = args.required(0, "iterable", "extend")?;
                let extra = extra
                    .elements()
                    .ok_or_else(|| format!("'{}' object is not iterable", extra.type_name()))?;
                items.extend(extra);
                Ok(Value::None)
            }
            (Value::Dict(entries), "get") => {
                let key = args.required(0, "key", "get")?;
                let default = args.positional.get(1).cloned().unwrap_or(Value::None);
                Ok(dict_get(entries, key).cloned().unwrap_or(default))
            }
            (Value::Dict(entries), "keys") => {
                Ok(Value::List(entries.iter().map(|(k, _)| k.clone()).collect()))
            }
            (Value::Dict(entries), "values") => {
                Ok(Value::List(entries.iter().map(|(_, v)| v.clone()).collect()))
            }
            (Value::Dict(entries), "items") => Ok(Value::List(
                entries
                    .iter()
                    .map(|(k, v)| Value::Tuple(vec![k.clone(), v.clone()]))
                    .collect(),
            )),
            (Value::Dict(entries), "update") => {
                let Value::Dict(other) = args.required(0, "other", "update")? else {
                    return Err("update() argument must be a dict".to_string());
                };
                for (key, value) in other.clone() {
                    dict_insert(entries, key, value);
                }
                Ok(Value::None)
            }
            (slot, _) => Err(format!(
                "'{}' object has no attribute '{method}'",
                slot.type_name()
            )),
        }
    }

    fn call_builtin(&mut self, builtin: Builtin, args: CallArgs) -> Result<Value, String> {
        match builtin {
            Builtin::Print => {
                let text: Vec<String> = args.positional.iter().map(ToString::to_string).collect();
                debug!("snippet printed: {}", text.join(" "));
                Ok(Value::None)
            }
            Builtin::Int => match args.required(0, "x", "int")? {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
                Value::Str(s) => s
                    .trim()
                    .parse()
                    .map(Value::Int)
                    .map_err(|_| format!("invalid literal for int() with base 10: '{s}'")),
                other => Err(format!(
                    "int() argument must be a string or a number, not '{}'",
                    other.type_name()
                )),
            },
            Builtin::Float => match args.required(0, "x", "float")? {
                Value::Int(i) => Ok(Value::Float(*i as f64)),
                Value::Float(f) => Ok(Value::Float(*f)),
                Value::Str(s) => s
                    .trim()
                    .parse()
                    .map(Value::Float)
                    .map_err(|_| format!("could not convert string to float: '{s}'")),
                other => Err(format!(
                    "float() argument must be a string or a number, not '{}'",
                    other.type_name()
                )),
            },
            Builtin::Str => Ok(Value::Str(
                args.positional
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            )),
            Builtin::Len => {
                let count = match args.required(0, "obj", "len")? {
                    Value::List(items) | Value::Tuple(items) => items.len(),
                    Value::Dict(entries) => entries.len(),
                    Value::Str(s) => s.chars().count(),
                    other => {
                        return Err(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        ));
                    }
                };
                Ok(Value::Int(count as i64))
            }
            Builtin::Range => self.range(&args),
        }
    }

    fn range(&self, args: &CallArgs) -> Result<Value, String> {
        let mut bounds = Vec::with_capacity(args.positional.len());
        for value in &args.positional {
            bounds.push(value.as_int().ok_or_else(|| {
                format!(
                    "'{}' object cannot be interpreted as an integer",
                    value.type_name()
                )
            })?);
        }
        let (start, stop, step) = match bounds.as_slice() {
            [stop] => (0, *stop, 1),
            [start, stop] => (*start, *stop, 1),
            [start, stop, step] => (*start, *stop, *step),
            _ => {
                return Err(format!(
                    "range expected 1 to 3 arguments, got {}",
                    bounds.len()
                ));
            }
        };
        if step == 0 {
            return Err("range() arg 3 must not be zero".to_string());
        }

        let span = if step > 0 {
            i128::from(stop) - i128::from(start)
        } else {
            i128::from(start) - i128::from(stop)
        };
        let stride = i128::from(step).abs();
        let count = if span <= 0 { 0 } else { (span + stride - 1) / stride };
        if count > self.limits.max_nodes as i128 {
            return Err(format!(
                "range of {count} items exceeds the limit of {}",
                self.limits.max_nodes
            ));
        }
        Ok(Value::List(
            (0..count as i64).map(|i| Value::Int(start + i * step)).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snippet_parser::parse_snippet;
    use pretty_assertions::assert_eq;

    /// Records every call into `lib`; each call returns a fresh object.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        items: Vec<(Value, Value)>,
        objects: usize,
    }

    impl Host for Recorder {
        fn roots(&self) -> &'static [&'static str] {
            &["lib"]
        }

        fn prelude(&mut self) -> Vec<(&'static str, Value)> {
            vec![("lib", Value::Module("lib".to_string()))]
        }

        fn type_name(&self, _object: ObjectRef) -> &'static str {
            "Thing"
        }

        fn call_function(&mut self, name: &str, args: CallArgs) -> Result<Value, String> {
            if name == "fail" {
                return Err("lib.fail() always fails".to_string());
            }
            self.calls.push(format!("{name}{:?}", args.positional));
            self.objects += 1;
            Ok(Value::Object(ObjectRef(self.objects)))
        }

        fn call_method(
            &mut self,
            object: ObjectRef,
            method: &str,
            args: CallArgs,
        ) -> Result<Value, String> {
            self.calls.push(format!("#{}.{method}/{}", object.0, args.keywords.len()));
            Ok(Value::None)
        }

        fn set_item(&mut self, _object: ObjectRef, key: Value, value: Value) -> Result<(), String> {
            self.items.push((key, value));
            Ok(())
        }
    }

    fn limits() -> Limits {
        Limits {
            max_statements: 100,
            max_nodes: 50,
            max_items: 5_000,
        }
    }

    fn run_source(source: &str, host: &mut Recorder) -> Result<Scope, ImportError> {
        let snippet = parse_snippet(source).map_err(ImportError::Execution)?;
        run(&snippet, host, limits())
    }

    #[test]
    fn binds_names_in_first_binding_order() {
        let mut host = Recorder::default();
        let scope = run_source("b = 1\na = 2\nb = 3\n", &mut host).unwrap();
        let names: Vec<&str> = scope.locals().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(scope.get("b"), Some(&Value::Int(3)));
    }

    #[test]
    fn library_calls_reach_the_host() {
        let mut host = Recorder::default();
        let scope = run_source("g = lib.Graph(3)\ng.add(x=1, y=2)\n", &mut host).unwrap();
        assert_eq!(scope.get("g"), Some(&Value::Object(ObjectRef(1))));
        assert_eq!(host.calls, vec!["Graph[Int(3)]", "#1.add/2"]);
    }

    #[test]
    fn aliased_from_import_resolves_to_the_library() {
        let mut host = Recorder::default();
        run_source("from lib.sub import Graph as G\nG()\n", &mut host).unwrap();
        assert_eq!(host.calls, vec!["Graph[]"]);
    }

    #[test]
    fn star_import_makes_library_names_visible() {
        let mut host = Recorder::default();
        run_source("from lib.all import *\nGraph()\n", &mut host).unwrap();
        assert_eq!(host.calls, vec!["Graph[]"]);
    }

    #[test]
    fn foreign_module_calls_are_ignored() {
        let mut host = Recorder::default();
        let scope =
            run_source("import matplotlib.pyplot as plt\nx = plt.show()\n", &mut host).unwrap();
        assert_eq!(scope.get("x"), Some(&Value::None));
        assert!(host.calls.is_empty());
    }

    #[test]
    fn dict_subscript_assignment_mutates_in_place() {
        let mut host = Recorder::default();
        let scope = run_source("pos = {}\npos['a'] = (1, 2.5)\n", &mut host).unwrap();
        let Some(Value::Dict(entries)) = scope.get("pos") else {
            panic!("pos is not a dict");
        };
        assert_eq!(entries[0].1.as_point(), Some(Point::new(1.0, 2.5)));
    }

    #[test]
    fn object_subscript_assignment_goes_to_the_host() {
        let mut host = Recorder::default();
        run_source("g = lib.Graph()\ng['k'] = 1\n", &mut host).unwrap();
        assert_eq!(host.items, vec![(Value::Str("k".to_string()), Value::Int(1))]);
    }

    #[test]
    fn list_methods_and_indexing() {
        let mut host = Recorder::default();
        let scope = run_source(
            "xs = [1]\nxs.append(2)\nxs.extend([3, 4])\nlast = xs[-1]\nn = len(xs)\n",
            &mut host,
        )
        .unwrap();
        assert_eq!(scope.get("last"), Some(&Value::Int(4)));
        assert_eq!(scope.get("n"), Some(&Value::Int(4)));
    }

    #[test]
    fn builtins_convert_values() {
        let mut host = Recorder::default();
        let scope = run_source(
            "a = int('7')\nb = float(2)\nc = str(3)\nd = range(1, 7, 2)\nprint(a, b)\n",
            &mut host,
        )
        .unwrap();
        assert_eq!(scope.get("a"), Some(&Value::Int(7)));
        assert_eq!(scope.get("b"), Some(&Value::Float(2.0)));
        assert_eq!(scope.get("c"), Some(&Value::Str("3".to_string())));
        assert_eq!(
            scope.get("d"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(3), Value::Int(5)]))
        );
    }

    #[test]
    fn unknown_names_report_the_line() {
        let mut host = Recorder::default();
        let err = run_source("a = 1\n\nb = missing\n", &mut host).unwrap_err();
        assert_eq!(
            err,
            ImportError::Execution("line 3: name 'missing' is not defined".to_string())
        );
    }

    #[test]
    fn host_errors_report_the_line() {
        let mut host = Recorder::default();
        let err = run_source("lib.fail()\n", &mut host).unwrap_err();
        assert_eq!(
            err.to_string(),
            "error executing code: line 1: lib.fail() always fails"
        );
    }

    #[test]
    fn range_is_bounded_by_the_node_limit() {
        let mut host = Recorder::default();
        let err = run_source("r = range(1000)\n", &mut host).unwrap_err();
        assert!(err.to_string().contains("exceeds the limit of 50"), "{err}");
    }

    #[test]
    fn statement_count_is_bounded() {
        let source = "x = 1\n".repeat(101);
        let mut host = Recorder::default();
        let err = run_source(&source, &mut host).unwrap_err();
        assert!(err.to_string().contains("more than the limit of 100"), "{err}");
    }

    #[test]
    fn self_extending_lists_hit_the_data_limit() {
        let source = format!("xs = [1]\n{}", "xs.extend(xs)\n".repeat(22));
        let mut host = Recorder::default();
        let err = run_source(&source, &mut host).unwrap_err();
        assert!(err.to_string().contains("exceeds the limit of 5000 items"), "{err}");
    }

    #[test]
    fn strings_count_against_the_data_limit() {
        let source = format!("s = 'abcdefgh'\n{}", "s = str([s, s])\n".repeat(20));
        let mut host = Recorder::default();
        let err = run_source(&source, &mut host).unwrap_err();
        assert!(err.to_string().contains("exceeds the limit of 5000 items"), "{err}");
    }

    #[test]
    fn wrapping_a_value_too_deeply_fails() {
        let source = format!("x = 1\n{}", "x = [x]\n".repeat(MAX_VALUE_DEPTH + 1));
        let mut host = Recorder::default();
        let err = run_source(&source, &mut host).unwrap_err();
        assert!(err.to_string().contains("nest more than 64 levels"), "{err}");
    }

    #[test]
    fn subscripts_read_named_data_in_place() {
        let keys: Vec<String> = (0..40).map(|i| format!("'k{i}': {i}")).collect();
        let mut source = format!("d = {{{}}}\n", keys.join(", "));
        source.push_str(&"v = d['k7']\n".repeat(90));
        let mut host = Recorder::default();
        let scope = run_source(&source, &mut host).unwrap();
        assert_eq!(scope.get("v"), Some(&Value::Int(7)));
    }

    #[test]
    fn footprint_counts_elements_and_bytes() {
        let value = Value::List(vec![
            Value::Str("ab".to_string()),
            Value::Tuple(vec![Value::Int(1), Value::Int(2)]),
        ]);
        assert_eq!(value.footprint(), (6, 2));
    }

    #[test]
    fn repr_looks_like_python() {
        let value = Value::Dict(vec![(
            Value::Str("n0".to_string()),
            Value::Tuple(vec![Value::Float(1.0), Value::Int(2)]),
        )]);
        assert_eq!(value.repr(), "{'n0': (1.0, 2)}");
        assert_eq!(Value::Tuple(vec![Value::None]).repr(), "(None,)");
    }
}
