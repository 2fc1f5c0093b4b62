//! Runtime values and control-flow results

use super::callable::{Callable, StructInstance};
use super::reference::RefCellObj;
use crate::ast::Span;
use crate::error::{Error, Result};
use crate::types::Type;
use parking_lot::Mutex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Runtime value. List/dict/struct payloads are shared and mutated in
/// place; every other payload is copied with the value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Str(String),
    List(Arc<Mutex<Vec<Value>>>),
    Dict(Arc<Mutex<HashMap<String, Value>>>),
    Struct(Arc<Mutex<StructInstance>>),
    Callable(Arc<Callable>),
    Ref(Arc<RefCellObj>),
}

/// The result of evaluating an expression: either a value or a control
/// signal. Signals are ordinary results that sequence evaluators inspect
/// explicitly; they are never host-level errors.
#[derive(Debug, Clone)]
pub enum Flow {
    Value(Value),
    Break,
    Continue,
    Return(Value),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Arc::new(Mutex::new(items)))
    }

    pub fn dict(entries: HashMap<String, Value>) -> Value {
        Value::Dict(Arc::new(Mutex::new(entries)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the runtime kind, as used in diagnostics and by the
    /// left-operand dispatch of the operator table.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Struct(_) => "struct",
            Value::Callable(c) => c.type_name(),
            Value::Ref(_) => "ref",
        }
    }

    /// The runtime type descriptor of this value (the candidate side of
    /// every compatibility check).
    pub fn type_of(&self) -> Type {
        match self {
            Value::Struct(instance) => {
                let instance = instance.lock();
                Type::Struct {
                    name: instance.name.clone(),
                    inherited: instance.inherited.clone(),
                }
            }
            other => Type::simple(other.type_name()),
        }
    }

    pub fn as_bool(&self, span: Span) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::type_error(
                format!("expected 'bool', got '{}'", other.type_name()),
                span,
            )),
        }
    }

    pub fn as_int(&self, span: Span) -> Result<i32> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(Error::type_error(
                format!("expected 'int', got '{}'", other.type_name()),
                span,
            )),
        }
    }

    /// Widen any numeric kind to the arbitrary-precision intermediate.
    pub fn as_number(&self, span: Span) -> Result<Decimal> {
        let widened = match self {
            Value::Int(n) => Some(Decimal::from(*n)),
            Value::Float(x) => Decimal::from_f32(*x),
            Value::Double(x) => Decimal::from_f64(*x),
            Value::Decimal(d) => Some(*d),
            other => {
                return Err(Error::type_error(
                    format!("expected number, got '{}'", other.type_name()),
                    span,
                ));
            }
        };
        widened.ok_or_else(|| Error::runtime("number out of range", span))
    }

    /// Narrow an arbitrary-precision result back to a named numeric kind.
    /// Fractions truncate toward zero when the target is `int`.
    pub fn narrow(value: Decimal, kind: &str, span: Span) -> Result<Value> {
        match kind {
            "int" => value
                .trunc()
                .to_i32()
                .map(Value::Int)
                .ok_or_else(|| Error::runtime("overflow", span)),
            "float" => value
                .to_f32()
                .map(Value::Float)
                .ok_or_else(|| Error::runtime("overflow", span)),
            "double" => value
                .to_f64()
                .map(Value::Double)
                .ok_or_else(|| Error::runtime("overflow", span)),
            "decimal" => Ok(Value::Decimal(value)),
            other => Err(Error::type_error(
                format!("expected number, got '{other}'"),
                span,
            )),
        }
    }

    /// Display form; also the payload of `as str` casts and string
    /// concatenation.
    pub fn as_string(&self) -> String {
        self.to_string()
    }

    /// List view. Lists hand out their backing storage; dicts coerce to a
    /// fresh list of `{"key", "value"}` dicts, strings to a fresh list of
    /// one-character strings.
    pub fn as_list(&self, span: Span) -> Result<Arc<Mutex<Vec<Value>>>> {
        match self {
            Value::List(items) => Ok(items.clone()),
            Value::Dict(entries) => {
                let entries = entries.lock();
                let items = entries
                    .iter()
                    .map(|(key, value)| {
                        let mut entry = HashMap::new();
                        entry.insert("key".to_string(), Value::Str(key.clone()));
                        entry.insert("value".to_string(), value.clone());
                        Value::dict(entry)
                    })
                    .collect();
                Ok(Arc::new(Mutex::new(items)))
            }
            Value::Str(s) => {
                let items = s.chars().map(|c| Value::Str(c.to_string())).collect();
                Ok(Arc::new(Mutex::new(items)))
            }
            other => Err(Error::type_error(
                format!("expected 'list', got '{}'", other.type_name()),
                span,
            )),
        }
    }

    pub fn as_dict(&self, span: Span) -> Result<Arc<Mutex<HashMap<String, Value>>>> {
        match self {
            Value::Dict(entries) => Ok(entries.clone()),
            other => Err(Error::type_error(
                format!("expected 'dict', got '{}'", other.type_name()),
                span,
            )),
        }
    }

    pub fn as_struct(&self, span: Span) -> Result<Arc<Mutex<StructInstance>>> {
        match self {
            Value::Struct(instance) => Ok(instance.clone()),
            other => Err(Error::type_error(
                format!("expected struct, got '{}'", other.type_name()),
                span,
            )),
        }
    }

    pub fn as_callable(&self, span: Span) -> Result<Arc<Callable>> {
        match self {
            Value::Callable(callable) => Ok(callable.clone()),
            other => Err(Error::type_error(
                format!("expected 'callable', got '{}'", other.type_name()),
                span,
            )),
        }
    }

    pub fn as_ref_cell(&self, span: Span) -> Result<Arc<RefCellObj>> {
        match self {
            Value::Ref(cell) => Ok(cell.clone()),
            other => Err(Error::type_error(
                format!("expected 'ref', got '{}'", other.type_name()),
                span,
            )),
        }
    }

    /// Errors when the payload is null; equality and `list.has` require
    /// non-null operands.
    pub fn non_null(&self, span: Span) -> Result<&Value> {
        if self.is_null() {
            Err(Error::runtime("is null", span))
        } else {
            Ok(self)
        }
    }
}

/// Structural equality on primitive payloads; identity on shared payloads
/// (two lists are equal only when they are the same list).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Arc::ptr_eq(a, b),
            (Value::Struct(a), Value::Struct(b)) => Arc::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => Arc::ptr_eq(a, b),
            (Value::Ref(a), Value::Ref(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.lock().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.lock().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " \"{key}\": {value}")?;
                }
                write!(f, " }}")
            }
            Value::Struct(instance) => {
                let instance = instance.lock();
                write!(f, "{} {{", instance.name)?;
                for (i, (name, value)) in instance.fields().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Callable(c) => match c.type_name() {
                "constructor" => write!(f, "<constructor>"),
                _ => write!(f, "<callable>"),
            },
            Value::Ref(_) => write!(f, "<ref>"),
        }
    }
}
