//! Callables: user functions, builtins, struct constructors
//!
//! All three share one invocation path: coerce arguments, check
//! compatibility (predicate types included), dispatch, and unwrap the
//! `Return` signal — a `Return` escaping a function boundary is a contract
//! violation. The call-depth guard lives here too: unbounded recursion is
//! caught once, at the invocation boundary, and becomes an ordinary
//! diagnostic.

use super::ctx::{CallTrace, ExecCtx, Marker};
use super::eval::{eval, expect_value};
use super::scope::ScopeRef;
use super::value::{Flow, Value};
use crate::ast::{Expr, MaskEntry, Span, Spanned};
use crate::error::{Error, Result};
use crate::types::Type;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

/// Native function: already-evaluated arguments, the call-site span, and
/// the caller's context by mutable reference.
pub type BuiltinFn = fn(&mut ExecCtx, &[Value], Span) -> Result<Flow>;

const MAX_CALL_DEPTH: usize = 8_000;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// A user-defined function: parameter mask, declared return type, body,
/// and the *defining* environment captured by reference.
pub struct UserFunction {
    pub params: Vec<MaskEntry>,
    pub ret: Type,
    pub body: Arc<Spanned<Expr>>,
    pub captured: ScopeRef,
}

/// A native function with fixed arity (-1 for variadic).
pub struct BuiltinFunction {
    pub func: BuiltinFn,
    pub arity: i32,
}

/// A struct constructor: field mask, struct name, inherited names.
#[derive(Debug)]
pub struct Constructor {
    pub name: String,
    pub fields: Vec<MaskEntry>,
    pub inherited: Vec<String>,
}

pub enum Callable {
    Function(UserFunction),
    Builtin(BuiltinFunction),
    Constructor(Constructor),
}

// Shallow on purpose: a closure's captured scope can reach the closure
// itself, so printing it would never terminate.
impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callable::Function(func) => {
                write!(f, "Function(params: {})", func.params.len())
            }
            Callable::Builtin(b) => write!(f, "Builtin(arity: {})", b.arity),
            Callable::Constructor(c) => write!(f, "Constructor({})", c.name),
        }
    }
}

impl Callable {
    pub fn type_name(&self) -> &'static str {
        match self {
            Callable::Constructor(_) => "constructor",
            _ => "callable",
        }
    }

    /// Operator shadowing dispatches unary operators only to one-parameter
    /// callables, and binary operators only to non-unary ones.
    pub fn is_unary(&self) -> bool {
        match self {
            Callable::Function(f) => f.params.len() == 1,
            Callable::Constructor(c) => c.fields.len() == 1,
            Callable::Builtin(_) => false,
        }
    }

    /// Arity / argument-type compatibility. An arity mismatch on user
    /// functions and constructors is immediately fatal; type or predicate
    /// rejection reports `false` and the caller turns it into the
    /// wrong-arguments diagnostic.
    fn accepts(&self, args: &[Value], span: Span, ctx: &ExecCtx) -> Result<bool> {
        match self {
            Callable::Function(f) => mask_accepts(&f.params, args, span, ctx),
            Callable::Constructor(c) => mask_accepts(&c.fields, args, span, ctx),
            Callable::Builtin(b) => Ok(b.arity == -1 || b.arity as usize == args.len()),
        }
    }
}

fn mask_accepts(mask: &[MaskEntry], args: &[Value], span: Span, ctx: &ExecCtx) -> Result<bool> {
    if mask.len() != args.len() {
        return Err(Error::type_error("argument count mismatch", span));
    }
    for (entry, arg) in mask.iter().zip(args) {
        if !entry.ty.check(ctx, arg, span)? {
            return Ok(false);
        }
        if !entry.ty.is_compatible_with(&arg.type_of()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Invoke a callable with already-evaluated arguments.
pub fn call_value(
    callable: &Arc<Callable>,
    args: Vec<Value>,
    span: Span,
    ctx: &mut ExecCtx,
) -> Result<Flow> {
    let depth = CALL_DEPTH.get();
    if depth >= MAX_CALL_DEPTH {
        return Err(Error::stack_overflow(span));
    }
    CALL_DEPTH.set(depth + 1);
    let result = dispatch(callable, args, span, ctx);
    CALL_DEPTH.set(depth);
    result
}

fn dispatch(
    callable: &Arc<Callable>,
    args: Vec<Value>,
    span: Span,
    ctx: &mut ExecCtx,
) -> Result<Flow> {
    if !callable.accepts(&args, span, ctx)? {
        return Err(Error::type_error("wrong arguments given", span));
    }
    match &**callable {
        Callable::Function(f) => f.invoke(callable, args, span, ctx),
        Callable::Builtin(b) => (b.func)(ctx, &args, span),
        Callable::Constructor(c) => c.construct(args),
    }
}

impl UserFunction {
    fn invoke(
        &self,
        this: &Arc<Callable>,
        args: Vec<Value>,
        span: Span,
        ctx: &mut ExecCtx,
    ) -> Result<Flow> {
        let frame = self.captured.make_child();
        frame.set("self", Value::Callable(this.clone()));
        for (entry, value) in self.params.iter().zip(args) {
            frame.declare(&entry.name, value, span)?;
        }

        // Each invocation is its own evaluation session: a brand-new trace
        // with a FUNCTION marker, never the caller's.
        let trace = CallTrace::new();
        trace.push(Marker::Function);
        let mut fn_ctx = ExecCtx {
            scope: frame,
            trace: trace.clone(),
            state: ctx.state.clone(),
        };

        let result = eval(&self.body, &mut fn_ctx)?;
        trace.pop();

        let value = match result {
            Flow::Return(v) => v,
            other => expect_value(other, span)?,
        };
        if self.ret.is_compatible_with(&value.type_of()) {
            Ok(Flow::Value(value))
        } else {
            Err(Error::type_error("returned wrong type", span))
        }
    }
}

impl Constructor {
    fn construct(&self, args: Vec<Value>) -> Result<Flow> {
        let mut instance = StructInstance::new(self.name.clone(), self.inherited.clone());
        for (entry, value) in self.fields.iter().zip(args) {
            instance.push_field(entry.name.clone(), value, entry.ty.clone());
        }
        Ok(Flow::Value(Value::Struct(Arc::new(parking_lot::Mutex::new(
            instance,
        )))))
    }
}

/// A struct instance: name, declaration-ordered fields, per-field types.
#[derive(Debug)]
pub struct StructInstance {
    pub name: String,
    pub inherited: Vec<String>,
    fields: Vec<(String, Value)>,
    types: HashMap<String, Type>,
}

impl StructInstance {
    pub fn new(name: String, inherited: Vec<String>) -> Self {
        StructInstance {
            name,
            inherited,
            fields: Vec::new(),
            types: HashMap::new(),
        }
    }

    pub fn push_field(&mut self, name: String, value: Value, ty: Type) {
        self.types.insert(name.clone(), ty);
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn get(&self, name: &str, span: Span) -> Result<Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| Error::binding(format!("field '{name}' doesn't exist"), span))
    }

    pub fn set(&mut self, name: &str, value: Value, span: Span) -> Result<()> {
        let Some(slot) = self.fields.iter_mut().find(|(n, _)| n == name) else {
            return Err(Error::binding(
                format!("field '{name}' doesn't exist"),
                span,
            ));
        };
        let ty = &self.types[name];
        if !ty.is_compatible_with(&value.type_of()) {
            return Err(Error::type_error(
                format!(
                    "field '{}' is of type '{}' but '{}' was given",
                    name,
                    ty.name(),
                    value.type_name()
                ),
                span,
            ));
        }
        slot.1 = value;
        Ok(())
    }

    pub fn remove_field(&mut self, name: &str, span: Span) -> Result<()> {
        let before = self.fields.len();
        self.fields.retain(|(n, _)| n != name);
        if self.fields.len() == before {
            return Err(Error::binding(
                format!("field '{name}' doesn't exist"),
                span,
            ));
        }
        self.types.remove(name);
        Ok(())
    }

    /// The first *declared* field, used by invocation-through-struct.
    pub fn first_field(&self) -> Option<(String, Value, Type)> {
        self.fields.first().map(|(name, value)| {
            let ty = self.types.get(name).cloned().unwrap_or(Type::Any);
            (name.clone(), value.clone(), ty)
        })
    }
}
