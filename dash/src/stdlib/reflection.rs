//! `reflection` module: scope, module and struct manipulation primitives

use crate::ast::Span;
use crate::error::{Error, Result};
use crate::interp::callable::StructInstance;
use crate::interp::ctx::ExecCtx;
use crate::interp::value::{Flow, Value};
use crate::interp::{call_value, BuiltinFn};
use std::collections::HashMap;
use std::sync::Arc;

pub const ENTRIES: &[(&str, BuiltinFn, i32)] = &[
    ("bind", bind as BuiltinFn, 2),
    ("bindMod", bind_mod as BuiltinFn, 3),
    ("ifHas", if_has as BuiltinFn, 1),
    ("del", del as BuiltinFn, 1),
    ("delFromMod", del_from_mod as BuiltinFn, 2),
    ("using", using as BuiltinFn, 1),
    ("unimport", unimport as BuiltinFn, 1),
    ("copyMod", copy_mod as BuiltinFn, 2),
    ("makeStruct", make_struct as BuiltinFn, 2),
    ("addField", add_field as BuiltinFn, 3),
    ("delField", del_field as BuiltinFn, 2),
    ("fields", fields as BuiltinFn, 1),
    ("invoke", invoke as BuiltinFn, 2),
];

/// Force-bind a name in the caller's current scope.
fn bind(ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    ctx.scope.set(&args[0].as_string(), args[1].clone());
    Ok(Flow::Value(Value::Null))
}

fn bind_mod(ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let module = ctx.state.get_module(&args[0].as_string(), span)?;
    module.set(&args[1].as_string(), args[2].clone());
    Ok(Flow::Value(Value::Null))
}

fn if_has(ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    let name = args[0].as_string();
    Ok(Flow::Value(ctx.scope.lookup(&name).unwrap_or(Value::Null)))
}

fn del(ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let name = args[0].as_string();
    if ctx.scope.exists(&name) {
        ctx.scope.remove(&name, span)?;
    }
    Ok(Flow::Value(Value::Null))
}

fn del_from_mod(ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let module = ctx.state.get_module(&args[0].as_string(), span)?;
    let name = args[1].as_string();
    if module.exists(&name) {
        module.remove(&name, span)?;
    }
    Ok(Flow::Value(Value::Null))
}

/// Bulk import: copy each named module's bindings into the current scope.
fn using(ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let modules = args[0].as_list(span)?;
    let modules = modules.lock().clone();
    for module in modules {
        let name = module.as_string();
        if !ctx.state.has_module(&name) {
            return Err(Error::binding(
                format!("module '{name}' is not imported"),
                span,
            ));
        }
        ctx.state.get_module(&name, span)?.copy_into(&ctx.scope);
    }
    Ok(Flow::Value(Value::Null))
}

fn unimport(ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let modules = args[0].as_list(span)?;
    let modules = modules.lock().clone();
    for module in modules {
        let name = module.as_string();
        if !ctx.state.has_module(&name) {
            return Err(Error::binding(
                format!("module '{name}' can't be un-imported since it doesn't exist"),
                span,
            ));
        }
        ctx.state.remove_module(&name);
    }
    Ok(Flow::Value(Value::Null))
}

fn copy_mod(ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let from = ctx.state.get_module(&args[0].as_string(), span)?;
    let to = ctx.state.get_module(&args[1].as_string(), span)?;
    from.copy_into(&to);
    Ok(Flow::Value(Value::Null))
}

/// Build a struct instance from a dict; field types mirror the current
/// value types.
fn make_struct(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let name = args[0].as_string();
    let entries = args[1].as_dict(span)?;
    let entries = entries.lock();
    let mut instance = StructInstance::new(name, Vec::new());
    for (field, value) in entries.iter() {
        instance.push_field(field.clone(), value.clone(), value.type_of());
    }
    Ok(Flow::Value(Value::Struct(Arc::new(parking_lot::Mutex::new(
        instance,
    )))))
}

fn add_field(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let instance = args[0].as_struct(span)?;
    let name = args[1].as_string();
    let value = args[2].clone();
    let ty = value.type_of();
    instance.lock().push_field(name, value, ty);
    Ok(Flow::Value(Value::Null))
}

fn del_field(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let instance = args[0].as_struct(span)?;
    let name = args[1].as_string();
    instance.lock().remove_field(&name, span)?;
    Ok(Flow::Value(Value::Null))
}

fn fields(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let instance = args[0].as_struct(span)?;
    let instance = instance.lock();
    let out = instance
        .fields()
        .iter()
        .map(|(field, value)| {
            let mut entry = HashMap::new();
            entry.insert("field".to_string(), Value::Str(field.clone()));
            entry.insert("value".to_string(), value.clone());
            Value::dict(entry)
        })
        .collect();
    Ok(Flow::Value(Value::list(out)))
}

fn invoke(ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let callable = args[0].as_callable(span)?;
    let call_args = args[1].as_list(span)?;
    let call_args = call_args.lock().clone();
    call_value(&callable, call_args, span, ctx)
}
