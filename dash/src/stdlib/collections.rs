//! `list`, `str` and `dict` modules

use crate::ast::Span;
use crate::error::{Error, Result};
use crate::interp::ctx::ExecCtx;
use crate::interp::value::{Flow, Value};
use crate::interp::BuiltinFn;

pub const LIST: &[(&str, BuiltinFn, i32)] = &[
    ("add", list_add as BuiltinFn, 2),
    ("has", list_has as BuiltinFn, 2),
    ("removeAt", list_remove_at as BuiltinFn, 2),
    ("insert", list_insert as BuiltinFn, 3),
    ("slice", list_slice as BuiltinFn, 3),
    ("len", list_len as BuiltinFn, 1),
];

pub const STR: &[(&str, BuiltinFn, i32)] = &[
    ("len", str_len as BuiltinFn, 1),
    ("upper", str_upper as BuiltinFn, 1),
    ("lower", str_lower as BuiltinFn, 1),
    ("split", str_split as BuiltinFn, 2),
    ("replace", str_replace as BuiltinFn, 3),
    ("startsWith", str_starts_with as BuiltinFn, 2),
    ("endsWith", str_ends_with as BuiltinFn, 2),
    ("subString", str_sub_string as BuiltinFn, 3),
];

pub const DICT: &[(&str, BuiltinFn, i32)] = &[("hasKey", dict_has_key as BuiltinFn, 2)];

fn out_of_bounds(idx: i32, len: usize, span: Span) -> Error {
    Error::runtime(
        format!("index out of bounds: tried to get '{idx}' in list of '{len}' elements"),
        span,
    )
}

fn wrap_index(idx: i32, len: usize, span: Span) -> Result<usize> {
    let effective = if idx < 0 {
        i64::from(idx) + len as i64
    } else {
        i64::from(idx)
    };
    if effective < 0 || effective >= len as i64 {
        return Err(out_of_bounds(idx, len, span));
    }
    Ok(effective as usize)
}

// ---- list ----

fn list_add(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    args[0].as_list(span)?.lock().push(args[1].clone());
    Ok(Flow::Value(Value::Null))
}

fn list_has(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let needle = args[1].non_null(span)?;
    let items = args[0].as_list(span)?;
    let items = items.lock();
    for item in items.iter() {
        item.non_null(span)?;
        if item == needle {
            return Ok(Flow::Value(Value::Bool(true)));
        }
    }
    Ok(Flow::Value(Value::Bool(false)))
}

fn list_remove_at(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let idx = args[1].as_int(span)?;
    let items = args[0].as_list(span)?;
    let mut items = items.lock();
    let pos = wrap_index(idx, items.len(), span)?;
    items.remove(pos);
    Ok(Flow::Value(Value::Null))
}

fn list_insert(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let idx = args[1].as_int(span)?;
    let items = args[0].as_list(span)?;
    let mut items = items.lock();
    let pos = wrap_index(idx, items.len(), span)?;
    items.insert(pos, args[2].clone());
    Ok(Flow::Value(Value::Null))
}

fn list_slice(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let items = args[0].as_list(span)?;
    let start = args[1].as_int(span)?;
    let count = args[2].as_int(span)?;
    let items = items.lock();
    if start < 0 || count < 0 || (start as usize) + (count as usize) > items.len() {
        return Err(Error::runtime("index out of bounds", span));
    }
    let slice = items[start as usize..(start + count) as usize].to_vec();
    Ok(Flow::Value(Value::list(slice)))
}

fn list_len(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let len = args[0].as_list(span)?.lock().len();
    Ok(Flow::Value(Value::Int(len as i32)))
}

// ---- str ----

fn str_len(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    Ok(Flow::Value(Value::Int(args[0].as_string().chars().count() as i32)))
}

fn str_upper(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    Ok(Flow::Value(Value::Str(args[0].as_string().to_uppercase())))
}

fn str_lower(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    Ok(Flow::Value(Value::Str(args[0].as_string().to_lowercase())))
}

fn str_split(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    let target = args[0].as_string();
    let separator = args[1].as_string();
    let parts = target
        .split(separator.as_str())
        .map(|part| Value::Str(part.to_string()))
        .collect();
    Ok(Flow::Value(Value::list(parts)))
}

fn str_replace(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    let target = args[0].as_string();
    let from = args[1].as_string();
    let to = args[2].as_string();
    Ok(Flow::Value(Value::Str(target.replace(&from, &to))))
}

fn str_starts_with(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    let target = args[0].as_string();
    let prefix = args[1].as_string();
    Ok(Flow::Value(Value::Bool(target.starts_with(&prefix))))
}

fn str_ends_with(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    let target = args[0].as_string();
    let suffix = args[1].as_string();
    Ok(Flow::Value(Value::Bool(target.ends_with(&suffix))))
}

fn str_sub_string(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let target = args[0].as_string();
    let start = args[1].as_int(span)?;
    let end = args[2].as_int(span)?;
    let chars: Vec<char> = target.chars().collect();
    let len = chars.len();
    if start < 0 || end < 0 || start >= end || end as usize > len {
        return Err(Error::runtime(
            format!("wrong arguments given; [start: {start}, end: {end}, length of str: {len}]"),
            span,
        ));
    }
    let out: String = chars[start as usize..end as usize].iter().collect();
    Ok(Flow::Value(Value::Str(out)))
}

// ---- dict ----

fn dict_has_key(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let entries = args[0].as_dict(span)?;
    let key = args[1].as_string();
    let has = entries.lock().contains_key(&key);
    Ok(Flow::Value(Value::Bool(has)))
}
