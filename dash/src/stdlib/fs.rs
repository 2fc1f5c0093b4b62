//! `file`, `dir` and `env` modules: OS facilities

use crate::ast::Span;
use crate::error::{Error, Result};
use crate::interp::ctx::ExecCtx;
use crate::interp::value::{Flow, Value};
use crate::interp::BuiltinFn;
use std::path::Path;

pub const FILE: &[(&str, BuiltinFn, i32)] = &[
    ("exist", file_exist as BuiltinFn, 1),
    ("readAll", file_read_all as BuiltinFn, 1),
    ("writeAll", file_write_all as BuiltinFn, 2),
];

pub const DIR: &[(&str, BuiltinFn, i32)] = &[
    ("exist", dir_exist as BuiltinFn, 1),
    ("files", dir_files as BuiltinFn, 1),
    ("dirs", dir_dirs as BuiltinFn, 1),
];

pub const ENV: &[(&str, BuiltinFn, i32)] = &[
    ("getPwd", env_get_pwd as BuiltinFn, 0),
    ("setPwd", env_set_pwd as BuiltinFn, 1),
    ("user", env_user as BuiltinFn, 0),
    ("cmdArgs", env_cmd_args as BuiltinFn, 0),
    ("exit", env_exit as BuiltinFn, -1),
];

// ---- file ----

fn file_exist(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    Ok(Flow::Value(Value::Bool(Path::new(&args[0].as_string()).is_file())))
}

fn file_read_all(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let name = args[0].as_string();
    if !Path::new(&name).is_file() {
        return Err(Error::runtime(
            format!("file with path '{name}' doesn't exist"),
            span,
        ));
    }
    let text = std::fs::read_to_string(&name)
        .map_err(|e| Error::runtime(format!("can't read '{name}': {e}"), span))?;
    Ok(Flow::Value(Value::Str(text)))
}

fn file_write_all(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let name = args[0].as_string();
    std::fs::write(&name, args[1].as_string())
        .map_err(|e| Error::runtime(format!("can't write '{name}': {e}"), span))?;
    Ok(Flow::Value(Value::Null))
}

// ---- dir ----

fn dir_exist(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    Ok(Flow::Value(Value::Bool(Path::new(&args[0].as_string()).is_dir())))
}

fn read_dir_entries(name: &str, want_dirs: bool, span: Span) -> Result<Value> {
    if !Path::new(name).is_dir() {
        return Err(Error::runtime(
            format!("directory '{name}' doesn't exist"),
            span,
        ));
    }
    let entries = std::fs::read_dir(name)
        .map_err(|e| Error::runtime(format!("can't read directory '{name}': {e}"), span))?;
    let mut out = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() == want_dirs {
            out.push(Value::Str(path.display().to_string()));
        }
    }
    Ok(Value::list(out))
}

fn dir_files(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    read_dir_entries(&args[0].as_string(), false, span).map(Flow::Value)
}

fn dir_dirs(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    read_dir_entries(&args[0].as_string(), true, span).map(Flow::Value)
}

// ---- env ----

fn env_get_pwd(_ctx: &mut ExecCtx, _args: &[Value], span: Span) -> Result<Flow> {
    let dir = std::env::current_dir()
        .map_err(|e| Error::runtime(format!("can't read working directory: {e}"), span))?;
    Ok(Flow::Value(Value::Str(dir.display().to_string())))
}

fn env_set_pwd(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let dir = args[0].as_string();
    if !Path::new(&dir).is_dir() {
        return Err(Error::runtime(
            format!("directory '{dir}' doesn't exist"),
            span,
        ));
    }
    std::env::set_current_dir(&dir)
        .map_err(|e| Error::runtime(format!("can't enter '{dir}': {e}"), span))?;
    Ok(Flow::Value(Value::Null))
}

fn env_user(_ctx: &mut ExecCtx, _args: &[Value], _span: Span) -> Result<Flow> {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    Ok(Flow::Value(Value::Str(user)))
}

fn env_cmd_args(_ctx: &mut ExecCtx, _args: &[Value], _span: Span) -> Result<Flow> {
    let args = std::env::args().map(Value::Str).collect();
    Ok(Flow::Value(Value::list(args)))
}

fn env_exit(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let code = match args {
        [only] => only.as_int(span)?,
        _ => 0,
    };
    std::process::exit(code);
}
