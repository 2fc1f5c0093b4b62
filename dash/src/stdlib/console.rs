//! `console` module: terminal I/O

use crate::ast::Span;
use crate::error::Result;
use crate::interp::ctx::ExecCtx;
use crate::interp::value::{Flow, Value};
use crate::interp::BuiltinFn;
use std::io::{self, BufRead, Write};

pub const ENTRIES: &[(&str, BuiltinFn, i32)] = &[
    ("println", println as BuiltinFn, -1),
    ("print", print as BuiltinFn, -1),
    ("input", input as BuiltinFn, 0),
];

fn println(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    let mut out = String::new();
    for arg in args {
        out.push_str(&arg.as_string());
    }
    println!("{out}");
    Ok(Flow::Value(Value::Null))
}

fn print(_ctx: &mut ExecCtx, args: &[Value], _span: Span) -> Result<Flow> {
    let mut stdout = io::stdout();
    for arg in args {
        let _ = write!(stdout, "{}", arg.as_string());
    }
    let _ = stdout.flush();
    Ok(Flow::Value(Value::Null))
}

fn input(_ctx: &mut ExecCtx, _args: &[Value], _span: Span) -> Result<Flow> {
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => Ok(Flow::Value(Value::Null)),
        Ok(_) => {
            let trimmed = line.trim_end_matches(['\n', '\r']);
            Ok(Flow::Value(Value::Str(trimmed.to_string())))
        }
    }
}
