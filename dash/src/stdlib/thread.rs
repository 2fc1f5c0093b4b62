//! `thread` module: blocking sleep and OS-level workers
//!
//! A spawned worker runs an independent context whose scope chain and
//! interpreter state are the *same* shared handles as the spawning
//! context; the mutexes inside those handles are the only fencing. The
//! worker gets a fresh call trace of its own. There is no cancellation or
//! timeout: workers end when their callable returns or the process exits.

use crate::ast::Span;
use crate::error::Result;
use crate::interp::ctx::{CallTrace, ExecCtx};
use crate::interp::value::{Flow, Value};
use crate::interp::{call_value, BuiltinFn};
use std::time::Duration;

pub const ENTRIES: &[(&str, BuiltinFn, i32)] = &[
    ("sleep", sleep as BuiltinFn, 1),
    ("start", start as BuiltinFn, 1),
];

fn sleep(_ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let ms = args[0].as_int(span)?.max(0) as u64;
    std::thread::sleep(Duration::from_millis(ms));
    Ok(Flow::Value(Value::Null))
}

fn start(ctx: &mut ExecCtx, args: &[Value], span: Span) -> Result<Flow> {
    let callable = args[0].as_callable(span)?;
    let mut worker_ctx = ExecCtx {
        scope: ctx.scope.clone(),
        trace: CallTrace::new(),
        state: ctx.state.clone(),
    };
    std::thread::spawn(move || {
        if let Err(err) = call_value(&callable, Vec::new(), span, &mut worker_ctx) {
            // A worker's top level is the thread entry: report and end the
            // worker only.
            crate::run::report(&err, &worker_ctx.state);
        }
    });
    Ok(Flow::Value(Value::Null))
}
