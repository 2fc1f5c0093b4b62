//! Standard-library modules
//!
//! Every library function is a `Builtin` callable registered under a name
//! inside a named module scope. `provide` backs the `import` keyword: a
//! known library name builds its scope, anything else is treated as a file
//! path whose contents are parsed and evaluated immediately, then
//! registered under the file's declared module name.

mod collections;
mod console;
mod fs;
mod reflection;
mod thread;

use crate::ast::Span;
use crate::error::{Error, Result};
use crate::interp::callable::BuiltinFunction;
use crate::interp::ctx::{ExecCtx, StateRef};
use crate::interp::eval::eval;
use crate::interp::scope::ScopeRef;
use crate::interp::value::Value;
use crate::interp::{BuiltinFn, Callable};
use crate::lexer::tokenize;
use crate::parser::Parser;
use std::path::Path;
use std::sync::Arc;

type Entries = &'static [(&'static str, BuiltinFn, i32)];

/// Build the scope of a named standard-library module, if it exists.
pub fn lookup(name: &str) -> Option<ScopeRef> {
    let entries: Entries = match name {
        "console" => console::ENTRIES,
        "list" => collections::LIST,
        "str" => collections::STR,
        "dict" => collections::DICT,
        "file" => fs::FILE,
        "dir" => fs::DIR,
        "env" => fs::ENV,
        "thread" => thread::ENTRIES,
        "reflection" => reflection::ENTRIES,
        _ => return None,
    };

    let scope = ScopeRef::root();
    for (fn_name, func, arity) in entries {
        scope.set(
            fn_name,
            Value::Callable(Arc::new(Callable::Builtin(BuiltinFunction {
                func: *func,
                arity: *arity,
            }))),
        );
    }
    Some(scope)
}

/// Resolve an `import`: standard-library name or file path. Registration
/// under an already-known name is a no-op, so repeated imports neither
/// re-run a module body nor replace its scope.
pub fn provide(name: &str, state: &StateRef, span: Span) -> Result<()> {
    if state.has_module(name) {
        return Ok(());
    }

    if let Some(scope) = lookup(name) {
        state.add_module(name, scope);
        return Ok(());
    }

    if !Path::new(name).exists() {
        return Err(Error::binding(
            format!("file with path '{name}' not found"),
            span,
        ));
    }

    let source = std::fs::read_to_string(name)
        .map_err(|e| Error::runtime(format!("can't read '{name}': {e}"), span))?;
    let file = state.add_source(name, &source);
    let tokens = tokenize(&source, file)?;

    let mut parser = Parser::new(file, tokens, state.clone());
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    parser.set_default_module_name(stem);
    let exprs = parser.parse_everything()?;

    let scope = ScopeRef::root();
    let mut ctx = ExecCtx::new(scope.clone(), state.clone());
    for expr in &exprs {
        eval(expr, &mut ctx)?;
    }
    state.add_module(parser.module_name(), scope);
    Ok(())
}
