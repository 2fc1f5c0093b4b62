//! File execution
//!
//! A file runs as a module: its body evaluates top to bottom in a fresh
//! root scope, the scope is registered under the declared module name, and
//! an exported zero-argument `main` is invoked afterwards. Fatal
//! interpretation errors print a diagnostic and the process still exits
//! with status 0; that contract is intentional.

use crate::ast::{FileId, Span};
use crate::error::{report_error, Error, Result};
use crate::interp::ctx::{ExecCtx, StateRef};
use crate::interp::eval::eval;
use crate::interp::scope::ScopeRef;
use crate::interp::call_value;
use crate::lexer::tokenize;
use crate::parser::Parser;
use std::path::Path;

/// CLI entry for `run <file>`.
pub fn run_file(path: &str) {
    if !Path::new(path).exists() {
        println!("File '{path}' not found");
        return;
    }
    let state = StateRef::new();
    if let Err(err) = execute_file(path, &state) {
        report(&err, &state);
    }
}

/// Execute a file against the given interpreter state.
pub fn execute_file(path: &str, state: &StateRef) -> Result<()> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        Error::runtime(
            format!("can't read '{path}': {e}"),
            Span::synthetic(FileId(0)),
        )
    })?;
    let file = state.add_source(path, &source);
    let tokens = tokenize(&source, file)?;

    let mut parser = Parser::new(file, tokens, state.clone());
    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path);
    parser.set_default_module_name(stem);
    let exprs = parser.parse_everything()?;

    let scope = ScopeRef::root();
    let mut ctx = ExecCtx::new(scope.clone(), state.clone());
    for expr in &exprs {
        eval(expr, &mut ctx)?;
    }

    let module_name = parser.module_name().to_string();
    state.set_main_module(&module_name);
    state.add_module(&module_name, scope.clone());

    if scope.exists("main") {
        let entry_span = Span::synthetic(file);
        let entry = scope.get("main", entry_span)?.as_callable(entry_span)?;
        let module_scope = state.get_module(&module_name, entry_span)?;
        let mut main_ctx = ExecCtx::new(module_scope, state.clone());
        call_value(&entry, Vec::new(), entry_span, &mut main_ctx)?;
    }
    Ok(())
}

/// Render a diagnostic against the source registry.
pub fn report(err: &Error, state: &StateRef) {
    match state.source(err.span().file) {
        Some((name, text)) => report_error(err, &name, &text),
        None => eprintln!("{err}"),
    }
}
