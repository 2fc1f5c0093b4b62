//! REPL (Read-Eval-Print Loop) for dash
//!
//! Each input line is parsed as a single expression and evaluated against
//! a persistent session scope (the `main` module). A diagnostic abandons
//! the line only; the session keeps its state.

use crate::ast::Span;
use crate::error::Result;
use crate::interp::ctx::{ExecCtx, StateRef};
use crate::interp::eval::{eval, expect_value};
use crate::interp::scope::ScopeRef;
use crate::lexer::tokenize;
use crate::parser::Parser;
use crate::run::report;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const PROMPT: &str = "> ";
const HISTORY_FILE: &str = ".dash_history";

pub struct Repl {
    editor: DefaultEditor,
    state: StateRef,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new() -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = home_dir().map(|home| home.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            state: session_state(),
            history_path,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    pub fn run(&mut self) -> RlResult<()> {
        println!("Welcome to Dash REPL");
        println!("Type :q to quit, :r to reset the session.\n");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);

                    match line {
                        ":q" => break,
                        ":r" => {
                            self.state = session_state();
                            println!("Repl reset");
                        }
                        _ => self.eval_line(line),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    fn eval_line(&mut self, line: &str) {
        if let Err(err) = self.try_eval(line) {
            report(&err, &self.state);
        }
    }

    fn try_eval(&mut self, line: &str) -> Result<()> {
        let file = self.state.add_source("REPL", line);
        let tokens = tokenize(line, file)?;
        let mut parser = Parser::new(file, tokens, self.state.clone());
        parser.parse_any()?;

        if let Some(expr) = parser.take() {
            let scope = self.state.get_module("main", Span::synthetic(file))?;
            let mut ctx = ExecCtx::new(scope, self.state.clone());
            let value = expect_value(eval(&expr, &mut ctx)?, expr.span)?;
            if !value.is_null() {
                println!("{value}");
            }
        }
        Ok(())
    }
}

fn session_state() -> StateRef {
    let state = StateRef::new();
    state.add_module("main", ScopeRef::root());
    state.set_main_module("main");
    state
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::value::Value;

    /// Drive the parse-eval path the REPL uses, without the editor.
    fn eval_session_line(state: &StateRef, line: &str) -> Result<Value> {
        let file = state.add_source("REPL", line);
        let tokens = tokenize(line, file)?;
        let mut parser = Parser::new(file, tokens, state.clone());
        parser.parse_any()?;
        let expr = parser.take().expect("one expression");
        let scope = state.get_module("main", Span::synthetic(file))?;
        let mut ctx = ExecCtx::new(scope, state.clone());
        expect_value(eval(&expr, &mut ctx)?, expr.span)
    }

    #[test]
    fn test_session_scope_persists_between_lines() {
        let state = session_state();
        eval_session_line(&state, "let x = 40").unwrap();
        assert_eq!(eval_session_line(&state, "x + 2").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_error_leaves_session_usable() {
        let state = session_state();
        eval_session_line(&state, "let x = 1").unwrap();
        assert!(eval_session_line(&state, "missing_name").is_err());
        assert_eq!(eval_session_line(&state, "x").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_reset_drops_bindings() {
        let mut state = session_state();
        eval_session_line(&state, "let x = 1").unwrap();
        state = session_state();
        assert!(eval_session_line(&state, "x").is_err());
    }
}
