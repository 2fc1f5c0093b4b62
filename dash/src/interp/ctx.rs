//! Execution context: call trace, shared interpreter state, source registry

use super::scope::ScopeRef;
use crate::ast::{FileId, Span};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Marker for one active construct on the call trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Expr,
    Function,
    Loop,
}

/// Stack of active-construct markers used to validate `return`, `break`
/// and `continue`. A brand-new trace is created per user-function
/// invocation and per spawned worker; loops and blocks push onto the
/// current one.
#[derive(Debug, Clone)]
pub struct CallTrace(Arc<Mutex<Vec<Marker>>>);

impl CallTrace {
    pub fn new() -> Self {
        CallTrace(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn push(&self, marker: Marker) {
        self.0.lock().push(marker);
    }

    pub fn pop(&self) {
        self.0.lock().pop();
    }

    /// Searches top-down, most recent first.
    pub fn is_in(&self, marker: Marker) -> bool {
        self.0.lock().iter().rev().any(|m| *m == marker)
    }
}

impl Default for CallTrace {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide interpreter state: the module registry plus the source
/// registry diagnostics resolve against.
#[derive(Debug)]
struct InterpState {
    modules: HashMap<String, ScopeRef>,
    sources: Vec<(String, String)>,
    main_module: String,
}

/// Shared handle to the interpreter state. Spawned workers hold the same
/// handle; all access is fenced by the mutex.
#[derive(Debug, Clone)]
pub struct StateRef(Arc<Mutex<InterpState>>);

impl StateRef {
    pub fn new() -> Self {
        StateRef(Arc::new(Mutex::new(InterpState {
            modules: HashMap::new(),
            sources: Vec::new(),
            main_module: String::new(),
        })))
    }

    /// Register a source text; diagnostics carry the returned id.
    pub fn add_source(&self, name: &str, text: &str) -> FileId {
        let mut state = self.0.lock();
        state.sources.push((name.to_string(), text.to_string()));
        FileId((state.sources.len() - 1) as u32)
    }

    pub fn source(&self, file: FileId) -> Option<(String, String)> {
        self.0.lock().sources.get(file.0 as usize).cloned()
    }

    /// Registering under an existing name is a silent no-op.
    pub fn add_module(&self, name: &str, scope: ScopeRef) {
        let mut state = self.0.lock();
        if !state.modules.contains_key(name) {
            state.modules.insert(name.to_string(), scope);
        }
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.0.lock().modules.contains_key(name)
    }

    pub fn get_module(&self, name: &str, span: Span) -> Result<ScopeRef> {
        self.0
            .lock()
            .modules
            .get(name)
            .cloned()
            .ok_or_else(|| Error::binding(format!("module '{name}' not found"), span))
    }

    pub fn remove_module(&self, name: &str) {
        self.0.lock().modules.remove(name);
    }

    pub fn set_main_module(&self, name: &str) {
        self.0.lock().main_module = name.to_string();
    }

    pub fn main_module(&self) -> String {
        self.0.lock().main_module.clone()
    }
}

impl Default for StateRef {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one evaluation step needs: the current scope, the call trace
/// of this evaluation session, and the shared interpreter state.
#[derive(Debug, Clone)]
pub struct ExecCtx {
    pub scope: ScopeRef,
    pub trace: CallTrace,
    pub state: StateRef,
}

impl ExecCtx {
    pub fn new(scope: ScopeRef, state: StateRef) -> Self {
        ExecCtx {
            scope,
            trace: CallTrace::new(),
            state,
        }
    }

    /// Fresh child scope; the trace and shared state stay shared.
    pub fn child(&self) -> ExecCtx {
        ExecCtx {
            scope: self.scope.make_child(),
            trace: self.trace.clone(),
            state: self.state.clone(),
        }
    }
}
