//! Lexical scope chain
//!
//! Frames are shared: closures capture their defining frame by reference,
//! and several child frames created later may hang off the same parent.
//! Frames are also reachable from spawned worker threads, so they live
//! behind `Arc<Mutex<_>>`. Chain walks lock one frame at a time; a guard is
//! always dropped before following the parent link.

use super::value::Value;
use crate::ast::Span;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<ScopeRef>,
}

/// Shared handle to one scope frame.
#[derive(Debug, Clone)]
pub struct ScopeRef(Arc<Mutex<Scope>>);

impl ScopeRef {
    /// A root frame with no parent.
    pub fn root() -> Self {
        ScopeRef(Arc::new(Mutex::new(Scope {
            vars: HashMap::new(),
            parent: None,
        })))
    }

    /// A fresh child frame. The parent is shared, not transferred.
    pub fn make_child(&self) -> ScopeRef {
        ScopeRef(Arc::new(Mutex::new(Scope {
            vars: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    /// `let`: errors if the name exists in *this* frame; shadowing a parent
    /// binding is allowed.
    pub fn declare(&self, name: &str, value: Value, span: Span) -> Result<()> {
        let mut scope = self.0.lock();
        if scope.vars.contains_key(name) {
            return Err(Error::binding(
                format!("variable '{name}' already exists"),
                span,
            ));
        }
        scope.vars.insert(name.to_string(), value);
        Ok(())
    }

    /// Climbs to the root; `None` if the name is bound nowhere.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let scope = self.0.lock();
        if let Some(value) = scope.vars.get(name) {
            return Some(value.clone());
        }
        let parent = scope.parent.clone();
        drop(scope);
        parent.and_then(|p| p.lookup(name))
    }

    pub fn get(&self, name: &str, span: Span) -> Result<Value> {
        self.lookup(name)
            .ok_or_else(|| Error::binding(format!("variable '{name}' not found"), span))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Overwrites the binding in the frame that owns it; errors if no frame
    /// on the chain does.
    pub fn reassign(&self, name: &str, value: Value, span: Span) -> Result<()> {
        let mut scope = self.0.lock();
        if scope.vars.contains_key(name) {
            scope.vars.insert(name.to_string(), value);
            return Ok(());
        }
        let parent = scope.parent.clone();
        drop(scope);
        match parent {
            Some(p) => p.reassign(name, value, span),
            None => Err(Error::binding(
                format!("variable '{name}' doesn't exist"),
                span,
            )),
        }
    }

    /// Force-bind into the local frame, never touching the chain. Used for
    /// loop variables, `self`, and the reflection primitives.
    pub fn set(&self, name: &str, value: Value) {
        self.0.lock().vars.insert(name.to_string(), value);
    }

    /// Removes from the owning frame; errors if the name is bound nowhere.
    pub fn remove(&self, name: &str, span: Span) -> Result<()> {
        let mut scope = self.0.lock();
        if scope.vars.remove(name).is_some() {
            return Ok(());
        }
        let parent = scope.parent.clone();
        drop(scope);
        match parent {
            Some(p) => p.remove(name, span),
            None => Err(Error::binding(
                format!("variable '{name}' doesn't exist"),
                span,
            )),
        }
    }

    /// Merge this frame's visible bindings into `other`: parents first, then
    /// the local frame, so local bindings win. Implements bulk module import.
    pub fn copy_into(&self, other: &ScopeRef) {
        let (parent, locals) = {
            let scope = self.0.lock();
            (scope.parent.clone(), scope.vars.clone())
        };
        if let Some(p) = parent {
            p.copy_into(other);
        }
        for (name, value) in locals {
            other.set(&name, value);
        }
    }
}
