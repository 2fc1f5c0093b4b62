//! Runtime type descriptors and the compatibility predicate.
//!
//! Compatibility is one-directional: `expected.is_compatible_with(actual)`.
//! Struct compatibility matches against the *candidate's* inherited list,
//! so a value of `struct B(): A` satisfies an expected `A`, but an `A`
//! value does not satisfy an expected `B`.

use crate::ast::{Expr, Span, Spanned};
use crate::error::Result;
use crate::interp::ctx::ExecCtx;
use crate::interp::eval::{eval, expect_value};
use crate::interp::value::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A type descriptor, attached to let bindings, parameters, struct fields
/// and return positions, and computed for every runtime value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Type {
    /// Matches everything; the default for unannotated positions.
    Any,
    /// Nominal equality on the type name.
    Simple(String),
    /// A struct type together with the names it inherits from.
    Struct { name: String, inherited: Vec<String> },
    /// Structurally always compatible; real filtering happens in
    /// [`Type::check`] by evaluating the expression against the value.
    Predicate(Arc<Spanned<Expr>>),
    Not(Box<Type>),
    And(Box<Type>, Box<Type>),
    Either(Box<Type>, Box<Type>),
}

impl Type {
    pub fn simple(name: &str) -> Type {
        Type::Simple(name.to_string())
    }

    /// Display name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            Type::Any => "any".to_string(),
            Type::Simple(name) => name.clone(),
            Type::Struct { name, .. } => name.clone(),
            Type::Predicate(_) => "predicate".to_string(),
            Type::Not(t) => format!("!{}", t.name()),
            Type::And(a, b) => format!("{}&{}", a.name(), b.name()),
            Type::Either(a, b) => format!("{}|{}", a.name(), b.name()),
        }
    }

    /// Structural compatibility check. `candidate` is the runtime type of
    /// an actual value; `self` is the expected type.
    pub fn is_compatible_with(&self, candidate: &Type) -> bool {
        match self {
            Type::Any => true,
            Type::Simple(name) => match candidate {
                Type::Simple(other) => name == other,
                Type::Struct { name: cand, inherited } => {
                    cand == name || inherited.iter().any(|i| i == name)
                }
                _ => false,
            },
            Type::Struct { name, .. } => match candidate {
                Type::Struct { name: cand, inherited } => {
                    cand == name || inherited.iter().any(|i| i == name)
                }
                _ => false,
            },
            Type::Predicate(_) => true,
            Type::Not(t) => !t.is_compatible_with(candidate),
            Type::And(a, b) => a.is_compatible_with(candidate) && b.is_compatible_with(candidate),
            Type::Either(a, b) => a.is_compatible_with(candidate) || b.is_compatible_with(candidate),
        }
    }

    /// Evaluate a predicate type against a candidate value: the expression
    /// runs in a fresh child scope with `self` bound to the value, and the
    /// result is coerced to a boolean. Non-predicate types accept.
    pub fn check(&self, ctx: &ExecCtx, value: &Value, span: Span) -> Result<bool> {
        match self {
            Type::Predicate(expr) => {
                let mut child = ctx.child();
                child.scope.set("self", value.clone());
                let flow = eval(expr, &mut child)?;
                expect_value(flow, expr.span)?.as_bool(span)
            }
            _ => Ok(true),
        }
    }
}
