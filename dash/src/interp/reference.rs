//! Ref-cells
//!
//! A ref-cell wraps an accessible *location* (identifier, field or index
//! expression) together with the context it was created in; reads and
//! writes re-evaluate the location through that context instead of holding
//! a value directly. Identifier reads and writes dereference bound
//! ref-cells transparently.

use super::ctx::ExecCtx;
use super::eval::{place_get, place_set};
use super::value::Value;
use crate::ast::{Expr, Spanned};
use crate::error::Result;
use std::sync::Arc;

pub struct RefCellObj {
    target: Arc<Spanned<Expr>>,
    ctx: ExecCtx,
}

// The captured context can reach this cell again through the scope chain;
// print only the target expression.
impl std::fmt::Debug for RefCellObj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefCellObj({:?})", self.target.node)
    }
}

impl RefCellObj {
    pub fn new(target: Arc<Spanned<Expr>>, ctx: ExecCtx) -> Self {
        RefCellObj { target, ctx }
    }

    pub fn get(&self) -> Result<Value> {
        let mut ctx = self.ctx.clone();
        place_get(&self.target, &mut ctx)
    }

    pub fn set(&self, value: Value) -> Result<()> {
        let mut ctx = self.ctx.clone();
        place_set(&self.target, value, &mut ctx)
    }
}
