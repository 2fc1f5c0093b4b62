//! Expression AST nodes

use super::Spanned;
use crate::types::Type;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Literal payload, converted to a runtime value on evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Str(String),
}

/// A parameter or struct-field mask entry: name plus declared type
/// (defaults to `Any` when unannotated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskEntry {
    pub name: String,
    pub ty: Type,
}

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Literal(Literal),

    /// Variable reference (reads through ref-cells transparently)
    Ident(String),

    /// `_` — reads as null, discards writes
    Void,

    /// Parenthesized expression. Opaque to precedence rotation.
    Group(Box<Spanned<Expr>>),

    /// Braced block: one child frame shared by all children
    Block(Vec<Spanned<Expr>>),

    /// Unscoped sequence: function and module bodies, evaluated in the
    /// caller's frame
    Seq(Vec<Spanned<Expr>>),

    If {
        cond: Box<Spanned<Expr>>,
        then_branch: Box<Spanned<Expr>>,
        else_branch: Option<Box<Spanned<Expr>>>,
    },

    Let {
        name: String,
        ty: Type,
        value: Box<Spanned<Expr>>,
    },

    /// `target = value`; target must evaluate to an accessible place
    Assign {
        target: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },

    Index {
        target: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },

    Field {
        target: Box<Spanned<Expr>>,
        name: String,
    },

    /// `module::name`
    Scoped { module: String, name: String },

    /// Anonymous function; the body is shared with closures at runtime
    Lambda {
        params: Vec<MaskEntry>,
        ret: Type,
        body: Arc<Spanned<Expr>>,
    },

    /// Named function: builds the closure and declares it in the current
    /// frame
    Function {
        name: String,
        params: Vec<MaskEntry>,
        ret: Type,
        body: Arc<Spanned<Expr>>,
    },

    /// `struct Name(field: type, ...) : Parent, ...` — binds a constructor
    StructDecl {
        name: String,
        fields: Vec<MaskEntry>,
        inherited: Vec<String>,
    },

    Invoke {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },

    List(Vec<Spanned<Expr>>),

    /// `dict { "key": value, ... }`
    Dict(Vec<(String, Spanned<Expr>)>),

    /// `ref <place>` — captures the place expression and the current context
    Ref(Arc<Spanned<Expr>>),

    /// `exec <str-expr>` — parse and evaluate a string in the current context
    Exec(Box<Spanned<Expr>>),

    Cast {
        value: Box<Spanned<Expr>>,
        ty: Type,
    },

    /// `value is type`
    TypeTest {
        value: Box<Spanned<Expr>>,
        ty: Type,
    },

    Unary {
        op: String,
        expr: Box<Spanned<Expr>>,
    },

    Binary {
        op: String,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },

    While {
        cond: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
    },

    For {
        init: Box<Spanned<Expr>>,
        cond: Box<Spanned<Expr>>,
        step: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
    },

    Foreach {
        var: String,
        iter: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
    },

    Return(Box<Spanned<Expr>>),
    Break,
    Continue,
}

impl Expr {
    /// Loop nodes get a LOOP marker on the call trace; everything else EXPR.
    pub fn is_loop(&self) -> bool {
        matches!(self, Expr::While { .. } | Expr::For { .. } | Expr::Foreach { .. })
    }

    /// Whether this node can act as an assignment / `ref` target.
    pub fn is_place(&self) -> bool {
        matches!(
            self,
            Expr::Ident(_) | Expr::Index { .. } | Expr::Field { .. } | Expr::Scoped { .. } | Expr::Void
        )
    }
}
