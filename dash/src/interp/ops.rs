//! Builtin operator tables
//!
//! Fixed semantics reached only when no user binding shadows the operator
//! symbol in the current scope. Arithmetic widens both operands to the
//! arbitrary-precision intermediate, performs the operation, and narrows
//! the result back to the *left* operand's numeric kind; the right operand
//! only has to be numeric.

use super::callable::{Callable, UserFunction};
use super::value::Value;
use crate::ast::{Expr, Span, Spanned};
use crate::error::{Error, Result};
use std::sync::Arc;

const NUMERIC_KINDS: [&str; 4] = ["int", "float", "double", "decimal"];

pub fn apply_binary(op: &str, a: Value, b: Value, span: Span) -> Result<Value> {
    match op {
        "+" => add(a, b, span),
        "-" | "*" | "/" | "%" => {
            if NUMERIC_KINDS.contains(&a.type_name()) {
                arith(op, &a, &b, span)
            } else {
                Err(Error::runtime("invalid operation", span))
            }
        }
        "==" => {
            a.non_null(span)?;
            b.non_null(span)?;
            Ok(Value::Bool(a == b))
        }
        "!=" => {
            a.non_null(span)?;
            b.non_null(span)?;
            Ok(Value::Bool(a != b))
        }
        "<" | ">" | "<=" | ">=" => {
            let x = a.as_number(span)?;
            let y = b.as_number(span)?;
            let result = match op {
                "<" => x < y,
                ">" => x > y,
                "<=" => x <= y,
                _ => x >= y,
            };
            Ok(Value::Bool(result))
        }
        // Both sides are already evaluated by the caller; there is no
        // short-circuit.
        "&&" => Ok(Value::Bool(a.as_bool(span)? && b.as_bool(span)?)),
        "||" => Ok(Value::Bool(a.as_bool(span)? || b.as_bool(span)?)),
        _ => Err(Error::runtime(
            format!("operator '{op}' doesn't exist"),
            span,
        )),
    }
}

pub fn apply_unary(op: &str, value: Value, span: Span) -> Result<Value> {
    match op {
        "!" => Ok(Value::Bool(!value.as_bool(span)?)),
        "-" => {
            let kind = value.type_name();
            if !NUMERIC_KINDS.contains(&kind) {
                return Err(Error::type_error(
                    format!("expected number, got '{kind}'"),
                    span,
                ));
            }
            let negated = -value.as_number(span)?;
            Value::narrow(negated, kind, span)
        }
        _ => Err(Error::runtime(
            format!("operator '{op}' doesn't exist"),
            span,
        )),
    }
}

fn arith(op: &str, a: &Value, b: &Value, span: Span) -> Result<Value> {
    let kind = a.type_name();
    let x = a.as_number(span)?;
    let y = b.as_number(span)?;

    if (op == "/" || op == "%") && y.is_zero() {
        return Err(Error::runtime("division by zero", span));
    }

    let result = match op {
        "+" => x.checked_add(y),
        "-" => x.checked_sub(y),
        "*" => x.checked_mul(y),
        "/" => x.checked_div(y),
        _ => x.checked_rem(y),
    };

    let result = result.ok_or_else(|| Error::runtime("overflow", span))?;
    Value::narrow(result, kind, span)
}

fn add(a: Value, b: Value, span: Span) -> Result<Value> {
    match a.type_name() {
        kind if NUMERIC_KINDS.contains(&kind) => arith("+", &a, &b, span),
        "str" => Ok(Value::Str(format!("{}{}", a.as_string(), b.as_string()))),
        "list" => {
            // Append into the left operand's backing storage and return
            // that same list: `a + b` aliases `a`.
            let appended: Vec<Value> = b.as_list(span)?.lock().clone();
            let storage = a.as_list(span)?;
            storage.lock().extend(appended);
            Ok(Value::List(storage))
        }
        "callable" => compose(&a, &b, span),
        _ => Err(Error::runtime("invalid operation", span)),
    }
}

/// `f + g`: a new function whose parameter mask is the union of both masks
/// (left names win), whose body runs f's body then g's in sequence, and
/// whose declared return type is g's. The composed function keeps f's
/// captured environment.
fn compose(a: &Value, b: &Value, span: Span) -> Result<Value> {
    let (Value::Callable(ca), Value::Callable(cb)) = (a, b) else {
        return Err(Error::runtime("invalid operation", span));
    };
    let (Callable::Function(fa), Callable::Function(fb)) = (&**ca, &**cb) else {
        return Err(Error::runtime("invalid operation", span));
    };

    let mut params = fa.params.clone();
    for entry in &fb.params {
        if !params.iter().any(|p| p.name == entry.name) {
            params.push(entry.clone());
        }
    }

    let body = Expr::Block(vec![(*fa.body).clone(), (*fb.body).clone()]);
    let composed = UserFunction {
        params,
        ret: fb.ret.clone(),
        body: Arc::new(Spanned::new(body, span)),
        captured: fa.captured.clone(),
    };
    Ok(Value::Callable(Arc::new(Callable::Function(composed))))
}
