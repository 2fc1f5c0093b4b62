//! Expression evaluator
//!
//! Every evaluation returns `Result<Flow, Error>`: errors are fatal
//! diagnostics, `Flow` carries either a value or a control signal that
//! sequence evaluators inspect explicitly. No sub-expression suspends;
//! every child runs to completion before its sibling starts.

use super::callable::{call_value, Callable, Constructor, UserFunction};
use super::ctx::{ExecCtx, Marker};
use super::ops;
use super::reference::RefCellObj;
use super::value::{Flow, Value};
use crate::ast::{Expr, Literal, MaskEntry, Span, Spanned};
use crate::error::{Error, Result};
use crate::lexer::tokenize;
use crate::parser::Parser;
use crate::types::Type;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

// Stack growth parameters for deep expression trees; the call-depth limit
// itself lives at the callable-invocation boundary.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

pub fn eval(expr: &Spanned<Expr>, ctx: &mut ExecCtx) -> Result<Flow> {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || eval_inner(expr, ctx))
}

/// Coerce a flow to a value; control signals are not values.
pub fn expect_value(flow: Flow, span: Span) -> Result<Value> {
    match flow {
        Flow::Value(value) => Ok(value),
        _ => Err(Error::runtime("tried to use non-value as value", span)),
    }
}

fn eval_value(expr: &Spanned<Expr>, ctx: &mut ExecCtx) -> Result<Value> {
    let flow = eval(expr, ctx)?;
    expect_value(flow, expr.span)
}

fn eval_inner(expr: &Spanned<Expr>, ctx: &mut ExecCtx) -> Result<Flow> {
    let span = expr.span;
    match &expr.node {
        Expr::Literal(lit) => Ok(Flow::Value(literal_value(lit))),

        Expr::Ident(_) | Expr::Void | Expr::Index { .. } | Expr::Field { .. } | Expr::Scoped { .. } => {
            place_get(expr, ctx).map(Flow::Value)
        }

        Expr::Group(inner) => eval(inner, ctx),

        Expr::Seq(children) => eval_sequence(children, ctx),

        Expr::Block(children) => {
            let mut block_ctx = ctx.child();
            eval_sequence(children, &mut block_ctx)
        }

        Expr::If { cond, then_branch, else_branch } => {
            let mut cond_ctx = ctx.child();
            let test = eval_value(cond, &mut cond_ctx)?.as_bool(cond.span)?;
            // Branches run in a child of the condition frame: condition
            // bindings are visible, branch bindings do not leak out.
            let mut branch_ctx = cond_ctx.child();
            if test {
                eval(then_branch, &mut branch_ctx)
            } else if let Some(else_branch) = else_branch {
                eval(else_branch, &mut branch_ctx)
            } else {
                Ok(Flow::Value(Value::Null))
            }
        }

        Expr::Let { name, ty, value } => {
            let value = eval_value(value, ctx)?;
            if !ty.is_compatible_with(&value.type_of()) {
                return Err(Error::type_error(
                    format!("expected '{}', got '{}'", ty.name(), value.type_name()),
                    span,
                ));
            }
            ctx.scope.declare(name, value.clone(), span)?;
            Ok(Flow::Value(value))
        }

        Expr::Assign { target, value } => {
            if target.node.is_place() {
                let value = eval_value(value, ctx)?;
                place_set(target, value, ctx)?;
                place_get(target, ctx).map(Flow::Value)
            } else {
                let resolved = eval_value(target, ctx)?;
                match resolved {
                    Value::Ref(cell) => {
                        let value = eval_value(value, ctx)?;
                        cell.set(value)?;
                        cell.get().map(Flow::Value)
                    }
                    _ => Err(Error::runtime("assignment target is not accessible", span)),
                }
            }
        }

        Expr::Lambda { params, ret, body } => Ok(Flow::Value(make_function(params, ret, body, ctx))),

        Expr::Function { name, params, ret, body } => {
            let function = make_function(params, ret, body, ctx);
            ctx.scope.declare(name, function.clone(), span)?;
            Ok(Flow::Value(function))
        }

        Expr::StructDecl { name, fields, inherited } => {
            let constructor = Value::Callable(Arc::new(Callable::Constructor(Constructor {
                name: name.clone(),
                fields: fields.clone(),
                inherited: inherited.clone(),
            })));
            ctx.scope.declare(name, constructor.clone(), span)?;
            Ok(Flow::Value(constructor))
        }

        Expr::Invoke { callee, args } => eval_invoke(callee, args, span, ctx),

        Expr::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_value(item, ctx)?);
            }
            Ok(Flow::Value(Value::list(values)))
        }

        Expr::Dict(entries) => {
            let mut values = HashMap::with_capacity(entries.len());
            for (key, value) in entries {
                values.insert(key.clone(), eval_value(value, ctx)?);
            }
            Ok(Flow::Value(Value::dict(values)))
        }

        Expr::Ref(target) => {
            if !target.node.is_place() {
                return Err(Error::runtime("ref target is not accessible", span));
            }
            Ok(Flow::Value(Value::Ref(Arc::new(RefCellObj::new(
                target.clone(),
                ctx.clone(),
            )))))
        }

        Expr::Exec(source) => eval_exec(source, ctx),

        Expr::Cast { value, ty } => {
            let value = eval_value(value, ctx)?;
            cast(value, ty, span).map(Flow::Value)
        }

        Expr::TypeTest { value, ty } => {
            let value = eval_value(value, ctx)?;
            Ok(Flow::Value(Value::Bool(ty.is_compatible_with(&value.type_of()))))
        }

        Expr::Unary { op, expr: operand } => {
            // A scope binding with the operator's symbol shadows the builtin
            // table when its shape matches (one-argument callable).
            if let Some(shadow) = ctx.scope.lookup(op) {
                let callable = shadow.as_callable(span)?;
                if callable.is_unary() {
                    let arg = eval_value(operand, ctx)?;
                    return call_value(&callable, vec![arg], span, ctx);
                }
            }
            let value = eval_value(operand, ctx)?;
            ops::apply_unary(op, value, span).map(Flow::Value)
        }

        Expr::Binary { op, left, right } => {
            if let Some(shadow) = ctx.scope.lookup(op) {
                let callable = shadow.as_callable(span)?;
                if !callable.is_unary() {
                    let a = eval_value(left, ctx)?;
                    let b = eval_value(right, ctx)?;
                    return call_value(&callable, vec![a, b], span, ctx);
                }
            }
            let a = eval_value(left, ctx)?;
            let b = eval_value(right, ctx)?;
            ops::apply_binary(op, a, b, span).map(Flow::Value)
        }

        Expr::While { .. } | Expr::For { .. } | Expr::Foreach { .. } => {
            ctx.trace.push(Marker::Loop);
            let result = eval_loop(&expr.node, span, ctx);
            ctx.trace.pop();
            result
        }

        Expr::Return(inner) => {
            if !ctx.trace.is_in(Marker::Function) {
                return Err(Error::control_flow("can't return outside the function", span));
            }
            let value = eval_value(inner, ctx)?;
            Ok(Flow::Return(value))
        }

        Expr::Break => {
            if !ctx.trace.is_in(Marker::Loop) {
                return Err(Error::control_flow("can't break outside the loop", span));
            }
            Ok(Flow::Break)
        }

        Expr::Continue => {
            if !ctx.trace.is_in(Marker::Loop) {
                return Err(Error::control_flow("can't continue outside the loop", span));
            }
            Ok(Flow::Continue)
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::Double(x) => Value::Double(*x),
        Literal::Decimal(d) => Value::Decimal(*d),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

fn make_function(params: &[MaskEntry], ret: &Type, body: &Arc<Spanned<Expr>>, ctx: &ExecCtx) -> Value {
    Value::Callable(Arc::new(Callable::Function(UserFunction {
        params: params.to_vec(),
        ret: ret.clone(),
        body: body.clone(),
        captured: ctx.scope.clone(),
    })))
}

/// Children evaluate in order; the first control signal stops the sequence
/// and propagates unchanged. The sequence value is the last child's value.
fn eval_sequence(children: &[Spanned<Expr>], ctx: &mut ExecCtx) -> Result<Flow> {
    let mut last = Value::Null;
    for child in children {
        let marker = if child.node.is_loop() { Marker::Loop } else { Marker::Expr };
        ctx.trace.push(marker);
        match eval(child, ctx)? {
            Flow::Value(value) => {
                last = value;
                ctx.trace.pop();
            }
            // The trace belongs to this evaluation session; a propagating
            // signal leaves its marker for the session owner to discard.
            signal => return Ok(signal),
        }
    }
    Ok(Flow::Value(last))
}

fn eval_invoke(
    callee: &Spanned<Expr>,
    args: &[Spanned<Expr>],
    span: Span,
    ctx: &mut ExecCtx,
) -> Result<Flow> {
    let callee_value = eval_value(callee, ctx)?;

    let callable = match &callee_value {
        // A struct is invokable through its first declared field, one level
        // of indirection only.
        Value::Struct(instance) => {
            let first = instance.lock().first_field();
            match first {
                None => {
                    return Err(Error::runtime(
                        "callable struct must have at least one callable field",
                        span,
                    ));
                }
                Some((_, value, ty)) => {
                    let callable_ty = Type::simple("callable");
                    let constructor_ty = Type::simple("constructor");
                    if ty.is_compatible_with(&callable_ty) || ty.is_compatible_with(&constructor_ty) {
                        value.as_callable(span)?
                    } else {
                        return Err(Error::runtime(
                            "first field of callable struct must be callable",
                            span,
                        ));
                    }
                }
            }
        }
        other => other.as_callable(span)?,
    };

    let mut arg_values = Vec::with_capacity(args.len());
    for arg in args {
        arg_values.push(eval_value(arg, ctx)?);
    }
    call_value(&callable, arg_values, span, ctx)
}

fn eval_exec(source: &Spanned<Expr>, ctx: &mut ExecCtx) -> Result<Flow> {
    let text = eval_value(source, ctx)?.as_string();
    let file = ctx.state.add_source("<exec>", &text);
    let tokens = tokenize(&text, file)?;
    let mut parser = Parser::new(file, tokens, ctx.state.clone());
    let parsed = parser.parse_everything()?;

    // Runs in the current context, not a child frame.
    let mut last = Flow::Value(Value::Null);
    for expr in &parsed {
        last = eval(expr, ctx)?;
    }
    Ok(last)
}

fn eval_loop(node: &Expr, span: Span, ctx: &mut ExecCtx) -> Result<Flow> {
    match node {
        Expr::While { cond, body } => {
            // The condition frame persists across iterations; each body
            // iteration gets a fresh child of it.
            let mut cond_ctx = ctx.child();
            loop {
                if !eval_value(cond, &mut cond_ctx)?.as_bool(cond.span)? {
                    break;
                }
                let mut body_ctx = cond_ctx.child();
                match eval(body, &mut body_ctx)? {
                    Flow::Break => break,
                    Flow::Continue => continue,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Value(_) => {}
                }
            }
            Ok(Flow::Value(Value::Null))
        }

        Expr::For { init, cond, step, body } => {
            let mut init_ctx = ctx.child();
            eval(init, &mut init_ctx)?;
            let mut cond_ctx = init_ctx.child();
            loop {
                if !eval_value(cond, &mut cond_ctx)?.as_bool(cond.span)? {
                    break;
                }
                let mut body_ctx = cond_ctx.child();
                match eval(body, &mut body_ctx)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Continue | Flow::Value(_) => {
                        let mut step_ctx = cond_ctx.child();
                        eval(step, &mut step_ctx)?;
                    }
                }
            }
            Ok(Flow::Value(Value::Null))
        }

        Expr::Foreach { var, iter, body } => {
            let mut iter_ctx = ctx.child();
            let items = eval_value(iter, &mut iter_ctx)?.as_list(iter.span)?;
            let mut index = 0usize;
            loop {
                // Re-read the live list each step; the body may mutate it.
                let item = {
                    let items = items.lock();
                    if index >= items.len() {
                        break;
                    }
                    items[index].clone()
                };
                let mut body_ctx = iter_ctx.child();
                body_ctx.scope.set(var, item);
                match eval(body, &mut body_ctx)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Continue | Flow::Value(_) => {}
                }
                index += 1;
            }
            Ok(Flow::Value(Value::Null))
        }

        _ => Err(Error::runtime("not a loop", span)),
    }
}

/// Read through an accessible location.
pub fn place_get(expr: &Spanned<Expr>, ctx: &mut ExecCtx) -> Result<Value> {
    let span = expr.span;
    match &expr.node {
        Expr::Ident(name) => {
            let value = ctx.scope.get(name, span)?;
            match value {
                Value::Ref(cell) => cell.get(),
                other => Ok(other),
            }
        }
        Expr::Void => Ok(Value::Null),
        Expr::Index { target, index } => index_get(target, index, span, ctx),
        Expr::Field { target, name } => {
            let instance = eval_value(target, ctx)?.as_struct(span)?;
            let result = instance.lock().get(name, span);
            result
        }
        Expr::Scoped { module, name } => {
            let module_scope = ctx.state.get_module(module, span)?;
            module_scope.get(name, span)
        }
        _ => Err(Error::runtime("not an accessible location", span)),
    }
}

/// Write through an accessible location.
pub fn place_set(expr: &Spanned<Expr>, value: Value, ctx: &mut ExecCtx) -> Result<()> {
    let span = expr.span;
    match &expr.node {
        Expr::Ident(name) => {
            let current = ctx.scope.get(name, span)?;
            match current {
                Value::Ref(cell) => cell.set(value),
                _ => ctx.scope.reassign(name, value, span),
            }
        }
        Expr::Void => Ok(()),
        Expr::Index { target, index } => index_set(target, index, value, span, ctx),
        Expr::Field { target, name } => {
            let instance = eval_value(target, ctx)?.as_struct(span)?;
            let result = instance.lock().set(name, value, span);
            result
        }
        // Writes through module access are silently ignored.
        Expr::Scoped { .. } => Ok(()),
        _ => Err(Error::runtime("not an accessible location", span)),
    }
}

fn resolve_index(idx: i32, len: usize, span: Span) -> Result<usize> {
    let effective = if idx < 0 {
        i64::from(idx) + len as i64
    } else {
        i64::from(idx)
    };
    if effective < 0 || effective >= len as i64 {
        return Err(Error::runtime(
            format!("index out of bounds: tried to get '{idx}' in list of '{len}' elements"),
            span,
        ));
    }
    Ok(effective as usize)
}

fn index_get(
    target: &Spanned<Expr>,
    index: &Spanned<Expr>,
    span: Span,
    ctx: &mut ExecCtx,
) -> Result<Value> {
    let receiver = eval_value(target, ctx)?;
    match &receiver {
        Value::List(items) => {
            let idx = eval_value(index, ctx)?.as_int(index.span)?;
            let items = items.lock();
            let pos = resolve_index(idx, items.len(), span)?;
            Ok(items[pos].clone())
        }
        Value::Dict(entries) => {
            let key = eval_value(index, ctx)?.as_string();
            let entries = entries.lock();
            entries
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::runtime(format!("dict doesn't contain key '{key}'"), span))
        }
        Value::Str(s) => {
            let idx = eval_value(index, ctx)?.as_int(index.span)?;
            let chars: Vec<char> = s.chars().collect();
            if idx < 0 || idx as usize >= chars.len() {
                return Err(Error::runtime(
                    format!(
                        "index out of bounds: tried to get '{}' in str with length of '{}' chars",
                        idx,
                        chars.len()
                    ),
                    span,
                ));
            }
            Ok(Value::Str(chars[idx as usize].to_string()))
        }
        other => Err(Error::runtime(
            format!("type '{}' can't be indexed", other.type_name()),
            span,
        )),
    }
}

fn index_set(
    target: &Spanned<Expr>,
    index: &Spanned<Expr>,
    value: Value,
    span: Span,
    ctx: &mut ExecCtx,
) -> Result<()> {
    let receiver = eval_value(target, ctx)?;
    match &receiver {
        Value::List(items) => {
            let idx = eval_value(index, ctx)?.as_int(index.span)?;
            let mut items = items.lock();
            let len = items.len();
            let pos = resolve_index(idx, len, span)?;
            items[pos] = value;
            Ok(())
        }
        Value::Dict(entries) => {
            let key = eval_value(index, ctx)?.as_string();
            entries.lock().insert(key, value);
            Ok(())
        }
        other => Err(Error::runtime(
            format!("type '{}' can't be indexed", other.type_name()),
            span,
        )),
    }
}

/// The explicit cast table. Unions are rejected outright; everything casts
/// to `str` through its display form.
fn cast(value: Value, ty: &Type, span: Span) -> Result<Value> {
    let source = value.type_name();
    let unsupported = |target: &str| {
        Err(Error::type_error(
            format!("cast {source} -> {target} unsupported"),
            span,
        ))
    };

    let target = match ty {
        Type::Simple(name) => name.as_str(),
        other => return unsupported(&other.name()),
    };

    let numeric = matches!(
        value,
        Value::Int(_) | Value::Float(_) | Value::Double(_) | Value::Decimal(_)
    );

    match target {
        "int" => match &value {
            Value::Str(s) => s.trim().parse::<i32>().map(Value::Int).or_else(|_| unsupported(target)),
            _ if numeric => Value::narrow(value.as_number(span)?, "int", span),
            Value::Null => Err(Error::runtime("is null", span)),
            _ => unsupported(target),
        },
        "float" => match &value {
            Value::Str(s) => s.trim().parse::<f32>().map(Value::Float).or_else(|_| unsupported(target)),
            _ if numeric => Value::narrow(value.as_number(span)?, "float", span),
            Value::Null => Err(Error::runtime("is null", span)),
            _ => unsupported(target),
        },
        "double" => match &value {
            Value::Str(s) => s.trim().parse::<f64>().map(Value::Double).or_else(|_| unsupported(target)),
            _ if numeric => Value::narrow(value.as_number(span)?, "double", span),
            Value::Null => Err(Error::runtime("is null", span)),
            _ => unsupported(target),
        },
        "decimal" => match &value {
            Value::Str(s) => Decimal::from_str(s.trim()).map(Value::Decimal).or_else(|_| unsupported(target)),
            _ if numeric => Ok(Value::Decimal(value.as_number(span)?)),
            Value::Null => Err(Error::runtime("is null", span)),
            _ => unsupported(target),
        },
        "bool" => match &value {
            Value::Bool(_) => Ok(value),
            Value::Str(s) => s.trim().parse::<bool>().map(Value::Bool).or_else(|_| unsupported(target)),
            _ if numeric => Ok(Value::Bool(!value.as_number(span)?.is_zero())),
            Value::Null => Err(Error::runtime("is null", span)),
            _ => unsupported(target),
        },
        "str" => Ok(Value::Str(value.as_string())),
        "list" => match &value {
            Value::Str(s) => Ok(Value::list(
                s.chars().map(|c| Value::Str(c.to_string())).collect(),
            )),
            _ => unsupported(target),
        },
        "callable" => match &value {
            Value::Callable(_) => Ok(value),
            Value::Null => Err(Error::runtime("is null", span)),
            _ => unsupported(target),
        },
        _ => unsupported(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ctx::StateRef;
    use crate::interp::scope::ScopeRef;

    /// Parse and evaluate a source string as a module body, returning the
    /// last expression's value.
    fn run(source: &str) -> Result<Value> {
        let state = StateRef::new();
        let file = state.add_source("test.dash", source);
        let tokens = tokenize(source, file)?;
        let mut parser = Parser::new(file, tokens, state.clone());
        let exprs = parser.parse_everything()?;
        let mut ctx = ExecCtx::new(ScopeRef::root(), state);
        let mut last = Value::Null;
        for expr in &exprs {
            last = expect_value(eval(expr, &mut ctx)?, expr.span)?;
        }
        Ok(last)
    }

    fn run_ok(source: &str) -> Value {
        match run(source) {
            Ok(value) => value,
            Err(err) => panic!("eval failed for {source:?}: {err}"),
        }
    }

    // ---- arithmetic and numeric kinds ----

    #[test]
    fn test_left_operand_kind_wins() {
        // narrowing truncates, it does not promote to double
        assert_eq!(run_ok("2 + 3.5"), Value::Int(5));
        assert_eq!(run_ok("3.5 + 2"), Value::Double(5.5));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(run_ok("1 + 2 * 3"), Value::Int(7));
        assert_eq!(run_ok("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(run_ok("10 - 3 - 2"), Value::Int(5));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(run("1 / 0").is_err());
        assert!(run("1 % 0").is_err());
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(run_ok("-5"), Value::Int(-5));
        assert_eq!(run_ok("-5 + 2"), Value::Int(-3));
    }

    // ---- bindings and scoping ----

    #[test]
    fn test_let_and_read() {
        assert_eq!(run_ok("let x = 41; x + 1"), Value::Int(42));
    }

    #[test]
    fn test_redeclaration_fails() {
        assert!(run("let x = 1; let x = 2").is_err());
    }

    #[test]
    fn test_reassign_unbound_fails() {
        assert!(run("y = 1").is_err());
    }

    #[test]
    fn test_let_type_annotation() {
        assert_eq!(run_ok("let x: int = 3; x"), Value::Int(3));
        assert!(run("let x: int = \"s\"").is_err());
    }

    #[test]
    fn test_branch_bindings_do_not_leak() {
        assert!(run("if true then { let q = 1; q }; q").is_err());
    }

    #[test]
    fn test_condition_bindings_visible_in_branch() {
        assert_eq!(run_ok("if (let t = 5) > 1 then t else 0"), Value::Int(5));
    }

    #[test]
    fn test_if_without_else_is_null() {
        assert_eq!(run_ok("if false then 1"), Value::Null);
    }

    #[test]
    fn test_block_value_is_last_child() {
        assert_eq!(run_ok("{ 1; 2; 3 }"), Value::Int(3));
        assert_eq!(run_ok("{ }"), Value::Null);
    }

    // ---- functions and closures ----

    #[test]
    fn test_function_call() {
        assert_eq!(run_ok("fun add(a: int, b: int): int { a + b }; add(2, 3)"), Value::Int(5));
    }

    #[test]
    fn test_lambda() {
        assert_eq!(run_ok("let double = fun(x) x * 2; double(21)"), Value::Int(42));
    }

    #[test]
    fn test_closure_captures_by_reference() {
        // Mutation after the literal is created is visible inside the body
        assert_eq!(run_ok("let x = 1; let f = fun() x; x = 2; f()"), Value::Int(2));
    }

    #[test]
    fn test_self_recursion() {
        assert_eq!(
            run_ok("let fact = fun(n: int): int { if n <= 1 then 1 else n * self(n - 1) }; fact(5)"),
            Value::Int(120)
        );
    }

    #[test]
    fn test_return_unwraps_at_function_boundary() {
        assert_eq!(
            run_ok("fun f(): int { return 7; 99 }; f()"),
            Value::Int(7)
        );
    }

    #[test]
    fn test_return_type_checked() {
        assert!(run("fun f(): int { \"s\" }; f()").is_err());
    }

    #[test]
    fn test_wrong_argument_type() {
        assert!(run("fun f(x: int) x; f(\"s\")").is_err());
    }

    #[test]
    fn test_arity_mismatch_is_fatal() {
        assert!(run("fun f(x) x; f(1, 2)").is_err());
    }

    #[test]
    fn test_function_composition() {
        // f + g runs f's body then g's and returns g's result
        assert_eq!(
            run_ok("let f = fun() 1; let g = fun() 2; let h = f + g; h()"),
            Value::Int(2)
        );
    }

    #[test]
    fn test_composition_return_type_is_rights() {
        assert!(run("let f = fun(): int 1; let g = fun(): str \"s\"; let h = f + g; h() is str").is_ok());
        assert_eq!(
            run_ok("let f = fun(): int 1; let g = fun(): str \"s\"; (f + g)() is str"),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_predicate_parameter() {
        let src = "let f = fun(x: predicate(self > 2)): int { x }; f(3)";
        assert_eq!(run_ok(src), Value::Int(3));
        assert!(run("let f = fun(x: predicate(self > 2)): int { x }; f(1)").is_err());
    }

    // ---- structs ----

    #[test]
    fn test_struct_construction_and_fields() {
        let src = "struct Point(x: int, y: int); let p = Point(1, 2); p.y = 5; p.x + p.y";
        assert_eq!(run_ok(src), Value::Int(6));
    }

    #[test]
    fn test_struct_field_type_checked() {
        assert!(run("struct P(x: int); let p = P(1); p.x = \"s\"").is_err());
    }

    #[test]
    fn test_struct_compatibility_both_directions() {
        assert_eq!(
            run_ok("struct A(); struct B(): A; let b: A = B(); b is A"),
            Value::Bool(true)
        );
        assert!(run("struct A(); struct B(): A; let a: B = A()").is_err());
    }

    #[test]
    fn test_struct_constructor_arg_types() {
        assert!(run("struct P(x: int); P(\"s\")").is_err());
    }

    #[test]
    fn test_callable_struct_first_field() {
        let src = "struct Op(run: callable, tag: int); \
                   let o = Op(fun() 42, 0); o()";
        assert_eq!(run_ok(src), Value::Int(42));
    }

    #[test]
    fn test_callable_struct_rejects_non_callable_first_field() {
        assert!(run("struct Op(tag: int, run: callable); let o = Op(0, fun() 1); o()").is_err());
    }

    // ---- indexing ----

    #[test]
    fn test_list_indexing_with_negatives() {
        assert_eq!(run_ok("let l = [1, 2, 3]; l[0]"), Value::Int(1));
        assert_eq!(run_ok("let l = [1, 2, 3]; l[-1]"), Value::Int(3));
        assert_eq!(run_ok("let l = [1, 2, 3]; l[-3]"), Value::Int(1));
        assert!(run("let l = [1, 2, 3]; l[-4]").is_err());
        assert!(run("let l = [1, 2, 3]; l[3]").is_err());
    }

    #[test]
    fn test_list_index_write() {
        assert_eq!(run_ok("let l = [1, 2]; l[1] = 9; l[1]"), Value::Int(9));
        assert_eq!(run_ok("let l = [1, 2]; l[-1] = 9; l[1]"), Value::Int(9));
    }

    #[test]
    fn test_dict_literal_and_indexing() {
        assert_eq!(run_ok("let d = dict { \"a\": 1 }; d[\"a\"]"), Value::Int(1));
        assert!(run("let d = dict { \"a\": 1 }; d[\"b\"]").is_err());
        assert_eq!(run_ok("let d = dict { \"a\": 1 }; d[\"b\"] = 2; d[\"b\"]"), Value::Int(2));
    }

    #[test]
    fn test_string_indexing() {
        assert_eq!(run_ok("\"abc\"[1]"), Value::Str("b".to_string()));
        assert!(run("\"abc\"[3]").is_err());
        // strings are not writable through an index
        assert!(run("let s = \"abc\"; s[0] = \"z\"").is_err());
    }

    #[test]
    fn test_not_indexable() {
        assert!(run("5[0]").is_err());
    }

    // ---- list + aliasing ----

    #[test]
    fn test_list_plus_aliases_left() {
        assert_eq!(run_ok("let a = [1]; let b = a + [2]; a[1]"), Value::Int(2));
        // and the result is the same storage
        assert_eq!(run_ok("let a = [1]; let b = a + [2]; a == b"), Value::Bool(true));
    }

    // ---- logic ----

    #[test]
    fn test_logical_both_sides_always_evaluated() {
        let src = "let x = 1; let f = fun(): bool { x = 9; true }; false && f(); x";
        assert_eq!(run_ok(src), Value::Int(9));
    }

    // ---- casts and type tests ----

    #[test]
    fn test_numeric_casts_truncate() {
        assert_eq!(run_ok("3.9 as int"), Value::Int(3));
        assert_eq!(run_ok("3 as double"), Value::Double(3.0));
    }

    #[test]
    fn test_string_casts() {
        assert_eq!(run_ok("\"42\" as int"), Value::Int(42));
        assert_eq!(run_ok("5 as str"), Value::Str("5".to_string()));
        assert!(run("\"nope\" as int").is_err());
    }

    #[test]
    fn test_str_to_list_cast() {
        assert_eq!(run_ok("(\"ab\" as list)[1]"), Value::Str("b".to_string()));
    }

    #[test]
    fn test_union_cast_rejected() {
        assert!(run("5 as int|str").is_err());
    }

    #[test]
    fn test_is_operator() {
        assert_eq!(run_ok("5 is int"), Value::Bool(true));
        assert_eq!(run_ok("5 is str"), Value::Bool(false));
        assert_eq!(run_ok("5 is int|str"), Value::Bool(true));
        assert_eq!(run_ok("5 is !str"), Value::Bool(true));
        assert_eq!(run_ok("null is null"), Value::Bool(true));
    }

    // ---- loops and control flow ----

    #[test]
    fn test_while_loop() {
        assert_eq!(run_ok("let i = 0; while i < 3 { i = i + 1 }; i"), Value::Int(3));
    }

    #[test]
    fn test_while_body_bindings_do_not_leak_between_iterations() {
        // a fresh body frame per iteration: the let would error otherwise
        assert_eq!(
            run_ok("let i = 0; while i < 3 { let t = i; i = t + 1 }; i"),
            Value::Int(3)
        );
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(
            run_ok("let s = 0; for (let i = 0; i < 4; i = i + 1) { s = s + i }; s"),
            Value::Int(6)
        );
    }

    #[test]
    fn test_foreach_loop() {
        assert_eq!(
            run_ok("let s = 0; foreach x in [1, 2, 3] { s = s + x }; s"),
            Value::Int(6)
        );
    }

    #[test]
    fn test_foreach_over_string() {
        assert_eq!(
            run_ok("let out = \"\"; foreach c in \"abc\" { out = out + c }; out"),
            Value::Str("abc".to_string())
        );
    }

    #[test]
    fn test_break_and_continue() {
        assert_eq!(
            run_ok("let s = 0; foreach x in [1, 2, 3, 4] { if x == 3 then break; s = s + x }; s"),
            Value::Int(3)
        );
        assert_eq!(
            run_ok("let s = 0; foreach x in [1, 2, 3] { if x == 2 then continue; s = s + x }; s"),
            Value::Int(4)
        );
    }

    #[test]
    fn test_loop_yields_null() {
        assert_eq!(run_ok("while false { 1 }"), Value::Null);
    }

    #[test]
    fn test_return_propagates_through_loop() {
        assert_eq!(
            run_ok("fun f(): int { foreach x in [1, 2, 3] { if x == 2 then return x }; 0 }; f()"),
            Value::Int(2)
        );
    }

    #[test]
    fn test_control_flow_outside_construct_is_fatal() {
        assert!(run("break").is_err());
        assert!(run("continue").is_err());
        assert!(run("return 1").is_err());
    }

    #[test]
    fn test_break_inside_function_called_from_loop_is_fatal() {
        // The function invocation starts a fresh trace; the loop marker of
        // the caller is not visible.
        assert!(run("let f = fun() break; while true { f() }").is_err());
    }

    // ---- ref cells ----

    #[test]
    fn test_ref_transparency_on_identifiers() {
        let src = "let x = 1; let r = ref x; r = 5; x";
        assert_eq!(run_ok(src), Value::Int(5));
        let src = "let x = 1; let r = ref x; x = 7; r";
        assert_eq!(run_ok(src), Value::Int(7));
    }

    #[test]
    fn test_ref_to_index() {
        let src = "let l = [1, 2]; let r = ref l[0]; r = 9; l[0]";
        assert_eq!(run_ok(src), Value::Int(9));
    }

    #[test]
    fn test_ref_requires_accessible_target() {
        assert!(run("ref (1 + 2)").is_err());
    }

    // ---- operator shadowing ----

    #[test]
    fn test_binary_operator_shadowing() {
        let src = "import reflection; \
                   reflection::bind(\"+\", fun(a: int, b: int): int { a * b }); \
                   3 + 4";
        assert_eq!(run_ok(src), Value::Int(12));
    }

    #[test]
    fn test_unary_operator_shadowing() {
        let src = "import reflection; \
                   reflection::bind(\"~\", fun(x: int): int { x + 1 }); \
                   ~41";
        assert_eq!(run_ok(src), Value::Int(42));
    }

    #[test]
    fn test_unary_shadow_does_not_hijack_binary() {
        // A one-argument binding shadows only the unary table; binary uses
        // of the same symbol still reach the builtin.
        let src = "import reflection; \
                   reflection::bind(\"-\", fun(x: int): int { x * 10 }); \
                   -5";
        assert_eq!(run_ok(src), Value::Int(50));
        let src = "import reflection; \
                   reflection::bind(\"-\", fun(x: int): int { x * 10 }); \
                   7 - 4";
        assert_eq!(run_ok(src), Value::Int(3));
    }

    // ---- exec ----

    #[test]
    fn test_exec_runs_in_current_context() {
        assert_eq!(run_ok("exec \"1 + 2\""), Value::Int(3));
        assert_eq!(run_ok("let x = 1; exec \"x = 40\"; x + 2"), Value::Int(42));
    }

    // ---- method-call sugar ----

    #[test]
    fn test_method_call_sugar() {
        let src = "fun add(a: int, b: int): int { a + b }; 40->add(2)";
        assert_eq!(run_ok(src), Value::Int(42));
    }

    #[test]
    fn test_method_call_sugar_with_module() {
        let src = "import str; \"hey\"->str::upper()";
        assert_eq!(run_ok(src), Value::Str("HEY".to_string()));
    }

    // ---- extension chains ----

    #[test]
    fn test_chained_extensions() {
        let src = "struct Box(items: list); \
                   let b = Box([fun(x) x + 1]); \
                   b.items[0](41)";
        assert_eq!(run_ok(src), Value::Int(42));
    }

    #[test]
    fn test_chained_assignment_target() {
        let src = "struct Box(items: list); let b = Box([1, 2]); b.items[0] = 9; b.items[0]";
        assert_eq!(run_ok(src), Value::Int(9));
    }

    // ---- null handling ----

    #[test]
    fn test_null_equality_is_fatal() {
        assert!(run("null == 1").is_err());
        assert!(run("let x = null; x == x").is_err());
    }

    #[test]
    fn test_void_discards_writes() {
        assert_eq!(run_ok("_ = 5; _"), Value::Null);
    }

    // ---- invocation errors ----

    #[test]
    fn test_invoking_non_callable_is_fatal() {
        assert!(run("let x = 5; x()").is_err());
    }

    // ---- recursion guard ----

    #[test]
    fn test_unbounded_recursion_becomes_diagnostic() {
        let err = run("let f = fun(): int { self() }; f()").unwrap_err();
        assert!(matches!(err, Error::StackOverflow { .. }));
    }
}
