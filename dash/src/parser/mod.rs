//! Parser
//!
//! A single left-to-right pass over the token stream driven by an explicit
//! operand stack. Each primary expression is followed by a uniform
//! "try extend" loop (field access, indexing, call, `->` method sugar,
//! `::` scoped access, assignment, `is`/`as`), repeated until nothing
//! matches, so chains like `a.b[0](x) = y` parse left to right.
//!
//! Binary operators are resolved against a priority table (lower binds
//! tighter; unknown operators get a default so user-defined symbols parse
//! without grammar changes). The right operand is parsed recursively and
//! the new operator rotated into place: tighter-or-equal operators are
//! pushed down the right subtree's left branch, which keeps equal-priority
//! chains left-associative. Parenthesized groups are opaque wrapper nodes,
//! so rotation never reaches inside them.
//!
//! `import` is resolved while parsing: the parser owns a handle to the
//! shared interpreter state and registers modules as it encounters them,
//! which is why module files execute at import time.

use crate::ast::{Expr, FileId, Literal, MaskEntry, Span, Spanned};
use crate::error::{Error, Result};
use crate::interp::StateRef;
use crate::lexer::Token;
use crate::stdlib;
use crate::types::Type;
use std::sync::Arc;

fn priority(op: &str) -> u8 {
    match op {
        "*" | "/" | "%" => 5,
        "+" | "-" => 6,
        "<" | ">" | "<=" | ">=" => 8,
        "==" | "!=" => 9,
        "&&" => 13,
        "||" => 14,
        // user-defined operators
        _ => 10,
    }
}

/// Rotate a freshly seen operator into an already-parsed right operand.
/// A tighter-or-equal operator descends the right subtree's left branch;
/// a looser one wraps the whole subtree.
fn attach(op: &str, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    if let Expr::Binary { op: rhs_op, left, right } = rhs.node {
        if priority(op) <= priority(&rhs_op) {
            let rotated = attach(op, lhs, *left);
            let span = rotated.span.merge(right.span);
            return Spanned::new(
                Expr::Binary { op: rhs_op, left: Box::new(rotated), right },
                span,
            );
        }
        let rhs = Spanned::new(Expr::Binary { op: rhs_op, left, right }, rhs.span);
        let span = lhs.span.merge(rhs.span);
        return Spanned::new(
            Expr::Binary { op: op.to_string(), left: Box::new(lhs), right: Box::new(rhs) },
            span,
        );
    }
    let span = lhs.span.merge(rhs.span);
    Spanned::new(
        Expr::Binary { op: op.to_string(), left: Box::new(lhs), right: Box::new(rhs) },
        span,
    )
}

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    idx: usize,
    file: FileId,
    state: StateRef,
    stack: Vec<Spanned<Expr>>,
    module_name: String,
}

impl Parser {
    pub fn new(file: FileId, tokens: Vec<(Token, Span)>, state: StateRef) -> Self {
        Parser {
            tokens,
            idx: 0,
            file,
            state,
            stack: Vec::new(),
            module_name: "main".to_string(),
        }
    }

    /// Declared module name (`module name;`), or the default.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Default used when the source has no `module` header (file imports
    /// pass the file stem).
    pub fn set_default_module_name(&mut self, name: &str) {
        self.module_name = name.to_string();
    }

    /// Parse the whole token stream as a module body.
    pub fn parse_everything(&mut self) -> Result<Vec<Spanned<Expr>>> {
        let mut out = Vec::new();
        self.skip_semis();
        while !self.at_end() {
            self.parse_any()?;
            if let Some(expr) = self.stack.pop() {
                out.push(expr);
            }
            self.skip_semis();
        }
        Ok(out)
    }

    /// Parse one expression onto the operand stack (REPL entry).
    pub fn parse_any(&mut self) -> Result<()> {
        let expr = self.parse_expr()?;
        self.stack.push(expr);
        Ok(())
    }

    /// Pop the most recently parsed expression off the operand stack.
    pub fn take(&mut self) -> Option<Spanned<Expr>> {
        self.stack.pop()
    }

    // ---- token cursor ----

    fn at_end(&self) -> bool {
        self.idx >= self.tokens.len()
    }

    fn peek(&self) -> Option<&(Token, Span)> {
        self.tokens.get(self.idx)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let entry = self.tokens.get(self.idx).cloned();
        if entry.is_some() {
            self.idx += 1;
        }
        entry
    }

    fn eof_span(&self) -> Span {
        self.tokens
            .last()
            .map(|(_, s)| *s)
            .unwrap_or_else(|| Span::synthetic(self.file))
    }

    fn check(&self, token: &Token) -> bool {
        self.peek_token() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn eat_spanned(&mut self, token: &Token) -> Option<Span> {
        if self.check(token) {
            let span = self.tokens[self.idx].1;
            self.idx += 1;
            Some(span)
        } else {
            None
        }
    }

    fn eat_op(&mut self, sym: &str) -> bool {
        match self.peek_token() {
            Some(Token::Op(s)) if s == sym => {
                self.idx += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, expected: Token, desc: &str) -> Result<Span> {
        match self.advance() {
            Some((token, span)) if token == expected => Ok(span),
            Some((token, span)) => Err(Error::parser(
                format!("expected {desc}, got {}", token.describe()),
                span,
            )),
            None => Err(Error::parser(
                format!("expected {desc}, got nothing"),
                self.eof_span(),
            )),
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span)> {
        match self.advance() {
            Some((Token::Ident(name), span)) => Ok((name, span)),
            Some((token, span)) => Err(Error::parser(
                format!("expected identifier, got {}", token.describe()),
                span,
            )),
            None => Err(Error::parser(
                "expected identifier, got nothing",
                self.eof_span(),
            )),
        }
    }

    fn skip_semis(&mut self) {
        while self.eat(&Token::Semi) {}
    }

    fn pop(&mut self, span: Span) -> Result<Spanned<Expr>> {
        self.stack
            .pop()
            .ok_or_else(|| Error::parser("operand stack empty", span))
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> Result<Spanned<Expr>> {
        self.parse_primary()?;
        self.extend()?;

        if let Some(op) = self.peek_binary_op() {
            self.idx += 1;
            let rhs = self.parse_expr()?;
            let lhs = self.pop(rhs.span)?;
            self.stack.push(attach(&op, lhs, rhs));
        }

        let span = self.eof_span();
        self.pop(span)
    }

    fn peek_binary_op(&self) -> Option<String> {
        match self.peek_token() {
            Some(Token::Op(sym)) => match sym.as_str() {
                "=" | "." | "::" | "->" => None,
                _ => Some(sym.clone()),
            },
            _ => None,
        }
    }

    /// The uniform extension loop, attempted in fixed priority order until
    /// nothing matches.
    fn extend(&mut self) -> Result<()> {
        loop {
            let Some((token, span)) = self.peek().cloned() else {
                return Ok(());
            };
            match token {
                Token::Op(sym) if sym == "." => {
                    self.idx += 1;
                    let (name, name_span) = self.expect_ident()?;
                    let target = self.pop(span)?;
                    let full = target.span.merge(name_span);
                    self.stack.push(Spanned::new(
                        Expr::Field { target: Box::new(target), name },
                        full,
                    ));
                }
                Token::LBracket => {
                    self.idx += 1;
                    let index = self.parse_expr()?;
                    let end = self.expect(Token::RBracket, "']'")?;
                    let target = self.pop(span)?;
                    let full = target.span.merge(end);
                    self.stack.push(Spanned::new(
                        Expr::Index { target: Box::new(target), index: Box::new(index) },
                        full,
                    ));
                }
                Token::LParen => {
                    self.idx += 1;
                    let (args, end) = self.parse_call_args()?;
                    let callee = self.pop(span)?;
                    let full = callee.span.merge(end);
                    self.stack.push(Spanned::new(
                        Expr::Invoke { callee: Box::new(callee), args },
                        full,
                    ));
                }
                Token::Op(sym) if sym == "->" => {
                    self.idx += 1;
                    self.parse_method_sugar(span)?;
                }
                Token::Op(sym) if sym == "::" => {
                    let module = match self.stack.last().map(|s| &s.node) {
                        Some(Expr::Ident(name)) => name.clone(),
                        _ => return Ok(()),
                    };
                    self.idx += 1;
                    let (name, name_span) = self.expect_ident()?;
                    let target = self.pop(span)?;
                    let full = target.span.merge(name_span);
                    self.stack
                        .push(Spanned::new(Expr::Scoped { module, name }, full));
                }
                Token::Op(sym) if sym == "=" => {
                    self.idx += 1;
                    let value = self.parse_expr()?;
                    let target = self.pop(span)?;
                    let full = target.span.merge(value.span);
                    self.stack.push(Spanned::new(
                        Expr::Assign { target: Box::new(target), value: Box::new(value) },
                        full,
                    ));
                }
                Token::Is => {
                    self.idx += 1;
                    let ty = self.parse_type()?;
                    let value = self.pop(span)?;
                    let full = value.span.merge(span);
                    self.stack.push(Spanned::new(
                        Expr::TypeTest { value: Box::new(value), ty },
                        full,
                    ));
                }
                Token::As => {
                    self.idx += 1;
                    let ty = self.parse_type()?;
                    let value = self.pop(span)?;
                    let full = value.span.merge(span);
                    self.stack
                        .push(Spanned::new(Expr::Cast { value: Box::new(value), ty }, full));
                }
                _ => return Ok(()),
            }
        }
    }

    /// `recv->f(args)` / `recv->mod::f(args)`: the receiver becomes the
    /// first argument of the immediately following call.
    fn parse_method_sugar(&mut self, span: Span) -> Result<()> {
        let (name, name_span) = self.expect_ident()?;
        let callee = if self.eat_op("::") {
            let (fn_name, fn_span) = self.expect_ident()?;
            Spanned::new(
                Expr::Scoped { module: name, name: fn_name },
                name_span.merge(fn_span),
            )
        } else {
            Spanned::new(Expr::Ident(name), name_span)
        };
        self.expect(Token::LParen, "'('")?;
        let (mut args, end) = self.parse_call_args()?;
        let recv = self.pop(span)?;
        let full = recv.span.merge(end);
        args.insert(0, recv);
        self.stack.push(Spanned::new(
            Expr::Invoke { callee: Box::new(callee), args },
            full,
        ));
        Ok(())
    }

    /// Arguments after a consumed `(`; returns them with the `)` span.
    fn parse_call_args(&mut self) -> Result<(Vec<Spanned<Expr>>, Span)> {
        let mut args = Vec::new();
        if let Some(end) = self.eat_spanned(&Token::RParen) {
            return Ok((args, end));
        }
        loop {
            args.push(self.parse_expr()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            let end = self.expect(Token::RParen, "')'")?;
            return Ok((args, end));
        }
    }

    fn parse_primary(&mut self) -> Result<()> {
        let Some((token, span)) = self.advance() else {
            return Err(Error::parser(
                "expected expression, got nothing",
                self.eof_span(),
            ));
        };

        let expr = match token {
            Token::IntLit(n) => Spanned::new(Expr::Literal(Literal::Int(n)), span),
            Token::FloatLit(x) => Spanned::new(Expr::Literal(Literal::Float(x)), span),
            Token::DoubleLit(x) => Spanned::new(Expr::Literal(Literal::Double(x)), span),
            Token::DecimalLit(d) => Spanned::new(Expr::Literal(Literal::Decimal(d)), span),
            Token::StrLit(s) => Spanned::new(Expr::Literal(Literal::Str(s)), span),
            Token::True => Spanned::new(Expr::Literal(Literal::Bool(true)), span),
            Token::False => Spanned::new(Expr::Literal(Literal::Bool(false)), span),
            Token::Null => Spanned::new(Expr::Literal(Literal::Null), span),
            Token::Underscore => Spanned::new(Expr::Void, span),
            Token::Ident(name) => Spanned::new(Expr::Ident(name), span),

            Token::LParen => {
                let inner = self.parse_expr()?;
                let end = self.expect(Token::RParen, "')'")?;
                Spanned::new(Expr::Group(Box::new(inner)), span.merge(end))
            }

            Token::LBrace => {
                let (children, end) = self.parse_block_children()?;
                Spanned::new(Expr::Block(children), span.merge(end))
            }

            Token::LBracket => {
                let mut items = Vec::new();
                let end = if let Some(end) = self.eat_spanned(&Token::RBracket) {
                    end
                } else {
                    loop {
                        items.push(self.parse_expr()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        break self.expect(Token::RBracket, "']'")?;
                    }
                };
                Spanned::new(Expr::List(items), span.merge(end))
            }

            Token::Dict => {
                self.expect(Token::LBrace, "'{'")?;
                let mut entries = Vec::new();
                let end = if let Some(end) = self.eat_spanned(&Token::RBrace) {
                    end
                } else {
                    loop {
                        let key = match self.advance() {
                            Some((Token::StrLit(key), _)) => key,
                            Some((Token::Ident(key), _)) => key,
                            Some((t, s)) => {
                                return Err(Error::parser(
                                    format!("expected dict key, got {}", t.describe()),
                                    s,
                                ));
                            }
                            None => {
                                return Err(Error::parser(
                                    "expected dict key, got nothing",
                                    self.eof_span(),
                                ));
                            }
                        };
                        if !self.eat_op(":") {
                            return Err(Error::parser("expected ':' after dict key", span));
                        }
                        entries.push((key, self.parse_expr()?));
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        break self.expect(Token::RBrace, "'}'")?;
                    }
                };
                Spanned::new(Expr::Dict(entries), span.merge(end))
            }

            Token::If => {
                let cond = self.parse_expr()?;
                let then_branch = if self.eat(&Token::Then) || self.check(&Token::LBrace) {
                    self.parse_expr()?
                } else {
                    return Err(Error::parser(
                        "expected 'then' or block after if condition",
                        cond.span,
                    ));
                };
                let else_branch = if self.eat(&Token::Else) {
                    Some(Box::new(self.parse_expr()?))
                } else {
                    None
                };
                let full = span.merge(
                    else_branch
                        .as_ref()
                        .map(|e| e.span)
                        .unwrap_or(then_branch.span),
                );
                Spanned::new(
                    Expr::If {
                        cond: Box::new(cond),
                        then_branch: Box::new(then_branch),
                        else_branch,
                    },
                    full,
                )
            }

            Token::Let => {
                let (name, _) = self.expect_ident()?;
                let ty = if self.eat_op(":") { self.parse_type()? } else { Type::Any };
                if !self.eat_op("=") {
                    return Err(Error::parser("expected '=' in let binding", span));
                }
                let value = self.parse_expr()?;
                let full = span.merge(value.span);
                Spanned::new(Expr::Let { name, ty, value: Box::new(value) }, full)
            }

            Token::Fun => {
                let name = match self.peek_token() {
                    Some(Token::Ident(_)) => Some(self.expect_ident()?.0),
                    _ => None,
                };
                self.expect(Token::LParen, "'('")?;
                let params = self.parse_mask()?;
                let ret = if self.eat_op(":") { self.parse_type()? } else { Type::Any };
                let body = self.parse_fn_body()?;
                let full = span.merge(body.span);
                let body = Arc::new(body);
                match name {
                    Some(name) => Spanned::new(Expr::Function { name, params, ret, body }, full),
                    None => Spanned::new(Expr::Lambda { params, ret, body }, full),
                }
            }

            Token::Struct => {
                let (name, _) = self.expect_ident()?;
                self.expect(Token::LParen, "'('")?;
                let fields = self.parse_mask()?;
                let mut inherited = Vec::new();
                if self.eat_op(":") {
                    loop {
                        inherited.push(self.expect_ident()?.0);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                Spanned::new(Expr::StructDecl { name, fields, inherited }, span)
            }

            Token::While => {
                let cond = self.parse_expr()?;
                let body = self.parse_expr()?;
                let full = span.merge(body.span);
                Spanned::new(
                    Expr::While { cond: Box::new(cond), body: Box::new(body) },
                    full,
                )
            }

            Token::For => {
                self.expect(Token::LParen, "'('")?;
                let init = self.parse_expr()?;
                self.expect(Token::Semi, "';'")?;
                let cond = self.parse_expr()?;
                self.expect(Token::Semi, "';'")?;
                let step = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                let body = self.parse_expr()?;
                let full = span.merge(body.span);
                Spanned::new(
                    Expr::For {
                        init: Box::new(init),
                        cond: Box::new(cond),
                        step: Box::new(step),
                        body: Box::new(body),
                    },
                    full,
                )
            }

            Token::Foreach => {
                let (var, _) = self.expect_ident()?;
                self.expect(Token::In, "'in'")?;
                let iter = self.parse_expr()?;
                let body = self.parse_expr()?;
                let full = span.merge(body.span);
                Spanned::new(
                    Expr::Foreach { var, iter: Box::new(iter), body: Box::new(body) },
                    full,
                )
            }

            Token::Return => {
                let inner = if self.at_end() || self.check(&Token::Semi) || self.check(&Token::RBrace)
                {
                    Spanned::new(Expr::Literal(Literal::Null), span)
                } else {
                    self.parse_expr()?
                };
                let full = span.merge(inner.span);
                Spanned::new(Expr::Return(Box::new(inner)), full)
            }

            Token::Break => Spanned::new(Expr::Break, span),
            Token::Continue => Spanned::new(Expr::Continue, span),

            Token::Ref => {
                self.parse_primary()?;
                self.extend()?;
                let target = self.pop(span)?;
                let full = span.merge(target.span);
                Spanned::new(Expr::Ref(Arc::new(target)), full)
            }

            Token::Exec => {
                let source = self.parse_expr()?;
                let full = span.merge(source.span);
                Spanned::new(Expr::Exec(Box::new(source)), full)
            }

            Token::Import => {
                let (name, name_span) = match self.advance() {
                    Some((Token::Ident(name), s)) | Some((Token::StrLit(name), s)) => (name, s),
                    Some((t, s)) => {
                        return Err(Error::parser(
                            format!("expected module name, got {}", t.describe()),
                            s,
                        ));
                    }
                    None => {
                        return Err(Error::parser(
                            "expected module name, got nothing",
                            self.eof_span(),
                        ));
                    }
                };
                stdlib::provide(&name, &self.state, name_span)?;
                Spanned::new(Expr::Literal(Literal::Null), span.merge(name_span))
            }

            Token::Module => {
                let (name, name_span) = self.expect_ident()?;
                self.module_name = name;
                Spanned::new(Expr::Literal(Literal::Null), span.merge(name_span))
            }

            // Any operator in primary position is a unary operator; its
            // operand is a primary with extensions, never a binary chain.
            Token::Op(sym) => {
                self.parse_primary()?;
                self.extend()?;
                let operand = self.pop(span)?;
                let full = span.merge(operand.span);
                Spanned::new(Expr::Unary { op: sym, expr: Box::new(operand) }, full)
            }

            other => {
                return Err(Error::parser(
                    format!("expected expression, got {}", other.describe()),
                    span,
                ));
            }
        };

        self.stack.push(expr);
        Ok(())
    }

    /// Children of a `{`...`}` region; the `{` is already consumed.
    fn parse_block_children(&mut self) -> Result<(Vec<Spanned<Expr>>, Span)> {
        let mut children = Vec::new();
        self.skip_semis();
        loop {
            if let Some(end) = self.eat_spanned(&Token::RBrace) {
                return Ok((children, end));
            }
            if self.at_end() {
                return Err(Error::parser("expected '}', got nothing", self.eof_span()));
            }
            children.push(self.parse_expr()?);
            self.skip_semis();
        }
    }

    /// Function bodies are unscoped sequences: they run directly in the
    /// invocation frame.
    fn parse_fn_body(&mut self) -> Result<Spanned<Expr>> {
        if let Some(start) = self.eat_spanned(&Token::LBrace) {
            let (children, end) = self.parse_block_children()?;
            Ok(Spanned::new(Expr::Seq(children), start.merge(end)))
        } else {
            self.parse_expr()
        }
    }

    /// Parameter or struct-field mask after a consumed `(`.
    fn parse_mask(&mut self) -> Result<Vec<MaskEntry>> {
        let mut entries = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(entries);
        }
        loop {
            let (name, _) = self.expect_ident()?;
            let ty = if self.eat_op(":") { self.parse_type()? } else { Type::Any };
            entries.push(MaskEntry { name, ty });
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen, "')'")?;
            return Ok(entries);
        }
    }

    // ---- types ----

    fn parse_type(&mut self) -> Result<Type> {
        let mut left = self.parse_type_and()?;
        while self.eat_op("|") {
            let right = self.parse_type_and()?;
            left = Type::Either(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_type_and(&mut self) -> Result<Type> {
        let mut left = self.parse_type_atom()?;
        while self.eat_op("&") {
            let right = self.parse_type_atom()?;
            left = Type::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_type_atom(&mut self) -> Result<Type> {
        match self.advance() {
            Some((Token::Op(sym), _)) if sym == "!" => {
                Ok(Type::Not(Box::new(self.parse_type_atom()?)))
            }
            Some((Token::Underscore, _)) => Ok(Type::Any),
            Some((Token::Ident(name), _)) => Ok(Type::Simple(name)),
            Some((Token::Null, _)) => Ok(Type::simple("null")),
            Some((Token::Dict, _)) => Ok(Type::simple("dict")),
            Some((Token::Ref, _)) => Ok(Type::simple("ref")),
            Some((Token::Predicate, _)) => {
                self.expect(Token::LParen, "'('")?;
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(Type::Predicate(Arc::new(expr)))
            }
            Some((token, span)) => Err(Error::parser(
                format!("expected type, got {}", token.describe()),
                span,
            )),
            None => Err(Error::parser("expected type, got nothing", self.eof_span())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_one(source: &str) -> Spanned<Expr> {
        let state = StateRef::new();
        let file = state.add_source("test.dash", source);
        let tokens = tokenize(source, file).unwrap();
        let mut parser = Parser::new(file, tokens, state);
        parser.parse_any().unwrap();
        parser.take().unwrap()
    }

    /// Render the operator shape of a parsed tree, parenthesizing every
    /// binary node.
    fn shape(expr: &Spanned<Expr>) -> String {
        match &expr.node {
            Expr::Binary { op, left, right } => {
                format!("({} {} {})", shape(left), op, shape(right))
            }
            Expr::Group(inner) => format!("[{}]", shape(inner)),
            Expr::Literal(Literal::Int(n)) => n.to_string(),
            Expr::Ident(name) => name.clone(),
            Expr::Unary { op, expr } => format!("({op}{})", shape(expr)),
            other => format!("{other:?}"),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        assert_eq!(shape(&parse_one("a + b * c")), "(a + (b * c))");
        assert_eq!(shape(&parse_one("a * b + c")), "((a * b) + c)");
    }

    #[test]
    fn test_equal_priority_is_left_associative() {
        assert_eq!(shape(&parse_one("a - b - c")), "((a - b) - c)");
        assert_eq!(shape(&parse_one("a - b - c - d")), "(((a - b) - c) - d)");
    }

    #[test]
    fn test_groups_are_opaque_to_rotation() {
        assert_eq!(shape(&parse_one("(a + b) * c")), "([(a + b)] * c)");
        assert_eq!(shape(&parse_one("a * (b + c)")), "(a * [(b + c)])");
    }

    #[test]
    fn test_comparison_looser_than_arithmetic() {
        assert_eq!(shape(&parse_one("a + b < c * d")), "((a + b) < (c * d))");
    }

    #[test]
    fn test_logical_loosest() {
        assert_eq!(
            shape(&parse_one("a == b && c == d")),
            "((a == b) && (c == d))"
        );
        assert_eq!(
            shape(&parse_one("a && b || c")),
            "((a && b) || c)"
        );
    }

    #[test]
    fn test_unknown_operator_gets_default_priority() {
        // default 10: tighter than &&, looser than ==
        assert_eq!(shape(&parse_one("a <> b && c")), "((a <> b) && c)");
        assert_eq!(shape(&parse_one("a + b <> c")), "((a + b) <> c)");
    }

    #[test]
    fn test_unary_binds_before_binary() {
        assert_eq!(shape(&parse_one("-a + b")), "((-a) + b)");
        assert_eq!(shape(&parse_one("!a && b")), "((!a) && b)");
    }

    #[test]
    fn test_extension_chain_left_to_right() {
        let expr = parse_one("a.b[0](x) = y");
        let Expr::Assign { target, .. } = &expr.node else {
            panic!("expected assignment at the root");
        };
        let Expr::Invoke { callee, .. } = &target.node else {
            panic!("expected call under assignment");
        };
        let Expr::Index { target: indexed, .. } = &callee.node else {
            panic!("expected index under call");
        };
        assert!(matches!(&indexed.node, Expr::Field { .. }));
    }

    #[test]
    fn test_method_sugar_inserts_receiver() {
        let expr = parse_one("recv->f(1, 2)");
        let Expr::Invoke { callee, args } = &expr.node else {
            panic!("expected call");
        };
        assert!(matches!(&callee.node, Expr::Ident(name) if name == "f"));
        assert_eq!(args.len(), 3);
        assert!(matches!(&args[0].node, Expr::Ident(name) if name == "recv"));
    }

    #[test]
    fn test_scoped_access() {
        let expr = parse_one("console::println");
        assert!(matches!(
            &expr.node,
            Expr::Scoped { module, name } if module == "console" && name == "println"
        ));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_one("a = b = c");
        let Expr::Assign { value, .. } = &expr.node else {
            panic!("expected assignment");
        };
        assert!(matches!(&value.node, Expr::Assign { .. }));
    }

    #[test]
    fn test_is_chains_with_binary() {
        assert!(matches!(
            parse_one("x is int == true").node,
            Expr::Binary { .. }
        ));
    }

    #[test]
    fn test_function_body_is_unscoped_sequence() {
        let expr = parse_one("fun f(a: int): int { a }");
        let Expr::Function { body, params, .. } = &expr.node else {
            panic!("expected function");
        };
        assert!(matches!(&body.node, Expr::Seq(_)));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_braced_block_is_scoped() {
        assert!(matches!(parse_one("{ 1; 2 }").node, Expr::Block(children) if children.len() == 2));
    }

    #[test]
    fn test_struct_decl_with_inherited() {
        let expr = parse_one("struct B(x: int): A, C");
        let Expr::StructDecl { name, fields, inherited } = &expr.node else {
            panic!("expected struct declaration");
        };
        assert_eq!(name, "B");
        assert_eq!(fields.len(), 1);
        assert_eq!(inherited, &vec!["A".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_type_unions_and_negation() {
        let expr = parse_one("x is int|str&!null");
        let Expr::TypeTest { ty, .. } = &expr.node else {
            panic!("expected type test");
        };
        assert!(matches!(ty, Type::Either(_, _)));
    }

    #[test]
    fn test_empty_containers() {
        assert!(matches!(parse_one("[]").node, Expr::List(items) if items.is_empty()));
        assert!(matches!(parse_one("{ }").node, Expr::Block(children) if children.is_empty()));
        assert!(matches!(parse_one("struct A()").node, Expr::StructDecl { fields, .. } if fields.is_empty()));
    }

    #[test]
    fn test_parse_everything_splits_statements() {
        let state = StateRef::new();
        let source = "let a = 1; let b = 2; a + b";
        let file = state.add_source("test.dash", source);
        let tokens = tokenize(source, file).unwrap();
        let mut parser = Parser::new(file, tokens, state);
        let exprs = parser.parse_everything().unwrap();
        assert_eq!(exprs.len(), 3);
    }

    #[test]
    fn test_module_header_sets_name() {
        let state = StateRef::new();
        let source = "module mylib; let a = 1";
        let file = state.add_source("test.dash", source);
        let tokens = tokenize(source, file).unwrap();
        let mut parser = Parser::new(file, tokens, state);
        parser.parse_everything().unwrap();
        assert_eq!(parser.module_name(), "mylib");
    }

    #[test]
    fn test_malformed_inputs_error() {
        let state = StateRef::new();
        for source in ["let = 5", "(1 + 2", "struct 5()", "if true", "a.", "fun f("] {
            let file = state.add_source("bad.dash", source);
            let tokens = tokenize(source, file).unwrap();
            let mut parser = Parser::new(file, tokens, state.clone());
            assert!(parser.parse_everything().is_err(), "should fail: {source:?}");
        }
    }
}
