//! Token definitions

use logos::Logos;
use rust_decimal::Decimal;
use std::str::FromStr;

fn strip_suffix_parse<T: FromStr>(slice: &str) -> Option<T> {
    let trimmed = slice.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    trimmed.parse().ok()
}

fn unescape(slice: &str) -> String {
    // `\"` is the only escape; everything else is literal.
    slice[1..slice.len() - 1].replace("\\\"", "\"")
}

/// Dash token. Operators are lexed greedily from a fixed symbol class so
/// user-defined operator names need no lexer changes.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"#[^#\n]*#?")]
pub enum Token {
    // Keywords
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("let")]
    Let,
    #[token("fun")]
    Fun,
    #[token("struct")]
    Struct,
    #[token("module")]
    Module,
    #[token("import")]
    Import,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("foreach")]
    Foreach,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("as")]
    As,
    #[token("ref")]
    Ref,
    #[token("dict")]
    Dict,
    #[token("this")]
    This,
    #[token("predicate")]
    Predicate,
    #[token("exec")]
    Exec,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("_", priority = 3)]
    Underscore,

    // Brackets and separators
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    // Literals. Suffixes pick the numeric kind: `f` float, `d` double,
    // `m` decimal; an unsuffixed fraction is a double, a bare integer an int.
    #[regex(r"[0-9]+(\.[0-9]+)?m", |lex| Decimal::from_str(lex.slice().trim_end_matches('m')).ok())]
    DecimalLit(Decimal),
    #[regex(r"[0-9]+(\.[0-9]+)?f", |lex| strip_suffix_parse::<f32>(lex.slice()))]
    FloatLit(f32),
    #[regex(r"[0-9]+(\.[0-9]+)?d", |lex| strip_suffix_parse::<f64>(lex.slice()))]
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    DoubleLit(f64),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i32>().ok())]
    IntLit(i32),
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    StrLit(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[+\-*/%<>=!&|^~?:.]+", |lex| lex.slice().to_string())]
    Op(String),
}

impl Token {
    /// The operator's symbol, if this is an operator token.
    pub fn op(&self) -> Option<&str> {
        match self {
            Token::Op(sym) => Some(sym.as_str()),
            _ => None,
        }
    }

    /// Human-readable form for "expected X, got Y" diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Op(sym) => format!("operator '{sym}'"),
            Token::StrLit(_) => "string literal".to_string(),
            Token::IntLit(_) | Token::FloatLit(_) | Token::DoubleLit(_) | Token::DecimalLit(_) => {
                "number literal".to_string()
            }
            other => format!("'{}'", other.text()),
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Token::If => "if",
            Token::Then => "then",
            Token::Else => "else",
            Token::Let => "let",
            Token::Fun => "fun",
            Token::Struct => "struct",
            Token::Module => "module",
            Token::Import => "import",
            Token::While => "while",
            Token::For => "for",
            Token::Foreach => "foreach",
            Token::In => "in",
            Token::Is => "is",
            Token::As => "as",
            Token::Ref => "ref",
            Token::Dict => "dict",
            Token::This => "this",
            Token::Predicate => "predicate",
            Token::Exec => "exec",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Return => "return",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::Underscore => "_",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::Semi => ";",
            _ => "?",
        }
    }
}
