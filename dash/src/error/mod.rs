//! Error types and reporting
//!
//! Every interpretation error is fatal at the language level: there is no
//! catch construct, so errors propagate with `?` straight to the top level
//! where they are rendered once. Break/Continue/Return are *not* errors;
//! they travel through [`crate::interp::value::Flow`].

use crate::ast::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Interpretation error, tagged by the diagnostic taxonomy.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Lexer error: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error: {message}")]
    Parser { message: String, span: Span },

    /// Undefined variable/module/field, redeclaration
    #[error("Binding error: {message}")]
    Binding { message: String, span: Span },

    /// Incompatible let/return/field/argument type, failed cast, wrong
    /// arity, predicate rejection
    #[error("Type error: {message}")]
    Type { message: String, span: Span },

    /// Index out of bounds, missing dict key, division by zero,
    /// non-callable invocation target, null dereference
    #[error("Runtime error: {message}")]
    Runtime { message: String, span: Span },

    /// return/break/continue outside the required enclosing construct
    #[error("Control flow error: {message}")]
    ControlFlow { message: String, span: Span },

    /// Recursion limit hit at a callable-invocation boundary
    #[error("Stack overflow: {message}")]
    StackOverflow { message: String, span: Span },
}

impl Error {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer { message: message.into(), span }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser { message: message.into(), span }
    }

    pub fn binding(message: impl Into<String>, span: Span) -> Self {
        Self::Binding { message: message.into(), span }
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::Type { message: message.into(), span }
    }

    pub fn runtime(message: impl Into<String>, span: Span) -> Self {
        Self::Runtime { message: message.into(), span }
    }

    pub fn control_flow(message: impl Into<String>, span: Span) -> Self {
        Self::ControlFlow { message: message.into(), span }
    }

    pub fn stack_overflow(span: Span) -> Self {
        Self::StackOverflow {
            message: "call depth limit exceeded".to_string(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Lexer { span, .. }
            | Self::Parser { span, .. }
            | Self::Binding { span, .. }
            | Self::Type { span, .. }
            | Self::Runtime { span, .. }
            | Self::ControlFlow { span, .. }
            | Self::StackOverflow { span, .. } => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lexer { message, .. }
            | Self::Parser { message, .. }
            | Self::Binding { message, .. }
            | Self::Type { message, .. }
            | Self::Runtime { message, .. }
            | Self::ControlFlow { message, .. }
            | Self::StackOverflow { message, .. } => message,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Lexer { .. } => "Lexer",
            Self::Parser { .. } => "Parser",
            Self::Binding { .. } => "Binding",
            Self::Type { .. } => "Type",
            Self::Runtime { .. } => "Runtime",
            Self::ControlFlow { .. } => "Control flow",
            Self::StackOverflow { .. } => "Stack overflow",
        }
    }
}

/// Render an error with ariadne against the source it points into.
pub fn report_error(error: &Error, filename: &str, source: &str) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span();
    let _ = Report::build(ReportKind::Error, (filename, span.start..span.end))
        .with_message(format!("{} error", error.kind()))
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_message(error.message())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((filename, Source::from(source)));
}
