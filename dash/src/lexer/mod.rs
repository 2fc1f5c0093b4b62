//! Lexer implementation using logos

mod token;

pub use token::Token;

use crate::ast::{FileId, Span};
use crate::error::{Error, Result};
use logos::Logos;

/// Tokenize one source, tagging every span with its [`FileId`].
pub fn tokenize(source: &str, file: FileId) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end, file);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                return Err(Error::lexer(
                    format!("malformed token: {:?}", lexer.slice()),
                    span,
                ));
            }
        }
    }

    Ok(tokens)
}
