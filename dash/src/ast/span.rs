//! Source location tracking

use serde::{Deserialize, Serialize};

/// Identifies a registered source (file, REPL line, or `exec` string)
/// inside the interpreter's source registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// A byte range in one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub file: FileId,
}

impl Span {
    pub fn new(start: usize, end: usize, file: FileId) -> Self {
        Self { start, end, file }
    }

    /// Zero-width span for synthesized expressions (REPL glue, composed
    /// function bodies).
    pub fn synthetic(file: FileId) -> Self {
        Self::new(0, 0, file)
    }

    /// Covering span of two spans from the same source.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            file: self.file,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// A value with source location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const F: FileId = FileId(0);

    #[test]
    fn test_span_new() {
        let span = Span::new(10, 20, F);
        assert_eq!(span.start, 10);
        assert_eq!(span.end, 20);
        assert_eq!(span.file, F);
    }

    #[test]
    fn test_span_merge_non_overlapping() {
        let a = Span::new(0, 5, F);
        let b = Span::new(10, 15, F);
        let merged = a.merge(b);
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, 15);
    }

    #[test]
    fn test_span_merge_contained() {
        let outer = Span::new(0, 100, F);
        let inner = Span::new(20, 30, F);
        let merged = outer.merge(inner);
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, 100);
    }

    #[test]
    fn test_span_display() {
        assert_eq!(format!("{}", Span::new(3, 9, F)), "3..9");
    }

    #[test]
    fn test_span_into_range() {
        let range: std::ops::Range<usize> = Span::new(2, 7, F).into();
        assert_eq!(range, 2..7);
    }

    #[test]
    fn test_spanned_carries_node() {
        let s = Spanned::new(42, Span::new(0, 2, F));
        assert_eq!(s.node, 42);
        assert_eq!(s.span.end, 2);
    }
}
