//! Internal representation of the datapol policy language
//!
//! Terms, tablenames, literals and rules carry an optional source location
//! for error reporting. Locations never take part in equality or ordering.

mod error;
mod formula;
mod literal;
mod rule;
mod schema;
mod tablename;
mod term;

pub use error::DatapolError;
pub use formula::{
    Event, Fact, Formula, formulas_to_string, tablename_is_result, tablename_is_update,
};
pub use literal::Literal;
pub use rule::Rule;
pub use schema::{Schema, Theories};
pub use tablename::Tablename;
pub use term::{Substitution, Term, Value};

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Line and column position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Location of a formula component, attached to terms, literals and rules
pub type Location = Position;

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line:{},col:{}", self.line, self.column)
    }
}

/// Convert byte span to line/column positions
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (pos, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(pos + 1);
            }
        }
        Self { line_starts }
    }

    #[must_use]
    pub fn position(&self, byte_offset: usize) -> Position {
        match self.line_starts.binary_search(&byte_offset) {
            Ok(line) => Position::new(line + 1, 1),
            Err(line) => {
                let line_start = self.line_starts[line - 1];
                Position::new(line, byte_offset - line_start + 1)
            }
        }
    }
}

/// Syntax node with location information
#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    #[must_use]
    pub const fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_creation() {
        let span = Span::new(10, 20);
        assert_eq!(span.start, 10);
        assert_eq!(span.end, 20);
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(4, 9).merge(Span::new(1, 6));
        assert_eq!(merged, Span::new(1, 9));
    }

    #[test]
    fn test_source_map() {
        let source = "p(1)\nq(x) :- p(x)\n";
        let source_map = SourceMap::new(source);

        let pos = source_map.position(0);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 1);

        let pos = source_map.position(2);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 3);

        let pos = source_map.position(5);
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 1);

        let pos = source_map.position(13);
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 9);
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(3, 7).to_string(), "line:3,col:7");
    }
}
