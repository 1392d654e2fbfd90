//! Error types with location information

use crate::{Location, SourceMap, Span};

/// Errors produced while lexing, parsing, compiling or checking a policy
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DatapolError {
    #[error("datapol:{filename}:{line}:{column}: ERR_LEX: {message}")]
    Lex {
        message: String,
        span: Span,
        filename: String,
        line: usize,
        column: usize,
    },

    #[error("datapol:{filename}:{line}:{column}: ERR_SYNTAX: {message}")]
    Syntax {
        message: String,
        span: Span,
        filename: String,
        line: usize,
        column: usize,
    },

    /// Semantic problem with a formula
    #[error("{message}")]
    Policy {
        message: String,
        location: Option<Location>,
    },

    /// Every problem found in one compiled source
    #[error("Compiler found errors:\n{}", join_errors(.errors))]
    Compile { errors: Vec<DatapolError> },

    #[error("datapol:{path}: ERR_IO: {message}")]
    Io { path: String, message: String },
}

fn join_errors(errors: &[DatapolError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl DatapolError {
    #[must_use]
    pub fn lex(message: String, span: Span, source_map: &SourceMap, filename: &str) -> Self {
        let pos = source_map.position(span.start);
        Self::Lex {
            message,
            span,
            filename: filename.to_string(),
            line: pos.line,
            column: pos.column,
        }
    }

    #[must_use]
    pub fn syntax(message: String, span: Span, source_map: &SourceMap, filename: &str) -> Self {
        let pos = source_map.position(span.start);
        Self::Syntax {
            message,
            span,
            filename: filename.to_string(),
            line: pos.line,
            column: pos.column,
        }
    }

    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy {
            message: message.into(),
            location: None,
        }
    }

    pub fn policy_at(message: impl Into<String>, location: Option<Location>) -> Self {
        Self::Policy {
            message: message.into(),
            location,
        }
    }

    #[must_use]
    pub fn io(path: &str, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    #[must_use]
    pub const fn span(&self) -> Option<Span> {
        match self {
            Self::Lex { span, .. } | Self::Syntax { span, .. } => Some(*span),
            Self::Policy { .. } | Self::Compile { .. } | Self::Io { .. } => None,
        }
    }

    #[must_use]
    pub const fn location(&self) -> Option<Location> {
        match self {
            Self::Policy { location, .. } => *location,
            _ => None,
        }
    }
}
