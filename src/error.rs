use thiserror::Error;

use crate::span::Pos;

pub use crate::grammar::{SyntaxError, SyntaxErrorKind};

/// Failure to parse a document. Parsing stops at the first error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A line does not match the grammar.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A line is well formed but its indentation does not fit anywhere in the tree built so far.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl Error {
    pub fn filename(&self) -> Option<&str> {
        match self {
            Error::Syntax(e) => e.filename.as_deref(),
            Error::Context(e) => e.filename.as_deref(),
        }
    }

    /// Position of the offending character.
    pub fn pos(&self) -> Pos {
        match self {
            Error::Syntax(e) => e.pos,
            Error::Context(e) => e.pos,
        }
    }

    /// Text of the offending line.
    pub fn line(&self) -> &str {
        match self {
            Error::Syntax(e) => &e.line,
            Error::Context(e) => &e.line,
        }
    }
}

/// No node from the insertion point up to the root accepts the new line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Failed to incorporate a node at line {}, column {}: {line:?}",
    .pos.line(),
    .pos.column()
)]
pub struct ContextError {
    pub filename: Option<String>,

    /// Start of the line's content, after indentation.
    pub pos: Pos,

    /// Full text of the offending line, without its line terminator.
    pub line: String,
}

/// Failure of the reader based [crate::load].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error occurred while reading the document. {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] Error),
}
