use std::fmt::Write;

use log::trace;
use smallvec::SmallVec;

use crate::{
    error::Error,
    span::{line_at, Pos, Source},
};

/// Label used in place of a missing filename.
const NO_FILENAME: &str = "<input>";

/// Renders parse errors against the text they came from.
pub struct Pretty<'src> {
    source: &'src str,
}

impl<'src> Pretty<'src> {
    pub fn new(source: &'src str) -> Self {
        Self { source }
    }

    /// Render `error` as `file:line:column: message` followed by the offending
    /// line and a caret under the offending column.
    pub fn explain(&self, error: &Error) -> PrettyError {
        let mut builder = self.explain_builder();
        builder.error(error);
        // The error is set and writing into a String does not fail.
        builder.build().unwrap_or_else(|e| PrettyError(e.to_string()))
    }

    pub fn explain_builder<'e>(&self) -> ExplainBuilder<'src, 'e> {
        ExplainBuilder {
            source: self.source,
            error: None,
            notes: Default::default(),
        }
    }
}

pub struct ExplainBuilder<'src, 'e> {
    source: &'src str,
    error: Option<&'e Error>,
    notes: SmallVec<[Note; 4]>,
}

struct Note {
    span: Source,
    message: String,
}

impl<'src, 'e> ExplainBuilder<'src, 'e> {
    /// Set the error being explained.
    pub fn error(&mut self, error: &'e Error) -> &mut Self {
        self.error = Some(error);
        self
    }

    /// Point at another piece of the document, like the node a misplaced line was expected to join.
    pub fn note(&mut self, span: &Source, message: impl Into<String>) -> &mut Self {
        self.notes.push(Note {
            span: span.clone(),
            message: message.into(),
        });
        self
    }

    /// Build pretty explanation from the error and the notes.
    pub fn build(&self) -> Result<PrettyError, ExplainBuildError> {
        let error = self.error.ok_or(ExplainBuildError::MissingErrorContext)?;
        trace!("Explaining {error:?} with {} notes", self.notes.len());

        let pos = error.pos();
        let mut out = String::new();
        writeln!(
            out,
            "{}:{}:{}: {error}",
            error.filename().unwrap_or(NO_FILENAME),
            pos.line(),
            pos.column()
        )?;
        excerpt(&mut out, error.line(), pos, 1)?;

        for note in &self.notes {
            let start = note.span.start();
            writeln!(
                out,
                "note: {}:{}:{}: {}",
                note.span.filename().unwrap_or(NO_FILENAME),
                start.line(),
                start.column(),
                note.message
            )?;
            let first_line = note.span.text().lines().next().unwrap_or_default();
            let width = first_line.chars().count().max(1);
            excerpt(&mut out, line_at(self.source, start.index()), start, width)?;
        }

        Ok(PrettyError(out.trim_end().to_owned()))
    }
}

/// Write a numbered source line and a caret run of `width` under `pos`.
fn excerpt(out: &mut String, line: &str, pos: Pos, width: usize) -> std::fmt::Result {
    let number = pos.line().to_string();
    let gutter = " ".repeat(number.len());

    // Keep tabs so the caret lines up with what a terminal shows.
    let pad: String = line
        .chars()
        .take(pos.column())
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();

    writeln!(out, "{gutter} |")?;
    writeln!(out, "{number} | {line}")?;
    writeln!(out, "{gutter} | {pad}{}", "^".repeat(width))
}

#[derive(Debug, Clone)]
pub struct PrettyError(String);

impl std::fmt::Display for PrettyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PrettyError {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::convert::AsRef<str> for PrettyError {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExplainBuildError {
    #[error("Error context is missing")]
    MissingErrorContext,

    #[error("Failed to write the explanation: {0}")]
    Format(#[from] std::fmt::Error),
}
