//! SYML is a small, indentation-sensitive markup language in the spirit of YAML.
//!
//! A document is a tree of lists (`- item`), mappings (`key: value`) and text
//! scalars. Every scalar is text unless boolean literals are enabled. There is
//! no quoting, no escaping, no flow style and no references: a value is simply
//! the rest of the line, continued by any following lines that are indented at
//! least as deep.
//!
//! ```text
//! # A comment
//! name: syml
//! tags:
//!   - parser
//!   - markup
//! description:
//!   A multi-line value,
//!   continued here.
//! ```
//!
//! # Parsing
//! [parse] reads the whole document into a [Document], an arena of nodes that
//! remembers where every piece of text came from. Parsing stops at the first
//! error, which is either a [SyntaxError] for a line that matches no grammar
//! alternative or a [ContextError] for a well formed line whose indentation
//! fits nowhere in the tree built so far.
//!
//! # Projection
//! A parsed document projects to [Value], plain data made of [Scalar]s, lists
//! and insertion-ordered maps, or to [Annotated], the same shape with every
//! scalar and key kept as a [Source] span. [loads] and [load] parse and
//! project in one go.
//!
//! # Booleans
//! Booleans are off by default. [BooleanMode::Strict] accepts `true` and
//! `false` spellings, [BooleanMode::Extended] also accepts `yes`, `no`, `on`,
//! `off`, `y` and `n`. A literal must make up the whole value to count.

/// Positions in the document text and spans of matched text.
pub mod span;

/// Line-level grammar of the markup.
pub mod grammar;

/// Document tree and incorporation of lines into it.
pub mod node;

/// Parsing driver putting the grammar and the tree together.
pub mod parser;

/// Projection of a document to plain or annotated data.
pub mod value;

pub mod error;

/// Module to aid user in understanding errors by showing where in the document they happened.
pub mod error_expl;

pub use error::{ContextError, Error, LoadError, SyntaxError};
pub use grammar::{BooleanMode, Grammar};
pub use node::{Comment, Document, Node, NodeId, NodeKind};
pub use parser::{parse, ParseOptions};
pub use span::{Pos, Scalar, Source};
pub use value::{Annotated, Data, Projection, Value};

/// Parse `text` and project it to plain data.
pub fn loads(text: &str, options: &ParseOptions) -> Result<Value, Error> {
    Ok(parse(text, options)?.as_data())
}

/// Read a whole document from `reader`, then parse and project it like [loads].
pub fn load<R: std::io::Read>(mut reader: R, options: &ParseOptions) -> Result<Value, LoadError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(loads(&text, options)?)
}

#[cfg(test)]
pub fn init_log() {
    use log::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let handle = flexi_logger::Logger::with(LevelFilter::Trace)
            .format(format)
            .start()
            .unwrap();
        // Keep logging for the rest of the test run.
        std::mem::forget(handle);
    });

    fn format(
        write: &mut dyn std::io::Write,
        _: &mut flexi_logger::DeferredNow,
        record: &Record,
    ) -> std::io::Result<()> {
        write.write_all(
            format!(
                "[{} {}:{}] {} - {}",
                record.level(),
                record.file().unwrap_or_default(),
                record.line().unwrap_or_default(),
                record.module_path().unwrap_or_default(),
                record.args()
            )
            .as_bytes(),
        )
    }
}
