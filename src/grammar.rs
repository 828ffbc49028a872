//! Line-level grammar.
//!
//! ```text
//! document   := line*
//! line       := indent (comment | blank | structure | value) end-of-line
//! structure  := list-item | key-value | section
//! list-item  := "-" ws value
//! key-value  := section ws data
//! section    := key ":"
//! value      := structure | data
//! data       := boolean? | text
//! comment    := ("#" | "//"+)+ text?
//! ```
//!
//! Alternatives are ordered and the first one matching wins, the way a PEG
//! commits to a choice. A line only ever yields a raw [Item] of matched spans,
//! nesting into nodes happens later in [crate::node].

use lazy_regex::{regex_find, regex_is_match};
use log::trace;
use smallvec::SmallVec;
use thiserror::Error;

use crate::span::{Pos, Source};

/// Boolean literal extension of the grammar.
pub mod boolean;

pub use boolean::BooleanMode;

/// Columns a tab expands to when measuring indentation.
pub const TAB_WIDTH: usize = 4;

/// One physical line of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Position of the first character of the line.
    pub start: Pos,

    /// Indentation width in columns, tabs expanded.
    pub level: usize,

    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Nothing but whitespace.
    Blank,

    /// A `#` or `//` comment, prefix included.
    Comment(Source),

    Item(Item),
}

/// Raw structure matched on a single line: any number of leading list item
/// markers (`- - key: value`) and the body after them.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Spans of the `-` markers, outermost first.
    pub markers: SmallVec<[Source; 2]>,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// `key: data`
    KeyValue { key: Source, value: Data },

    /// `key:` with the value deferred to the following, more indented, lines.
    Section { key: Source },

    Data(Data),
}

impl Item {
    /// Where the matched structure begins.
    pub fn start(&self) -> Pos {
        match self.markers.first() {
            Some(marker) => marker.start(),
            None => self.body.start(),
        }
    }
}

impl Body {
    pub fn start(&self) -> Pos {
        match self {
            Body::KeyValue { key, .. } | Body::Section { key } => key.start(),
            Body::Data(data) => data.source().start(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Text(Source),

    /// A boolean literal. The source keeps the literal text, its value is the decoded boolean.
    Boolean(Source),
}

impl Data {
    pub fn source(&self) -> &Source {
        match self {
            Data::Text(source) | Data::Boolean(source) => source,
        }
    }

    pub fn into_source(self) -> Source {
        match self {
            Data::Text(source) | Data::Boolean(source) => source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("expected whitespace or end of line after `:`")]
    MissingSeparator,
}

/// A line that does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {}, column {}: {line:?}", .pos.line(), .pos.column())]
pub struct SyntaxError {
    pub filename: Option<String>,

    /// Position of the first offending character.
    pub pos: Pos,

    /// Full text of the offending line.
    pub line: String,

    pub kind: SyntaxErrorKind,
}

/// Matches lines of a document against the grammar.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    booleans: BooleanMode,
    filename: Option<String>,
}

impl Grammar {
    pub fn new(booleans: BooleanMode, filename: Option<String>) -> Self {
        Self { booleans, filename }
    }

    /// Iterate over the classified lines of `text`.
    pub fn lines<'g, 'src>(&'g self, text: &'src str) -> Lines<'g, 'src> {
        Lines {
            grammar: self,
            rest: text,
            pos: Pos::START,
        }
    }

    /// Classify a single line, given without its line terminator.
    pub fn line(&self, raw: &str, start: Pos) -> Result<Line, SyntaxError> {
        let indent_len = raw
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(raw.len());
        let (indent, payload) = raw.split_at(indent_len);
        let level = indent
            .chars()
            .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
            .sum();
        let at = start.advance(indent);

        let payload = if payload.is_empty() {
            Payload::Blank
        } else if regex_is_match!(r"^(#|//+)+", payload) {
            Payload::Comment(self.span(at, payload))
        } else {
            Payload::Item(self.item(raw, payload, at)?)
        };

        trace!("Line {} at level {level}: {payload:?}", start.line());
        Ok(Line {
            start,
            level,
            payload,
        })
    }

    fn item(&self, raw: &str, payload: &str, at: Pos) -> Result<Item, SyntaxError> {
        let Some((item, consumed)) = self.value(payload, at) else {
            // `value` falls back to text, which matches anything non-empty.
            return Ok(Item {
                markers: SmallVec::new(),
                body: Body::Data(Data::Text(self.span(at, payload))),
            });
        };

        let rest = &payload[consumed..];
        if rest.trim().is_empty() {
            return Ok(item);
        }

        Err(SyntaxError {
            filename: self.filename.clone(),
            pos: at.advance(&payload[..consumed]),
            line: raw.to_owned(),
            kind: SyntaxErrorKind::MissingSeparator,
        })
    }

    /// `value := list-item | key-value | section | data`, with `list-item := "-" ws value`
    /// unrolled: markers are peeled off in a loop, then the body is matched. A marker
    /// with nothing behind it is given back and read as data instead.
    ///
    /// Returns the item and the number of bytes consumed.
    fn value(&self, s: &str, at: Pos) -> Option<(Item, usize)> {
        let mut markers: SmallVec<[(Source, usize, Pos); 2]> = SmallVec::new();
        let (mut offset, mut pos) = (0, at);
        while let Some(prefix) = regex_find!(r"^-[ \t]+", &s[offset..]) {
            markers.push((self.span(pos, "-"), offset, pos));
            offset += prefix.len();
            pos = pos.advance(prefix);
        }

        loop {
            if let Some((body, consumed)) = self.body(&s[offset..], pos) {
                let markers = markers.into_iter().map(|(marker, ..)| marker).collect();
                return Some((Item { markers, body }, offset + consumed));
            }
            (_, offset, pos) = markers.pop()?;
        }
    }

    fn body(&self, s: &str, at: Pos) -> Option<(Body, usize)> {
        self.key_value(s, at)
            .or_else(|| self.section(s, at))
            .or_else(|| self.data(s, at).map(|data| (Body::Data(data), s.len())))
    }

    fn key_value(&self, s: &str, at: Pos) -> Option<(Body, usize)> {
        let (key, section_len) = self.key(s, at)?;
        let ws = regex_find!(r"^[ \t]+", &s[section_len..])?;
        let data_len = section_len + ws.len();
        let value = self.data(&s[data_len..], at.advance(&s[..data_len]))?;
        Some((Body::KeyValue { key, value }, s.len()))
    }

    fn section(&self, s: &str, at: Pos) -> Option<(Body, usize)> {
        let (key, consumed) = self.key(s, at)?;
        Some((Body::Section { key }, consumed))
    }

    /// `key ":"`, returning the key span and the length including the colon.
    fn key(&self, s: &str, at: Pos) -> Option<(Source, usize)> {
        let section = regex_find!(r"^[^\s:]+:", s)?;
        let key = &section[..section.len() - 1];
        Some((self.span(at, key), section.len()))
    }

    fn data(&self, s: &str, at: Pos) -> Option<Data> {
        if s.is_empty() {
            return None;
        }

        let span = self.span(at, s);
        Some(match boolean::recognize(s, self.booleans) {
            Some(b) => Data::Boolean(span.with_value(b)),
            None => Data::Text(span),
        })
    }

    fn span(&self, at: Pos, text: &str) -> Source {
        Source::text_at(self.filename.clone(), at, text)
    }
}

/// Iterator over the classified lines of a document.
pub struct Lines<'g, 'src> {
    grammar: &'g Grammar,
    rest: &'src str,
    pos: Pos,
}

impl Iterator for Lines<'_, '_> {
    type Item = Result<Line, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let (raw, consumed) = match self.rest.find('\n') {
            Some(i) => (&self.rest[..i], i + 1),
            None => (self.rest, self.rest.len()),
        };
        let start = self.pos;
        self.pos = start.advance(&self.rest[..consumed]);
        self.rest = &self.rest[consumed..];

        Some(self.grammar.line(raw, start))
    }
}
