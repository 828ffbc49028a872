use log::debug;

use crate::{
    error::{ContextError, Error},
    grammar::{Body, BooleanMode, Data, Grammar, Item, Payload},
    node::{Comment, Document, NodeId, NodeKind},
};

/// Options of a parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    filename: Option<String>,
    booleans: BooleanMode,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label attached to every span and error.
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Which boolean literals to decode. Passing `true` enables the extended set.
    pub fn booleans(mut self, booleans: impl Into<BooleanMode>) -> Self {
        self.booleans = booleans.into();
        self
    }
}

/// Parse a whole document in one pass.
///
/// Each line becomes a small subtree (a list item holding a key-value holding a
/// scalar, say) which is then incorporated at the current insertion point. The
/// first line that fails the grammar or fits nowhere aborts the parse.
pub fn parse<'src>(text: &'src str, options: &ParseOptions) -> Result<Document<'src>, Error> {
    let grammar = Grammar::new(options.booleans, options.filename.clone());
    let mut doc = Document::new(text, options.filename.clone());
    let mut cursor = doc.root();
    let mut lines = 0;

    for line in grammar.lines(text) {
        let line = line?;
        lines += 1;
        match line.payload {
            Payload::Blank => {}
            Payload::Comment(source) => doc.push_comment(cursor, Comment::new(source)),
            Payload::Item(item) => {
                let node = build(&mut doc, item)?;
                doc.set_level(node, line.level);
                cursor = doc.incorporate(cursor, node)?;
            }
        }
    }

    debug!(
        "Parsed {lines} lines of {:?}, booleans {:?}",
        options.filename, options.booleans
    );
    Ok(doc)
}

/// Turn the raw item of one line into a detached subtree, innermost node first.
fn build(doc: &mut Document, item: Item) -> Result<NodeId, ContextError> {
    let start = item.body.start();
    let mut node = match item.body {
        Body::Data(data) => leaf(doc, data),
        Body::Section { key } => doc.alloc(start, NodeKind::KeyValue { key, value: None }),
        Body::KeyValue { key, value } => {
            let kv = doc.alloc(start, NodeKind::KeyValue { key, value: None });
            let value = leaf(doc, value);
            doc.place(kv, value)?;
            kv
        }
    };

    for marker in item.markers.iter().rev() {
        let li = doc.alloc(marker.start(), NodeKind::ListItem { value: None });
        doc.place(li, node)?;
        node = li;
    }
    Ok(node)
}

fn leaf(doc: &mut Document, data: Data) -> NodeId {
    let start = data.source().start();
    let kind = match data {
        Data::Text(source) => NodeKind::Text {
            segments: smallvec::smallvec![source],
        },
        Data::Boolean(source) => NodeKind::Boolean { source },
    };
    doc.alloc(start, kind)
}
