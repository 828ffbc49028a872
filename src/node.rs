//! Document tree and the incorporation of new nodes into it.
//!
//! Nodes live in an arena owned by [Document] and refer to each other with [NodeId]
//! handles. Ownership flows down: containers own their value, lists and mappings own
//! their children. The `parent` handle is only followed upwards while a new line is
//! being incorporated.

use log::trace;
use smallvec::{smallvec, SmallVec};

use crate::{
    error::ContextError,
    span::{line_at, Pos, Scalar, Source},
};

/// Handle of a node within its [Document].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
pub struct Node {
    level: Option<usize>,
    parent: Option<NodeId>,
    start: Pos,
    comments: Vec<Comment>,
    kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    /// Top of the document, holding at most one value.
    Root { value: Option<NodeId> },

    /// `- value`
    ListItem { value: Option<NodeId> },

    /// `key: value`, or a bare `key:` whose value follows on indented lines.
    KeyValue { key: Source, value: Option<NodeId> },

    /// Sequence of [NodeKind::ListItem] nodes.
    List { children: Vec<NodeId> },

    /// Sequence of [NodeKind::KeyValue] nodes.
    Mapping { children: Vec<NodeId> },

    /// Text scalar, one segment per contributing line.
    Text { segments: SmallVec<[Source; 1]> },

    /// Boolean literal scalar.
    Boolean { source: Source },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Root { .. } => "root",
            NodeKind::ListItem { .. } => "list item",
            NodeKind::KeyValue { .. } => "key-value",
            NodeKind::List { .. } => "list",
            NodeKind::Mapping { .. } => "mapping",
            NodeKind::Text { .. } => "text",
            NodeKind::Boolean { .. } => "boolean",
        }
    }

    /// Holds at most one value.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Root { .. } | NodeKind::ListItem { .. } | NodeKind::KeyValue { .. }
        )
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Text { .. } | NodeKind::Boolean { .. })
    }

    /// Parent kind that has to be put in between when this node lands in a container.
    fn wrapper(&self) -> Option<NodeKind> {
        match self {
            NodeKind::ListItem { .. } => Some(NodeKind::List {
                children: Vec::new(),
            }),
            NodeKind::KeyValue { .. } => Some(NodeKind::Mapping {
                children: Vec::new(),
            }),
            _ => None,
        }
    }
}

/// A comment line, kept on the node that was the insertion point when it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment(Source);

impl Comment {
    pub fn new(source: Source) -> Self {
        Self(source)
    }

    pub fn source(&self) -> &Source {
        &self.0
    }

    pub fn text(&self) -> &str {
        self.0.text()
    }
}

impl Node {
    fn new(start: Pos, kind: NodeKind) -> Self {
        Self {
            level: None,
            parent: None,
            start,
            comments: Vec::new(),
            kind,
        }
    }

    /// Indentation level, unset until the node's line assigns it.
    pub fn level(&self) -> Option<usize> {
        self.level
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Where the node's text begins.
    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Value of a container, or the children of a list or mapping. Empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Root { value }
            | NodeKind::ListItem { value }
            | NodeKind::KeyValue { value, .. } => value.as_slice(),
            NodeKind::List { children } | NodeKind::Mapping { children } => children,
            NodeKind::Text { .. } | NodeKind::Boolean { .. } => &[],
        }
    }

    /// Key of a key-value node.
    pub fn key(&self) -> Option<&Source> {
        match &self.kind {
            NodeKind::KeyValue { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Whole span of a leaf node. Multi-line text is the concatenation of its segments.
    pub fn leaf_source(&self) -> Option<Source> {
        match &self.kind {
            NodeKind::Text { segments } => {
                let (first, rest) = segments.split_first()?;
                Some(rest.iter().fold(first.clone(), |acc, s| acc + s))
            }
            NodeKind::Boolean { source } => Some(source.clone()),
            _ => None,
        }
    }

    /// End of the last line contributing to a leaf.
    fn leaf_end(&self) -> Option<Pos> {
        match &self.kind {
            NodeKind::Text { segments } => segments.last().map(Source::end),
            NodeKind::Boolean { source } => Some(source.end()),
            _ => None,
        }
    }
}

/// Value of a single-line leaf as it reads inside multi-line text.
fn spelled(source: &Source) -> Scalar {
    match source.value() {
        Scalar::Bool(_) => Scalar::Str(source.text().to_owned()),
        value => value.clone(),
    }
}

/// A parsed document: the node arena and the text it was parsed from.
#[derive(Debug)]
pub struct Document<'src> {
    source: &'src str,
    filename: Option<String>,
    nodes: Vec<Node>,
}

impl<'src> Document<'src> {
    /// Empty document consisting of a root at level 0.
    pub fn new(source: &'src str, filename: Option<String>) -> Self {
        let mut root = Node::new(Pos::START, NodeKind::Root { value: None });
        root.level = Some(0);
        Self {
            source,
            filename,
            nodes: vec![root],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Add a detached node to the arena.
    pub(crate) fn alloc(&mut self, start: Pos, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(start, kind));
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn push_comment(&mut self, id: NodeId, comment: Comment) {
        self.nodes[id.0].comments.push(comment);
    }

    /// Set the level of a node and of its whole subtree.
    pub(crate) fn set_level(&mut self, id: NodeId, level: usize) {
        let mut stack: SmallVec<[NodeId; 8]> = smallvec![id];
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id.0];
            node.level = Some(level);
            stack.extend_from_slice(node.children());
        }
    }

    /// Deepest open node of the subtree at `id`, where the next line is tried first.
    pub fn tip(&self, mut id: NodeId) -> NodeId {
        while let Some(&last) = self.nodes[id.0].children().last() {
            id = last;
        }
        id
    }

    /// Whether `host` can take `new` as its next child.
    pub fn can_accept(&self, host: NodeId, new: NodeId) -> bool {
        let host = &self.nodes[host.0];
        let new = &self.nodes[new.0];

        let fits = |strictly_deeper: bool| match (new.level, host.level) {
            (None, _) => true,
            (Some(level), Some(host_level)) if strictly_deeper => level > host_level,
            (Some(level), Some(host_level)) => level >= host_level,
            (Some(_), None) => false,
        };

        match &host.kind {
            NodeKind::Root { value } => value.is_none() && fits(false),
            NodeKind::ListItem { value } | NodeKind::KeyValue { value, .. } => {
                value.is_none() && fits(true)
            }
            NodeKind::List { .. } => {
                matches!(new.kind, NodeKind::ListItem { .. }) && fits(false)
            }
            NodeKind::Mapping { .. } => {
                matches!(new.kind, NodeKind::KeyValue { .. }) && fits(false)
            }
            NodeKind::Text { .. } | NodeKind::Boolean { .. } => new.kind.is_leaf() && fits(false),
        }
    }

    /// Thread `new` into the tree, starting at `at` and climbing towards the root until
    /// some node accepts it. A list item or key-value landing in a container gets a
    /// list or mapping put in between.
    ///
    /// Returns the tip of the attached subtree, the insertion point for the next line.
    pub fn incorporate(&mut self, at: NodeId, new: NodeId) -> Result<NodeId, ContextError> {
        let attached = self.place(at, new)?;
        Ok(self.tip(attached))
    }

    /// [Document::incorporate] without looking for the tip. Returns `new`, or the leaf
    /// that absorbed it.
    pub(crate) fn place(&mut self, at: NodeId, new: NodeId) -> Result<NodeId, ContextError> {
        let mut host = at;
        loop {
            if self.can_accept(host, new) {
                trace!(
                    "{} {:?} accepts {} {:?}",
                    self.nodes[host.0].kind.name(),
                    host,
                    self.nodes[new.0].kind.name(),
                    new
                );

                if self.nodes[host.0].kind.is_container() {
                    if let Some(kind) = self.nodes[new.0].kind.wrapper() {
                        let (start, level) = (self.nodes[new.0].start, self.nodes[new.0].level);
                        let wrapper = self.alloc(start, kind);
                        self.nodes[wrapper.0].level = level;
                        self.attach(host, wrapper);
                        return Ok(self.attach(wrapper, new));
                    }
                }
                return Ok(self.attach(host, new));
            }

            match self.nodes[host.0].parent {
                Some(parent) => {
                    trace!("{:?} bubbles up from {:?} to {:?}", new, host, parent);
                    host = parent;
                }
                None => return Err(self.context_error(new)),
            }
        }
    }

    fn attach(&mut self, host: NodeId, new: NodeId) -> NodeId {
        match &mut self.nodes[host.0].kind {
            NodeKind::Root { value }
            | NodeKind::ListItem { value }
            | NodeKind::KeyValue { value, .. } => *value = Some(new),
            NodeKind::List { children } | NodeKind::Mapping { children } => children.push(new),
            NodeKind::Text { .. } | NodeKind::Boolean { .. } => {
                self.absorb(host, new);
                self.nodes[new.0].parent = Some(host);
                return host;
            }
        }

        self.nodes[new.0].parent = Some(host);
        if self.nodes[new.0].level.is_none() {
            if let Some(level) = self.nodes[host.0].level {
                self.set_level(new, level);
            }
        }
        new
    }

    /// Append the continuation leaf `new` to the leaf `host`.
    ///
    /// The continuation segment covers the document from just after the previous
    /// segment's line break, so the joined span text is exactly the source slice.
    /// Its value stays the continuation's own line; a boolean continuation
    /// contributes its literal spelling.
    fn absorb(&mut self, host: NodeId, new: NodeId) {
        let (Some(previous_end), Some(addition)) = (
            self.nodes[host.0].leaf_end(),
            self.nodes[new.0].leaf_source(),
        ) else {
            return;
        };

        let value = spelled(&addition);
        let start = Pos::new(previous_end.index() + 1, previous_end.line() + 1, 0);
        let segment = match self.source.get(start.index()..addition.end().index()) {
            Some(text) => Source::new(
                addition.filename().map(str::to_owned),
                start,
                addition.end(),
                text.to_owned(),
                value,
            ),
            None => addition.with_value(value),
        };

        let node = &mut self.nodes[host.0];
        match &mut node.kind {
            NodeKind::Text { segments } => segments.push(segment),
            NodeKind::Boolean { source } => {
                let first = source.clone().with_value(spelled(source));
                node.kind = NodeKind::Text {
                    segments: smallvec![first, segment],
                };
            }
            _ => {}
        }
    }

    fn context_error(&self, new: NodeId) -> ContextError {
        let pos = self.nodes[new.0].start;
        ContextError {
            filename: self.filename.clone(),
            pos,
            line: line_at(self.source, pos.index()).to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "    - bar\n   - foo";

    fn doc() -> Document<'static> {
        Document::new(TEXT, None)
    }

    fn list_item(doc: &mut Document, level: Option<usize>) -> NodeId {
        let id = doc.alloc(Pos::START, NodeKind::ListItem { value: None });
        if let Some(level) = level {
            doc.set_level(id, level);
        }
        id
    }

    fn key_value(doc: &mut Document, key: &str, level: Option<usize>) -> NodeId {
        let key = Source::text_at(None, Pos::START, key);
        let id = doc.alloc(Pos::START, NodeKind::KeyValue { key, value: None });
        if let Some(level) = level {
            doc.set_level(id, level);
        }
        id
    }

    fn text(doc: &mut Document, start: Pos, value: &str, level: Option<usize>) -> NodeId {
        let segments = smallvec![Source::text_at(None, start, value)];
        let id = doc.alloc(start, NodeKind::Text { segments });
        if let Some(level) = level {
            doc.set_level(id, level);
        }
        id
    }

    fn parent_kind(doc: &Document, id: NodeId) -> &'static str {
        let parent = doc.node(id).parent().unwrap();
        doc.node(parent).kind().name()
    }

    /// A list at level 4 hanging off the root.
    fn with_list(doc: &mut Document) -> NodeId {
        let list = doc.alloc(Pos::START, NodeKind::List { children: vec![] });
        doc.set_level(list, 4);
        doc.incorporate(doc.root(), list).unwrap()
    }

    #[test]
    fn root_adds_a_list() {
        crate::init_log();
        let mut doc = doc();
        let list = doc.alloc(Pos::START, NodeKind::List { children: vec![] });
        doc.set_level(list, 4);

        let tip = doc.incorporate(doc.root(), list).unwrap();
        assert_eq!(tip, list);
        assert_eq!(doc.node(doc.root()).children(), &[list]);
        assert_eq!(doc.node(list).parent(), Some(doc.root()));
    }

    #[test]
    fn root_wraps_a_list_item_in_a_list() {
        let mut doc = doc();
        let item = list_item(&mut doc, Some(4));

        let tip = doc.incorporate(doc.root(), item).unwrap();
        assert_eq!(tip, item);

        let list = doc.node(doc.root()).children()[0];
        assert!(matches!(doc.node(list).kind(), NodeKind::List { .. }));
        assert_eq!(doc.node(list).level(), Some(4));
        assert_eq!(doc.node(item).parent(), Some(list));
        assert_eq!(doc.node(list).parent(), Some(doc.root()));
    }

    #[test]
    fn root_wraps_a_key_value_in_a_mapping() {
        let mut doc = doc();
        let kv = key_value(&mut doc, "foo", Some(4));

        let tip = doc.incorporate(doc.root(), kv).unwrap();
        assert_eq!(tip, kv);
        assert_eq!(parent_kind(&doc, kv), "mapping");
    }

    #[test]
    fn root_holds_a_single_value() {
        let mut doc = doc();
        let first = text(&mut doc, Pos::START, "foo", Some(0));
        doc.incorporate(doc.root(), first).unwrap();

        let item = list_item(&mut doc, Some(0));
        assert!(!doc.can_accept(doc.root(), item));
    }

    #[test]
    fn list_adds_a_list_item_at_a_higher_level() {
        let mut doc = doc();
        let list = with_list(&mut doc);
        let item = list_item(&mut doc, Some(8));

        let tip = doc.incorporate(list, item).unwrap();
        assert_eq!(tip, item);
        assert_eq!(doc.node(list).children(), &[item]);
    }

    #[test]
    fn list_rejects_a_list_item_at_a_lower_level() {
        let mut doc = doc();
        let list = with_list(&mut doc);
        let start = Pos::from_str_index(TEXT, 13);
        let item = doc.alloc(start, NodeKind::ListItem { value: None });
        doc.set_level(item, 3);

        let err = doc.incorporate(list, item).unwrap_err();
        assert_eq!(err.pos, Pos::new(13, 2, 3));
        assert_eq!(err.line, "   - foo");
    }

    #[test]
    fn list_rejects_a_key_value() {
        let mut doc = doc();
        let list = with_list(&mut doc);
        let kv = key_value(&mut doc, "foo", Some(8));
        assert!(doc.incorporate(list, kv).is_err());
    }

    #[test]
    fn mapping_accepts_only_key_values() {
        let mut doc = doc();
        let kv = key_value(&mut doc, "foo", Some(4));
        doc.incorporate(doc.root(), kv).unwrap();
        let mapping = doc.node(kv).parent().unwrap();

        let higher = key_value(&mut doc, "bar", Some(8));
        assert_eq!(doc.incorporate(mapping, higher).unwrap(), higher);
        assert_eq!(doc.node(mapping).children(), &[kv, higher]);

        let lower = key_value(&mut doc, "baz", Some(3));
        assert!(doc.incorporate(mapping, lower).is_err());

        let item = list_item(&mut doc, Some(8));
        assert!(doc.incorporate(mapping, item).is_err());
    }

    #[test]
    fn list_item_wraps_a_deeper_list_item_in_a_list() {
        let mut doc = doc();
        let outer = list_item(&mut doc, Some(4));
        let outer = doc.incorporate(doc.root(), outer).unwrap();
        let inner = list_item(&mut doc, Some(8));

        assert_eq!(doc.incorporate(outer, inner).unwrap(), inner);
        let list = doc.node(outer).children()[0];
        assert!(matches!(doc.node(list).kind(), NodeKind::List { .. }));
        assert_eq!(doc.node(list).level(), Some(8));
        assert_eq!(doc.node(inner).parent(), Some(list));
    }

    #[test]
    fn list_item_at_same_level_bubbles_up_to_the_list() {
        let mut doc = doc();
        let first = list_item(&mut doc, Some(4));
        let first = doc.incorporate(doc.root(), first).unwrap();
        let second = list_item(&mut doc, Some(4));

        assert_eq!(doc.incorporate(first, second).unwrap(), second);
        assert!(doc.node(first).children().is_empty());

        let list = doc.node(first).parent().unwrap();
        assert_eq!(doc.node(list).children(), &[first, second]);
        assert_eq!(doc.node(second).parent(), Some(list));
    }

    #[test]
    fn key_value_at_same_level_bubbles_up_to_the_mapping() {
        let mut doc = doc();
        let first = key_value(&mut doc, "foo", Some(4));
        let first = doc.incorporate(doc.root(), first).unwrap();
        let second = key_value(&mut doc, "bar", Some(4));

        assert_eq!(doc.incorporate(first, second).unwrap(), second);
        let mapping = doc.node(first).parent().unwrap();
        assert_eq!(doc.node(mapping).children(), &[first, second]);
    }

    #[test]
    fn unleveled_key_value_gets_the_container_level() {
        let mut doc = doc();
        let item = list_item(&mut doc, Some(4));
        let item = doc.incorporate(doc.root(), item).unwrap();
        let kv = key_value(&mut doc, "foo", None);

        assert_eq!(doc.incorporate(item, kv).unwrap(), kv);
        let mapping = doc.node(item).children()[0];
        assert_eq!(doc.node(mapping).level(), Some(4));
        assert_eq!(doc.node(kv).level(), Some(4));
    }

    #[test]
    fn container_adds_a_leaf() {
        let mut doc = doc();
        let kv = key_value(&mut doc, "foo", Some(4));
        let kv = doc.incorporate(doc.root(), kv).unwrap();
        let leaf = text(&mut doc, Pos::START, "bar", None);

        assert_eq!(doc.incorporate(kv, leaf).unwrap(), leaf);
        assert_eq!(doc.node(kv).children(), &[leaf]);
        assert_eq!(doc.node(leaf).level(), Some(4));
    }

    #[test]
    fn container_value_must_be_deeper() {
        let mut doc = doc();
        let kv = key_value(&mut doc, "foo", Some(4));
        let kv = doc.incorporate(doc.root(), kv).unwrap();
        let leaf = text(&mut doc, Pos::START, "bar", Some(4));
        assert!(!doc.can_accept(kv, leaf));
    }

    #[test]
    fn leaf_absorbs_continuation_lines() {
        let source = "- bar\n\n  baz\n";
        let mut doc = Document::new(source, None);
        let item = list_item(&mut doc, Some(0));
        let bar = text(&mut doc, Pos::new(2, 1, 2), "bar", None);
        doc.incorporate(item, bar).unwrap();
        let tip = doc.incorporate(doc.root(), item).unwrap();
        assert_eq!(tip, bar);

        let baz = text(&mut doc, Pos::new(9, 3, 2), "baz", Some(2));
        assert_eq!(doc.incorporate(tip, baz).unwrap(), bar);

        let joined = doc.node(bar).leaf_source().unwrap();
        assert_eq!(joined.text(), "bar\n\n  baz");
        assert_eq!(joined.value().as_str(), Some("bar\nbaz"));
        assert_eq!(joined.start(), Pos::new(2, 1, 2));
        assert_eq!(joined.end(), Pos::new(12, 3, 5));
    }

    #[test]
    fn boolean_leaf_turns_into_text_on_continuation() {
        let source = "yes\n  more";
        let mut doc = Document::new(source, None);
        let yes = Source::text_at(None, Pos::START, "yes").with_value(true);
        let leaf = doc.alloc(Pos::START, NodeKind::Boolean { source: yes });
        doc.set_level(leaf, 0);
        let tip = doc.incorporate(doc.root(), leaf).unwrap();

        let more = text(&mut doc, Pos::new(6, 2, 2), "more", Some(2));
        doc.incorporate(tip, more).unwrap();

        assert!(matches!(doc.node(leaf).kind(), NodeKind::Text { .. }));
        let joined = doc.node(leaf).leaf_source().unwrap();
        assert_eq!(joined.text(), source);
        assert_eq!(joined.value().as_str(), Some("yes\nmore"));
    }

    #[test]
    fn boolean_continuations_join_their_spelling() {
        let source = "- yes\n\n    no";
        let mut doc = Document::new(source, None);
        let yes = Source::text_at(None, Pos::new(2, 1, 2), "yes").with_value(true);
        let leaf = doc.alloc(yes.start(), NodeKind::Boolean { source: yes });
        doc.set_level(leaf, 0);
        let tip = doc.incorporate(doc.root(), leaf).unwrap();

        let no = Source::text_at(None, Pos::new(11, 3, 4), "no").with_value(false);
        let no = doc.alloc(no.start(), NodeKind::Boolean { source: no });
        doc.set_level(no, 4);
        doc.incorporate(tip, no).unwrap();

        let joined = doc.node(leaf).leaf_source().unwrap();
        assert_eq!(joined.text(), "yes\n\n    no");
        assert_eq!(joined.value().as_str(), Some("yes\nno"));
    }

    #[test]
    fn place_returns_the_attached_node() {
        let mut doc = doc();
        let outer = list_item(&mut doc, None);
        let inner = list_item(&mut doc, None);
        let kv = key_value(&mut doc, "foo", None);

        assert_eq!(doc.place(inner, kv).unwrap(), kv);
        assert_eq!(doc.place(outer, inner).unwrap(), inner);
        assert_eq!(doc.tip(outer), kv);
    }

    #[test]
    fn set_level_reaches_the_whole_subtree() {
        let mut doc = doc();
        let item = list_item(&mut doc, None);
        let kv = key_value(&mut doc, "foo", None);
        doc.incorporate(item, kv).unwrap();

        doc.set_level(item, 6);
        let mapping = doc.node(item).children()[0];
        assert_eq!(doc.node(mapping).level(), Some(6));
        assert_eq!(doc.node(kv).level(), Some(6));
    }

    #[test]
    fn tip_follows_last_children() {
        let mut doc = doc();
        let item = list_item(&mut doc, Some(0));
        let kv = key_value(&mut doc, "foo", None);
        doc.incorporate(item, kv).unwrap();
        doc.incorporate(doc.root(), item).unwrap();

        assert_eq!(doc.tip(doc.root()), kv);
    }
}
