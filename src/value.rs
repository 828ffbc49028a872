use std::hash::Hash;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    node::{Document, NodeKind},
    span::{Scalar, Source},
};

/// Plain data shape of a document, generic over what stands in for scalars.
///
/// Mappings keep the position of a key's first appearance; a duplicated key
/// overwrites the earlier value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Data<S: Hash + Eq> {
    /// Missing value, like the one of a bare `key:` with nothing under it, or an empty document.
    Null,
    Scalar(S),
    List(Vec<Data<S>>),
    Map(IndexMap<S, Data<S>>),
}

/// Document data with decoded scalars only.
pub type Value = Data<Scalar>;

/// Document data with every scalar and key carrying its source span.
pub type Annotated = Data<Source>;

/// Result of [Document::as_data_with].
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Plain(Value),
    Annotated(Annotated),
}

impl<S: Hash + Eq> Data<S> {
    pub fn is_null(&self) -> bool {
        matches!(self, Data::Null)
    }

    pub fn as_scalar(&self) -> Option<&S> {
        match self {
            Data::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Data<S>]> {
        match self {
            Data::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<S, Data<S>>> {
        match self {
            Data::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Convert every scalar and key. Keys that become equal collapse, last value winning.
    pub fn map_scalars<T: Hash + Eq>(&self, f: impl Fn(&S) -> T) -> Data<T> {
        enum Children<'a, S: Hash + Eq> {
            List(std::slice::Iter<'a, Data<S>>),
            Map(indexmap::map::Iter<'a, S, Data<S>>),
        }

        unfold(
            self,
            |data| match data {
                Data::Null => Step::Done(Data::Null),
                Data::Scalar(s) => Step::Done(Data::Scalar(f(s))),
                Data::List(items) => Step::List(Children::List(items.iter()), items.len()),
                Data::Map(map) => Step::Map(Children::Map(map.iter()), map.len()),
            },
            |children| match children {
                Children::List(items) => items.next().map(|item| (None, item)),
                Children::Map(entries) => entries.next().map(|(k, v)| (Some(f(k)), v)),
            },
        )
    }
}

/// Nested values are taken apart with an explicit stack, so dropping a deeply
/// nested document does not exhaust the call stack.
impl<S: Hash + Eq> Drop for Data<S> {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        take_children(self, &mut stack);
        while let Some(mut data) = stack.pop() {
            // Left empty, so its own drop returns right away.
            take_children(&mut data, &mut stack);
        }
    }
}

fn take_children<S: Hash + Eq>(data: &mut Data<S>, stack: &mut Vec<Data<S>>) {
    match data {
        Data::List(items) => stack.extend(items.drain(..)),
        Data::Map(map) => stack.extend(map.drain(..).map(|(_, v)| v)),
        Data::Null | Data::Scalar(_) => {}
    }
}

/// Next move of [unfold] on a node: a finished value, or a list or mapping whose
/// children come from the iterator.
enum Step<S: Hash + Eq, I> {
    Done(Data<S>),
    List(I, usize),
    Map(I, usize),
}

/// A list or mapping still receiving children.
struct Frame<S: Hash + Eq, I> {
    built: Data<S>,
    key: Option<S>,
    rest: I,
}

/// Build a [Data] tree depth-first from `root` without recursion.
///
/// `step` turns a node into a value or opens a list or mapping. `next` yields the
/// following child of an open one, with its key when the parent is a mapping.
fn unfold<S: Hash + Eq, N, I>(
    root: N,
    mut step: impl FnMut(N) -> Step<S, I>,
    mut next: impl FnMut(&mut I) -> Option<(Option<S>, N)>,
) -> Data<S> {
    let mut frames: Vec<Frame<S, I>> = Vec::new();
    let mut pending = Some(root);

    loop {
        let mut done = match pending.take().map(&mut step) {
            Some(Step::Done(data)) => Some(data),
            Some(Step::List(rest, len)) => {
                frames.push(Frame {
                    built: Data::List(Vec::with_capacity(len)),
                    key: None,
                    rest,
                });
                None
            }
            Some(Step::Map(rest, len)) => {
                frames.push(Frame {
                    built: Data::Map(IndexMap::with_capacity(len)),
                    key: None,
                    rest,
                });
                None
            }
            None => None,
        };

        loop {
            let Some(frame) = frames.last_mut() else {
                return done.unwrap_or(Data::Null);
            };

            if let Some(data) = done.take() {
                match (&mut frame.built, frame.key.take()) {
                    (Data::List(items), _) => items.push(data),
                    (Data::Map(map), Some(key)) => {
                        map.insert(key, data);
                    }
                    _ => {}
                }
            }

            match next(&mut frame.rest) {
                Some((key, child)) => {
                    frame.key = key;
                    pending = Some(child);
                    break;
                }
                None => done = frames.pop().map(|frame| frame.built),
            }
        }
    }
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    /// Value under a text key of a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(&Scalar::from(key))
    }
}

impl Annotated {
    /// Discard positions, keeping the decoded values.
    pub fn strip(&self) -> Value {
        self.map_scalars(|source| source.value().clone())
    }
}

impl<S: Hash + Eq> From<S> for Data<S> {
    fn from(s: S) -> Self {
        Data::Scalar(s)
    }
}

impl Document<'_> {
    /// Project the document to plain data with decoded scalars.
    pub fn as_data(&self) -> Value {
        self.project(Source::into_value)
    }

    /// Project the document to data whose scalars and keys carry their source spans.
    pub fn as_source(&self) -> Annotated {
        self.project(|source| source)
    }

    /// Project with `raw` choosing between [Document::as_data] and [Document::as_source].
    pub fn as_data_with(&self, raw: bool) -> Projection {
        if raw {
            Projection::Plain(self.as_data())
        } else {
            Projection::Annotated(self.as_source())
        }
    }

    fn project<S: Hash + Eq>(&self, scalar: impl Fn(Source) -> S) -> Data<S> {
        unfold(
            self.root(),
            |mut id| loop {
                let node = self.node(id);
                return match node.kind() {
                    NodeKind::Root { value }
                    | NodeKind::ListItem { value }
                    | NodeKind::KeyValue { value, .. } => match value {
                        // Containers are transparent.
                        Some(value) => {
                            id = *value;
                            continue;
                        }
                        None => Step::Done(Data::Null),
                    },
                    NodeKind::List { children } => Step::List(children.iter(), children.len()),
                    NodeKind::Mapping { children } => Step::Map(children.iter(), children.len()),
                    NodeKind::Text { .. } | NodeKind::Boolean { .. } => match node.leaf_source() {
                        Some(source) => Step::Done(Data::Scalar(scalar(source))),
                        None => Step::Done(Data::Null),
                    },
                };
            },
            |children| {
                let &child = children.next()?;
                let key = self.node(child).key().map(|key| scalar(key.clone()));
                Some((key, child))
            },
        )
    }
}
