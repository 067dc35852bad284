//! Immutable nodes and the arena that owns them.
//!
//! Nodes reference children through [`NodeId`] handles into a [`NodeArena`].
//! The arena is append-only, so a node never changes once inserted; deriving
//! a variant means inserting a new node.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::cid::Cid;
use crate::kind::NodeKind;
use crate::schema::ScalarType;

/// Stable handle of a node inside one [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Wraps a raw arena index. The index is not checked until traversal.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// IEEE-754 binary64.
    Float(f64),
    /// UTF-8 string.
    Str(String),
}

impl Scalar {
    /// Returns `true` if this scalar satisfies `ty`.
    pub fn conforms_to(&self, ty: ScalarType) -> bool {
        matches!(
            (ty, self),
            (ScalarType::Any, _)
                | (ScalarType::Bool, Scalar::Bool(_))
                | (ScalarType::Int, Scalar::Int(_))
                | (ScalarType::Float, Scalar::Float(_))
                | (ScalarType::Str, Scalar::Str(_))
        )
    }

    /// Diagnostic type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

/// Value attached to a node attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Primitive value.
    Scalar(Scalar),
    /// In-document child node.
    Node(NodeId),
    /// Already-computed content identifier.
    Cid(Cid),
    /// Ordered list.
    List(Vec<FieldValue>),
    /// String-keyed entries in producer insertion order.
    Map(Vec<(String, FieldValue)>),
}

impl FieldValue {
    /// Builds a list value.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a map value, keeping insertion order.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        FieldValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Diagnostic shape name.
    pub fn shape(&self) -> &'static str {
        match self {
            FieldValue::Scalar(s) => s.type_name(),
            FieldValue::Node(_) => "node",
            FieldValue::Cid(_) => "cid",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }

    fn collect_nodes(&self, out: &mut Vec<NodeId>) {
        match self {
            FieldValue::Node(id) => out.push(*id),
            FieldValue::List(items) => items.iter().for_each(|v| v.collect_nodes(out)),
            FieldValue::Map(entries) => entries.iter().for_each(|(_, v)| v.collect_nodes(out)),
            FieldValue::Scalar(_) | FieldValue::Cid(_) => {}
        }
    }
}

macro_rules! scalar_field_from {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Scalar(value.into())
                }
            }
        )+
    };
}

scalar_field_from!(Scalar, bool, i64, i32, f64, &str, String);

impl From<NodeId> for FieldValue {
    fn from(value: NodeId) -> Self {
        FieldValue::Node(value)
    }
}

impl From<Cid> for FieldValue {
    fn from(value: Cid) -> Self {
        FieldValue::Cid(value)
    }
}

/// An immutable node: a kind plus string-keyed attributes.
///
/// Attributes mix semantic slots and contextual metadata; the field classifier
/// tells them apart by consulting the kind's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    attrs: BTreeMap<String, FieldValue>,
}

impl Node {
    /// Creates a node with no attributes.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
        }
    }

    /// Returns a copy of this node with `name` set to `value`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Node kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Attribute lookup.
    pub fn attr(&self, name: &str) -> Option<&FieldValue> {
        self.attrs.get(name)
    }

    /// All attributes, ordered by name.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every child handle reachable from any attribute, in attribute order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for value in self.attrs.values() {
            value.collect_nodes(&mut out);
        }
        out
    }
}

/// Append-only owner of the nodes of one document.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its handle.
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Looks up a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over `(handle, node)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}
