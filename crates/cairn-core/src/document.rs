//! JSON documents describing a node arena.
//!
//! ```json
//! {
//!   "root": 2,
//!   "nodes": [
//!     {"kind": "Var", "fields": {"name": "a"}},
//!     {"kind": "Literal", "fields": {"value": 1, "author": "alice"}},
//!     {"kind": "BinOp", "fields": {"op": "+", "left": {"node": 0}, "right": {"node": 1}}}
//!   ]
//! }
//! ```
//!
//! Node `i` of the array becomes handle `#i` of the arena. Semantic slots and
//! contextual metadata share the `fields` object; the classifier tells them
//! apart.
//!
//! An object with the single key `node`, `cid`, `f64` or `map` is a wrapper,
//! not a map. Write `{"map": {"node": 1}}` for a map whose only key collides
//! with a wrapper name.

use std::io::Read;

use cairn_canonical::{
    CanonicalizationError, Cid, FieldValue, Node, NodeArena, NodeId, NodeKind, Scalar,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Errors produced while loading a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The input is not a well-formed document.
    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A node names a kind outside the closed set.
    #[error("node #{node}: {source}")]
    Kind {
        /// Index of the node.
        node: usize,
        /// Underlying error.
        #[source]
        source: CanonicalizationError,
    },
    /// The root index does not name a node.
    #[error("root #{root} is out of range for {len} nodes")]
    UnknownRoot {
        /// Declared root index.
        root: usize,
        /// Number of nodes in the document.
        len: usize,
    },
    /// A field value has no node-algebra meaning.
    #[error("node #{node} field '{field}': {reason}")]
    InvalidValue {
        /// Index of the node.
        node: usize,
        /// Field name.
        field: String,
        /// What was wrong.
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    root: usize,
    nodes: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNode {
    kind: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// A loaded document: an arena and its root handle.
#[derive(Debug, Clone)]
pub struct Document {
    /// Every node of the document.
    pub arena: NodeArena,
    /// Root handle.
    pub root: NodeId,
}

impl Document {
    /// Parses a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] for malformed JSON or values outside the
    /// node algebra.
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        Self::from_raw(serde_json::from_str(text)?)
    }

    /// Parses a document from a reader.
    ///
    /// # Errors
    ///
    /// See [`Document::from_json`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DocumentError> {
        Self::from_raw(serde_json::from_reader(reader)?)
    }

    /// Resolves a node index to a handle of this document.
    pub fn node(&self, index: usize) -> Option<NodeId> {
        (index < self.arena.len()).then(|| NodeId::new(index))
    }

    fn from_raw(raw: RawDocument) -> Result<Self, DocumentError> {
        let len = raw.nodes.len();
        if raw.root >= len {
            return Err(DocumentError::UnknownRoot {
                root: raw.root,
                len,
            });
        }
        let mut arena = NodeArena::new();
        for (index, raw_node) in raw.nodes.into_iter().enumerate() {
            let kind = NodeKind::parse(&raw_node.kind)
                .map_err(|source| DocumentError::Kind { node: index, source })?;
            let mut node = Node::new(kind);
            for (field, value) in raw_node.fields {
                if value.is_null() {
                    continue;
                }
                let converted = field_value(value, len).map_err(|reason| {
                    DocumentError::InvalidValue {
                        node: index,
                        field: field.clone(),
                        reason,
                    }
                })?;
                node = node.with(field, converted);
            }
            arena.insert(node);
        }
        debug!(nodes = len, root = raw.root, "loaded document");
        Ok(Self {
            arena,
            root: NodeId::new(raw.root),
        })
    }
}

fn field_value(value: Value, len: usize) -> Result<FieldValue, String> {
    match value {
        Value::Null => Err("null is only allowed as a whole field value".to_string()),
        Value::Bool(b) => Ok(b.into()),
        Value::String(s) => Ok(s.into()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.into())
            } else if n.is_u64() {
                Err(format!("integer {n} does not fit in 64-bit two's complement"))
            } else {
                n.as_f64()
                    .map(FieldValue::from)
                    .ok_or_else(|| format!("number {n} is not representable"))
            }
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| field_value(item, len))
            .collect::<Result<Vec<_>, _>>()
            .map(FieldValue::List),
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(special) = special_object(&map, len) {
                    return special;
                }
            }
            map_entries(map, len)
        }
    }
}

fn map_entries(map: Map<String, Value>, len: usize) -> Result<FieldValue, String> {
    map.into_iter()
        .map(|(key, item)| field_value(item, len).map(|v| (key, v)))
        .collect::<Result<Vec<_>, _>>()
        .map(FieldValue::Map)
}

/// Handles the `{"node": i}`, `{"cid": ..}`, `{"f64": ..}` and `{"map": {..}}`
/// wrappers.
fn special_object(map: &Map<String, Value>, len: usize) -> Option<Result<FieldValue, String>> {
    let (key, value) = map.iter().next()?;
    let result = match key.as_str() {
        "node" => match value.as_u64().and_then(|i| usize::try_from(i).ok()) {
            Some(index) if index < len => Ok(FieldValue::Node(NodeId::new(index))),
            _ => Err(format!("node reference {value} is out of range for {len} nodes")),
        },
        "cid" => match value.as_str() {
            Some(text) => Cid::parse(text)
                .map(FieldValue::Cid)
                .map_err(|err| err.to_string()),
            None => Err(format!("cid must be a string, found {value}")),
        },
        "f64" => match value.as_str() {
            Some(text) if text.len() == 16 => u64::from_str_radix(text, 16)
                .map(|bits| FieldValue::Scalar(Scalar::Float(f64::from_bits(bits))))
                .map_err(|err| format!("f64 bits {text:?}: {err}")),
            _ => Err(format!("f64 must be 16 hex digits, found {value}")),
        },
        "map" => match value.as_object() {
            Some(inner) => map_entries(inner.clone(), len),
            None => Err(format!("map must be an object, found {value}")),
        },
        _ => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_nodes_in_order() {
        let doc = Document::from_json(
            r#"{"root": 2, "nodes": [
                {"kind": "Var", "fields": {"name": "a"}},
                {"kind": "cairn.node.v1.Literal", "fields": {"value": 1, "type": null}},
                {"kind": "BinOp", "fields": {"op": "+", "left": {"node": 0}, "right": {"node": 1}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(doc.root, NodeId::new(2));
        assert_eq!(doc.arena.len(), 3);
        let literal = doc.arena.get(NodeId::new(1)).unwrap();
        assert_eq!(literal.attr("value"), Some(&FieldValue::from(1i64)));
        assert_eq!(literal.attr("type"), None);
        let op = doc.arena.get(doc.root).unwrap();
        assert_eq!(op.children(), vec![NodeId::new(0), NodeId::new(1)]);
    }

    #[test]
    fn maps_special_objects() {
        let cid = format!("sha-256:{}", "ab".repeat(32));
        let text = format!(
            r#"{{"root": 0, "nodes": [{{"kind": "Literal", "fields": {{
                "value": {{"f64": "7ff8000000000000"}},
                "origin": {{"cid": "{cid}"}}
            }}}}]}}"#
        );
        let doc = Document::from_json(&text).unwrap();
        let node = doc.arena.get(doc.root).unwrap();
        match node.attr("value") {
            Some(FieldValue::Scalar(Scalar::Float(f))) => assert!(f.is_nan()),
            other => panic!("unexpected value {other:?}"),
        }
        assert_eq!(
            node.attr("origin"),
            Some(&FieldValue::Cid(Cid::parse(&cid).unwrap()))
        );
    }

    #[test]
    fn plain_objects_become_maps() {
        let doc = Document::from_json(
            r#"{"root": 0, "nodes": [{"kind": "Constraint", "fields": {
                "predicate": "range", "params": {"min": 0, "max": 1.5}
            }}]}"#,
        )
        .unwrap();
        let node = doc.arena.get(doc.root).unwrap();
        assert!(matches!(node.attr("params"), Some(FieldValue::Map(entries)) if entries.len() == 2));
    }

    #[test]
    fn map_wrapper_escapes_wrapper_keys() {
        let doc = Document::from_json(
            r#"{"root": 0, "nodes": [{"kind": "Constraint", "fields": {
                "predicate": "tagged", "params": {"map": {"node": "n", "f64": 2}}
            }}]}"#,
        )
        .unwrap();
        let node = doc.arena.get(doc.root).unwrap();
        assert_eq!(
            node.attr("params"),
            Some(&FieldValue::Map(vec![
                ("f64".to_string(), FieldValue::from(2i64)),
                ("node".to_string(), FieldValue::from("n")),
            ]))
        );

        let empty = Document::from_json(
            r#"{"root": 0, "nodes": [{"kind": "Unit", "fields": {"params": {"map": {}}}}]}"#,
        )
        .unwrap();
        assert_eq!(
            empty.arena.get(empty.root).unwrap().attr("params"),
            Some(&FieldValue::Map(Vec::new()))
        );

        assert!(matches!(
            Document::from_json(
                r#"{"root": 0, "nodes": [{"kind": "Constraint", "fields": {"params": {"map": 3}}}]}"#
            ),
            Err(DocumentError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(matches!(
            Document::from_json(r#"{"root": 1, "nodes": [{"kind": "Var"}]}"#),
            Err(DocumentError::UnknownRoot { root: 1, len: 1 })
        ));
        assert!(matches!(
            Document::from_json(r#"{"root": 0, "nodes": [{"kind": "Goto"}]}"#),
            Err(DocumentError::Kind { node: 0, .. })
        ));
        assert!(matches!(
            Document::from_json(
                r#"{"root": 0, "nodes": [{"kind": "Var", "fields": {"name": {"node": 5}}}]}"#
            ),
            Err(DocumentError::InvalidValue { .. })
        ));
        assert!(matches!(
            Document::from_json(
                r#"{"root": 0, "nodes": [{"kind": "Literal", "fields": {"value": 18446744073709551615}}]}"#
            ),
            Err(DocumentError::InvalidValue { .. })
        ));
        assert!(matches!(
            Document::from_json("not json"),
            Err(DocumentError::Json(_))
        ));
    }
}
