//! Separation of semantic slots from contextual metadata.
//!
//! Semantic fields are exactly the kind's declared slots, in declared order.
//! Everything else on the node is contextual and never reaches later stages.

use std::collections::BTreeMap;

use crate::canonicalizer::CanonicalizationError;
use crate::kind::NodeKind;
use crate::node::{FieldValue, Node, Scalar};
use crate::path::{NodePath, PathStep};
use crate::schema::{self, SlotSchema};

/// One declared slot together with the value the producer supplied, if any.
#[derive(Debug, Clone, Copy)]
pub struct SemanticSlot<'a> {
    /// Declared position.
    pub index: usize,
    /// Slot schema.
    pub schema: &'static SlotSchema,
    /// Supplied value; `None` means absent.
    pub value: Option<&'a FieldValue>,
}

/// Declared slots of one node, in schema order.
#[derive(Debug, Clone)]
pub struct SemanticFields<'a> {
    kind: NodeKind,
    slots: Vec<SemanticSlot<'a>>,
}

impl<'a> SemanticFields<'a> {
    /// Node kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Slots in declared order.
    pub fn slots(&self) -> &[SemanticSlot<'a>] {
        &self.slots
    }

    /// Looks up a slot by name.
    pub fn get(&self, name: &str) -> Option<&SemanticSlot<'a>> {
        self.slots.iter().find(|s| s.schema.name == name)
    }
}

/// Shadow record of contextual metadata, carried alongside the semantic fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextualFields<'a> {
    entries: BTreeMap<&'a str, &'a Scalar>,
}

impl<'a> ContextualFields<'a> {
    /// Metadata lookup.
    pub fn get(&self, name: &str) -> Option<&'a Scalar> {
        self.entries.get(name).copied()
    }

    /// Entries ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Scalar)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    /// Number of contextual entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there is no metadata.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits `node` into semantic slots and contextual metadata.
pub fn classify(
    node: &Node,
) -> Result<(SemanticFields<'_>, ContextualFields<'_>), CanonicalizationError> {
    classify_at(node, &NodePath::root())
}

/// Like [`classify`], reporting violations relative to `path`.
pub fn classify_at<'a>(
    node: &'a Node,
    path: &NodePath,
) -> Result<(SemanticFields<'a>, ContextualFields<'a>), CanonicalizationError> {
    let kind = node.kind();
    let slots = schema::slots(kind)
        .iter()
        .enumerate()
        .map(|(index, schema)| SemanticSlot {
            index,
            schema,
            value: node.attr(schema.name),
        })
        .collect();

    let mut contextual = ContextualFields::default();
    for (name, value) in node.attrs() {
        if schema::slot_index(kind, name).is_some() {
            continue;
        }
        match value {
            FieldValue::Scalar(scalar) => {
                contextual.entries.insert(name, scalar);
            }
            other => {
                return Err(CanonicalizationError::SchemaViolation {
                    path: path.push(PathStep {
                        kind,
                        slot: None,
                        name: name.to_string(),
                        element: None,
                    }),
                    reason: format!(
                        "contextual field holds a {}; only scalars are allowed",
                        other.shape()
                    ),
                });
            }
        }
    }

    Ok((SemanticFields { kind, slots }, contextual))
}
