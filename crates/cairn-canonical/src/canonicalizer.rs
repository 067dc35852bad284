use std::collections::{BTreeMap, HashMap};

use unicode_normalization::{is_nfc_quick, IsNormalized, UnicodeNormalization};

use crate::cid::Cid;
use crate::classify::{classify_at, SemanticSlot};
use crate::hygiene::{HygieneReport, HygieneWarning};
use crate::kind::NodeKind;
use crate::node::{FieldValue, NodeArena, NodeId, Scalar};
use crate::normal::{canonical_float_bits, NormalForm, NormalValue};
use crate::path::{Element, NodePath, PathStep};
use crate::reference::resolve_reference;
use crate::schema::{self, Arity, SlotType};

/// Error returned when canonicalization fails.
///
/// Every variant is terminal for the request: no partial normal form or CID is
/// ever produced for an invalid structure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizationError {
    /// A kind tag outside the closed set.
    #[error("unknown node kind '{0}'")]
    UnknownNodeKind(String),
    /// A slot's arity, value type, or child-kind constraint was violated.
    #[error("schema violation at {path}: {reason}")]
    SchemaViolation {
        /// Location of the offending slot.
        path: NodePath,
        /// What was wrong.
        reason: String,
    },
    /// A node is reachable from itself.
    #[error("cycle detected at {path} (back edge to {node})")]
    CycleDetected {
        /// Path from the root to the back edge.
        path: NodePath,
        /// Handle the back edge points at.
        node: NodeId,
    },
    /// A reference slot held inline substructure instead of a CID.
    #[error("unresolved reference at {path}: {reason}")]
    UnresolvedReference {
        /// Location of the reference slot.
        path: NodePath,
        /// What was found instead.
        reason: String,
    },
    /// A child was canonicalized before its parent had a CID for it.
    #[error("child {node} at {path} has no CID yet")]
    ChildNotHashed {
        /// Location of the child slot.
        path: NodePath,
        /// Child handle.
        node: NodeId,
    },
    /// A string could not be brought into NFC.
    #[error("normalization failed at {path}: {reason}")]
    NormalizationError {
        /// Location of the string.
        path: NodePath,
        /// Failure detail.
        reason: String,
    },
}

/// Broad error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Shape problems: cycles, unknown kinds, schema and reference violations.
    Structural,
    /// Scalar values that cannot be normalized.
    Normalization,
}

impl CanonicalizationError {
    /// Taxonomy class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            CanonicalizationError::NormalizationError { .. } => ErrorClass::Normalization,
            _ => ErrorClass::Structural,
        }
    }

    /// Path carried by the error, if any.
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            CanonicalizationError::UnknownNodeKind(_) => None,
            CanonicalizationError::SchemaViolation { path, .. }
            | CanonicalizationError::CycleDetected { path, .. }
            | CanonicalizationError::UnresolvedReference { path, .. }
            | CanonicalizationError::ChildNotHashed { path, .. }
            | CanonicalizationError::NormalizationError { path, .. } => Some(path),
        }
    }
}

/// Source of already-computed child CIDs.
pub trait ChildCids {
    /// CID of `id`, if it has been hashed.
    fn child_cid(&self, id: NodeId) -> Option<Cid>;
}

impl ChildCids for HashMap<NodeId, Cid> {
    fn child_cid(&self, id: NodeId) -> Option<Cid> {
        self.get(&id).copied()
    }
}

impl ChildCids for BTreeMap<NodeId, Cid> {
    fn child_cid(&self, id: NodeId) -> Option<Cid> {
        self.get(&id).copied()
    }
}

/// NFC-normalizes `s`, failing if the result does not pass the NFC quick check.
pub fn normalize_string(s: &str, path: &NodePath) -> Result<String, CanonicalizationError> {
    if is_nfc_quick(s.chars()) == IsNormalized::Yes {
        return Ok(s.to_string());
    }
    let normalized: String = s.nfc().collect();
    if is_nfc_quick(normalized.chars()) == IsNormalized::No {
        return Err(CanonicalizationError::NormalizationError {
            path: path.clone(),
            reason: "NFC output is not stable under re-normalization".to_string(),
        });
    }
    Ok(normalized)
}

/// Reduces single nodes of an arena to normal form.
///
/// Children are never visited recursively: their CIDs come from a
/// [`ChildCids`] source, which the content hasher fills bottom-up.
pub struct Canonicalizer<'a> {
    arena: &'a NodeArena,
}

struct Pass<'r> {
    report: Option<&'r mut HygieneReport>,
}

impl Pass<'_> {
    fn warn(&mut self, warning: HygieneWarning) {
        if let Some(report) = self.report.as_deref_mut() {
            report.warn(warning);
        }
    }
}

impl<'a> Canonicalizer<'a> {
    /// Creates a canonicalizer over `arena`.
    pub fn new(arena: &'a NodeArena) -> Self {
        Self { arena }
    }

    /// Produces the normal form of node `id`.
    ///
    /// `path` locates the node in the document and prefixes error paths.
    pub fn canonicalize(
        &self,
        id: NodeId,
        children: &dyn ChildCids,
        path: &NodePath,
    ) -> Result<NormalForm, CanonicalizationError> {
        self.run(id, children, path, &mut Pass { report: None })
    }

    /// Produces the normal form of node `id`, recording rewrites in `report`.
    ///
    /// On failure the report is marked invalid.
    pub fn canonicalize_with_report(
        &self,
        id: NodeId,
        children: &dyn ChildCids,
        path: &NodePath,
        report: &mut HygieneReport,
    ) -> Result<NormalForm, CanonicalizationError> {
        report.bump("nodes");
        let result = self.run(
            id,
            children,
            path,
            &mut Pass {
                report: Some(&mut *report),
            },
        );
        if result.is_err() {
            report.invalidate();
        }
        result
    }

    fn run(
        &self,
        id: NodeId,
        children: &dyn ChildCids,
        path: &NodePath,
        pass: &mut Pass<'_>,
    ) -> Result<NormalForm, CanonicalizationError> {
        let node = self
            .arena
            .get(id)
            .ok_or_else(|| CanonicalizationError::SchemaViolation {
                path: path.clone(),
                reason: format!("handle {id} is not in the arena"),
            })?;
        let kind = node.kind();
        let (semantic, _contextual) = classify_at(node, path)?;

        for (left, right) in schema::paired_slots(kind) {
            let len = |name: &str| match semantic.get(name).and_then(|s| s.value) {
                Some(FieldValue::List(items)) => items.len(),
                _ => 0,
            };
            if len(left) != len(right) {
                return Err(CanonicalizationError::SchemaViolation {
                    path: path.clone(),
                    reason: format!(
                        "'{left}' has {} entries but '{right}' has {}",
                        len(left),
                        len(right)
                    ),
                });
            }
        }

        let values = semantic
            .slots()
            .iter()
            .map(|slot| self.slot(kind, slot, children, path, pass))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NormalForm::from_parts(kind, values))
    }

    fn slot(
        &self,
        kind: NodeKind,
        slot: &SemanticSlot<'_>,
        children: &dyn ChildCids,
        path: &NodePath,
        pass: &mut Pass<'_>,
    ) -> Result<NormalValue, CanonicalizationError> {
        let step = PathStep {
            kind,
            slot: Some(slot.index),
            name: slot.schema.name.to_string(),
            element: None,
        };
        let here = path.push(step.clone());
        let violation = |reason: String| CanonicalizationError::SchemaViolation {
            path: here.clone(),
            reason,
        };

        match (slot.schema.arity, slot.value) {
            (Arity::Optional, None) => Ok(NormalValue::Absent),
            (Arity::Required, None) => Err(violation("required slot is missing".to_string())),
            (Arity::Sequence, None) | (Arity::Named, None) => Err(violation(
                "collection slot is missing; supply an empty collection instead".to_string(),
            )),
            (Arity::Required | Arity::Optional, Some(value)) => {
                self.element(value, slot.schema.ty, children, &here, pass)
            }
            (Arity::Sequence, Some(FieldValue::List(items))) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    let at = path.push(PathStep {
                        element: Some(Element::Index(idx)),
                        ..step.clone()
                    });
                    self.element(item, slot.schema.ty, children, &at, pass)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(NormalValue::List),
            (Arity::Named, Some(FieldValue::Map(entries))) => {
                let mut normalized = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let at = path.push(PathStep {
                        element: Some(Element::Key(key.clone())),
                        ..step.clone()
                    });
                    let canonical_key = normalize_string(key, &at)?;
                    if canonical_key != *key {
                        pass.warn(HygieneWarning::NfcRewritten);
                    }
                    let value = self.element(item, slot.schema.ty, children, &at, pass)?;
                    normalized.push((canonical_key, value));
                }
                let in_order = normalized
                    .windows(2)
                    .all(|w| w[0].0.as_bytes() <= w[1].0.as_bytes());
                if !in_order {
                    pass.warn(HygieneWarning::MapReordered);
                    normalized.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
                }
                if let Some(dup) = normalized.windows(2).find(|w| w[0].0 == w[1].0) {
                    return Err(violation(format!("duplicate key {:?}", dup[0].0)));
                }
                Ok(NormalValue::Map(normalized))
            }
            (Arity::Sequence, Some(other)) => {
                Err(violation(format!("expected a list, found {}", other.shape())))
            }
            (Arity::Named, Some(other)) => {
                Err(violation(format!("expected a map, found {}", other.shape())))
            }
        }
    }

    fn element(
        &self,
        value: &FieldValue,
        ty: SlotType,
        children: &dyn ChildCids,
        path: &NodePath,
        pass: &mut Pass<'_>,
    ) -> Result<NormalValue, CanonicalizationError> {
        let violation = |reason: String| CanonicalizationError::SchemaViolation {
            path: path.clone(),
            reason,
        };
        match ty {
            SlotType::Scalar(expected) => match value {
                FieldValue::Scalar(scalar) if scalar.conforms_to(expected) => {
                    self.scalar(scalar, path, pass)
                }
                other => Err(violation(format!(
                    "expected {}, found {}",
                    expected.name(),
                    other.shape()
                ))),
            },
            SlotType::Child(set) => match value {
                FieldValue::Node(child) => {
                    let child_kind = self
                        .arena
                        .get(*child)
                        .map(|n| n.kind())
                        .ok_or_else(|| violation(format!("child handle {child} is not in the arena")))?;
                    if !set.contains(child_kind) {
                        return Err(violation(format!(
                            "{child_kind} is not a {} kind",
                            set.name()
                        )));
                    }
                    children
                        .child_cid(*child)
                        .map(NormalValue::Cid)
                        .ok_or_else(|| CanonicalizationError::ChildNotHashed {
                            path: path.clone(),
                            node: *child,
                        })
                }
                FieldValue::Cid(cid) => Ok(NormalValue::Cid(*cid)),
                other => Err(violation(format!(
                    "expected a {} child, found {}",
                    set.name(),
                    other.shape()
                ))),
            },
            SlotType::Reference(set) => resolve_reference(value, set, path).map(NormalValue::Cid),
        }
    }

    fn scalar(
        &self,
        scalar: &Scalar,
        path: &NodePath,
        pass: &mut Pass<'_>,
    ) -> Result<NormalValue, CanonicalizationError> {
        Ok(match scalar {
            Scalar::Bool(b) => NormalValue::Bool(*b),
            Scalar::Int(i) => NormalValue::Int(*i),
            Scalar::Float(f) => {
                let bits = canonical_float_bits(*f);
                if bits != f.to_bits() {
                    pass.warn(HygieneWarning::NanCanonicalized);
                }
                NormalValue::Float(bits)
            }
            Scalar::Str(s) => {
                let normalized = normalize_string(s, path)?;
                if normalized != *s {
                    pass.warn(HygieneWarning::NfcRewritten);
                }
                NormalValue::Str(normalized)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cid::CidAlg;
    use crate::node::Node;

    fn no_children() -> HashMap<NodeId, Cid> {
        HashMap::new()
    }

    fn single(node: Node) -> (NodeArena, NodeId) {
        let mut arena = NodeArena::new();
        let id = arena.insert(node);
        (arena, id)
    }

    #[test]
    fn literal_ignores_contextual_fields() {
        let (arena_a, a) = single(
            Node::new(NodeKind::Literal)
                .with("value", "10")
                .with("type", "Int32")
                .with("author", "alice"),
        );
        let (arena_b, b) = single(
            Node::new(NodeKind::Literal)
                .with("value", "10")
                .with("type", "Int32")
                .with("author", "bob"),
        );
        let fa = Canonicalizer::new(&arena_a)
            .canonicalize(a, &no_children(), &NodePath::root())
            .unwrap();
        let fb = Canonicalizer::new(&arena_b)
            .canonicalize(b, &no_children(), &NodePath::root())
            .unwrap();
        assert_eq!(fa, fb);
    }

    #[test]
    fn optional_absent_is_explicit() {
        let (arena, id) = single(Node::new(NodeKind::Literal).with("value", 1));
        let form = Canonicalizer::new(&arena)
            .canonicalize(id, &no_children(), &NodePath::root())
            .unwrap();
        assert_eq!(form.get("type"), Some(&NormalValue::Absent));
    }

    #[test]
    fn missing_required_slot_is_violation() {
        let (arena, id) = single(Node::new(NodeKind::Var));
        let err = Canonicalizer::new(&arena)
            .canonicalize(id, &no_children(), &NodePath::root())
            .unwrap_err();
        assert!(matches!(err, CanonicalizationError::SchemaViolation { ref path, .. } if path.to_string() == "Var.name"));
    }

    #[test]
    fn named_maps_sort_by_key_bytes() {
        let (arena, id) = single(
            Node::new(NodeKind::Constraint)
                .with("predicate", "range")
                .with("params", FieldValue::map([("max", 10), ("min", 0), ("Max", 3)])),
        );
        let mut report = HygieneReport::default();
        let form = Canonicalizer::new(&arena)
            .canonicalize_with_report(id, &no_children(), &NodePath::root(), &mut report)
            .unwrap();
        let NormalValue::Map(entries) = form.get("params").unwrap() else {
            panic!("params is not a map");
        };
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["Max", "max", "min"]);
        assert!(report.warnings.contains(&HygieneWarning::MapReordered));
    }

    #[test]
    fn keys_colliding_after_nfc_are_rejected() {
        let (arena, id) = single(
            Node::new(NodeKind::Constraint)
                .with("predicate", "p")
                .with(
                    "params",
                    FieldValue::map([("caf\u{e9}", 1), ("cafe\u{301}", 2)]),
                ),
        );
        let err = Canonicalizer::new(&arena)
            .canonicalize(id, &no_children(), &NodePath::root())
            .unwrap_err();
        assert!(matches!(err, CanonicalizationError::SchemaViolation { .. }));
    }

    #[test]
    fn strings_are_nfc_normalized() {
        let (arena, id) = single(Node::new(NodeKind::Var).with("name", "cafe\u{301}"));
        let mut report = HygieneReport::default();
        let form = Canonicalizer::new(&arena)
            .canonicalize_with_report(id, &no_children(), &NodePath::root(), &mut report)
            .unwrap();
        assert_eq!(form.get("name"), Some(&NormalValue::Str("caf\u{e9}".into())));
        assert_eq!(report.metrics["nfc_rewrites"], 1);
        assert_eq!(
            normalize_string("caf\u{e9}", &NodePath::root()).unwrap(),
            "caf\u{e9}"
        );
    }

    #[test]
    fn child_kind_constraints_are_enforced() {
        let mut arena = NodeArena::new();
        let ty = arena.insert(Node::new(NodeKind::PrimitiveType).with("name", "Int32"));
        let op = arena.insert(
            Node::new(NodeKind::BinOp)
                .with("op", "+")
                .with("left", ty)
                .with("right", ty),
        );
        let mut cids = HashMap::new();
        cids.insert(ty, Cid::of_canonical_bytes(CidAlg::Blake3, b"t"));
        let err = Canonicalizer::new(&arena)
            .canonicalize(op, &cids, &NodePath::root())
            .unwrap_err();
        assert!(err.to_string().contains("not a Expression kind"));
    }

    #[test]
    fn children_must_be_hashed_first() {
        let mut arena = NodeArena::new();
        let a = arena.insert(Node::new(NodeKind::Var).with("name", "a"));
        let block = arena.insert(
            Node::new(NodeKind::Block).with("statements", FieldValue::list([a])),
        );
        let err = Canonicalizer::new(&arena)
            .canonicalize(block, &no_children(), &NodePath::root())
            .unwrap_err();
        assert!(matches!(err, CanonicalizationError::ChildNotHashed { node, .. } if node == a));
    }

    #[test]
    fn inline_reference_is_unresolved() {
        let mut arena = NodeArena::new();
        let unit = arena.insert(Node::new(NodeKind::Var).with("name", "f"));
        let call = arena.insert(
            Node::new(NodeKind::Call)
                .with("target", unit)
                .with("args", FieldValue::List(vec![]))
                .with("named_args", FieldValue::Map(vec![])),
        );
        let err = Canonicalizer::new(&arena)
            .canonicalize(call, &no_children(), &NodePath::root())
            .unwrap_err();
        assert!(matches!(err, CanonicalizationError::UnresolvedReference { .. }));
        assert_eq!(err.class(), ErrorClass::Structural);
    }

    #[test]
    fn match_patterns_and_arms_must_pair() {
        let mut arena = NodeArena::new();
        let x = arena.insert(Node::new(NodeKind::Var).with("name", "x"));
        let m = arena.insert(
            Node::new(NodeKind::Match)
                .with("scrutinee", x)
                .with("patterns", FieldValue::list([x]))
                .with("arms", FieldValue::List(vec![])),
        );
        let err = Canonicalizer::new(&arena)
            .canonicalize(m, &no_children(), &NodePath::root())
            .unwrap_err();
        assert!(err.to_string().contains("'patterns' has 1 entries"));
    }

    #[test]
    fn nan_payload_is_reported() {
        let (arena, id) = single(
            Node::new(NodeKind::Literal).with("value", f64::from_bits(0x7ff0_0000_0000_0001)),
        );
        let mut report = HygieneReport::default();
        let form = Canonicalizer::new(&arena)
            .canonicalize_with_report(id, &no_children(), &NodePath::root(), &mut report)
            .unwrap();
        assert_eq!(
            form.get("value"),
            Some(&NormalValue::Float(crate::normal::CANONICAL_NAN_BITS))
        );
        assert!(report.warnings.contains(&HygieneWarning::NanCanonicalized));
    }
}
