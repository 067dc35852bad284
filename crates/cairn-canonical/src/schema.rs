//! Semantic slot schemas for the closed node algebra.
//!
//! Each kind declares an ordered list of slots. The order is part of the wire
//! contract: normal forms list slots exactly in this order.

use crate::kind::{KindSet, NodeKind};

/// How many values a slot carries and how their order is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly one value.
    Required,
    /// Zero or one value; absence is encoded explicitly.
    Optional,
    /// Ordered list; order is semantic and preserved verbatim.
    Sequence,
    /// Unordered string-keyed map; sorted by key during canonicalization.
    Named,
}

/// Scalar value types accepted by scalar slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// UTF-8 string (NFC-normalized).
    Str,
    /// 64-bit signed integer.
    Int,
    /// IEEE-754 binary64.
    Float,
    /// Boolean.
    Bool,
    /// Any of the above.
    Any,
}

impl ScalarType {
    /// Diagnostic name.
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Str => "string",
            ScalarType::Int => "integer",
            ScalarType::Float => "float",
            ScalarType::Bool => "bool",
            ScalarType::Any => "scalar",
        }
    }
}

/// What each element of a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotType {
    /// A primitive value.
    Scalar(ScalarType),
    /// An in-document child node (or its precomputed CID).
    Child(KindSet),
    /// A pointer to another top-level artifact; must already be a CID.
    Reference(KindSet),
}

/// One declared semantic slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSchema {
    /// Slot name, also the attribute key producers use.
    pub name: &'static str,
    /// Cardinality and ordering semantics.
    pub arity: Arity,
    /// Element type.
    pub ty: SlotType,
}

const fn slot(name: &'static str, arity: Arity, ty: SlotType) -> SlotSchema {
    SlotSchema { name, arity, ty }
}

use Arity::{Named, Optional, Required, Sequence};
use SlotType::{Child, Reference, Scalar};

const UNIT: &[SlotSchema] = &[
    slot("name", Required, Scalar(ScalarType::Str)),
    slot("params", Named, Child(KindSet::TYPE)),
    slot("returns", Optional, Child(KindSet::TYPE)),
    slot("body", Required, Child(KindSet::EXPR)),
    slot("constraints", Sequence, Child(KindSet::CONSTRAINT)),
];

const BLOCK: &[SlotSchema] = &[
    slot("statements", Sequence, Child(KindSet::EXPR)),
    slot("result", Optional, Child(KindSet::EXPR)),
];

const LITERAL: &[SlotSchema] = &[
    slot("value", Required, Scalar(ScalarType::Any)),
    slot("type", Optional, Scalar(ScalarType::Str)),
];

const VAR: &[SlotSchema] = &[slot("name", Required, Scalar(ScalarType::Str))];

const CALL: &[SlotSchema] = &[
    slot("target", Required, Reference(KindSet::UNIT)),
    slot("args", Sequence, Child(KindSet::EXPR)),
    slot("named_args", Named, Child(KindSet::EXPR)),
];

const BIN_OP: &[SlotSchema] = &[
    slot("op", Required, Scalar(ScalarType::Str)),
    slot("left", Required, Child(KindSet::EXPR)),
    slot("right", Required, Child(KindSet::EXPR)),
];

const LOOP: &[SlotSchema] = &[
    slot("condition", Optional, Child(KindSet::EXPR)),
    slot("body", Required, Child(KindSet::BLOCK)),
];

const MATCH: &[SlotSchema] = &[
    slot("scrutinee", Required, Child(KindSet::EXPR)),
    slot("patterns", Sequence, Child(KindSet::EXPR)),
    slot("arms", Sequence, Child(KindSet::EXPR)),
    slot("default", Optional, Child(KindSet::EXPR)),
];

const PRIMITIVE_TYPE: &[SlotSchema] = &[
    slot("name", Required, Scalar(ScalarType::Str)),
    slot("bits", Optional, Scalar(ScalarType::Int)),
];

const COMPOSITE_TYPE: &[SlotSchema] = &[
    slot("name", Required, Scalar(ScalarType::Str)),
    slot("fields", Named, Child(KindSet::TYPE)),
];

const FUNCTION_TYPE: &[SlotSchema] = &[
    slot("params", Sequence, Child(KindSet::TYPE)),
    slot("returns", Required, Child(KindSet::TYPE)),
];

const ARRAY_TYPE: &[SlotSchema] = &[
    slot("element", Required, Child(KindSet::TYPE)),
    slot("length", Optional, Scalar(ScalarType::Int)),
];

const REFERENCE_TYPE: &[SlotSchema] = &[
    slot("target", Required, Reference(KindSet::TYPE)),
    slot("mutable", Required, Scalar(ScalarType::Bool)),
];

const CONSTRAINT: &[SlotSchema] = &[
    slot("predicate", Required, Scalar(ScalarType::Str)),
    slot("subject", Optional, Child(KindSet::TYPE)),
    slot("params", Named, Scalar(ScalarType::Any)),
];

/// Returns the ordered slot schema for `kind`.
pub fn slots(kind: NodeKind) -> &'static [SlotSchema] {
    match kind {
        NodeKind::Unit => UNIT,
        NodeKind::Block => BLOCK,
        NodeKind::Literal => LITERAL,
        NodeKind::Var => VAR,
        NodeKind::Call => CALL,
        NodeKind::BinOp => BIN_OP,
        NodeKind::Loop => LOOP,
        NodeKind::Match => MATCH,
        NodeKind::PrimitiveType => PRIMITIVE_TYPE,
        NodeKind::CompositeType => COMPOSITE_TYPE,
        NodeKind::FunctionType => FUNCTION_TYPE,
        NodeKind::ArrayType => ARRAY_TYPE,
        NodeKind::ReferenceType => REFERENCE_TYPE,
        NodeKind::Constraint => CONSTRAINT,
    }
}

/// Looks up a slot by name, returning its declared index.
pub fn slot_index(kind: NodeKind, name: &str) -> Option<usize> {
    slots(kind).iter().position(|s| s.name == name)
}

/// Pairs of `Sequence` slots whose lengths must agree.
pub fn paired_slots(kind: NodeKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        NodeKind::Match => &[("patterns", "arms")],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_declares_slots() {
        for kind in NodeKind::ALL {
            assert!(!slots(*kind).is_empty(), "{kind} has no slots");
        }
    }

    #[test]
    fn slot_names_are_unique_per_kind() {
        for kind in NodeKind::ALL {
            let names: Vec<_> = slots(*kind).iter().map(|s| s.name).collect();
            let mut deduped = names.clone();
            deduped.sort_unstable();
            deduped.dedup();
            assert_eq!(names.len(), deduped.len(), "{kind}");
        }
    }

    #[test]
    fn binop_preserves_left_right_declaration_order() {
        assert_eq!(slot_index(NodeKind::BinOp, "left"), Some(1));
        assert_eq!(slot_index(NodeKind::BinOp, "right"), Some(2));
        assert_eq!(slot_index(NodeKind::BinOp, "author"), None);
    }

    #[test]
    fn paired_slots_exist_in_schema() {
        for kind in NodeKind::ALL {
            for (a, b) in paired_slots(*kind) {
                assert!(slot_index(*kind, a).is_some());
                assert!(slot_index(*kind, b).is_some());
            }
        }
    }
}
