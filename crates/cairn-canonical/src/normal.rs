//! Normal form: the ordered, absence-explicit reduction of a node's semantic
//! content, with children replaced by CIDs.

use crate::cid::Cid;
use crate::kind::NodeKind;
use crate::schema::{self, Arity, ScalarType, SlotSchema, SlotType};

/// IEEE-754 bit pattern every NaN collapses to.
pub const CANONICAL_NAN_BITS: u64 = 0x7ff8_0000_0000_0000;

/// Maps a float to its canonical bit pattern.
///
/// NaN payloads collapse to [`CANONICAL_NAN_BITS`]; every other value keeps its
/// exact bits, so `-0.0` and `0.0` stay distinct.
pub fn canonical_float_bits(value: f64) -> u64 {
    if value.is_nan() {
        CANONICAL_NAN_BITS
    } else {
        value.to_bits()
    }
}

/// Returns `true` if `bits` is a canonical float pattern.
pub fn is_canonical_float_bits(bits: u64) -> bool {
    !f64::from_bits(bits).is_nan() || bits == CANONICAL_NAN_BITS
}

/// One normalized slot value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NormalValue {
    /// Explicit absence of an optional slot.
    Absent,
    /// Boolean.
    Bool(bool),
    /// Fixed-width two's-complement integer.
    Int(i64),
    /// Canonical IEEE-754 bit pattern.
    Float(u64),
    /// NFC-normalized string.
    Str(String),
    /// Child or referenced artifact.
    Cid(Cid),
    /// Ordered list (possibly empty).
    List(Vec<NormalValue>),
    /// Entries sorted by key bytes, keys unique.
    Map(Vec<(String, NormalValue)>),
}

impl NormalValue {
    /// Diagnostic name of the value's shape.
    pub fn shape(&self) -> &'static str {
        match self {
            NormalValue::Absent => "absent",
            NormalValue::Bool(_) => "bool",
            NormalValue::Int(_) => "integer",
            NormalValue::Float(_) => "float",
            NormalValue::Str(_) => "string",
            NormalValue::Cid(_) => "cid",
            NormalValue::List(_) => "list",
            NormalValue::Map(_) => "map",
        }
    }

    /// Pushes every CID embedded in this value, depth-first.
    pub fn collect_cids(&self, out: &mut Vec<Cid>) {
        match self {
            NormalValue::Cid(cid) => out.push(*cid),
            NormalValue::List(items) => items.iter().for_each(|v| v.collect_cids(out)),
            NormalValue::Map(entries) => entries.iter().for_each(|(_, v)| v.collect_cids(out)),
            NormalValue::Absent
            | NormalValue::Bool(_)
            | NormalValue::Int(_)
            | NormalValue::Float(_)
            | NormalValue::Str(_) => {}
        }
    }
}

/// Normal form of one node: its kind and one value per declared slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalForm {
    kind: NodeKind,
    values: Vec<NormalValue>,
}

impl NormalForm {
    /// Assembles a normal form. `values` must align with the kind's schema.
    pub(crate) fn from_parts(kind: NodeKind, values: Vec<NormalValue>) -> Self {
        debug_assert_eq!(values.len(), schema::slots(kind).len());
        Self { kind, values }
    }

    /// Node kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Slot values in declared order.
    pub fn values(&self) -> &[NormalValue] {
        &self.values
    }

    /// `(slot name, value)` pairs in declared order.
    pub fn slots(&self) -> impl Iterator<Item = (&'static str, &NormalValue)> {
        schema::slots(self.kind)
            .iter()
            .map(|s| s.name)
            .zip(self.values.iter())
    }

    /// Value of the named slot.
    pub fn get(&self, name: &str) -> Option<&NormalValue> {
        schema::slot_index(self.kind, name).and_then(|i| self.values.get(i))
    }

    /// Every CID referenced by this node, in slot order.
    pub fn cids(&self) -> Vec<Cid> {
        let mut out = Vec::new();
        for value in &self.values {
            value.collect_cids(&mut out);
        }
        out
    }
}

/// Checks decoded slot values against `kind`'s schema.
///
/// Accepts exactly the shapes canonicalization emits: arity, element type,
/// and paired lengths. `values` must already hold one entry per slot.
pub(crate) fn check_shape(kind: NodeKind, values: &[NormalValue]) -> Result<(), String> {
    for (slot, value) in schema::slots(kind).iter().zip(values) {
        match (slot.arity, value) {
            (Arity::Optional, NormalValue::Absent) => {}
            (Arity::Required | Arity::Optional, element) => check_element(kind, slot, element)?,
            (Arity::Sequence, NormalValue::List(items)) => {
                for item in items {
                    check_element(kind, slot, item)?;
                }
            }
            (Arity::Named, NormalValue::Map(entries)) => {
                for (_, item) in entries {
                    check_element(kind, slot, item)?;
                }
            }
            (Arity::Sequence, other) | (Arity::Named, other) => {
                return Err(format!(
                    "{kind}.{} must be a {}, found {}",
                    slot.name,
                    if slot.arity == Arity::Sequence { "list" } else { "map" },
                    other.shape()
                ));
            }
        }
    }
    for (left, right) in schema::paired_slots(kind) {
        let len = |name: &str| match schema::slot_index(kind, name).and_then(|i| values.get(i)) {
            Some(NormalValue::List(items)) => items.len(),
            _ => 0,
        };
        if len(left) != len(right) {
            return Err(format!(
                "{kind}.{left} has {} entries but {kind}.{right} has {}",
                len(left),
                len(right)
            ));
        }
    }
    Ok(())
}

fn check_element(kind: NodeKind, slot: &SlotSchema, value: &NormalValue) -> Result<(), String> {
    let fits = match (slot.ty, value) {
        (SlotType::Child(_) | SlotType::Reference(_), NormalValue::Cid(_)) => true,
        (SlotType::Scalar(ty), NormalValue::Bool(_)) => matches!(ty, ScalarType::Bool | ScalarType::Any),
        (SlotType::Scalar(ty), NormalValue::Int(_)) => matches!(ty, ScalarType::Int | ScalarType::Any),
        (SlotType::Scalar(ty), NormalValue::Float(_)) => {
            matches!(ty, ScalarType::Float | ScalarType::Any)
        }
        (SlotType::Scalar(ty), NormalValue::Str(_)) => matches!(ty, ScalarType::Str | ScalarType::Any),
        _ => false,
    };
    if fits {
        return Ok(());
    }
    let expected = match slot.ty {
        SlotType::Scalar(ty) => ty.name(),
        SlotType::Child(_) | SlotType::Reference(_) => "cid",
    };
    Err(format!(
        "{kind}.{} holds {}, expected {expected}",
        slot.name,
        value.shape()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_payloads_collapse() {
        let quiet = f64::NAN;
        let payload = f64::from_bits(0x7ff0_0000_0000_0001);
        let negative = f64::from_bits(0xfff8_0000_0000_0000);
        for nan in [quiet, payload, negative] {
            assert_eq!(canonical_float_bits(nan), CANONICAL_NAN_BITS);
        }
        assert!(!is_canonical_float_bits(0xfff8_0000_0000_0000));
    }

    #[test]
    fn signed_zero_and_infinities_keep_bits() {
        assert_ne!(canonical_float_bits(0.0), canonical_float_bits(-0.0));
        assert_eq!(canonical_float_bits(f64::INFINITY), 0x7ff0_0000_0000_0000);
        assert_eq!(canonical_float_bits(f64::NEG_INFINITY), 0xfff0_0000_0000_0000);
    }

    #[test]
    fn slots_pair_names_with_values() {
        let form = NormalForm::from_parts(
            NodeKind::Var,
            vec![NormalValue::Str("a".into())],
        );
        let slots: Vec<_> = form.slots().collect();
        assert_eq!(slots, vec![("name", &NormalValue::Str("a".into()))]);
        assert!(form.cids().is_empty());
    }
}
