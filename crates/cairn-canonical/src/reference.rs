//! Cross-artifact references.
//!
//! A slot of type [`SlotType::Reference`](crate::schema::SlotType::Reference)
//! points at another top-level artifact. Resolving names to CIDs is the
//! producer's job; here the value must already be a CID, so each document
//! hashes on its own and composition happens only through immutable pointers.

use crate::canonicalizer::CanonicalizationError;
use crate::cid::Cid;
use crate::kind::KindSet;
use crate::node::FieldValue;
use crate::path::NodePath;

/// Returns the CID held by a reference slot.
///
/// # Errors
///
/// - [`CanonicalizationError::UnresolvedReference`] for inline substructure.
/// - [`CanonicalizationError::SchemaViolation`] for any other non-CID value.
pub fn resolve_reference(
    value: &FieldValue,
    expected: KindSet,
    path: &NodePath,
) -> Result<Cid, CanonicalizationError> {
    match value {
        FieldValue::Cid(cid) => Ok(*cid),
        FieldValue::Node(id) => Err(CanonicalizationError::UnresolvedReference {
            path: path.clone(),
            reason: format!(
                "inline node {id} where a CID of a {} artifact is required",
                expected.name()
            ),
        }),
        other => Err(CanonicalizationError::SchemaViolation {
            path: path.clone(),
            reason: format!(
                "reference to a {} artifact must be a CID, found {}",
                expected.name(),
                other.shape()
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cid::CidAlg;
    use crate::node::NodeId;

    #[test]
    fn accepts_cids() {
        let cid = Cid::of_canonical_bytes(CidAlg::Blake3, b"unit");
        let got = resolve_reference(&FieldValue::Cid(cid), KindSet::UNIT, &NodePath::root());
        assert_eq!(got.unwrap(), cid);
    }

    #[test]
    fn rejects_inline_nodes() {
        let err = resolve_reference(
            &FieldValue::Node(NodeId::new(0)),
            KindSet::UNIT,
            &NodePath::root(),
        )
        .unwrap_err();
        assert!(matches!(err, CanonicalizationError::UnresolvedReference { .. }));
    }

    #[test]
    fn rejects_names() {
        let err = resolve_reference(&FieldValue::from("math.add"), KindSet::UNIT, &NodePath::root())
            .unwrap_err();
        assert!(matches!(err, CanonicalizationError::SchemaViolation { .. }));
    }
}
