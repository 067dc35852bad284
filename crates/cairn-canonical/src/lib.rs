//! Canonical data model for the cairn node algebra.
//!
//! This crate owns everything that decides identity: the closed set of node
//! kinds and their slot schemas, the arena that holds a document's nodes, the
//! classifier that separates semantic slots from contextual metadata, DAG
//! validation, reduction to normal form, the deterministic byte encoding, and
//! content identifiers. Two nodes with the same normal form encode to the same
//! bytes and therefore share a CID.
//!
#![deny(missing_docs)]

/// Normal-form reduction and canonicalization errors.
pub mod canonicalizer;
/// Content identifiers and digest algorithms.
pub mod cid;
pub mod classify;
pub mod dag;
pub mod encoding;
/// Hygiene report types emitted during canonicalization.
pub mod hygiene;
/// The closed set of node kinds.
pub mod kind;
pub mod node;
pub mod normal;
/// Structural paths used in error reporting.
pub mod path;
pub mod reference;
pub mod render;
/// Slot schemas for every node kind.
pub mod schema;
/// Validation errors for textual primitives.
pub mod validation;

pub use canonicalizer::{
    normalize_string, CanonicalizationError, Canonicalizer, ChildCids, ErrorClass,
};
pub use cid::{Cid, CidAlg, DIGEST_LEN, NODE_DOMAIN_SEPARATOR};
pub use classify::{classify, ContextualFields, SemanticFields, SemanticSlot};
pub use dag::{topological_order, validate, Traversal};
pub use encoding::{decode, encode, DecodeError};
pub use hygiene::{HygieneReport, HygieneStatus, HygieneWarning};
pub use kind::{KindSet, NodeKind, KIND_NAMESPACE};
pub use node::{FieldValue, Node, NodeArena, NodeId, Scalar};
pub use normal::{NormalForm, NormalValue, CANONICAL_NAN_BITS};
pub use path::{Element, NodePath, PathStep};
pub use reference::resolve_reference;
pub use render::{parse_rendering, render, RenderError};
pub use schema::{Arity, ScalarType, SlotSchema, SlotType};
pub use validation::ValidationError;
