//! Content hashing for cairn node documents.
//!
//! This crate provides:
//! - Bottom-up CID computation with memoization by node handle
//! - Level-parallel hashing on the rayon pool
//! - Structural equality through root CIDs
//! - Loading node arenas from JSON documents
//!
//! Core invariants:
//! - Node CIDs are content-derived: `H(domain_separator || encode(normal_form))`
//! - Contextual fields never reach a hash input
//! - A document either hashes completely or fails with one terminal error
//!
#![deny(missing_docs)]

/// JSON document loading.
pub mod document;
/// Error types for core operations.
pub mod errors;
/// Bottom-up content hashing.
pub mod hasher;

pub use document::{Document, DocumentError};
pub use errors::CoreError;
pub use hasher::{structurally_equal, ContentHasher, HashOutput, HashSession, HasherConfig};
