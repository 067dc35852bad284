//! Content-addressed storage for canonical cairn nodes.
//!
//! This crate provides:
//! - The [`BlobStore`] trait: canonical bytes keyed by CID
//! - [`MemoryStore`] for in-process use and tests
//! - [`PackStore`], persisted to an append-only `cairn-pack` file
//! - Helpers to store a hash output and to walk stored DAGs
//!
//! The store is the only index required for correctness: every blob can be
//! re-verified from its own bytes and CID.

#![deny(missing_docs)]

pub mod error;
/// In-memory backend.
pub mod memory;
/// Pack-file backend.
pub mod pack;
/// Storage backend trait.
pub mod traits;
pub mod view;

pub use cairn_pack::{ReadMode, WriteOptions};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use pack::PackStore;
pub use traits::BlobStore;
pub use view::{load_normal_form, reachable, store_output, Reachability};
