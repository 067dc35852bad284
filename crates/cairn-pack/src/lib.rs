//! Append-only pack format for canonical node blobs.
//!
//! This crate provides:
//! - Framed, append-only storage of canonical bytes keyed by CID
//! - Reader/writer APIs with strict and permissive modes
//! - Verification of stored bytes against their CIDs
//!
//! ## Layout
//!
//! ```text
//! header  := "CNP1" u16le(version = 1) u16le(flags = 0) [0u8; 8]
//! frame   := u8(kind) [0u8; 3] u32le(len) payload[len]
//! blob    := u8(alg) digest[32] canonical_bytes        (kind 0x01)
//! ```
//!
//! Frames of unknown kind are skipped by readers. Payloads are capped at
//! [`MAX_PAYLOAD_SIZE`](frame::MAX_PAYLOAD_SIZE).
//!
//! ## Quick Start
//!
//! ```no_run
//! use cairn_canonical::{encode, Cid, CidAlg};
//! use cairn_pack::{BlobRecord, PackReader, PackWriter, ReadMode, WriteOptions};
//! # fn form() -> cairn_canonical::NormalForm { unimplemented!() }
//!
//! let bytes = encode(&form());
//! let cid = Cid::of_canonical_bytes(CidAlg::Blake3, &bytes);
//!
//! let mut writer = PackWriter::open("nodes.cnp", WriteOptions::default())?;
//! writer.append_blob(&BlobRecord::new(cid, bytes))?;
//! writer.finish()?;
//!
//! let mut reader = PackReader::open("nodes.cnp", ReadMode::Strict)?;
//! while let Some(blob) = reader.read_blob()? {
//!     assert!(cairn_pack::verify_record(&blob)?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

/// Blob frame payloads.
pub mod blob;
/// Error types for pack operations.
pub mod errors;
/// Header and frame structures.
pub mod frame;
pub mod reader;
pub mod verification;
pub mod writer;

pub use blob::BlobRecord;
pub use errors::PackError;
pub use frame::{FrameHeader, FrameKind, PackHeader};
pub use reader::{PackReader, ReadMode};
pub use verification::{verify_blob, verify_record};
pub use writer::{PackWriter, WriteOptions};
