//! Error types for store operations.

use cairn_canonical::{Cid, DecodeError};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Pack backend error.
    #[error("pack error: {0}")]
    Pack(#[from] cairn_pack::PackError),
    /// Bytes did not hash to the CID they were offered under.
    #[error("hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch {
        /// CID the caller claimed.
        expected: Cid,
        /// CID of the bytes.
        computed: Cid,
    },
    /// Bytes are not a canonical node encoding.
    #[error("blob is not a canonical node encoding: {0}")]
    NotCanonical(#[from] DecodeError),
    /// No blob is stored under the CID.
    #[error("blob {0} is not in the store")]
    Missing(Cid),
}
