use std::sync::Arc;

use cairn_canonical::{decode, Cid, CidAlg};

use crate::error::StoreError;

/// Content-addressed store of canonical node bytes.
///
/// Blobs are keyed by their CID and must be canonical encodings; a store
/// never holds bytes it cannot decode.
///
/// # Absence Semantics
///
/// [`get`](BlobStore::get) returns `None` for missing blobs. Absence is not an
/// error; error variants are reserved for integrity and backend failures.
pub trait BlobStore {
    /// Hashes `bytes` with `alg` and stores them. Returns the CID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotCanonical`] for bytes that do not decode, or a
    /// backend error.
    fn put(&mut self, alg: CidAlg, bytes: &[u8]) -> Result<Cid, StoreError>;

    /// Stores `bytes` under a CID the caller already holds.
    ///
    /// On mismatch the store is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::HashMismatch`] if the bytes hash to another CID.
    fn put_verified(&mut self, expected: Cid, bytes: &[u8]) -> Result<(), StoreError>;

    /// Retrieves the bytes stored under `cid`.
    fn get(&self, cid: &Cid) -> Option<Arc<[u8]>>;

    /// Checks existence without retrieving.
    fn has(&self, cid: &Cid) -> bool;

    /// Number of distinct blobs.
    fn len(&self) -> usize;

    /// Returns `true` if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored CID, sorted.
    fn cids(&self) -> Vec<Cid>;
}

/// Checks that `bytes` are canonical and hash to `expected`.
pub(crate) fn check_blob(expected: Cid, bytes: &[u8]) -> Result<(), StoreError> {
    decode(bytes)?;
    let computed = Cid::of_canonical_bytes(expected.alg(), bytes);
    if computed != expected {
        return Err(StoreError::HashMismatch { expected, computed });
    }
    Ok(())
}
