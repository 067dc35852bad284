//! Verification helpers for stored blobs.

use cairn_canonical::{decode, Cid};

use crate::blob::BlobRecord;
use crate::errors::PackError;

/// Verifies `bytes` against the CID they are filed under.
///
/// The bytes must be a canonical node encoding; the CID is then recomputed
/// with the claimed algorithm and compared.
///
/// # Errors
///
/// Returns [`PackError::InvalidBlob`] if `bytes` do not decode as a canonical
/// node.
pub fn verify_blob(cid: &Cid, bytes: &[u8]) -> Result<bool, PackError> {
    decode(bytes).map_err(|e| PackError::InvalidBlob(format!("{cid}: {e}")))?;
    Ok(cid.matches(bytes))
}

/// Verifies a record read from a pack.
pub fn verify_record(record: &BlobRecord) -> Result<bool, PackError> {
    verify_blob(&record.cid, &record.bytes)
}
