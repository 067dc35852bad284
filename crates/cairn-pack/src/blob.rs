use cairn_canonical::{Cid, CidAlg, DIGEST_LEN};

use crate::errors::PackError;

/// Bytes preceding the canonical bytes in a blob payload.
pub const BLOB_PREFIX_LEN: usize = 1 + DIGEST_LEN;

/// One stored blob: canonical node bytes and the CID they are filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRecord {
    /// CID claimed by the writer.
    pub cid: Cid,
    /// Canonical bytes.
    pub bytes: Vec<u8>,
}

impl BlobRecord {
    /// Creates a record without checking that `cid` matches `bytes`.
    pub fn new(cid: Cid, bytes: Vec<u8>) -> Self {
        Self { cid, bytes }
    }

    /// Payload layout: `alg byte || digest || canonical bytes`.
    pub fn to_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(BLOB_PREFIX_LEN + self.bytes.len());
        payload.push(self.cid.alg().to_byte());
        payload.extend_from_slice(self.cid.digest());
        payload.extend_from_slice(&self.bytes);
        payload
    }

    /// Parses a blob payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, PackError> {
        if payload.len() < BLOB_PREFIX_LEN {
            return Err(PackError::InvalidBlob(format!(
                "payload of {} bytes is shorter than the {BLOB_PREFIX_LEN}-byte CID prefix",
                payload.len()
            )));
        }
        let alg = CidAlg::from_byte(payload[0]).ok_or_else(|| {
            PackError::InvalidBlob(format!("unknown digest algorithm 0x{:02x}", payload[0]))
        })?;
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&payload[1..BLOB_PREFIX_LEN]);
        Ok(Self {
            cid: Cid::new(alg, digest),
            bytes: payload[BLOB_PREFIX_LEN..].to_vec(),
        })
    }
}
