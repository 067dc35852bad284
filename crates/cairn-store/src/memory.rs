//! In-memory blob store.

use std::collections::HashMap;
use std::sync::Arc;

use cairn_canonical::{decode, Cid, CidAlg};

use crate::error::StoreError;
use crate::traits::{check_blob, BlobStore};

/// Blob store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<Cid, Arc<[u8]>>,
    byte_count: usize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes stored across all blobs.
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    fn insert(&mut self, cid: Cid, bytes: &[u8]) {
        if !self.blobs.contains_key(&cid) {
            self.byte_count += bytes.len();
            self.blobs.insert(cid, Arc::from(bytes));
        }
    }
}

impl BlobStore for MemoryStore {
    fn put(&mut self, alg: CidAlg, bytes: &[u8]) -> Result<Cid, StoreError> {
        decode(bytes)?;
        let cid = Cid::of_canonical_bytes(alg, bytes);
        self.insert(cid, bytes);
        Ok(cid)
    }

    fn put_verified(&mut self, expected: Cid, bytes: &[u8]) -> Result<(), StoreError> {
        check_blob(expected, bytes)?;
        self.insert(expected, bytes);
        Ok(())
    }

    fn get(&self, cid: &Cid) -> Option<Arc<[u8]>> {
        self.blobs.get(cid).cloned()
    }

    fn has(&self, cid: &Cid) -> bool {
        self.blobs.contains_key(cid)
    }

    fn len(&self) -> usize {
        self.blobs.len()
    }

    fn cids(&self) -> Vec<Cid> {
        let mut cids: Vec<Cid> = self.blobs.keys().copied().collect();
        cids.sort();
        cids
    }
}
