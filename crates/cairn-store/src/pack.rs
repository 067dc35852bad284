//! Pack-backed blob store.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cairn_canonical::{decode, Cid, CidAlg};
use cairn_pack::{BlobRecord, PackError, PackReader, PackWriter, ReadMode, WriteOptions};
use tracing::{debug, trace, warn};

use crate::error::StoreError;
use crate::traits::{check_blob, BlobStore};

/// Blob store persisted to a pack file.
///
/// Existing blobs are indexed in memory when the store is opened; new blobs
/// are appended to the pack. Re-putting a stored CID writes nothing.
pub struct PackStore {
    path: PathBuf,
    writer: PackWriter,
    index: HashMap<Cid, Arc<[u8]>>,
}

impl PackStore {
    /// Opens or creates the pack at `path` and indexes its blobs.
    ///
    /// `mode` decides whether a truncated tail is an error or ignored. In
    /// permissive mode the tail is cut off so new frames follow the last
    /// complete one. When a CID appears more than once, the first copy wins.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Pack`] if the file cannot be opened or read.
    pub fn open<P: AsRef<Path>>(
        path: P,
        options: WriteOptions,
        mode: ReadMode,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut writer = PackWriter::open(&path, options.clone())?;
        let mut reader = PackReader::open(&path, mode)?;
        let mut index = HashMap::new();
        let mut duplicates = 0usize;
        while let Some(record) = reader.read_blob()? {
            if index.contains_key(&record.cid) {
                duplicates += 1;
                continue;
            }
            index.insert(record.cid, Arc::from(record.bytes));
        }

        let end = reader.position();
        let len = fs::metadata(&path).map_err(PackError::from)?.len();
        if end < len {
            warn!(path = %path.display(), end, len, "dropping truncated pack tail");
            drop(writer);
            OpenOptions::new()
                .write(true)
                .open(&path)
                .and_then(|file| file.set_len(end))
                .map_err(PackError::from)?;
            writer = PackWriter::open(&path, options)?;
        }

        debug!(path = %path.display(), blobs = index.len(), duplicates, "indexed pack");
        Ok(Self {
            path,
            writer,
            index,
        })
    }

    /// Path of the underlying pack file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and closes the pack.
    pub fn finish(self) -> Result<(), StoreError> {
        Ok(self.writer.finish()?)
    }

    fn append(&mut self, cid: Cid, bytes: &[u8]) -> Result<(), StoreError> {
        if self.index.contains_key(&cid) {
            trace!(%cid, "blob already stored");
            return Ok(());
        }
        self.writer.append_blob(&BlobRecord::new(cid, bytes.to_vec()))?;
        self.index.insert(cid, Arc::from(bytes));
        trace!(%cid, len = bytes.len(), "stored blob");
        Ok(())
    }
}

impl BlobStore for PackStore {
    fn put(&mut self, alg: CidAlg, bytes: &[u8]) -> Result<Cid, StoreError> {
        decode(bytes)?;
        let cid = Cid::of_canonical_bytes(alg, bytes);
        self.append(cid, bytes)?;
        Ok(cid)
    }

    fn put_verified(&mut self, expected: Cid, bytes: &[u8]) -> Result<(), StoreError> {
        check_blob(expected, bytes)?;
        self.append(expected, bytes)
    }

    fn get(&self, cid: &Cid) -> Option<Arc<[u8]>> {
        self.index.get(cid).cloned()
    }

    fn has(&self, cid: &Cid) -> bool {
        self.index.contains_key(cid)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn cids(&self) -> Vec<Cid> {
        let mut cids: Vec<Cid> = self.index.keys().copied().collect();
        cids.sort();
        cids
    }
}
