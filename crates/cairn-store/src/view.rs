//! Typed access to stored normal forms and the DAGs they link.

use std::collections::{BTreeSet, HashSet};

use cairn_canonical::{decode, Cid, NormalForm};
use cairn_core::HashOutput;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::BlobStore;

/// Stores every blob of a hash output. Returns how many were new.
///
/// Each blob is checked against its CID before it is written.
pub fn store_output<S: BlobStore + ?Sized>(
    store: &mut S,
    output: &HashOutput,
) -> Result<usize, StoreError> {
    let mut added = 0;
    for (cid, bytes) in &output.blobs {
        if store.has(cid) {
            continue;
        }
        store.put_verified(*cid, bytes)?;
        added += 1;
    }
    debug!(root = %output.root, blobs = output.blobs.len(), added, "stored hash output");
    Ok(added)
}

/// Loads and decodes the normal form stored under `cid`.
///
/// # Errors
///
/// - [`StoreError::Missing`] if nothing is stored under `cid`.
/// - [`StoreError::HashMismatch`] if the stored bytes do not hash to `cid`.
/// - [`StoreError::NotCanonical`] if they do not decode.
pub fn load_normal_form<S: BlobStore + ?Sized>(
    store: &S,
    cid: &Cid,
) -> Result<NormalForm, StoreError> {
    let bytes = store.get(cid).ok_or(StoreError::Missing(*cid))?;
    if !cid.matches(&bytes) {
        return Err(StoreError::HashMismatch {
            expected: *cid,
            computed: Cid::of_canonical_bytes(cid.alg(), &bytes),
        });
    }
    Ok(decode(&bytes)?)
}

/// CIDs reachable from a root through stored normal forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reachability {
    /// Stored CIDs in depth-first visit order, root first.
    pub present: Vec<Cid>,
    /// Referenced CIDs with no stored blob.
    pub missing: BTreeSet<Cid>,
}

impl Reachability {
    /// Returns `true` if every reachable CID is stored.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Walks the stored DAG under `root`, following every embedded CID.
///
/// References to other artifacts are followed too, so a CID reported
/// missing may belong to a separately stored document.
///
/// # Errors
///
/// Fails if a stored blob is corrupt; absence is reported, not an error.
pub fn reachable<S: BlobStore + ?Sized>(store: &S, root: &Cid) -> Result<Reachability, StoreError> {
    let mut out = Reachability::default();
    let mut seen: HashSet<Cid> = HashSet::new();
    let mut stack = vec![*root];
    while let Some(cid) = stack.pop() {
        if !seen.insert(cid) {
            continue;
        }
        if !store.has(&cid) {
            out.missing.insert(cid);
            continue;
        }
        let form = load_normal_form(store, &cid)?;
        out.present.push(cid);
        // Reverse so children are visited in slot order.
        stack.extend(form.cids().into_iter().rev());
    }
    Ok(out)
}
