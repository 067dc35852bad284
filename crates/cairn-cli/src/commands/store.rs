//! Store command implementation.

use std::path::PathBuf;

use cairn_canonical::CidAlg;
use cairn_core::{ContentHasher, HasherConfig};
use cairn_store::{store_output, PackStore, ReadMode, WriteOptions};
use tracing::info;

use super::load_document;

pub fn run(doc: PathBuf, pack: PathBuf, alg: CidAlg) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(&doc)?;
    let output = ContentHasher::new(HasherConfig {
        alg,
        ..HasherConfig::default()
    })
    .hash(&doc.arena, doc.root)
    .map_err(|e| format!("Hashing failed: {}", e))?;

    let mut store = PackStore::open(&pack, WriteOptions::default(), ReadMode::Strict)
        .map_err(|e| format!("Failed to open pack {}: {}", pack.display(), e))?;
    let added = store_output(&mut store, &output)?;
    store.finish()?;
    info!(root = %output.root, added, total = output.blobs.len(), "stored document");

    println!("{}", output.root);
    Ok(())
}
