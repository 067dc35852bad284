//! Hash command implementation.

use std::path::PathBuf;

use cairn_canonical::CidAlg;
use cairn_core::{ContentHasher, HasherConfig};
use serde_json::json;

use super::load_document;

pub fn run(
    doc: PathBuf,
    alg: CidAlg,
    parallel: bool,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(&doc)?;
    let hasher = ContentHasher::new(HasherConfig { alg, parallel });
    let output = hasher
        .hash(&doc.arena, doc.root)
        .map_err(|e| format!("Hashing failed: {}", e))?;

    if json_output {
        let nodes: Vec<_> = output
            .node_cids
            .iter()
            .map(|(id, cid)| json!({ "node": id.index(), "cid": cid.to_string() }))
            .collect();
        let report = json!({
            "root": output.root.to_string(),
            "nodes": nodes,
            "blobs": output.blobs.len(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", output.root);
    }
    Ok(())
}
