//! Canonicalize command implementation.

use std::path::PathBuf;

use cairn_canonical::{Canonicalizer, HygieneReport, NodePath};
use cairn_core::ContentHasher;

use super::{load_document, select_node};

pub fn run(
    doc: PathBuf,
    node: Option<usize>,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(&doc)?;
    let id = select_node(&doc, node)?;
    let output = ContentHasher::default()
        .hash(&doc.arena, id)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;
    let bytes = output
        .bytes_of(&output.root)
        .ok_or("Canonical bytes missing from hash output")?;
    println!("{}", hex::encode(bytes));

    if report {
        // Re-run every node of the sub-DAG with a shared report.
        let canonicalizer = Canonicalizer::new(&doc.arena);
        let mut hygiene = HygieneReport::default();
        for node in output.node_cids.keys() {
            canonicalizer
                .canonicalize_with_report(*node, &output.node_cids, &NodePath::root(), &mut hygiene)
                .map_err(|e| format!("Canonicalization failed: {}", e))?;
        }
        println!("{}", serde_json::to_string(&hygiene)?);
    }
    Ok(())
}
