pub mod canonicalize;
pub mod get;
pub mod hash;
pub mod list;
pub mod render;
pub mod store;
pub mod verify;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use cairn_canonical::NodeId;
use cairn_core::Document;

/// Loads a document JSON file.
pub fn load_document(path: &Path) -> Result<Document, Box<dyn std::error::Error>> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to read document {}: {}", path.display(), e))?;
    let doc = Document::from_reader(BufReader::new(file))
        .map_err(|e| format!("Invalid document {}: {}", path.display(), e))?;
    Ok(doc)
}

/// Resolves `--node`, defaulting to the document root.
pub fn select_node(doc: &Document, node: Option<usize>) -> Result<NodeId, String> {
    match node {
        None => Ok(doc.root),
        Some(index) => doc.node(index).ok_or_else(|| {
            format!(
                "Node {} is out of range (document has {} nodes)",
                index,
                doc.arena.len()
            )
        }),
    }
}
