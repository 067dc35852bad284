//! Render command implementation.

use std::path::PathBuf;

use cairn_canonical::render;
use cairn_core::ContentHasher;

use super::{load_document, select_node};

pub fn run(doc: PathBuf, node: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(&doc)?;
    let id = select_node(&doc, node)?;
    let output = ContentHasher::default()
        .hash(&doc.arena, id)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;
    let form = ContentHasher::normal_form(&doc.arena, id, &output)?;
    println!("{}", render(&form)?);
    Ok(())
}
