//! List command implementation.

use std::path::PathBuf;

use cairn_pack::{PackReader, ReadMode};

use crate::output;

pub fn run(pack: PathBuf, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = PackReader::open(&pack, ReadMode::Strict)
        .map_err(|e| format!("Failed to open pack {}: {}", pack.display(), e))?;

    if !json {
        output::print_blob_header();
    }

    while let Some(record) = reader.read_blob()? {
        if json {
            println!("{}", serde_json::to_string(&output::blob_json(&record))?);
        } else {
            println!("{}", output::format_blob_row(&record));
        }
    }
    Ok(())
}
