//! Get command implementation.

use std::path::PathBuf;

use cairn_canonical::{decode, render, Cid};
use cairn_pack::{verify_blob, PackReader, ReadMode};

/// Prints the blob stored under `cid`. Opens the pack read-only.
pub fn run(pack: PathBuf, cid: Cid, hex_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = PackReader::open(&pack, ReadMode::Strict)
        .map_err(|e| format!("Failed to open pack {}: {}", pack.display(), e))?;

    // The first copy of a blob wins, as in the store index.
    let mut found = None;
    while let Some(record) = reader.read_blob()? {
        if record.cid == cid {
            found = Some(record);
            break;
        }
    }
    let record = found.ok_or_else(|| format!("Blob not found: {}", cid))?;

    if !verify_blob(&record.cid, &record.bytes)? {
        return Err(format!("Blob {} does not match its content address", cid).into());
    }

    if hex_output {
        println!("{}", hex::encode(&record.bytes));
    } else {
        println!("{}", render(&decode(&record.bytes)?)?);
    }
    Ok(())
}
