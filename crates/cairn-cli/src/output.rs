//! Output formatting utilities.

use cairn_canonical::{decode, NormalForm};
use cairn_pack::BlobRecord;
use serde_json::{json, Value};

/// Summary of one pack blob as JSON.
pub fn blob_json(record: &BlobRecord) -> Value {
    json!({
        "cid": record.cid.to_string(),
        "kind": kind_name(&record.bytes),
        "size": record.bytes.len(),
    })
}

/// Formats a pack blob as a table row.
pub fn format_blob_row(record: &BlobRecord) -> String {
    format!(
        "{:<72} {:<15} {}",
        record.cid.to_string(),
        kind_name(&record.bytes),
        record.bytes.len()
    )
}

/// Prints the blob table header.
#[allow(clippy::print_literal)]
pub fn print_blob_header() {
    println!("{:<72} {:<15} {}", "CID", "KIND", "SIZE");
    println!("{}", "-".repeat(95));
}

fn kind_name(bytes: &[u8]) -> &'static str {
    decode(bytes)
        .map(|form: NormalForm| form.kind().short_name())
        .unwrap_or("?")
}
