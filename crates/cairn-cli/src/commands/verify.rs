//! Verify command implementation.

use std::fmt;
use std::path::PathBuf;

use cairn_pack::{verify_record, PackReader, ReadMode};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Ok,
    Mismatch,
    Invalid,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Ok => "ok",
            Verdict::Mismatch => "mismatch",
            Verdict::Invalid => "invalid",
        })
    }
}

pub fn run(pack: PathBuf, strict: bool, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = PackReader::open(&pack, ReadMode::Strict)
        .map_err(|e| format!("Failed to open pack {}: {}", pack.display(), e))?;

    let mut results = Vec::new();
    while let Some(record) = reader.read_blob()? {
        let verdict = match verify_record(&record) {
            Ok(true) => Verdict::Ok,
            Ok(false) => Verdict::Mismatch,
            Err(e) => {
                if !json_output {
                    eprintln!("Invalid blob {}: {}", record.cid, e);
                }
                Verdict::Invalid
            }
        };
        results.push((record.cid, verdict));
    }
    let failures = results.iter().filter(|(_, v)| *v != Verdict::Ok).count();

    if json_output {
        let json_results: Vec<_> = results
            .iter()
            .map(|(cid, verdict)| json!({ "cid": cid.to_string(), "verdict": verdict.to_string() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&json_results)?);
    } else {
        println!("{:<72} {}", "CID", "VERDICT");
        println!("{}", "-".repeat(82));
        for (cid, verdict) in &results {
            println!("{:<72} {}", cid.to_string(), verdict);
        }
    }

    if strict && failures > 0 {
        return Err(format!("{} of {} blobs failed verification", failures, results.len()).into());
    }
    Ok(())
}
