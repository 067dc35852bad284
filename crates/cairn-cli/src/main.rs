//! Cairn CLI - hash, canonicalize, and store node documents.

use std::path::PathBuf;

use cairn_canonical::{Cid, CidAlg};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{canonicalize, get, hash, list, render, store, verify};

#[derive(Parser)]
#[command(name = "cairn")]
#[command(about = "Canonical serialization and content addressing for cairn node documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the CID of a document's root
    Hash {
        /// Path to document JSON
        doc: PathBuf,
        /// Digest algorithm (blake3 or sha-256)
        #[arg(long, default_value_t = CidAlg::Blake3)]
        alg: CidAlg,
        /// Hash each height level in parallel
        #[arg(long)]
        parallel: bool,
        /// Output every node CID as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print canonical bytes of a node as hex
    Canonicalize {
        /// Path to document JSON
        doc: PathBuf,
        /// Node index (default: the document root)
        #[arg(long)]
        node: Option<usize>,
        /// Also print the hygiene report
        #[arg(long)]
        report: bool,
    },
    /// Print the canonical JSON rendering of a node
    Render {
        /// Path to document JSON
        doc: PathBuf,
        /// Node index (default: the document root)
        #[arg(long)]
        node: Option<usize>,
    },
    /// Hash a document and store its blobs in a pack
    Store {
        /// Path to document JSON
        doc: PathBuf,
        /// Pack file (created if missing)
        #[arg(long)]
        pack: PathBuf,
        /// Digest algorithm (blake3 or sha-256)
        #[arg(long, default_value_t = CidAlg::Blake3)]
        alg: CidAlg,
    },
    /// Fetch one stored node by CID
    Get {
        /// Pack file
        pack: PathBuf,
        /// CID in `alg:hex` form
        cid: Cid,
        /// Print raw canonical bytes as hex instead of the rendering
        #[arg(long)]
        hex: bool,
    },
    /// List blobs in a pack
    List {
        /// Pack file
        pack: PathBuf,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Recompute and check every CID in a pack
    Verify {
        /// Pack file
        pack: PathBuf,
        /// Exit with error code if any blob fails verification
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Hash {
            doc,
            alg,
            parallel,
            json,
        } => hash::run(doc, alg, parallel, json),
        Commands::Canonicalize { doc, node, report } => canonicalize::run(doc, node, report),
        Commands::Render { doc, node } => render::run(doc, node),
        Commands::Store { doc, pack, alg } => store::run(doc, pack, alg),
        Commands::Get { pack, cid, hex } => get::run(pack, cid, hex),
        Commands::List { pack, json } => list::run(pack, json),
        Commands::Verify { pack, strict, json } => verify::run(pack, strict, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
