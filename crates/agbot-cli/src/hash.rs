//! # Hash Subcommand
//!
//! Prints the content digest the registry uses to detect changes to a
//! business policy. Registry bookkeeping fields (`created`, `lastUpdated`)
//! are accepted in the input and ignored. With `--expect`, exits 1 when the
//! definition no longer hashes to a previously recorded digest.

use std::path::{Path, PathBuf};

use agbot_core::{hash_policy, ContentDigest};
use agbot_policy::ExchangeBusinessPolicy;
use anyhow::{Context, Result};
use clap::Args;

use crate::load_document;

/// Arguments for the hash subcommand.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Business policy definition (JSON or YAML).
    pub file: PathBuf,

    /// Print only the hex digest, without the algorithm prefix.
    #[arg(long)]
    pub hex: bool,

    /// Digest the definition must hash to (`sha256:<hex>` or bare hex).
    #[arg(long, value_name = "DIGEST")]
    pub expect: Option<ContentDigest>,
}

/// Execute the hash subcommand.
pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let digest = hash_file(&args.file)?;
    if args.hex {
        println!("{}", digest.to_hex());
    } else {
        println!("{digest}");
    }
    match args.expect {
        Some(expected) if expected != digest => {
            eprintln!("MISMATCH: expected {expected}");
            Ok(1)
        }
        _ => Ok(0),
    }
}

/// Content digest of the business policy stored at `path`.
pub fn hash_file(path: &Path) -> Result<ContentDigest> {
    let record: ExchangeBusinessPolicy = load_document(path)?;
    hash_policy(record.business_policy())
        .with_context(|| format!("failed to hash business policy {}", path.display()))
}
