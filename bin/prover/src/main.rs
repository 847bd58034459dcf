//! Whitelist proof CLI
//!
//! Builds the tree for an address list file and prints the root, plus the
//! proof and mint calldata for one address when given.

use anyhow::{anyhow, bail, Context, Result};
use auction_bindings as bindings;
use auction_core::{format_hash, Address};
use auction_merkle::{MerkleTree, OddNodePolicy, TreeOptions};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "whitelist-proof")]
#[command(about = "Whitelist Merkle root and proof generator", long_about = None)]
#[command(version)]
struct Cli {
    /// Address list: a JSON array, or one address per line
    list: PathBuf,

    /// Address to prove
    address: Option<String>,

    /// Odd node handling
    #[arg(long, value_enum, default_value = "promote")]
    odd_node: OddNode,

    /// Keep input order instead of sorting leaves
    #[arg(long)]
    unsorted: bool,

    /// Verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OddNode {
    Promote,
    Duplicate,
}

impl From<OddNode> for OddNodePolicy {
    fn from(value: OddNode) -> Self {
        match value {
            OddNode::Promote => Self::Promote,
            OddNode::Duplicate => Self::Duplicate,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    root: String,
    entries: usize,
    depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    membership: Option<Membership>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Membership {
    address: Address,
    leaf: String,
    proof: Vec<String>,
    verified: bool,
    mint_calldata: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let addresses = read_list(&cli.list)?;
    debug!(entries = addresses.len(), path = %cli.list.display(), "Loaded address list");

    let options = TreeOptions { sort_leaves: !cli.unsorted, odd_node: cli.odd_node.into() };
    let tree = MerkleTree::build_with(&addresses, options)?;
    let root = tree.root();

    let membership = match &cli.address {
        Some(address) => {
            let address: Address = address.parse()?;
            let proof = tree.proof(address).with_context(|| format!("{} is not in the list", address))?;
            Some(Membership {
                address,
                leaf: format_hash(&proof.leaf),
                proof: proof.to_hex(),
                verified: proof.verify(&root),
                mint_calldata: bindings::to_hex_data(&bindings::mint_nft(&proof.siblings)),
            })
        }
        None => None,
    };

    let output = Output { root: format_hash(&root), entries: tree.len(), depth: tree.depth(), membership };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_list(path: &Path) -> Result<Vec<Address>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let addresses = parse_list(&text)?;
    if addresses.is_empty() {
        bail!("{} contains no addresses", path.display());
    }
    Ok(addresses)
}

fn parse_list(text: &str) -> Result<Vec<Address>> {
    if text.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(text)?);
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.parse::<Address>().map_err(|e| anyhow!("{}: {}", line, e)))
        .collect()
}
