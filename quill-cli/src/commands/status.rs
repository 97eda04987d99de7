use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use quill_core::store::GraphStore;
use quill_core::types::DocumentKind;

use super::Workspace;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Corpus root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

pub async fn run(args: StatusArgs) -> anyhow::Result<()> {
    let ws = Workspace::open(&args.path)?;
    let store = ws.open_store()?;
    let stats = store.stats().await.context("Failed to read store stats")?;

    println!("Quill status for {}", ws.root.display());
    println!();
    println!(
        "  Database: {}",
        ws.root.join(&ws.config.store.db_path).display()
    );
    println!();
    println!("  Nodes: {} total ({} orphaned)", stats.nodes, stats.orphaned);
    for kind in [
        DocumentKind::Stage,
        DocumentKind::Segment,
        DocumentKind::Report,
        DocumentKind::ProgressEntry,
        DocumentKind::Decision,
    ] {
        let count = store.list_nodes(Some(kind)).await?.len();
        if count > 0 {
            println!("    {:<14} {count:>6}", kind.as_str());
        }
    }
    println!();
    println!("  Edges: {} total", stats.edges);
    Ok(())
}
