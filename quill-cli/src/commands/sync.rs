use std::path::PathBuf;

use clap::Args;

use quill_core::export::export_memory;
use quill_core::progress::{IndicatifReporter, NoopReporter, ProgressReporter};
use quill_core::sync::SyncEngine;

use super::Workspace;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Corpus root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Skip the memory.jsonl export after a successful sync
    #[arg(long)]
    pub no_export: bool,
}

pub async fn run(args: SyncArgs) -> anyhow::Result<()> {
    let ws = Workspace::open(&args.path)?;
    let store = ws.open_store()?;

    let reporter: Box<dyn ProgressReporter> = if args.no_progress {
        Box::new(NoopReporter)
    } else {
        Box::new(IndicatifReporter::new())
    };
    let report = SyncEngine::new(&ws.root, &ws.config, &store)
        .with_reporter(reporter.as_ref())
        .run()
        .await?;

    println!(
        "Synchronized {} documents: {} created, {} updated, {} unchanged, {} orphaned",
        report.nodes_seen(),
        report.nodes_created,
        report.nodes_updated,
        report.nodes_unchanged,
        report.nodes_orphaned,
    );
    println!(
        "Edges: {} created, {} unchanged",
        report.edges_created, report.edges_unchanged
    );
    for warning in &report.warnings {
        println!("warning: {warning}");
    }

    if ws.config.export.enabled && !args.no_export {
        let export_path = ws.root.join(&ws.config.export.memory_file);
        let lines = export_memory(&store, &export_path).await?;
        println!("Exported {lines} entries to {}", export_path.display());
    }
    Ok(())
}
