use std::path::PathBuf;

use clap::Args;

use quill_core::export::export_memory;

use super::Workspace;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Corpus root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output file; defaults to the configured memory file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: ExportArgs) -> anyhow::Result<()> {
    let ws = Workspace::open(&args.path)?;
    let store = ws.open_store()?;

    let output = args
        .output
        .unwrap_or_else(|| ws.root.join(&ws.config.export.memory_file));
    let lines = export_memory(&store, &output).await?;
    println!("Exported {lines} entries to {}", output.display());
    Ok(())
}
