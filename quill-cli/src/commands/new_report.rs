use std::path::PathBuf;

use clap::Args;

use quill_core::templates::create_report;

use super::Workspace;

#[derive(Args, Debug)]
pub struct NewReportArgs {
    /// Corpus root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Phase number
    #[arg(long)]
    pub phase: u32,

    /// Stage number within the phase
    #[arg(long)]
    pub stage: u32,

    /// Report name; defaults from the matching stage plan's title
    #[arg(long)]
    pub name: Option<String>,
}

#[allow(clippy::unused_async)]
pub async fn run(args: NewReportArgs) -> anyhow::Result<()> {
    let ws = Workspace::open(&args.path)?;
    let path = create_report(&ws.layout(), args.phase, args.stage, args.name.as_deref())?;
    println!("Created completion report: {}", path.display());
    Ok(())
}
