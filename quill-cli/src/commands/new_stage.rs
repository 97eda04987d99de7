use std::path::PathBuf;

use clap::Args;

use quill_core::templates::create_stage;

use super::Workspace;

#[derive(Args, Debug)]
pub struct NewStageArgs {
    /// Corpus root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Phase number
    #[arg(long)]
    pub phase: u32,

    /// Stage number within the phase
    #[arg(long)]
    pub stage: u32,

    /// Stage name
    #[arg(long)]
    pub name: String,
}

#[allow(clippy::unused_async)]
pub async fn run(args: NewStageArgs) -> anyhow::Result<()> {
    let ws = Workspace::open(&args.path)?;
    let path = create_stage(&ws.layout(), args.phase, args.stage, &args.name)?;
    println!("Created stage document: {}", path.display());
    Ok(())
}
