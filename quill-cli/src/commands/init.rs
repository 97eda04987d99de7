use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use quill_core::config::QuillConfig;
use quill_core::templates;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Corpus root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[allow(clippy::unused_async)]
pub async fn run(args: InitArgs) -> anyhow::Result<()> {
    let root = std::fs::canonicalize(&args.path)
        .with_context(|| format!("Cannot resolve path: {}", args.path.display()))?;

    let created = templates::scaffold(&root, &QuillConfig::default())?;
    if created.is_empty() {
        println!("Quill already initialized in {}", root.display());
    } else {
        println!("Initialized Quill corpus in {}", root.display());
        for path in created {
            println!("  created {}", path.display());
        }
    }
    Ok(())
}
