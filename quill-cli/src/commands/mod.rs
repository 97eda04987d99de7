pub mod export;
pub mod init;
pub mod new_report;
pub mod new_stage;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;

use quill_core::config::QuillConfig;
use quill_core::corpus::CorpusLayout;
use quill_core::store::sqlite::SqliteStore;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scaffold a documentation corpus and Quill configuration
    Init(init::InitArgs),
    /// Synchronize the corpus into the relationship graph
    Sync(sync::SyncArgs),
    /// Create a stage plan from the template
    NewStage(new_stage::NewStageArgs),
    /// Create a stage completion report from the template
    NewReport(new_report::NewReportArgs),
    /// Show graph store statistics
    Status(status::StatusArgs),
    /// Export the graph in the memory.jsonl entity/relation format
    Export(export::ExportArgs),
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Init(args) => init::run(args).await,
        Command::Sync(args) => sync::run(args).await,
        Command::NewStage(args) => new_stage::run(args).await,
        Command::NewReport(args) => new_report::run(args).await,
        Command::Status(args) => status::run(args).await,
        Command::Export(args) => export::run(args).await,
    }
}

/// A resolved corpus root with its loaded configuration.
pub(crate) struct Workspace {
    pub root: PathBuf,
    pub config: QuillConfig,
}

impl Workspace {
    /// Resolve and load an initialized corpus; every command except `init`
    /// starts here.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let root = std::fs::canonicalize(path)
            .with_context(|| format!("Cannot resolve path: {}", path.display()))?;
        let probe = CorpusLayout::new(&root, &QuillConfig::default());
        if !probe.is_initialized() {
            anyhow::bail!(
                "Quill is not initialized in {}. Run `quill init` first.",
                root.display()
            );
        }
        let config = QuillConfig::load(&probe.config_path())
            .map_err(quill_core::error::QuillError::from)?;
        Ok(Self { root, config })
    }

    pub fn layout(&self) -> CorpusLayout {
        CorpusLayout::new(&self.root, &self.config)
    }

    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        let db_path = self.root.join(&self.config.store.db_path);
        let store = SqliteStore::open(&db_path, self.config.store.busy_timeout_ms)
            .with_context(|| format!("Cannot open database: {}", db_path.display()))?;
        Ok(store)
    }
}
