//! Corpus layout and scanning.
//!
//! The corpus is a root directory with a fixed set of subdirectories, each
//! holding documents of one kind. Filenames encode Stage/Report identity and
//! are authoritative; scanning is deterministic (sorted paths) so downstream
//! results never depend on filesystem enumeration order.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::QuillConfig;
use crate::error::{QuillError, Result};
use crate::types::DocumentKind;

/// Resolved absolute paths for one corpus root.
#[derive(Debug, Clone)]
pub struct CorpusLayout {
    pub root: PathBuf,
    pub docs_dir: PathBuf,
    pub stages_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub decisions_dir: PathBuf,
    pub progress_file: PathBuf,
    pub quill_dir: PathBuf,
}

impl CorpusLayout {
    pub fn new(root: &Path, config: &QuillConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            docs_dir: root.join(&config.corpus.docs_dir),
            stages_dir: root.join(&config.corpus.stages_dir),
            reports_dir: root.join(&config.corpus.reports_dir),
            decisions_dir: root.join(&config.corpus.decisions_dir),
            progress_file: root.join(&config.corpus.progress_file),
            quill_dir: root.join(".quill"),
        }
    }

    pub fn spec_file(&self) -> PathBuf {
        self.docs_dir.join("client_spec.md")
    }

    pub fn roadmap_file(&self) -> PathBuf {
        self.docs_dir.join("project_roadmap.md")
    }

    pub fn config_path(&self) -> PathBuf {
        self.quill_dir.join("config.toml")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.quill_dir.join("sync.lock")
    }

    pub fn is_initialized(&self) -> bool {
        self.quill_dir.exists() && self.config_path().exists()
    }

    /// Walk the corpus and return every document file with its declared kind,
    /// sorted by path. Files are read later, exactly once, at Scanning time.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        let mut found = Vec::new();
        for (dir, kind) in [
            (&self.stages_dir, DocumentKind::Stage),
            (&self.reports_dir, DocumentKind::Report),
            (&self.decisions_dir, DocumentKind::Decision),
        ] {
            if !dir.exists() {
                debug!(dir = %dir.display(), "Corpus directory absent, skipping");
                continue;
            }
            let pattern = dir.join("**/*.md").to_string_lossy().to_string();
            match glob::glob(&pattern) {
                Ok(paths) => {
                    for entry in paths.flatten() {
                        if entry.is_file() {
                            found.push(ScannedFile { path: entry, kind });
                        }
                    }
                }
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Invalid glob pattern");
                }
            }
        }
        if self.progress_file.is_file() {
            found.push(ScannedFile {
                path: self.progress_file.clone(),
                kind: DocumentKind::ProgressEntry,
            });
        }
        found.sort_by(|a, b| a.path.cmp(&b.path));
        found.dedup_by(|a, b| a.path == b.path);
        Ok(found)
    }
}

/// A corpus file discovered at Scanning time, with the kind its directory
/// declares.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub kind: DocumentKind,
}

// ── Exclusive sync lock ────────────────────────────────────────────

/// Exclusive-access marker scoped to the corpus root.
///
/// Held for the duration of one sync run; a second invocation while one is
/// in-flight fails fast with [`QuillError::SyncInProgress`] rather than
/// interleaving writes. Released on drop.
#[derive(Debug)]
pub struct SyncLock {
    path: PathBuf,
    released: bool,
}

impl SyncLock {
    pub fn acquire(layout: &CorpusLayout) -> Result<Self> {
        std::fs::create_dir_all(&layout.quill_dir)?;
        let path = layout.lock_path();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self {
                    path,
                    released: false,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(QuillError::SyncInProgress {
                    path: path.display().to_string(),
                })
            }
            Err(e) => Err(QuillError::Io(e)),
        }
    }

    /// Remove the lock file explicitly. Also happens on drop.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "Failed to remove sync lock");
            }
        }
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        self.release_inner();
    }
}

// ── Progress log appends ───────────────────────────────────────────

/// Insert a log line directly under a `## <section>` header of the progress
/// log, creating the section at the end of the file when absent.
///
/// Only the first line that is exactly the header counts; a header that
/// merely starts with the section name belongs to a different section.
pub fn append_log_entry(progress_file: &Path, section: &str, line: &str) -> std::io::Result<()> {
    let content = std::fs::read_to_string(progress_file)?;
    let header = format!("## {section}");

    let mut out = String::with_capacity(content.len() + line.len() + 1);
    let mut inserted = false;
    for l in content.lines() {
        out.push_str(l);
        out.push('\n');
        if !inserted && l.trim_end() == header {
            out.push_str(line);
            out.push('\n');
            inserted = true;
        }
    }
    if !inserted {
        out = format!("{}\n\n{header}\n{line}\n", content.trim_end());
    }
    std::fs::write(progress_file, out)
}
