use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level Quill configuration, matching `.quill/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub quill: QuillSection,
    #[serde(default)]
    pub corpus: CorpusSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub export: ExportSection,
}

impl QuillConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuillSection {
    pub version: String,
}

impl Default for QuillSection {
    fn default() -> Self {
        Self {
            version: "0.2.0".to_string(),
        }
    }
}

/// Corpus layout — a fixed set of subdirectories under the docs root, each
/// holding documents of one kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSection {
    pub docs_dir: PathBuf,
    pub stages_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub decisions_dir: PathBuf,
    pub progress_file: PathBuf,
}

impl Default for CorpusSection {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
            stages_dir: PathBuf::from("docs/stages"),
            reports_dir: PathBuf::from("docs/reports"),
            decisions_dir: PathBuf::from("docs/decisions"),
            progress_file: PathBuf::from("docs/progress.md"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    pub db_path: PathBuf,
    /// Bound on how long a blocked store call may wait, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".quill/graph.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSection {
    pub enabled: bool,
    pub memory_file: PathBuf,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            enabled: true,
            memory_file: PathBuf::from(".quill/memory.jsonl"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_corpus_convention() {
        let config = QuillConfig::default();
        assert_eq!(config.corpus.stages_dir, PathBuf::from("docs/stages"));
        assert_eq!(config.corpus.progress_file, PathBuf::from("docs/progress.md"));
        assert!(config.export.enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: QuillConfig = toml::from_str(
            r#"
            [store]
            db_path = "custom/graph.db"
            busy_timeout_ms = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.store.db_path, PathBuf::from("custom/graph.db"));
        assert_eq!(config.store.busy_timeout_ms, 100);
        assert_eq!(config.corpus.docs_dir, PathBuf::from("docs"));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let err = QuillConfig::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = QuillConfig::default();
        let raw = toml::to_string_pretty(&config).unwrap();
        let back: QuillConfig = toml::from_str(&raw).unwrap();
        assert_eq!(back.store.busy_timeout_ms, config.store.busy_timeout_ms);
    }
}
