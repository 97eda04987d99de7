use serde::{Deserialize, Serialize};

use crate::types::{NodeId, RelationKind};

/// Top-level Quill error type.
///
/// All fallible operations in `quill-core` return [`Result<T, QuillError>`](Result).
/// Every variant is fatal: a sync run aborts with no further candidate-model
/// commits. Non-fatal findings are [`Warning`]s, accumulated in the sync report.
#[derive(thiserror::Error, Debug)]
pub enum QuillError {
    /// A document is malformed or identity-inconsistent.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Two documents resolve to the same node identity.
    #[error("Duplicate identity `{node_id}`: {first} and {second}")]
    DuplicateIdentity {
        node_id: NodeId,
        first: String,
        second: String,
    },

    /// Error from the graph store layer.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Another sync run holds the corpus lock.
    #[error("Sync already in progress (lock held at {path})")]
    SyncInProgress { path: String },

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Filesystem I/O error reading the corpus or writing artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from parsing a single source document.
///
/// Each variant names the source path so the failure is actionable without
/// re-parsing.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// A required identity field is absent.
    #[error("{path}: missing required field `{field}` in {kind} document")]
    MissingField {
        kind: &'static str,
        field: &'static str,
        path: String,
    },

    /// A recognized section exists but its content cannot be interpreted.
    #[error("{path}: malformed section `{section}`: {detail}")]
    MalformedSection {
        section: String,
        detail: String,
        path: String,
    },

    /// Filename-encoded identity disagrees with the document body.
    /// Filename identity is authoritative for Stage and Report documents.
    #[error("{path}: body identity `{body}` does not match filename identity `{filename}`")]
    IdentityMismatch {
        filename: String,
        body: String,
        path: String,
    },
}

/// Errors from the graph store adapter.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Underlying `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The backing service cannot be reached; the sync run aborts and no
    /// further writes are attempted.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// JSON serialization of a node payload failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors in Quill configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Non-fatal findings surfaced in the sync report. Warnings never abort a run.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Warning {
    /// An inferred relationship's target does not exist in the corpus;
    /// the edge is omitted. The originating node is `node`, not `source`:
    /// thiserror reserves that name for the error-source chain.
    #[error("{node}: dangling {relation} reference to `{target}`")]
    DanglingReference {
        node: NodeId,
        relation: RelationKind,
        target: String,
    },

    /// Progress-log timestamps are out of order (or duplicated).
    #[error("{path}: progress entry `{current}` is not after `{previous}`")]
    MonotonicityViolation {
        path: String,
        previous: String,
        current: String,
    },

    /// A `#token` did not match any recognized tag pattern; it is retained
    /// as a free-form tag.
    #[error("{path}: unrecognized tag token `{token}`")]
    TagPatternMismatch { path: String, token: String },
}

/// Convenience alias for `Result<T, QuillError>`.
pub type Result<T> = std::result::Result<T, QuillError>;
