use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ── Document kinds ─────────────────────────────────────────────────

/// Every document Quill tracks becomes a node of one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// A stage plan (`docs/stages/stage{p}_{s}-*.md`).
    Stage,
    /// An implementation segment nested inside a stage plan.
    Segment,
    /// A stage completion report (`docs/reports/report{p}_{s}-*.md`).
    Report,
    /// One entry of the append-only progress log (`docs/progress.md`).
    ProgressEntry,
    /// A decision record (`docs/decisions/*.md`).
    Decision,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stage => "Stage",
            Self::Segment => "Segment",
            Self::Report => "Report",
            Self::ProgressEntry => "ProgressEntry",
            Self::Decision => "Decision",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Stage" => Some(Self::Stage),
            "Segment" => Some(Self::Segment),
            "Report" => Some(Self::Report),
            "ProgressEntry" => Some(Self::ProgressEntry),
            "Decision" => Some(Self::Decision),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Node identity ──────────────────────────────────────────────────

/// Stable node identity, computed purely from document fields.
///
/// Re-parsing the same unchanged document always yields the same `NodeId`,
/// regardless of sync run count or corpus traversal order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn stage(phase: u32, stage: u32) -> Self {
        Self(format!("stage:{phase}.{stage}"))
    }

    pub fn segment(phase: u32, stage: u32, name: &str) -> Self {
        Self(format!("segment:{phase}.{stage}/{}", slugify(name)))
    }

    pub fn report(phase: u32, stage: u32) -> Self {
        Self(format!("report:{phase}.{stage}"))
    }

    pub fn progress(timestamp: NaiveDateTime, ordinal: u32) -> Self {
        let ts = timestamp.format("%Y-%m-%dT%H:%M:%S");
        if ordinal == 0 {
            Self(format!("progress:{ts}"))
        } else {
            Self(format!("progress:{ts}~{ordinal}"))
        }
    }

    pub fn decision(title: &str) -> Self {
        Self(format!("decision:{}", slugify(title)))
    }

    /// Reconstruct an id from its stored string form.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase, alphanumeric-and-hyphen normalization used for identity slugs
/// and name matching. Runs of non-alphanumeric characters collapse to a
/// single hyphen.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_hyphen = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        } else {
            pending_hyphen = true;
        }
    }
    out
}

// ── Document model ─────────────────────────────────────────────────

/// A parsed document plus the fields shared by every kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: NodeId,
    pub kind: DocumentKind,
    pub title: String,
    /// Free-form tags attached to the document (`#token` forms, identity keys).
    pub tags: BTreeSet<String>,
    /// FNV-1a hash of the raw source bytes, used for change detection.
    pub raw_content_hash: u64,
    pub source_path: PathBuf,
    /// Unrecognized section headers preserved verbatim (header → body), so
    /// round-tripping never silently drops author content.
    pub extensions: BTreeMap<String, String>,
    pub body: DocumentBody,
}

/// Kind-specific fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DocumentBody {
    Stage(Stage),
    Segment(Segment),
    Report(Report),
    ProgressEntry(ProgressEntry),
    Decision(Decision),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub phase: u32,
    pub stage: u32,
    pub name: String,
    pub objectives: Vec<String>,
    /// Segment names in document order; each segment is also flattened into
    /// its own [`Document`] by the parser.
    pub segment_names: Vec<String>,
}

impl Stage {
    /// The `phase.stage` identity key, e.g. `"1.1"`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.phase, self.stage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SegmentStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub phase: u32,
    pub stage: u32,
    pub name: String,
    pub status: SegmentStatus,
    pub test_requirements: Vec<String>,
    pub implementation_tasks: Vec<String>,
    pub verification_criteria: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub phase: u32,
    pub stage: u32,
    pub summary: String,
    pub components_implemented: Vec<String>,
    pub achievements: Vec<String>,
    pub lessons_learned: Vec<String>,
}

impl Report {
    pub fn key(&self) -> String {
        format!("{}.{}", self.phase, self.stage)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub timestamp: NaiveDateTime,
    /// `#phaseX.Y` token, stored as `"X.Y"`.
    pub phase_tag: Option<String>,
    pub component_tag: Option<String>,
    pub status_tags: BTreeSet<String>,
    /// Entry text with tag tokens stripped.
    pub summary: String,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DecisionStatus {
    #[default]
    Proposed,
    Accepted,
    Superseded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub title: String,
    pub status: DecisionStatus,
    pub context: String,
    pub decision_text: String,
    pub consequences: String,
    pub alternatives: Vec<String>,
}

// ── Graph types ────────────────────────────────────────────────────

/// A persisted graph node wrapping exactly one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: DocumentKind,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub source_path: String,
    /// Hash of the backing document at the last successful sync.
    pub last_synced_hash: u64,
    /// Set when the backing document disappeared from the corpus.
    /// Orphaned nodes are retained for historical traceability.
    pub orphaned: bool,
    /// The kind-specific document fields, serialized.
    pub payload: serde_json::Value,
}

impl Node {
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: doc.id.clone(),
            kind: doc.kind,
            title: doc.title.clone(),
            tags: doc.tags.clone(),
            source_path: doc.source_path.to_string_lossy().to_string(),
            last_synced_hash: doc.raw_content_hash,
            orphaned: false,
            payload: serde_json::to_value(&doc.body)?,
        })
    }
}

/// Typed relationships between two nodes. Variant order defines the stable
/// apply order for edges.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RelationKind {
    /// Segment → its owning Stage (structural, always present).
    BelongsToStage,
    /// Report → the Stage sharing its `(phase, stage)` key.
    ReportsOn,
    /// Report → a Segment named in `components_implemented`.
    MentionsComponent,
    /// ProgressEntry → a Stage/Decision whose identity appears in its tags.
    TaggedWith,
    /// Free-text `#token` reference to another document's identity.
    References,
    /// A superseded Decision → the decision that replaced it names in context.
    Supersedes,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BelongsToStage => "BelongsToStage",
            Self::ReportsOn => "ReportsOn",
            Self::MentionsComponent => "MentionsComponent",
            Self::TaggedWith => "TaggedWith",
            Self::References => "References",
            Self::Supersedes => "Supersedes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BelongsToStage" => Some(Self::BelongsToStage),
            "ReportsOn" => Some(Self::ReportsOn),
            "MentionsComponent" => Some(Self::MentionsComponent),
            "TaggedWith" => Some(Self::TaggedWith),
            "References" => Some(Self::References),
            "Supersedes" => Some(Self::Supersedes),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed edge. Identity is the full triple; duplicates collapse.
/// `Ord` follows (kind, from, to) — the stable apply order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub kind: RelationKind,
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(kind: RelationKind, from: NodeId, to: NodeId) -> Self {
        Self { kind, from, to }
    }
}

// ── Sync results ───────────────────────────────────────────────────

/// Structured result of one sync run, returned to the invoking CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub nodes_created: u64,
    pub nodes_updated: u64,
    pub nodes_unchanged: u64,
    pub nodes_orphaned: u64,
    pub edges_created: u64,
    pub edges_unchanged: u64,
    /// Non-fatal findings, in pipeline order.
    pub warnings: Vec<crate::error::Warning>,
}

impl SyncReport {
    /// Total documents seen this run (excluding orphans).
    pub fn nodes_seen(&self) -> u64 {
        self.nodes_created + self.nodes_updated + self.nodes_unchanged
    }
}

/// Summary counts for `quill status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub nodes: u64,
    pub edges: u64,
    pub orphaned: u64,
}

// ── Content hashing ────────────────────────────────────────────────

/// Compute a content hash for a byte slice using FNV-1a.
///
/// Fast and non-cryptographic; collisions are acceptable since this is for
/// change detection only.
pub fn content_hash(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in data {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
