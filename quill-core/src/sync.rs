//! Sync orchestrator — one full pass from corpus files to a committed graph.
//!
//! Phases run in a fixed order: Scanning, Parsing, Inferring, Diffing,
//! Applying, Reporting. A fatal error at any point aborts the run with no
//! further writes; warnings accumulate in pipeline order and never abort.
//! Writes are applied in a stable order (nodes before edges, edges sorted by
//! relation kind then endpoints) so a partial failure leaves a well-defined
//! prefix applied.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::config::QuillConfig;
use crate::corpus::{CorpusLayout, SyncLock, append_log_entry};
use crate::error::{Result, StoreError};
use crate::infer::infer_edges;
use crate::parse::parse_corpus;
use crate::progress::{NoopReporter, ProgressReporter};
use crate::store::GraphStore;
use crate::types::{Document, Edge, Node, NodeId, SyncReport};

/// Runs the sync pipeline against one corpus root and one store.
pub struct SyncEngine<'a> {
    layout: CorpusLayout,
    store: &'a dyn GraphStore,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> SyncEngine<'a> {
    pub fn new(root: &Path, config: &QuillConfig, store: &'a dyn GraphStore) -> Self {
        Self {
            layout: CorpusLayout::new(root, config),
            store,
            reporter: &NoopReporter,
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run one sync pass. Holds the corpus lock for the duration; a second
    /// concurrent invocation fails fast with `SyncInProgress`.
    pub async fn run(&self) -> Result<SyncReport> {
        let _lock = SyncLock::acquire(&self.layout)?;

        // Scanning: enumerate and read every corpus file exactly once.
        let scanned = self.layout.scan()?;
        self.reporter.phase("Scanning", Some(scanned.len() as u64));
        let mut files = Vec::with_capacity(scanned.len());
        for file in scanned {
            let content = std::fs::read_to_string(&file.path)?;
            files.push((file, content));
            self.reporter.item_done();
        }

        // Parsing: typed documents, sorted by identity, duplicates fatal.
        self.reporter.phase("Parsing", Some(files.len() as u64));
        let corpus = parse_corpus(&files)?;
        let mut warnings = corpus.warnings;
        info!(documents = corpus.documents.len(), "Corpus parsed");

        // Inferring: the candidate edge set, recomputed from scratch.
        self.reporter.phase("Inferring", None);
        let inference = infer_edges(&corpus.documents);
        warnings.extend(inference.warnings);

        // Diffing: decide per node and per edge what Applying must do.
        self.reporter.phase("Diffing", None);
        let plan = self.diff(&corpus.documents, &inference.edges).await?;
        debug!(
            upserts = plan.node_upserts.len(),
            orphans = plan.orphans.len(),
            new_edges = plan.edge_inserts.len(),
            stale_edges = plan.edge_removals.len(),
            "Diff complete"
        );

        // Applying: nodes first, then orphan marks, then edges in sorted
        // order, so no edge is ever written before both its endpoints.
        let total = plan.node_upserts.len() + plan.orphans.len() + plan.edge_inserts.len();
        self.reporter.phase("Applying", Some(total as u64));
        let mut report = SyncReport {
            nodes_created: plan.created,
            nodes_updated: plan.updated,
            nodes_unchanged: plan.unchanged,
            nodes_orphaned: plan.orphans.len() as u64,
            edges_created: plan.edge_inserts.len() as u64,
            edges_unchanged: plan.edges_unchanged,
            warnings: Vec::new(),
        };
        for node in &plan.node_upserts {
            self.store.upsert_node(node).await?;
            self.reporter.item_done();
        }
        for id in &plan.orphans {
            self.store.mark_orphaned(id).await?;
            self.reporter.item_done();
        }
        for edge in &plan.edge_removals {
            self.store.remove_edge(edge).await?;
        }
        for edge in &plan.edge_inserts {
            self.store.upsert_edge(edge).await?;
            self.reporter.item_done();
        }

        // Reporting.
        report.warnings = warnings;
        self.append_sync_summary(&report);
        self.reporter.done();
        info!(
            created = report.nodes_created,
            updated = report.nodes_updated,
            unchanged = report.nodes_unchanged,
            orphaned = report.nodes_orphaned,
            edges = report.edges_created,
            warnings = report.warnings.len(),
            "Sync complete"
        );
        Ok(report)
    }

    async fn diff(&self, documents: &[Document], candidate_edges: &[Edge]) -> Result<DiffPlan> {
        let existing: BTreeMap<NodeId, Node> = self
            .store
            .list_nodes(None)
            .await?
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();

        let mut plan = DiffPlan::default();
        let mut live: BTreeSet<NodeId> = BTreeSet::new();

        for doc in documents {
            live.insert(doc.id.clone());
            match existing.get(&doc.id) {
                None => {
                    plan.created += 1;
                    plan.node_upserts.push(node_from(doc)?);
                }
                // A reappearing document clears the orphan flag and counts
                // as updated even when its bytes are unchanged.
                Some(prev) if prev.orphaned => {
                    plan.updated += 1;
                    plan.node_upserts.push(node_from(doc)?);
                }
                Some(prev) if prev.last_synced_hash != doc.raw_content_hash => {
                    plan.updated += 1;
                    plan.node_upserts.push(node_from(doc)?);
                }
                Some(_) => plan.unchanged += 1,
            }
        }

        // Store-resident nodes whose backing document disappeared are
        // soft-deleted, never removed.
        for (id, node) in &existing {
            if !live.contains(id) && !node.orphaned {
                plan.orphans.push(id.clone());
            }
        }

        // Edges are fully recomputed each run. A stored edge absent from the
        // candidate set is stale only when both endpoints are still live;
        // edges touching orphaned nodes are retained as history.
        let stored: BTreeSet<Edge> = self.store.list_edges().await?.into_iter().collect();
        let candidate: BTreeSet<&Edge> = candidate_edges.iter().collect();
        for edge in &stored {
            if candidate.contains(edge) {
                plan.edges_unchanged += 1;
            } else if live.contains(&edge.from) && live.contains(&edge.to) {
                plan.edge_removals.push(edge.clone());
            }
        }
        plan.edge_inserts = candidate_edges
            .iter()
            .filter(|e| !stored.contains(*e))
            .cloned()
            .collect();

        Ok(plan)
    }

    /// Append the machine-generated summary entry under `## Memory Sync Log`.
    /// Skipped when the corpus has no progress log; the entry itself parses
    /// as a ProgressEntry on later runs.
    fn append_sync_summary(&self, report: &SyncReport) {
        if !self.layout.progress_file.is_file() {
            debug!("No progress log, skipping sync summary entry");
            return;
        }
        let line = format!(
            "- {}: Synchronized {} documents (created {}, updated {}, unchanged {}, orphaned {}) #sync",
            Local::now().format("%Y-%m-%dT%H:%M:%S"),
            report.nodes_seen(),
            report.nodes_created,
            report.nodes_updated,
            report.nodes_unchanged,
            report.nodes_orphaned,
        );
        if let Err(e) = append_log_entry(&self.layout.progress_file, "Memory Sync Log", &line) {
            warn!(error = %e, "Failed to append sync summary to progress log");
        }
    }
}

#[derive(Debug, Default)]
struct DiffPlan {
    created: u64,
    updated: u64,
    unchanged: u64,
    node_upserts: Vec<Node>,
    orphans: Vec<NodeId>,
    edge_inserts: Vec<Edge>,
    edge_removals: Vec<Edge>,
    edges_unchanged: u64,
}

fn node_from(doc: &Document) -> Result<Node> {
    Node::from_document(doc).map_err(|e| StoreError::Serialization(e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{QuillError, Warning};
    use crate::store::memory::MemoryStore;
    use crate::types::RelationKind;

    struct Corpus {
        tmp: tempfile::TempDir,
        config: QuillConfig,
    }

    impl Corpus {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let config = QuillConfig::default();
            let layout = CorpusLayout::new(tmp.path(), &config);
            std::fs::create_dir_all(&layout.stages_dir).unwrap();
            std::fs::create_dir_all(&layout.reports_dir).unwrap();
            std::fs::create_dir_all(&layout.decisions_dir).unwrap();
            Self { tmp, config }
        }

        fn layout(&self) -> CorpusLayout {
            CorpusLayout::new(self.tmp.path(), &self.config)
        }

        fn write(&self, rel: &str, content: &str) {
            std::fs::write(self.tmp.path().join(rel), content).unwrap();
        }

        fn remove(&self, rel: &str) {
            std::fs::remove_file(self.tmp.path().join(rel)).unwrap();
        }

        async fn sync(&self, store: &MemoryStore) -> Result<SyncReport> {
            SyncEngine::new(self.tmp.path(), &self.config, store)
                .run()
                .await
        }
    }

    const STAGE: &str = "\
# STAGE 1.1: Setup

## OBJECTIVES
- Lay out the tree

## IMPLEMENTATION SEGMENTS

### SEGMENT 1: Directory Structure
* **Implementation Tasks**:
  - Create tree
";

    const REPORT: &str = "\
# Stage 1.1: Setup - Completion Report

## Summary
All objectives met.

## Components Implemented
- Directory Structure
";

    #[tokio::test]
    async fn first_sync_creates_then_second_is_idempotent() {
        let corpus = Corpus::new();
        corpus.write("docs/stages/stage1_1-setup.md", STAGE);
        corpus.write("docs/reports/report1_1-setup.md", REPORT);
        let store = MemoryStore::new();

        let first = corpus.sync(&store).await.unwrap();
        assert_eq!(first.nodes_created, 3, "stage, segment, report");
        assert_eq!(first.edges_created, 3);
        assert!(first.warnings.is_empty());

        let second = corpus.sync(&store).await.unwrap();
        assert_eq!(second.nodes_created, 0);
        assert_eq!(second.nodes_updated, 0);
        assert_eq!(second.nodes_unchanged, 3);
        assert_eq!(second.edges_created, 0);
        assert_eq!(second.edges_unchanged, 3);
    }

    #[tokio::test]
    async fn changed_file_counts_as_updated() {
        let corpus = Corpus::new();
        corpus.write("docs/stages/stage1_1-setup.md", STAGE);
        let store = MemoryStore::new();
        corpus.sync(&store).await.unwrap();

        corpus.write(
            "docs/stages/stage1_1-setup.md",
            &format!("{STAGE}\n## NOTES\nEdited.\n"),
        );
        let report = corpus.sync(&store).await.unwrap();
        assert_eq!(report.nodes_updated, 2, "stage and its segment re-hash");
        assert_eq!(report.nodes_created, 0);
    }

    #[tokio::test]
    async fn removed_file_orphans_nodes_and_keeps_their_edges() {
        let corpus = Corpus::new();
        corpus.write("docs/stages/stage1_1-setup.md", STAGE);
        corpus.write("docs/reports/report1_1-setup.md", REPORT);
        let store = MemoryStore::new();
        corpus.sync(&store).await.unwrap();

        corpus.remove("docs/reports/report1_1-setup.md");
        let report = corpus.sync(&store).await.unwrap();
        assert_eq!(report.nodes_orphaned, 1);
        assert_eq!(report.warnings.len(), 0, "orphaning is not a warning");

        let node = store.get_node(&NodeId::report(1, 1)).await.unwrap().unwrap();
        assert!(node.orphaned);
        // Historical edges from the orphaned report survive the recompute.
        let edges = store.list_edges().await.unwrap();
        assert!(
            edges
                .iter()
                .any(|e| e.kind == RelationKind::ReportsOn && e.from == NodeId::report(1, 1))
        );

        // Third run: already-orphaned nodes are not re-counted.
        let third = corpus.sync(&store).await.unwrap();
        assert_eq!(third.nodes_orphaned, 0);
    }

    #[tokio::test]
    async fn reappearing_document_resurrects_as_updated() {
        let corpus = Corpus::new();
        corpus.write("docs/stages/stage1_1-setup.md", STAGE);
        let store = MemoryStore::new();
        corpus.sync(&store).await.unwrap();

        corpus.remove("docs/stages/stage1_1-setup.md");
        corpus.sync(&store).await.unwrap();

        corpus.write("docs/stages/stage1_1-setup.md", STAGE);
        let report = corpus.sync(&store).await.unwrap();
        assert_eq!(report.nodes_updated, 2);
        let node = store.get_node(&NodeId::stage(1, 1)).await.unwrap().unwrap();
        assert!(!node.orphaned);
    }

    #[tokio::test]
    async fn stale_edge_between_live_nodes_is_removed() {
        let corpus = Corpus::new();
        corpus.write("docs/stages/stage1_1-setup.md", STAGE);
        corpus.write("docs/reports/report1_1-setup.md", REPORT);
        let store = MemoryStore::new();
        corpus.sync(&store).await.unwrap();

        // Rewrite the report without the component mention; both endpoints
        // stay live so the MentionsComponent edge must disappear.
        corpus.write(
            "docs/reports/report1_1-setup.md",
            "# Stage 1.1: Setup - Completion Report\n\n## Summary\nTrimmed.\n",
        );
        corpus.sync(&store).await.unwrap();
        let edges = store.list_edges().await.unwrap();
        assert!(
            !edges
                .iter()
                .any(|e| e.kind == RelationKind::MentionsComponent)
        );
        assert!(edges.iter().any(|e| e.kind == RelationKind::ReportsOn));
    }

    #[tokio::test]
    async fn dangling_report_warns_but_syncs() {
        let corpus = Corpus::new();
        corpus.write("docs/reports/report9_9-ghost.md", "## Summary\nGhost.\n");
        let store = MemoryStore::new();

        let report = corpus.sync(&store).await.unwrap();
        assert_eq!(report.nodes_created, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            report.warnings[0],
            Warning::DanglingReference { .. }
        ));
    }

    #[tokio::test]
    async fn unavailable_store_aborts_the_run() {
        let corpus = Corpus::new();
        corpus.write("docs/stages/stage1_1-setup.md", STAGE);
        let store = MemoryStore::new();
        store.set_unavailable(true);

        let err = corpus.sync(&store).await.unwrap_err();
        assert!(matches!(
            err,
            QuillError::Store(StoreError::Unavailable(_))
        ));
        // The lock must not leak when the run aborts.
        assert!(!corpus.layout().lock_path().exists());
    }

    #[tokio::test]
    async fn sync_appends_summary_to_progress_log() {
        let corpus = Corpus::new();
        corpus.write("docs/stages/stage1_1-setup.md", STAGE);
        corpus.write("docs/progress.md", "# Progress\n\n## Memory Sync Log\n");
        let store = MemoryStore::new();

        corpus.sync(&store).await.unwrap();
        let log = std::fs::read_to_string(corpus.layout().progress_file).unwrap();
        assert!(log.contains("Synchronized 2 documents"), "log: {log}");
        assert!(log.contains("#sync"));

        // The appended entry parses as a progress document next run.
        let next = corpus.sync(&store).await.unwrap();
        assert_eq!(next.nodes_created, 1, "the new sync-summary entry");
        assert!(
            !next
                .warnings
                .iter()
                .any(|w| matches!(w, Warning::TagPatternMismatch { .. })),
            "the #sync tag is recognized vocabulary"
        );
    }
}
