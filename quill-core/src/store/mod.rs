pub mod memory;
pub mod schema;
pub mod sqlite;

use crate::types::{DocumentKind, Edge, Node, NodeId, StoreStats};

/// The graph store adapter. The sync orchestrator reads and writes through
/// this trait only, so the engine is testable with the in-memory fake.
///
/// The adapter never decides what changed — it persists whatever it is told.
/// Upserts are idempotent: applying the same node twice produces no observable
/// change beyond refreshing `last_synced_hash`. Callers must apply writes in
/// a stable order (nodes before edges, edges sorted by relation kind then
/// identities) so a partial failure leaves a well-defined prefix applied and
/// never an edge pointing at a missing node.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert or update a node by its identity. Clears any orphan mark.
    async fn upsert_node(&self, node: &Node) -> crate::error::Result<()>;

    /// Get a node by its identity.
    async fn get_node(&self, id: &NodeId) -> crate::error::Result<Option<Node>>;

    /// List nodes, optionally filtered by kind, sorted by identity.
    async fn list_nodes(&self, kind: Option<DocumentKind>) -> crate::error::Result<Vec<Node>>;

    /// Soft-delete: mark a node whose backing document disappeared. The node
    /// (and its historical edges) remain queryable.
    async fn mark_orphaned(&self, id: &NodeId) -> crate::error::Result<()>;

    /// Insert an edge; the same (kind, from, to) triple collapses to one.
    async fn upsert_edge(&self, edge: &Edge) -> crate::error::Result<()>;

    /// List all edges sorted by (kind, from, to).
    async fn list_edges(&self) -> crate::error::Result<Vec<Edge>>;

    /// Remove a single edge. Used when the recomputed edge set no longer
    /// contains it.
    async fn remove_edge(&self, edge: &Edge) -> crate::error::Result<()>;

    /// Summary counts for status display.
    async fn stats(&self) -> crate::error::Result<StoreStats>;
}
