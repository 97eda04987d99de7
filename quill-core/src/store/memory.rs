//! In-memory [`GraphStore`] fake.
//!
//! Backs the engine tests without SQLite, and provides fault injection so the
//! orchestrator's `StoreUnavailable` abort path is testable.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::StoreError;
use crate::types::{DocumentKind, Edge, Node, NodeId, StoreStats};

use super::GraphStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: Mutex<BTreeMap<NodeId, Node>>,
    edges: Mutex<BTreeSet<Edge>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> crate::error::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl GraphStore for MemoryStore {
    async fn upsert_node(&self, node: &Node) -> crate::error::Result<()> {
        self.check_available()?;
        let mut stored = node.clone();
        stored.orphaned = false;
        self.nodes
            .lock()
            .expect("memory store mutex poisoned")
            .insert(node.id.clone(), stored);
        Ok(())
    }

    async fn get_node(&self, id: &NodeId) -> crate::error::Result<Option<Node>> {
        self.check_available()?;
        Ok(self
            .nodes
            .lock()
            .expect("memory store mutex poisoned")
            .get(id)
            .cloned())
    }

    async fn list_nodes(&self, kind: Option<DocumentKind>) -> crate::error::Result<Vec<Node>> {
        self.check_available()?;
        Ok(self
            .nodes
            .lock()
            .expect("memory store mutex poisoned")
            .values()
            .filter(|n| kind.is_none_or(|k| n.kind == k))
            .cloned()
            .collect())
    }

    async fn mark_orphaned(&self, id: &NodeId) -> crate::error::Result<()> {
        self.check_available()?;
        if let Some(node) = self
            .nodes
            .lock()
            .expect("memory store mutex poisoned")
            .get_mut(id)
        {
            node.orphaned = true;
        }
        Ok(())
    }

    async fn upsert_edge(&self, edge: &Edge) -> crate::error::Result<()> {
        self.check_available()?;
        self.edges
            .lock()
            .expect("memory store mutex poisoned")
            .insert(edge.clone());
        Ok(())
    }

    async fn list_edges(&self) -> crate::error::Result<Vec<Edge>> {
        self.check_available()?;
        Ok(self
            .edges
            .lock()
            .expect("memory store mutex poisoned")
            .iter()
            .cloned()
            .collect())
    }

    async fn remove_edge(&self, edge: &Edge) -> crate::error::Result<()> {
        self.check_available()?;
        self.edges
            .lock()
            .expect("memory store mutex poisoned")
            .remove(edge);
        Ok(())
    }

    async fn stats(&self) -> crate::error::Result<StoreStats> {
        self.check_available()?;
        let nodes = self.nodes.lock().expect("memory store mutex poisoned");
        let edges = self.edges.lock().expect("memory store mutex poisoned");
        Ok(StoreStats {
            nodes: nodes.len() as u64,
            edges: edges.len() as u64,
            orphaned: nodes.values().filter(|n| n.orphaned).count() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuillError;
    use crate::types::RelationKind;

    fn node(id: NodeId) -> Node {
        Node {
            id,
            kind: DocumentKind::Stage,
            title: "t".to_string(),
            tags: BTreeSet::new(),
            source_path: "p".to_string(),
            last_synced_hash: 1,
            orphaned: false,
            payload: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn behaves_like_the_sqlite_store() {
        let store = MemoryStore::new();
        store.upsert_node(&node(NodeId::stage(1, 1))).await.unwrap();
        store.upsert_node(&node(NodeId::stage(1, 1))).await.unwrap();
        assert_eq!(store.list_nodes(None).await.unwrap().len(), 1);

        store.mark_orphaned(&NodeId::stage(1, 1)).await.unwrap();
        assert!(store.get_node(&NodeId::stage(1, 1)).await.unwrap().unwrap().orphaned);

        store.upsert_node(&node(NodeId::stage(1, 1))).await.unwrap();
        assert!(!store.get_node(&NodeId::stage(1, 1)).await.unwrap().unwrap().orphaned);
    }

    #[tokio::test]
    async fn edges_are_an_ordered_set() {
        let store = MemoryStore::new();
        let e1 = Edge::new(RelationKind::ReportsOn, NodeId::report(1, 1), NodeId::stage(1, 1));
        let e2 = Edge::new(
            RelationKind::BelongsToStage,
            NodeId::segment(1, 1, "a"),
            NodeId::stage(1, 1),
        );
        store.upsert_edge(&e1).await.unwrap();
        store.upsert_edge(&e2).await.unwrap();
        store.upsert_edge(&e1).await.unwrap();

        assert_eq!(store.list_edges().await.unwrap(), vec![e2, e1]);
    }

    #[tokio::test]
    async fn fault_injection_surfaces_store_unavailable() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.list_nodes(None).await.unwrap_err();
        assert!(matches!(
            err,
            QuillError::Store(StoreError::Unavailable(_))
        ));
    }
}
