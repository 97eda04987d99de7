use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::error::StoreError;
use crate::types::{DocumentKind, Edge, Node, NodeId, RelationKind, StoreStats};

use super::GraphStore;
use super::schema;

/// SQLite-backed implementation of [`GraphStore`].
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    #[allow(dead_code)]
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path. Store calls block for at
    /// most `busy_timeout_ms` before surfacing `StoreUnavailable`.
    pub fn open(path: &Path, busy_timeout_ms: u64) -> crate::error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(unavailable_or_sqlite)?;
        conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))
            .map_err(unavailable_or_sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(unavailable_or_sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("quill store mutex poisoned");

        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(StoreError::Sqlite)?;
        // WAL mode is silently ignored for in-memory databases.
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(StoreError::Sqlite)?;
        conn.execute(
            "INSERT OR IGNORE INTO quill_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(())
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> crate::error::Result<T> {
        let conn = self.conn.lock().expect("quill store mutex poisoned");
        f(&conn).map_err(|e| unavailable_or_sqlite(e).into())
    }
}

/// Busy and cannot-open conditions mean the backing service is unreachable
/// within the bounded timeout; everything else is a plain store error.
fn unavailable_or_sqlite(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, msg)
            if matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen
            ) =>
        {
            StoreError::Unavailable(msg.clone().unwrap_or_else(|| e.to_string()))
        }
        _ => StoreError::Sqlite(e),
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    let id: String = row.get("node_id")?;
    let kind: String = row.get("kind")?;
    let tags_json: String = row.get("tags")?;
    let payload_json: String = row.get("payload")?;
    let hash: i64 = row.get("last_synced_hash")?;
    let orphaned: i64 = row.get("orphaned")?;

    let tags: BTreeSet<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    let payload: serde_json::Value =
        serde_json::from_str(&payload_json).unwrap_or(serde_json::Value::Null);
    let kind = DocumentKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown node kind `{kind}`").into(),
        )
    })?;

    Ok(Node {
        id: NodeId::from_raw(id),
        kind,
        title: row.get("title")?,
        tags,
        source_path: row.get("source_path")?,
        last_synced_hash: hash as u64,
        orphaned: orphaned != 0,
        payload,
    })
}

#[async_trait::async_trait]
impl GraphStore for SqliteStore {
    #[allow(clippy::cast_possible_wrap)]
    async fn upsert_node(&self, node: &Node) -> crate::error::Result<()> {
        let tags = serde_json::to_string(&node.tags).map_err(StoreError::Serialization)?;
        let payload = serde_json::to_string(&node.payload).map_err(StoreError::Serialization)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO nodes
                   (node_id, kind, title, tags, source_path, last_synced_hash,
                    orphaned, payload, last_synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)
                 ON CONFLICT(node_id) DO UPDATE SET
                   kind = excluded.kind,
                   title = excluded.title,
                   tags = excluded.tags,
                   source_path = excluded.source_path,
                   last_synced_hash = excluded.last_synced_hash,
                   orphaned = 0,
                   payload = excluded.payload,
                   last_synced_at = excluded.last_synced_at",
                params![
                    node.id.as_str(),
                    node.kind.as_str(),
                    node.title,
                    tags,
                    node.source_path,
                    node.last_synced_hash as i64,
                    payload,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    async fn get_node(&self, id: &NodeId) -> crate::error::Result<Option<Node>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM nodes WHERE node_id = ?1",
                params![id.as_str()],
                row_to_node,
            )
            .optional()
        })
    }

    async fn list_nodes(&self, kind: Option<DocumentKind>) -> crate::error::Result<Vec<Node>> {
        self.with_conn(|conn| match kind {
            Some(kind) => {
                let mut stmt = conn
                    .prepare("SELECT * FROM nodes WHERE kind = ?1 ORDER BY node_id")?;
                let rows = stmt.query_map(params![kind.as_str()], row_to_node)?;
                rows.collect()
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM nodes ORDER BY node_id")?;
                let rows = stmt.query_map([], row_to_node)?;
                rows.collect()
            }
        })
    }

    async fn mark_orphaned(&self, id: &NodeId) -> crate::error::Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE nodes SET orphaned = 1 WHERE node_id = ?1",
                params![id.as_str()],
            )?;
            Ok(())
        })
    }

    async fn upsert_edge(&self, edge: &Edge) -> crate::error::Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO edges (kind, from_id, to_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    edge.kind.as_str(),
                    edge.from.as_str(),
                    edge.to.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    async fn list_edges(&self) -> crate::error::Result<Vec<Edge>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT kind, from_id, to_id FROM edges")?;
            let rows = stmt.query_map([], |row| {
                let kind: String = row.get(0)?;
                let from: String = row.get(1)?;
                let to: String = row.get(2)?;
                Ok((kind, from, to))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        let mut edges: Vec<Edge> = rows
            .into_iter()
            .filter_map(|(kind, from, to)| {
                RelationKind::parse(&kind)
                    .map(|kind| Edge::new(kind, NodeId::from_raw(from), NodeId::from_raw(to)))
            })
            .collect();
        // Sorted by Edge's own ordering, which follows relation-kind variant
        // order rather than the column's lexical order.
        edges.sort();
        Ok(edges)
    }

    async fn remove_edge(&self, edge: &Edge) -> crate::error::Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM edges WHERE kind = ?1 AND from_id = ?2 AND to_id = ?3",
                params![edge.kind.as_str(), edge.from.as_str(), edge.to.as_str()],
            )?;
            Ok(())
        })
    }

    async fn stats(&self) -> crate::error::Result<StoreStats> {
        self.with_conn(|conn| {
            let nodes: u64 =
                conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))?;
            let orphaned: u64 = conn.query_row(
                "SELECT COUNT(*) FROM nodes WHERE orphaned = 1",
                [],
                |r| r.get(0),
            )?;
            let edges: u64 =
                conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?;
            Ok(StoreStats {
                nodes,
                edges,
                orphaned,
            })
        })
    }
}
