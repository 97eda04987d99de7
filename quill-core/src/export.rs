//! `memory.jsonl` export — the knowledge-graph wire format consumed by
//! memory-server style tools.
//!
//! One JSON object per line: every entity first, then every relation, both in
//! store order, so repeated exports of the same graph are byte-identical.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::store::GraphStore;
use crate::types::{Edge, Node, RelationKind};

#[derive(Debug, Serialize)]
struct EntityLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    #[serde(rename = "entityType")]
    entity_type: &'static str,
    observations: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct RelationLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    from: &'a str,
    to: &'a str,
    #[serde(rename = "relationType")]
    relation_type: &'static str,
}

fn relation_type(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::BelongsToStage => "belongs_to_stage",
        RelationKind::ReportsOn => "reports_on",
        RelationKind::MentionsComponent => "mentions_component",
        RelationKind::TaggedWith => "tagged_with",
        RelationKind::References => "references",
        RelationKind::Supersedes => "supersedes",
    }
}

/// Render the export body. Orphaned nodes are included: they are retained
/// history and their edges may still reference them.
pub fn render_memory_jsonl(nodes: &[Node], edges: &[Edge]) -> Result<String> {
    let mut out = String::new();
    for node in nodes {
        let line = EntityLine {
            kind: "entity",
            name: node.id.as_str(),
            entity_type: node.kind.as_str(),
            observations: vec![node.title.as_str()],
        };
        out.push_str(&serde_json::to_string(&line).map_err(crate::error::StoreError::from)?);
        out.push('\n');
    }
    for edge in edges {
        let line = RelationLine {
            kind: "relation",
            from: edge.from.as_str(),
            to: edge.to.as_str(),
            relation_type: relation_type(edge.kind),
        };
        out.push_str(&serde_json::to_string(&line).map_err(crate::error::StoreError::from)?);
        out.push('\n');
    }
    Ok(out)
}

/// Write the full graph to `path` in the entity/relation line format.
pub async fn export_memory(store: &dyn GraphStore, path: &Path) -> Result<u64> {
    let nodes = store.list_nodes(None).await?;
    let edges = store.list_edges().await?;
    let body = render_memory_jsonl(&nodes, &edges)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &body)?;
    let lines = (nodes.len() + edges.len()) as u64;
    info!(path = %path.display(), lines, "Exported memory file");
    Ok(lines)
}
