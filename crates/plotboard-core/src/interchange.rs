//! JSON interchange document: export, validated import.
//!
//! ```json
//! { "nodes": [...], "connections": [...], "version": "1.0", "exportDate": "..." }
//! ```

use crate::node::{Connection, Node, NodeId, NodeKind};
use crate::scene::SceneStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Version written into exported documents.
pub const FORMAT_VERSION: &str = "1.0";

/// Reasons an import is rejected. The store is never touched when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    Json(String),
    #[error("Document must be a JSON object")]
    NotAnObject,
    #[error("Missing required field `{0}`")]
    MissingField(String),
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("Duplicate node id `{id}` at `{field}`")]
    DuplicateId { id: String, field: String },
}

impl ImportError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ImportError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Path of the offending field, when the error names one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ImportError::MissingField(field)
            | ImportError::InvalidField { field, .. }
            | ImportError::DuplicateId { field, .. } => Some(field),
            ImportError::Json(_) | ImportError::NotAnObject => None,
        }
    }
}

/// The serialized form of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterchangeDocument {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    pub version: String,
    pub export_date: String,
}

impl InterchangeDocument {
    /// Snapshot a scene for export, stamped with the current time.
    pub fn from_store(store: &SceneStore) -> Self {
        Self {
            nodes: store.nodes().to_vec(),
            connections: store.connections().to_vec(),
            version: FORMAT_VERSION.to_string(),
            export_date: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ImportError::Json(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate an already-parsed document.
    ///
    /// Checks run in document order and stop at the first problem, which is
    /// named by its path (`nodes[3].position`, `connections[0]`, ...).
    pub fn from_value(value: Value) -> Result<Self, ImportError> {
        let Value::Object(mut root) = value else {
            return Err(ImportError::NotAnObject);
        };

        let raw_nodes = match root.remove("nodes") {
            Some(Value::Array(nodes)) => nodes,
            Some(_) => return Err(ImportError::invalid("nodes", "expected an array")),
            None => return Err(ImportError::MissingField("nodes".into())),
        };

        let mut nodes = Vec::with_capacity(raw_nodes.len());
        let mut seen: HashSet<NodeId> = HashSet::new();
        for (i, raw) in raw_nodes.into_iter().enumerate() {
            let path = format!("nodes[{i}]");
            validate_node_fields(&raw, &path)?;
            let node: Node = serde_json::from_value(raw)
                .map_err(|e| ImportError::invalid(&path, e.to_string()))?;
            if !seen.insert(node.id.clone()) {
                return Err(ImportError::DuplicateId {
                    id: node.id,
                    field: format!("{path}.id"),
                });
            }
            nodes.push(node);
        }

        let connections = match root.remove("connections") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, raw)| {
                    serde_json::from_value(raw).map_err(|e| {
                        ImportError::invalid(format!("connections[{i}]"), e.to_string())
                    })
                })
                .collect::<Result<Vec<Connection>, _>>()?,
            Some(_) => return Err(ImportError::invalid("connections", "expected an array")),
        };

        let version = match root.remove("version") {
            Some(Value::String(v)) => v,
            _ => FORMAT_VERSION.to_string(),
        };
        if version != FORMAT_VERSION {
            log::warn!("Importing document version {version}, expected {FORMAT_VERSION}");
        }
        let export_date = match root.remove("exportDate") {
            Some(Value::String(d)) => d,
            _ => String::new(),
        };

        Ok(Self {
            nodes,
            connections,
            version,
            export_date,
        })
    }

    /// Replace the store's contents with this document.
    ///
    /// References to nodes that do not exist are dropped with a warning:
    /// dangling connections, connections to out-of-range line points, and
    /// `parentId`s naming a missing container. A node whose parent chain
    /// loops back to itself is detached too. When several connections
    /// claim the same line point, the last one wins.
    pub fn apply_to(self, store: &mut SceneStore) {
        let mut nodes = self.nodes;
        let point_counts: HashMap<NodeId, Option<usize>> = nodes
            .iter()
            .map(|n| (n.id.clone(), n.is_line().then_some(n.points.len())))
            .collect();

        for node in &mut nodes {
            let orphaned = node
                .parent_id
                .as_ref()
                .is_some_and(|parent| !point_counts.contains_key(parent));
            if orphaned {
                log::warn!("Node {} references a missing parent, detaching", node.id);
                node.parent_id = None;
            }
        }
        detach_parent_cycles(&mut nodes);

        let mut connections: Vec<Connection> = Vec::with_capacity(self.connections.len());
        for conn in self.connections {
            let line_ok = matches!(
                point_counts.get(&conn.line_id),
                Some(Some(n)) if conn.point_index < *n
            );
            let shape_ok = point_counts.contains_key(&conn.shape_id);
            if !line_ok || !shape_ok {
                log::warn!(
                    "Dropping connection {}[{}] -> {}: endpoint missing",
                    conn.line_id,
                    conn.point_index,
                    conn.shape_id
                );
                continue;
            }
            connections
                .retain(|c| !(c.line_id == conn.line_id && c.point_index == conn.point_index));
            connections.push(conn);
        }

        log::info!("Imported {} nodes, {} connections", nodes.len(), connections.len());
        store.replace_contents(nodes, connections);
    }
}

/// Break parent chains that loop, detaching the first node found on each loop.
fn detach_parent_cycles(nodes: &mut [Node]) {
    let mut parents: HashMap<NodeId, NodeId> = nodes
        .iter()
        .filter_map(|n| n.parent_id.clone().map(|p| (n.id.clone(), p)))
        .collect();

    for node in nodes.iter_mut() {
        if loops_back(&parents, &node.id) {
            log::warn!("Node {} is its own ancestor, detaching", node.id);
            parents.remove(&node.id);
            node.parent_id = None;
        }
    }
}

fn loops_back(parents: &HashMap<NodeId, NodeId>, id: &str) -> bool {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut cursor = parents.get(id);
    while let Some(parent) = cursor {
        if parent == id {
            return true;
        }
        if !seen.insert(parent.as_str()) {
            return false;
        }
        cursor = parents.get(parent);
    }
    false
}

/// Check the fields every node must carry before handing it to serde, so
/// the error can name the exact field.
fn validate_node_fields(raw: &Value, path: &str) -> Result<(), ImportError> {
    let Value::Object(obj) = raw else {
        return Err(ImportError::invalid(path, "expected an object"));
    };

    match obj.get("id") {
        Some(Value::String(id)) if !id.is_empty() => {}
        Some(Value::String(_)) => {
            return Err(ImportError::invalid(format!("{path}.id"), "must not be empty"));
        }
        Some(_) => return Err(ImportError::invalid(format!("{path}.id"), "expected a string")),
        None => return Err(ImportError::MissingField(format!("{path}.id"))),
    }

    match obj.get("kind") {
        Some(Value::String(kind)) if NodeKind::from_name(kind).is_some() => {}
        Some(Value::String(kind)) => {
            return Err(ImportError::invalid(
                format!("{path}.kind"),
                format!("unknown kind `{kind}`"),
            ));
        }
        Some(_) => return Err(ImportError::invalid(format!("{path}.kind"), "expected a string")),
        None => return Err(ImportError::MissingField(format!("{path}.kind"))),
    }

    match obj.get("position") {
        Some(Value::Object(pos)) if is_coordinate(pos) => Ok(()),
        Some(_) => Err(ImportError::invalid(
            format!("{path}.position"),
            "expected an object with numeric x and y",
        )),
        None => Err(ImportError::MissingField(format!("{path}.position"))),
    }
}

fn is_coordinate(obj: &Map<String, Value>) -> bool {
    obj.get("x").is_some_and(Value::is_number) && obj.get("y").is_some_and(Value::is_number)
}
