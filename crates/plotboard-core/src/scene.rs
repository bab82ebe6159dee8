//! The authoritative collection of nodes and connections.
//!
//! The node list doubles as the paint order: index 0 is painted first
//! (bottom), the last node is on top. Every mutator tolerates ids that no
//! longer exist and reports that through its return value instead of failing.

use crate::geometry;
use crate::node::{Connection, Node, NodeId, NodeKind};
use kurbo::{Point, Rect, Size, Vec2};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// The scene: nodes in paint order plus anchored connections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneStore {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
}

impl SceneStore {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// All nodes, bottom to top.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All connection records.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    /// Get a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Paint-order index of a node.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Direct children of a group container.
    pub fn children_of(&self, id: &str) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.parent_id.as_deref() == Some(id))
            .collect()
    }

    /// Every node nested under `id`, at any depth.
    pub fn descendants_of(&self, id: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut frontier = vec![id.to_string()];
        let mut seen: HashSet<NodeId> = HashSet::from([id.to_string()]);
        while let Some(parent) = frontier.pop() {
            for child in self.nodes.iter().filter(|n| n.parent_id.as_ref() == Some(&parent)) {
                if seen.insert(child.id.clone()) {
                    out.push(child.id.clone());
                    frontier.push(child.id.clone());
                }
            }
        }
        out
    }

    /// Connections anchored to `shape_id`.
    pub fn connections_for_shape(&self, shape_id: &str) -> Vec<&Connection> {
        self.connections.iter().filter(|c| c.shape_id == shape_id).collect()
    }

    /// Connections controlling points of `line_id`.
    pub fn connections_for_line(&self, line_id: &str) -> Vec<&Connection> {
        self.connections.iter().filter(|c| c.line_id == line_id).collect()
    }

    /// The connection controlling a given line point, if any.
    pub fn connection_at(&self, line_id: &str, point_index: usize) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.line_id == line_id && c.point_index == point_index)
    }

    /// Scene-space offset of the frame a node's `position` is expressed in.
    pub fn frame_origin(&self, id: &str) -> Vec2 {
        match self.node(id).and_then(|n| n.parent_id.as_deref()) {
            Some(parent) => self.absolute_position(parent).unwrap_or(Point::ZERO).to_vec2(),
            None => Vec2::ZERO,
        }
    }

    /// Scene-space position of a node, adding every enclosing container's offset.
    pub fn absolute_position(&self, id: &str) -> Option<Point> {
        let mut node = self.node(id)?;
        let mut pos = node.position;
        // Bounded walk so a corrupt parent cycle cannot spin forever.
        for _ in 0..self.nodes.len() {
            let Some(parent) = node.parent_id.as_deref().and_then(|p| self.node(p)) else {
                break;
            };
            pos += parent.position.to_vec2();
            node = parent;
        }
        Some(pos)
    }

    /// Scene-space bounds of a node.
    pub fn absolute_bounds(&self, id: &str) -> Option<Rect> {
        let node = self.node(id)?;
        Some(node.bounds() + self.frame_origin(id))
    }

    /// A copy of the node with its position resolved to scene space.
    pub fn absolute_node(&self, id: &str) -> Option<Node> {
        let mut node = self.node(id)?.clone();
        node.position = self.absolute_position(id)?;
        Some(node)
    }

    /// Topmost top-level node under `point`.
    ///
    /// Group members are never hit on their own; lines hit within `tolerance`
    /// of their polyline.
    pub fn node_at(&self, point: Point, tolerance: f64) -> Option<&Node> {
        self.nodes.iter().rev().filter(|n| !n.is_group_member()).find(|n| {
            if n.is_line() {
                geometry::point_to_polyline_dist(point, &n.frame_points()) <= tolerance
            } else {
                n.bounds().inflate(tolerance, tolerance).contains(point)
            }
        })
    }

    /// Top-level nodes whose bounds intersect `rect`, bottom to top.
    pub fn nodes_in_rect(&self, rect: Rect) -> Vec<NodeId> {
        let rect = rect.abs();
        self.nodes
            .iter()
            .filter(|n| !n.is_group_member())
            .filter(|n| {
                let b = n.bounds();
                b.x0 <= rect.x1 && b.x1 >= rect.x0 && b.y0 <= rect.y1 && b.y1 >= rect.y0
            })
            .map(|n| n.id.clone())
            .collect()
    }

    /// Union of all top-level node bounds.
    pub fn bounds(&self) -> Option<Rect> {
        geometry::union_rects(
            self.nodes
                .iter()
                .filter(|n| !n.is_group_member())
                .map(Node::bounds),
        )
    }

    // ------------------------------------------------------------------
    // Node CRUD
    // ------------------------------------------------------------------

    /// Insert a node on top of the paint order.
    ///
    /// Returns false (and leaves the scene untouched) if the id is taken.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.contains(&node.id) {
            log::warn!("Ignoring node with duplicate id {}", node.id);
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Remove a node, its group members, and every connection touching them.
    pub fn remove_node(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            log::debug!("remove_node: {id} not found");
            return false;
        }
        let mut doomed: HashSet<NodeId> = self.descendants_of(id).into_iter().collect();
        doomed.insert(id.to_string());
        self.nodes.retain(|n| !doomed.contains(&n.id));
        self.connections
            .retain(|c| !doomed.contains(&c.line_id) && !doomed.contains(&c.shape_id));
        true
    }

    /// Remove several nodes; returns how many of the given ids were present.
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> usize {
        ids.iter().filter(|id| self.remove_node(id)).count()
    }

    /// Remove every selected node.
    pub fn delete_selected(&mut self) -> usize {
        let ids = self.selected_ids();
        self.remove_nodes(&ids)
    }

    /// Set a node's position. No connection maintenance happens here.
    pub fn update_node_position(&mut self, id: &str, x: f64, y: f64) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.position = Point::new(x, y);
                true
            }
            None => {
                log::debug!("update_node_position: {id} not found");
                false
            }
        }
    }

    /// Set a node's size, clamping negative or non-finite values to zero.
    pub fn update_node_dimensions(&mut self, id: &str, width: f64, height: f64) -> bool {
        let clamp = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        match self.node_mut(id) {
            Some(node) => {
                node.dimensions = Some(Size::new(clamp(width), clamp(height)));
                true
            }
            None => {
                log::debug!("update_node_dimensions: {id} not found");
                false
            }
        }
    }

    /// Set (or with `Value::Null`, clear) one style attribute.
    pub fn update_style(&mut self, id: &str, key: &str, value: Value) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        if value.is_null() {
            node.style.remove(key);
        } else {
            node.style.insert(key.to_string(), value);
        }
        true
    }

    /// Set (or with `Value::Null`, clear) one data attribute.
    pub fn update_data(&mut self, id: &str, key: &str, value: Value) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        if value.is_null() {
            node.data.remove(key);
        } else {
            node.data.insert(key.to_string(), value);
        }
        true
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Select exactly one node.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        for node in &mut self.nodes {
            node.selected = node.id == id;
        }
        true
    }

    /// Select exactly the given nodes; missing ids are skipped.
    ///
    /// Leaves the selection alone and returns false when none of the ids exist.
    pub fn select_many(&mut self, ids: &[NodeId]) -> bool {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        if !self.nodes.iter().any(|n| wanted.contains(n.id.as_str())) {
            return false;
        }
        for node in &mut self.nodes {
            node.selected = wanted.contains(node.id.as_str());
        }
        true
    }

    /// Select every top-level node.
    pub fn select_all(&mut self) {
        for node in &mut self.nodes {
            node.selected = !node.is_group_member();
        }
    }

    pub fn deselect_all(&mut self) {
        for node in &mut self.nodes {
            node.selected = false;
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.node(id).is_some_and(|n| n.selected)
    }

    /// Selected ids, bottom to top.
    pub fn selected_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id.clone())
            .collect()
    }

    // ------------------------------------------------------------------
    // Z-order
    //
    // A group container moves as a block with its members so they stay
    // painted above it.
    // ------------------------------------------------------------------

    fn with_members(&self, ids: &[NodeId]) -> HashSet<NodeId> {
        let mut set: HashSet<NodeId> = HashSet::new();
        for id in ids {
            set.extend(self.descendants_of(id));
            set.insert(id.clone());
        }
        set
    }

    /// Move nodes to the top of the paint order, keeping their relative order.
    pub fn move_to_front(&mut self, ids: &[NodeId]) {
        let set = self.with_members(ids);
        let (moved, rest): (Vec<Node>, Vec<Node>) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|n| set.contains(&n.id));
        self.nodes = rest;
        self.nodes.extend(moved);
    }

    /// Move nodes to the bottom of the paint order, keeping their relative order.
    pub fn move_to_back(&mut self, ids: &[NodeId]) {
        let set = self.with_members(ids);
        let (mut moved, rest): (Vec<Node>, Vec<Node>) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|n| set.contains(&n.id));
        moved.extend(rest);
        self.nodes = moved;
    }

    /// Swap each node with its next-higher unmoved neighbour.
    pub fn move_forward(&mut self, ids: &[NodeId]) {
        let set = self.with_members(ids);
        let mut flags: Vec<bool> = self.nodes.iter().map(|n| set.contains(&n.id)).collect();
        for i in (0..self.nodes.len().saturating_sub(1)).rev() {
            if flags[i] && !flags[i + 1] {
                self.nodes.swap(i, i + 1);
                flags.swap(i, i + 1);
            }
        }
    }

    /// Swap each node with its next-lower unmoved neighbour.
    pub fn move_backward(&mut self, ids: &[NodeId]) {
        let set = self.with_members(ids);
        let mut flags: Vec<bool> = self.nodes.iter().map(|n| set.contains(&n.id)).collect();
        for i in 1..self.nodes.len() {
            if flags[i] && !flags[i - 1] {
                self.nodes.swap(i, i - 1);
                flags.swap(i, i - 1);
            }
        }
    }

    // ------------------------------------------------------------------
    // Duplication
    // ------------------------------------------------------------------

    /// Copy nodes (with their group members) under fresh ids, offset by `offset`.
    ///
    /// Connections whose line and shape are both copied are copied too. The
    /// copies end up on top of the paint order and become the selection.
    /// Returns the ids of the top-level copies, in argument order.
    pub fn duplicate(&mut self, ids: &[NodeId], offset: Vec2) -> Vec<NodeId> {
        let requested: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut id_map: HashMap<NodeId, NodeId> = HashMap::new();
        let mut copies: Vec<Node> = Vec::new();
        let mut roots: Vec<NodeId> = Vec::new();

        for id in ids {
            if id_map.contains_key(id) {
                continue;
            }
            let Some(source) = self.node(id) else {
                log::debug!("duplicate: {id} not found");
                continue;
            };
            // Copied along with an ancestor that is also being duplicated.
            if self.ancestors_of(id).iter().any(|a| requested.contains(a.as_str())) {
                continue;
            }

            let mut copy = source.clone();
            copy.id = crate::node::generate_id();
            copy.translate(offset);
            copy.selected = true;
            id_map.insert(id.clone(), copy.id.clone());
            roots.push(copy.id.clone());
            copies.push(copy);

            for descendant in self.descendants_of(id) {
                if let Some(node) = self.node(&descendant) {
                    let mut child = node.clone();
                    child.id = crate::node::generate_id();
                    child.selected = false;
                    id_map.insert(descendant.clone(), child.id.clone());
                    copies.push(child);
                }
            }
        }

        // Re-point members at their copied containers.
        for copy in copies.iter_mut().filter(|c| !roots.contains(&c.id)) {
            if let Some(parent) = copy.parent_id.as_ref().and_then(|p| id_map.get(p)) {
                copy.parent_id = Some(parent.clone());
            }
        }

        let copied_connections: Vec<Connection> = self
            .connections
            .iter()
            .filter_map(|c| {
                Some(Connection {
                    line_id: id_map.get(&c.line_id)?.clone(),
                    point_index: c.point_index,
                    shape_id: id_map.get(&c.shape_id)?.clone(),
                    position: c.position,
                })
            })
            .collect();

        self.deselect_all();
        self.nodes.extend(copies);
        self.connections.extend(copied_connections);
        roots
    }

    fn ancestors_of(&self, id: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.node(id).and_then(|n| n.parent_id.clone());
        while let Some(parent) = current {
            if out.contains(&parent) || out.len() > self.nodes.len() {
                break;
            }
            current = self.node(&parent).and_then(|n| n.parent_id.clone());
            out.push(parent);
        }
        out
    }

    // ------------------------------------------------------------------
    // Grouping
    // ------------------------------------------------------------------

    /// Wrap top-level nodes in a new group container.
    ///
    /// The container takes the members' union bounds and sits just below the
    /// lowest member in paint order; member positions become container-local.
    /// Returns `None` if fewer than two eligible nodes were given.
    pub fn group(&mut self, ids: &[NodeId]) -> Option<NodeId> {
        let members: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| ids.contains(&n.id) && !n.is_group_member())
            .map(|n| n.id.clone())
            .collect();
        if members.len() < 2 {
            return None;
        }

        let bounds =
            geometry::union_rects(members.iter().filter_map(|id| self.absolute_bounds(id)))?;
        let container = Node::shape(NodeKind::GroupContainer, bounds.origin(), bounds.size());
        let container_id = container.id.clone();
        let origin = bounds.origin().to_vec2();

        let insert_at = members
            .iter()
            .filter_map(|id| self.index_of(id))
            .min()
            .unwrap_or(self.nodes.len());

        for id in &members {
            if let Some(node) = self.node_mut(id) {
                node.position -= origin;
                node.parent_id = Some(container_id.clone());
                node.selected = false;
            }
        }
        self.nodes.insert(insert_at, container);
        Some(container_id)
    }

    /// Dissolve a group container, restoring its members to the container's frame.
    ///
    /// Returns the released member ids, or an empty list if `id` is not a group.
    pub fn ungroup(&mut self, id: &str) -> Vec<NodeId> {
        let Some(container) = self.node(id).filter(|n| n.is_group()).cloned() else {
            return Vec::new();
        };
        let offset = container.position.to_vec2();
        let mut released = Vec::new();
        for node in self.nodes.iter_mut().filter(|n| n.parent_id.as_deref() == Some(id)) {
            node.position += offset;
            node.parent_id = container.parent_id.clone();
            released.push(node.id.clone());
        }
        self.nodes.retain(|n| n.id != id);
        self.connections.retain(|c| !c.references(id));
        released
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Record a connection, replacing any record for the same line point.
    ///
    /// Ignored when either node is missing, the line is not a line, or the
    /// point index is out of range.
    pub fn create_connection(&mut self, connection: Connection) -> bool {
        let Some(line) = self.node(&connection.line_id) else {
            log::debug!("create_connection: line {} not found", connection.line_id);
            return false;
        };
        if !line.is_line() || connection.point_index >= line.points.len() {
            log::debug!(
                "create_connection: {}[{}] is not a line point",
                connection.line_id,
                connection.point_index
            );
            return false;
        }
        if !self.contains(&connection.shape_id) || connection.shape_id == connection.line_id {
            log::debug!("create_connection: shape {} not found", connection.shape_id);
            return false;
        }
        self.connections.retain(|c| {
            !(c.line_id == connection.line_id && c.point_index == connection.point_index)
        });
        self.connections.push(connection);
        true
    }

    /// Remove the connection controlling a line point.
    pub fn remove_connection(&mut self, line_id: &str, point_index: usize) -> Option<Connection> {
        let idx = self
            .connections
            .iter()
            .position(|c| c.line_id == line_id && c.point_index == point_index)?;
        Some(self.connections.remove(idx))
    }

    /// Swap in a complete node/connection set (undo, redo, import).
    pub(crate) fn replace_contents(&mut self, nodes: Vec<Node>, connections: Vec<Connection>) {
        self.nodes = nodes;
        self.connections = connections;
    }

    /// Drop every node and connection.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
    }
}
