//! Resize, move, and creation operations on the scene.
//!
//! None of these refresh connections; call
//! [`refresh_connections_for`](crate::connection::refresh_connections_for)
//! afterwards for every node you touched.

use crate::connection;
use crate::node::{Direction, Node, NodeId, NodeKind};
use crate::scene::SceneStore;
use crate::snap::GridConfig;
use crate::viewport::Viewport;
use kurbo::{Point, Size, Vec2};
use std::collections::HashSet;

/// Minimum width/height a resize may produce (before grid snapping).
pub const MIN_SIZE: f64 = 10.0;

/// Resize a node by dragging the handle on side `direction`.
///
/// `dx`/`dy` are device pixels and are divided by the viewport zoom first.
/// Handles that include `w` or `n` move the position so the opposite edge
/// stays where it was. Group containers scale their members by the same
/// ratios. Lines have no resize handles and are left alone.
pub fn resize(
    store: &mut SceneStore,
    id: &str,
    direction: Direction,
    dx: f64,
    dy: f64,
    viewport: &Viewport,
    grid: &GridConfig,
) -> bool {
    let Some(node) = store.node(id) else {
        log::debug!("resize: {id} not found");
        return false;
    };
    if node.is_line() {
        log::debug!("resize: {id} is a line, ignoring");
        return false;
    }

    let delta = viewport.to_scene_delta(dx, dy);
    let Point { x, y } = node.position;
    let Size { width, height } = node.size();
    let is_group = node.is_group();

    let (mut new_x, mut new_y, mut new_w, mut new_h) = (x, y, width, height);
    if direction.has_east() {
        new_w = (width + delta.x).max(MIN_SIZE);
    }
    if direction.has_west() {
        new_w = (width - delta.x).max(MIN_SIZE);
        new_x = x + (width - new_w);
    }
    if direction.has_south() {
        new_h = (height + delta.y).max(MIN_SIZE);
    }
    if direction.has_north() {
        new_h = (height - delta.y).max(MIN_SIZE);
        new_y = y + (height - new_h);
    }

    // Grid snapping comes after the floor and may undercut it.
    let new_w = grid.apply(new_w);
    let new_h = grid.apply(new_h);
    let new_x = grid.apply(new_x);
    let new_y = grid.apply(new_y);

    store.update_node_position(id, new_x, new_y);
    store.update_node_dimensions(id, new_w, new_h);

    if is_group {
        let sx = (width > 0.0).then(|| new_w / width);
        let sy = (height > 0.0).then(|| new_h / height);
        if sx.is_none() || sy.is_none() {
            log::debug!("resize: group {id} had a zero dimension, not scaling that axis");
        }
        scale_members(store, id, sx, sy, &mut HashSet::new());
    }
    true
}

/// Multiply member positions and sizes by the container's scale ratios.
///
/// Members are in the container's local space, so scaling is about the
/// local origin. Nested containers pass the same ratios down.
fn scale_members(
    store: &mut SceneStore,
    container_id: &str,
    sx: Option<f64>,
    sy: Option<f64>,
    visited: &mut HashSet<NodeId>,
) {
    if !visited.insert(container_id.to_string()) {
        return;
    }
    let members: Vec<NodeId> = store
        .children_of(container_id)
        .into_iter()
        .map(|n| n.id.clone())
        .collect();

    for member in members {
        let Some(node) = store.node_mut(&member) else {
            continue;
        };
        scale_node(node, sx.unwrap_or(1.0), sy.unwrap_or(1.0));
        if node.is_group() {
            scale_members(store, &member, sx, sy, visited);
        }
    }
}

fn scale_node(node: &mut Node, sx: f64, sy: f64) {
    node.position = Point::new(node.position.x * sx, node.position.y * sy);
    if node.is_line() {
        for p in &mut node.points {
            *p = Point::new(p.x * sx, p.y * sy);
        }
        node.normalize_points();
    } else if let Some(size) = node.dimensions {
        node.dimensions = Some(Size::new(size.width * sx, size.height * sy));
    }
}

/// Move nodes by a device-pixel delta.
///
/// Members whose container is also being moved ride along with it instead
/// of moving twice. With the grid on, each resulting position is snapped.
/// Returns the ids that actually moved.
pub fn move_nodes(
    store: &mut SceneStore,
    ids: &[NodeId],
    dx: f64,
    dy: f64,
    viewport: &Viewport,
    grid: &GridConfig,
) -> Vec<NodeId> {
    let delta = viewport.to_scene_delta(dx, dy);
    let requested: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut moved = Vec::new();

    for id in ids {
        if moved.contains(id) || has_ancestor_in(store, id, &requested) {
            continue;
        }
        let Some(node) = store.node(id) else {
            log::debug!("move_nodes: {id} not found");
            continue;
        };
        let target = grid.apply_point(node.position + delta);
        store.update_node_position(id, target.x, target.y);
        moved.push(id.clone());
    }
    moved
}

fn has_ancestor_in(store: &SceneStore, id: &str, set: &HashSet<&str>) -> bool {
    let mut current = store.node(id).and_then(|n| n.parent_id.as_deref());
    let mut steps = 0;
    while let Some(parent) = current {
        if set.contains(parent) {
            return true;
        }
        steps += 1;
        if steps > store.len() {
            break;
        }
        current = store.node(parent).and_then(|n| n.parent_id.as_deref());
    }
    false
}

/// Drag one raw point of a line to an absolute scene position.
///
/// Uses the same normalization as connection refresh, so both paths agree
/// exactly for the same point set.
pub fn move_line_point(
    store: &mut SceneStore,
    line_id: &str,
    point_index: usize,
    x: f64,
    y: f64,
) -> bool {
    let frame_point = Point::new(x, y) - store.frame_origin(line_id);
    match store.node_mut(line_id) {
        Some(line) if line.is_line() => connection::set_line_point(line, point_index, frame_point),
        Some(_) => {
            log::debug!("move_line_point: {line_id} is not a line");
            false
        }
        None => {
            log::debug!("move_line_point: {line_id} not found");
            false
        }
    }
}

/// Create a shape at `(x, y)` and put it on top.
///
/// Line kinds are rejected (use [`create_line`]). Position and size are
/// grid-snapped when the grid is on.
pub fn create_shape(
    store: &mut SceneStore,
    kind: NodeKind,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    grid: &GridConfig,
) -> Option<NodeId> {
    if kind.is_line() {
        return None;
    }
    let position = grid.apply_point(Point::new(x, y));
    let size = Size::new(grid.apply(width.max(0.0)), grid.apply(height.max(0.0)));
    let node = Node::shape(kind, position, size);
    let id = node.id.clone();
    store.add_node(node).then_some(id)
}

/// Create a line or arrow through absolute scene points.
///
/// The first point becomes the line's origin. Needs at least two points.
pub fn create_line(
    store: &mut SceneStore,
    kind: NodeKind,
    points: &[Point],
    grid: &GridConfig,
) -> Option<NodeId> {
    if !kind.is_line() || points.len() < 2 {
        return None;
    }
    let snapped: Vec<Point> = points.iter().map(|p| grid.apply_point(*p)).collect();
    let origin = snapped[0];
    let local = snapped.iter().map(|p| *p - origin.to_vec2()).collect();
    let node = Node::line(kind, origin, local);
    let id = node.id.clone();
    store.add_node(node).then_some(id)
}

/// Displacement that puts a copy of a `size`-sized shape beside it, `gap` apart.
pub(crate) fn cardinal_offset(direction: Direction, size: Size, gap: f64) -> Option<Vec2> {
    match direction {
        Direction::North => Some(Vec2::new(0.0, -(size.height + gap))),
        Direction::South => Some(Vec2::new(0.0, size.height + gap)),
        Direction::East => Some(Vec2::new(size.width + gap, 0.0)),
        Direction::West => Some(Vec2::new(-(size.width + gap), 0.0)),
        _ => None,
    }
}
