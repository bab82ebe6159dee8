//! Keeps anchored lines glued to the shapes they are connected to.
//!
//! Nothing here runs implicitly: after moving or resizing a node the caller
//! invokes [`refresh_connections_for`] (the session does this for you).

use crate::geometry;
use crate::node::{Connection, Direction, Node};
use crate::scene::SceneStore;
use kurbo::Point;
use std::collections::HashSet;

/// Place one point of a line at `frame_point` and re-derive the line's geometry.
///
/// `frame_point` is expressed in the line's own coordinate frame (scene space
/// for top-level lines). Returns false, leaving the line untouched, if the
/// index is out of range.
pub fn set_line_point(line: &mut Node, point_index: usize, frame_point: Point) -> bool {
    let origin = line.position.to_vec2();
    let Some(slot) = line.points.get_mut(point_index) else {
        log::debug!(
            "Skipping point {point_index} of {}: line has {} points",
            line.id,
            line.points.len()
        );
        return false;
    };
    *slot = frame_point - origin;
    line.normalize_points();
    true
}

/// Move the endpoint a connection controls onto `anchor`.
///
/// `anchor` is in the line's frame. Skipped when the line is shorter than
/// the connection's point index.
pub fn refresh_line(line: &mut Node, connection: &Connection, anchor: Point) -> bool {
    set_line_point(line, connection.point_index, anchor)
}

/// Scene-space anchor point of a shape, including enclosing group offsets.
///
/// `None` if the shape is missing or does not define the direction.
pub fn anchor_position(store: &SceneStore, shape_id: &str, direction: Direction) -> Option<Point> {
    let shape = store.absolute_node(shape_id)?;
    geometry::anchor_point(&shape, direction)
}

/// Re-glue a single connection. Returns whether the line changed.
pub fn refresh_connection(store: &mut SceneStore, connection: &Connection) -> bool {
    let Some(anchor) = anchor_position(store, &connection.shape_id, connection.position) else {
        log::debug!(
            "No anchor {} on {}, leaving {} as is",
            connection.position.as_str(),
            connection.shape_id,
            connection.line_id
        );
        return false;
    };
    let anchor = anchor - store.frame_origin(&connection.line_id);
    match store.node_mut(&connection.line_id) {
        Some(line) => refresh_line(line, connection, anchor),
        None => false,
    }
}

/// Refresh every connection touching `id`.
///
/// That is each connection anchored to `id` or to any node nested inside it,
/// plus each connection whose line is `id` or nested inside it. Returns the
/// number of lines updated.
pub fn refresh_connections_for(store: &mut SceneStore, id: &str) -> usize {
    let mut affected: HashSet<String> = store.descendants_of(id).into_iter().collect();
    affected.insert(id.to_string());

    let pending: Vec<Connection> = store
        .connections()
        .iter()
        .filter(|c| affected.contains(&c.shape_id) || affected.contains(&c.line_id))
        .cloned()
        .collect();

    pending
        .iter()
        .filter(|c| refresh_connection(store, c))
        .count()
}

/// Refresh every connection in the scene.
pub fn refresh_all(store: &mut SceneStore) -> usize {
    let pending = store.connections().to_vec();
    pending
        .iter()
        .filter(|c| refresh_connection(store, c))
        .count()
}

/// Re-derive the geometry of every line from its points.
///
/// Repairs documents whose stored `dimensions` or origins drifted from
/// their points. Returns the number of lines visited.
pub fn normalize_all_lines(store: &mut SceneStore) -> usize {
    let line_ids: Vec<String> = store
        .nodes()
        .iter()
        .filter(|n| n.is_line() && !n.points.is_empty())
        .map(|n| n.id.clone())
        .collect();
    for id in &line_ids {
        if let Some(line) = store.node_mut(id) {
            line.normalize_points();
        }
    }
    line_ids.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use kurbo::{Size, Vec2};

    fn assert_close(a: Point, b: Point) {
        assert!((a - b).hypot() < 1e-9, "{a:?} != {b:?}");
    }

    fn endpoint(store: &SceneStore, line_id: &str, index: usize) -> Point {
        let line = store.absolute_node(line_id).unwrap();
        line.position + line.points[index].to_vec2()
    }

    fn linked_scene() -> SceneStore {
        let mut store = SceneStore::new();
        store.add_node(
            Node::shape(NodeKind::Rectangle, Point::new(0.0, 0.0), Size::new(100.0, 50.0))
                .with_id("a"),
        );
        store.add_node(
            Node::shape(NodeKind::Circle, Point::new(300.0, 0.0), Size::new(60.0, 60.0))
                .with_id("b"),
        );
        store.add_node(
            Node::line(
                NodeKind::Arrow,
                Point::new(100.0, 25.0),
                vec![Point::ZERO, Point::new(200.0, 5.0)],
            )
            .with_id("l"),
        );
        store.create_connection(Connection::new("l", 0, "a", Direction::East));
        store.create_connection(Connection::new("l", 1, "b", Direction::West));
        store
    }

    #[test]
    fn test_refresh_line_skips_short_line() {
        let mut line =
            Node::line(NodeKind::Line, Point::ZERO, vec![Point::ZERO, Point::new(10.0, 0.0)]);
        let before = line.clone();
        let conn = Connection::new(line.id.clone(), 4, "s", Direction::North);
        assert!(!refresh_line(&mut line, &conn, Point::new(50.0, 50.0)));
        assert_eq!(line, before);
    }

    #[test]
    fn test_refresh_line_reorigins_negative_points() {
        let mut line = Node::line(
            NodeKind::Line,
            Point::new(100.0, 100.0),
            vec![Point::ZERO, Point::new(50.0, 50.0)],
        );
        let conn = Connection::new(line.id.clone(), 0, "s", Direction::North);
        assert!(refresh_line(&mut line, &conn, Point::new(80.0, 90.0)));
        assert_eq!(line.position, Point::new(80.0, 90.0));
        assert_eq!(line.points[0], Point::ZERO);
        assert_eq!(line.points[1], Point::new(70.0, 60.0));
        let dims = line.dimensions.unwrap();
        assert!((dims.width - 90.0).abs() < f64::EPSILON);
        assert!((dims.height - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_moving_shape_updates_every_line() {
        let mut store = linked_scene();
        store.add_node(
            Node::line(
                NodeKind::Line,
                Point::new(50.0, 50.0),
                vec![Point::ZERO, Point::new(0.0, 100.0)],
            )
            .with_id("l2"),
        );
        store.create_connection(Connection::new("l2", 0, "a", Direction::South));

        store.update_node_position("a", -40.0, 200.0);
        assert_eq!(refresh_connections_for(&mut store, "a"), 2);

        assert_close(endpoint(&store, "l", 0), Point::new(60.0, 225.0));
        assert_close(endpoint(&store, "l2", 0), Point::new(10.0, 250.0));
        // The far end stays on the circle.
        assert_close(endpoint(&store, "l", 1), Point::new(300.0, 30.0));
    }

    #[test]
    fn test_refresh_follows_group_members() {
        let mut store = linked_scene();
        store.add_node(
            Node::shape(NodeKind::Rectangle, Point::new(0.0, 200.0), Size::new(10.0, 10.0))
                .with_id("c"),
        );
        let group = store.group(&["b".to_string(), "c".to_string()]).unwrap();

        let origin = store.node(&group).unwrap().position;
        store.update_node_position(&group, origin.x + 15.0, origin.y + 15.0);
        assert_eq!(refresh_connections_for(&mut store, &group), 1);
        assert_close(endpoint(&store, "l", 1), Point::new(315.0, 45.0));
    }

    #[test]
    fn test_refresh_skips_undefined_anchor() {
        let mut store = SceneStore::new();
        store.add_node(
            Node::shape(NodeKind::Triangle, Point::ZERO, Size::new(40.0, 40.0)).with_id("t"),
        );
        store.add_node(
            Node::line(
                NodeKind::Line,
                Point::new(100.0, 100.0),
                vec![Point::ZERO, Point::new(10.0, 10.0)],
            )
            .with_id("l"),
        );
        store.create_connection(Connection::new("l", 0, "t", Direction::NorthWest));
        let before = store.node("l").cloned();
        assert_eq!(refresh_all(&mut store), 0);
        assert_eq!(store.node("l").cloned(), before);
    }

    #[test]
    fn test_anchor_position_accounts_for_parent() {
        let mut store = SceneStore::new();
        store.add_node(
            Node::shape(NodeKind::Rectangle, Point::new(10.0, 10.0), Size::new(20.0, 20.0))
                .with_id("a"),
        );
        store.add_node(
            Node::shape(NodeKind::Rectangle, Point::new(50.0, 50.0), Size::new(20.0, 20.0))
                .with_id("b"),
        );
        store.group(&["a".to_string(), "b".to_string()]);
        assert_eq!(
            anchor_position(&store, "b", Direction::SouthEast),
            Some(Point::new(70.0, 70.0))
        );
        assert_eq!(anchor_position(&store, "missing", Direction::North), None);
    }

    #[test]
    fn test_normalize_all_lines_fixes_dimensions() {
        let mut store = linked_scene();
        let mut stale =
            Node::line(NodeKind::Line, Point::ZERO, vec![Point::ZERO, Point::new(30.0, 40.0)])
                .with_id("s");
        stale.dimensions = Some(Size::new(999.0, 1.0));
        stale.points[0] = Point::new(-10.0, 0.0);
        store.add_node(stale);

        assert_eq!(normalize_all_lines(&mut store), 2);
        let fixed = store.node("s").unwrap();
        assert_eq!(fixed.position, Point::new(-10.0, 0.0));
        assert_eq!(fixed.points, vec![Point::ZERO, Point::new(40.0, 40.0)]);
        assert_eq!(fixed.dimensions, Some(Size::new(60.0, 60.0)));
    }

    #[test]
    fn test_set_line_point_translation_invariant() {
        let pts = vec![Point::new(3.0, 4.0), Point::new(40.0, 10.0), Point::new(12.0, 70.0)];
        let mut a = Node::line(NodeKind::Line, Point::new(10.0, 10.0), pts.clone());
        let shifted: Vec<Point> = pts.iter().map(|p| *p + Vec2::new(25.0, 25.0)).collect();
        let mut b = Node::line(NodeKind::Line, Point::new(-15.0, -15.0), shifted);
        assert!(set_line_point(&mut a, 1, Point::new(-20.0, 0.0)));
        assert!(set_line_point(&mut b, 1, Point::new(-20.0, 0.0)));
        for (pa, pb) in a.frame_points().iter().zip(b.frame_points()) {
            assert_close(*pa, pb);
        }
    }
}
