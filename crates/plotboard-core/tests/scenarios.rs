//! End-to-end editing scenarios against the public API.

use approx::assert_relative_eq;
use kurbo::{Point, Size, Vec2};
use plotboard_core::{
    Connection, Direction, GridConfig, InterchangeDocument, LINE_PADDING, MIN_SIZE, Node, NodeKind,
    SceneStore, Session, Viewport, anchor_point, bounding_box_of, connection, move_line_point,
    refresh_connections_for, resize,
};

fn endpoint(store: &SceneStore, line: &str, index: usize) -> Point {
    let node = store.absolute_node(line).unwrap();
    node.position + node.points[index].to_vec2()
}

#[test]
fn move_line_point_keeps_origin_when_nothing_goes_negative() {
    let mut store = SceneStore::new();
    store.add_node(
        Node::line(
            NodeKind::Line,
            Point::new(100.0, 100.0),
            vec![Point::ZERO, Point::new(100.0, 100.0)],
        )
        .with_id("line"),
    );

    // Local (150, 50) expressed in scene space.
    assert!(move_line_point(&mut store, "line", 1, 250.0, 150.0));

    let line = store.node("line").unwrap();
    let dims = line.dimensions.unwrap();
    assert!(dims.width >= 150.0);
    assert!(dims.height >= 50.0);
    assert_eq!(line.position, Point::new(100.0, 100.0));
}

#[test]
fn west_handle_resize_grows_leftwards() {
    let mut store = SceneStore::new();
    store.add_node(
        Node::shape(NodeKind::Rectangle, Point::ZERO, Size::new(100.0, 50.0)).with_id("r"),
    );
    resize(&mut store, "r", Direction::West, -20.0, 0.0, &Viewport::new(), &GridConfig::default());

    let r = store.node("r").unwrap();
    assert_relative_eq!(r.size().width, 120.0);
    assert_relative_eq!(r.position.x, -20.0);
}

#[test]
fn import_missing_position_leaves_store_untouched() {
    let mut session = Session::default();
    let a = session.add_shape(NodeKind::Rectangle, 0.0, 0.0, 10.0, 10.0).unwrap();
    let b = session.add_shape(NodeKind::Circle, 20.0, 0.0, 10.0, 10.0).unwrap();
    let before: Vec<String> = session.store().nodes().iter().map(|n| n.id.clone()).collect();

    let json = r#"{
        "nodes": [
            {"id": "x", "kind": "rectangle", "position": {"x": 1, "y": 1}},
            {"id": "y", "kind": "circle"}
        ],
        "connections": [],
        "version": "1.0",
        "exportDate": "2024-01-01T00:00:00Z"
    }"#;
    let err = session.import_json(json).unwrap_err();
    assert!(err.to_string().contains("nodes[1].position"));

    let after: Vec<String> = session.store().nodes().iter().map(|n| n.id.clone()).collect();
    assert_eq!(after, before);
    assert_eq!(after, vec![a, b]);
}

#[test]
fn undo_then_redo_restores_identical_state() {
    let mut session = Session::default();
    let a = session.add_shape(NodeKind::Rectangle, 0.0, 0.0, 80.0, 40.0).unwrap();
    session.commit();
    let b = session.add_shape(NodeKind::Diamond, 200.0, 0.0, 60.0, 60.0).unwrap();
    session.commit();
    session.begin_line(NodeKind::Arrow, 80.0, 20.0);
    session.extend_line(200.0, 30.0);
    session.finish_line().unwrap();
    session.commit();
    session.move_nodes(&[b.clone()], 0.0, 90.0);
    session.commit();
    session.resize(&a, Direction::SouthEast, 25.0, 25.0);
    session.commit();
    session.store_mut().update_style(&a, "fill", "#abcdef".into());
    session.commit();

    let final_nodes = session.store().nodes().to_vec();
    let final_connections = session.store().connections().to_vec();
    let edits = 6;

    for _ in 0..edits {
        assert!(session.undo());
    }
    assert!(session.store().is_empty());
    assert!(!session.undo());

    for _ in 0..edits {
        assert!(session.redo());
    }
    assert!(!session.redo());
    assert_eq!(session.store().nodes(), final_nodes.as_slice());
    assert_eq!(session.store().connections(), final_connections.as_slice());
}

#[test]
fn anchored_endpoints_track_every_kind_and_direction() {
    let kinds = [
        NodeKind::Rectangle,
        NodeKind::Circle,
        NodeKind::Diamond,
        NodeKind::Cylinder,
        NodeKind::Triangle,
        NodeKind::Text,
        NodeKind::Icon,
    ];
    let edits: [(Direction, f64, f64); 4] = [
        (Direction::SouthEast, 37.0, 11.0),
        (Direction::NorthWest, 13.0, -29.0),
        (Direction::West, 250.0, 0.0),
        (Direction::North, 0.0, 400.0),
    ];

    for kind in kinds {
        for dir in Direction::ALL {
            let mut store = SceneStore::new();
            let shape =
                Node::shape(kind, Point::new(40.0, 60.0), Size::new(90.0, 70.0)).with_id("s");
            let Some(start) = anchor_point(&shape, dir) else {
                continue;
            };
            store.add_node(shape);
            store.add_node(
                Node::line(NodeKind::Line, start, vec![Point::ZERO, Point::new(300.0, 300.0)])
                    .with_id("l"),
            );
            assert!(store.create_connection(Connection::new("l", 0, "s", dir)));

            let vp = Viewport {
                zoom: 1.7,
                ..Viewport::default()
            };
            for (handle, dx, dy) in edits {
                resize(&mut store, "s", handle, dx, dy, &vp, &GridConfig::default());
                refresh_connections_for(&mut store, "s");
                let pos = store.node("s").unwrap().position;
                store.update_node_position("s", pos.x - dx / 3.0, pos.y + dy / 5.0);
                refresh_connections_for(&mut store, "s");

                let expected = anchor_point(store.node("s").unwrap(), dir).unwrap();
                let actual = endpoint(&store, "l", 0);
                assert!(
                    (expected - actual).hypot() < 1e-9,
                    "{kind:?}/{dir:?}: {actual:?} drifted from {expected:?}"
                );
            }
        }
    }
}

#[test]
fn resize_floor_holds_for_huge_deltas() {
    for dir in Direction::ALL {
        let mut store = SceneStore::new();
        store.add_node(
            Node::shape(NodeKind::Rectangle, Point::new(10.0, 10.0), Size::new(60.0, 40.0))
                .with_id("r"),
        );
        let dx = if dir.has_west() { 1e9 } else { -1e9 };
        let dy = if dir.has_north() { 1e9 } else { -1e9 };
        resize(&mut store, "r", dir, dx, dy, &Viewport::new(), &GridConfig::default());

        let r = store.node("r").unwrap();
        let size = r.size();
        assert!(size.width >= MIN_SIZE, "{dir:?}");
        assert!(size.height >= MIN_SIZE, "{dir:?}");
        if dir.has_west() {
            assert_relative_eq!(r.position.x + size.width, 70.0, epsilon = 1e-9);
        }
        if dir.has_north() {
            assert_relative_eq!(r.position.y + size.height, 50.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn bounding_box_contains_points_with_padding() {
    let sets: [&[Point]; 4] = [
        &[Point::new(5.0, 5.0)],
        &[Point::new(0.0, 0.0), Point::new(100.0, 100.0)],
        &[Point::new(-30.0, 12.0), Point::new(7.0, -3.5), Point::new(64.0, 80.0)],
        &[Point::new(2.0, 2.0), Point::new(2.0, 2.0)],
    ];
    for points in sets {
        let bb = bounding_box_of(points, LINE_PADDING);
        assert!(bb.width >= 1.0 && bb.height >= 1.0);
        let rect = bb.rect();
        for p in points {
            assert!(p.x - rect.x0 >= LINE_PADDING - 1e-9);
            assert!(p.y - rect.y0 >= LINE_PADDING - 1e-9);
            assert!(rect.x1 - p.x >= LINE_PADDING - 1e-9);
            assert!(rect.y1 - p.y >= LINE_PADDING - 1e-9);
        }
    }
}

#[test]
fn re_origin_is_translation_invariant() {
    let base = vec![Point::new(0.0, 0.0), Point::new(-45.0, 20.0), Point::new(30.0, -60.0)];
    let reference =
        Node::line(NodeKind::Line, Point::new(200.0, 200.0), base.clone()).frame_points();

    for shift in [Vec2::new(45.0, 60.0), Vec2::new(-100.0, 3.0), Vec2::new(1000.0, 1000.0)] {
        let moved: Vec<Point> = base.iter().map(|p| *p + shift).collect();
        let line = Node::line(NodeKind::Line, Point::new(200.0, 200.0) - shift, moved);
        for (a, b) in line.frame_points().iter().zip(&reference) {
            assert!((*a - *b).hypot() < 1e-9);
        }
        assert!(line.points.iter().all(|p| p.x >= 0.0 && p.y >= 0.0));
    }
}

#[test]
fn group_resize_scales_and_keeps_lines_attached() {
    let mut session = Session::default();
    let a = session.add_shape(NodeKind::Rectangle, 0.0, 0.0, 50.0, 50.0).unwrap();
    let b = session.add_shape(NodeKind::Rectangle, 100.0, 0.0, 50.0, 50.0).unwrap();
    let outside = session.add_shape(NodeKind::Circle, 0.0, 300.0, 40.0, 40.0).unwrap();
    let group = session.store_mut().group(&[a.clone(), b.clone()]).unwrap();

    let line = session
        .add_line(NodeKind::Arrow, &[Point::new(125.0, 50.0), Point::new(20.0, 300.0)])
        .unwrap();
    session
        .store_mut()
        .create_connection(Connection::new(line.clone(), 0, b.clone(), Direction::South));
    session
        .store_mut()
        .create_connection(Connection::new(line.clone(), 1, outside, Direction::North));

    assert!(session.resize(&group, Direction::SouthEast, 150.0, 50.0));
    let store = session.store();
    assert_eq!(store.node(&group).unwrap().size(), Size::new(300.0, 100.0));
    assert_eq!(store.absolute_position(&b), Some(Point::new(200.0, 0.0)));
    assert_eq!(store.node(&b).unwrap().size(), Size::new(100.0, 100.0));
    assert_eq!(endpoint(store, &line, 0), Point::new(250.0, 100.0));
    assert_eq!(endpoint(store, &line, 1), Point::new(20.0, 300.0));
}

#[test]
fn deleting_a_shape_drops_its_connections_and_survives_round_trip() {
    let mut session = Session::default();
    let a = session.add_shape(NodeKind::Rectangle, 0.0, 0.0, 40.0, 40.0).unwrap();
    let (copy, arrow) = session.duplicate_and_connect(&a, Direction::East).unwrap();
    assert_eq!(session.store().connections().len(), 2);

    session.remove(&[copy]);
    let remaining: Vec<&Connection> = session.store().connections_for_line(&arrow);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].shape_id, a);

    let json = session.export_json().unwrap();
    let document = InterchangeDocument::from_json(&json).unwrap();
    assert_eq!(document.nodes.len(), 2);
    assert_eq!(document.connections.len(), 1);

    let mut store = SceneStore::new();
    document.apply_to(&mut store);
    assert_eq!(connection::refresh_all(&mut store), 1);
    assert_eq!(store.nodes(), session.store().nodes());
}
