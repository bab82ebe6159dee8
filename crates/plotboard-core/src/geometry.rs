//! Pure geometry helpers: perimeter anchors and padded bounding boxes.

use crate::node::{Direction, Node, NodeKind};
use kurbo::{Point, Rect, Vec2};

/// Padding applied around a line's points when deriving its box (scene units).
pub const LINE_PADDING: f64 = 10.0;

/// Smallest width/height a derived box may report.
pub const MIN_BOX_EXTENT: f64 = 1.0;

/// Padded axis-aligned box around a set of local-space points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Padded minimum X (may be negative).
    pub min_x: f64,
    /// Padded minimum Y (may be negative).
    pub min_y: f64,
    /// Padded width, never below [`MIN_BOX_EXTENT`].
    pub width: f64,
    /// Padded height, never below [`MIN_BOX_EXTENT`].
    pub height: f64,
    /// Re-origin shift on X. Zero unless a point went negative; otherwise the
    /// (negative) amount the owner's origin must move so all points are >= 0.
    pub shift_x: f64,
    /// Re-origin shift on Y.
    pub shift_y: f64,
}

impl BoundingBox {
    /// Check if any re-origin is required.
    pub fn needs_shift(&self) -> bool {
        self.shift_x != 0.0 || self.shift_y != 0.0
    }

    /// The shift as a vector.
    pub fn shift(&self) -> Vec2 {
        Vec2::new(self.shift_x, self.shift_y)
    }

    /// The padded box as a rect in the same local space as the input points.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.min_x,
            self.min_y,
            self.min_x + self.width,
            self.min_y + self.height,
        )
    }
}

/// Compute the padded bounding box of `points`.
///
/// An empty set yields a unit box at the origin with no shift.
pub fn bounding_box_of(points: &[Point], padding: f64) -> BoundingBox {
    let Some(first) = points.first() else {
        return BoundingBox {
            min_x: 0.0,
            min_y: 0.0,
            width: MIN_BOX_EXTENT,
            height: MIN_BOX_EXTENT,
            shift_x: 0.0,
            shift_y: 0.0,
        };
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    BoundingBox {
        min_x: min_x - padding,
        min_y: min_y - padding,
        width: (max_x - min_x + 2.0 * padding).max(MIN_BOX_EXTENT),
        height: (max_y - min_y + 2.0 * padding).max(MIN_BOX_EXTENT),
        shift_x: min_x.min(0.0),
        shift_y: min_y.min(0.0),
    }
}

/// Absolute anchor point of `node` for `direction`.
///
/// Returns `None` only for directions a shape does not define (the triangle's
/// `nw`/`ne`). Lines and dimensionless nodes fall back to `node.position`.
pub fn anchor_point(node: &Node, direction: Direction) -> Option<Point> {
    let Some(size) = node.dimensions else {
        return Some(node.position);
    };
    let Point { x, y } = node.position;
    let (w, h) = (size.width, size.height);

    match node.kind {
        NodeKind::Line | NodeKind::Arrow => Some(node.position),
        NodeKind::Circle => {
            let (rx, ry) = (w / 2.0, h / 2.0);
            let center = Point::new(x + rx, y + ry);
            let diag = std::f64::consts::FRAC_1_SQRT_2;
            let p = match direction {
                Direction::North => Point::new(center.x, center.y - ry),
                Direction::South => Point::new(center.x, center.y + ry),
                Direction::East => Point::new(center.x + rx, center.y),
                Direction::West => Point::new(center.x - rx, center.y),
                Direction::NorthWest => Point::new(center.x - rx * diag, center.y - ry * diag),
                Direction::NorthEast => Point::new(center.x + rx * diag, center.y - ry * diag),
                Direction::SouthWest => Point::new(center.x - rx * diag, center.y + ry * diag),
                Direction::SouthEast => Point::new(center.x + rx * diag, center.y + ry * diag),
            };
            Some(p)
        }
        NodeKind::Triangle => match direction {
            Direction::North => Some(Point::new(x + w / 2.0, y)),
            Direction::South => Some(Point::new(x + w / 2.0, y + h)),
            Direction::SouthWest => Some(Point::new(x, y + h)),
            Direction::SouthEast => Some(Point::new(x + w, y + h)),
            // Midpoints of the slanted edges.
            Direction::West => Some(Point::new(x + w / 4.0, y + h / 2.0)),
            Direction::East => Some(Point::new(x + 3.0 * w / 4.0, y + h / 2.0)),
            Direction::NorthWest | Direction::NorthEast => None,
        },
        NodeKind::Rectangle
        | NodeKind::Diamond
        | NodeKind::Cylinder
        | NodeKind::Text
        | NodeKind::Icon
        | NodeKind::GroupContainer => Some(box_anchor(Rect::new(x, y, x + w, y + h), direction)),
    }
}

/// Corner or edge midpoint of a rect.
fn box_anchor(rect: Rect, direction: Direction) -> Point {
    let center = rect.center();
    match direction {
        Direction::North => Point::new(center.x, rect.y0),
        Direction::South => Point::new(center.x, rect.y1),
        Direction::East => Point::new(rect.x1, center.y),
        Direction::West => Point::new(rect.x0, center.y),
        Direction::NorthWest => Point::new(rect.x0, rect.y0),
        Direction::NorthEast => Point::new(rect.x1, rect.y0),
        Direction::SouthWest => Point::new(rect.x0, rect.y1),
        Direction::SouthEast => Point::new(rect.x1, rect.y1),
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    (point - (a + seg * t)).hypot()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => (point - *only).hypot(),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Union of a sequence of rects, `None` when empty.
pub fn union_rects(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().reduce(|acc, r| acc.union(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;

    fn shape(kind: NodeKind, x: f64, y: f64, w: f64, h: f64) -> Node {
        Node::shape(kind, Point::new(x, y), Size::new(w, h))
    }

    #[test]
    fn test_rectangle_anchors() {
        let rect = shape(NodeKind::Rectangle, 10.0, 20.0, 100.0, 50.0);
        assert_eq!(anchor_point(&rect, Direction::North), Some(Point::new(60.0, 20.0)));
        assert_eq!(anchor_point(&rect, Direction::South), Some(Point::new(60.0, 70.0)));
        assert_eq!(anchor_point(&rect, Direction::East), Some(Point::new(110.0, 45.0)));
        assert_eq!(anchor_point(&rect, Direction::West), Some(Point::new(10.0, 45.0)));
        assert_eq!(anchor_point(&rect, Direction::NorthWest), Some(Point::new(10.0, 20.0)));
        assert_eq!(anchor_point(&rect, Direction::SouthEast), Some(Point::new(110.0, 70.0)));
    }

    #[test]
    fn test_circle_diagonals_lie_on_circle() {
        let circle = shape(NodeKind::Circle, 0.0, 0.0, 100.0, 100.0);
        let center = Point::new(50.0, 50.0);
        for dir in Direction::ALL {
            let p = anchor_point(&circle, dir).unwrap();
            assert!(((p - center).hypot() - 50.0).abs() < 1e-9, "{dir:?} off circle");
        }
        let ne = anchor_point(&circle, Direction::NorthEast).unwrap();
        assert!(ne.x < 100.0 && ne.y > 0.0);
    }

    #[test]
    fn test_triangle_anchors() {
        let tri = shape(NodeKind::Triangle, 0.0, 0.0, 100.0, 80.0);
        assert_eq!(anchor_point(&tri, Direction::North), Some(Point::new(50.0, 0.0)));
        assert_eq!(anchor_point(&tri, Direction::SouthWest), Some(Point::new(0.0, 80.0)));
        assert_eq!(anchor_point(&tri, Direction::South), Some(Point::new(50.0, 80.0)));
        assert_eq!(anchor_point(&tri, Direction::West), Some(Point::new(25.0, 40.0)));
        assert_eq!(anchor_point(&tri, Direction::East), Some(Point::new(75.0, 40.0)));
        assert_eq!(anchor_point(&tri, Direction::NorthWest), None);
        assert_eq!(anchor_point(&tri, Direction::NorthEast), None);
    }

    #[test]
    fn test_dimensionless_falls_back_to_position() {
        let mut node = shape(NodeKind::Rectangle, 5.0, 7.0, 10.0, 10.0);
        node.dimensions = None;
        assert_eq!(anchor_point(&node, Direction::SouthEast), Some(Point::new(5.0, 7.0)));
    }

    #[test]
    fn test_bounding_box_padding() {
        let bb = bounding_box_of(&[Point::new(0.0, 0.0), Point::new(150.0, 50.0)], LINE_PADDING);
        assert!((bb.min_x + 10.0).abs() < f64::EPSILON);
        assert!((bb.width - 170.0).abs() < f64::EPSILON);
        assert!((bb.height - 70.0).abs() < f64::EPSILON);
        assert!(!bb.needs_shift());
    }

    #[test]
    fn test_bounding_box_negative_shift() {
        let bb = bounding_box_of(&[Point::new(-30.0, 5.0), Point::new(20.0, -4.0)], LINE_PADDING);
        assert!((bb.shift_x + 30.0).abs() < f64::EPSILON);
        assert!((bb.shift_y + 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bounding_box_floor() {
        let bb = bounding_box_of(&[Point::new(3.0, 3.0)], 0.0);
        assert!((bb.width - MIN_BOX_EXTENT).abs() < f64::EPSILON);
        assert!((bb.height - MIN_BOX_EXTENT).abs() < f64::EPSILON);
    }

    #[test]
    fn test_polyline_distance() {
        let pts = [Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(100.0, 100.0)];
        assert!((point_to_polyline_dist(Point::new(50.0, 3.0), &pts) - 3.0).abs() < 1e-9);
        assert!((point_to_polyline_dist(Point::new(104.0, 50.0), &pts) - 4.0).abs() < 1e-9);
    }
}
