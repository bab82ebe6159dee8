//! Diagram elements and the anchor records that bind line endpoints to shapes.

use crate::geometry::{self, LINE_PADDING};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique identifier for nodes.
///
/// Ids are opaque strings so documents authored elsewhere import verbatim;
/// fresh ids are v4 UUIDs.
pub type NodeId = String;

/// Open, string-keyed attribute map (`style` and `data`).
pub type Attributes = Map<String, Value>;

/// Data key flagging a node as a group container.
pub const DATA_IS_GROUP: &str = "isGroup";
/// Data key selecting straight or elbow routing for lines.
pub const DATA_LINE_TYPE: &str = "lineType";
/// Data key for the marker drawn at a line's first point.
pub const DATA_START_MARKER: &str = "startMarker";
/// Data key for the marker drawn at a line's last point.
pub const DATA_END_MARKER: &str = "endMarker";

/// Generate a fresh node id.
pub fn generate_id() -> NodeId {
    Uuid::new_v4().to_string()
}

/// Kind of diagram element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Rectangle,
    Circle,
    Diamond,
    Cylinder,
    Triangle,
    Line,
    Arrow,
    Text,
    Icon,
    GroupContainer,
}

impl NodeKind {
    /// Every kind, in declaration order.
    pub const ALL: [NodeKind; 10] = [
        NodeKind::Rectangle,
        NodeKind::Circle,
        NodeKind::Diamond,
        NodeKind::Cylinder,
        NodeKind::Triangle,
        NodeKind::Line,
        NodeKind::Arrow,
        NodeKind::Text,
        NodeKind::Icon,
        NodeKind::GroupContainer,
    ];

    /// Interchange name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Rectangle => "rectangle",
            NodeKind::Circle => "circle",
            NodeKind::Diamond => "diamond",
            NodeKind::Cylinder => "cylinder",
            NodeKind::Triangle => "triangle",
            NodeKind::Line => "line",
            NodeKind::Arrow => "arrow",
            NodeKind::Text => "text",
            NodeKind::Icon => "icon",
            NodeKind::GroupContainer => "group-container",
        }
    }

    /// Parse an interchange name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Lines and arrows carry `points` instead of a free size.
    pub fn is_line(self) -> bool {
        matches!(self, NodeKind::Line | NodeKind::Arrow)
    }
}

/// One of the eight named anchor positions on a shape's perimeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "n")]
    North,
    #[serde(rename = "s")]
    South,
    #[serde(rename = "e")]
    East,
    #[serde(rename = "w")]
    West,
    #[serde(rename = "nw")]
    NorthWest,
    #[serde(rename = "ne")]
    NorthEast,
    #[serde(rename = "sw")]
    SouthWest,
    #[serde(rename = "se")]
    SouthEast,
}

impl Direction {
    /// All eight directions.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    /// Short name (`n`, `se`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "n",
            Direction::South => "s",
            Direction::East => "e",
            Direction::West => "w",
            Direction::NorthWest => "nw",
            Direction::NorthEast => "ne",
            Direction::SouthWest => "sw",
            Direction::SouthEast => "se",
        }
    }

    /// Parse a short name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
            Direction::NorthEast => Direction::SouthWest,
            Direction::SouthWest => Direction::NorthEast,
            Direction::SouthEast => Direction::NorthWest,
        }
    }

    /// Check if this is one of n/s/e/w.
    pub fn is_cardinal(self) -> bool {
        matches!(
            self,
            Direction::North | Direction::South | Direction::East | Direction::West
        )
    }

    pub fn has_north(self) -> bool {
        matches!(self, Direction::North | Direction::NorthWest | Direction::NorthEast)
    }

    pub fn has_south(self) -> bool {
        matches!(self, Direction::South | Direction::SouthWest | Direction::SouthEast)
    }

    pub fn has_east(self) -> bool {
        matches!(self, Direction::East | Direction::NorthEast | Direction::SouthEast)
    }

    pub fn has_west(self) -> bool {
        matches!(self, Direction::West | Direction::NorthWest | Direction::SouthWest)
    }
}

/// Routing style for line and arrow nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineType {
    #[default]
    Straight,
    Elbow,
}

/// One diagram element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Top-left corner, or the local origin of a line's points.
    /// Relative to the enclosing group container when `parent_id` is set.
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Size>,
    /// Local-space points, relative to `position` (lines and arrows only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
    #[serde(default)]
    pub style: Attributes,
    #[serde(default)]
    pub data: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub selected: bool,
}

impl Node {
    /// Create a sized shape with a fresh id.
    pub fn shape(kind: NodeKind, position: Point, size: Size) -> Self {
        let mut data = Attributes::new();
        if kind == NodeKind::GroupContainer {
            data.insert(DATA_IS_GROUP.to_string(), Value::Bool(true));
        }
        Self {
            id: generate_id(),
            kind,
            position,
            dimensions: Some(size),
            points: Vec::new(),
            style: Attributes::new(),
            data,
            parent_id: None,
            selected: false,
        }
    }

    /// Create a line or arrow from local points, deriving its dimensions.
    pub fn line(kind: NodeKind, position: Point, points: Vec<Point>) -> Self {
        let mut node = Self {
            id: generate_id(),
            kind,
            position,
            dimensions: None,
            points,
            style: Attributes::new(),
            data: Attributes::new(),
            parent_id: None,
            selected: false,
        };
        node.normalize_points();
        node
    }

    /// Builder-style id override.
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn is_line(&self) -> bool {
        self.kind.is_line()
    }

    /// Group containers are recognised by kind or by the `isGroup` data flag.
    pub fn is_group(&self) -> bool {
        self.kind == NodeKind::GroupContainer
            || self.data.get(DATA_IS_GROUP).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn is_group_member(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Size, or zero when unset.
    pub fn size(&self) -> Size {
        self.dimensions.unwrap_or(Size::ZERO)
    }

    /// Routing style from the `lineType` data key.
    pub fn line_type(&self) -> LineType {
        match self.data.get(DATA_LINE_TYPE).and_then(Value::as_str) {
            Some("elbow") => LineType::Elbow,
            _ => LineType::Straight,
        }
    }

    /// Index of the last point, if any.
    pub fn last_point_index(&self) -> Option<usize> {
        self.points.len().checked_sub(1)
    }

    /// Bounds in the node's own coordinate frame (its parent's local space).
    ///
    /// Lines report the tight box around their points; other nodes their
    /// position and size.
    pub fn bounds(&self) -> Rect {
        if self.is_line() && !self.points.is_empty() {
            let origin = self.position.to_vec2();
            return geometry::union_rects(
                self.points
                    .iter()
                    .map(|p| Rect::from_points(*p + origin, *p + origin)),
            )
            .unwrap_or_else(|| Rect::from_origin_size(self.position, Size::ZERO));
        }
        Rect::from_origin_size(self.position, self.size())
    }

    /// Points in the node's own coordinate frame.
    pub fn frame_points(&self) -> Vec<Point> {
        let origin = self.position.to_vec2();
        self.points.iter().map(|p| *p + origin).collect()
    }

    /// Re-derive a line's geometry from its points.
    ///
    /// When a point has gone negative the origin moves by the shift and the
    /// points move back by it, so every point stays put in absolute space.
    /// `dimensions` becomes the padded box size.
    pub fn normalize_points(&mut self) {
        let bb = geometry::bounding_box_of(&self.points, LINE_PADDING);
        if bb.needs_shift() {
            let shift = bb.shift();
            self.position += shift;
            for p in &mut self.points {
                *p -= shift;
            }
        }
        self.dimensions = Some(Size::new(bb.width, bb.height));
    }

    /// Translate the node in its own frame.
    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}

/// A reference to one anchor of one shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnchorRef {
    pub shape_id: NodeId,
    pub direction: Direction,
}

impl AnchorRef {
    pub fn new(shape_id: impl Into<NodeId>, direction: Direction) -> Self {
        Self {
            shape_id: shape_id.into(),
            direction,
        }
    }
}

/// Binds one endpoint of a line to an anchor of another node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub line_id: NodeId,
    /// Index into the line's `points` this record controls.
    pub point_index: usize,
    pub shape_id: NodeId,
    pub position: Direction,
}

impl Connection {
    pub fn new(
        line_id: impl Into<NodeId>,
        point_index: usize,
        shape_id: impl Into<NodeId>,
        position: Direction,
    ) -> Self {
        Self {
            line_id: line_id.into(),
            point_index,
            shape_id: shape_id.into(),
            position,
        }
    }

    /// The anchor this connection targets.
    pub fn anchor(&self) -> AnchorRef {
        AnchorRef::new(self.shape_id.clone(), self.position)
    }

    /// Check if this record references `id` on either side.
    pub fn references(&self, id: &str) -> bool {
        self.line_id == id || self.shape_id == id
    }
}
