//! The editing session: one scene plus everything needed to edit it.
//!
//! Session methods pair each store/transform call with the connection
//! refresh it requires. History is never pushed implicitly; call
//! [`Session::commit`] once per finished user-visible edit.

use crate::config::SessionConfig;
use crate::connection;
use crate::history::History;
use crate::interchange::{ImportError, InterchangeDocument};
use crate::node::{AnchorRef, Connection, DATA_END_MARKER, Direction, Node, NodeId, NodeKind};
use crate::scene::SceneStore;
use crate::snap::{self, GridConfig};
use crate::storage::{Storage, StorageResult};
use crate::transform;
use crate::viewport::Viewport;
use kurbo::{Point, Vec2};
use serde_json::Value;

/// A line currently being drawn.
#[derive(Debug, Clone, PartialEq)]
struct LineDraft {
    line_id: NodeId,
    start_anchor: Option<AnchorRef>,
    /// Anchor under the most recent point, if it snapped to one.
    end_anchor: Option<AnchorRef>,
    /// Whether the last point is a rubber-band preview rather than a placed vertex.
    has_preview: bool,
}

/// Top-level owner of the scene, its history, and the view.
#[derive(Debug, Clone)]
pub struct Session {
    store: SceneStore,
    history: History,
    viewport: Viewport,
    config: SessionConfig,
    draft: Option<LineDraft>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    /// Start a session on an empty scene. The empty scene is checkpointed so
    /// the first edit can be undone.
    pub fn new(config: SessionConfig) -> Self {
        let store = SceneStore::new();
        let mut history = History::with_limit(config.max_history);
        history.push_snapshot(&store);
        Self {
            store,
            history,
            viewport: Viewport::with_zoom_range(config.min_zoom, config.max_zoom),
            config,
            draft: None,
        }
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    /// Direct access to store operations (selection, z-order, grouping, styles).
    pub fn store_mut(&mut self) -> &mut SceneStore {
        &mut self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_grid(&mut self, grid: GridConfig) {
        self.config.grid = grid;
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Checkpoint the current scene.
    pub fn commit(&mut self) {
        self.history.push_snapshot(&self.store);
    }

    /// Undo, abandoning any line being drawn.
    pub fn undo(&mut self) -> bool {
        self.cancel_line();
        self.history.undo(&mut self.store)
    }

    /// Redo, abandoning any line being drawn.
    pub fn redo(&mut self) -> bool {
        self.cancel_line();
        self.history.redo(&mut self.store)
    }

    // ------------------------------------------------------------------
    // Creation and deletion
    // ------------------------------------------------------------------

    /// Create a shape; grid-snapped per the session config.
    pub fn add_shape(
        &mut self,
        kind: NodeKind,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Option<NodeId> {
        transform::create_shape(&mut self.store, kind, x, y, width, height, &self.config.grid)
    }

    /// Create a line through absolute scene points.
    pub fn add_line(&mut self, kind: NodeKind, points: &[Point]) -> Option<NodeId> {
        transform::create_line(&mut self.store, kind, points, &self.config.grid)
    }

    /// Remove nodes (with group members and connections).
    pub fn remove(&mut self, ids: &[NodeId]) -> usize {
        self.store.remove_nodes(ids)
    }

    pub fn delete_selected(&mut self) -> usize {
        self.store.delete_selected()
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    /// Move nodes by a device-pixel delta and re-glue their connections.
    pub fn move_nodes(&mut self, ids: &[NodeId], dx: f64, dy: f64) -> Vec<NodeId> {
        let moved =
            transform::move_nodes(&mut self.store, ids, dx, dy, &self.viewport, &self.config.grid);
        for id in &moved {
            connection::refresh_connections_for(&mut self.store, id);
        }
        moved
    }

    /// Move the current selection.
    pub fn move_selection(&mut self, dx: f64, dy: f64) -> Vec<NodeId> {
        let ids = self.store.selected_ids();
        self.move_nodes(&ids, dx, dy)
    }

    /// Resize from a handle and re-glue connections.
    pub fn resize(&mut self, id: &str, direction: Direction, dx: f64, dy: f64) -> bool {
        let resized = transform::resize(
            &mut self.store,
            id,
            direction,
            dx,
            dy,
            &self.viewport,
            &self.config.grid,
        );
        if resized {
            connection::refresh_connections_for(&mut self.store, id);
        }
        resized
    }

    /// Move a line point to a scene position without snapping.
    ///
    /// A point connected to an anchor is detached first.
    pub fn move_line_point(&mut self, line_id: &str, point_index: usize, x: f64, y: f64) -> bool {
        let in_range = self
            .store
            .node(line_id)
            .is_some_and(|n| n.is_line() && point_index < n.points.len());
        if !in_range {
            return false;
        }
        if self.store.remove_connection(line_id, point_index).is_some() {
            log::debug!("Detached {line_id}[{point_index}]");
        }
        transform::move_line_point(&mut self.store, line_id, point_index, x, y)
    }

    /// Drag a line endpoint, attaching it to an anchor within reach or
    /// detaching it from its current one.
    ///
    /// Returns the anchor the point ended up on.
    pub fn drag_line_point(
        &mut self,
        line_id: &str,
        point_index: usize,
        x: f64,
        y: f64,
    ) -> Option<AnchorRef> {
        let line = self.store.node(line_id).filter(|n| n.is_line())?;
        if point_index >= line.points.len() {
            return None;
        }

        let raw = Point::new(x, y);
        let exclude = [line_id.to_string()];
        let target =
            snap::find_anchor_near(&self.store, raw, self.config.anchor_snap_radius, &exclude);
        match target {
            Some(target) => {
                self.store.create_connection(Connection::new(
                    line_id,
                    point_index,
                    target.anchor.shape_id.clone(),
                    target.anchor.direction,
                ));
                let at = target.point;
                transform::move_line_point(&mut self.store, line_id, point_index, at.x, at.y);
                Some(target.anchor)
            }
            None => {
                self.move_line_point(line_id, point_index, x, y);
                None
            }
        }
    }

    /// Duplicate nodes by the configured offset; copies become the selection.
    pub fn duplicate(&mut self, ids: &[NodeId]) -> Vec<NodeId> {
        let offset = self.config.duplicate_offset;
        self.store.duplicate(ids, Vec2::new(offset, offset))
    }

    pub fn duplicate_selected(&mut self) -> Vec<NodeId> {
        let ids = self.store.selected_ids();
        self.duplicate(&ids)
    }

    /// Place a copy of a shape beside it and link the two with an arrow.
    ///
    /// Only cardinal directions are accepted. The arrow runs from the
    /// source's `direction` anchor to the copy's opposite anchor. Returns
    /// `(copy, arrow)`.
    pub fn duplicate_and_connect(
        &mut self,
        id: &str,
        direction: Direction,
    ) -> Option<(NodeId, NodeId)> {
        let source = self.store.node(id).filter(|n| !n.is_line())?;
        let offset = transform::cardinal_offset(direction, source.size(), self.config.connect_gap)?;

        let copy = self.store.duplicate(&[id.to_string()], offset).into_iter().next()?;
        let from = connection::anchor_position(&self.store, id, direction)?;
        let to = connection::anchor_position(&self.store, &copy, direction.opposite())?;

        let origin = self.store.frame_origin(id);
        let local_from = from - origin;
        let mut arrow =
            Node::line(NodeKind::Arrow, local_from, vec![Point::ZERO, to - from.to_vec2()]);
        let arrow_id = arrow.id.clone();
        arrow.parent_id = self.store.node(id).and_then(|n| n.parent_id.clone());
        arrow.data.insert(DATA_END_MARKER.to_string(), Value::from("arrow"));
        self.store.add_node(arrow);

        self.store.create_connection(Connection::new(arrow_id.clone(), 0, id, direction));
        self.store.create_connection(Connection::new(
            arrow_id.clone(),
            1,
            copy.clone(),
            direction.opposite(),
        ));
        connection::refresh_connections_for(&mut self.store, &arrow_id);
        Some((copy, arrow_id))
    }

    // ------------------------------------------------------------------
    // Line drawing
    // ------------------------------------------------------------------

    pub fn is_drawing(&self) -> bool {
        self.draft.is_some()
    }

    /// Id of the line being drawn.
    pub fn draft_line(&self) -> Option<&str> {
        self.draft.as_ref().map(|d| d.line_id.as_str())
    }

    /// Snap a scene point to an anchor within reach, else to the grid.
    fn snap_draw_point(&self, point: Point, exclude: &[NodeId]) -> (Point, Option<AnchorRef>) {
        match snap::find_anchor_near(&self.store, point, self.config.anchor_snap_radius, exclude) {
            Some(target) => (target.point, Some(target.anchor)),
            None => (self.config.grid.apply_point(point), None),
        }
    }

    /// Start drawing a line at a scene point. Any line already being drawn
    /// is discarded first.
    pub fn begin_line(&mut self, kind: NodeKind, x: f64, y: f64) -> Option<NodeId> {
        if !kind.is_line() {
            return None;
        }
        self.cancel_line();
        let (start, anchor) = self.snap_draw_point(Point::new(x, y), &[]);
        let line = Node::line(kind, start, vec![Point::ZERO]);
        let line_id = line.id.clone();
        self.store.add_node(line);
        self.draft = Some(LineDraft {
            line_id: line_id.clone(),
            start_anchor: anchor.clone(),
            end_anchor: anchor,
            has_preview: false,
        });
        Some(line_id)
    }

    /// Move the rubber-band point of the line being drawn.
    pub fn extend_line(&mut self, x: f64, y: f64) -> bool {
        self.place_draft_point(x, y, true)
    }

    /// Fix a vertex of the line being drawn.
    pub fn add_line_vertex(&mut self, x: f64, y: f64) -> bool {
        self.place_draft_point(x, y, false)
    }

    fn place_draft_point(&mut self, x: f64, y: f64, preview: bool) -> bool {
        let Some(draft) = self.draft.clone() else {
            return false;
        };
        let (point, anchor) = self.snap_draw_point(Point::new(x, y), &[draft.line_id.clone()]);
        let Some(line) = self.store.node_mut(&draft.line_id) else {
            self.draft = None;
            return false;
        };
        if !draft.has_preview {
            line.points.push(Point::ZERO);
        }
        let index = line.points.len() - 1;
        connection::set_line_point(line, index, point);

        if let Some(d) = self.draft.as_mut() {
            d.end_anchor = anchor;
            d.has_preview = preview;
        }
        true
    }

    /// Complete the line being drawn.
    ///
    /// Endpoints that snapped to anchors become connections. A line with
    /// fewer than two distinct points is discarded instead. Returns the
    /// finished line's id.
    pub fn finish_line(&mut self) -> Option<NodeId> {
        let draft = self.draft.take()?;
        let line = self.store.node(&draft.line_id)?;
        let last = line.last_point_index()?;
        let mut distinct: Vec<Point> = Vec::new();
        for p in &line.points {
            if !distinct.contains(p) {
                distinct.push(*p);
            }
        }

        if distinct.len() < 2 {
            log::debug!("Discarding degenerate line {}", draft.line_id);
            self.store.remove_node(&draft.line_id);
            return None;
        }
        if let Some(anchor) = draft.start_anchor {
            self.store.create_connection(Connection::new(
                draft.line_id.clone(),
                0,
                anchor.shape_id,
                anchor.direction,
            ));
        }
        if let Some(anchor) = draft.end_anchor {
            self.store.create_connection(Connection::new(
                draft.line_id.clone(),
                last,
                anchor.shape_id,
                anchor.direction,
            ));
        }
        connection::refresh_connections_for(&mut self.store, &draft.line_id);
        Some(draft.line_id)
    }

    /// Abandon the line being drawn. No-op when not drawing.
    pub fn cancel_line(&mut self) -> bool {
        match self.draft.take() {
            Some(draft) => {
                self.store.remove_node(&draft.line_id);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Hit testing
    // ------------------------------------------------------------------

    /// Topmost node under a scene point.
    pub fn node_at(&self, x: f64, y: f64) -> Option<&Node> {
        self.store.node_at(Point::new(x, y), self.config.hit_tolerance)
    }

    /// Topmost node under a device-pixel point.
    pub fn node_at_screen(&self, x: f64, y: f64) -> Option<&Node> {
        let scene = self.viewport.screen_to_scene(Point::new(x, y));
        let tolerance = self.config.hit_tolerance / self.viewport.effective_zoom();
        self.store.node_at(scene, tolerance)
    }

    // ------------------------------------------------------------------
    // Interchange and storage
    // ------------------------------------------------------------------

    pub fn export_document(&self) -> InterchangeDocument {
        InterchangeDocument::from_store(&self.store)
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        self.export_document().to_json()
    }

    /// Replace the scene with a validated document, then re-derive line
    /// geometry and re-glue every connection.
    pub fn import_document(&mut self, document: InterchangeDocument) {
        self.cancel_line();
        document.apply_to(&mut self.store);
        connection::normalize_all_lines(&mut self.store);
        let refreshed = connection::refresh_all(&mut self.store);
        log::debug!("Re-glued {refreshed} imported connections");
    }

    pub fn import_json(&mut self, json: &str) -> Result<(), ImportError> {
        let document = InterchangeDocument::from_json(json)?;
        self.import_document(document);
        Ok(())
    }

    pub fn save_to(&self, storage: &dyn Storage, id: &str) -> StorageResult<()> {
        storage.save(id, &self.export_document())
    }

    pub fn load_from(&mut self, storage: &dyn Storage, id: &str) -> StorageResult<()> {
        let document = storage.load(id)?;
        self.import_document(document);
        Ok(())
    }
}
