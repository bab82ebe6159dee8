//! Snap functionality for aligning to the grid and to shape anchors.

use crate::connection;
use crate::node::{AnchorRef, Direction, NodeId};
use crate::scene::SceneStore;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Default grid size (scene units).
pub const GRID_SIZE: f64 = 20.0;

/// Grid configuration consulted by resize, move, and create operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub enabled: bool,
    pub size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            size: GRID_SIZE,
        }
    }
}

impl GridConfig {
    /// An enabled grid of the given size.
    pub fn enabled(size: f64) -> Self {
        Self { enabled: true, size }
    }

    /// Snap a scalar if the grid is on.
    pub fn apply(&self, value: f64) -> f64 {
        if self.enabled {
            snap_value(value, self.size)
        } else {
            value
        }
    }

    /// Snap a point if the grid is on.
    pub fn apply_point(&self, point: Point) -> Point {
        Point::new(self.apply(point.x), self.apply(point.y))
    }
}

/// Round a value to the nearest multiple of `grid_size`.
///
/// Non-positive or non-finite grid sizes leave the value unchanged.
pub fn snap_value(value: f64, grid_size: f64) -> f64 {
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return value;
    }
    (value / grid_size).round() * grid_size
}

/// Snap a point to the nearest grid intersection.
pub fn snap_point(point: Point, grid_size: f64) -> Point {
    Point::new(snap_value(point.x, grid_size), snap_value(point.y, grid_size))
}

/// A concrete anchor a line endpoint could attach to.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorTarget {
    pub anchor: AnchorRef,
    /// Scene-space location of the anchor.
    pub point: Point,
}

/// Every defined anchor of every top-level shape, skipping `exclude`.
///
/// Lines are never anchor targets, and undefined anchors (a triangle's
/// `nw`/`ne`) are left out.
pub fn anchor_targets(store: &SceneStore, exclude: &[NodeId]) -> Vec<AnchorTarget> {
    store
        .nodes()
        .iter()
        .filter(|n| !n.is_line() && !n.is_group_member() && !exclude.contains(&n.id))
        .flat_map(|n| {
            Direction::ALL.into_iter().filter_map(|dir| {
                connection::anchor_position(store, &n.id, dir).map(|point| AnchorTarget {
                    anchor: AnchorRef::new(n.id.clone(), dir),
                    point,
                })
            })
        })
        .collect()
}

/// The anchor closest to `point` within `radius`, if any.
///
/// Ties go to the shape higher in paint order.
pub fn find_anchor_near(
    store: &SceneStore,
    point: Point,
    radius: f64,
    exclude: &[NodeId],
) -> Option<AnchorTarget> {
    let mut best: Option<(f64, AnchorTarget)> = None;
    for target in anchor_targets(store, exclude) {
        let dist = (target.point - point).hypot();
        if dist > radius {
            continue;
        }
        if best.as_ref().is_none_or(|(d, _)| dist <= *d) {
            best = Some((dist, target));
        }
    }
    best.map(|(_, target)| target)
}
