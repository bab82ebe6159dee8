//! Pan/zoom context used to turn device-pixel input into scene units.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Default lower zoom bound.
pub const MIN_ZOOM: f64 = 0.1;
/// Default upper zoom bound.
pub const MAX_ZOOM: f64 = 10.0;

/// The coordinate-transform context `{panX, panY, zoom}`.
///
/// `screen = scene * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
    #[serde(skip, default = "default_min_zoom")]
    pub min_zoom: f64,
    #[serde(skip, default = "default_max_zoom")]
    pub max_zoom: f64,
}

fn default_min_zoom() -> f64 {
    MIN_ZOOM
}

fn default_max_zoom() -> f64 {
    MAX_ZOOM
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Viewport with explicit zoom bounds.
    pub fn with_zoom_range(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            min_zoom,
            max_zoom,
            ..Self::default()
        }
    }

    /// Zoom factor safe to divide by; degenerate values count as 1.
    pub fn effective_zoom(&self) -> f64 {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom
        } else {
            1.0
        }
    }

    pub fn pan_offset(&self) -> Vec2 {
        Vec2::new(self.pan_x, self.pan_y)
    }

    /// Scene-to-screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan_offset()) * Affine::scale(self.effective_zoom())
    }

    /// Screen-to-scene transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.effective_zoom()) * Affine::translate(-self.pan_offset())
    }

    pub fn screen_to_scene(&self, screen: Point) -> Point {
        self.inverse_transform() * screen
    }

    pub fn scene_to_screen(&self, scene: Point) -> Point {
        self.transform() * scene
    }

    /// Convert a device-pixel drag delta into scene units.
    pub fn to_scene_delta(&self, dx: f64, dy: f64) -> Vec2 {
        let zoom = self.effective_zoom();
        Vec2::new(dx / zoom, dy / zoom)
    }

    /// Pan by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.pan_x += delta.x;
        self.pan_y += delta.y;
    }

    /// Zoom by `factor`, keeping `screen_point` fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.effective_zoom() * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        let scene_point = self.screen_to_scene(screen_point);
        self.zoom = new_zoom;
        let drift = screen_point - self.scene_to_screen(scene_point);
        self.pan(drift);
    }

    pub fn reset(&mut self) {
        self.pan_x = 0.0;
        self.pan_y = 0.0;
        self.zoom = 1.0;
    }
}
