/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Screen/canvas coordinate spaces and the camera that maps between them.
//!
//! Nodes store their geometry in canvas space. The active workspace owns a
//! [`PanZoomTransform`] mapping canvas space to screen space as
//! `screen = canvas * scale + (x, y)`.

use euclid::{Point2D, Size2D};
use serde::{Deserialize, Serialize};

/// Unbounded logical plane that node geometry is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSpace;

/// Viewport pixel coordinates, relative to the canvas container origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSpace;

pub type CanvasPoint = Point2D<f64, CanvasSpace>;
pub type CanvasSize = Size2D<f64, CanvasSpace>;
pub type ScreenPoint = Point2D<f64, ScreenSpace>;
pub type ScreenSize = Size2D<f64, ScreenSpace>;

/// Pan/zoom state of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanZoomTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl PanZoomTransform {
    pub const DEFAULT_SCALE: f64 = 0.5;

    /// Numeric floor applied before dividing by `scale`.
    pub const MIN_SCALE: f64 = 1e-4;

    pub fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }

    /// Scale used for conversions, never zero, negative or NaN.
    pub fn effective_scale(&self) -> f64 {
        if self.scale.is_finite() && self.scale > Self::MIN_SCALE {
            self.scale
        } else {
            Self::MIN_SCALE
        }
    }

    /// True when every component is finite and the scale is positive.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.scale.is_finite() && self.scale > 0.0
    }

    pub fn to_canvas_space(&self, point: ScreenPoint) -> CanvasPoint {
        let scale = self.effective_scale();
        CanvasPoint::new((point.x - self.x) / scale, (point.y - self.y) / scale)
    }

    pub fn to_screen_space(&self, point: CanvasPoint) -> ScreenPoint {
        let scale = self.effective_scale();
        ScreenPoint::new(point.x * scale + self.x, point.y * scale + self.y)
    }

    /// Set the translation, leaving the scale alone.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Change to an absolute `scale`, keeping the canvas point under `pivot`
    /// fixed on screen.
    pub fn zoom_to(&mut self, pivot: ScreenPoint, scale: f64) {
        let current = self.effective_scale();
        let target = scale.max(Self::MIN_SCALE);
        let ratio = target / current;
        self.x = pivot.x - (pivot.x - self.x) * ratio;
        self.y = pivot.y - (pivot.y - self.y) * ratio;
        self.scale = target;
    }
}

impl Default for PanZoomTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, Self::DEFAULT_SCALE)
    }
}

/// Convert a screen-space point into canvas space under `transform`.
pub fn to_canvas_space(point: ScreenPoint, transform: &PanZoomTransform) -> CanvasPoint {
    transform.to_canvas_space(point)
}

/// Camera state for zoom bounds enforcement and node centering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub zoom_min: f64,
    pub zoom_max: f64,
    /// Fraction of the viewport a centered node may fill.
    pub margin_factor: f64,
}

impl Camera {
    pub const DEFAULT_MARGIN_FACTOR: f64 = 0.85;
    pub const OVERVIEW_SCALE: f64 = 0.3;

    pub fn new() -> Self {
        Self {
            zoom_min: 0.05,
            zoom_max: 20.0,
            margin_factor: Self::DEFAULT_MARGIN_FACTOR,
        }
    }

    /// Clamp a zoom value to the allowed range
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.zoom_min, self.zoom_max)
    }

    /// Scale at which a node of `node_size` fits inside `viewport`.
    pub fn fit_scale(&self, node_size: CanvasSize, viewport: ScreenSize) -> Option<f64> {
        if !has_area(node_size.width, node_size.height) || !has_area(viewport.width, viewport.height)
        {
            return None;
        }
        let fit = (viewport.height / node_size.height).min(viewport.width / node_size.width);
        Some(self.clamp(fit * self.margin_factor))
    }

    /// Transform that puts the node's center at the viewport center, scaled to
    /// fit with margin.
    ///
    /// The translation is computed at the current scale first, then the zoom
    /// is applied around the viewport center, so the node center never leaves
    /// the middle of the screen between the two steps.
    pub fn center_on(
        &self,
        current: &PanZoomTransform,
        node_position: CanvasPoint,
        node_size: CanvasSize,
        viewport: ScreenSize,
    ) -> Option<PanZoomTransform> {
        let target_scale = self.fit_scale(node_size, viewport)?;
        let scale = current.effective_scale();
        let on_screen_width = node_size.width * scale;
        let on_screen_height = node_size.height * scale;

        let mut next = *current;
        next.move_to(
            -scale * node_position.x + viewport.width / 2.0 - on_screen_width / 2.0,
            -scale * node_position.y + viewport.height / 2.0 - on_screen_height / 2.0,
        );
        next.zoom_to(viewport_center(viewport), target_scale);
        Some(next)
    }

    /// Zoom out to the overview scale around the viewport center.
    pub fn overview(&self, current: &PanZoomTransform, viewport: ScreenSize) -> PanZoomTransform {
        let mut next = *current;
        next.zoom_to(viewport_center(viewport), self.clamp(Self::OVERVIEW_SCALE));
        next
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

pub fn viewport_center(viewport: ScreenSize) -> ScreenPoint {
    ScreenPoint::new(viewport.width / 2.0, viewport.height / 2.0)
}

fn has_area(width: f64, height: f64) -> bool {
    width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0
}
