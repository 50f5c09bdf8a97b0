/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Edge-anchored resize geometry.

use serde::{Deserialize, Serialize};

use crate::camera::{CanvasPoint, CanvasSize};

use super::Node;

/// Which edge or corner a resize gesture is dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    Top,
    Right,
    Bottom,
    Left,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    fn moves_left_edge(self) -> bool {
        matches!(self, Self::Left | Self::TopLeft | Self::BottomLeft)
    }

    fn moves_top_edge(self) -> bool {
        matches!(self, Self::Top | Self::TopLeft | Self::TopRight)
    }
}

/// New `(position, size)` for a node resized to `requested` from `handle`.
///
/// The edge opposite the handle stays put. With `symmetric` the growth is
/// mirrored on both sides and the center stays put instead. The size floor is
/// applied before the position is derived, so a clamped resize never drifts.
pub fn resize_geometry(
    position: CanvasPoint,
    size: CanvasSize,
    handle: ResizeHandle,
    requested: CanvasSize,
    symmetric: bool,
) -> (CanvasPoint, CanvasSize) {
    let floor = |value: f64, min: f64, fallback: f64| {
        if value.is_finite() { value.max(min) } else { fallback }
    };

    if symmetric {
        let width = floor(
            size.width + 2.0 * (requested.width - size.width),
            Node::MIN_WIDTH,
            size.width,
        );
        let height = floor(
            size.height + 2.0 * (requested.height - size.height),
            Node::MIN_HEIGHT,
            size.height,
        );
        let position = CanvasPoint::new(
            position.x - (width - size.width) / 2.0,
            position.y - (height - size.height) / 2.0,
        );
        return (position, CanvasSize::new(width, height));
    }

    let width = floor(requested.width, Node::MIN_WIDTH, size.width);
    let height = floor(requested.height, Node::MIN_HEIGHT, size.height);
    let mut next = position;
    if handle.moves_left_edge() {
        next.x -= width - size.width;
    }
    if handle.moves_top_edge() {
        next.y -= height - size.height;
    }
    (next, CanvasSize::new(width, height))
}
