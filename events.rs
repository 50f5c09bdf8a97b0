/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Notifications the canvas app queues for the UI host.

use crate::camera::PanZoomTransform;
use crate::canvas::NodeId;
use crate::workspace::{BackgroundStyle, WorkspaceId};

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    NodeAdded {
        id: NodeId,
    },
    NodeRemoved {
        id: NodeId,
    },
    NodeGeometryChanged {
        id: NodeId,
    },
    NodeContentChanged {
        id: NodeId,
    },
    /// One event per transition. The previous node needs its selection
    /// chrome dropped in the same frame the new one gains it.
    SelectionChanged {
        previous: Option<NodeId>,
        selected: Option<NodeId>,
    },
    /// Stack order changed; ids from top to bottom.
    ZOrderChanged {
        order: Vec<NodeId>,
    },
    /// Keyboard cycling is previewing this node.
    CyclePreview {
        id: NodeId,
    },
    TransformChanged {
        transform: PanZoomTransform,
    },
    BackgroundChanged {
        style: BackgroundStyle,
    },
    WorkspaceSwitched {
        id: WorkspaceId,
    },
    TitleChanged {
        title: String,
    },
    TabsChanged {
        tabs: Vec<WorkspaceId>,
    },
    ImportFailed {
        reason: String,
    },
}
