/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Serialized forms written to the key-value store and share links.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::camera::PanZoomTransform;
use crate::canvas::NodeContent;
use crate::workspace::{BackgroundStyle, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedSize {
    pub width: f64,
    pub height: f64,
}

/// Node as stored. The id stays a string so one bad entry can be skipped
/// without rejecting the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedNode {
    pub id: String,
    pub position: PersistedPoint,
    pub size: PersistedSize,
    #[serde(default = "default_zoom_level")]
    pub zoom_level: f64,
    pub content: NodeContent,
}

fn default_zoom_level() -> f64 {
    1.0
}

/// Stored pan/zoom state, wrapped so extra viewport settings can sit beside
/// the transform.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PanZoomSettings {
    pub transform: PanZoomTransform,
}

/// Portable form of a whole workspace, used for share links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedWorkspace {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub nodes: Vec<PersistedNode>,
    #[serde(default)]
    pub panzoom: PanZoomSettings,
    #[serde(default)]
    pub background_style: BackgroundStyle,
}

/// Per-workspace field, each stored under its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceField {
    Nodes,
    PanZoom,
    BackgroundStyle,
    Title,
    Id,
}

impl WorkspaceField {
    pub const ALL: [WorkspaceField; 5] = [
        WorkspaceField::Nodes,
        WorkspaceField::PanZoom,
        WorkspaceField::BackgroundStyle,
        WorkspaceField::Title,
        WorkspaceField::Id,
    ];

    pub fn key_segment(self) -> &'static str {
        match self {
            WorkspaceField::Nodes => "nodes",
            WorkspaceField::PanZoom => "panzoom",
            WorkspaceField::BackgroundStyle => "backgroundStyle",
            WorkspaceField::Title => "title",
            WorkspaceField::Id => "id",
        }
    }
}

/// Process-wide persisted root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveData {
    pub app_version: String,
    pub tabs: Vec<WorkspaceId>,
    pub selected_workspace_id: Option<WorkspaceId>,
    /// Titles of the open workspaces, by id.
    pub workspace_lookup: HashMap<WorkspaceId, String>,
}
