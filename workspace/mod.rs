/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Workspaces: a titled set of nodes with its own camera and background.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::PanZoomTransform;
use crate::canvas::{Node, NodeContent};
use crate::persistence::types::{PanZoomSettings, PersistedWorkspace};

pub mod share;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(Uuid);

impl WorkspaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque CSS-like style map applied to the canvas background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackgroundStyle(serde_json::Map<String, serde_json::Value>);

/// Named backgrounds offered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundPreset {
    Coral,
    Magic,
    Sunset,
}

impl BackgroundPreset {
    pub const ALL: [BackgroundPreset; 3] = [Self::Coral, Self::Magic, Self::Sunset];

    pub fn label(self) -> &'static str {
        match self {
            Self::Coral => "Coral",
            Self::Magic => "Magic",
            Self::Sunset => "Sunset",
        }
    }

    fn gradient(self) -> &'static str {
        match self {
            Self::Coral => "linear-gradient(224.03deg, #FF8575 -4%, #DD439F 93.89%)",
            Self::Magic => "linear-gradient(219.13deg, #5B6CF9 0%, #C86DD7 100%)",
            Self::Sunset => "linear-gradient(200deg, #F9D423 0%, #FF4E50 100%)",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl BackgroundStyle {
    const FILL: &'static str = "no-repeat center / cover";

    /// No properties at all; the host falls back to its own canvas color.
    pub fn empty() -> Self {
        Self(serde_json::Map::new())
    }

    pub fn preset(preset: BackgroundPreset) -> Self {
        Self::from_background(preset.gradient())
    }

    /// Image url backgrounds use the same fill rule as gradients.
    pub fn image(url: &str) -> Self {
        Self::from_background(&format!("url(\"{url}\")"))
    }

    fn from_background(value: &str) -> Self {
        let mut map = serde_json::Map::new();
        map.insert(
            "background".to_string(),
            serde_json::Value::String(format!("{value} {}", Self::FILL)),
        );
        Self(map)
    }

    pub fn get(&self, property: &str) -> Option<&serde_json::Value> {
        self.0.get(property)
    }

    pub fn set(&mut self, property: impl Into<String>, value: serde_json::Value) {
        self.0.insert(property.into(), value);
    }

    pub fn properties(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self::preset(BackgroundPreset::Coral)
    }
}

/// A full workspace, as loaded from storage or decoded from a share link.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub title: String,
    pub nodes: Vec<Node>,
    pub transform: PanZoomTransform,
    pub background_style: BackgroundStyle,
}

impl Workspace {
    pub const DEFAULT_TITLE: &'static str = "New Workspace";
    /// Title used when a stored workspace has none.
    pub const UNTITLED: &'static str = "Untitled";

    pub fn new_default() -> Self {
        Self {
            id: WorkspaceId::new(),
            title: Self::DEFAULT_TITLE.to_string(),
            nodes: Vec::new(),
            transform: PanZoomTransform::default(),
            background_style: BackgroundStyle::default(),
        }
    }

    pub fn to_persisted(&self) -> PersistedWorkspace {
        PersistedWorkspace {
            id: self.id.to_string(),
            title: self.title.clone(),
            nodes: self.nodes.iter().map(Node::to_persisted).collect(),
            panzoom: PanZoomSettings {
                transform: self.transform,
            },
            background_style: self.background_style.clone(),
        }
    }

    /// Rebuild from the portable form. The stored id is kept when it parses;
    /// nodes with bad ids are skipped.
    pub fn from_persisted(persisted: &PersistedWorkspace) -> Self {
        let mut nodes = Vec::with_capacity(persisted.nodes.len());
        for entry in &persisted.nodes {
            let Some(node) = Node::from_persisted(entry) else {
                warn!("Skipping node with invalid id '{}'", entry.id);
                continue;
            };
            nodes.push(node);
        }
        Self {
            id: WorkspaceId::parse(&persisted.id).unwrap_or_default(),
            title: persisted.title.clone(),
            nodes,
            transform: persisted.panzoom.transform,
            background_style: persisted.background_style.clone(),
        }
    }
}

/// Contents placed into a workspace that hydrates with no nodes.
pub struct SeedNode {
    pub content: NodeContent,
    /// Screen-space position, converted through the workspace transform.
    pub screen_position: (f64, f64),
}

pub const WELCOME_TEXT: &str = "Welcome!\n\n\
Pan: hold Cmd and drag\n\
Zoom: scroll\n\
New browser frame: Cmd+N\n\
New text frame: Cmd+T\n\
Cycle frames: hold Cmd, tap 1\n\
Deselect: Escape\n";

pub const EXAMPLE_URL: &str = "www.google.com";

pub fn first_run_seed() -> Vec<SeedNode> {
    vec![
        SeedNode {
            content: NodeContent::text(WELCOME_TEXT),
            screen_position: (40.0, 40.0),
        },
        SeedNode {
            content: NodeContent::webview(EXAMPLE_URL),
            screen_position: (360.0, 360.0),
        },
    ]
}
