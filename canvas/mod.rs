/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canvas data structures.
//!
//! Core structures:
//! - `NodeRegistry`: owns every node record of the active workspace, keyed by id
//! - `Node`: placed content item with canvas-space geometry and per-node zoom
//! - `ZOrderStack`: recency order used for stacking and keyboard cycling
//! - `SelectionState`: the single selected node
//!
//! Everything outside the registry refers to nodes by [`NodeId`] only.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::{CanvasPoint, CanvasSize};
use crate::persistence::types::{PersistedNode, PersistedPoint, PersistedSize};

pub mod resize;
pub mod selection;
pub mod z_order;

pub use selection::SelectionState;
pub use z_order::ZOrderStack;

/// Stable node identity, unique within a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a node displays. Rendering is up to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeContent {
    Text {
        text: String,
    },
    Webview {
        url: String,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
}

impl NodeContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Embedded page content. Input without a scheme is treated as https.
    pub fn webview(url: &str) -> Self {
        Self::Webview {
            url: normalize_web_url(url),
        }
    }

    pub fn image(url: impl Into<String>, alt: Option<String>) -> Self {
        Self::Image {
            url: url.into(),
            alt,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Webview { .. } => "webview",
            Self::Image { .. } => "image",
        }
    }
}

/// Turn user-typed addresses into absolute URLs.
///
/// `www.example.com` becomes `https://www.example.com/`. Strings that parse as
/// absolute URLs are kept. Anything else is returned trimmed and unchanged.
pub fn normalize_web_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    // `localhost:8080` parses with scheme "localhost", so require "://" or a
    // scheme that never carries an authority.
    if let Ok(url) = url::Url::parse(trimmed)
        && (trimmed.contains("://") || matches!(url.scheme(), "about" | "data" | "mailto"))
    {
        return url.to_string();
    }
    match url::Url::parse(&format!("https://{trimmed}")) {
        Ok(url) => url.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// A placed content item on the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Stable node identity.
    pub id: NodeId,

    /// Top-left corner in canvas space
    pub position: CanvasPoint,

    /// Extent in canvas space, never below [`Node::MIN_SIZE`]
    pub size: CanvasSize,

    /// Content zoom factor inside the node frame
    pub zoom_level: f64,

    pub content: NodeContent,
}

impl Node {
    pub const MIN_WIDTH: f64 = 200.0;
    pub const MIN_HEIGHT: f64 = 180.0;
    pub const MIN_SIZE: CanvasSize = CanvasSize::new(Self::MIN_WIDTH, Self::MIN_HEIGHT);
    pub const DEFAULT_SIZE: CanvasSize = CanvasSize::new(640.0, 480.0);
    pub const TEXT_SIZE: CanvasSize = CanvasSize::new(600.0, 300.0);
    pub const DEFAULT_ZOOM: f64 = 1.0;
    pub const MIN_ZOOM: f64 = 0.25;
    pub const MAX_ZOOM: f64 = 5.0;

    pub fn center(&self) -> CanvasPoint {
        CanvasPoint::new(
            self.position.x + self.size.width / 2.0,
            self.position.y + self.size.height / 2.0,
        )
    }
}

/// Partial geometry update. `None` fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeGeometryPatch {
    pub position: Option<CanvasPoint>,
    pub size: Option<CanvasSize>,
    pub zoom_level: Option<f64>,
}

impl NodeGeometryPatch {
    pub fn position(position: CanvasPoint) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn size(size: CanvasSize) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn zoom_level(zoom_level: f64) -> Self {
        Self {
            zoom_level: Some(zoom_level),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.size.is_none() && self.zoom_level.is_none()
    }
}

fn clamp_size(size: CanvasSize) -> CanvasSize {
    let width = if size.width.is_finite() { size.width } else { Node::MIN_WIDTH };
    let height = if size.height.is_finite() { size.height } else { Node::MIN_HEIGHT };
    CanvasSize::new(width.max(Node::MIN_WIDTH), height.max(Node::MIN_HEIGHT))
}

fn clamp_zoom(zoom_level: f64) -> f64 {
    if zoom_level.is_finite() {
        zoom_level.clamp(Node::MIN_ZOOM, Node::MAX_ZOOM)
    } else {
        Node::DEFAULT_ZOOM
    }
}

fn finite_point(point: CanvasPoint) -> Option<CanvasPoint> {
    (point.x.is_finite() && point.y.is_finite()).then_some(point)
}

/// Canonical set of nodes for the active workspace.
///
/// Iteration follows insertion order so snapshots are deterministic.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under a fresh id.
    pub fn add(&mut self, content: NodeContent, position: CanvasPoint, size: CanvasSize) -> NodeId {
        let mut id = NodeId::new();
        while self.nodes.contains_key(&id) {
            id = NodeId::new();
        }
        self.insert(Node {
            id,
            position: finite_point(position).unwrap_or_else(CanvasPoint::origin),
            size: clamp_size(size),
            zoom_level: Node::DEFAULT_ZOOM,
            content,
        });
        id
    }

    /// Insert a node keeping its id (rehydration). Returns false on a
    /// duplicate id, leaving the existing node in place.
    pub fn add_with_id(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            debug!("Ignoring duplicate node id {}", node.id);
            return false;
        }
        self.insert(Node {
            position: finite_point(node.position).unwrap_or_else(CanvasPoint::origin),
            size: clamp_size(node.size),
            zoom_level: clamp_zoom(node.zoom_level),
            ..node
        });
        true
    }

    fn insert(&mut self, node: Node) {
        self.order.push(node.id);
        self.nodes.insert(node.id, node);
    }

    /// Merge a geometry patch. Returns whether anything changed; missing ids
    /// are a no-op.
    pub fn update(&mut self, id: NodeId, patch: NodeGeometryPatch) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            debug!("Geometry update for missing node {id}");
            return false;
        };
        let before = (node.position, node.size, node.zoom_level);
        if let Some(position) = patch.position.and_then(finite_point) {
            node.position = position;
        }
        if let Some(size) = patch.size {
            node.size = clamp_size(size);
        }
        if let Some(zoom_level) = patch.zoom_level {
            node.zoom_level = clamp_zoom(zoom_level);
        }
        before != (node.position, node.size, node.zoom_level)
    }

    /// Replace the url of a webview or image node.
    pub fn set_url(&mut self, id: NodeId, new_url: &str) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            debug!("Url update for missing node {id}");
            return false;
        };
        match &mut node.content {
            NodeContent::Webview { url } => {
                let normalized = normalize_web_url(new_url);
                if *url == normalized {
                    return false;
                }
                *url = normalized;
                true
            },
            NodeContent::Image { url, .. } => {
                if url == new_url {
                    return false;
                }
                *url = new_url.to_string();
                true
            },
            NodeContent::Text { .. } => {
                debug!("Url update for text node {id} ignored");
                false
            },
        }
    }

    /// Replace the body of a text node.
    pub fn set_text(&mut self, id: NodeId, new_text: &str) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            debug!("Text update for missing node {id}");
            return false;
        };
        let NodeContent::Text { text } = &mut node.content else {
            debug!("Text update for {} node {id} ignored", node.content.kind());
            return false;
        };
        if text == new_text {
            return false;
        }
        *text = new_text.to_string();
        true
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        Some(node)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Owned copy of every node, detached from later mutation.
    pub fn snapshot(&self) -> Vec<Node> {
        self.nodes().cloned().collect()
    }
}

impl Node {
    pub fn to_persisted(&self) -> PersistedNode {
        PersistedNode {
            id: self.id.to_string(),
            position: PersistedPoint {
                x: self.position.x,
                y: self.position.y,
            },
            size: PersistedSize {
                width: self.size.width,
                height: self.size.height,
            },
            zoom_level: self.zoom_level,
            content: self.content.clone(),
        }
    }

    /// Rebuild a node from its stored form. Unparseable ids yield `None`.
    pub fn from_persisted(persisted: &PersistedNode) -> Option<Self> {
        let id = NodeId::parse(&persisted.id)?;
        Some(Self {
            id,
            position: CanvasPoint::new(persisted.position.x, persisted.position.y),
            size: CanvasSize::new(persisted.size.width, persisted.size.height),
            zoom_level: persisted.zoom_level,
            content: persisted.content.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_node(registry: &mut NodeRegistry, x: f64, y: f64) -> NodeId {
        registry.add(
            NodeContent::text("note"),
            CanvasPoint::new(x, y),
            Node::TEXT_SIZE,
        )
    }

    #[test]
    fn test_registry_new() {
        let registry = NodeRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.snapshot(), Vec::new());
    }

    #[test]
    fn test_add_node() {
        let mut registry = NodeRegistry::new();
        let id = text_node(&mut registry, 10.0, 20.0);

        let node = registry.get(id).unwrap();
        assert_eq!(node.position, CanvasPoint::new(10.0, 20.0));
        assert_eq!(node.size, Node::TEXT_SIZE);
        assert_eq!(node.zoom_level, Node::DEFAULT_ZOOM);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        let mut registry = NodeRegistry::new();
        let a = text_node(&mut registry, 0.0, 0.0);
        let b = text_node(&mut registry, 0.0, 0.0);
        assert_ne!(a, b);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_add_clamps_to_minimum_size() {
        let mut registry = NodeRegistry::new();
        let id = registry.add(
            NodeContent::text(""),
            CanvasPoint::origin(),
            CanvasSize::new(10.0, 10.0),
        );
        assert_eq!(registry.get(id).unwrap().size, Node::MIN_SIZE);
    }

    #[test]
    fn test_add_with_id_rejects_duplicates() {
        let mut registry = NodeRegistry::new();
        let id = text_node(&mut registry, 1.0, 1.0);
        let mut duplicate = registry.get(id).unwrap().clone();
        duplicate.position = CanvasPoint::new(99.0, 99.0);

        assert!(!registry.add_with_id(duplicate));
        assert_eq!(registry.get(id).unwrap().position, CanvasPoint::new(1.0, 1.0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_merges_partial_geometry() {
        let mut registry = NodeRegistry::new();
        let id = text_node(&mut registry, 0.0, 0.0);

        assert!(registry.update(id, NodeGeometryPatch::position(CanvasPoint::new(5.0, 6.0))));
        assert!(registry.update(id, NodeGeometryPatch::zoom_level(1.5)));
        let node = registry.get(id).unwrap();
        assert_eq!(node.position, CanvasPoint::new(5.0, 6.0));
        assert_eq!(node.size, Node::TEXT_SIZE);
        assert_eq!(node.zoom_level, 1.5);
    }

    #[test]
    fn test_update_enforces_size_floor() {
        let mut registry = NodeRegistry::new();
        let id = text_node(&mut registry, 0.0, 0.0);
        registry.update(id, NodeGeometryPatch::size(CanvasSize::new(50.0, 400.0)));
        assert_eq!(registry.get(id).unwrap().size, CanvasSize::new(200.0, 400.0));
    }

    #[test]
    fn test_update_missing_node_is_noop() {
        let mut registry = NodeRegistry::new();
        assert!(!registry.update(NodeId::new(), NodeGeometryPatch::zoom_level(2.0)));
    }

    #[test]
    fn test_update_unchanged_reports_false() {
        let mut registry = NodeRegistry::new();
        let id = text_node(&mut registry, 3.0, 4.0);
        assert!(!registry.update(id, NodeGeometryPatch::position(CanvasPoint::new(3.0, 4.0))));
        assert!(!registry.update(id, NodeGeometryPatch::position(CanvasPoint::new(f64::NAN, 0.0))));
    }

    #[test]
    fn test_remove_node() {
        let mut registry = NodeRegistry::new();
        let a = text_node(&mut registry, 0.0, 0.0);
        let b = text_node(&mut registry, 0.0, 0.0);

        assert!(registry.remove(a).is_some());
        assert!(registry.remove(a).is_none());
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut registry = NodeRegistry::new();
        let id = text_node(&mut registry, 0.0, 0.0);
        let snapshot = registry.snapshot();
        registry.update(id, NodeGeometryPatch::position(CanvasPoint::new(50.0, 50.0)));
        assert_eq!(snapshot[0].position, CanvasPoint::origin());
    }

    #[test]
    fn test_set_text_and_url_respect_content_kind() {
        let mut registry = NodeRegistry::new();
        let text = text_node(&mut registry, 0.0, 0.0);
        let page = registry.add(
            NodeContent::webview("example.com"),
            CanvasPoint::origin(),
            Node::DEFAULT_SIZE,
        );

        assert!(registry.set_text(text, "edited"));
        assert!(!registry.set_text(page, "edited"));
        assert!(!registry.set_url(text, "https://a.test/"));
        assert!(registry.set_url(page, "a.test/path"));
        assert_eq!(
            registry.get(page).unwrap().content,
            NodeContent::Webview {
                url: "https://a.test/path".to_string()
            }
        );
    }

    #[test]
    fn test_normalize_web_url() {
        assert_eq!(normalize_web_url("www.google.com"), "https://www.google.com/");
        assert_eq!(normalize_web_url("http://a.test/x"), "http://a.test/x");
        assert_eq!(normalize_web_url("  localhost:8080 "), "https://localhost:8080/");
        assert_eq!(normalize_web_url("about:blank"), "about:blank");
        assert_eq!(normalize_web_url(""), "");
    }

    #[test]
    fn test_persisted_roundtrip_preserves_identity() {
        let mut registry = NodeRegistry::new();
        let id = registry.add(
            NodeContent::image("https://img.test/a.png", Some("a".to_string())),
            CanvasPoint::new(-5.0, 7.5),
            Node::DEFAULT_SIZE,
        );
        let node = registry.get(id).unwrap();
        let restored = Node::from_persisted(&node.to_persisted()).unwrap();
        assert_eq!(&restored, node);
    }

    #[test]
    fn test_from_persisted_skips_bad_id() {
        let mut persisted = Node {
            id: NodeId::new(),
            position: CanvasPoint::origin(),
            size: Node::DEFAULT_SIZE,
            zoom_level: 1.0,
            content: NodeContent::text("x"),
        }
        .to_persisted();
        persisted.id = "not-a-uuid".to_string();
        assert!(Node::from_persisted(&persisted).is_none());
    }

    #[test]
    fn test_content_serializes_with_type_tag() {
        let json = serde_json::to_value(NodeContent::text("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "text": "hi"}));
        let image: NodeContent =
            serde_json::from_value(serde_json::json!({"type": "image", "url": "u"})).unwrap();
        assert_eq!(image, NodeContent::image("u", None));
    }
}
