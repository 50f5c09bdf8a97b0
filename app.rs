/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Application state for the canvas shell.
//!
//! [`CanvasApp`] owns the active workspace's nodes, stack, selection and
//! camera, the open tab list, the persistence store and the deferred-task
//! queue. Hosts feed it [`CanvasIntent`]s, call [`CanvasApp::tick`] from
//! their event loop and render from [`CanvasApp::drain_events`].

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, error, warn};

use crate::VERSION;
use crate::camera::{
    Camera, CanvasPoint, CanvasSize, PanZoomTransform, ScreenPoint, ScreenSize, viewport_center,
};
use crate::canvas::resize::{ResizeHandle, resize_geometry};
use crate::canvas::{
    Node, NodeContent, NodeGeometryPatch, NodeId, NodeRegistry, SelectionState, ZOrderStack,
};
use crate::events::CanvasEvent;
use crate::persistence::WorkspaceStore;
use crate::persistence::types::SaveData;
use crate::prefs::CanvasPrefs;
use crate::scheduler::{DeferredQueue, DeferredTask};
use crate::workspace::share::{self, ShareError};
use crate::workspace::{BackgroundStyle, Workspace, WorkspaceId, first_run_seed};

/// Where a new node goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodePlacement {
    /// Centered on the viewport center.
    ViewportCenter,
    /// Top-left corner at a screen point, e.g. a context-menu click.
    Screen(ScreenPoint),
    /// Top-left corner at a canvas point.
    Canvas(CanvasPoint),
}

/// Inbound commands from the UI host.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasIntent {
    AddNode {
        content: NodeContent,
        placement: NodePlacement,
        size: Option<CanvasSize>,
    },
    AddText {
        text: String,
        placement: NodePlacement,
    },
    /// A node asked for a new window; open it to the right of the node.
    AddNodeBeside {
        anchor: NodeId,
        content: NodeContent,
    },
    RemoveNode {
        id: NodeId,
    },
    SetNodeGeometry {
        id: NodeId,
        patch: NodeGeometryPatch,
    },
    ResizeNode {
        id: NodeId,
        handle: ResizeHandle,
        size: CanvasSize,
        symmetric: bool,
    },
    SetNodeUrl {
        id: NodeId,
        url: String,
    },
    SetNodeText {
        id: NodeId,
        text: String,
    },
    SelectNode {
        id: NodeId,
        center: bool,
    },
    Deselect,
    PointerDownOnBackground {
        modifier_held: bool,
    },
    CycleNode {
        delta: isize,
    },
    CommitCycle,
    CancelCycle,
    PanTo {
        transform: PanZoomTransform,
    },
    ZoomToOverview,
    SetViewport {
        size: ScreenSize,
    },
    SetBackground {
        style: BackgroundStyle,
    },
    RenameWorkspace {
        title: String,
    },
    SwitchWorkspace {
        id: WorkspaceId,
    },
    CreateWorkspace,
    RemoveWorkspace {
        id: WorkspaceId,
    },
    ImportWorkspace {
        encoded: String,
    },
}

/// Screen point used for default placement before the host reports a viewport.
const FALLBACK_PLACEMENT: ScreenPoint = ScreenPoint::new(40.0, 40.0);

pub struct CanvasApp {
    store: WorkspaceStore,
    prefs: CanvasPrefs,
    camera: Camera,
    save_data: SaveData,

    /// Workspace whose content the fields below describe.
    active: Option<WorkspaceId>,
    /// Between the two phases of a switch: content not loaded yet.
    hydrating: bool,

    registry: NodeRegistry,
    stack: ZOrderStack,
    selection: SelectionState,
    transform: PanZoomTransform,
    background: BackgroundStyle,
    title: String,

    viewport: Option<ScreenSize>,
    pan_locked_until: Option<Instant>,

    queue: DeferredQueue<DeferredTask>,
    events: Vec<CanvasEvent>,
    /// Latest event-loop time seen.
    now: Instant,
}

impl CanvasApp {
    /// Open the app over `store`, activating (and if needed creating) a
    /// workspace. The active workspace is hydrated before this returns.
    pub fn open(store: WorkspaceStore, prefs: CanvasPrefs) -> Self {
        let mut app = Self {
            store,
            camera: prefs.camera(),
            prefs,
            save_data: SaveData::default(),
            active: None,
            hydrating: false,
            registry: NodeRegistry::new(),
            stack: ZOrderStack::new(),
            selection: SelectionState::new(),
            transform: PanZoomTransform::default(),
            background: BackgroundStyle::default(),
            title: Workspace::UNTITLED.to_string(),
            viewport: None,
            pan_locked_until: None,
            queue: DeferredQueue::new(),
            events: Vec::new(),
            now: Instant::now(),
        };
        app.bootstrap();
        app
    }

    /// Open the redb store in `data_dir`, falling back to a volatile store
    /// if it cannot be opened.
    pub fn new_from_dir(data_dir: PathBuf) -> Self {
        let prefs = CanvasPrefs::load(&data_dir);
        let store = match WorkspaceStore::open(data_dir) {
            Ok(store) => store,
            Err(e) => {
                warn!("Failed to open workspace store: {e}; changes will not be saved");
                WorkspaceStore::in_memory()
            },
        };
        Self::open(store, prefs)
    }

    pub fn new_for_testing() -> Self {
        Self::open(WorkspaceStore::in_memory(), CanvasPrefs::default())
    }

    fn bootstrap(&mut self) {
        self.save_data = self.store.load_save_data();
        if self.save_data.app_version != VERSION {
            debug!(
                "Save data written by version {}; now {VERSION}",
                self.save_data.app_version
            );
        }
        if let Err(e) = self.store.save_app_version(VERSION) {
            warn!("Failed to persist app version: {e}");
        }
        self.save_data.app_version = VERSION.to_string();

        let target = self
            .save_data
            .selected_workspace_id
            .filter(|id| self.save_data.tabs.contains(id))
            .or_else(|| self.save_data.tabs.last().copied());
        match target {
            Some(id) => self.begin_switch(id),
            None => {
                self.create_workspace(None);
            },
        }
        // No stale frame to avoid at launch; hydrate now.
        self.run_pending_now();
    }

    // ---- Intent reducer ----

    pub fn apply_intents<I>(&mut self, intents: I)
    where
        I: IntoIterator<Item = CanvasIntent>,
    {
        self.apply_intents_at(Instant::now(), intents);
    }

    pub fn apply_intents_at<I>(&mut self, now: Instant, intents: I)
    where
        I: IntoIterator<Item = CanvasIntent>,
    {
        self.advance_clock(now);
        for intent in intents {
            self.apply_intent(intent);
            self.settle_invariants();
        }
    }

    fn apply_intent(&mut self, intent: CanvasIntent) {
        match intent {
            CanvasIntent::AddNode {
                content,
                placement,
                size,
            } => {
                self.add_node(content, placement, size);
            },
            CanvasIntent::AddText { text, placement } => {
                self.add_text(&text, placement);
            },
            CanvasIntent::AddNodeBeside { anchor, content } => {
                self.add_node_beside(anchor, content);
            },
            CanvasIntent::RemoveNode { id } => self.remove_node(id),
            CanvasIntent::SetNodeGeometry { id, patch } => self.update_node_geometry(id, patch),
            CanvasIntent::ResizeNode {
                id,
                handle,
                size,
                symmetric,
            } => self.resize_node(id, handle, size, symmetric),
            CanvasIntent::SetNodeUrl { id, url } => self.set_node_url(id, &url),
            CanvasIntent::SetNodeText { id, text } => self.set_node_text(id, &text),
            CanvasIntent::SelectNode { id, center } => self.select_node(id, center),
            CanvasIntent::Deselect => self.deselect(),
            CanvasIntent::PointerDownOnBackground { modifier_held } => {
                if !modifier_held {
                    self.deselect();
                }
            },
            CanvasIntent::CycleNode { delta } => self.cycle_node(delta),
            CanvasIntent::CommitCycle => self.commit_cycle(),
            CanvasIntent::CancelCycle => self.stack.cancel_cycle(),
            CanvasIntent::PanTo { transform } => self.pan_to(transform),
            CanvasIntent::ZoomToOverview => self.zoom_to_overview(),
            CanvasIntent::SetViewport { size } => self.set_viewport(size),
            CanvasIntent::SetBackground { style } => self.set_background(style),
            CanvasIntent::RenameWorkspace { title } => self.rename_workspace(&title),
            CanvasIntent::SwitchWorkspace { id } => {
                self.switch_workspace(id);
            },
            CanvasIntent::CreateWorkspace => {
                self.create_workspace(None);
            },
            CanvasIntent::RemoveWorkspace { id } => {
                self.remove_workspace(id);
            },
            CanvasIntent::ImportWorkspace { encoded } => {
                // Already surfaced as ImportFailed.
                if let Err(e) = self.import_workspace(&encoded) {
                    debug!("Import intent dropped: {e}");
                }
            },
        }
    }

    /// Run deferred work that is due at `now`.
    pub fn tick(&mut self, now: Instant) {
        self.advance_clock(now);
        for task in self.queue.take_due(self.now) {
            self.run_task(task);
        }
        self.settle_invariants();
    }

    /// Run every pending task immediately, regardless of deadline.
    pub fn run_pending_now(&mut self) {
        // Hydration may schedule writes; loop until quiet.
        while !self.queue.is_empty() {
            for task in self.queue.drain_all() {
                self.run_task(task);
            }
        }
        self.settle_invariants();
    }

    /// Flush pending writes. Call before the process exits.
    pub fn shutdown(&mut self) {
        self.queue
            .cancel_where(|task| matches!(task, DeferredTask::Hydrate(_)));
        for task in self.queue.drain_all() {
            self.run_task(task);
        }
    }

    /// Deadline of the next deferred task, for hosts that sleep between ticks.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.next_due()
    }

    pub fn drain_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.events)
    }

    fn advance_clock(&mut self, now: Instant) {
        if now > self.now {
            self.now = now;
        }
    }

    fn emit(&mut self, event: CanvasEvent) {
        self.events.push(event);
    }

    fn emit_z_order(&mut self) {
        let order = self.stack.ids().to_vec();
        self.emit(CanvasEvent::ZOrderChanged { order });
    }

    // ---- Nodes ----

    pub fn add_node(
        &mut self,
        content: NodeContent,
        placement: NodePlacement,
        size: Option<CanvasSize>,
    ) -> NodeId {
        self.finish_hydration();
        let size = size.unwrap_or(Node::DEFAULT_SIZE);
        let position = match placement {
            NodePlacement::ViewportCenter => {
                let center = self
                    .viewport
                    .map(viewport_center)
                    .unwrap_or(FALLBACK_PLACEMENT);
                let center = self.transform.to_canvas_space(center);
                CanvasPoint::new(center.x - size.width / 2.0, center.y - size.height / 2.0)
            },
            NodePlacement::Screen(point) => self.transform.to_canvas_space(point),
            NodePlacement::Canvas(point) => point,
        };
        let id = self.registry.add(content, position, size);
        self.stack.push(id);
        self.emit(CanvasEvent::NodeAdded { id });
        self.emit_z_order();
        self.schedule_nodes_write();
        id
    }

    pub fn add_text(&mut self, text: &str, placement: NodePlacement) -> NodeId {
        self.add_node(NodeContent::text(text), placement, Some(Node::TEXT_SIZE))
    }

    pub fn add_node_beside(&mut self, anchor: NodeId, content: NodeContent) -> Option<NodeId> {
        let Some(node) = self.registry.get(anchor) else {
            debug!("Spawn beside missing node {anchor}");
            return None;
        };
        let position = CanvasPoint::new(node.position.x + node.size.width, node.position.y);
        let size = node.size;
        Some(self.add_node(content, NodePlacement::Canvas(position), Some(size)))
    }

    pub fn remove_node(&mut self, id: NodeId) {
        if self.registry.remove(id).is_none() {
            debug!("Remove of missing node {id}");
            return;
        }
        self.stack.remove(id);
        if let Some(change) = self.selection.forget(id) {
            self.emit(CanvasEvent::SelectionChanged {
                previous: change.previous,
                selected: change.current,
            });
        }
        self.emit(CanvasEvent::NodeRemoved { id });
        self.emit_z_order();
        self.schedule_nodes_write();
    }

    pub fn update_node_geometry(&mut self, id: NodeId, patch: NodeGeometryPatch) {
        if self.registry.update(id, patch) {
            self.emit(CanvasEvent::NodeGeometryChanged { id });
            self.schedule_nodes_write();
        }
    }

    pub fn resize_node(
        &mut self,
        id: NodeId,
        handle: ResizeHandle,
        size: CanvasSize,
        symmetric: bool,
    ) {
        let Some(node) = self.registry.get(id) else {
            debug!("Resize of missing node {id}");
            return;
        };
        let (position, size) = resize_geometry(node.position, node.size, handle, size, symmetric);
        self.update_node_geometry(
            id,
            NodeGeometryPatch {
                position: Some(position),
                size: Some(size),
                zoom_level: None,
            },
        );
    }

    pub fn set_node_url(&mut self, id: NodeId, url: &str) {
        if self.registry.set_url(id, url) {
            self.emit(CanvasEvent::NodeContentChanged { id });
            self.schedule_nodes_write();
        }
    }

    pub fn set_node_text(&mut self, id: NodeId, text: &str) {
        if self.registry.set_text(id, text) {
            self.emit(CanvasEvent::NodeContentChanged { id });
            self.schedule_nodes_write();
        }
    }

    // ---- Selection and stacking ----

    /// Select `id` and bring it to the top. Stale ids are ignored.
    ///
    /// While keyboard cycling is in progress the stack is left alone; the
    /// cycle commit decides the final order.
    pub fn select_node(&mut self, id: NodeId, center: bool) {
        if !self.registry.contains(id) {
            debug!("Select of missing node {id}");
            return;
        }
        if let Some(change) = self.selection.select(id) {
            self.emit(CanvasEvent::SelectionChanged {
                previous: change.previous,
                selected: change.current,
            });
        }
        if !self.stack.is_cycling() && self.stack.promote(id) {
            self.emit_z_order();
            self.schedule_nodes_write();
        }
        if center {
            self.center_on_node(id);
        }
    }

    pub fn deselect(&mut self) {
        if let Some(change) = self.selection.clear() {
            self.emit(CanvasEvent::SelectionChanged {
                previous: change.previous,
                selected: change.current,
            });
        }
    }

    /// Preview the node `delta` positions away in the stack and center on it.
    pub fn cycle_node(&mut self, delta: isize) {
        let Some(id) = self.stack.cycle(delta) else {
            return;
        };
        self.emit(CanvasEvent::CyclePreview { id });
        self.center_on_node(id);
    }

    /// Finish keyboard cycling: the previewed node becomes top and selected.
    pub fn commit_cycle(&mut self) {
        let before = self.stack.head();
        let Some(id) = self.stack.commit_cycle() else {
            return;
        };
        if before != Some(id) {
            self.emit_z_order();
            self.schedule_nodes_write();
        }
        self.select_node(id, false);
    }

    /// Fit the node into the viewport. Returns false when there is no node or
    /// no viewport to fit into.
    pub fn center_on_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.registry.get(id) else {
            debug!("Center on missing node {id}");
            return false;
        };
        let Some(viewport) = self.viewport else {
            debug!("Center on {id} skipped: viewport size unknown");
            return false;
        };
        let Some(next) = self
            .camera
            .center_on(&self.transform, node.position, node.size, viewport)
        else {
            debug!("Center on {id} skipped: empty geometry");
            return false;
        };
        self.set_transform(next);
        self.pan_locked_until = Some(self.now + self.prefs.centering_lock());
        true
    }

    // ---- Camera ----

    /// Apply a pan/zoom gesture. Ignored while a centering jump is settling.
    pub fn pan_to(&mut self, transform: PanZoomTransform) {
        if !transform.is_valid() {
            debug!("Ignoring invalid transform {transform:?}");
            return;
        }
        if self.is_pan_locked() {
            debug!("Pan ignored while centering");
            return;
        }
        self.finish_hydration();
        let mut transform = transform;
        transform.scale = self.camera.clamp(transform.scale);
        self.set_transform(transform);
    }

    pub fn zoom_to_overview(&mut self) {
        let Some(viewport) = self.viewport else {
            debug!("Overview zoom skipped: viewport size unknown");
            return;
        };
        self.finish_hydration();
        let next = self.camera.overview(&self.transform, viewport);
        self.set_transform(next);
    }

    pub fn set_viewport(&mut self, size: ScreenSize) {
        if size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0
        {
            self.viewport = Some(size);
        } else {
            debug!("Ignoring empty viewport {size:?}");
        }
    }

    pub fn is_pan_locked(&self) -> bool {
        self.pan_locked_until.is_some_and(|until| self.now < until)
    }

    fn set_transform(&mut self, transform: PanZoomTransform) {
        if transform == self.transform {
            return;
        }
        self.transform = transform;
        self.emit(CanvasEvent::TransformChanged { transform });
        self.schedule_write(DeferredTask::SaveTransform);
    }

    // ---- Workspace metadata ----

    pub fn set_background(&mut self, style: BackgroundStyle) {
        self.finish_hydration();
        if style == self.background {
            return;
        }
        self.background = style.clone();
        self.emit(CanvasEvent::BackgroundChanged { style });
        self.schedule_write(DeferredTask::SaveBackground);
    }

    pub fn rename_workspace(&mut self, title: &str) {
        self.finish_hydration();
        let title = title.trim();
        let title = if title.is_empty() { Workspace::UNTITLED } else { title };
        if title == self.title {
            return;
        }
        self.title = title.to_string();
        if let Some(id) = self.active {
            self.save_data.workspace_lookup.insert(id, self.title.clone());
        }
        self.emit(CanvasEvent::TitleChanged {
            title: self.title.clone(),
        });
        self.schedule_write(DeferredTask::SaveTitle);
    }

    // ---- Workspaces ----

    /// Make `id` the active workspace. Content loads on the next tick.
    pub fn switch_workspace(&mut self, id: WorkspaceId) -> bool {
        if self.active == Some(id) {
            debug!("Workspace {id} already active");
            return false;
        }
        if !self.save_data.tabs.contains(&id) {
            debug!("Switch to unknown workspace {id}");
            return false;
        }
        self.begin_switch(id);
        true
    }

    /// Open a new tab holding `imported`, or a default workspace. The tab
    /// always gets a fresh id.
    pub fn create_workspace(&mut self, imported: Option<Workspace>) -> WorkspaceId {
        let mut workspace = imported.unwrap_or_else(Workspace::new_default);
        let mut id = WorkspaceId::new();
        while self.save_data.tabs.contains(&id) {
            id = WorkspaceId::new();
        }
        workspace.id = id;

        if let Err(e) = self.store.save_workspace(&workspace) {
            warn!("Failed to persist new workspace {id}: {e}");
        }
        self.save_data.tabs.push(id);
        self.save_data
            .workspace_lookup
            .insert(id, workspace.title.clone());
        self.persist_tabs();
        self.begin_switch(id);
        id
    }

    /// Close a tab and delete its stored data. Closing the active tab moves to
    /// the last remaining one, or a fresh default workspace.
    pub fn remove_workspace(&mut self, id: WorkspaceId) -> bool {
        let Some(index) = self.save_data.tabs.iter().position(|tab| *tab == id) else {
            debug!("Remove of unknown workspace {id}");
            return false;
        };
        self.queue.cancel_where(|task| task.workspace() == id);
        self.save_data.tabs.remove(index);
        self.save_data.workspace_lookup.remove(&id);
        if let Err(e) = self.store.delete_workspace(id) {
            warn!("Failed to delete workspace {id}: {e}");
        }
        self.persist_tabs();

        if self.active == Some(id) {
            // Nothing left to flush for the removed workspace.
            self.active = None;
            self.hydrating = false;
            match self.save_data.tabs.last().copied() {
                Some(next) => self.begin_switch(next),
                None => {
                    self.create_workspace(None);
                },
            }
        }
        true
    }

    /// Decode a share link and open it as a new tab. Failures leave all state
    /// untouched and queue an [`CanvasEvent::ImportFailed`].
    pub fn import_workspace(&mut self, encoded: &str) -> Result<WorkspaceId, ShareError> {
        match share::decode(encoded) {
            Ok(workspace) => Ok(self.create_workspace(Some(workspace))),
            Err(e) => {
                warn!("Rejected workspace import: {e}");
                self.emit(CanvasEvent::ImportFailed {
                    reason: e.to_string(),
                });
                Err(e)
            },
        }
    }

    /// Share link for the active workspace.
    pub fn export_workspace(&self) -> Result<String, ShareError> {
        share::share_link(&self.snapshot_workspace())
    }

    /// Share link for any open workspace. Inactive ones are read from the
    /// store; the selection is left alone.
    pub fn export_workspace_by_id(&self, id: WorkspaceId) -> Result<String, ShareError> {
        if self.active == Some(id) {
            return self.export_workspace();
        }
        if !self.save_data.tabs.contains(&id) {
            return Err(ShareError::Invalid(format!("no open workspace {id}")));
        }
        share::share_link(&self.store.load_workspace(id))
    }

    /// The active workspace as it currently stands.
    pub fn snapshot_workspace(&self) -> Workspace {
        let Some(id) = self.active else {
            return Workspace::new_default();
        };
        if self.hydrating {
            return self.store.load_workspace(id);
        }
        Workspace {
            id,
            title: self.title.clone(),
            nodes: self.nodes_in_stack_order(),
            transform: self.transform,
            background_style: self.background.clone(),
        }
    }

    fn begin_switch(&mut self, id: WorkspaceId) {
        if let Some(current) = self.active {
            self.flush_writes_for(current);
        }
        self.queue
            .cancel_where(|task| matches!(task, DeferredTask::Hydrate(_)));
        self.teardown();

        self.active = Some(id);
        self.hydrating = true;
        self.save_data.selected_workspace_id = Some(id);
        if let Err(e) = self.store.save_selected_workspace(Some(id)) {
            warn!("Failed to persist selected workspace: {e}");
        }
        self.emit(CanvasEvent::WorkspaceSwitched { id });
        self.queue
            .schedule(DeferredTask::Hydrate(id), self.now, Duration::ZERO);
    }

    /// Drop in-memory content of the outgoing workspace. Stored data is kept.
    fn teardown(&mut self) {
        self.deselect();
        let removed: Vec<NodeId> = self.stack.ids().to_vec();
        self.registry.clear();
        self.stack.clear();
        self.pan_locked_until = None;
        for id in removed {
            self.emit(CanvasEvent::NodeRemoved { id });
        }
    }

    fn hydrate(&mut self, id: WorkspaceId) {
        if self.active != Some(id) || !self.hydrating {
            debug!("Dropping stale hydration of {id}");
            return;
        }
        let workspace = self.store.load_workspace(id);
        self.hydrating = false;

        self.transform = workspace.transform;
        self.emit(CanvasEvent::TransformChanged {
            transform: self.transform,
        });
        self.background = workspace.background_style;
        self.emit(CanvasEvent::BackgroundChanged {
            style: self.background.clone(),
        });
        self.title = workspace.title;
        self.save_data
            .workspace_lookup
            .insert(id, self.title.clone());
        self.emit(CanvasEvent::TitleChanged {
            title: self.title.clone(),
        });

        for node in workspace.nodes {
            let node_id = node.id;
            if self.registry.add_with_id(node) {
                self.stack.push(node_id);
                self.emit(CanvasEvent::NodeAdded { id: node_id });
            }
        }
        if self.registry.is_empty() {
            self.seed_first_run();
        }
        self.emit_z_order();
    }

    /// Load the pending workspace now, so an edit made mid-switch lands on
    /// top of its stored content instead of being overwritten by it.
    fn finish_hydration(&mut self) {
        let Some(id) = self.active else {
            return;
        };
        if !self.hydrating {
            return;
        }
        debug!("Edit during switch; hydrating {id} early");
        self.queue.cancel(&DeferredTask::Hydrate(id));
        self.hydrate(id);
    }

    fn seed_first_run(&mut self) {
        debug!("Seeding empty workspace");
        for seed in first_run_seed() {
            let (x, y) = seed.screen_position;
            self.add_node(
                seed.content,
                NodePlacement::Screen(ScreenPoint::new(x, y)),
                Some(Node::DEFAULT_SIZE),
            );
        }
    }

    // ---- Persistence ----

    fn nodes_in_stack_order(&self) -> Vec<Node> {
        self.stack
            .ids()
            .iter()
            .filter_map(|id| self.registry.get(*id))
            .cloned()
            .collect()
    }

    fn schedule_nodes_write(&mut self) {
        self.schedule_write(DeferredTask::SaveNodes);
    }

    fn schedule_write(&mut self, task: fn(WorkspaceId) -> DeferredTask) {
        let Some(id) = self.active else {
            return;
        };
        if self.hydrating {
            return;
        }
        let task = task(id);
        let delay = match task {
            DeferredTask::SaveNodes(_) => self.prefs.nodes_debounce(),
            DeferredTask::SaveTransform(_) => self.prefs.panzoom_debounce(),
            DeferredTask::SaveBackground(_) | DeferredTask::SaveTitle(_) => {
                self.prefs.metadata_debounce()
            },
            DeferredTask::Hydrate(_) => Duration::ZERO,
        };
        self.queue.schedule(task, self.now, delay);
    }

    fn flush_writes_for(&mut self, id: WorkspaceId) {
        for task in self
            .queue
            .drain_where(|task| task.workspace() == id && task.is_write())
        {
            self.run_task(task);
        }
    }

    fn run_task(&mut self, task: DeferredTask) {
        if let DeferredTask::Hydrate(id) = task {
            self.hydrate(id);
            return;
        }
        let id = task.workspace();
        if self.active != Some(id) || self.hydrating {
            debug!("Dropping {task:?}: workspace not live");
            return;
        }
        let result = match task {
            DeferredTask::SaveNodes(_) => {
                let nodes = self.nodes_in_stack_order();
                self.store.save_nodes(id, &nodes)
            },
            DeferredTask::SaveTransform(_) => self.store.save_transform(id, self.transform),
            DeferredTask::SaveBackground(_) => self.store.save_background(id, &self.background),
            DeferredTask::SaveTitle(_) => self.store.save_title(id, &self.title),
            DeferredTask::Hydrate(_) => Ok(()),
        };
        if let Err(e) = result {
            warn!("Failed to persist {task:?}: {e}");
        }
    }

    fn persist_tabs(&mut self) {
        if let Err(e) = self.store.save_tabs(&self.save_data.tabs) {
            warn!("Failed to persist tabs: {e}");
        }
        let tabs = self.save_data.tabs.clone();
        self.emit(CanvasEvent::TabsChanged { tabs });
    }

    /// Repair stack/selection drift from the registry, which is authoritative.
    fn settle_invariants(&mut self) {
        let repaired = self.stack.reconcile(self.registry.ids());
        if repaired {
            error!("Z-order stack diverged from the node registry; rebuilt from registry");
            self.emit_z_order();
        }
        debug_assert!(!repaired, "z-order stack diverged from the node registry");

        if let Some(selected) = self.selection.selected()
            && !self.registry.contains(selected)
        {
            error!("Selected node {selected} is not in the registry; clearing selection");
            self.deselect();
        }
    }

    // ---- Queries ----

    pub fn active_workspace(&self) -> Option<WorkspaceId> {
        self.active
    }

    pub fn is_hydrating(&self) -> bool {
        self.hydrating
    }

    pub fn tabs(&self) -> &[WorkspaceId] {
        &self.save_data.tabs
    }

    pub fn workspace_title(&self, id: WorkspaceId) -> Option<&str> {
        self.save_data.workspace_lookup.get(&id).map(String::as_str)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn transform(&self) -> PanZoomTransform {
        self.transform
    }

    pub fn background(&self) -> &BackgroundStyle {
        &self.background
    }

    pub fn viewport(&self) -> Option<ScreenSize> {
        self.viewport
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.registry.get(id)
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn stack(&self) -> &ZOrderStack {
        &self.stack
    }

    pub fn z_index(&self, id: NodeId) -> Option<i32> {
        self.stack.z_index(id)
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        self.selection.selected()
    }

    pub fn selection_revision(&self) -> u64 {
        self.selection.revision()
    }

    pub fn cycle_preview(&self) -> Option<NodeId> {
        self.stack.preview()
    }

    pub fn app_version(&self) -> &str {
        &self.save_data.app_version
    }
}
