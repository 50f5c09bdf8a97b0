/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Workspace persistence over a string key-value store.
//!
//! Layout:
//! - `saveData.appVersion`, `saveData.tabs`, `saveData.selectedWorkspaceId`
//! - `saveData.workspaceLookup.<id>.<field>` for each [`WorkspaceField`]
//!
//! Every value is JSON. Writes go straight through; callers debounce.
//! Reads never fail: missing, null or corrupt entries yield the default.

pub mod types;

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::warn;
use redb::{ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::camera::PanZoomTransform;
use crate::canvas::Node;
use crate::workspace::{BackgroundStyle, Workspace, WorkspaceId};
use types::{PanZoomSettings, PersistedNode, SaveData, WorkspaceField};

const SAVE_DATA_TABLE: redb::TableDefinition<&str, &str> = redb::TableDefinition::new("save_data");
const DATABASE_FILE: &str = "canvas.redb";

pub const APP_VERSION_KEY: &str = "saveData.appVersion";
pub const TABS_KEY: &str = "saveData.tabs";
pub const SELECTED_WORKSPACE_KEY: &str = "saveData.selectedWorkspaceId";
pub const DEFAULT_APP_VERSION: &str = "0.0.0";

/// Key under which one field of one workspace is stored.
pub fn workspace_key(id: WorkspaceId, field: WorkspaceField) -> String {
    format!("saveData.workspaceLookup.{id}.{}", field.key_segment())
}

/// Durable, synchronous string store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Volatile store for tests and headless use.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single redb table.
pub struct RedbStore {
    db: redb::Database,
}

impl RedbStore {
    /// Open or create the store inside `base_dir`
    pub fn open(base_dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&base_dir)
            .map_err(|e| StoreError::Io(format!("Failed to create dir: {e}")))?;
        let db = redb::Database::create(base_dir.join(DATABASE_FILE))
            .map_err(|e| StoreError::Redb(format!("{e}")))?;
        Ok(Self { db })
    }

    /// `<config dir>/canvasshell`, or `.canvasshell` when the platform has no
    /// config directory.
    pub fn default_data_dir() -> PathBuf {
        match dirs::config_dir() {
            Some(mut dir) => {
                dir.push("canvasshell");
                dir
            },
            None => PathBuf::from(".canvasshell"),
        }
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Redb(format!("{e}")))?;
        let table = match read_txn.open_table(SAVE_DATA_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StoreError::Redb(format!("{e}"))),
        };
        let entry = table
            .get(key)
            .map_err(|e| StoreError::Redb(format!("{e}")))?;
        Ok(entry.map(|value| value.value().to_string()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Redb(format!("{e}")))?;
        {
            let mut table = write_txn
                .open_table(SAVE_DATA_TABLE)
                .map_err(|e| StoreError::Redb(format!("{e}")))?;
            table
                .insert(key, value)
                .map_err(|e| StoreError::Redb(format!("{e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Redb(format!("{e}")))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Redb(format!("{e}")))?;
        {
            let mut table = write_txn
                .open_table(SAVE_DATA_TABLE)
                .map_err(|e| StoreError::Redb(format!("{e}")))?;
            table
                .remove(key)
                .map_err(|e| StoreError::Redb(format!("{e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Redb(format!("{e}")))?;
        Ok(())
    }
}

/// Typed access to save data and per-workspace fields.
pub struct WorkspaceStore {
    kv: Box<dyn KeyValueStore>,
}

impl WorkspaceStore {
    pub fn new(kv: impl KeyValueStore + 'static) -> Self {
        Self { kv: Box::new(kv) }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Redb-backed store in `base_dir`.
    pub fn open(base_dir: PathBuf) -> Result<Self, StoreError> {
        Ok(Self::new(RedbStore::open(base_dir)?))
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(value).map_err(|e| StoreError::Serialize(format!("{e}")))?;
        self.kv.set(key, &json)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read {key}: {e}");
                return None;
            },
        };
        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring corrupt value at {key}: {e}");
                return None;
            },
        };
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Ignoring malformed value at {key}: {e}");
                None
            },
        }
    }

    pub fn save<T: Serialize + ?Sized>(
        &mut self,
        id: WorkspaceId,
        field: WorkspaceField,
        value: &T,
    ) -> Result<(), StoreError> {
        self.write_json(&workspace_key(id, field), value)
    }

    /// Stored value of `field`, or `default` when absent or unreadable.
    pub fn load<T: DeserializeOwned>(&self, id: WorkspaceId, field: WorkspaceField, default: T) -> T {
        self.read_json(&workspace_key(id, field)).unwrap_or(default)
    }

    pub fn save_nodes(&mut self, id: WorkspaceId, nodes: &[Node]) -> Result<(), StoreError> {
        let persisted: Vec<PersistedNode> = nodes.iter().map(Node::to_persisted).collect();
        self.save(id, WorkspaceField::Nodes, &persisted)
    }

    pub fn save_transform(
        &mut self,
        id: WorkspaceId,
        transform: PanZoomTransform,
    ) -> Result<(), StoreError> {
        self.save(id, WorkspaceField::PanZoom, &PanZoomSettings { transform })
    }

    pub fn save_background(
        &mut self,
        id: WorkspaceId,
        background: &BackgroundStyle,
    ) -> Result<(), StoreError> {
        self.save(id, WorkspaceField::BackgroundStyle, background)
    }

    pub fn save_title(&mut self, id: WorkspaceId, title: &str) -> Result<(), StoreError> {
        self.save(id, WorkspaceField::Title, title)
    }

    /// Write every field of `workspace`.
    pub fn save_workspace(&mut self, workspace: &Workspace) -> Result<(), StoreError> {
        let id = workspace.id;
        self.save(id, WorkspaceField::Id, &id)?;
        self.save_title(id, &workspace.title)?;
        self.save_transform(id, workspace.transform)?;
        self.save_background(id, &workspace.background_style)?;
        self.save_nodes(id, &workspace.nodes)
    }

    /// Read a workspace field by field, defaulting each one independently.
    pub fn load_workspace(&self, id: WorkspaceId) -> Workspace {
        let persisted_nodes: Vec<PersistedNode> = self.load(id, WorkspaceField::Nodes, Vec::new());
        let mut nodes = Vec::with_capacity(persisted_nodes.len());
        for persisted in &persisted_nodes {
            let Some(node) = Node::from_persisted(persisted) else {
                warn!("Skipping stored node with invalid id '{}' in {id}", persisted.id);
                continue;
            };
            nodes.push(node);
        }

        let mut transform = self
            .load(id, WorkspaceField::PanZoom, PanZoomSettings::default())
            .transform;
        if !transform.is_valid() {
            warn!("Stored transform for {id} is invalid; using default");
            transform = PanZoomTransform::default();
        }

        Workspace {
            id,
            title: self.load(id, WorkspaceField::Title, Workspace::UNTITLED.to_string()),
            nodes,
            transform,
            background_style: self.load(id, WorkspaceField::BackgroundStyle, BackgroundStyle::default()),
        }
    }

    /// Remove every stored field of a workspace.
    pub fn delete_workspace(&mut self, id: WorkspaceId) -> Result<(), StoreError> {
        for field in WorkspaceField::ALL {
            self.kv.remove(&workspace_key(id, field))?;
        }
        Ok(())
    }

    pub fn save_app_version(&mut self, version: &str) -> Result<(), StoreError> {
        self.write_json(APP_VERSION_KEY, version)
    }

    pub fn save_tabs(&mut self, tabs: &[WorkspaceId]) -> Result<(), StoreError> {
        self.write_json(TABS_KEY, tabs)
    }

    pub fn save_selected_workspace(&mut self, id: Option<WorkspaceId>) -> Result<(), StoreError> {
        self.write_json(SELECTED_WORKSPACE_KEY, &id)
    }

    /// Load the root save data. Unparseable tab ids are dropped.
    pub fn load_save_data(&self) -> SaveData {
        let raw_tabs: Vec<String> = self.read_json(TABS_KEY).unwrap_or_default();
        let mut tabs = Vec::with_capacity(raw_tabs.len());
        for raw in raw_tabs {
            match WorkspaceId::parse(&raw) {
                Some(id) if !tabs.contains(&id) => tabs.push(id),
                Some(id) => warn!("Dropping duplicate tab {id}"),
                None => warn!("Dropping tab with invalid workspace id '{raw}'"),
            }
        }

        let selected_workspace_id = self
            .read_json::<String>(SELECTED_WORKSPACE_KEY)
            .and_then(|raw| WorkspaceId::parse(&raw));

        let workspace_lookup = tabs
            .iter()
            .map(|id| {
                let title = self.load(*id, WorkspaceField::Title, Workspace::UNTITLED.to_string());
                (*id, title)
            })
            .collect();

        SaveData {
            app_version: self
                .read_json(APP_VERSION_KEY)
                .unwrap_or_else(|| DEFAULT_APP_VERSION.to_string()),
            tabs,
            selected_workspace_id,
            workspace_lookup,
        }
    }
}

/// Errors from the key-value layer
#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Redb(String),
    Serialize(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {e}"),
            StoreError::Redb(e) => write!(f, "Redb error: {e}"),
            StoreError::Serialize(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}
