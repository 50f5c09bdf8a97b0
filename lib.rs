/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canvas state engine for a spatial workspace shell.
//!
//! Nodes (text notes, embedded pages, images) live on an unbounded canvas
//! plane, grouped into switchable workspaces that persist to a key-value
//! store. A UI host feeds [`app::CanvasIntent`]s into [`app::CanvasApp`] and
//! renders from the [`events::CanvasEvent`]s it drains back out.

pub mod app;
pub mod camera;
pub mod canvas;
pub mod events;
pub mod persistence;
pub mod prefs;
pub mod scheduler;
pub mod workspace;

pub use app::{CanvasApp, CanvasIntent};
pub use canvas::{Node, NodeContent, NodeId};
pub use events::CanvasEvent;
pub use workspace::{Workspace, WorkspaceId};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
