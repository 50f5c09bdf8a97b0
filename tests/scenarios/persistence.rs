/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use canvasshell::app::NodePlacement;
use canvasshell::camera::{CanvasPoint, PanZoomTransform};
use canvasshell::workspace::{BackgroundPreset, BackgroundStyle};
use canvasshell::{CanvasApp, CanvasIntent};
use tempfile::TempDir;

#[test]
fn workspace_survives_restart() {
    let dir = TempDir::new().unwrap();
    let (workspace, nodes) = {
        let mut app = CanvasApp::new_from_dir(dir.path().to_path_buf());
        app.apply_intents([
            CanvasIntent::AddText {
                text: "persist me".to_string(),
                placement: NodePlacement::ViewportCenter,
            },
            CanvasIntent::PanTo {
                transform: PanZoomTransform::new(10.0, -20.0, 2.0),
            },
            CanvasIntent::SetBackground {
                style: BackgroundStyle::preset(BackgroundPreset::Sunset),
            },
            CanvasIntent::RenameWorkspace {
                title: "Kept".to_string(),
            },
        ]);
        app.shutdown();
        (app.active_workspace().unwrap(), app.registry().snapshot())
    };

    let app = CanvasApp::new_from_dir(dir.path().to_path_buf());
    assert_eq!(app.active_workspace(), Some(workspace));
    assert_eq!(app.title(), "Kept");
    assert_eq!(app.transform(), PanZoomTransform::new(10.0, -20.0, 2.0));
    assert_eq!(app.background(), &BackgroundStyle::preset(BackgroundPreset::Sunset));
    assert_eq!(app.stack().len(), 3);
    for node in &nodes {
        assert_eq!(app.node(node.id), Some(node));
    }
}

#[test]
fn selected_workspace_is_reopened() {
    let dir = TempDir::new().unwrap();
    let second = {
        let mut app = CanvasApp::new_from_dir(dir.path().to_path_buf());
        let second = app.create_workspace(None);
        app.run_pending_now();
        app.shutdown();
        second
    };

    let app = CanvasApp::new_from_dir(dir.path().to_path_buf());
    assert_eq!(app.tabs().len(), 2);
    assert_eq!(app.active_workspace(), Some(second));
}

#[test]
fn removed_workspace_is_gone_after_restart() {
    let dir = TempDir::new().unwrap();
    let kept = {
        let mut app = CanvasApp::new_from_dir(dir.path().to_path_buf());
        let kept = app.active_workspace().unwrap();
        let doomed = app.create_workspace(None);
        app.run_pending_now();
        assert!(app.remove_workspace(doomed));
        app.run_pending_now();
        app.shutdown();
        kept
    };

    let app = CanvasApp::new_from_dir(dir.path().to_path_buf());
    assert_eq!(app.tabs(), &[kept]);
    assert_eq!(app.active_workspace(), Some(kept));
}

#[test]
fn node_added_mid_switch_survives_restart() {
    let dir = TempDir::new().unwrap();
    let (workspace, node) = {
        let mut app = CanvasApp::new_from_dir(dir.path().to_path_buf());
        let workspace = app.create_workspace(None);
        let node = app.add_text("before hydration", NodePlacement::ViewportCenter);
        app.run_pending_now();
        app.shutdown();
        (workspace, node)
    };

    let app = CanvasApp::new_from_dir(dir.path().to_path_buf());
    assert_eq!(app.active_workspace(), Some(workspace));
    assert!(app.node(node).is_some());
}

#[test]
fn inexact_coordinates_survive_restart() {
    let dir = TempDir::new().unwrap();
    let transform = PanZoomTransform::new(180.17933438838418, 0.1 + 0.2, 1.1000000000000003);
    let nodes = {
        let mut app = CanvasApp::new_from_dir(dir.path().to_path_buf());
        app.apply_intents([
            CanvasIntent::AddText {
                text: "drifty".to_string(),
                placement: NodePlacement::Canvas(CanvasPoint::new(180.17933438838418, -0.3)),
            },
            CanvasIntent::PanTo { transform },
        ]);
        app.shutdown();
        app.registry().snapshot()
    };

    let app = CanvasApp::new_from_dir(dir.path().to_path_buf());
    assert_eq!(app.transform(), transform);
    for node in &nodes {
        assert_eq!(app.node(node.id), Some(node));
    }
}
