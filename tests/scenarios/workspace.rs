/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use canvasshell::app::NodePlacement;
use canvasshell::camera::{PanZoomTransform, ScreenSize};
use canvasshell::{CanvasApp, CanvasEvent, CanvasIntent, NodeContent};

#[test]
fn new_workspace_is_seeded_with_welcome_and_example() {
    let app = CanvasApp::new_for_testing();
    let kinds: Vec<_> = app
        .stack()
        .ids()
        .iter()
        .filter_map(|id| app.node(*id))
        .map(|node| node.content.kind())
        .collect();
    assert_eq!(kinds, vec!["text", "webview"]);
}

#[test]
fn switching_away_and_back_restores_content() {
    let mut app = CanvasApp::new_for_testing();
    let first = app.active_workspace().unwrap();
    app.apply_intents([
        CanvasIntent::SetViewport {
            size: ScreenSize::new(1024.0, 768.0),
        },
        CanvasIntent::AddText {
            text: "remember me".to_string(),
            placement: NodePlacement::ViewportCenter,
        },
        CanvasIntent::PanTo {
            transform: PanZoomTransform::new(-200.0, 150.0, 1.25),
        },
    ]);
    let nodes = app.registry().snapshot();
    let transform = app.transform();

    app.apply_intents([CanvasIntent::CreateWorkspace]);
    app.run_pending_now();
    assert_ne!(app.active_workspace(), Some(first));
    assert_eq!(app.registry().len(), 2);

    app.apply_intents([CanvasIntent::SwitchWorkspace { id: first }]);
    app.run_pending_now();
    assert_eq!(app.active_workspace(), Some(first));
    assert_eq!(app.registry().snapshot(), nodes);
    assert_eq!(app.transform(), transform);
}

#[test]
fn switch_announces_before_content_arrives() {
    let mut app = CanvasApp::new_for_testing();
    let first = app.active_workspace().unwrap();
    app.apply_intents([CanvasIntent::CreateWorkspace]);
    app.run_pending_now();
    app.drain_events();

    app.apply_intents([CanvasIntent::SwitchWorkspace { id: first }]);
    assert!(app.is_hydrating());
    assert!(app.registry().is_empty());
    let events = app.drain_events();
    assert!(events.contains(&CanvasEvent::WorkspaceSwitched { id: first }));
    assert!(!events.iter().any(|e| matches!(e, CanvasEvent::NodeAdded { .. })));

    app.run_pending_now();
    assert!(!app.is_hydrating());
    assert_eq!(app.registry().len(), 2);
}

#[test]
fn export_then_import_creates_an_equal_copy() {
    let mut app = CanvasApp::new_for_testing();
    app.apply_intents([CanvasIntent::RenameWorkspace {
        title: "Field notes".to_string(),
    }]);
    let original = app.snapshot_workspace();
    let link = app.export_workspace().unwrap();
    assert!(link.starts_with("canvasshell://workspace?data="));

    app.apply_intents([CanvasIntent::ImportWorkspace { encoded: link }]);
    app.run_pending_now();
    let copy = app.snapshot_workspace();
    assert_ne!(copy.id, original.id);
    assert_eq!(copy.title, "Field notes");
    assert_eq!(copy.nodes, original.nodes);
    assert_eq!(app.tabs().len(), 2);
}

#[test]
fn bad_import_leaves_everything_alone() {
    let mut app = CanvasApp::new_for_testing();
    let before = app.snapshot_workspace();
    let tabs = app.tabs().to_vec();
    app.drain_events();

    app.apply_intents([CanvasIntent::ImportWorkspace {
        encoded: "canvasshell://workspace?data=bm90IGpzb24%3D".to_string(),
    }]);
    assert_eq!(app.tabs(), tabs.as_slice());
    assert_eq!(app.snapshot_workspace(), before);
    assert!(
        app.drain_events()
            .iter()
            .any(|e| matches!(e, CanvasEvent::ImportFailed { .. }))
    );
}

#[test]
fn new_window_request_opens_beside_anchor() {
    let mut app = CanvasApp::new_for_testing();
    let anchor = app.stack().ids()[0];
    let beside = app
        .add_node_beside(anchor, NodeContent::webview("example.org"))
        .unwrap();
    let anchor_node = app.node(anchor).unwrap();
    let new_node = app.node(beside).unwrap();
    assert!(new_node.position.x >= anchor_node.position.x + anchor_node.size.width);
    assert_eq!(app.stack().ids().last(), Some(&beside));
}
