/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::HashSet;

use canvasshell::app::NodePlacement;
use canvasshell::camera::ScreenSize;
use canvasshell::{CanvasApp, CanvasIntent};
use proptest::prelude::*;

fn app_800x600() -> CanvasApp {
    let mut app = CanvasApp::new_for_testing();
    app.apply_intents([CanvasIntent::SetViewport {
        size: ScreenSize::new(800.0, 600.0),
    }]);
    app
}

#[test]
fn selecting_default_node_fits_it_in_viewport() {
    let mut app = app_800x600();
    let id = app.stack().ids()[1];
    app.apply_intents([CanvasIntent::SelectNode { id, center: true }]);

    assert!((app.transform().scale - 1.0625).abs() < 1e-9);
    assert_eq!(app.stack().head(), Some(id));
    assert_eq!(app.selected_node(), Some(id));
}

#[test]
fn removing_selected_node_clears_selection() {
    let mut app = app_800x600();
    let id = app.stack().ids()[0];
    app.apply_intents([
        CanvasIntent::SelectNode { id, center: false },
        CanvasIntent::RemoveNode { id },
    ]);
    assert_eq!(app.selected_node(), None);
    assert!(!app.stack().contains(id));
    assert_eq!(app.registry().len(), 1);
}

#[test]
fn cycling_wraps_around_the_stack() {
    let mut app = app_800x600();
    let order = app.stack().ids().to_vec();
    app.apply_intents([CanvasIntent::CycleNode { delta: -1 }]);
    assert_eq!(app.cycle_preview(), Some(order[order.len() - 1]));

    app.apply_intents([
        CanvasIntent::CycleNode { delta: 1 },
        CanvasIntent::CycleNode { delta: 1 },
    ]);
    assert_eq!(app.cycle_preview(), Some(order[1]));
    app.apply_intents([CanvasIntent::CommitCycle]);
    assert_eq!(app.stack().head(), Some(order[1]));
    assert_eq!(app.cycle_preview(), None);
}

#[derive(Debug, Clone)]
enum Op {
    Add,
    Remove(usize),
    Select(usize),
    Cycle(isize),
    Commit,
    Cancel,
    Background,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Add),
        (0usize..8).prop_map(Op::Remove),
        (0usize..8).prop_map(Op::Select),
        (-3isize..=3).prop_map(Op::Cycle),
        Just(Op::Commit),
        Just(Op::Cancel),
        Just(Op::Background),
    ]
}

proptest! {
    #[test]
    fn stack_and_selection_track_registry(ops in prop::collection::vec(op(), 1..40)) {
        let mut app = app_800x600();
        for op in ops {
            let ids = app.stack().ids().to_vec();
            let pick = |i: usize| ids.get(i % ids.len().max(1)).copied();
            let intent = match op {
                Op::Add => Some(CanvasIntent::AddText {
                    text: "n".to_string(),
                    placement: NodePlacement::ViewportCenter,
                }),
                Op::Remove(i) => pick(i).map(|id| CanvasIntent::RemoveNode { id }),
                Op::Select(i) => pick(i).map(|id| CanvasIntent::SelectNode { id, center: true }),
                Op::Cycle(delta) => Some(CanvasIntent::CycleNode { delta }),
                Op::Commit => Some(CanvasIntent::CommitCycle),
                Op::Cancel => Some(CanvasIntent::CancelCycle),
                Op::Background => Some(CanvasIntent::PointerDownOnBackground { modifier_held: false }),
            };
            app.apply_intents(intent);

            let stacked: HashSet<_> = app.stack().ids().iter().copied().collect();
            let registered: HashSet<_> = app.registry().ids().collect();
            prop_assert_eq!(stacked.len(), app.stack().len());
            prop_assert_eq!(&stacked, &registered);
            if let Some(selected) = app.selected_node() {
                prop_assert!(app.registry().contains(selected));
            }
            let z: HashSet<_> = app.stack().ids().iter().filter_map(|id| app.z_index(*id)).collect();
            prop_assert_eq!(z.len(), app.stack().len());
        }
    }
}
