//! End-to-end compositor behavior against the stub window controller:
//! placement, focus, fullscreen/floating round-trips, scratchpad flow,
//! workspace switching and animation event application.

use super::*;
use crate::container::LayoutScheme;
use crate::geometry::{Direction, Point, Rect, Size};
use crate::state::WmMode;
use crate::test_support::{open_window, rig};
use crate::window::{WindowOp, WindowState};

#[test]
fn first_window_fills_the_output_and_takes_focus() {
    let (mut rig, _) = rig();
    let leaf = open_window(&mut rig.compositor, 1);

    assert_eq!(
        rig.compositor.tree.get(leaf).unwrap().logical_area,
        Rect::new(0, 0, 1280, 720)
    );
    assert_eq!(rig.compositor.focused_container(), Some(leaf));
    assert_eq!(rig.stub.active_window(), Some(crate::window::WindowHandle(1)));
    // With animations disabled the stub saw the final geometry directly.
    assert_eq!(rig.stub.position_of(crate::window::WindowHandle(1)), Some(Point::new(0, 0)));
    assert_eq!(
        rig.stub.size_of(crate::window::WindowHandle(1)),
        Some(Size::new(1280, 720))
    );
}

#[test]
fn second_window_splits_the_tile() {
    let (mut rig, _) = rig();
    let first = open_window(&mut rig.compositor, 1);
    let second = open_window(&mut rig.compositor, 2);

    assert_eq!(
        rig.compositor.tree.get(first).unwrap().logical_area,
        Rect::new(0, 0, 640, 720)
    );
    assert_eq!(
        rig.compositor.tree.get(second).unwrap().logical_area,
        Rect::new(640, 0, 640, 720)
    );
    assert_eq!(
        rig.stub.position_of(crate::window::WindowHandle(2)),
        Some(Point::new(640, 0))
    );
}

#[test]
fn windows_open_inside_the_focused_parent() {
    let (mut rig, _) = rig();
    let first = open_window(&mut rig.compositor, 1);
    let _second = open_window(&mut rig.compositor, 2);

    // Focus the first window, give it a vertical wrapper, then open a third:
    // it must join the first window's column.
    rig.compositor
        .select_active_window(Some(crate::window::WindowHandle(1)));
    rig.compositor
        .tree
        .handle_layout_scheme(first, LayoutScheme::Vertical);
    let third = open_window(&mut rig.compositor, 3);

    let column = rig.compositor.tree.parent_of(first).unwrap();
    assert_eq!(rig.compositor.tree.parent_of(third), Some(column));
    assert_eq!(
        rig.compositor.tree.get(third).unwrap().logical_area.height,
        360
    );
}

#[test]
fn closing_a_window_returns_space_and_refocuses() {
    let (mut rig, _) = rig();
    let first = open_window(&mut rig.compositor, 1);
    let _second = open_window(&mut rig.compositor, 2);

    rig.compositor
        .advise_delete_window(crate::window::WindowHandle(2));

    assert_eq!(
        rig.compositor.tree.get(first).unwrap().effective_area().width,
        1280
    );
    assert_eq!(rig.compositor.focused_container(), Some(first));
    // Focus order never holds dead ids after the removal settles.
    for &id in rig.compositor.state.focus_order() {
        assert!(rig.compositor.tree.contains(id));
    }
}

#[test]
fn shell_like_windows_bypass_tiling() {
    let (mut rig, _) = rig();
    let tiled = open_window(&mut rig.compositor, 1);
    let mut spec = crate::window::WindowSpec::new(
        crate::window::WindowHandle(2),
        Rect::new(0, 0, 1280, 32),
    );
    spec.attached_edges = Some(1);
    let allocation = rig.compositor.allocate_position(&mut spec, false);
    assert_eq!(allocation, Allocation::Shell);
    let shell = rig.compositor.confirm_window(&spec, allocation);

    assert!(rig.compositor.tree.get(shell).unwrap().is_shell());
    // The tiled window's tile is untouched.
    assert_eq!(
        rig.compositor.tree.get(tiled).unwrap().effective_area().width,
        1280
    );
}

#[test]
fn fullscreen_round_trip_restores_state_and_clip() {
    let (mut rig, _) = rig();
    let leaf = open_window(&mut rig.compositor, 1);
    let window = crate::window::WindowHandle(1);

    rig.stub.clear_ops();
    assert!(rig.compositor.toggle_fullscreen(leaf));
    assert!(rig.compositor.is_fullscreen(leaf));
    let ops = rig.stub.ops();
    assert!(ops.contains(&WindowOp::ChangeState(window, WindowState::Fullscreen)));
    assert!(ops.contains(&WindowOp::SetDepthLayer(
        window,
        crate::window::DepthLayer::AlwaysOnTop
    )));
    // Fullscreen renders unclipped.
    assert!(ops.contains(&WindowOp::Noclip(window)));

    rig.stub.clear_ops();
    assert!(rig.compositor.toggle_fullscreen(leaf));
    assert!(!rig.compositor.is_fullscreen(leaf));
    let ops = rig.stub.ops();
    assert!(ops.contains(&WindowOp::ChangeState(window, WindowState::Restored)));
    assert!(ops.contains(&WindowOp::SetDepthLayer(
        window,
        crate::window::DepthLayer::Application
    )));
    // The clip comes back with the tile geometry.
    assert!(ops
        .iter()
        .any(|op| matches!(op, WindowOp::Clip(w, _) if *w == window)));
}

#[test]
fn fullscreen_suppresses_layout_geometry() {
    let (mut rig, _) = rig();
    let first = open_window(&mut rig.compositor, 1);
    rig.compositor.toggle_fullscreen(first);
    rig.stub.clear_ops();

    // A second window re-splits tiles, but the fullscreen window must not
    // receive the new geometry while fullscreen.
    let _second = open_window(&mut rig.compositor, 2);
    let window = crate::window::WindowHandle(1);
    assert!(!rig
        .stub
        .ops()
        .iter()
        .any(|op| matches!(op, WindowOp::SetPosition(w, _) if *w == window)));
}

#[test]
fn floating_round_trip_lands_back_in_the_default_layout() {
    let (mut rig, _) = rig();
    let leaf = open_window(&mut rig.compositor, 1);
    let _other = open_window(&mut rig.compositor, 2);
    let workspace = rig.compositor.tree.workspace_of(leaf).unwrap();

    assert!(rig.compositor.toggle_floating(leaf));
    assert!(!rig.compositor.tree.get(leaf).unwrap().anchored);
    assert_eq!(rig.compositor.workspaces[&workspace].floating.len(), 1);

    assert!(rig.compositor.toggle_floating(leaf));
    assert!(rig.compositor.tree.get(leaf).unwrap().anchored);
    assert!(rig.compositor.workspaces[&workspace].floating.is_empty());
    let parent = rig.compositor.tree.parent_of(leaf).unwrap();
    assert_eq!(parent, rig.compositor.workspaces[&workspace].root);
    assert_eq!(
        rig.compositor
            .tree
            .get(parent)
            .unwrap()
            .as_parent()
            .unwrap()
            .scheme,
        rig.compositor.default_layout_scheme()
    );
}

#[test]
fn pinning_requires_a_floating_subtree() {
    let (mut rig, _) = rig();
    let leaf = open_window(&mut rig.compositor, 1);
    assert!(!rig.compositor.toggle_pinned(leaf));

    rig.compositor.toggle_floating(leaf);
    assert!(rig.compositor.toggle_pinned(leaf));
    let root = rig.compositor.tree.root_of(leaf);
    assert!(rig.compositor.tree.get(root).unwrap().pinned);
}

#[test]
fn pinned_floats_follow_workspace_switches() {
    let (mut rig, output) = rig();
    let leaf = open_window(&mut rig.compositor, 1);
    let _anchor = open_window(&mut rig.compositor, 2);
    rig.compositor.toggle_floating(leaf);
    rig.compositor.toggle_pinned(leaf);
    let first_ws = rig.compositor.tree.workspace_of(leaf).unwrap();

    rig.compositor.request_workspace(
        Some(output),
        crate::workspace::WorkspaceKey::Num(2),
        true,
    );
    let second_ws = rig.compositor.active_workspace_id().unwrap();
    assert_ne!(first_ws, second_ws);
    assert_eq!(rig.compositor.tree.workspace_of(leaf), Some(second_ws));
    assert!(rig.compositor.workspaces[&first_ws].floating.is_empty());
}

#[test]
fn workspace_switch_hides_the_prior_windows() {
    let (mut rig, output) = rig();
    open_window(&mut rig.compositor, 1);
    rig.compositor.request_workspace(
        Some(output),
        crate::workspace::WorkspaceKey::Num(2),
        true,
    );

    // Animations disabled: the switch completes synchronously and hides
    // workspace 1's window.
    assert_eq!(
        rig.stub.state_of(crate::window::WindowHandle(1)),
        Some(WindowState::Hidden)
    );

    // Switching back restores it.
    rig.compositor.request_workspace(
        Some(output),
        crate::workspace::WorkspaceKey::Num(1),
        true,
    );
    assert_eq!(
        rig.stub.state_of(crate::window::WindowHandle(1)),
        Some(WindowState::Restored)
    );
}

#[test]
fn workspace_switch_slides_the_output_offset() {
    let (mut rig, output) = rig();
    open_window(&mut rig.compositor, 1);
    rig.compositor.request_workspace(
        Some(output),
        crate::workspace::WorkspaceKey::Num(3),
        true,
    );

    // Workspace 3 sits at x = 2 * width on the virtual strip; the completed
    // switch parks the offset at its negative.
    let offset = rig.compositor.output(output).unwrap().position_offset;
    assert_eq!(offset.x, -(2.0 * 1280.0));
    assert_eq!(offset.y, 0.0);
}

#[test]
fn scratchpad_round_trip() {
    let (mut rig, _) = rig();
    let leaf = open_window(&mut rig.compositor, 1);
    let _other = open_window(&mut rig.compositor, 2);
    let window = crate::window::WindowHandle(1);

    assert!(rig.compositor.move_to_scratchpad(leaf));
    assert!(rig.compositor.scratchpad.contains(leaf));
    assert_eq!(
        rig.compositor.tree.get(leaf).unwrap().scratchpad_state,
        crate::container::ScratchpadState::Fresh
    );
    assert_eq!(rig.compositor.tree.workspace_of(leaf), None);
    assert_eq!(rig.stub.state_of(window), Some(WindowState::Hidden));

    assert!(rig.compositor.show_scratchpad());
    assert!(rig.compositor.scratchpad.is_showing(leaf));
    assert_eq!(
        rig.compositor.tree.get(leaf).unwrap().scratchpad_state,
        crate::container::ScratchpadState::Changed
    );
    assert_eq!(rig.stub.state_of(window), Some(WindowState::Restored));
    // Centered on the 1280x720 output: the stashed window kept its 640x720
    // tile, so it parks at ((1280-640)/2, 0).
    let position = rig.stub.position_of(window).unwrap();
    assert_eq!(position, Point::new(320, 0));

    // Showing again hides it.
    assert!(rig.compositor.show_scratchpad());
    assert!(!rig.compositor.scratchpad.is_showing(leaf));
    assert_eq!(rig.stub.state_of(window), Some(WindowState::Hidden));
}

#[test]
fn scratchpad_rejects_parents() {
    let (mut rig, _) = rig();
    let leaf = open_window(&mut rig.compositor, 1);
    let parent = rig.compositor.tree.parent_of(leaf).unwrap();
    assert!(!rig.compositor.move_to_scratchpad(parent));
}

#[test]
fn animation_steps_apply_position_and_clip() {
    let mut config = crate::config::Config::default();
    config.gaps.inner_x = 0;
    config.gaps.inner_y = 0;
    let (mut rig, _) = crate::test_support::rig_with_config(config);
    let leaf = open_window(&mut rig.compositor, 1);
    let window = crate::window::WindowHandle(1);

    // Opening queued a grow animation; its first frame arrived through the
    // channel already (appended synchronously).
    while let Ok(event) = rig.animation_rx.try_recv() {
        rig.compositor.apply_animation_event(event);
    }

    // Drive the animator manually by one timestep and apply.
    rig.compositor.animator.tick(crate::animation::TIMESTEP_SECONDS);
    let mut saw_transform = false;
    while let Ok(event) = rig.animation_rx.try_recv() {
        if event.result.transform.is_some() {
            saw_transform = true;
        }
        rig.compositor.apply_animation_event(event);
    }
    assert!(saw_transform);

    // Run the animation out; the final step applies exact geometry.
    for _ in 0..100 {
        rig.compositor.animator.tick(crate::animation::TIMESTEP_SECONDS);
    }
    while let Ok(event) = rig.animation_rx.try_recv() {
        rig.compositor.apply_animation_event(event);
    }
    assert!(!rig.compositor.animator.has_animations());
    assert_eq!(
        rig.compositor.tree.get(leaf).unwrap().transform,
        crate::geometry::Mat4::identity()
    );
    assert_eq!(rig.stub.position_of(window), Some(Point::new(0, 0)));
}

#[test]
fn cancelled_animation_events_are_ignored() {
    let (mut rig, _) = rig();
    let leaf = open_window(&mut rig.compositor, 1);
    rig.compositor
        .advise_delete_window(crate::window::WindowHandle(1));

    // A stale step for the dead container must be a no-op.
    let event = AnimationEvent {
        target: AnimationTarget::Container(leaf),
        result: crate::animation::AnimationStepResult::completed(7, Rect::new(5, 5, 10, 10)),
    };
    rig.compositor.apply_animation_event(event);
    assert!(rig.compositor.tree.get(leaf).is_none());
}

#[test]
fn directional_selection_crosses_the_workspace() {
    let (mut rig, _) = rig();
    let first = open_window(&mut rig.compositor, 1);
    let second = open_window(&mut rig.compositor, 2);

    assert_eq!(rig.compositor.focused_container(), Some(second));
    assert!(rig.compositor.select_in_direction(Direction::Left));
    assert_eq!(rig.compositor.focused_container(), Some(first));
    assert!(!rig.compositor.select_in_direction(Direction::Left));
}

#[test]
fn resize_mode_locks_pointer_focus() {
    let (mut rig, _) = rig();
    let first = open_window(&mut rig.compositor, 1);
    let _second = open_window(&mut rig.compositor, 2);
    rig.compositor
        .select_active_window(Some(crate::window::WindowHandle(1)));
    rig.compositor.state.mode = WmMode::Resizing { locked: first };

    // select_active_window is inert while resizing.
    rig.compositor
        .select_active_window(Some(crate::window::WindowHandle(2)));
    assert_eq!(rig.compositor.focused_container(), Some(first));
}

#[test]
fn output_removal_moves_workspaces_to_the_survivor() {
    let (mut rig, first) = rig();
    let second = rig
        .compositor
        .advise_output_create("HDMI-2", Rect::new(1280, 0, 1280, 720));
    open_window(&mut rig.compositor, 1);
    let workspace = rig.compositor.active_workspace_id().unwrap();
    assert_eq!(rig.compositor.workspaces[&workspace].output, first);

    rig.compositor.advise_output_delete(first);
    assert_eq!(rig.compositor.outputs.len(), 1);
    assert_eq!(rig.compositor.workspaces[&workspace].output, second);
    assert_eq!(rig.compositor.state.focused_output(), Some(second));
}

#[test]
fn last_output_removal_orphans_and_rehomes() {
    let (mut rig, first) = rig();
    open_window(&mut rig.compositor, 1);
    let workspace = rig.compositor.active_workspace_id().unwrap();

    rig.compositor.advise_output_delete(first);
    assert!(rig.compositor.output(first).unwrap().defunct);
    assert!(rig.compositor.workspaces.contains_key(&workspace));

    // A replacement output adopts the orphaned workspace.
    let replacement = rig
        .compositor
        .advise_output_create("DP-1", Rect::new(0, 0, 1920, 1080));
    assert!(rig.compositor.output(first).is_none());
    assert_eq!(rig.compositor.workspaces[&workspace].output, replacement);
    let root = rig.compositor.workspaces[&workspace].root;
    assert_eq!(
        rig.compositor.tree.get(root).unwrap().logical_area.width,
        1920
    );
}

#[test]
fn move_container_to_other_output() {
    let (mut rig, first) = rig();
    let second = rig
        .compositor
        .advise_output_create("HDMI-2", Rect::new(1280, 0, 1280, 720));
    let leaf = open_window(&mut rig.compositor, 1);
    let _other = open_window(&mut rig.compositor, 2);
    let src_ws = rig.compositor.tree.workspace_of(leaf).unwrap();
    assert_eq!(rig.compositor.workspaces[&src_ws].output, first);

    assert!(rig.compositor.move_container_to_output(leaf, second));
    let dest_ws = rig.compositor.tree.workspace_of(leaf).unwrap();
    assert_ne!(src_ws, dest_ws);
    assert_eq!(rig.compositor.workspaces[&dest_ws].output, second);
}

#[test]
fn every_container_belongs_to_exactly_one_workspace() {
    let (mut rig, output) = rig();
    open_window(&mut rig.compositor, 1);
    open_window(&mut rig.compositor, 2);
    rig.compositor.request_workspace(
        Some(output),
        crate::workspace::WorkspaceKey::Num(2),
        true,
    );
    open_window(&mut rig.compositor, 3);

    for id in rig.compositor.tree.ids() {
        let Some(workspace_id) = rig.compositor.tree.workspace_of(id) else {
            continue;
        };
        let owners = rig
            .compositor
            .workspaces
            .values()
            .filter(|ws| ws.contains(&rig.compositor.tree, id))
            .count();
        assert_eq!(owners, 1, "container {id} owned by {owners} workspaces");
        assert!(rig.compositor.workspaces.contains_key(&workspace_id));
    }
}
