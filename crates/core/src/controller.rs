//! The command controller: the single entry point for mutating operations.
//!
//! Every public method takes the one compositor lock, so keybinding
//! dispatch, IPC commands and display-server callbacks serialize against
//! each other. Methods return `bool` for UI-visible success; details go to
//! the log. Most operations are rejected outside normal mode; resizing is
//! additionally permitted in resize mode, against the locked container.

use crate::compositor::{AnimationEvent, Compositor, CompositorObserver};
use crate::container::{ContainerId, LayoutScheme};
use crate::geometry::Direction;
use crate::output::OutputId;
use crate::state::WmMode;
use crate::workspace::WorkspaceKey;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Ways of naming an output in a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSelector {
    Direction(Direction),
    Next,
    Prev,
    Primary,
    NonPrimary,
    Names(Vec<String>),
}

#[derive(Clone)]
pub struct CommandController {
    core: Arc<Mutex<Compositor>>,
    quit: Arc<AtomicBool>,
}

impl CommandController {
    pub fn new(compositor: Compositor) -> Self {
        CommandController {
            core: Arc::new(Mutex::new(compositor)),
            quit: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run `f` with the compositor lock held.
    pub fn with<R>(&self, f: impl FnOnce(&mut Compositor) -> R) -> R {
        let mut core = self.core.lock().unwrap();
        f(&mut core)
    }

    /// Register an observer for window/mode events.
    pub fn register_observer(&self, observer: Arc<dyn CompositorObserver>) {
        self.with(|core| core.observers.push(observer));
    }

    /// Drain animation step results onto the serialized path from a helper
    /// thread. Runs until the sending side closes.
    pub fn spawn_animation_pump(&self, rx: Receiver<AnimationEvent>) -> std::thread::JoinHandle<()> {
        let controller = self.clone();
        std::thread::spawn(move || {
            while let Ok(event) = rx.recv() {
                if controller.quit.load(Ordering::SeqCst) {
                    break;
                }
                controller.with(|core| core.apply_animation_event(event));
            }
        })
    }

    fn focused_leafish(core: &Compositor) -> Option<ContainerId> {
        core.focused_container()
    }

    fn guard_normal(core: &Compositor, what: &str) -> bool {
        if core.state.mode.is_normal() {
            return true;
        }
        debug!(mode = core.state.mode.name(), "{what}: rejected outside normal mode");
        false
    }

    fn guard_not_fullscreen(core: &Compositor, id: ContainerId, what: &str) -> bool {
        if core.is_fullscreen(id) {
            debug!("{what}: rejected on a fullscreen container");
            return false;
        }
        true
    }

    fn set_mode(core: &mut Compositor, mode: WmMode) {
        core.state.mode = mode;
        let name = core.state.mode.name();
        for observer in &core.observers {
            observer.on_mode_changed(name);
        }
    }

    // ---- layout ------------------------------------------------------------

    pub fn try_request_horizontal(&self) -> bool {
        self.request_scheme(LayoutScheme::Horizontal)
    }

    pub fn try_request_vertical(&self) -> bool {
        self.request_scheme(LayoutScheme::Vertical)
    }

    pub fn try_set_layout(&self, scheme: LayoutScheme) -> bool {
        self.request_scheme(scheme)
    }

    fn request_scheme(&self, scheme: LayoutScheme) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "layout") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            if !Self::guard_not_fullscreen(core, focused, "layout") {
                return false;
            }
            if core.tree.handle_layout_scheme(focused, scheme) {
                core.commit_subtree(core.tree.root_of(focused));
                true
            } else {
                false
            }
        })
    }

    /// Toggle the focused parent's scheme: horizontal <-> vertical, or the
    /// full four-way cycle when `cycle_all` is set.
    pub fn try_toggle_layout(&self, cycle_all: bool) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "toggle_layout") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            if !Self::guard_not_fullscreen(core, focused, "toggle_layout") {
                return false;
            }
            let Some(parent) = core.tree.parent_of(focused) else {
                return false;
            };
            let Some(current) = core.tree.get(parent).and_then(|node| node.as_parent()).map(|p| p.scheme)
            else {
                return false;
            };

            let next = if cycle_all {
                current.next()
            } else {
                match current {
                    LayoutScheme::Horizontal => LayoutScheme::Vertical,
                    LayoutScheme::Vertical => LayoutScheme::Horizontal,
                    LayoutScheme::Tabbing | LayoutScheme::Stacking => {
                        warn!("a stacked layout cannot be toggled; use layout commands");
                        return false;
                    }
                }
            };
            if core.tree.handle_layout_scheme(focused, next) {
                core.commit_subtree(core.tree.root_of(focused));
                true
            } else {
                false
            }
        })
    }

    pub fn try_toggle_tabbing(&self) -> bool {
        self.toggle_stacked_kind(LayoutScheme::Tabbing)
    }

    pub fn try_toggle_stacking(&self) -> bool {
        self.toggle_stacked_kind(LayoutScheme::Stacking)
    }

    fn toggle_stacked_kind(&self, scheme: LayoutScheme) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "toggle_stacked") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            let Some(parent) = core.tree.parent_of(focused) else {
                return false;
            };
            let current = core
                .tree
                .get(parent)
                .and_then(|node| node.as_parent())
                .map(|p| p.scheme);
            let next = if current == Some(scheme) {
                LayoutScheme::Horizontal
            } else {
                scheme
            };
            if core.tree.handle_layout_scheme(focused, next) {
                core.commit_subtree(core.tree.root_of(focused));
                true
            } else {
                false
            }
        })
    }

    // ---- geometry ----------------------------------------------------------

    /// Resize the focused container (or the resize-locked one).
    pub fn try_resize(&self, direction: Direction, pixels: i32) -> bool {
        self.with(|core| {
            let target = match core.state.mode {
                WmMode::Normal => Self::focused_leafish(core),
                WmMode::Resizing { locked } => Some(locked),
                _ => {
                    debug!("resize: rejected in this mode");
                    return false;
                }
            };
            let Some(target) = target else { return false };
            core.resize_container(target, direction, pixels)
        })
    }

    pub fn try_set_size(&self, width: Option<i32>, height: Option<i32>) -> bool {
        self.with(|core| {
            let target = match core.state.mode {
                WmMode::Normal => Self::focused_leafish(core),
                WmMode::Resizing { locked } => Some(locked),
                _ => return false,
            };
            let Some(target) = target else { return false };
            core.set_container_size(target, width, height)
        })
    }

    pub fn try_toggle_fullscreen(&self) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "toggle_fullscreen") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            core.toggle_fullscreen(focused)
        })
    }

    pub fn try_toggle_floating(&self) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "toggle_floating") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            if !Self::guard_not_fullscreen(core, focused, "toggle_floating") {
                return false;
            }
            core.toggle_floating(focused)
        })
    }

    pub fn try_toggle_pinned(&self) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "toggle_pinned") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            core.toggle_pinned(focused)
        })
    }

    pub fn try_set_pinned(&self, value: bool) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "set_pinned") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            core.set_pinned(focused, value)
        })
    }

    // ---- movement ----------------------------------------------------------

    pub fn try_move(&self, direction: Direction) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "move") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            if !Self::guard_not_fullscreen(core, focused, "move") {
                return false;
            }
            core.move_container(focused, direction)
        })
    }

    pub fn try_move_by(&self, direction: Direction, pixels: i32) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "move_by") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            let (dx, dy) = match direction {
                Direction::Left => (-pixels, 0),
                Direction::Right => (pixels, 0),
                Direction::Up => (0, -pixels),
                Direction::Down => (0, pixels),
            };
            core.move_container_by(focused, dx, dy)
        })
    }

    pub fn try_move_to(&self, x: i32, y: i32) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "move_to") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            core.move_container_to_point(focused, x, y)
        })
    }

    // ---- selection ---------------------------------------------------------

    pub fn try_select(&self, direction: Direction) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "select") {
                return false;
            }
            core.select_in_direction(direction)
        })
    }

    pub fn try_select_parent(&self) -> bool {
        self.with(|core| Self::guard_normal(core, "select_parent") && core.select_parent())
    }

    pub fn try_select_child(&self) -> bool {
        self.with(|core| Self::guard_normal(core, "select_child") && core.select_child())
    }

    pub fn try_select_floating(&self) -> bool {
        self.with(|core| Self::guard_normal(core, "select_floating") && core.select_floating())
    }

    pub fn try_select_tiling(&self) -> bool {
        self.with(|core| Self::guard_normal(core, "select_tiling") && core.select_tiling())
    }

    pub fn try_select_toggle(&self) -> bool {
        self.with(|core| core.select_toggle())
    }

    // ---- workspaces --------------------------------------------------------

    pub fn select_workspace(&self, key: WorkspaceKey, back_and_forth: bool) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "select_workspace") {
                return false;
            }
            let hint = core.state.focused_output();
            core.request_workspace(hint, key, back_and_forth)
        })
    }

    pub fn next_workspace(&self) -> bool {
        self.with(|core| Self::guard_normal(core, "next_workspace") && core.request_next_workspace())
    }

    pub fn prev_workspace(&self) -> bool {
        self.with(|core| Self::guard_normal(core, "prev_workspace") && core.request_prev_workspace())
    }

    pub fn back_and_forth_workspace(&self) -> bool {
        self.with(|core| {
            Self::guard_normal(core, "back_and_forth") && core.request_back_and_forth()
        })
    }

    pub fn next_workspace_on_output(&self) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "next_workspace_on_output") {
                return false;
            }
            let Some(output) = core.state.focused_output() else {
                return false;
            };
            core.request_next_on_output(output)
        })
    }

    pub fn prev_workspace_on_output(&self) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "prev_workspace_on_output") {
                return false;
            }
            let Some(output) = core.state.focused_output() else {
                return false;
            };
            core.request_prev_on_output(output)
        })
    }

    /// Move the focused container to the named workspace and follow it.
    pub fn move_active_to_workspace(&self, key: WorkspaceKey, back_and_forth: bool) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "move_active_to_workspace") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };

            if !core.detach_container(focused) {
                return false;
            }
            core.state.unfocus_container(focused);
            let hint = core.state.focused_output();
            if !core.request_workspace(hint, key, back_and_forth) {
                // The request can legitimately decline (same workspace, no
                // back-and-forth slot); the container still needs a home.
            }
            let Some(dest) = core.active_workspace_id() else {
                return false;
            };
            let grafted = core.graft_into_workspace(dest, focused);
            if grafted {
                if let Some(window) = core.tree.get(focused).and_then(|node| node.window()) {
                    core.select_active_window(Some(window));
                }
            }
            grafted
        })
    }

    pub fn move_active_to_next_workspace(&self) -> bool {
        self.move_active_step(1)
    }

    pub fn move_active_to_prev_workspace(&self) -> bool {
        self.move_active_step(-1)
    }

    fn move_active_step(&self, step: i64) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "move_active_step") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            let Some(active) = core.active_workspace_id() else {
                return false;
            };
            let sorted = crate::workspace::WorkspaceManager::sorted(&core.workspaces);
            let Some(position) = sorted.iter().position(|&ws| ws == active) else {
                return false;
            };
            let len = sorted.len() as i64;
            let dest = sorted[((position as i64 + step).rem_euclid(len)) as usize];
            if dest == active {
                return false;
            }
            core.move_container_to_workspace(focused, dest)
        })
    }

    pub fn move_active_to_back_and_forth(&self) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "move_active_to_back_and_forth") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            let Some(last) = core.workspace_manager.last_selected else {
                return false;
            };
            core.move_container_to_workspace(focused, last)
        })
    }

    // ---- scratchpad --------------------------------------------------------

    pub fn move_to_scratchpad(&self) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "move_to_scratchpad") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            core.move_to_scratchpad(focused)
        })
    }

    pub fn show_scratchpad(&self) -> bool {
        self.with(|core| Self::guard_normal(core, "show_scratchpad") && core.show_scratchpad())
    }

    // ---- outputs -----------------------------------------------------------

    fn resolve_output(core: &Compositor, selector: &OutputSelector) -> Option<OutputId> {
        match selector {
            OutputSelector::Direction(direction) => core.output_in_direction(*direction),
            OutputSelector::Next => core.next_output(),
            OutputSelector::Prev => core.prev_output(),
            OutputSelector::Primary => core.outputs.first().map(|output| output.id()),
            OutputSelector::NonPrimary => {
                let primary = core.outputs.first().map(|output| output.id());
                core.outputs
                    .iter()
                    .map(|output| output.id())
                    .find(|&id| Some(id) != primary)
            }
            OutputSelector::Names(names) => core.output_by_names(names),
        }
    }

    pub fn try_select_output(&self, selector: OutputSelector) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "select_output") {
                return false;
            }
            let Some(output) = Self::resolve_output(core, &selector) else {
                return false;
            };
            core.focus_output(output)
        })
    }

    pub fn try_move_active_to_output(&self, selector: OutputSelector) -> bool {
        self.with(|core| {
            if !Self::guard_normal(core, "move_active_to_output") {
                return false;
            }
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            let Some(output) = Self::resolve_output(core, &selector) else {
                return false;
            };
            core.move_container_to_output(focused, output)
        })
    }

    // ---- mode --------------------------------------------------------------

    /// Enter or leave resize mode. Entry requires a focused leaf; exit is
    /// forced when the focused container is not one.
    pub fn try_toggle_resize_mode(&self) {
        self.with(|core| {
            match core.state.mode {
                WmMode::Resizing { .. } => Self::set_mode(core, WmMode::Normal),
                WmMode::Normal => {
                    let leaf = core.focused_container().filter(|&id| {
                        core.tree.get(id).map(|node| node.is_leaf()).unwrap_or(false)
                    });
                    match leaf {
                        Some(locked) => Self::set_mode(core, WmMode::Resizing { locked }),
                        None => Self::set_mode(core, WmMode::Normal),
                    }
                }
                _ => {}
            }
        })
    }

    /// Leave selecting mode, discarding the selection group.
    pub fn try_clear_selection(&self) {
        self.with(|core| {
            if let WmMode::Selecting { group } = core.state.mode {
                core.tree.destroy(group);
                Self::set_mode(core, WmMode::Normal);
            }
        })
    }

    // ---- lifecycle ---------------------------------------------------------

    pub fn try_close_window(&self) -> bool {
        self.with(|core| {
            let Some(focused) = Self::focused_leafish(core) else {
                return false;
            };
            let Some(window) = core.tree.get(focused).and_then(|node| node.window()) else {
                return false;
            };
            core.windows.request_close(window);
            true
        })
    }

    /// Request an orderly shutdown. The embedder polls
    /// [`CommandController::is_quit_requested`].
    pub fn quit(&self) -> bool {
        info!("quit requested");
        self.quit.store(true, Ordering::SeqCst);
        self.with(|core| core.shutdown());
        true
    }

    pub fn is_quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    /// Re-apply the current configuration: every workspace recomputes its
    /// tree from the output area and commits. The embedder swaps the config
    /// in through [`CommandController::set_config`] first when it changed.
    pub fn reload_config(&self) -> bool {
        self.with(|core| {
            let outputs: Vec<(OutputId, crate::geometry::Rect)> = core
                .outputs
                .iter()
                .map(|output| (output.id(), output.area()))
                .collect();
            for (id, area) in outputs {
                core.advise_output_update(id, area);
            }
            true
        })
    }

    pub fn set_config(&self, config: crate::config::Config) {
        self.with(|core| core.config = config);
        self.reload_config();
    }

    /// Set the inner gap (both axes) and re-apply layout. Used by the IPC
    /// `gaps` command.
    pub fn set_inner_gaps(&self, pixels: i32) -> bool {
        self.with(|core| {
            core.config.gaps.inner_x = pixels;
            core.config.gaps.inner_y = pixels;
        });
        self.reload_config()
    }

    /// The focused output's span along `direction`'s axis, for `ppt`
    /// distance arguments.
    pub fn focused_output_axis(&self, direction: Direction) -> Option<i32> {
        self.with(|core| {
            core.focused_output().map(|output| {
                if direction.is_vertical() {
                    output.area().height
                } else {
                    output.area().width
                }
            })
        })
    }

    // ---- reporting ---------------------------------------------------------

    /// i3 `get_tree` reply: root, outputs, workspaces, containers.
    pub fn tree_json(&self) -> serde_json::Value {
        self.with(|core| crate::ipc::reply::tree_json(core))
    }

    /// i3 `get_workspaces` reply.
    pub fn workspaces_json(&self) -> serde_json::Value {
        self.with(|core| crate::ipc::reply::workspaces_json(core))
    }

    /// i3 `get_outputs` reply.
    pub fn outputs_json(&self) -> serde_json::Value {
        self.with(|core| crate::ipc::reply::outputs_json(core))
    }

    /// i3 `get_binding_state` reply.
    pub fn binding_state_json(&self) -> serde_json::Value {
        self.with(|core| serde_json::json!({ "name": core.state.mode.name() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{open_window, rig};
    use crate::window::WindowHandle;

    fn controller() -> CommandController {
        let (mut test_rig, _) = rig();
        open_window(&mut test_rig.compositor, 1);
        open_window(&mut test_rig.compositor, 2);
        CommandController::new(test_rig.compositor)
    }

    #[test]
    fn move_round_trip_restores_order() {
        let controller = controller();
        controller.with(|core| core.select_active_window(Some(WindowHandle(1))));

        let order_before = controller.with(|core| {
            let root = core.workspaces.values().next().unwrap().root;
            core.tree.children_of(root)
        });
        assert!(controller.try_move(Direction::Right));
        assert!(controller.try_move(Direction::Left));
        let order_after = controller.with(|core| {
            let root = core.workspaces.values().next().unwrap().root;
            core.tree.children_of(root)
        });
        assert_eq!(order_before, order_after);
    }

    #[test]
    fn resize_mode_gates_other_operations() {
        let controller = controller();
        controller.with(|core| core.select_active_window(Some(WindowHandle(1))));
        controller.try_toggle_resize_mode();
        assert_eq!(controller.binding_state_json()["name"], "resize");

        // Movement and layout changes are rejected while resizing.
        assert!(!controller.try_move(Direction::Right));
        assert!(!controller.try_toggle_layout(false));
        assert!(!controller.select_workspace(WorkspaceKey::Num(2), true));

        // Resizing the locked container still works.
        assert!(controller.try_resize(Direction::Right, 50));

        controller.try_toggle_resize_mode();
        assert_eq!(controller.binding_state_json()["name"], "default");
        assert!(controller.try_move(Direction::Right));
    }

    #[test]
    fn fullscreen_blocks_movement_and_layout_but_not_close() {
        let controller = controller();
        controller.with(|core| core.select_active_window(Some(WindowHandle(1))));
        assert!(controller.try_toggle_fullscreen());

        assert!(!controller.try_move(Direction::Right));
        assert!(!controller.try_request_vertical());
        assert!(!controller.try_toggle_floating());
        assert!(controller.try_close_window());

        assert!(controller.try_toggle_fullscreen());
        assert!(controller.try_move(Direction::Right));
    }

    #[test]
    fn toggle_floating_round_trip_keeps_the_workspace_default_layout() {
        let controller = controller();
        controller.with(|core| core.select_active_window(Some(WindowHandle(1))));

        assert!(controller.try_toggle_floating());
        assert!(controller.try_toggle_floating());
        controller.with(|core| {
            let id = core.tree.container_for_window(WindowHandle(1)).unwrap();
            assert!(core.tree.get(id).unwrap().anchored);
            let parent = core.tree.parent_of(id).unwrap();
            assert_eq!(
                core.tree.get(parent).unwrap().as_parent().unwrap().scheme,
                core.default_layout_scheme()
            );
        });
    }

    #[test]
    fn set_size_resizes_both_axes() {
        let controller = controller();
        controller.with(|core| core.select_active_window(Some(WindowHandle(1))));
        assert!(controller.try_set_size(Some(700), None));
        controller.with(|core| {
            let id = core.tree.container_for_window(WindowHandle(1)).unwrap();
            assert_eq!(core.tree.visible_area(id, &core.config).width, 700);
        });
    }

    #[test]
    fn quit_sets_the_flag() {
        let controller = controller();
        assert!(!controller.is_quit_requested());
        controller.quit();
        assert!(controller.is_quit_requested());
    }

    #[test]
    fn select_parent_then_child_returns_to_a_leaf() {
        let controller = controller();
        controller.with(|core| core.select_active_window(Some(WindowHandle(1))));
        assert!(controller.try_select_parent());
        controller.with(|core| {
            let focused = core.focused_container().unwrap();
            assert!(core.tree.get(focused).unwrap().is_parent());
        });
        assert!(controller.try_select_child());
        controller.with(|core| {
            let focused = core.focused_container().unwrap();
            assert!(core.tree.get(focused).unwrap().is_leaf());
        });
    }
}
