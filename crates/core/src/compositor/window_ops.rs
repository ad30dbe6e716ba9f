//! Per-container operations: fullscreen, floating, pinning, resize, moves
//! and the selection family. These are the internals the command controller
//! guards and exposes.

use super::Compositor;
use crate::container::{ContainerId, ContainerKind, LayoutScheme};
use crate::geometry::{Direction, Point, Rect};
use crate::window::{DepthLayer, WindowState};
use crate::workspace::WorkspaceId;
use tracing::{error, warn};

/// How far a floating container moves per directional nudge.
const FLOATING_MOVE_STEP: i32 = 10;

impl Compositor {
    // ---- fullscreen --------------------------------------------------------

    /// Toggle fullscreen: entering records the pre-fullscreen clip and
    /// state, raises to the always-on-top layer and disables clipping;
    /// leaving restores both and reasserts the tile geometry.
    pub fn toggle_fullscreen(&mut self, id: ContainerId) -> bool {
        let Some(window) = self.tree.get(id).and_then(|node| node.window()) else {
            return false;
        };
        let anchored = self.tree.get(id).map(|node| node.anchored).unwrap_or(true);

        if self.is_fullscreen(id) {
            let tile = self.tree.get(id).map(|node| node.logical_area).unwrap_or_default();
            if let Some(leaf) = self.tree.get_mut(id).and_then(|node| node.as_leaf_mut()) {
                let restored = match leaf.pre_fullscreen.take() {
                    Some((_, state)) if state != WindowState::Fullscreen => state,
                    _ => WindowState::Restored,
                };
                leaf.next_state = Some(restored);
                leaf.next_depth_layer = Some(if anchored {
                    DepthLayer::Application
                } else {
                    DepthLayer::Above
                });
            }
            // Reassert the tile so the restored window lands back in place.
            self.tree.set_logical_area(id, tile);
        } else {
            let visible = self.tree.visible_area(id, &self.config);
            if let Some(leaf) = self.tree.get_mut(id).and_then(|node| node.as_leaf_mut()) {
                leaf.pre_fullscreen = Some((visible, leaf.state));
                leaf.next_state = Some(WindowState::Fullscreen);
                leaf.next_depth_layer = Some(DepthLayer::AlwaysOnTop);
            }
            self.select_active_window(Some(window));
            self.windows.raise(window);
        }

        self.commit_leaf(id);
        true
    }

    // ---- floating ----------------------------------------------------------

    /// Move a tiled leaf out into its own floating subtree, or fold a
    /// floating leaf back into the workspace's tiling root.
    pub fn toggle_floating(&mut self, id: ContainerId) -> bool {
        let Some(workspace_id) = self.tree.workspace_of(id) else {
            return false;
        };
        if !self.tree.get(id).map(|node| node.is_leaf()).unwrap_or(false) {
            warn!(%id, "toggle_floating: only leaves toggle");
            return false;
        }
        let window = self.tree.get(id).and_then(|node| node.window());
        let anchored = self.tree.get(id).map(|node| node.anchored).unwrap_or(true);

        if anchored {
            let area = self.tree.visible_area(id, &self.config);
            if !self.detach_container(id) {
                return false;
            }
            let Some(workspace) = self.workspaces.get_mut(&workspace_id) else {
                return false;
            };
            let floating = workspace.create_floating_tree(&mut self.tree, area);
            self.tree.graft(id, floating, None);
            if let Some(window) = window {
                self.windows.set_depth_layer(window, DepthLayer::Above);
            }
            self.commit_subtree(floating);
        } else {
            if !self.detach_container(id) {
                return false;
            }
            let Some(root) = self.workspaces.get(&workspace_id).map(|ws| ws.root) else {
                return false;
            };
            self.tree.graft(id, root, None);
            if let Some(window) = window {
                self.windows.set_depth_layer(window, DepthLayer::Application);
            }
            self.commit_subtree(root);
        }
        true
    }

    // ---- pinning -----------------------------------------------------------

    /// Pin or unpin the floating subtree holding `id`. Pinned subtrees ride
    /// along on workspace switches.
    pub fn set_pinned(&mut self, id: ContainerId, value: bool) -> bool {
        let root = self.tree.root_of(id);
        let floating = self
            .tree
            .get(root)
            .map(|node| !node.anchored)
            .unwrap_or(false);
        if !floating {
            warn!(%id, "set_pinned: only floating subtrees pin");
            return false;
        }
        if let Some(node) = self.tree.get_mut(root) {
            node.pinned = value;
        }
        true
    }

    pub fn toggle_pinned(&mut self, id: ContainerId) -> bool {
        let root = self.tree.root_of(id);
        let current = self.tree.get(root).map(|node| node.pinned).unwrap_or(false);
        self.set_pinned(id, !current)
    }

    // ---- geometry ----------------------------------------------------------

    /// Resize along `direction` by `pixels` and flush the geometry.
    pub fn resize_container(&mut self, id: ContainerId, direction: Direction, pixels: i32) -> bool {
        if !self.tree.resize(id, direction, pixels) {
            return false;
        }
        self.commit_subtree(self.tree.root_of(id));
        true
    }

    /// Set the focused container's visible size, expressed as two optional
    /// axes. Implemented as a pair of resizes against the current size.
    pub fn set_container_size(
        &mut self,
        id: ContainerId,
        width: Option<i32>,
        height: Option<i32>,
    ) -> bool {
        let visible = self.tree.visible_area(id, &self.config);
        let diff_x = width.map(|w| w - visible.width).unwrap_or(0);
        let diff_y = height.map(|h| h - visible.height).unwrap_or(0);

        if diff_x < 0 {
            self.resize_container(id, Direction::Left, -diff_x);
        } else if diff_x > 0 {
            self.resize_container(id, Direction::Right, diff_x);
        }
        if diff_y < 0 {
            self.resize_container(id, Direction::Up, -diff_y);
        } else if diff_y > 0 {
            self.resize_container(id, Direction::Down, diff_y);
        }
        true
    }

    // ---- movement ----------------------------------------------------------

    /// Directional move: tiled containers move through the tree, floating
    /// ones nudge by a fixed step.
    pub fn move_container(&mut self, id: ContainerId, direction: Direction) -> bool {
        let anchored = self.tree.get(id).map(|node| node.anchored).unwrap_or(true);
        if !anchored {
            let step = FLOATING_MOVE_STEP;
            let (dx, dy) = match direction {
                Direction::Left => (-step, 0),
                Direction::Right => (step, 0),
                Direction::Up => (0, -step),
                Direction::Down => (0, step),
            };
            return self.move_container_by(id, dx, dy);
        }

        let Some(workspace_id) = self.tree.workspace_of(id) else {
            return false;
        };
        let Some(root) = self.workspaces.get(&workspace_id).map(|ws| ws.root) else {
            return false;
        };
        let outcome = self.tree.move_in_tree(root, id, direction);
        if let Some(new_root) = outcome.new_root {
            if let Some(workspace) = self.workspaces.get_mut(&workspace_id) {
                workspace.root = new_root;
            }
        }
        if outcome.moved {
            let root = self
                .workspaces
                .get(&workspace_id)
                .map(|ws| ws.root)
                .unwrap_or(root);
            self.commit_subtree(root);
        }
        outcome.moved
    }

    /// Shift a floating subtree by a pixel delta.
    pub fn move_container_by(&mut self, id: ContainerId, dx: i32, dy: i32) -> bool {
        let root = self.tree.root_of(id);
        let Some(node) = self.tree.get(root) else {
            return false;
        };
        if node.anchored {
            return false;
        }
        let area = node.logical_area;
        let moved = Rect::new(area.x + dx, area.y + dy, area.width, area.height);
        self.tree.set_logical_area(root, moved);
        self.commit_subtree(root);
        true
    }

    /// Place a floating subtree at an absolute position.
    pub fn move_container_to_point(&mut self, id: ContainerId, x: i32, y: i32) -> bool {
        let root = self.tree.root_of(id);
        let Some(node) = self.tree.get(root) else {
            return false;
        };
        if node.anchored {
            return false;
        }
        let area = node.logical_area;
        self.move_container_by(id, x - area.x, y - area.y)
    }

    /// Move `id` onto `workspace`: delete from the source, unfocus, graft.
    pub fn move_container_to_workspace(&mut self, id: ContainerId, workspace: WorkspaceId) -> bool {
        if self.tree.workspace_of(id) == Some(workspace) {
            return false;
        }
        if !self.workspaces.contains_key(&workspace) {
            return false;
        }
        if !self.detach_container(id) {
            return false;
        }
        self.state.unfocus_container(id);
        self.graft_into_workspace(workspace, id)
    }

    /// Graft a detached container onto `workspace`: parents become floating
    /// subtrees, leaves tile into the root.
    pub(crate) fn graft_into_workspace(&mut self, workspace: WorkspaceId, id: ContainerId) -> bool {
        let Some(ws) = self.workspaces.get_mut(&workspace) else {
            return false;
        };
        let root = ws.root;
        match self.tree.get(id).map(|node| node.is_parent()) {
            Some(true) => {
                if let Some(node) = self.tree.get_mut(id) {
                    node.anchored = false;
                }
                ws.floating.push(id);
                self.tree.set_workspace_in_subtree(id, Some(workspace));
                self.commit_subtree(id);
            }
            Some(false) => {
                self.tree.graft(id, root, None);
                self.commit_subtree(root);
            }
            None => {
                error!(%id, "graft_into_workspace: container vanished");
                return false;
            }
        }
        true
    }

    // ---- selection ---------------------------------------------------------

    /// Focus the next leaf in `direction` from the focused container.
    pub fn select_in_direction(&mut self, direction: Direction) -> bool {
        let Some(focused) = self.focused_container() else {
            return false;
        };
        let Some(next) = self.tree.handle_select(focused, direction) else {
            warn!("select: no container in that direction");
            return false;
        };
        let Some(window) = self.tree.get(next).and_then(|node| node.window()) else {
            return false;
        };
        self.select_active_window(Some(window));
        true
    }

    /// Focus the parent of the focused container.
    pub fn select_parent(&mut self) -> bool {
        let Some(focused) = self.focused_container() else {
            return false;
        };
        let Some(parent) = self.tree.parent_of(focused) else {
            return false;
        };
        self.state.focus_container(parent);
        true
    }

    /// Focus the first child of the focused container.
    pub fn select_child(&mut self) -> bool {
        let Some(focused) = self.focused_container() else {
            return false;
        };
        let Some(child) = self.tree.children_of(focused).first().copied() else {
            return false;
        };
        match self.tree.get(child).and_then(|node| node.window()) {
            Some(window) => self.select_active_window(Some(window)),
            None => self.state.focus_container(child),
        }
        true
    }

    /// Focus the most recently used floating container.
    pub fn select_floating(&mut self) -> bool {
        self.select_first_by(|compositor, id| {
            compositor
                .tree
                .get(id)
                .map(|node| node.is_leaf() && !node.anchored)
                .unwrap_or(false)
        })
    }

    /// Focus the most recently used tiled container.
    pub fn select_tiling(&mut self) -> bool {
        self.select_first_by(|compositor, id| {
            compositor
                .tree
                .get(id)
                .map(|node| node.is_leaf() && node.anchored)
                .unwrap_or(false)
        })
    }

    fn select_first_by(&mut self, predicate: impl Fn(&Compositor, ContainerId) -> bool) -> bool {
        let candidate = self
            .state
            .focus_order()
            .iter()
            .copied()
            .find(|&id| predicate(self, id));
        let Some(id) = candidate else { return false };
        let Some(window) = self.tree.get(id).and_then(|node| node.window()) else {
            return false;
        };
        self.select_active_window(Some(window));
        true
    }

    /// Toggle the focused container's membership in the active selection
    /// group, creating the group (and entering selecting mode) on first use.
    pub fn select_toggle(&mut self) -> bool {
        let Some(focused) = self.focused_container() else {
            return false;
        };

        let group = match self.state.mode {
            crate::state::WmMode::Selecting { group } => group,
            crate::state::WmMode::Normal => {
                let group = self.tree.create_group();
                self.state.mode = crate::state::WmMode::Selecting { group };
                group
            }
            _ => return false,
        };

        if let Some(node) = self.tree.get_mut(group) {
            if let ContainerKind::Group(data) = &mut node.kind {
                if let Some(position) = data.members.iter().position(|&m| m == focused) {
                    data.members.remove(position);
                } else {
                    data.members.push(focused);
                }
                return true;
            }
        }
        false
    }

    // ---- cursor helpers ----------------------------------------------------

    pub fn advise_pointer_moved(&mut self, x: i32, y: i32) {
        self.state.cursor_position = Point::new(x, y);
        if let Some(output) = self.output_at(x, y) {
            if self.state.focused_output() != Some(output) && self.state.mode.is_normal() {
                self.state.focus_output(output);
            }
        }
    }

    /// The workspace-default layout a re-tiled leaf lands under.
    pub fn default_layout_scheme(&self) -> LayoutScheme {
        LayoutScheme::Horizontal
    }
}
