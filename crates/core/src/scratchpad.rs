//! The scratchpad: a hidden holding area for windows, toggled onto the
//! focused output.

use crate::compositor::Compositor;
use crate::container::{ContainerId, ScratchpadState};
use crate::geometry::Point;
use crate::window::{DepthLayer, WindowState};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScratchpadItem {
    container: ContainerId,
    is_showing: bool,
}

/// Unordered collection of scratchpadded containers.
#[derive(Debug, Default)]
pub struct Scratchpad {
    items: Vec<ScratchpadItem>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Scratchpad::default()
    }

    pub fn contains(&self, container: ContainerId) -> bool {
        self.items.iter().any(|item| item.container == container)
    }

    pub fn is_showing(&self, container: ContainerId) -> bool {
        self.items
            .iter()
            .find(|item| item.container == container)
            .map(|item| item.is_showing)
            .unwrap_or(false)
    }

    pub fn remove(&mut self, container: ContainerId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.container != container);
        self.items.len() != before
    }

    pub fn containers(&self) -> Vec<ContainerId> {
        self.items.iter().map(|item| item.container).collect()
    }

    fn push(&mut self, container: ContainerId) {
        self.items.push(ScratchpadItem {
            container,
            is_showing: false,
        });
    }

    fn set_showing(&mut self, container: ContainerId, showing: bool) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.container == container)
        {
            item.is_showing = showing;
        }
    }
}

impl Compositor {
    /// Move a leaf into the scratchpad: convert tiled leaves to floating
    /// first, mark the state `fresh`, detach from the workspace and hide.
    pub fn move_to_scratchpad(&mut self, id: ContainerId) -> bool {
        let is_leaf = self.tree.get(id).map(|node| node.is_leaf()).unwrap_or(false);
        if !is_leaf {
            warn!(%id, "move_to_scratchpad: only leaf-like containers are accepted");
            return false;
        }
        if self.scratchpad.contains(id) {
            return false;
        }

        // Tiled leaves leave the grid before being stashed.
        if self.tree.get(id).map(|node| node.anchored).unwrap_or(false) {
            if !self.toggle_floating(id) {
                return false;
            }
        }

        if !self.detach_container(id) {
            return false;
        }
        self.tree.set_workspace_in_subtree(id, None);
        if let Some(node) = self.tree.get_mut(id) {
            node.scratchpad_state = ScratchpadState::Fresh;
            node.anchored = false;
        }
        self.state.unfocus_container(id);
        self.hide_scratchpad_item(id);
        self.scratchpad.push(id);
        true
    }

    /// Show or hide one scratchpad member. Showing centers it on the focused
    /// output and raises it to the `above` layer.
    pub fn toggle_scratchpad_show(&mut self, id: ContainerId) -> bool {
        if !self.scratchpad.contains(id) {
            return false;
        }
        let showing = self.scratchpad.is_showing(id);
        if let Some(node) = self.tree.get_mut(id) {
            node.scratchpad_state = ScratchpadState::Changed;
        }

        if showing {
            self.hide_scratchpad_item(id);
            self.scratchpad.set_showing(id, false);
        } else {
            let Some(window) = self.tree.get(id).and_then(|node| node.window()) else {
                return false;
            };
            let Some(output_area) = self.focused_output().map(|output| output.area()) else {
                warn!("toggle_scratchpad_show: no focused output to show on");
                return false;
            };

            let size = self
                .tree
                .get(id)
                .map(|node| node.logical_area.size())
                .unwrap_or_default();
            let centered = Point::new(
                output_area.x + (output_area.width - size.width) / 2,
                output_area.y + (output_area.height - size.height) / 2,
            );
            if let Some(node) = self.tree.get_mut(id) {
                node.logical_area.x = centered.x;
                node.logical_area.y = centered.y;
            }
            if let Some(leaf) = self.tree.get_mut(id).and_then(|node| node.as_leaf_mut()) {
                let restored = leaf.before_shown_state.take().unwrap_or(WindowState::Restored);
                leaf.next_state = Some(restored);
            }
            self.commit_leaf(id);
            self.windows.set_position(window, centered);
            self.windows.set_depth_layer(window, DepthLayer::Above);
            self.windows.noclip(window);
            self.windows.raise(window);
            self.scratchpad.set_showing(id, true);
        }
        true
    }

    /// Toggle every member at once.
    pub fn toggle_scratchpad_show_all(&mut self) -> bool {
        let members = self.scratchpad.containers();
        if members.is_empty() {
            return false;
        }
        for member in members {
            self.toggle_scratchpad_show(member);
        }
        true
    }

    /// Show the next hidden member, or cycle the showing one away. This is
    /// what `scratchpad show` does on the command surface.
    pub fn show_scratchpad(&mut self) -> bool {
        let members = self.scratchpad.containers();
        if members.is_empty() {
            return false;
        }
        if let Some(&showing) = members
            .iter()
            .find(|&&member| self.scratchpad.is_showing(member))
        {
            return self.toggle_scratchpad_show(showing);
        }
        let first = members[0];
        self.toggle_scratchpad_show(first)
    }

    fn hide_scratchpad_item(&mut self, id: ContainerId) {
        let Some(window) = self.tree.get(id).and_then(|node| node.window()) else {
            return;
        };
        if let Some(leaf) = self.tree.get_mut(id).and_then(|node| node.as_leaf_mut()) {
            if leaf.state != WindowState::Hidden {
                leaf.before_shown_state = Some(leaf.state);
            }
            leaf.next_state = Some(WindowState::Hidden);
        }
        self.commit_leaf(id);
        self.windows.send_to_back(window);
    }
}
