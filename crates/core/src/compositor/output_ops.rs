//! Output hotplug handling, orphan re-homing, pointer intersection and
//! output-directed navigation.

use super::Compositor;
use crate::container::ContainerId;
use crate::geometry::{Direction, Rect};
use crate::output::{Output, OutputId};
use crate::workspace::WorkspaceId;
use tracing::{info, warn};

impl Compositor {
    /// A new physical output appeared. Adopts any workspaces orphaned by a
    /// defunct output, otherwise starts a fresh workspace.
    pub fn advise_output_create(&mut self, name: impl Into<String>, area: Rect) -> OutputId {
        let id = self.allocate_output_id();
        let mut output = Output::new(id, name, area);
        output.animation_handle = self.animator.register_animateable();
        let name = output.name().to_string();
        self.outputs.push(output);
        info!(%id, name, "output created");

        // Hotplug must not steal focus from wherever the pointer lives.
        let previously_focused = self
            .state
            .focused_output()
            .filter(|&existing| self.output(existing).map(|o| !o.defunct).unwrap_or(false));
        if previously_focused.is_none() {
            self.state.focus_output(id);
        }

        // Workspaces stranded on defunct outputs come home first.
        let defunct: Vec<OutputId> = self
            .outputs
            .iter()
            .filter(|output| output.defunct)
            .map(|output| output.id())
            .collect();
        for dead in defunct {
            let orphans: Vec<WorkspaceId> = self
                .output(dead)
                .map(|output| output.workspaces.clone())
                .unwrap_or_default();
            for workspace in orphans {
                self.adopt_workspace(workspace, id);
            }
            self.outputs.retain(|output| output.id() != dead);
            self.state.unfocus_output(dead);
        }

        let needs_workspace = self
            .output(id)
            .map(|output| output.workspaces.is_empty())
            .unwrap_or(false);
        if needs_workspace {
            // A fresh workspace, shown on the new output but not focused;
            // focus follows the pointer, not hotplug.
            if let Some(num) = crate::workspace::WorkspaceManager::first_available_num(&self.workspaces)
            {
                if let Some(workspace) =
                    self.create_workspace(id, crate::workspace::WorkspaceKey::Num(num))
                {
                    self.advise_workspace_active(id, workspace);
                }
            }
        } else if self.output(id).map(|o| o.active().is_none()).unwrap_or(false) {
            if let Some(first) = self
                .output(id)
                .and_then(|output| output.workspaces.first().copied())
            {
                self.advise_workspace_active(id, first);
            }
        }
        if let Some(previous) = previously_focused {
            self.state.focus_output(previous);
        }
        id
    }

    /// Reattach an orphaned workspace without the hide/delete dance of a
    /// user-driven move.
    fn adopt_workspace(&mut self, workspace: WorkspaceId, dest: OutputId) {
        if let Some(old) = self.workspaces.get(&workspace).map(|ws| ws.output) {
            if let Some(output) = self.output_mut(old) {
                output.remove_workspace(workspace);
            }
        }
        let area = self.output(dest).map(|output| output.area()).unwrap_or_default();
        if let Some(ws) = self.workspaces.get_mut(&workspace) {
            ws.output = dest;
        }
        if let Some(ws) = self.workspaces.get(&workspace) {
            ws.set_area(&mut self.tree, area);
        }
        if let Some(output) = self.outputs.iter_mut().find(|output| output.id() == dest) {
            output.insert_workspace_sorted(workspace, &self.workspaces);
        }
        self.commit_workspace(workspace);
    }

    /// The output's global-coordinate rectangle changed.
    pub fn advise_output_update(&mut self, id: OutputId, area: Rect) {
        let Some(output) = self.output_mut(id) else {
            warn!(%id, "advise_output_update: unknown output");
            return;
        };
        output.set_area(area);
        let workspaces = output.workspaces.clone();
        for workspace in workspaces {
            if let Some(ws) = self.workspaces.get(&workspace) {
                ws.set_area(&mut self.tree, area);
            }
            self.commit_workspace(workspace);
        }
    }

    /// A physical output disconnected. The last output is only marked
    /// defunct, holding its workspaces until a replacement appears;
    /// otherwise its workspaces move to the next output in the list.
    pub fn advise_output_delete(&mut self, id: OutputId) {
        let survivors: Vec<OutputId> = self
            .outputs
            .iter()
            .filter(|output| output.id() != id && !output.defunct)
            .map(|output| output.id())
            .collect();

        if survivors.is_empty() {
            if let Some(output) = self.output_mut(id) {
                info!(%id, "last output removed; retaining workspaces as orphans");
                output.defunct = true;
            }
            return;
        }

        let heir = survivors[0];
        let workspaces: Vec<WorkspaceId> = self
            .output(id)
            .map(|output| output.workspaces.clone())
            .unwrap_or_default();
        for workspace in workspaces {
            self.adopt_workspace(workspace, heir);
        }
        self.outputs.retain(|output| output.id() != id);
        if self.state.focused_output() == Some(id) {
            self.state.focus_output(heir);
        }
        if self.output(heir).map(|o| o.active().is_none()).unwrap_or(false) {
            if let Some(first) = self
                .output(heir)
                .and_then(|output| output.workspaces.first().copied())
            {
                self.advise_workspace_active(heir, first);
            }
        }
    }

    /// The output under the pointer.
    pub fn output_at(&self, x: i32, y: i32) -> Option<OutputId> {
        self.outputs
            .iter()
            .find(|output| !output.defunct && output.contains_point(x, y))
            .map(|output| output.id())
    }

    /// The container under `(x, y)` on the focused output: floating windows
    /// first (they stack above the grid), then tiled leaves by their tile.
    pub fn intersect(&self, x: i32, y: i32) -> Option<ContainerId> {
        let workspace = self.active_workspace_id()?;
        let ws = self.workspaces.get(&workspace)?;

        for floating in &ws.floating {
            for leaf in self.tree.leaves_under(*floating) {
                if self
                    .tree
                    .visible_area(leaf, &self.config)
                    .contains_point(x, y)
                {
                    return Some(leaf);
                }
            }
        }
        self.tree.leaf_at(ws.root, x, y)
    }

    /// Like [`Compositor::intersect`] but restricted to the tiling grid,
    /// optionally ignoring the container being dragged.
    pub fn intersect_leaf(&self, x: i32, y: i32, ignore: Option<ContainerId>) -> Option<ContainerId> {
        let workspace = self.active_workspace_id()?;
        let root = self.workspaces.get(&workspace)?.root;
        let mut found = None;
        for leaf in self.tree.leaves_under(root) {
            if Some(leaf) == ignore {
                continue;
            }
            if self.tree.get(leaf)?.effective_area().contains_point(x, y) {
                found = Some(leaf);
                break;
            }
        }
        found
    }

    // ---- output navigation -------------------------------------------------

    fn live_outputs(&self) -> Vec<OutputId> {
        self.outputs
            .iter()
            .filter(|output| !output.defunct)
            .map(|output| output.id())
            .collect()
    }

    /// The next output after the focused one, wrapping.
    pub fn next_output(&self) -> Option<OutputId> {
        self.step_output(1)
    }

    pub fn prev_output(&self) -> Option<OutputId> {
        self.step_output(-1)
    }

    fn step_output(&self, step: i64) -> Option<OutputId> {
        let live = self.live_outputs();
        if live.len() < 2 {
            return None;
        }
        let focused = self.state.focused_output()?;
        let position = live.iter().position(|&id| id == focused)? as i64;
        Some(live[(position + step).rem_euclid(live.len() as i64) as usize])
    }

    /// The nearest output whose area lies in `direction` from the focused
    /// one.
    pub fn output_in_direction(&self, direction: Direction) -> Option<OutputId> {
        let focused = self.focused_output()?;
        let origin = focused.area();
        let focused_id = focused.id();

        self.outputs
            .iter()
            .filter(|output| !output.defunct && output.id() != focused_id)
            .filter(|output| {
                let area = output.area();
                match direction {
                    Direction::Left => area.x + area.width <= origin.x,
                    Direction::Right => area.x >= origin.x + origin.width,
                    Direction::Up => area.y + area.height <= origin.y,
                    Direction::Down => area.y >= origin.y + origin.height,
                }
            })
            .min_by_key(|output| {
                let area = output.area();
                (area.x - origin.x).abs() as i64 + (area.y - origin.y).abs() as i64
            })
            .map(|output| output.id())
    }

    /// The first output whose name is in `names`.
    pub fn output_by_names(&self, names: &[String]) -> Option<OutputId> {
        self.outputs
            .iter()
            .filter(|output| !output.defunct)
            .find(|output| names.iter().any(|name| name == output.name()))
            .map(|output| output.id())
    }

    /// Focus `output` (its active workspace, really) and warp the cursor to
    /// its center.
    pub fn focus_output(&mut self, output_id: OutputId) -> bool {
        let Some(output) = self.output(output_id) else {
            return false;
        };
        let area = output.area();
        let Some(active) = output.active() else {
            return false;
        };
        self.state.focus_output(output_id);
        self.windows.move_cursor_to(
            area.x as f32 + area.width as f32 / 2.0,
            area.y as f32 + area.height as f32 / 2.0,
        );
        self.select_first_window_on(active);
        true
    }

    /// Move `container` onto the active workspace of `output`.
    pub fn move_container_to_output(&mut self, container: ContainerId, output_id: OutputId) -> bool {
        let Some(dest) = self.output(output_id).and_then(|output| output.active()) else {
            warn!(%output_id, "move_container_to_output: output has no active workspace");
            return false;
        };
        if self.tree.workspace_of(container) == Some(dest) {
            return false;
        }
        if !self.detach_container(container) {
            return false;
        }
        self.state.unfocus_container(container);
        self.graft_into_workspace(dest, container)
    }
}
