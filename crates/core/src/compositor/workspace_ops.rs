//! Workspace lookup, create-on-demand, focus-with-history and the animated
//! switch between workspaces on an output.

use super::{AnimationTarget, Compositor};
use crate::animation::{Animation, AnimationStepResult, Vec2};
use crate::config::AnimateableEvent;
use crate::geometry::Rect;
use crate::output::OutputId;
use crate::workspace::{Workspace, WorkspaceId, WorkspaceKey, WorkspaceManager};
use tracing::{debug, error, warn};

impl Compositor {
    /// Find a workspace by number or name anywhere across the outputs.
    pub fn workspace_by_key(&self, key: &WorkspaceKey) -> Option<WorkspaceId> {
        self.workspaces
            .values()
            .find(|ws| ws.matches(key))
            .map(|ws| ws.id())
    }

    /// If the workspace exists, focus it (re-focusing bounces back to the
    /// previously selected workspace when `back_and_forth` is set). If it
    /// does not, create it on `output_hint` and focus it.
    pub fn request_workspace(
        &mut self,
        output_hint: Option<OutputId>,
        key: WorkspaceKey,
        back_and_forth: bool,
    ) -> bool {
        if let Some(existing) = self.workspace_by_key(&key) {
            return self.focus_existing_workspace(existing, back_and_forth);
        }

        let Some(output_id) = output_hint.or_else(|| self.state.focused_output()) else {
            warn!("request_workspace: no output to create the workspace on");
            return false;
        };
        let Some(id) = self.create_workspace(output_id, key) else {
            return false;
        };
        self.request_workspace_focus(id);
        true
    }

    /// Create a workspace on `output_id` without focusing it.
    pub(crate) fn create_workspace(
        &mut self,
        output_id: OutputId,
        key: WorkspaceKey,
    ) -> Option<WorkspaceId> {
        let Some(area) = self.output(output_id).map(|output| output.area()) else {
            warn!(%output_id, "create_workspace: unknown output");
            return None;
        };

        let id = self.workspace_manager.allocate_id();
        let (num, name) = match key {
            WorkspaceKey::Num(num) => (Some(num), None),
            WorkspaceKey::Name(name) => (None, Some(name)),
        };
        let workspace = Workspace::new(&mut self.tree, id, num, name, output_id, area);
        self.workspaces.insert(id, workspace);
        if let Some(output) = self.outputs.iter_mut().find(|o| o.id() == output_id) {
            output.insert_workspace_sorted(id, &self.workspaces);
        }
        self.workspace_manager.registrar.advise_created(id);
        Some(id)
    }

    /// Assign the lowest free number in `1..N`, falling back to 0, and focus
    /// the resulting workspace on `output`.
    pub fn request_first_available_workspace(&mut self, output: OutputId) -> Option<i32> {
        let num = WorkspaceManager::first_available_num(&self.workspaces)?;
        self.request_workspace(Some(output), WorkspaceKey::Num(num), true);
        Some(num)
    }

    fn focus_existing_workspace(&mut self, existing: WorkspaceId, back_and_forth: bool) -> bool {
        let active = self.active_workspace_id();
        if active == Some(existing) {
            let Some(last) = self.workspace_manager.last_selected else {
                return false;
            };
            if !back_and_forth {
                return false;
            }
            return self.request_workspace_focus(last);
        }
        self.request_workspace_focus(existing)
    }

    /// Focus the workspace with `id`: record the back-and-forth slot, run the
    /// output switch, then broadcast. The broadcast happens after the
    /// active-workspace field is updated.
    pub fn request_workspace_focus(&mut self, id: WorkspaceId) -> bool {
        let Some(output_id) = self.workspaces.get(&id).map(|ws| ws.output) else {
            warn!(%id, "request_workspace_focus: no such workspace");
            return false;
        };

        let prev = self.active_workspace_id();
        if prev != Some(id) {
            self.workspace_manager.last_selected = prev;
        }

        if !self.advise_workspace_active(output_id, id) {
            return false;
        }
        self.state.focus_output(output_id);
        self.workspace_manager.registrar.advise_focused(prev, id);
        self.select_first_window_on(id);
        true
    }

    /// Make `to` the active workspace of `output`, animating the slide when
    /// a workspace was already showing.
    pub(crate) fn advise_workspace_active(&mut self, output_id: OutputId, to: WorkspaceId) -> bool {
        let Some(output) = self.output(output_id) else {
            return false;
        };
        if output.active() == Some(to) {
            return true;
        }
        let Some(to_index) = output.workspaces.iter().position(|&ws| ws == to) else {
            error!(%to, %output_id, "advise_workspace_active: workspace not on output");
            return false;
        };
        let from = output.active();

        // The active pointer moves before anything is shown or broadcast.
        if let Some(output) = self.output_mut(output_id) {
            output.set_active(Some(to));
        }

        let Some(from_id) = from else {
            // First workspace on this output: snap straight to it.
            self.show_workspace(to);
            let (to_rect, _) = self.strip_rects(output_id, to_index, to_index);
            if let Some(output) = self.output_mut(output_id) {
                output.set_position(Vec2::new(-(to_rect.x as f32), -(to_rect.y as f32)));
            }
            self.workspace_transform_changed(output_id);
            return true;
        };

        // Pinned floating trees ride along to the new workspace.
        self.transfer_pinned(from_id, to);

        // Show everything so the slide can draw both sides.
        let all: Vec<WorkspaceId> = self
            .output(output_id)
            .map(|output| output.workspaces.clone())
            .unwrap_or_default();
        for ws in &all {
            self.show_workspace(*ws);
        }

        let from_index = all.iter().position(|&ws| ws == from_id).unwrap_or(0);
        let (to_src, from_src) = self.strip_rects(output_id, to_index, from_index);
        let Some(output) = self.output(output_id) else {
            return false;
        };
        let area = output.area();
        let real = Rect::new(
            output.position_offset.x as i32,
            output.position_offset.y as i32,
            area.width,
            area.height,
        );
        let src = Rect::new(-from_src.x, from_src.y, area.width, area.height);
        let dest = Rect::new(-to_src.x, to_src.y, area.width, area.height);
        let handle = output.animation_handle;

        let target = AnimationTarget::WorkspaceSwitch {
            output: output_id,
            to,
            from: Some(from_id),
        };

        if !self.config.animations_enabled() {
            let result = AnimationStepResult::completed(handle, dest);
            self.apply_workspace_switch_step(output_id, to, Some(from_id), &result);
            return true;
        }

        let definition = self
            .config
            .animation_definition(AnimateableEvent::WorkspaceSwitch);
        self.animator.append(
            Animation::new(handle, definition, src, dest, real),
            self.sink_for(target),
        );
        true
    }

    fn strip_rects(&self, output_id: OutputId, to_index: usize, from_index: usize) -> (Rect, Rect) {
        let Some(output) = self.output(output_id) else {
            return (Rect::default(), Rect::default());
        };
        (
            output.workspace_rectangle(to_index, &self.workspaces),
            output.workspace_rectangle(from_index, &self.workspaces),
        )
    }

    fn transfer_pinned(&mut self, from: WorkspaceId, to: WorkspaceId) {
        let pinned = match self.workspaces.get_mut(&from) {
            Some(workspace) => workspace.take_pinned(&self.tree),
            None => return,
        };
        if pinned.is_empty() {
            return;
        }
        for tree_root in pinned {
            self.tree.set_workspace_in_subtree(tree_root, Some(to));
            if let Some(target) = self.workspaces.get_mut(&to) {
                target.floating.push(tree_root);
            }
        }
    }

    /// One step of the output slide. On completion everything except the
    /// target workspace is hidden and an empty prior workspace is deleted.
    pub(crate) fn apply_workspace_switch_step(
        &mut self,
        output_id: OutputId,
        to: WorkspaceId,
        from: Option<WorkspaceId>,
        result: &AnimationStepResult,
    ) {
        if let Some(output) = self.output_mut(output_id) {
            if let Some(position) = result.position {
                output.set_position(position);
            }
            if let Some(transform) = result.transform {
                output.set_transform(transform);
            }
        } else {
            return;
        }

        if result.is_complete {
            let others: Vec<WorkspaceId> = self
                .output(output_id)
                .map(|output| {
                    output
                        .workspaces
                        .iter()
                        .copied()
                        .filter(|&ws| ws != to)
                        .collect()
                })
                .unwrap_or_default();
            for ws in others {
                self.hide_workspace(ws);
            }
            if let Some(prior) = from {
                let empty = self
                    .workspaces
                    .get(&prior)
                    .map(|ws| ws.is_empty(&self.tree))
                    .unwrap_or(false);
                if empty {
                    self.delete_workspace(prior);
                }
            }
            self.workspace_transform_changed(output_id);
        } else {
            self.workspace_transform_changed(output_id);
        }
    }

    /// Re-publish the output transform for every window on `output`, so the
    /// renderer picks the slide up on its next frame.
    pub(crate) fn workspace_transform_changed(&mut self, output_id: OutputId) {
        let Some(output) = self.output(output_id) else { return };
        let transform = output.transform();
        let workspace_ids = output.workspaces.clone();
        for ws in workspace_ids {
            let Some(workspace) = self.workspaces.get(&ws) else {
                continue;
            };
            for leaf in workspace.leaves(&self.tree) {
                if let Some(window) = self.tree.get(leaf).and_then(|node| node.window()) {
                    self.render.workspace_transform_change(window, transform);
                }
            }
        }
    }

    /// Focus the best window on `workspace`: the focused container if it is
    /// already there, then the remembered last focus, then the first leaf.
    pub(crate) fn select_first_window_on(&mut self, workspace: WorkspaceId) {
        if let Some(focused) = self.focused_container() {
            if self.tree.workspace_of(focused) == Some(workspace) {
                return;
            }
        }

        let Some(ws) = self.workspaces.get(&workspace) else { return };
        let last = ws
            .last_focused
            .filter(|&id| self.tree.contains(id) && ws.contains(&self.tree, id));
        let candidate = last.or_else(|| ws.leaves(&self.tree).into_iter().next());
        let window = candidate.and_then(|id| self.tree.get(id).and_then(|node| node.window()));
        self.select_active_window(window);
    }

    /// Remove a workspace entirely: detach from its output, destroy its
    /// trees and broadcast the removal.
    pub fn delete_workspace(&mut self, id: WorkspaceId) -> bool {
        let Some(workspace) = self.workspaces.remove(&id) else {
            return false;
        };
        debug!(%id, "deleting workspace");
        if let Some(output) = self.output_mut(workspace.output) {
            output.remove_workspace(id);
        }
        self.tree.destroy_subtree(workspace.root);
        for floating in &workspace.floating {
            self.tree.destroy_subtree(*floating);
        }
        self.state.prune(|entry| self.tree.contains(entry));
        if self.workspace_manager.last_selected == Some(id) {
            self.workspace_manager.last_selected = None;
        }
        self.workspace_manager.registrar.advise_removed(id);
        true
    }

    /// Detach `workspace` from its output and graft it onto `dest`,
    /// rewriting its output reference and hiding it. Empty workspaces are
    /// deleted instead of moved.
    pub fn move_workspace_to_output(&mut self, workspace: WorkspaceId, dest: OutputId) -> bool {
        let Some(src) = self.workspaces.get(&workspace).map(|ws| ws.output) else {
            return false;
        };
        if src == dest || self.output(dest).is_none() {
            return false;
        }

        if let Some(output) = self.output_mut(src) {
            output.remove_workspace(workspace);
        }

        let dest_area = self.output(dest).map(|output| output.area()).unwrap_or_default();
        if let Some(ws) = self.workspaces.get_mut(&workspace) {
            ws.output = dest;
        }
        if let Some(ws) = self.workspaces.get(&workspace) {
            ws.set_area(&mut self.tree, dest_area);
        }
        if let Some(output) = self.outputs.iter_mut().find(|output| output.id() == dest) {
            output.insert_workspace_sorted(workspace, &self.workspaces);
        }
        self.commit_workspace(workspace);
        self.hide_workspace(workspace);

        let empty = self
            .workspaces
            .get(&workspace)
            .map(|ws| ws.is_empty(&self.tree))
            .unwrap_or(true);
        if empty {
            self.delete_workspace(workspace);
        }

        // The source output needs something active again.
        if self.output(src).map(|o| o.active().is_none()).unwrap_or(false) {
            let replacement = self
                .output(src)
                .and_then(|output| output.workspaces.first().copied());
            match replacement {
                Some(next) => {
                    self.advise_workspace_active(src, next);
                }
                None => {
                    let _ = self.request_first_available_workspace(src);
                }
            }
        }
        true
    }

    pub(crate) fn commit_workspace(&mut self, workspace: WorkspaceId) {
        let Some(ws) = self.workspaces.get(&workspace) else { return };
        let roots: Vec<_> = std::iter::once(ws.root)
            .chain(ws.floating.iter().copied())
            .collect();
        for root in roots {
            self.commit_subtree(root);
        }
    }

    // ---- navigation --------------------------------------------------------

    /// Step to the next workspace in the global sorted list, wrapping.
    pub fn request_next_workspace(&mut self) -> bool {
        self.request_step_workspace(1)
    }

    /// Step to the previous workspace in the global sorted list, wrapping.
    pub fn request_prev_workspace(&mut self) -> bool {
        self.request_step_workspace(-1)
    }

    fn request_step_workspace(&mut self, step: i64) -> bool {
        let Some(active) = self.active_workspace_id() else {
            return false;
        };
        let sorted = WorkspaceManager::sorted(&self.workspaces);
        let Some(position) = sorted.iter().position(|&ws| ws == active) else {
            return false;
        };
        let len = sorted.len() as i64;
        let next = sorted[((position as i64 + step).rem_euclid(len)) as usize];
        if next == active {
            return false;
        }
        self.focus_existing_workspace(next, false)
    }

    /// Walk this output's workspace list with wraparound.
    pub fn request_next_on_output(&mut self, output: OutputId) -> bool {
        self.request_step_on_output(output, 1)
    }

    pub fn request_prev_on_output(&mut self, output: OutputId) -> bool {
        self.request_step_on_output(output, -1)
    }

    fn request_step_on_output(&mut self, output_id: OutputId, step: i64) -> bool {
        let Some(output) = self.output(output_id) else {
            return false;
        };
        let Some(active) = output.active() else {
            return false;
        };
        let list = output.workspaces.clone();
        let Some(position) = list.iter().position(|&ws| ws == active) else {
            return false;
        };
        let len = list.len() as i64;
        let next = list[((position as i64 + step).rem_euclid(len)) as usize];
        if next == active {
            return false;
        }
        self.focus_existing_workspace(next, false)
    }

    /// Focus the workspace selected before the current one.
    pub fn request_back_and_forth(&mut self) -> bool {
        match self.workspace_manager.last_selected {
            Some(last) => self.request_workspace_focus(last),
            None => false,
        }
    }
}
