//! Outputs: physical displays holding an ordered list of workspaces.
//!
//! During a workspace switch the output's `position_offset` is animated
//! across a virtual strip in which workspace `n` sits at
//! `x = (n - 1) * width`; named workspaces line up after the numbered
//! range in creation order.

use crate::animation::{AnimationHandle, Vec2, NONE_ANIMATION_HANDLE};
use crate::config::NUM_DEFAULT_WORKSPACES;
use crate::geometry::{Mat4, Rect};
use crate::workspace::{Workspace, WorkspaceId, WorkspaceManager};
use std::collections::HashMap;

/// Stable identifier of an output. Never reused across hotplug cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u32);

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

#[derive(Debug)]
pub struct Output {
    id: OutputId,
    name: String,
    area: Rect,
    /// Workspaces on this output, numbered first, named after.
    pub workspaces: Vec<WorkspaceId>,
    active: Option<WorkspaceId>,
    /// Animated offset applied while sliding between workspaces.
    pub position_offset: Vec2,
    transform: Mat4,
    final_transform: Mat4,
    /// Set when the physical output disconnects but its workspaces are
    /// still waiting to be re-homed.
    pub defunct: bool,
    pub animation_handle: AnimationHandle,
}

impl Output {
    pub fn new(id: OutputId, name: impl Into<String>, area: Rect) -> Self {
        Output {
            id,
            name: name.into(),
            area,
            workspaces: Vec::new(),
            active: None,
            position_offset: Vec2::default(),
            transform: Mat4::identity(),
            final_transform: Mat4::identity(),
            defunct: false,
            animation_handle: NONE_ANIMATION_HANDLE,
        }
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
    }

    pub fn active(&self) -> Option<WorkspaceId> {
        self.active
    }

    pub fn set_active(&mut self, workspace: Option<WorkspaceId>) {
        self.active = workspace;
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.area.contains_point(x, y)
    }

    /// Insert `id` keeping the list sorted: numbered ascending, then named
    /// in creation order.
    pub fn insert_workspace_sorted(
        &mut self,
        id: WorkspaceId,
        workspaces: &HashMap<WorkspaceId, Workspace>,
    ) {
        let Some(new_workspace) = workspaces.get(&id) else {
            self.workspaces.push(id);
            return;
        };
        let at = self
            .workspaces
            .iter()
            .position(|existing| {
                workspaces
                    .get(existing)
                    .map(|ws| WorkspaceManager::ordering(new_workspace, ws).is_lt())
                    .unwrap_or(false)
            })
            .unwrap_or(self.workspaces.len());
        self.workspaces.insert(at, id);
    }

    pub fn remove_workspace(&mut self, id: WorkspaceId) {
        self.workspaces.retain(|&ws| ws != id);
        if self.active == Some(id) {
            self.active = None;
        }
    }

    /// Where workspace `index` sits on the virtual strip used by the switch
    /// animation.
    pub fn workspace_rectangle(
        &self,
        index: usize,
        workspaces: &HashMap<WorkspaceId, Workspace>,
    ) -> Rect {
        let width = self.area.width;
        let x = match self
            .workspaces
            .get(index)
            .and_then(|id| workspaces.get(id))
            .and_then(|ws| ws.num())
        {
            Some(num) => (num as i64 - 1).max(0) as i32 * width,
            None => {
                // Named workspaces queue up after the numbered slots.
                let first_named = self
                    .workspaces
                    .iter()
                    .position(|id| {
                        workspaces
                            .get(id)
                            .map(|ws| ws.num().is_none())
                            .unwrap_or(false)
                    })
                    .unwrap_or(index);
                ((NUM_DEFAULT_WORKSPACES - 1) + (index - first_named) as i32) * width
            }
        };
        Rect::new(x, 0, width, self.area.height)
    }

    /// The composed transform the renderer applies to everything on this
    /// output.
    pub fn transform(&self) -> Mat4 {
        self.final_transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.recompose();
    }

    pub fn set_position(&mut self, offset: Vec2) {
        self.position_offset = offset;
        self.recompose();
    }

    fn recompose(&mut self) {
        self.final_transform = self
            .transform
            .mul(&Mat4::translation(self.position_offset.x, self.position_offset.y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerTree;

    fn workspace_set(nums: &[(u32, Option<i32>)]) -> HashMap<WorkspaceId, Workspace> {
        let mut tree = ContainerTree::new();
        nums.iter()
            .map(|&(id, num)| {
                let id = WorkspaceId(id);
                let name = if num.is_none() {
                    Some(format!("named-{}", id.0))
                } else {
                    None
                };
                (
                    id,
                    Workspace::new(&mut tree, id, num, name, OutputId(1), Rect::default()),
                )
            })
            .collect()
    }

    #[test]
    fn workspaces_insert_sorted() {
        let workspaces = workspace_set(&[(1, Some(3)), (2, Some(1)), (3, None), (4, Some(2))]);
        let mut output = Output::new(OutputId(1), "HDMI-1", Rect::new(0, 0, 1920, 1080));
        for id in [1, 2, 3, 4] {
            output.insert_workspace_sorted(WorkspaceId(id), &workspaces);
        }
        assert_eq!(
            output.workspaces,
            vec![
                WorkspaceId(2),
                WorkspaceId(4),
                WorkspaceId(1),
                WorkspaceId(3)
            ]
        );
    }

    #[test]
    fn numbered_workspace_rectangle_is_indexed_by_number() {
        let workspaces = workspace_set(&[(1, Some(1)), (2, Some(4))]);
        let mut output = Output::new(OutputId(1), "HDMI-1", Rect::new(0, 0, 1920, 1080));
        output.insert_workspace_sorted(WorkspaceId(1), &workspaces);
        output.insert_workspace_sorted(WorkspaceId(2), &workspaces);

        assert_eq!(
            output.workspace_rectangle(0, &workspaces),
            Rect::new(0, 0, 1920, 1080)
        );
        assert_eq!(
            output.workspace_rectangle(1, &workspaces),
            Rect::new(3 * 1920, 0, 1920, 1080)
        );
    }

    #[test]
    fn named_workspaces_line_up_after_the_numbered_range() {
        let workspaces = workspace_set(&[(1, Some(1)), (2, None), (3, None)]);
        let mut output = Output::new(OutputId(1), "HDMI-1", Rect::new(0, 0, 1000, 500));
        for id in [1, 2, 3] {
            output.insert_workspace_sorted(WorkspaceId(id), &workspaces);
        }

        // Slots 9 and 10 of the strip (NUM_DEFAULT_WORKSPACES = 10).
        assert_eq!(output.workspace_rectangle(1, &workspaces).x, 9 * 1000);
        assert_eq!(output.workspace_rectangle(2, &workspaces).x, 10 * 1000);
    }

    #[test]
    fn position_offset_composes_into_the_transform() {
        let mut output = Output::new(OutputId(1), "HDMI-1", Rect::new(0, 0, 800, 600));
        output.set_position(Vec2::new(-800.0, 0.0));
        let transform = output.transform();
        assert_eq!(transform.0[3][0], -800.0);
        assert_eq!(transform.0[3][1], 0.0);
    }
}
