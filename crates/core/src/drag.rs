//! Pointer-driven repositioning services.
//!
//! The drag service moves a container live through the tiling grid: while
//! dragging, the container follows the cursor and grafts into whichever
//! leaf's tile the cursor enters. The move service is the lightweight
//! variant used when only the move modifier is held: same lifecycle, no
//! tree grafting.

use crate::compositor::Compositor;
use crate::container::ContainerId;
use crate::geometry::Point;
use crate::state::WmMode;
use tracing::warn;

/// Pointer button transitions delivered by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    ButtonDown,
    ButtonUp,
    Motion,
}

/// Modifier-gated drag-and-drop against the tiling grid.
#[derive(Debug, Default)]
pub struct DragAndDropService {
    cursor_start: Point,
    container_start: Point,
    current: Point,
    last_intersected: Option<ContainerId>,
}

impl DragAndDropService {
    pub fn new() -> Self {
        DragAndDropService::default()
    }

    /// Handle a pointer event. Returns true when the event was consumed.
    pub fn handle_pointer_event(
        &mut self,
        compositor: &mut Compositor,
        x: f32,
        y: f32,
        action: PointerAction,
        modifiers: u32,
    ) -> bool {
        if !compositor.config.drag.enabled {
            return false;
        }

        if let WmMode::Dragging { container } = compositor.state.mode {
            return self.handle_dragging(compositor, container, x, y, action);
        }

        if action != PointerAction::ButtonDown {
            return false;
        }
        if compositor.config.drag.modifiers != modifiers {
            return false;
        }
        if !compositor.state.mode.is_normal() {
            warn!("must be in normal mode before a drag can start");
            return false;
        }

        let Some(intersected) = compositor.intersect(x as i32, y as i32) else {
            return false;
        };
        if !compositor.tree.get(intersected).map(|n| n.is_leaf()).unwrap_or(false) {
            warn!(%intersected, "cannot drag a non-leaf container");
            return false;
        }

        let origin = compositor
            .tree
            .visible_area(intersected, &compositor.config);
        if let Some(leaf) = compositor
            .tree
            .get_mut(intersected)
            .and_then(|node| node.as_leaf_mut())
        {
            leaf.dragging = true;
            leaf.dragged_position = Some(origin.top_left());
        }
        compositor.constrain(intersected);
        if let Some(window) = compositor.tree.get(intersected).and_then(|n| n.window()) {
            compositor.select_active_window(Some(window));
        }
        compositor.state.mode = WmMode::Dragging {
            container: intersected,
        };
        self.cursor_start = Point::new(x as i32, y as i32);
        self.container_start = origin.top_left();
        self.current = self.cursor_start;
        self.last_intersected = None;
        true
    }

    fn handle_dragging(
        &mut self,
        compositor: &mut Compositor,
        container: ContainerId,
        x: f32,
        y: f32,
        action: PointerAction,
    ) -> bool {
        if action == PointerAction::ButtonUp {
            compositor.state.mode = WmMode::Normal;
            self.stop_drag(compositor, container);
            self.last_intersected = None;
            return true;
        }

        if !compositor.tree.contains(container) {
            warn!("focused container no longer exists while dragging");
            compositor.state.mode = WmMode::Normal;
            return false;
        }

        let position = Point::new(x as i32, y as i32);
        if position == self.current {
            return false;
        }
        self.current = position;

        // Follow the cursor.
        let dragged = Point::new(
            self.container_start.x + (position.x - self.cursor_start.x),
            self.container_start.y + (position.y - self.cursor_start.y),
        );
        if let Some(window) = compositor.tree.get(container).and_then(|n| n.window()) {
            if let Some(leaf) = compositor
                .tree
                .get_mut(container)
                .and_then(|node| node.as_leaf_mut())
            {
                leaf.dragged_position = Some(dragged);
            }
            compositor.windows.set_position(window, dragged);
        }

        // Floating windows just follow the cursor; only tiled containers
        // re-graft through the grid.
        let anchored = compositor
            .tree
            .get(container)
            .map(|node| node.anchored)
            .unwrap_or(false);
        if !anchored {
            return true;
        }

        // An empty active workspace swallows the drag directly.
        let active_empty = compositor
            .active_workspace_id()
            .and_then(|ws| compositor.workspaces.get(&ws))
            .map(|ws| ws.is_empty(&compositor.tree))
            .unwrap_or(false);
        if active_empty {
            if let Some(workspace) = compositor.active_workspace_id() {
                if compositor.tree.workspace_of(container) != Some(workspace) {
                    compositor.detach_container(container);
                    compositor.graft_into_workspace(workspace, container);
                }
            }
            return true;
        }

        // Graft into whichever leaf the cursor is over.
        let Some(intersected) =
            compositor.intersect_leaf(position.x, position.y, Some(container))
        else {
            self.last_intersected = None;
            return true;
        };
        if self.last_intersected == Some(intersected) {
            return true;
        }
        self.last_intersected = Some(intersected);
        if intersected != container {
            compositor.tree.move_to(container, intersected);
            let root = compositor.tree.root_of(intersected);
            compositor.commit_subtree(root);
        }
        true
    }

    fn stop_drag(&mut self, compositor: &mut Compositor, container: ContainerId) {
        if !compositor.tree.contains(container) {
            warn!("drag ended after the container vanished");
            return;
        }
        if let Some(leaf) = compositor
            .tree
            .get_mut(container)
            .and_then(|node| node.as_leaf_mut())
        {
            leaf.dragging = false;
            leaf.dragged_position = None;
        }
        // Snap back into the tile.
        let visible = compositor.tree.visible_area(container, &compositor.config);
        if let Some(window) = compositor.tree.get(container).and_then(|n| n.window()) {
            compositor.windows.set_position(window, visible.top_left());
            compositor
                .windows
                .set_size(window, visible.size());
        }
        compositor.constrain(container);
    }
}

/// Modifier-only repositioning without tree side effects.
#[derive(Debug, Default)]
pub struct MoveService {
    cursor: Point,
}

impl MoveService {
    pub fn new() -> Self {
        MoveService::default()
    }

    pub fn handle_pointer_event(
        &mut self,
        compositor: &mut Compositor,
        x: f32,
        y: f32,
        action: PointerAction,
        modifiers: u32,
    ) -> bool {
        if let WmMode::Moving { container } = compositor.state.mode {
            if action == PointerAction::ButtonUp {
                compositor.state.mode = WmMode::Normal;
                return true;
            }

            if !compositor.tree.contains(container) {
                warn!("focused container no longer exists while moving");
                compositor.state.mode = WmMode::Normal;
                return false;
            }

            let position = Point::new(x as i32, y as i32);
            if position == self.cursor {
                return false;
            }
            let dx = position.x - self.cursor.x;
            let dy = position.y - self.cursor.y;
            self.cursor = position;
            compositor.move_container_by(container, dx, dy);
            return true;
        }

        if action != PointerAction::ButtonDown {
            return false;
        }
        if compositor.config.move_modifiers() != modifiers {
            return false;
        }
        if !compositor.state.mode.is_normal() {
            warn!("must be in normal mode before a move can start");
            return false;
        }
        let Some(intersected) = compositor.intersect(x as i32, y as i32) else {
            return false;
        };

        compositor.state.mode = WmMode::Moving {
            container: intersected,
        };
        if let Some(window) = compositor.tree.get(intersected).and_then(|n| n.window()) {
            compositor.select_active_window(Some(window));
        }
        self.cursor = Point::new(x as i32, y as i32);
        true
    }
}
