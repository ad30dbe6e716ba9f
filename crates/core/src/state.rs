//! Compositor-wide interaction state: the focus order, pointer position,
//! modifier mask and the window-manager mode.

use crate::container::ContainerId;
use crate::geometry::Point;
use crate::output::OutputId;

/// The compositor's interaction mode. Transitions are authoritative: most
/// command-controller operations are rejected outside [`WmMode::Normal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmMode {
    Normal,
    /// Only the locked container may be resized; pointer focus changes are
    /// suppressed until the mode is left.
    Resizing { locked: ContainerId },
    /// Multi-select: containers are toggled in and out of a group.
    Selecting { group: ContainerId },
    /// A container is being dragged through the tiling grid.
    Dragging { container: ContainerId },
    /// A container is being repositioned without tree grafting.
    Moving { container: ContainerId },
}

impl WmMode {
    pub fn is_normal(&self) -> bool {
        matches!(self, WmMode::Normal)
    }

    /// The i3 binding-state name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            WmMode::Normal => "default",
            WmMode::Resizing { .. } => "resize",
            WmMode::Selecting { .. } => "selecting",
            WmMode::Dragging { .. } => "dragging",
            WmMode::Moving { .. } => "moving",
        }
    }
}

/// Focus order plus pointer bookkeeping. The focus order is a
/// most-recently-used list of container ids; ids whose containers have died
/// are pruned lazily on access.
pub struct CompositorState {
    pub mode: WmMode,
    pub cursor_position: Point,
    pub modifiers: u32,
    focus_order: Vec<ContainerId>,
    focused_output: Option<OutputId>,
}

impl CompositorState {
    pub fn new() -> Self {
        CompositorState {
            mode: WmMode::Normal,
            cursor_position: Point::default(),
            modifiers: 0,
            focus_order: Vec::new(),
            focused_output: None,
        }
    }

    /// The most recently focused container, if any.
    pub fn focused_container(&self) -> Option<ContainerId> {
        self.focus_order.first().copied()
    }

    pub fn focused_output(&self) -> Option<OutputId> {
        self.focused_output
    }

    pub fn focus_output(&mut self, output: OutputId) {
        self.focused_output = Some(output);
    }

    pub fn unfocus_output(&mut self, output: OutputId) {
        if self.focused_output == Some(output) {
            self.focused_output = None;
        }
    }

    /// Move `id` to the front of the focus order, registering it if needed.
    pub fn focus_container(&mut self, id: ContainerId) {
        self.focus_order.retain(|&existing| existing != id);
        self.focus_order.insert(0, id);
    }

    /// Demote `id` behind every other entry without removing it.
    pub fn unfocus_container(&mut self, id: ContainerId) {
        if self.focus_order.first() == Some(&id) {
            self.focus_order.retain(|&existing| existing != id);
            self.focus_order.push(id);
        }
    }

    pub fn add(&mut self, id: ContainerId) {
        if !self.focus_order.contains(&id) {
            self.focus_order.push(id);
        }
    }

    pub fn remove(&mut self, id: ContainerId) {
        self.focus_order.retain(|&existing| existing != id);
    }

    /// Drop every id `is_alive` rejects. Called at tick boundaries so the
    /// order never accumulates dead entries.
    pub fn prune(&mut self, is_alive: impl Fn(ContainerId) -> bool) {
        self.focus_order.retain(|&id| is_alive(id));
    }

    /// The first entry satisfying `predicate`, in MRU order.
    pub fn first_matching(
        &self,
        predicate: impl Fn(ContainerId) -> bool,
    ) -> Option<ContainerId> {
        self.focus_order.iter().copied().find(|&id| predicate(id))
    }

    pub fn focus_order(&self) -> &[ContainerId] {
        &self.focus_order
    }
}

impl Default for CompositorState {
    fn default() -> Self {
        CompositorState::new()
    }
}
