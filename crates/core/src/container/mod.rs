//! The container tree: leaves wrap windows, parents arrange children under a
//! layout scheme, shells pass panels through untouched and groups bundle
//! multi-selections.
//!
//! Containers live in an arena ([`ContainerTree`]) keyed by [`ContainerId`].
//! Ids are non-zero, monotonically increasing and never reused, so a stale
//! id held by the animation pipeline or the focus order simply fails to
//! resolve instead of dangling. Parent and workspace back-references are
//! stored as ids for the same reason.

mod tree_ops;

#[cfg(test)]
mod tree_tests;

pub use tree_ops::MoveOutcome;

use crate::animation::{AnimationHandle, NONE_ANIMATION_HANDLE};
use crate::geometry::{Mat4, Point, Rect};
use crate::window::{DepthLayer, WindowHandle, WindowMeta, WindowState};
use crate::workspace::WorkspaceId;
use serde::Serialize;
use std::collections::HashMap;

/// Stable handle of a container in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "con#{}", self.0)
    }
}

/// How a parent arranges its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutScheme {
    Horizontal,
    Vertical,
    Tabbing,
    Stacking,
}

impl LayoutScheme {
    /// Horizontal and tabbing parents distribute along x; vertical and
    /// stacking along y. Selection walks treat them identically.
    pub fn is_vertical_axis(&self) -> bool {
        matches!(self, LayoutScheme::Vertical | LayoutScheme::Stacking)
    }

    /// Only one child of a tabbing or stacking parent is visible at a time.
    pub fn is_stacked_kind(&self) -> bool {
        matches!(self, LayoutScheme::Tabbing | LayoutScheme::Stacking)
    }

    /// The cycle order used by `toggle_layout(cycle_all)`.
    pub fn next(&self) -> LayoutScheme {
        match self {
            LayoutScheme::Horizontal => LayoutScheme::Vertical,
            LayoutScheme::Vertical => LayoutScheme::Tabbing,
            LayoutScheme::Tabbing => LayoutScheme::Stacking,
            LayoutScheme::Stacking => LayoutScheme::Horizontal,
        }
    }

    pub fn from_direction(direction: crate::geometry::Direction) -> LayoutScheme {
        if direction.is_vertical() {
            LayoutScheme::Vertical
        } else {
            LayoutScheme::Horizontal
        }
    }

    /// The i3 name used in tree replies.
    pub fn i3_name(&self) -> &'static str {
        match self {
            LayoutScheme::Horizontal => "splith",
            LayoutScheme::Vertical => "splitv",
            LayoutScheme::Tabbing => "tabbed",
            LayoutScheme::Stacking => "stacked",
        }
    }
}

/// Whether a container has ever been in the scratchpad and, if so, whether
/// the user has toggled it since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScratchpadState {
    #[default]
    None,
    Fresh,
    Changed,
}

/// Leaf-only state: the wrapped window plus the next-state fields that are
/// flushed on commit.
#[derive(Debug, Clone)]
pub struct LeafData {
    /// The wrapped window. `None` only between placement and confirmation.
    pub window: Option<WindowHandle>,
    pub meta: WindowMeta,
    pub state: WindowState,
    pub next_state: Option<WindowState>,
    pub next_depth_layer: Option<DepthLayer>,
    pub next_logical_area: Option<Rect>,
    pub next_with_animations: bool,
    /// The size the client last committed, used by slide transforms.
    pub committed_size: crate::geometry::Size,
    pub dragging: bool,
    pub dragged_position: Option<Point>,
    /// State stashed while hidden (workspace switched away, scratchpad).
    pub before_shown_state: Option<WindowState>,
    /// Clip and state to restore when fullscreen toggles back off.
    pub pre_fullscreen: Option<(Rect, WindowState)>,
}

#[derive(Debug, Clone)]
pub struct ParentData {
    pub children: Vec<ContainerId>,
    pub scheme: LayoutScheme,
}

#[derive(Debug, Clone)]
pub struct ShellData {
    pub window: WindowHandle,
    pub meta: WindowMeta,
}

#[derive(Debug, Clone, Default)]
pub struct GroupData {
    pub members: Vec<ContainerId>,
}

/// The container sum type.
#[derive(Debug, Clone)]
pub enum ContainerKind {
    Leaf(LeafData),
    Parent(ParentData),
    Shell(ShellData),
    Group(GroupData),
}

/// One node in the container tree.
#[derive(Debug, Clone)]
pub struct Container {
    id: ContainerId,
    pub kind: ContainerKind,
    /// The tile assigned by the parent, in global coordinates.
    pub logical_area: Rect,
    pub transform: Mat4,
    pub workspace: Option<WorkspaceId>,
    pub parent: Option<ContainerId>,
    pub focused: bool,
    pub pinned: bool,
    pub scratchpad_state: ScratchpadState,
    /// Anchored containers tile in the grid; unanchored ones float.
    pub anchored: bool,
    pub animation_handle: AnimationHandle,
}

impl Container {
    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ContainerKind::Leaf(_))
    }

    pub fn is_parent(&self) -> bool {
        matches!(self.kind, ContainerKind::Parent(_))
    }

    pub fn is_shell(&self) -> bool {
        matches!(self.kind, ContainerKind::Shell(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ContainerKind::Group(_))
    }

    pub fn as_leaf(&self) -> Option<&LeafData> {
        match &self.kind {
            ContainerKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafData> {
        match &mut self.kind {
            ContainerKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_parent(&self) -> Option<&ParentData> {
        match &self.kind {
            ContainerKind::Parent(parent) => Some(parent),
            _ => None,
        }
    }

    pub fn as_parent_mut(&mut self) -> Option<&mut ParentData> {
        match &mut self.kind {
            ContainerKind::Parent(parent) => Some(parent),
            _ => None,
        }
    }

    /// The window this container answers for, if any.
    pub fn window(&self) -> Option<WindowHandle> {
        match &self.kind {
            ContainerKind::Leaf(leaf) => leaf.window,
            ContainerKind::Shell(shell) => Some(shell.window),
            _ => None,
        }
    }

    /// Leaves report the pending area while a commit is outstanding.
    pub fn effective_area(&self) -> Rect {
        if let ContainerKind::Leaf(leaf) = &self.kind {
            if let Some(next) = leaf.next_logical_area {
                return next;
            }
        }
        self.logical_area
    }
}

/// Arena of containers plus the structural operations over them.
pub struct ContainerTree {
    nodes: HashMap<ContainerId, Container>,
    next_id: u64,
}

impl ContainerTree {
    pub fn new() -> Self {
        ContainerTree {
            nodes: HashMap::new(),
            next_id: 1,
        }
    }

    fn allocate(&mut self, kind: ContainerKind, area: Rect, anchored: bool) -> ContainerId {
        let id = ContainerId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Container {
                id,
                kind,
                logical_area: area,
                transform: Mat4::identity(),
                workspace: None,
                parent: None,
                focused: false,
                pinned: false,
                scratchpad_state: ScratchpadState::None,
                anchored,
                animation_handle: NONE_ANIMATION_HANDLE,
            },
        );
        id
    }

    /// Create a parent container, optionally as the root of a tiling tree
    /// (`anchored`) or a floating subtree.
    pub fn create_parent(
        &mut self,
        area: Rect,
        scheme: LayoutScheme,
        workspace: Option<WorkspaceId>,
        anchored: bool,
    ) -> ContainerId {
        let id = self.allocate(
            ContainerKind::Parent(ParentData {
                children: Vec::new(),
                scheme,
            }),
            area,
            anchored,
        );
        self.nodes.get_mut(&id).unwrap().workspace = workspace;
        id
    }

    /// Create an unconfirmed leaf. The window is attached later through
    /// [`ContainerTree::confirm_window`].
    pub fn create_leaf(&mut self, area: Rect, workspace: Option<WorkspaceId>) -> ContainerId {
        let id = self.allocate(
            ContainerKind::Leaf(LeafData {
                window: None,
                meta: WindowMeta::default(),
                state: WindowState::Restored,
                next_state: None,
                next_depth_layer: None,
                next_logical_area: None,
                next_with_animations: true,
                committed_size: area.size(),
                dragging: false,
                dragged_position: None,
                before_shown_state: None,
                pre_fullscreen: None,
            }),
            area,
            true,
        );
        self.nodes.get_mut(&id).unwrap().workspace = workspace;
        id
    }

    pub fn create_shell(
        &mut self,
        window: WindowHandle,
        meta: WindowMeta,
        area: Rect,
        workspace: Option<WorkspaceId>,
    ) -> ContainerId {
        let id = self.allocate(ContainerKind::Shell(ShellData { window, meta }), area, false);
        self.nodes.get_mut(&id).unwrap().workspace = workspace;
        id
    }

    pub fn create_group(&mut self) -> ContainerId {
        self.allocate(ContainerKind::Group(GroupData::default()), Rect::default(), false)
    }

    pub fn get(&self, id: ContainerId) -> Option<&Container> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: ContainerId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop a single node from the arena. Structural bookkeeping (detaching
    /// from the parent, cascades) is the caller's job; see `remove_node`.
    pub fn destroy(&mut self, id: ContainerId) -> Option<Container> {
        self.nodes.remove(&id)
    }

    pub fn children_of(&self, id: ContainerId) -> Vec<ContainerId> {
        self.get(id)
            .and_then(|node| node.as_parent())
            .map(|parent| parent.children.clone())
            .unwrap_or_default()
    }

    pub fn parent_of(&self, id: ContainerId) -> Option<ContainerId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub fn workspace_of(&self, id: ContainerId) -> Option<WorkspaceId> {
        self.get(id).and_then(|node| node.workspace)
    }

    /// Position of `child` within `parent`'s child list.
    pub fn index_of(&self, parent: ContainerId, child: ContainerId) -> Option<usize> {
        self.get(parent)?
            .as_parent()?
            .children
            .iter()
            .position(|&c| c == child)
    }

    /// The root of the (sub)tree containing `id`.
    pub fn root_of(&self, id: ContainerId) -> ContainerId {
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            current = parent;
        }
        current
    }

    /// Find the container wrapping `window`, if any.
    pub fn container_for_window(&self, window: WindowHandle) -> Option<ContainerId> {
        self.nodes
            .values()
            .find(|node| node.window() == Some(window))
            .map(|node| node.id)
    }

    /// Depth-first pre-order walk of the subtree under `id` (inclusive).
    pub fn for_each_in_subtree(&self, id: ContainerId, f: &mut dyn FnMut(&Container)) {
        let Some(node) = self.get(id) else { return };
        f(node);
        if let Some(parent) = node.as_parent() {
            for child in parent.children.clone() {
                self.for_each_in_subtree(child, f);
            }
        }
    }

    /// All leaf ids under `id` in visual order.
    pub fn leaves_under(&self, id: ContainerId) -> Vec<ContainerId> {
        let mut leaves = Vec::new();
        self.for_each_in_subtree(id, &mut |node| {
            if node.is_leaf() {
                leaves.push(node.id);
            }
        });
        leaves
    }

    /// Rewrite the workspace back-reference of every node under `id`.
    pub fn set_workspace_in_subtree(&mut self, id: ContainerId, workspace: Option<WorkspaceId>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get_mut(current) {
                node.workspace = workspace;
                if let Some(parent) = node.as_parent() {
                    stack.extend(parent.children.iter().copied());
                }
            }
        }
    }

    /// Destroy `id` and everything beneath it.
    pub fn destroy_subtree(&mut self, id: ContainerId) {
        let mut doomed = Vec::new();
        self.for_each_in_subtree(id, &mut |node| doomed.push(node.id));
        for id in doomed {
            self.nodes.remove(&id);
        }
    }

    pub fn ids(&self) -> Vec<ContainerId> {
        let mut ids: Vec<_> = self.nodes.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for ContainerTree {
    fn default() -> Self {
        ContainerTree::new()
    }
}
