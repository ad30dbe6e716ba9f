//! Workspaces: a numbered or named grouping of one tiling tree plus any
//! floating subtrees, owned by an output.

mod manager;


pub use manager::{WorkspaceEvent, WorkspaceManager, WorkspaceObserver, WorkspaceObserverRegistrar};

use crate::container::{ContainerId, ContainerTree, LayoutScheme};
use crate::geometry::Rect;
use crate::output::OutputId;

/// Stable identifier of a workspace. Ids are allocated by the
/// [`WorkspaceManager`] and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkspaceId(pub u32);

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ws#{}", self.0)
    }
}

/// The key a workspace was requested under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceKey {
    Num(i32),
    Name(String),
}

/// One workspace: an id, an optional number, an optional name, the owning
/// output, the root of its tiling tree and the roots of its floating
/// subtrees.
#[derive(Debug)]
pub struct Workspace {
    id: WorkspaceId,
    num: Option<i32>,
    name: Option<String>,
    pub output: OutputId,
    /// Root of the anchored (tiling) tree.
    pub root: ContainerId,
    /// Roots of unanchored (floating) subtrees.
    pub floating: Vec<ContainerId>,
    /// The container last focused on this workspace, revalidated on use.
    pub last_focused: Option<ContainerId>,
}

impl Workspace {
    /// Create a workspace and its (empty) tiling root covering `area`.
    pub fn new(
        tree: &mut ContainerTree,
        id: WorkspaceId,
        num: Option<i32>,
        name: Option<String>,
        output: OutputId,
        area: Rect,
    ) -> Self {
        let root = tree.create_parent(area, LayoutScheme::Horizontal, Some(id), true);
        Workspace {
            id,
            num,
            name,
            output,
            root,
            floating: Vec::new(),
            last_focused: None,
        }
    }

    pub fn id(&self) -> WorkspaceId {
        self.id
    }

    pub fn num(&self) -> Option<i32> {
        self.num
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `3:web` when both parts exist, otherwise whichever is set.
    pub fn display_name(&self) -> String {
        match (self.num, self.name.as_deref()) {
            (Some(num), Some(name)) => format!("{num}:{name}"),
            (None, Some(name)) => name.to_string(),
            (Some(num), None) => num.to_string(),
            (None, None) => format!("Unknown #{}", self.id.0),
        }
    }

    /// Whether `key` refers to this workspace.
    pub fn matches(&self, key: &WorkspaceKey) -> bool {
        match key {
            WorkspaceKey::Num(num) => self.num == Some(*num),
            WorkspaceKey::Name(name) => self.name.as_deref() == Some(name.as_str()),
        }
    }

    pub fn is_empty(&self, tree: &ContainerTree) -> bool {
        tree.children_of(self.root).is_empty() && self.floating.is_empty()
    }

    /// Whether `id` belongs to this workspace (tiled or floating).
    pub fn contains(&self, tree: &ContainerTree, id: ContainerId) -> bool {
        let root = tree.root_of(id);
        root == self.root || self.floating.contains(&root)
    }

    /// All leaves on this workspace: floating trees first (they stack above
    /// the grid), then the tiling tree.
    pub fn leaves(&self, tree: &ContainerTree) -> Vec<ContainerId> {
        let mut leaves = Vec::new();
        for floating in &self.floating {
            leaves.extend(tree.leaves_under(*floating));
        }
        leaves.extend(tree.leaves_under(self.root));
        leaves
    }

    /// Create an unanchored parent over `area` for a floating window.
    pub fn create_floating_tree(&mut self, tree: &mut ContainerTree, area: Rect) -> ContainerId {
        let floating = tree.create_parent(area, LayoutScheme::Horizontal, Some(self.id), false);
        self.floating.push(floating);
        floating
    }

    /// Resize the tiling root (floating trees keep their own geometry).
    pub fn set_area(&self, tree: &mut ContainerTree, area: Rect) {
        tree.set_logical_area(self.root, area);
    }

    /// Detach the floating roots whose `pinned` flag is set, for transfer to
    /// the workspace being switched to.
    pub fn take_pinned(&mut self, tree: &ContainerTree) -> Vec<ContainerId> {
        let mut pinned = Vec::new();
        self.floating.retain(|&floating| {
            let is_pinned = tree.get(floating).map(|node| node.pinned).unwrap_or(false);
            if is_pinned {
                pinned.push(floating);
            }
            !is_pinned
        });
        pinned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaffold() -> (ContainerTree, Workspace) {
        let mut tree = ContainerTree::new();
        let workspace = Workspace::new(
            &mut tree,
            WorkspaceId(1),
            Some(3),
            Some("web".into()),
            OutputId(1),
            Rect::new(0, 0, 1280, 720),
        );
        (tree, workspace)
    }

    #[test]
    fn display_name_formats() {
        let mut tree = ContainerTree::new();
        let both = Workspace::new(
            &mut tree,
            WorkspaceId(2),
            Some(3),
            Some("web".into()),
            OutputId(1),
            Rect::default(),
        );
        assert_eq!(both.display_name(), "3:web");

        let num_only = Workspace::new(
            &mut tree,
            WorkspaceId(3),
            Some(5),
            None,
            OutputId(1),
            Rect::default(),
        );
        assert_eq!(num_only.display_name(), "5");

        let name_only = Workspace::new(
            &mut tree,
            WorkspaceId(4),
            None,
            Some("mail".into()),
            OutputId(1),
            Rect::default(),
        );
        assert_eq!(name_only.display_name(), "mail");
    }

    #[test]
    fn empty_workspace_has_empty_root() {
        let (tree, workspace) = scaffold();
        assert!(workspace.is_empty(&tree));
        assert_eq!(
            tree.get(workspace.root).unwrap().logical_area,
            Rect::new(0, 0, 1280, 720)
        );
    }

    #[test]
    fn contains_spans_tiled_and_floating() {
        let (mut tree, mut workspace) = scaffold();
        let leaf = tree.create_space_for_window(workspace.root, None);
        assert!(workspace.contains(&tree, leaf));

        let floating = workspace.create_floating_tree(&mut tree, Rect::new(10, 10, 300, 200));
        let float_leaf = tree.create_space_for_window(floating, None);
        assert!(workspace.contains(&tree, float_leaf));
        assert!(!workspace.is_empty(&tree));
    }

    #[test]
    fn take_pinned_detaches_only_pinned_trees() {
        let (mut tree, mut workspace) = scaffold();
        let pinned = workspace.create_floating_tree(&mut tree, Rect::new(0, 0, 100, 100));
        let loose = workspace.create_floating_tree(&mut tree, Rect::new(50, 50, 100, 100));
        tree.get_mut(pinned).unwrap().pinned = true;

        let taken = workspace.take_pinned(&tree);
        assert_eq!(taken, vec![pinned]);
        assert_eq!(workspace.floating, vec![loose]);
    }
}
