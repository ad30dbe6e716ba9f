//! Structural and geometric operations over the container tree: tile
//! distribution, resizing, directional selection and movement, and layout
//! scheme changes.
//!
//! All operations here are pure tree mutations. Flushing pending leaf
//! geometry out to the display server (and the animation pipeline) happens
//! in the command layer, which calls these first and commits after.

use super::{Container, ContainerId, ContainerKind, ContainerTree, LayoutScheme};
use crate::config::{Config, MIN_TILE_HEIGHT, MIN_TILE_WIDTH};
use crate::geometry::{Direction, Rect};
use crate::window::{WindowHandle, WindowMeta};
use tracing::warn;

/// Result of a directional move against the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub moved: bool,
    /// Set when the move wrapped the old root in a new parent.
    pub new_root: Option<ContainerId>,
}

impl MoveOutcome {
    fn no_op() -> Self {
        MoveOutcome {
            moved: false,
            new_root: None,
        }
    }
}

impl ContainerTree {
    /// Reserve a tile for a new window on `parent`: every child, the new one
    /// included, receives an equal `ceil` share along the layout axis, with
    /// the last child absorbing the rounding remainder. Returns the pending
    /// leaf; attach the window with [`ContainerTree::confirm_window`].
    pub fn create_space_for_window(&mut self, parent: ContainerId, index: Option<usize>) -> ContainerId {
        let workspace = self.workspace_of(parent);
        let area = self
            .get(parent)
            .map(|node| node.logical_area)
            .unwrap_or_default();
        let leaf = self.create_leaf(area, workspace);

        let insert_at = index.unwrap_or_else(|| self.children_of(parent).len());
        let anchored = self.get(parent).map(|p| p.anchored).unwrap_or(true);
        if let Some(data) = self.get_mut(parent).and_then(|node| node.as_parent_mut()) {
            let insert_at = insert_at.min(data.children.len());
            data.children.insert(insert_at, leaf);
        }
        if let Some(node) = self.get_mut(leaf) {
            node.parent = Some(parent);
            node.anchored = anchored;
        }
        self.distribute_equally(parent);
        leaf
    }

    /// Attach the real window to a pending leaf created by
    /// [`ContainerTree::create_space_for_window`].
    pub fn confirm_window(&mut self, leaf: ContainerId, window: WindowHandle, meta: WindowMeta) {
        if let Some(data) = self.get_mut(leaf).and_then(|node| node.as_leaf_mut()) {
            data.window = Some(window);
            data.meta = meta;
        } else {
            warn!(%leaf, "confirm_window: not a leaf");
        }
    }

    /// Split `parent`'s area into equal tiles along its scheme. Horizontal
    /// and vertical parents split the axis; tabbing and stacking parents
    /// give every child the full tile.
    pub fn distribute_equally(&mut self, parent: ContainerId) {
        let Some(node) = self.get(parent) else { return };
        let area = node.logical_area;
        let Some(data) = node.as_parent() else { return };
        let children = data.children.clone();
        let scheme = data.scheme;
        let n = children.len() as i32;
        if n == 0 {
            return;
        }

        match scheme {
            LayoutScheme::Horizontal => {
                let share = (area.width + n - 1) / n;
                let mut x = area.x;
                for (i, child) in children.iter().enumerate() {
                    let width = if i as i32 == n - 1 {
                        area.x + area.width - x
                    } else {
                        share
                    };
                    self.set_logical_area(*child, Rect::new(x, area.y, width, area.height));
                    x += width;
                }
            }
            LayoutScheme::Vertical => {
                let share = (area.height + n - 1) / n;
                let mut y = area.y;
                for (i, child) in children.iter().enumerate() {
                    let height = if i as i32 == n - 1 {
                        area.y + area.height - y
                    } else {
                        share
                    };
                    self.set_logical_area(*child, Rect::new(area.x, y, area.width, height));
                    y += height;
                }
            }
            LayoutScheme::Tabbing | LayoutScheme::Stacking => {
                for child in children {
                    self.set_logical_area(child, area);
                }
            }
        }
    }

    /// Assign a new tile to `id`. Leaves record it as pending geometry;
    /// parents take it immediately and rescale their children
    /// proportionally (remainder to the last child) so tiles stay
    /// contiguous and sum to the parent extent.
    pub fn set_logical_area(&mut self, id: ContainerId, rect: Rect) {
        let Some(node) = self.get_mut(id) else { return };
        match &mut node.kind {
            ContainerKind::Leaf(leaf) => {
                leaf.next_logical_area = Some(rect);
            }
            ContainerKind::Shell(_) | ContainerKind::Group(_) => {
                node.logical_area = rect;
            }
            ContainerKind::Parent(parent) => {
                let children = parent.children.clone();
                let scheme = parent.scheme;
                node.logical_area = rect;
                if children.is_empty() {
                    return;
                }
                match scheme {
                    LayoutScheme::Horizontal => self.scale_children_horizontal(rect, &children),
                    LayoutScheme::Vertical => self.scale_children_vertical(rect, &children),
                    LayoutScheme::Tabbing | LayoutScheme::Stacking => {
                        for child in children {
                            self.set_logical_area(child, rect);
                        }
                    }
                }
            }
        }
    }

    fn scale_children_horizontal(&mut self, rect: Rect, children: &[ContainerId]) {
        let total: i64 = children
            .iter()
            .filter_map(|&c| self.get(c))
            .map(|node| node.effective_area().width.max(0) as i64)
            .sum();
        let mut x = rect.x;
        let n = children.len();
        for (i, &child) in children.iter().enumerate() {
            let width = if i == n - 1 {
                rect.x + rect.width - x
            } else if total > 0 {
                let span = self.get(child).map(|c| c.effective_area().width).unwrap_or(0);
                ((span as i64 * rect.width as i64) / total) as i32
            } else {
                rect.width / n as i32
            };
            self.set_logical_area(child, Rect::new(x, rect.y, width, rect.height));
            x += width;
        }
    }

    fn scale_children_vertical(&mut self, rect: Rect, children: &[ContainerId]) {
        let total: i64 = children
            .iter()
            .filter_map(|&c| self.get(c))
            .map(|node| node.effective_area().height.max(0) as i64)
            .sum();
        let mut y = rect.y;
        let n = children.len();
        for (i, &child) in children.iter().enumerate() {
            let height = if i == n - 1 {
                rect.y + rect.height - y
            } else if total > 0 {
                let span = self.get(child).map(|c| c.effective_area().height).unwrap_or(0);
                ((span as i64 * rect.height as i64) / total) as i32
            } else {
                rect.height / n as i32
            };
            self.set_logical_area(child, Rect::new(rect.x, y, rect.width, height));
            y += height;
        }
    }

    /// The logical area minus half the inner gap on each shared edge and the
    /// border width all around.
    pub fn visible_area(&self, id: ContainerId, config: &Config) -> Rect {
        let Some(node) = self.get(id) else {
            return Rect::default();
        };
        self.visible_area_of(id, node.effective_area(), config)
    }

    /// Deflate `area` as if it were `id`'s tile. Split out so pending and
    /// committed geometry can both be projected to visible space.
    pub(crate) fn visible_area_of(&self, id: ContainerId, area: Rect, config: &Config) -> Rect {
        let Some(node) = self.get(id) else {
            return Rect::default();
        };
        if !node.is_leaf() {
            return area;
        }

        let half_gap_x = (config.gaps.inner_x as f64 / 2.0).ceil() as i32;
        let half_gap_y = (config.gaps.inner_y as f64 / 2.0).ceil() as i32;
        let mut x = area.x;
        let mut y = area.y;
        let mut width = area.width;
        let mut height = area.height;

        if self.has_neighbor(id, Direction::Left) {
            x += half_gap_x;
            width -= half_gap_x;
        }
        if self.has_neighbor(id, Direction::Right) {
            width -= half_gap_x;
        }
        if self.has_neighbor(id, Direction::Up) {
            y += half_gap_y;
            height -= half_gap_y;
        }
        if self.has_neighbor(id, Direction::Down) {
            height -= half_gap_y;
        }

        let border = config.border.size;
        Rect::new(
            x + border,
            y + border,
            width - 2 * border,
            height - 2 * border,
        )
    }

    /// Whether another tile shares the `direction` edge of `id` anywhere up
    /// the ancestor chain.
    pub fn has_neighbor(&self, id: ContainerId, direction: Direction) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            if let Some(data) = self.get(parent).and_then(|node| node.as_parent()) {
                if data.scheme.is_vertical_axis() == direction.is_vertical()
                    && !data.scheme.is_stacked_kind()
                {
                    if let Some(index) = self.index_of(parent, current) {
                        if direction.is_negative() {
                            if index > 0 {
                                return true;
                            }
                        } else if index + 1 < data.children.len() {
                            return true;
                        }
                    }
                }
            }
            current = parent;
        }
        false
    }

    /// Directional selection walk: climb until a parent's axis matches
    /// `direction` and a sibling exists in the requested sense, then descend
    /// into that sibling picking the nearest edge. Returns the leaf found,
    /// or `None` when the walk exhausts the tree.
    pub fn handle_select(&self, from: ContainerId, direction: Direction) -> Option<ContainerId> {
        let is_vertical = direction.is_vertical();
        let is_negative = direction.is_negative();
        let mut current = from;
        let mut parent = self.parent_of(from)?;

        loop {
            let data = self.get(parent).and_then(|node| node.as_parent())?;
            let scheme = data.scheme;
            let matches_axis = scheme.is_vertical_axis() == is_vertical;
            if matches_axis {
                let index = self.index_of(parent, current)?;
                if is_negative {
                    if index > 0 {
                        let sibling = data.children[index - 1];
                        return self.closest_leaf_in(sibling, direction);
                    }
                } else if index + 1 < data.children.len() {
                    let sibling = data.children[index + 1];
                    return self.closest_leaf_in(sibling, direction);
                }
            }

            current = parent;
            parent = self.parent_of(parent)?;
        }
    }

    /// First leaf within `node` as approached from `direction`. When the
    /// node's own axis matches the travel direction and we come in from the
    /// positive side, the far edge is tried first so movement reads as
    /// crossing the screen.
    fn closest_leaf_in(&self, node: ContainerId, direction: Direction) -> Option<ContainerId> {
        let container = self.get(node)?;
        if container.is_leaf() {
            return Some(node);
        }
        let data = container.as_parent()?;
        let matches_axis = !data.scheme.is_stacked_kind()
            && data.scheme.is_vertical_axis() == direction.is_vertical();

        if matches_axis && direction.is_negative() {
            for child in data.children.iter().skip(1).rev() {
                if let Some(found) = self.closest_leaf_in(*child, direction) {
                    return Some(found);
                }
            }
        }

        for child in &data.children {
            if let Some(found) = self.closest_leaf_in(*child, direction) {
                return Some(found);
            }
        }
        None
    }

    /// Detach `id` from its parent. Empty non-root ancestors cascade away
    /// (invariant: a parent with zero children that is not a tree root is
    /// destroyed). Returns the surviving ancestor whose children were
    /// rescaled, if any.
    pub fn remove_node(&mut self, id: ContainerId) -> Option<ContainerId> {
        let mut parent = self.parent_of(id)?;
        if let Some(data) = self.get_mut(parent).and_then(|node| node.as_parent_mut()) {
            data.children.retain(|&c| c != id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }

        // Cascade empty non-root parents upward.
        while self.children_of(parent).is_empty() {
            let Some(grandparent) = self.parent_of(parent) else {
                break;
            };
            if let Some(data) = self
                .get_mut(grandparent)
                .and_then(|node| node.as_parent_mut())
            {
                data.children.retain(|&c| c != parent);
            }
            self.destroy(parent);
            parent = grandparent;
        }

        // Remaining siblings absorb the freed space.
        let area = self.get(parent).map(|node| node.logical_area)?;
        self.set_logical_area(parent, area);
        Some(parent)
    }

    /// Insert `id` into `parent` at `index` and re-split the parent into
    /// equal tiles.
    pub fn graft(&mut self, id: ContainerId, parent: ContainerId, index: Option<usize>) {
        let at = index
            .unwrap_or_else(|| self.children_of(parent).len())
            .min(self.children_of(parent).len());
        if let Some(data) = self.get_mut(parent).and_then(|node| node.as_parent_mut()) {
            data.children.insert(at, id);
        }
        let (workspace, anchored) = self
            .get(parent)
            .map(|node| (node.workspace, node.anchored))
            .unwrap_or((None, true));
        if let Some(node) = self.get_mut(id) {
            node.parent = Some(parent);
            node.anchored = anchored;
        }
        self.set_workspace_in_subtree(id, workspace);
        self.distribute_equally(parent);
    }

    /// Exchange two children of the same parent, tiles included.
    pub fn swap(&mut self, first: ContainerId, second: ContainerId) -> bool {
        let Some(parent) = self.parent_of(first) else {
            return false;
        };
        if self.parent_of(second) != Some(parent) {
            return false;
        }
        let (Some(i), Some(j)) = (
            self.index_of(parent, first),
            self.index_of(parent, second),
        ) else {
            return false;
        };
        if let Some(data) = self.get_mut(parent).and_then(|node| node.as_parent_mut()) {
            data.children.swap(i, j);
        }
        let first_area = self.get(first).map(|n| n.effective_area()).unwrap_or_default();
        let second_area = self.get(second).map(|n| n.effective_area()).unwrap_or_default();
        self.set_logical_area(first, second_area);
        self.set_logical_area(second, first_area);
        true
    }

    /// Move `id` next to `target`: a swap when they share a parent,
    /// otherwise a transplant to the slot immediately after `target`.
    pub fn move_to(&mut self, id: ContainerId, target: ContainerId) -> bool {
        let Some(target_parent) = self.parent_of(target) else {
            warn!(%target, "move_to: target has no parent");
            return false;
        };

        if self.parent_of(id) == Some(target_parent) {
            return self.swap(id, target);
        }

        self.remove_node(id);
        // Removing [id] may have cascaded parents away, so look the index up
        // only after the removal settled.
        let index = self.index_of(target_parent, target).map(|i| i + 1);
        self.graft(id, target_parent, index);
        true
    }

    /// Directional move per the tree rules: follow the selection walk and
    /// sit where the found leaf is; failing that, wrap the root in a parent
    /// oriented along `direction` and prepend/append.
    pub fn move_in_tree(
        &mut self,
        root: ContainerId,
        id: ContainerId,
        direction: Direction,
    ) -> MoveOutcome {
        if let Some(target) = self.handle_select(id, direction) {
            return MoveOutcome {
                moved: self.move_to(id, target),
                new_root: None,
            };
        }

        let mut root = root;
        let mut new_root = None;
        if self.parent_of(id) == Some(root) {
            let wrap_scheme = LayoutScheme::from_direction(direction);
            let root_scheme = self
                .get(root)
                .and_then(|node| node.as_parent())
                .map(|data| data.scheme);
            if root_scheme == Some(wrap_scheme) {
                // Already at the edge of a root running this way.
                return MoveOutcome::no_op();
            }

            let (area, workspace, anchored) = match self.get(root) {
                Some(node) => (node.logical_area, node.workspace, node.anchored),
                None => return MoveOutcome::no_op(),
            };
            let wrapper = self.create_parent(area, wrap_scheme, workspace, anchored);
            self.graft(root, wrapper, Some(0));
            root = wrapper;
            new_root = Some(wrapper);
        }

        self.remove_node(id);
        let index = if direction.is_negative() {
            Some(0)
        } else {
            None
        };
        self.graft(id, root, index);
        MoveOutcome {
            moved: true,
            new_root,
        }
    }

    /// Resize `id` along `direction` by `pixels`, distributing the opposite
    /// delta across siblings on the matching axis. Rejects the change if any
    /// sibling would fall below the minimum tile size.
    pub fn resize(&mut self, id: ContainerId, direction: Direction, pixels: i32) -> bool {
        let Some(parent) = self.parent_of(id) else {
            return false;
        };
        let Some(data) = self.get(parent).and_then(|node| node.as_parent()) else {
            return false;
        };

        let is_vertical = direction.is_vertical();
        let axis_matches = match data.scheme {
            LayoutScheme::Vertical => is_vertical,
            LayoutScheme::Horizontal => !is_vertical,
            LayoutScheme::Tabbing | LayoutScheme::Stacking => false,
        };

        if axis_matches && data.children.len() == 1 {
            // Nothing to trade space with.
            return false;
        }
        if !axis_matches {
            // Walk up until the layout axis lines up with the direction.
            return self.resize(parent, direction, pixels);
        }

        let children = data.children.clone();
        let parent_area = self.get(parent).map(|n| n.logical_area).unwrap_or_default();
        let resize_amount = if direction.is_negative() { -pixels } else { pixels };
        let n = children.len() as i32;
        let delta_for_others =
            (-(resize_amount as f64) / (n as f64 - 1.0)).floor() as i32;

        let mut pending: Vec<Rect> = Vec::with_capacity(children.len());
        let mut total = 0;
        for (i, &child) in children.iter().enumerate() {
            let mut rect = self.get(child).map(|c| c.effective_area()).unwrap_or_default();
            let delta = if child == id { resize_amount } else { delta_for_others };
            if is_vertical {
                rect.height += delta;
                if i != 0 {
                    let prev = &pending[i - 1];
                    rect.y = prev.y + prev.height;
                }
                if rect.height <= MIN_TILE_HEIGHT {
                    warn!("resize rejected: sibling would fall below the minimum height");
                    return false;
                }
                total += rect.height;
            } else {
                rect.width += delta;
                if i != 0 {
                    let prev = &pending[i - 1];
                    rect.x = prev.x + prev.width;
                }
                if rect.width <= MIN_TILE_WIDTH {
                    warn!("resize rejected: sibling would fall below the minimum width");
                    return false;
                }
                total += rect.width;
            }
            pending.push(rect);
        }

        // Rounding slack goes to the last sibling.
        if let Some(last) = pending.last_mut() {
            if is_vertical {
                last.height += parent_area.height - total;
            } else {
                last.width += parent_area.width - total;
            }
        }

        for (child, rect) in children.iter().zip(pending) {
            self.set_logical_area(*child, rect);
        }
        true
    }

    /// Apply a layout scheme request for `id`. A single child (or a child of
    /// a stacked parent) mutates the parent in place; otherwise `id` is
    /// wrapped in a new parent carrying the requested scheme.
    pub fn handle_layout_scheme(&mut self, id: ContainerId, scheme: LayoutScheme) -> bool {
        let Some(mut parent) = self.parent_of(id) else {
            warn!(%id, "handle_layout_scheme: container has no parent");
            return false;
        };

        let (child_count, current) = match self.get(parent).and_then(|node| node.as_parent()) {
            Some(data) => (data.children.len(), data.scheme),
            None => return false,
        };

        if child_count > 1 && !current.is_stacked_kind() {
            parent = self.convert_to_parent(id, parent);
        }

        if let Some(data) = self.get_mut(parent).and_then(|node| node.as_parent_mut()) {
            data.scheme = scheme;
        }
        self.distribute_equally(parent);
        true
    }

    /// Wrap `id` in a fresh parent occupying its tile, at its old index.
    fn convert_to_parent(&mut self, id: ContainerId, old_parent: ContainerId) -> ContainerId {
        let index = self.index_of(old_parent, id).unwrap_or(0);
        let area = self.get(id).map(|n| n.effective_area()).unwrap_or_default();
        let (workspace, anchored) = self
            .get(id)
            .map(|n| (n.workspace, n.anchored))
            .unwrap_or((None, true));

        let wrapper = self.create_parent(area, LayoutScheme::Horizontal, workspace, anchored);
        if let Some(data) = self
            .get_mut(old_parent)
            .and_then(|node| node.as_parent_mut())
        {
            data.children[index] = wrapper;
        }
        if let Some(node) = self.get_mut(wrapper) {
            node.parent = Some(old_parent);
        }
        if let Some(data) = self.get_mut(wrapper).and_then(|node| node.as_parent_mut()) {
            data.children.push(id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = Some(wrapper);
        }
        wrapper
    }

    /// The deepest anchored leaf whose tile contains `(x, y)` under `root`.
    pub fn leaf_at(&self, root: ContainerId, x: i32, y: i32) -> Option<ContainerId> {
        let mut found = None;
        self.for_each_in_subtree(root, &mut |node: &Container| {
            if found.is_none() && node.is_leaf() && node.effective_area().contains_point(x, y) {
                found = Some(node.id());
            }
        });
        found
    }

    /// Flush a leaf's pending logical area into its committed one, returning
    /// `(previous_visible, next_visible, with_animations)` when geometry
    /// actually moved.
    pub fn take_pending_area(
        &mut self,
        id: ContainerId,
        config: &Config,
    ) -> Option<(Rect, Rect, bool)> {
        let committed = self.get(id)?.logical_area;
        let previous = self.visible_area_of(id, committed, config);
        let node = self.get_mut(id)?;
        let leaf = node.as_leaf_mut()?;
        let next = leaf.next_logical_area.take()?;
        let with_animations = leaf.next_with_animations;
        leaf.next_with_animations = true;
        node.logical_area = next;
        let next_visible = self.visible_area(id, config);
        Some((previous, next_visible, with_animations))
    }
}
