//! The compositor aggregate: the container tree, outputs, workspaces, focus
//! state, scratchpad and the glue binding them to the animation pipeline
//! and the display-server runtime.
//!
//! [`Compositor`] is always driven under one lock (see
//! [`crate::controller::CommandController`]); its methods take `&mut self`
//! and never block. Animation step results arrive asynchronously over a
//! channel and are applied through [`Compositor::apply_animation_event`] on
//! the same serialized path.

mod output_ops;
mod window_ops;
mod workspace_ops;

#[cfg(test)]
mod compositor_tests;

use crate::animation::{Animation, AnimationSink, AnimationStepResult, Animator};
use crate::config::{AnimateableEvent, Config};
use crate::container::{ContainerId, ContainerTree};
use crate::geometry::{Point, Rect, Size};
use crate::output::{Output, OutputId};
use crate::render::RenderDataManager;
use crate::scratchpad::Scratchpad;
use crate::state::{CompositorState, WmMode};
use crate::window::{
    DepthLayer, WindowController, WindowHandle, WindowSpec, WindowState,
};
use crate::workspace::{Workspace, WorkspaceId, WorkspaceManager};
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// What an animation step applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationTarget {
    Container(ContainerId),
    WorkspaceSwitch {
        output: OutputId,
        to: WorkspaceId,
        from: Option<WorkspaceId>,
    },
}

/// One step result tagged with its target, shipped from the animator thread
/// to the serialized apply path.
#[derive(Debug, Clone)]
pub struct AnimationEvent {
    pub target: AnimationTarget,
    pub result: AnimationStepResult,
}

struct ChannelSink {
    target: AnimationTarget,
    tx: Sender<AnimationEvent>,
}

impl AnimationSink for ChannelSink {
    fn on_step(&mut self, result: &AnimationStepResult) {
        let _ = self.tx.send(AnimationEvent {
            target: self.target,
            result: result.clone(),
        });
    }
}

/// Observer notified of window lifecycle and mode changes, with the command
/// lock held and after the state change. The IPC layer registers one to
/// republish events to its clients.
pub trait CompositorObserver: Send + Sync {
    fn on_window_created(&self, _id: ContainerId) {}
    fn on_window_closed(&self, _id: ContainerId) {}
    fn on_window_focused(&self, _id: ContainerId) {}
    fn on_mode_changed(&self, _name: &'static str) {}
}

/// Result of the placement phase for a new window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// A tile was reserved; confirm against this pending leaf.
    Tiled { leaf: ContainerId },
    /// A single-leaf floating subtree was reserved.
    Floating { leaf: ContainerId },
    /// Shell-like surface; passes through untouched.
    Shell,
}

pub struct Compositor {
    pub config: Config,
    pub tree: ContainerTree,
    pub outputs: Vec<Output>,
    pub workspaces: HashMap<WorkspaceId, Workspace>,
    pub state: CompositorState,
    pub scratchpad: Scratchpad,
    pub workspace_manager: WorkspaceManager,
    pub windows: Arc<dyn WindowController>,
    pub render: Arc<RenderDataManager>,
    pub animator: Arc<Animator>,
    pub observers: Vec<Arc<dyn CompositorObserver>>,
    animation_tx: Sender<AnimationEvent>,
    next_output_id: u32,
}

impl Compositor {
    /// Build a compositor. The returned receiver carries animation step
    /// results; feed each into [`Compositor::apply_animation_event`] under
    /// the command lock.
    pub fn new(
        config: Config,
        windows: Arc<dyn WindowController>,
    ) -> (Self, Receiver<AnimationEvent>) {
        let (animation_tx, animation_rx) = std::sync::mpsc::channel();
        let compositor = Compositor {
            config,
            tree: ContainerTree::new(),
            outputs: Vec::new(),
            workspaces: HashMap::new(),
            state: CompositorState::new(),
            scratchpad: Scratchpad::new(),
            workspace_manager: WorkspaceManager::new(),
            windows,
            render: Arc::new(RenderDataManager::new()),
            animator: Arc::new(Animator::new()),
            observers: Vec::new(),
            animation_tx,
            next_output_id: 0,
        };
        (compositor, animation_rx)
    }

    pub(crate) fn allocate_output_id(&mut self) -> OutputId {
        self.next_output_id += 1;
        OutputId(self.next_output_id)
    }

    fn sink_for(&self, target: AnimationTarget) -> Box<dyn AnimationSink> {
        Box::new(ChannelSink {
            target,
            tx: self.animation_tx.clone(),
        })
    }

    // ---- window lifecycle -------------------------------------------------

    /// Placement phase: classify the window and reserve space for it. The
    /// spec's rect is rewritten to the reserved tile for tiled windows.
    pub fn allocate_position(&mut self, spec: &mut WindowSpec, floating_hint: bool) -> Allocation {
        if spec.is_shell_like() {
            return Allocation::Shell;
        }

        let Some(workspace_id) = self.active_workspace_id() else {
            warn!("allocate_position: no focused output; placing window unmanaged");
            return Allocation::Shell;
        };

        if floating_hint {
            let area = spec.rect;
            let Some(workspace) = self.workspaces.get_mut(&workspace_id) else {
                error!(%workspace_id, "allocate_position: active workspace is gone");
                return Allocation::Shell;
            };
            let floating = workspace.create_floating_tree(&mut self.tree, area);
            let leaf = self.tree.create_space_for_window(floating, None);
            return Allocation::Floating { leaf };
        }

        let Some(parent) = self.layout_container(workspace_id) else {
            error!(%workspace_id, "allocate_position: active workspace is gone");
            return Allocation::Shell;
        };
        let leaf = self.tree.create_space_for_window(parent, None);
        spec.rect = self.tree.visible_area(leaf, &self.config);
        Allocation::Tiled { leaf }
    }

    /// The parent new tiles land in: the focused container's parent when it
    /// lives on `workspace`, otherwise the workspace root.
    fn layout_container(&self, workspace: WorkspaceId) -> Option<ContainerId> {
        let root = self.workspaces.get(&workspace)?.root;
        let Some(focused) = self.state.focused_container() else {
            return Some(root);
        };
        if self.tree.workspace_of(focused) != Some(workspace) {
            return Some(root);
        }
        match self.tree.parent_of(focused) {
            Some(parent) if self.tree.get(parent).map(|p| p.anchored).unwrap_or(false) => {
                Some(parent)
            }
            _ => Some(root),
        }
    }

    /// Confirmation phase: bind the window to its reserved container and
    /// show it. Returns the container now answering for the window.
    pub fn confirm_window(&mut self, spec: &WindowSpec, allocation: Allocation) -> ContainerId {
        match allocation {
            Allocation::Tiled { leaf } | Allocation::Floating { leaf } => {
                self.tree.confirm_window(leaf, spec.window, spec.meta.clone());
                let handle = self.animator.register_animateable();
                if let Some(node) = self.tree.get_mut(leaf) {
                    node.animation_handle = handle;
                    if let Some(data) = node.as_leaf_mut() {
                        data.state = spec.state;
                        data.committed_size = spec.rect.size();
                    }
                }
                if matches!(allocation, Allocation::Floating { .. }) {
                    self.windows.set_depth_layer(spec.window, DepthLayer::Above);
                }
                self.render.add(spec.window, true);
                self.state.add(leaf);
                self.commit_subtree(self.tree.root_of(leaf));
                self.open_animation(leaf);
                self.handle_ready(leaf);
                for observer in &self.observers {
                    observer.on_window_created(leaf);
                }
                leaf
            }
            Allocation::Shell => {
                let workspace = self.active_workspace_id();
                let shell = self.tree.create_shell(
                    spec.window,
                    spec.meta.clone(),
                    spec.rect,
                    workspace,
                );
                self.render.add(spec.window, false);
                shell
            }
        }
    }

    /// Give the new leaf focus unless a fullscreen container holds it.
    fn handle_ready(&mut self, leaf: ContainerId) {
        self.constrain(leaf);
        let focused_fullscreen = self
            .state
            .focused_container()
            .map(|id| self.is_fullscreen(id))
            .unwrap_or(false);
        if !focused_fullscreen {
            if let Some(window) = self.tree.get(leaf).and_then(|node| node.window()) {
                self.select_active_window(Some(window));
            }
        }
    }

    /// The client committed a new size. Slide transforms scale relative to
    /// it, so an in-flight animation is updated too.
    pub fn advise_window_commit(&mut self, window: WindowHandle, size: Size) {
        let Some(id) = self.tree.container_for_window(window) else {
            return;
        };
        let handle = self
            .tree
            .get(id)
            .map(|node| node.animation_handle)
            .unwrap_or_default();
        if let Some(leaf) = self.tree.get_mut(id).and_then(|node| node.as_leaf_mut()) {
            leaf.committed_size = size;
        }
        self.animator
            .set_committed_size(handle, size.width as f32, size.height as f32);
    }

    /// Window closed by the client (or by `request_close`).
    pub fn advise_delete_window(&mut self, window: WindowHandle) {
        let Some(id) = self.tree.container_for_window(window) else {
            debug!(?window, "advise_delete_window: unknown window");
            return;
        };

        self.scratchpad.remove(id);
        let handle = self
            .tree
            .get(id)
            .map(|node| node.animation_handle)
            .unwrap_or_default();
        self.animator.remove_by_handle(handle);
        self.render.remove(window);

        let workspace_id = self.tree.workspace_of(id);
        let was_focused = self.state.focused_container() == Some(id);
        self.state.remove(id);

        if self.tree.get(id).map(|node| node.is_leaf()).unwrap_or(false) {
            let survivor = self.tree.remove_node(id);
            self.tree.destroy(id);
            if let (Some(survivor), Some(workspace_id)) = (survivor, workspace_id) {
                // A floating tree that just emptied dissolves entirely.
                let mut emptied_floating = None;
                if let Some(workspace) = self.workspaces.get_mut(&workspace_id) {
                    if workspace.floating.contains(&survivor)
                        && self.tree.children_of(survivor).is_empty()
                    {
                        workspace.floating.retain(|&f| f != survivor);
                        emptied_floating = Some(survivor);
                    }
                    workspace.last_focused = workspace
                        .last_focused
                        .filter(|&last| last != id && self.tree.contains(last));
                }
                if let Some(floating) = emptied_floating {
                    self.tree.destroy(floating);
                } else {
                    self.commit_subtree(survivor);
                }
            }
        } else {
            self.tree.destroy(id);
        }

        self.state.prune(|entry| self.tree.contains(entry));
        if was_focused {
            self.focus_next_alive(workspace_id);
        }
        for observer in &self.observers {
            observer.on_window_closed(id);
        }
    }

    fn focus_next_alive(&mut self, workspace: Option<WorkspaceId>) {
        let candidate = self.state.first_matching(|id| {
            self.tree
                .get(id)
                .map(|node| node.is_leaf() && (workspace.is_none() || node.workspace == workspace))
                .unwrap_or(false)
        });
        let window = candidate.and_then(|id| self.tree.get(id).and_then(|node| node.window()));
        self.select_active_window(window);
    }

    // ---- focus ------------------------------------------------------------

    /// Ask the runtime to focus `window` (or clear focus) and update our own
    /// bookkeeping to match.
    pub fn select_active_window(&mut self, window: Option<WindowHandle>) {
        if matches!(self.state.mode, WmMode::Resizing { .. }) {
            return;
        }
        self.windows.select_active(window);
        match window {
            Some(window) => self.advise_focus_gained(window),
            None => {
                if let Some(prev) = self.state.focused_container() {
                    self.clear_focus_flag(prev);
                    self.state.unfocus_container(prev);
                }
            }
        }
    }

    /// The runtime reports `window` gained focus.
    pub fn advise_focus_gained(&mut self, window: WindowHandle) {
        let Some(id) = self.tree.container_for_window(window) else {
            warn!(?window, "advise_focus_gained: no container for window");
            return;
        };

        if let Some(prev) = self.state.focused_container() {
            if prev != id {
                self.clear_focus_flag(prev);
            }
        }

        self.state.focus_container(id);
        if let Some(node) = self.tree.get_mut(id) {
            node.focused = true;
        }
        self.render.focus_change(window, true);

        if let Some(workspace_id) = self.tree.workspace_of(id) {
            if let Some(workspace) = self.workspaces.get_mut(&workspace_id) {
                workspace.last_focused = Some(id);
                let output = workspace.output;
                self.state.focus_output(output);
            }
        }
        for observer in &self.observers {
            observer.on_window_focused(id);
        }
    }

    fn clear_focus_flag(&mut self, id: ContainerId) {
        let window = self.tree.get(id).and_then(|node| node.window());
        if let Some(node) = self.tree.get_mut(id) {
            node.focused = false;
        }
        if let Some(window) = window {
            self.render.focus_change(window, false);
        }
    }

    /// Whether `id` is the focused container, an ancestor of it, or a member
    /// of the focused selection group.
    pub fn is_focused(&self, id: ContainerId) -> bool {
        let Some(focused) = self.state.focused_container() else {
            return false;
        };
        if focused == id {
            return true;
        }
        // Ancestors of the focused container count as focused.
        let mut current = focused;
        while let Some(parent) = self.tree.parent_of(current) {
            if parent == id {
                return true;
            }
            current = parent;
        }
        if let Some(group) = self.tree.get(focused).and_then(|node| {
            if let crate::container::ContainerKind::Group(group) = &node.kind {
                Some(group.members.clone())
            } else {
                None
            }
        }) {
            return group.contains(&id);
        }
        false
    }

    // ---- geometry commit + animation ---------------------------------------

    /// Whether the container is fullscreen now or about to be.
    pub fn is_fullscreen(&self, id: ContainerId) -> bool {
        self.tree
            .get(id)
            .and_then(|node| node.as_leaf())
            .map(|leaf| {
                leaf.state == WindowState::Fullscreen
                    || leaf.next_state == Some(WindowState::Fullscreen)
            })
            .unwrap_or(false)
    }

    /// Reapply the clip area: fullscreen and dragged windows render
    /// unclipped, everything else clips to its visible area.
    pub fn constrain(&self, id: ContainerId) {
        let Some(node) = self.tree.get(id) else { return };
        let Some(leaf) = node.as_leaf() else { return };
        let Some(window) = leaf.window else { return };
        if leaf.state == WindowState::Fullscreen || leaf.dragging {
            self.windows.noclip(window);
        } else {
            self.windows.clip(window, self.tree.visible_area(id, &self.config));
        }
    }

    /// Flush every pending leaf change under `root`: state, depth layer and
    /// geometry, the latter through the animation pipeline.
    pub fn commit_subtree(&mut self, root: ContainerId) {
        for leaf in self.tree.leaves_under(root) {
            self.commit_leaf(leaf);
        }
    }

    pub(crate) fn commit_leaf(&mut self, id: ContainerId) {
        let Some(window) = self.tree.get(id).and_then(|node| node.window()) else {
            return;
        };

        let next_state = self
            .tree
            .get_mut(id)
            .and_then(|node| node.as_leaf_mut())
            .and_then(|leaf| leaf.next_state.take());
        if let Some(state) = next_state {
            self.windows.change_state(window, state);
            if let Some(leaf) = self.tree.get_mut(id).and_then(|node| node.as_leaf_mut()) {
                leaf.state = state;
            }
            self.constrain(id);
        }

        let next_layer = self
            .tree
            .get_mut(id)
            .and_then(|node| node.as_leaf_mut())
            .and_then(|leaf| leaf.next_depth_layer.take());
        if let Some(layer) = next_layer {
            self.windows.set_depth_layer(window, layer);
        }

        if let Some((previous, mut next, with_animations)) =
            self.tree.take_pending_area(id, &self.config)
        {
            let (is_fullscreen, dragged) = self
                .tree
                .get(id)
                .and_then(|node| node.as_leaf())
                .map(|leaf| {
                    (
                        leaf.state == WindowState::Fullscreen,
                        leaf.dragging.then_some(leaf.dragged_position).flatten(),
                    )
                })
                .unwrap_or((false, None));

            // Fullscreen suppresses geometry pushed by layout updates; the
            // tile is reasserted when fullscreen is toggled off.
            if !is_fullscreen {
                if let Some(position) = dragged {
                    next.x = position.x;
                    next.y = position.y;
                }
                self.set_rectangle(id, window, previous, next, with_animations);
            }
        }
    }

    /// Move/resize `window` from `from` to `to`, animating unless disabled.
    fn set_rectangle(
        &mut self,
        id: ContainerId,
        window: WindowHandle,
        from: Rect,
        to: Rect,
        with_animations: bool,
    ) {
        let handle = self
            .tree
            .get(id)
            .map(|node| node.animation_handle)
            .unwrap_or_default();

        if !self.config.animations_enabled() || !with_animations || handle == 0 {
            let result = AnimationStepResult::completed(handle, to);
            self.apply_container_step(id, &result);
            return;
        }

        // The window's current on-screen rect: the committed client size at
        // the previous visible position.
        let current = Rect::from_point_size(
            from.top_left(),
            self.windows.committed_size(window).unwrap_or(from.size()),
        );

        let definition = self.config.animation_definition(AnimateableEvent::WindowMove);
        self.animator.append(
            Animation::new(handle, definition, from, to, current),
            self.sink_for(AnimationTarget::Container(id)),
        );
    }

    /// Play the window-open animation for a freshly confirmed leaf.
    fn open_animation(&mut self, id: ContainerId) {
        let Some(node) = self.tree.get(id) else { return };
        let handle = node.animation_handle;
        let rect = node.logical_area;
        if !self.config.animations_enabled() || handle == 0 {
            return;
        }
        let definition = self.config.animation_definition(AnimateableEvent::WindowOpen);
        self.animator.append(
            Animation::new(handle, definition, rect, rect, rect),
            self.sink_for(AnimationTarget::Container(id)),
        );
    }

    /// Apply one animation step on the serialized path.
    pub fn apply_animation_event(&mut self, event: AnimationEvent) {
        match event.target {
            AnimationTarget::Container(id) => self.apply_container_step(id, &event.result),
            AnimationTarget::WorkspaceSwitch { output, to, from } => {
                self.apply_workspace_switch_step(output, to, from, &event.result)
            }
        }
    }

    fn apply_container_step(&mut self, id: ContainerId, result: &AnimationStepResult) {
        if !self.tree.contains(id) {
            // Cancelled mid-flight; nothing to apply.
            return;
        }
        let Some(window) = self.tree.get(id).and_then(|node| node.window()) else {
            return;
        };

        if let Some(position) = result.position {
            self.windows
                .set_position(window, Point::new(position.x as i32, position.y as i32));
        }
        if let Some(size) = result.size {
            self.windows
                .set_size(window, Size::new(size.x as i32, size.y as i32));
        }
        if let Some(transform) = result.transform {
            if let Some(node) = self.tree.get_mut(id) {
                node.transform = transform;
            }
            self.render.transform_change(window, transform);
        }

        // The clip must track the animated position, otherwise overflowing
        // windows briefly ignore their compacted size.
        if result.is_complete {
            self.constrain(id);
            self.state.prune(|entry| self.tree.contains(entry));
        } else if self.tree.get(id).map(|node| node.is_leaf()).unwrap_or(false) {
            self.windows.clip(window, result.clip_area);
        } else {
            self.windows.noclip(window);
        }
    }

    // ---- show / hide -------------------------------------------------------

    /// Hide every window on `workspace`, remembering each leaf's state.
    pub(crate) fn hide_workspace(&mut self, workspace: WorkspaceId) {
        let Some(ws) = self.workspaces.get(&workspace) else { return };
        for leaf in ws.leaves(&self.tree) {
            let Some(window) = self.tree.get(leaf).and_then(|node| node.window()) else {
                continue;
            };
            if let Some(data) = self.tree.get_mut(leaf).and_then(|node| node.as_leaf_mut()) {
                if data.state != WindowState::Hidden {
                    data.before_shown_state = Some(data.state);
                }
                data.next_state = Some(WindowState::Hidden);
            }
            self.commit_leaf(leaf);
            self.windows.send_to_back(window);
        }
    }

    /// Show every window on `workspace`, restoring stashed states. Returns
    /// the fullscreen leaf if one surfaced, so callers can re-focus it.
    pub(crate) fn show_workspace(&mut self, workspace: WorkspaceId) -> Option<ContainerId> {
        let Some(ws) = self.workspaces.get(&workspace) else {
            return None;
        };
        let mut fullscreen = None;
        for leaf in ws.leaves(&self.tree) {
            let Some(window) = self.tree.get(leaf).and_then(|node| node.window()) else {
                continue;
            };
            if let Some(data) = self.tree.get_mut(leaf).and_then(|node| node.as_leaf_mut()) {
                let restored = data.before_shown_state.take().unwrap_or(WindowState::Restored);
                data.next_state = Some(restored);
            }
            self.commit_leaf(leaf);
            self.windows.raise(window);
            if self.is_fullscreen(leaf) {
                fullscreen = Some(leaf);
            }
        }
        fullscreen
    }

    // ---- shutdown ----------------------------------------------------------

    /// Ordered teardown: animations first, containers last. IPC shutdown is
    /// handled by the server, which owns the socket.
    pub fn shutdown(&mut self) {
        let ids = self.tree.ids();
        for id in ids {
            let handle = self
                .tree
                .get(id)
                .map(|node| node.animation_handle)
                .unwrap_or_default();
            if handle != 0 {
                self.animator.remove_by_handle(handle);
            }
            if let Some(window) = self.tree.get(id).and_then(|node| node.window()) {
                self.render.remove(window);
            }
        }
    }

    // ---- small queries used across the impl files --------------------------

    pub fn focused_output(&self) -> Option<&Output> {
        let id = self.state.focused_output()?;
        self.outputs.iter().find(|output| output.id() == id)
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|output| output.id() == id)
    }

    pub(crate) fn output_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.iter_mut().find(|output| output.id() == id)
    }

    /// The active workspace of the focused output.
    pub fn active_workspace_id(&self) -> Option<WorkspaceId> {
        self.focused_output().and_then(|output| output.active())
    }

    /// The focused container, dropping entries whose container died.
    pub fn focused_container(&self) -> Option<ContainerId> {
        self.state
            .first_matching(|id| self.tree.contains(id))
    }

    /// Detach the focused container from wherever it lives, preparing it for
    /// a graft elsewhere. Used by every cross-workspace/output move.
    pub(crate) fn detach_container(&mut self, id: ContainerId) -> bool {
        let Some(workspace_id) = self.tree.workspace_of(id) else {
            return false;
        };
        let root = self.tree.root_of(id);
        let Some(workspace) = self.workspaces.get_mut(&workspace_id) else {
            return false;
        };

        if workspace.floating.contains(&root) && root == id {
            // A whole floating tree moves as a unit.
            workspace.floating.retain(|&f| f != id);
            return true;
        }

        if let Some(survivor) = self.tree.remove_node(id) {
            let mut emptied_floating = None;
            if workspace.floating.contains(&survivor)
                && self.tree.children_of(survivor).is_empty()
            {
                workspace.floating.retain(|&f| f != survivor);
                emptied_floating = Some(survivor);
            }
            if let Some(floating) = emptied_floating {
                self.tree.destroy(floating);
            } else {
                self.commit_subtree(survivor);
            }
            return true;
        }

        error!(%id, "detach_container: container had no parent and was not a floating root");
        false
    }
}
