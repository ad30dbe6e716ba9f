//! The interface consumed from the display-server runtime.
//!
//! The core never talks to a display server directly. It receives window
//! creation and modification events as plain data ([`WindowSpec`]) and calls
//! back through the [`WindowController`] trait to place, restack, clip and
//! close windows. Production embeds supply the real implementation; tests
//! use [`StubWindowController`], which records every call and answers
//! queries from its own book-keeping.

use crate::geometry::{Point, Rect, Size};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Opaque identifier of a window owned by the display server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub u64);

/// The lifecycle state of a window, mirroring the runtime's state set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    Restored,
    Fullscreen,
    Maximized,
    Minimized,
    Hidden,
    Attached,
}

/// Stacking layer a window is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DepthLayer {
    Background,
    Below,
    Application,
    Above,
    AlwaysOnTop,
    Overlay,
}

/// Metadata attached to a window at creation.
#[derive(Debug, Clone, Default)]
pub struct WindowMeta {
    pub app_id: String,
    pub title: String,
    pub pid: i32,
}

/// The placement request the runtime delivers when a window is created.
/// `attached_edges`/`exclusive_rect` mark shell-like surfaces (panels,
/// docks) that bypass tiling.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub window: WindowHandle,
    pub rect: Rect,
    pub state: WindowState,
    pub meta: WindowMeta,
    pub attached_edges: Option<u32>,
    pub exclusive_rect: Option<Rect>,
}

impl WindowSpec {
    pub fn new(window: WindowHandle, rect: Rect) -> Self {
        WindowSpec {
            window,
            rect,
            state: WindowState::Restored,
            meta: WindowMeta::default(),
            attached_edges: None,
            exclusive_rect: None,
        }
    }

    pub fn with_meta(mut self, meta: WindowMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Shell-like surfaces request attached edges or an exclusive rect.
    pub fn is_shell_like(&self) -> bool {
        self.attached_edges.is_some() || self.exclusive_rect.is_some()
    }
}

/// Calls the core makes back into the display-server runtime.
///
/// Implementations must be cheap and non-blocking; the core invokes these
/// with its state lock held.
pub trait WindowController: Send + Sync {
    /// Assign a new top-left position.
    fn set_position(&self, window: WindowHandle, top_left: Point);

    /// Assign a new size.
    fn set_size(&self, window: WindowHandle, size: Size);

    /// Change the window's lifecycle state.
    fn change_state(&self, window: WindowHandle, state: WindowState);

    /// Move the window to a different stacking layer.
    fn set_depth_layer(&self, window: WindowHandle, layer: DepthLayer);

    /// Restrict rendering of the window to `area`.
    fn clip(&self, window: WindowHandle, area: Rect);

    /// Remove any clip applied by [`WindowController::clip`].
    fn noclip(&self, window: WindowHandle);

    fn raise(&self, window: WindowHandle);

    fn send_to_back(&self, window: WindowHandle);

    /// Give keyboard focus to `window`, or clear focus when `None`.
    fn select_active(&self, window: Option<WindowHandle>);

    /// Politely ask the client to close.
    fn request_close(&self, window: WindowHandle);

    /// Warp the pointer.
    fn move_cursor_to(&self, x: f32, y: f32);

    /// The committed size the client is currently presenting.
    fn committed_size(&self, window: WindowHandle) -> Option<Size>;
}

/// Every mutating call a [`StubWindowController`] records.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOp {
    SetPosition(WindowHandle, Point),
    SetSize(WindowHandle, Size),
    ChangeState(WindowHandle, WindowState),
    SetDepthLayer(WindowHandle, DepthLayer),
    Clip(WindowHandle, Rect),
    Noclip(WindowHandle),
    Raise(WindowHandle),
    SendToBack(WindowHandle),
    SelectActive(Option<WindowHandle>),
    RequestClose(WindowHandle),
    MoveCursorTo(f32, f32),
}

#[derive(Default)]
struct StubState {
    ops: Vec<WindowOp>,
    positions: HashMap<WindowHandle, Point>,
    sizes: HashMap<WindowHandle, Size>,
    states: HashMap<WindowHandle, WindowState>,
    active: Option<WindowHandle>,
}

/// Test double that applies everything to an in-memory model.
#[derive(Default)]
pub struct StubWindowController {
    state: Mutex<StubState>,
}

impl StubWindowController {
    pub fn new() -> Self {
        StubWindowController::default()
    }

    pub fn ops(&self) -> Vec<WindowOp> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().unwrap().ops.clear();
    }

    pub fn position_of(&self, window: WindowHandle) -> Option<Point> {
        self.state.lock().unwrap().positions.get(&window).copied()
    }

    pub fn size_of(&self, window: WindowHandle) -> Option<Size> {
        self.state.lock().unwrap().sizes.get(&window).copied()
    }

    pub fn state_of(&self, window: WindowHandle) -> Option<WindowState> {
        self.state.lock().unwrap().states.get(&window).copied()
    }

    pub fn active_window(&self) -> Option<WindowHandle> {
        self.state.lock().unwrap().active
    }
}

impl WindowController for StubWindowController {
    fn set_position(&self, window: WindowHandle, top_left: Point) {
        let mut state = self.state.lock().unwrap();
        state.positions.insert(window, top_left);
        state.ops.push(WindowOp::SetPosition(window, top_left));
    }

    fn set_size(&self, window: WindowHandle, size: Size) {
        let mut state = self.state.lock().unwrap();
        state.sizes.insert(window, size);
        state.ops.push(WindowOp::SetSize(window, size));
    }

    fn change_state(&self, window: WindowHandle, new_state: WindowState) {
        let mut state = self.state.lock().unwrap();
        state.states.insert(window, new_state);
        state.ops.push(WindowOp::ChangeState(window, new_state));
    }

    fn set_depth_layer(&self, window: WindowHandle, layer: DepthLayer) {
        let mut state = self.state.lock().unwrap();
        state.ops.push(WindowOp::SetDepthLayer(window, layer));
    }

    fn clip(&self, window: WindowHandle, area: Rect) {
        let mut state = self.state.lock().unwrap();
        state.ops.push(WindowOp::Clip(window, area));
    }

    fn noclip(&self, window: WindowHandle) {
        let mut state = self.state.lock().unwrap();
        state.ops.push(WindowOp::Noclip(window));
    }

    fn raise(&self, window: WindowHandle) {
        let mut state = self.state.lock().unwrap();
        state.ops.push(WindowOp::Raise(window));
    }

    fn send_to_back(&self, window: WindowHandle) {
        let mut state = self.state.lock().unwrap();
        state.ops.push(WindowOp::SendToBack(window));
    }

    fn select_active(&self, window: Option<WindowHandle>) {
        let mut state = self.state.lock().unwrap();
        state.active = window;
        state.ops.push(WindowOp::SelectActive(window));
    }

    fn request_close(&self, window: WindowHandle) {
        let mut state = self.state.lock().unwrap();
        state.ops.push(WindowOp::RequestClose(window));
    }

    fn move_cursor_to(&self, x: f32, y: f32) {
        let mut state = self.state.lock().unwrap();
        state.ops.push(WindowOp::MoveCursorTo(x, y));
    }

    fn committed_size(&self, window: WindowHandle) -> Option<Size> {
        self.state.lock().unwrap().sizes.get(&window).copied()
    }
}
