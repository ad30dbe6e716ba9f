//! Shared scaffolding for unit tests: a compositor wired to the stub
//! window controller with animations disabled, so geometry lands
//! synchronously.

use crate::compositor::{Allocation, AnimationEvent, Compositor};
use crate::config::Config;
use crate::container::ContainerId;
use crate::geometry::Rect;
use crate::output::OutputId;
use crate::window::{StubWindowController, WindowHandle, WindowMeta, WindowSpec};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

pub struct TestRig {
    pub compositor: Compositor,
    pub stub: Arc<StubWindowController>,
    pub animation_rx: Receiver<AnimationEvent>,
}

/// A compositor with one 1280x720 output and gapless, animation-free
/// config.
pub fn rig() -> (TestRig, OutputId) {
    let mut config = Config::with_animations_disabled();
    config.gaps.inner_x = 0;
    config.gaps.inner_y = 0;
    config.border.size = 0;
    rig_with_config(config)
}

pub fn rig_with_config(config: Config) -> (TestRig, OutputId) {
    let stub = Arc::new(StubWindowController::new());
    let (mut compositor, animation_rx) = Compositor::new(config, stub.clone());
    let output = compositor.advise_output_create("HDMI-1", Rect::new(0, 0, 1280, 720));
    (
        TestRig {
            compositor,
            stub,
            animation_rx,
        },
        output,
    )
}

/// Open a tiled window through the two-phase placement flow.
pub fn open_window(compositor: &mut Compositor, raw: u64) -> ContainerId {
    let mut spec = WindowSpec::new(WindowHandle(raw), Rect::new(0, 0, 400, 300)).with_meta(
        WindowMeta {
            app_id: format!("app-{raw}"),
            title: format!("window {raw}"),
            pid: raw as i32,
        },
    );
    let allocation = compositor.allocate_position(&mut spec, false);
    assert!(matches!(allocation, Allocation::Tiled { .. }));
    compositor.confirm_window(&spec, allocation)
}

/// Open a floating window via the explicit floating hint.
pub fn open_floating(compositor: &mut Compositor, raw: u64, rect: Rect) -> ContainerId {
    let mut spec = WindowSpec::new(WindowHandle(raw), rect);
    let allocation = compositor.allocate_position(&mut spec, true);
    assert!(matches!(allocation, Allocation::Floating { .. }));
    compositor.confirm_window(&spec, allocation)
}
