//! Render-data publication: the per-window snapshot the renderer consumes
//! each frame.
//!
//! The list lives behind its own mutex so animation ticks and the renderer
//! never contend on the compositor lock. Nothing here may call back into
//! the compositor; the lock discipline is publish-only.

use crate::geometry::Mat4;
use crate::window::WindowHandle;
use std::sync::Mutex;

/// What the renderer needs to know about one window.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderData {
    pub window: WindowHandle,
    pub needs_outline: bool,
    pub is_focused: bool,
    /// The window's own animated transform.
    pub transform: Mat4,
    /// The owning output/workspace transform (workspace switch slides).
    pub workspace_transform: Mat4,
}

impl RenderData {
    fn new(window: WindowHandle) -> Self {
        RenderData {
            window,
            needs_outline: false,
            is_focused: false,
            transform: Mat4::identity(),
            workspace_transform: Mat4::identity(),
        }
    }
}

/// Mutex-guarded list of per-window render data.
pub struct RenderDataManager {
    data: Mutex<Vec<RenderData>>,
}

impl RenderDataManager {
    pub fn new() -> Self {
        RenderDataManager {
            data: Mutex::new(Vec::with_capacity(48)),
        }
    }

    pub fn add(&self, window: WindowHandle, needs_outline: bool) {
        let mut data = self.data.lock().unwrap();
        if data.iter().any(|entry| entry.window == window) {
            return;
        }
        let mut entry = RenderData::new(window);
        entry.needs_outline = needs_outline;
        data.push(entry);
    }

    pub fn remove(&self, window: WindowHandle) {
        let mut data = self.data.lock().unwrap();
        data.retain(|entry| entry.window != window);
    }

    pub fn transform_change(&self, window: WindowHandle, transform: Mat4) {
        let mut data = self.data.lock().unwrap();
        if let Some(entry) = data.iter_mut().find(|entry| entry.window == window) {
            entry.transform = transform;
        }
    }

    pub fn workspace_transform_change(&self, window: WindowHandle, transform: Mat4) {
        let mut data = self.data.lock().unwrap();
        if let Some(entry) = data.iter_mut().find(|entry| entry.window == window) {
            entry.workspace_transform = transform;
        }
    }

    pub fn focus_change(&self, window: WindowHandle, is_focused: bool) {
        let mut data = self.data.lock().unwrap();
        if let Some(entry) = data.iter_mut().find(|entry| entry.window == window) {
            entry.is_focused = is_focused;
        }
    }

    /// Copy the current snapshot out for the renderer.
    pub fn snapshot(&self) -> Vec<RenderData> {
        self.data.lock().unwrap().clone()
    }
}

impl Default for RenderDataManager {
    fn default() -> Self {
        RenderDataManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_per_window() {
        let manager = RenderDataManager::new();
        manager.add(WindowHandle(1), true);
        manager.add(WindowHandle(1), true);
        assert_eq!(manager.snapshot().len(), 1);
    }

    #[test]
    fn transform_and_focus_updates_land_in_the_snapshot() {
        let manager = RenderDataManager::new();
        manager.add(WindowHandle(1), false);
        manager.transform_change(WindowHandle(1), Mat4::translation(5.0, 0.0));
        manager.focus_change(WindowHandle(1), true);

        let snapshot = manager.snapshot();
        assert_eq!(snapshot[0].transform, Mat4::translation(5.0, 0.0));
        assert!(snapshot[0].is_focused);
    }

    #[test]
    fn remove_clears_the_entry() {
        let manager = RenderDataManager::new();
        manager.add(WindowHandle(1), false);
        manager.remove(WindowHandle(1));
        assert!(manager.snapshot().is_empty());
    }
}
