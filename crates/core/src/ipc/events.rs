//! Event fan-out from the compositor to IPC clients.
//!
//! Observers run with the command lock held, so they only translate the
//! event into a JSON payload and push it into a broadcast channel; the
//! per-client tasks filter by subscription mask and write frames.

use super::protocol::IpcType;
use crate::compositor::CompositorObserver;
use crate::container::ContainerId;
use crate::workspace::{WorkspaceEvent, WorkspaceObserver};
use serde_json::json;
use tokio::sync::broadcast;

/// One event push: the high-bit type code plus its JSON payload.
#[derive(Debug, Clone)]
pub struct IpcEvent {
    pub event_type: IpcType,
    pub payload: serde_json::Value,
}

pub struct EventBroadcaster {
    sender: broadcast::Sender<IpcEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        EventBroadcaster { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IpcEvent> {
        self.sender.subscribe()
    }

    pub fn send(&self, event_type: IpcType, payload: serde_json::Value) {
        // Zero receivers is fine; nobody has subscribed yet.
        let _ = self.sender.send(IpcEvent {
            event_type,
            payload,
        });
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        EventBroadcaster::new()
    }
}

/// Bridges compositor-side observers onto the broadcast channel. Registered
/// both as a [`CompositorObserver`] and a [`WorkspaceObserver`].
pub struct EventForwarder {
    broadcaster: std::sync::Arc<EventBroadcaster>,
}

impl EventForwarder {
    pub fn new(broadcaster: std::sync::Arc<EventBroadcaster>) -> Self {
        EventForwarder { broadcaster }
    }

    fn window_event(&self, change: &str, id: ContainerId) {
        self.broadcaster.send(
            IpcType::EventWindow,
            json!({
                "change": change,
                "container": { "id": id.as_u64() },
            }),
        );
    }
}

impl CompositorObserver for EventForwarder {
    fn on_window_created(&self, id: ContainerId) {
        self.window_event("new", id);
    }

    fn on_window_closed(&self, id: ContainerId) {
        self.window_event("close", id);
    }

    fn on_window_focused(&self, id: ContainerId) {
        self.window_event("focus", id);
    }

    fn on_mode_changed(&self, name: &'static str) {
        self.broadcaster
            .send(IpcType::EventMode, json!({ "change": name }));
    }
}

impl WorkspaceObserver for EventForwarder {
    fn on_workspace_event(&self, event: &WorkspaceEvent) {
        let payload = match event {
            WorkspaceEvent::Created(id) => json!({
                "change": "init",
                "current": { "id": id.0 },
            }),
            WorkspaceEvent::Removed(id) => json!({
                "change": "empty",
                "current": { "id": id.0 },
            }),
            WorkspaceEvent::Focused { prev, current } => json!({
                "change": "focus",
                "current": { "id": current.0 },
                "old": prev.map(|id| json!({ "id": id.0 })),
            }),
        };
        self.broadcaster.send(IpcType::EventWorkspace, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceId;

    #[tokio::test]
    async fn workspace_events_reach_subscribers() {
        let broadcaster = std::sync::Arc::new(EventBroadcaster::new());
        let mut rx = broadcaster.subscribe();
        let forwarder = EventForwarder::new(broadcaster.clone());

        forwarder.on_workspace_event(&WorkspaceEvent::Focused {
            prev: Some(WorkspaceId(1)),
            current: WorkspaceId(2),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, IpcType::EventWorkspace);
        assert_eq!(event.payload["change"], "focus");
        assert_eq!(event.payload["current"]["id"], 2);
    }

    #[tokio::test]
    async fn mode_events_carry_the_mode_name() {
        let broadcaster = std::sync::Arc::new(EventBroadcaster::new());
        let mut rx = broadcaster.subscribe();
        let forwarder = EventForwarder::new(broadcaster.clone());

        forwarder.on_mode_changed("resize");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, IpcType::EventMode);
        assert_eq!(event.payload["change"], "resize");
    }
}
