//! Workspace bookkeeping: id allocation, global ordering, the back-and-forth
//! slot and the observer registrar.
//!
//! Workspaces themselves are owned by their outputs; the manager only holds
//! what must be global across outputs. The focus/switch flows live on the
//! compositor, which drives this state and broadcasts through the registrar.

use super::{Workspace, WorkspaceId};
use crate::config::NUM_DEFAULT_WORKSPACES;
use std::collections::HashMap;
use std::sync::Arc;

/// Broadcast to subscribers whenever the workspace set or focus changes.
/// The IPC layer republishes these to its clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    Created(WorkspaceId),
    Removed(WorkspaceId),
    Focused {
        prev: Option<WorkspaceId>,
        current: WorkspaceId,
    },
}

pub trait WorkspaceObserver: Send + Sync {
    fn on_workspace_event(&self, event: &WorkspaceEvent);
}

/// Fan-out list of workspace observers. Notification happens with the
/// command lock held, after the state change it describes.
#[derive(Default)]
pub struct WorkspaceObserverRegistrar {
    observers: Vec<Arc<dyn WorkspaceObserver>>,
}

impl WorkspaceObserverRegistrar {
    pub fn register(&mut self, observer: Arc<dyn WorkspaceObserver>) {
        self.observers.push(observer);
    }

    pub fn advise_created(&self, id: WorkspaceId) {
        self.broadcast(&WorkspaceEvent::Created(id));
    }

    pub fn advise_removed(&self, id: WorkspaceId) {
        self.broadcast(&WorkspaceEvent::Removed(id));
    }

    pub fn advise_focused(&self, prev: Option<WorkspaceId>, current: WorkspaceId) {
        self.broadcast(&WorkspaceEvent::Focused { prev, current });
    }

    fn broadcast(&self, event: &WorkspaceEvent) {
        for observer in &self.observers {
            observer.on_workspace_event(event);
        }
    }
}

/// Global workspace state: the id counter, the previously selected
/// workspace used by `back_and_forth`, and the observer registrar.
#[derive(Default)]
pub struct WorkspaceManager {
    next_id: u32,
    /// The workspace focused before the current one.
    pub last_selected: Option<WorkspaceId>,
    pub registrar: WorkspaceObserverRegistrar,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        WorkspaceManager::default()
    }

    pub fn allocate_id(&mut self) -> WorkspaceId {
        self.next_id += 1;
        WorkspaceId(self.next_id)
    }

    /// The lowest free workspace number in `1..NUM_DEFAULT_WORKSPACES`, or 0
    /// when all of them are taken.
    pub fn first_available_num(workspaces: &HashMap<WorkspaceId, Workspace>) -> Option<i32> {
        for candidate in 1..NUM_DEFAULT_WORKSPACES {
            if !workspaces.values().any(|ws| ws.num() == Some(candidate)) {
                return Some(candidate);
            }
        }
        if !workspaces.values().any(|ws| ws.num() == Some(0)) {
            return Some(0);
        }
        None
    }

    /// All workspaces in global order: numbered ones first sorted by number,
    /// then named ones in creation order.
    pub fn sorted(workspaces: &HashMap<WorkspaceId, Workspace>) -> Vec<WorkspaceId> {
        let mut ids: Vec<_> = workspaces.keys().copied().collect();
        ids.sort_by_key(|id| {
            let workspace = &workspaces[id];
            match workspace.num() {
                Some(num) => (0, num, id.0),
                None => (1, 0, id.0),
            }
        });
        ids
    }

    /// Compare two workspaces for an output's sorted list.
    pub fn ordering(a: &Workspace, b: &Workspace) -> std::cmp::Ordering {
        match (a.num(), b.num()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id().0.cmp(&b.id().0),
        }
    }
}
