//! The UNIX-domain IPC server speaking the framed i3 protocol.
//!
//! Each accepted client gets a read loop (requests) and an event loop
//! (subscription pushes) sharing one writer. Requests dispatch into the
//! command controller; replies reuse the request's type code. Shutdown
//! sends every client a shutdown event before tearing the socket down.

use super::events::{EventBroadcaster, EventForwarder};
use super::executor::IpcCommandExecutor;
use super::protocol::{self, IpcType};
use crate::controller::CommandController;
use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{debug, error, info, warn};

/// Default socket path: `$XDG_RUNTIME_DIR/mosaic-wm-<pid>.sock`.
pub fn default_socket_path() -> PathBuf {
    let runtime_dir =
        std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    Path::new(&runtime_dir).join(format!("mosaic-wm-{}.sock", std::process::id()))
}

pub struct IpcServer {
    controller: CommandController,
    executor: Arc<IpcCommandExecutor>,
    broadcaster: Arc<EventBroadcaster>,
    socket_path: PathBuf,
    shutdown: Arc<Notify>,
}

impl IpcServer {
    /// Build a server and wire the event forwarder into the compositor's
    /// observer registrars.
    pub fn new(controller: CommandController, executor: IpcCommandExecutor) -> Self {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let forwarder = Arc::new(EventForwarder::new(broadcaster.clone()));
        controller.register_observer(forwarder.clone());
        controller.with(|core| {
            core.workspace_manager.registrar.register(forwarder);
        });

        IpcServer {
            controller,
            executor: Arc::new(executor),
            broadcaster,
            socket_path: default_socket_path(),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn broadcaster(&self) -> Arc<EventBroadcaster> {
        self.broadcaster.clone()
    }

    /// Accept clients until [`IpcServer::shutdown`] fires.
    pub async fn serve(&self) -> Result<()> {
        let _ = std::fs::remove_file(&self.socket_path);
        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("binding IPC socket at {:?}", self.socket_path))?;
        info!(path = ?self.socket_path, "IPC listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            debug!("IPC client connected");
                            let controller = self.controller.clone();
                            let executor = self.executor.clone();
                            let broadcaster = self.broadcaster.clone();
                            let events = self.broadcaster.subscribe();
                            tokio::spawn(async move {
                                if let Err(err) =
                                    handle_client(stream, controller, executor, broadcaster, events)
                                        .await
                                {
                                    debug!("IPC client closed: {err:#}");
                                }
                            });
                        }
                        Err(err) => {
                            error!("IPC accept failed: {err}");
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    break;
                }
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        info!("IPC server stopped");
        Ok(())
    }

    /// Emit the shutdown event and stop accepting. Existing client tasks
    /// drain the event and then fail out of their read loops as the
    /// process exits.
    pub fn shutdown(&self) {
        self.broadcaster
            .send(IpcType::EventShutdown, json!({ "change": "exit" }));
        self.shutdown.notify_waiters();
    }
}

async fn handle_client(
    stream: UnixStream,
    controller: CommandController,
    executor: Arc<IpcCommandExecutor>,
    broadcaster: Arc<EventBroadcaster>,
    mut events: broadcast::Receiver<super::events::IpcEvent>,
) -> Result<()> {
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(Mutex::new(writer));
    let subscriptions = Arc::new(AtomicU32::new(0));

    // Event pusher: forwards subscribed events; shutdown goes to everyone.
    let event_writer = writer.clone();
    let event_subscriptions = subscriptions.clone();
    let pusher = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "IPC client lagged behind the event stream");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            let mask = event_subscriptions.load(Ordering::SeqCst);
            let wanted = event.event_type == IpcType::EventShutdown
                || mask & event.event_type.subscription_bit() != 0;
            if !wanted {
                continue;
            }

            let payload = event.payload.to_string();
            let mut writer = event_writer.lock().await;
            if protocol::write_message(&mut *writer, event.event_type, &payload)
                .await
                .is_err()
            {
                break;
            }
            if event.event_type == IpcType::EventShutdown {
                break;
            }
        }
    });

    let result: Result<()> = async {
        loop {
            let (message_type, payload) = protocol::read_message(&mut reader).await?;

            let reply = match message_type {
                IpcType::Command => {
                    let results = executor.run(&payload);
                    serde_json::to_string(&results)?
                }
                IpcType::GetWorkspaces => controller.workspaces_json().to_string(),
                IpcType::GetOutputs => controller.outputs_json().to_string(),
                IpcType::GetTree => controller.tree_json().to_string(),
                IpcType::GetBindingState => controller.binding_state_json().to_string(),
                IpcType::Subscribe => {
                    let requested: Vec<String> =
                        serde_json::from_str(&payload).unwrap_or_default();
                    let mut mask = subscriptions.load(Ordering::SeqCst);
                    let mut ok = true;
                    for name in &requested {
                        match IpcType::event_from_name(name) {
                            Some(event_type) => mask |= event_type.subscription_bit(),
                            None => {
                                warn!(name, "subscribe: unknown event");
                                ok = false;
                            }
                        }
                    }
                    subscriptions.store(mask, Ordering::SeqCst);
                    json!({ "success": ok }).to_string()
                }
                IpcType::SendTick => {
                    // The tick event carries the sender's payload verbatim,
                    // broadcast before the acknowledgement is written.
                    broadcaster.send(
                        IpcType::EventTick,
                        json!({ "first": false, "payload": payload }),
                    );
                    json!({ "success": true }).to_string()
                }
                other => {
                    debug!(?other, "unsupported IPC request");
                    json!({ "success": false, "error": "unsupported request type" }).to_string()
                }
            };

            let mut writer = writer.lock().await;
            protocol::write_message(&mut *writer, message_type, &reply).await?;
        }
    }
    .await;

    pusher.abort();
    result
}
