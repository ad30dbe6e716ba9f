//! i3-compatible IPC: framed UNIX-socket protocol, command-string parser,
//! executor, JSON reply builders and event fan-out.

pub mod command;
pub mod events;
pub mod executor;
pub mod protocol;
pub mod reply;
pub mod server;

pub use command::{
    IpcCommand, IpcCommandParser, IpcCommandType, IpcParseResult, IpcScope, IpcScopeType,
};
pub use events::{EventBroadcaster, EventForwarder, IpcEvent};
pub use executor::{IpcCommandExecutor, IpcValidationResult};
pub use protocol::IpcType;
pub use server::{default_socket_path, IpcServer};
