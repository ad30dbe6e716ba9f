//! i3-compatible IPC framing.
//!
//! Every message, in both directions, is framed as:
//!
//! ```text
//! magic(6B) = "i3-ipc"
//! length(4B, little-endian) = payload byte count
//! type(4B, little-endian)  = IpcType
//! payload(length B)        = UTF-8
//! ```
//!
//! Replies reuse the request's type code; event pushes set the high bit.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAGIC: &[u8; 6] = b"i3-ipc";
pub const HEADER_LEN: usize = 6 + 4 + 4;

/// Bit marking a type code as an event push.
pub const EVENT_BIT: u32 = 1 << 31;

/// Message type codes, matching i3/sway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum IpcType {
    Command = 0,
    GetWorkspaces = 1,
    Subscribe = 2,
    GetOutputs = 3,
    GetTree = 4,
    GetMarks = 5,
    GetBarConfig = 6,
    GetVersion = 7,
    GetBindingModes = 8,
    GetConfig = 9,
    SendTick = 10,
    Sync = 11,
    GetBindingState = 12,

    EventWorkspace = EVENT_BIT,
    EventOutput = EVENT_BIT | 1,
    EventMode = EVENT_BIT | 2,
    EventWindow = EVENT_BIT | 3,
    EventBarconfigUpdate = EVENT_BIT | 4,
    EventBinding = EVENT_BIT | 5,
    EventShutdown = EVENT_BIT | 6,
    EventTick = EVENT_BIT | 7,
}

impl IpcType {
    pub fn from_u32(raw: u32) -> Option<IpcType> {
        Some(match raw {
            0 => IpcType::Command,
            1 => IpcType::GetWorkspaces,
            2 => IpcType::Subscribe,
            3 => IpcType::GetOutputs,
            4 => IpcType::GetTree,
            5 => IpcType::GetMarks,
            6 => IpcType::GetBarConfig,
            7 => IpcType::GetVersion,
            8 => IpcType::GetBindingModes,
            9 => IpcType::GetConfig,
            10 => IpcType::SendTick,
            11 => IpcType::Sync,
            12 => IpcType::GetBindingState,
            raw if raw == EVENT_BIT => IpcType::EventWorkspace,
            raw if raw == EVENT_BIT | 1 => IpcType::EventOutput,
            raw if raw == EVENT_BIT | 2 => IpcType::EventMode,
            raw if raw == EVENT_BIT | 3 => IpcType::EventWindow,
            raw if raw == EVENT_BIT | 4 => IpcType::EventBarconfigUpdate,
            raw if raw == EVENT_BIT | 5 => IpcType::EventBinding,
            raw if raw == EVENT_BIT | 6 => IpcType::EventShutdown,
            raw if raw == EVENT_BIT | 7 => IpcType::EventTick,
            _ => return None,
        })
    }

    pub fn is_event(&self) -> bool {
        (*self as u32) & EVENT_BIT != 0
    }

    /// The name clients use in `SUBSCRIBE` payloads.
    pub fn event_name(&self) -> Option<&'static str> {
        Some(match self {
            IpcType::EventWorkspace => "workspace",
            IpcType::EventOutput => "output",
            IpcType::EventMode => "mode",
            IpcType::EventWindow => "window",
            IpcType::EventBarconfigUpdate => "barconfig_update",
            IpcType::EventBinding => "binding",
            IpcType::EventShutdown => "shutdown",
            IpcType::EventTick => "tick",
            _ => return None,
        })
    }

    pub fn event_from_name(name: &str) -> Option<IpcType> {
        Some(match name {
            "workspace" => IpcType::EventWorkspace,
            "output" => IpcType::EventOutput,
            "mode" => IpcType::EventMode,
            "window" => IpcType::EventWindow,
            "barconfig_update" => IpcType::EventBarconfigUpdate,
            "binding" => IpcType::EventBinding,
            "shutdown" => IpcType::EventShutdown,
            "tick" => IpcType::EventTick,
            _ => return None,
        })
    }

    /// Bit used in a client's subscription mask.
    pub fn subscription_bit(&self) -> u32 {
        1 << ((*self as u32) & !EVENT_BIT)
    }
}

/// Encode one frame.
pub fn encode_message(message_type: IpcType, payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut frame = Vec::with_capacity(HEADER_LEN + bytes.len());
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    frame.extend_from_slice(&(message_type as u32).to_le_bytes());
    frame.extend_from_slice(bytes);
    frame
}

/// Read one frame from `reader`. Returns `(type, payload)`.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<(IpcType, String)> {
    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .await
        .context("reading IPC header")?;
    if &header[0..6] != MAGIC {
        bail!("bad IPC magic");
    }
    let length = u32::from_le_bytes(header[6..10].try_into().unwrap()) as usize;
    let raw_type = u32::from_le_bytes(header[10..14].try_into().unwrap());
    let message_type =
        IpcType::from_u32(raw_type).with_context(|| format!("unknown IPC type {raw_type}"))?;

    let mut payload = vec![0u8; length];
    reader
        .read_exact(&mut payload)
        .await
        .context("reading IPC payload")?;
    Ok((message_type, String::from_utf8(payload)?))
}

/// Write one frame to `writer`.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message_type: IpcType,
    payload: &str,
) -> Result<()> {
    writer
        .write_all(&encode_message(message_type, payload))
        .await
        .context("writing IPC frame")?;
    writer.flush().await?;
    Ok(())
}
