//! Core of the mosaic tiling window manager: the container tree model, the
//! workspace/output placement engine, the animation pipeline and the IPC
//! command layer that drives them.
//!
//! The display server itself is an external collaborator. It delivers
//! window and output events as plain data and receives placement, state,
//! stacking and clipping calls through the [`window::WindowController`]
//! trait; rendering consumes the per-frame snapshot published by
//! [`render::RenderDataManager`].

pub mod animation;
pub mod compositor;
pub mod config;
pub mod container;
pub mod controller;
pub mod drag;
pub mod error;
pub mod geometry;
pub mod ipc;
pub mod output;
pub mod render;
pub mod scratchpad;
pub mod state;
pub mod window;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_support;

pub use compositor::Compositor;
pub use controller::CommandController;
pub use error::CoreError;
