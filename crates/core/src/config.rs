//! Typed configuration consumed by the core.
//!
//! The core does not discover, read or watch configuration files; an outer
//! layer hands it a [`Config`], either built in code or deserialized from a
//! TOML string via [`Config::from_toml_str`]. Every field has a default so
//! partial documents work.

use crate::animation::{AnimationDefinition, AnimationKind, EaseFunction};
use serde::Deserialize;

/// Number of workspaces reachable through `request_first_available` before
/// falling back to workspace 0.
pub const NUM_DEFAULT_WORKSPACES: i32 = 10;

/// The minimum size any tile may be resized down to.
pub const MIN_TILE_WIDTH: i32 = 50;
pub const MIN_TILE_HEIGHT: i32 = 50;

/// Events that can carry their own animation definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimateableEvent {
    WindowOpen,
    WindowMove,
    WindowClose,
    WorkspaceSwitch,
}

/// Gap configuration. Inner gaps are split between neighbors, so each shared
/// edge loses half of the configured value per side.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    pub inner_x: i32,
    pub inner_y: i32,
}

impl Default for GapConfig {
    fn default() -> Self {
        GapConfig {
            inner_x: 10,
            inner_y: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    pub size: i32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        BorderConfig { size: 0 }
    }
}

/// Per-event animation settings plus the global enable switch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub enabled: bool,
    pub window_open: AnimationDefinition,
    pub window_move: AnimationDefinition,
    pub window_close: AnimationDefinition,
    pub workspace_switch: AnimationDefinition,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            enabled: true,
            window_open: AnimationDefinition {
                kind: AnimationKind::Grow,
                ease: EaseFunction::EaseOutExpo,
                duration_seconds: 0.25,
                ..Default::default()
            },
            window_move: AnimationDefinition {
                kind: AnimationKind::Slide,
                ease: EaseFunction::EaseOutExpo,
                duration_seconds: 0.25,
                ..Default::default()
            },
            window_close: AnimationDefinition {
                kind: AnimationKind::Shrink,
                ease: EaseFunction::EaseOutExpo,
                duration_seconds: 0.25,
                ..Default::default()
            },
            workspace_switch: AnimationDefinition {
                kind: AnimationKind::Slide,
                ease: EaseFunction::EaseOutExpo,
                duration_seconds: 0.375,
                ..Default::default()
            },
        }
    }
}

/// Modifier-gated pointer services.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    pub enabled: bool,
    /// Modifier mask that must be held to begin a drag.
    pub modifiers: u32,
}

impl Default for DragConfig {
    fn default() -> Self {
        DragConfig {
            enabled: true,
            modifiers: modifiers::META,
        }
    }
}

/// Modifier masks as delivered by the display-server runtime.
pub mod modifiers {
    pub const SHIFT: u32 = 1 << 0;
    pub const CTRL: u32 = 1 << 1;
    pub const ALT: u32 = 1 << 2;
    pub const META: u32 = 1 << 3;
}

/// Root configuration object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gaps: GapConfig,
    pub border: BorderConfig,
    pub animations: AnimationConfig,
    pub drag: DragConfig,
    /// Modifier mask for the lightweight move service.
    pub move_modifiers: Option<u32>,
}

impl Config {
    /// Parse a TOML document. Unknown keys are ignored, missing keys take
    /// their defaults.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(s)?)
    }

    /// A configuration with animations disabled, used widely in tests so
    /// geometry assertions see final positions immediately.
    pub fn with_animations_disabled() -> Config {
        let mut config = Config::default();
        config.animations.enabled = false;
        config
    }

    pub fn animations_enabled(&self) -> bool {
        self.animations.enabled
    }

    pub fn animation_definition(&self, event: AnimateableEvent) -> AnimationDefinition {
        match event {
            AnimateableEvent::WindowOpen => self.animations.window_open.clone(),
            AnimateableEvent::WindowMove => self.animations.window_move.clone(),
            AnimateableEvent::WindowClose => self.animations.window_close.clone(),
            AnimateableEvent::WorkspaceSwitch => self.animations.workspace_switch.clone(),
        }
    }

    pub fn move_modifiers(&self) -> u32 {
        self.move_modifiers.unwrap_or(modifiers::META)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.animations.enabled);
        assert_eq!(config.gaps.inner_x, 10);
        assert_eq!(config.border.size, 0);
        assert_eq!(
            config.animations.window_move.kind,
            AnimationKind::Slide
        );
    }

    #[test]
    fn parses_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [gaps]
            inner_x = 0
            inner_y = 0

            [animations]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.gaps.inner_x, 0);
        assert!(!config.animations.enabled);
        // Untouched sections keep their defaults.
        assert_eq!(config.animations.workspace_switch.duration_seconds, 0.375);
    }

    #[test]
    fn parses_animation_override() {
        let config = Config::from_toml_str(
            r#"
            [animations.window_open]
            kind = "slide"
            ease = "ease_out_bounce"
            duration_seconds = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.animations.window_open.kind, AnimationKind::Slide);
        assert_eq!(
            config.animations.window_open.ease,
            EaseFunction::EaseOutBounce
        );
    }
}
