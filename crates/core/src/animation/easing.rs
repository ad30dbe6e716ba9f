//! Easing curves for the animation pipeline.
//!
//! The catalog follows <https://easings.net/>: linear plus sine, quad, cubic,
//! quart, quint, expo, circ, back, elastic and bounce, each with `in`, `out`
//! and `in_out` flavors. Back, elastic and bounce read their shaping
//! constants from the [`AnimationDefinition`] so they can be tuned per event.
//!
//! An eased progress value may briefly leave `[0, 1]` (back and elastic
//! overshoot). Consumers must tolerate that.

use super::AnimationDefinition;
use serde::Deserialize;
use std::f32::consts::PI;

/// The recognized easing functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EaseFunction {
    Linear,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
}

fn ease_out_bounce(definition: &AnimationDefinition, mut x: f32) -> f32 {
    let n1 = definition.n1;
    let d1 = definition.d1;
    if x < 1.0 / d1 {
        n1 * x * x
    } else if x < 2.0 / d1 {
        x -= 1.5 / d1;
        n1 * x * x + 0.75
    } else if x < 2.5 / d1 {
        x -= 2.25 / d1;
        n1 * x * x + 0.9375
    } else {
        x -= 2.625 / d1;
        n1 * x * x + 0.984375
    }
}

/// Map raw progress `t` in `[0, 1]` to eased progress.
pub fn ease(definition: &AnimationDefinition, t: f32) -> f32 {
    match definition.ease {
        EaseFunction::Linear => t,
        EaseFunction::EaseInSine => 1.0 - ((t * PI) / 2.0).cos(),
        EaseFunction::EaseOutSine => ((t * PI) / 2.0).sin(),
        EaseFunction::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
        EaseFunction::EaseInQuad => t * t,
        EaseFunction::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
        EaseFunction::EaseInOutQuad => {
            if t < 0.5 {
                2.0 * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
            }
        }
        EaseFunction::EaseInCubic => t * t * t,
        EaseFunction::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        EaseFunction::EaseInOutCubic => {
            if t < 0.5 {
                4.0 * t * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
            }
        }
        EaseFunction::EaseInQuart => t * t * t * t,
        EaseFunction::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
        EaseFunction::EaseInOutQuart => {
            if t < 0.5 {
                8.0 * t * t * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
            }
        }
        EaseFunction::EaseInQuint => t * t * t * t * t,
        EaseFunction::EaseOutQuint => 1.0 - (1.0 - t).powi(5),
        EaseFunction::EaseInOutQuint => {
            if t < 0.5 {
                16.0 * t * t * t * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
            }
        }
        EaseFunction::EaseInExpo => {
            if t == 0.0 {
                0.0
            } else {
                2.0f32.powf(10.0 * t - 10.0)
            }
        }
        EaseFunction::EaseOutExpo => {
            if t == 1.0 {
                1.0
            } else {
                1.0 - 2.0f32.powf(-10.0 * t)
            }
        }
        EaseFunction::EaseInOutExpo => {
            if t == 0.0 {
                0.0
            } else if t == 1.0 {
                1.0
            } else if t < 0.5 {
                2.0f32.powf(20.0 * t - 10.0) / 2.0
            } else {
                (2.0 - 2.0f32.powf(-20.0 * t + 10.0)) / 2.0
            }
        }
        EaseFunction::EaseInCirc => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
        EaseFunction::EaseOutCirc => (1.0 - (t - 1.0).powi(2)).max(0.0).sqrt(),
        EaseFunction::EaseInOutCirc => {
            if t < 0.5 {
                (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) / 2.0
            } else {
                ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
            }
        }
        EaseFunction::EaseInBack => {
            definition.c3 * t * t * t - definition.c1 * t * t
        }
        EaseFunction::EaseOutBack => {
            1.0 + definition.c3 * (t - 1.0).powi(3) + definition.c1 * (t - 1.0).powi(2)
        }
        EaseFunction::EaseInOutBack => {
            let c2 = definition.c2;
            if t < 0.5 {
                ((2.0 * t).powi(2) * ((c2 + 1.0) * 2.0 * t - c2)) / 2.0
            } else {
                ((2.0 * t - 2.0).powi(2) * ((c2 + 1.0) * (t * 2.0 - 2.0) + c2) + 2.0) / 2.0
            }
        }
        EaseFunction::EaseInElastic => {
            if t == 0.0 {
                0.0
            } else if t == 1.0 {
                1.0
            } else {
                -(2.0f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * definition.c4).sin()
            }
        }
        EaseFunction::EaseOutElastic => {
            if t == 0.0 {
                0.0
            } else if t == 1.0 {
                1.0
            } else {
                2.0f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * definition.c4).sin() + 1.0
            }
        }
        EaseFunction::EaseInOutElastic => {
            if t == 0.0 {
                0.0
            } else if t == 1.0 {
                1.0
            } else if t < 0.5 {
                -(2.0f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * definition.c5).sin()) / 2.0
            } else {
                (2.0f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * definition.c5).sin()) / 2.0
                    + 1.0
            }
        }
        EaseFunction::EaseInBounce => 1.0 - ease_out_bounce(definition, 1.0 - t),
        EaseFunction::EaseOutBounce => ease_out_bounce(definition, t),
        EaseFunction::EaseInOutBounce => {
            if t < 0.5 {
                (1.0 - ease_out_bounce(definition, 1.0 - 2.0 * t)) / 2.0
            } else {
                (1.0 + ease_out_bounce(definition, 2.0 * t - 1.0)) / 2.0
            }
        }
    }
}
