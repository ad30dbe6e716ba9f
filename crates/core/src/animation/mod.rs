//! Frame-timed animation pipeline.
//!
//! The [`Animator`] holds a queue of in-flight animations addressed by
//! [`AnimationHandle`], a process-unique integer handed out through
//! [`Animator::register_animateable`]. Addressing by handle rather than by
//! reference keeps cancellation safe when the animated container is
//! destroyed mid-flight.
//!
//! Each tick accumulates elapsed wall time into a lag counter and steps the
//! queue once per 16 ms timestep, FIFO in append order. Step results are
//! delivered through the per-animation [`AnimationSink`]; sinks are expected
//! to enqueue work (for example over a channel) and must not take locks.

pub mod easing;

pub use easing::{ease, EaseFunction};

use crate::geometry::{Mat4, Rect};
use serde::Deserialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Instant;
use tracing::warn;

/// Unique handle used to address animations across a container's lifetime.
pub type AnimationHandle = u32;

/// Reserved for containers that were never registered.
pub const NONE_ANIMATION_HANDLE: AnimationHandle = 0;

/// Seconds per fixed animation step.
pub const TIMESTEP_SECONDS: f32 = 0.016;

/// How an animation interpolates its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    /// Interpolate position along `to - from`, the clip size between the two
    /// sizes, and emit a transform scaling the committed client size toward
    /// the target.
    Slide,
    /// Scale up from nothing, anchored at the window center.
    Grow,
    /// Scale down to nothing, anchored at the window center.
    Shrink,
    /// Complete immediately at progress 1.
    Disabled,
}

/// Shape of one animation: kind, curve, duration and the tunable curve
/// constants (bounce `n1`/`d1`, back `c1`/`c2`/`c3`, elastic `c4`/`c5`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnimationDefinition {
    pub kind: AnimationKind,
    pub ease: EaseFunction,
    pub duration_seconds: f32,
    pub n1: f32,
    pub d1: f32,
    pub c1: f32,
    pub c2: f32,
    pub c3: f32,
    pub c4: f32,
    pub c5: f32,
}

impl Default for AnimationDefinition {
    fn default() -> Self {
        let c1 = 1.70158_f32;
        AnimationDefinition {
            kind: AnimationKind::Disabled,
            ease: EaseFunction::Linear,
            duration_seconds: 0.25,
            n1: 7.5625,
            d1: 2.75,
            c1,
            c2: c1 * 1.525,
            c3: c1 + 1.0,
            c4: (2.0 * std::f32::consts::PI) / 3.0,
            c5: (2.0 * std::f32::consts::PI) / 4.5,
        }
    }
}

/// A fractional 2D value emitted by the interpolator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }
}

/// One tick's output for one animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationStepResult {
    pub handle: AnimationHandle,
    pub is_complete: bool,
    /// The clip area to apply while the animation runs.
    pub clip_area: Rect,
    pub position: Option<Vec2>,
    pub size: Option<Vec2>,
    pub transform: Option<Mat4>,
}

impl AnimationStepResult {
    /// The result describing an already-finished move to `to`.
    pub fn completed(handle: AnimationHandle, to: Rect) -> Self {
        AnimationStepResult {
            handle,
            is_complete: true,
            clip_area: to,
            position: Some(Vec2::new(to.x as f32, to.y as f32)),
            size: Some(Vec2::new(to.width as f32, to.height as f32)),
            transform: Some(Mat4::identity()),
        }
    }
}

/// Receives step results. Implementations must only enqueue; taking locks
/// from a sink deadlocks the ticker.
pub trait AnimationSink: Send {
    fn on_step(&mut self, result: &AnimationStepResult);
}

impl<F: FnMut(&AnimationStepResult) + Send> AnimationSink for F {
    fn on_step(&mut self, result: &AnimationStepResult) {
        self(result)
    }
}

fn percent_complete(target: f32, real: f32) -> f32 {
    if target == 0.0 {
        return 1.0;
    }
    let percent = real / target;
    if percent.is_infinite() || percent > 1.0 {
        1.0
    } else {
        percent
    }
}

/// Scale of the clip area relative to the final size at progress `p`.
fn interpolate_scale(p: f32, start: f32, end: f32) -> f32 {
    let diff = end - start;
    if diff == 0.0 {
        return 1.0;
    }
    let current = start + diff * p;
    current / end
}

/// Scale relative to the size the client has actually committed. While the
/// client still shows the old size this scales from that; once the commit
/// lands the same interpolation scales the new size back down.
fn interpolate_scale_committed(p: f32, start: f32, end: f32, real: f32) -> f32 {
    let diff = end - start;
    if diff == 0.0 {
        return 1.0;
    }
    let current = start + diff * p;
    current / real
}

struct SlideStep {
    position: Vec2,
    clip_size: Vec2,
    transform: Mat4,
}

fn slide(p: f32, from: &Rect, to: &Rect, committed: &Vec2) -> SlideStep {
    let dx = (to.x - from.x) as f32 * p;
    let dy = (to.y - from.y) as f32 * p;

    let clip_scale_x = interpolate_scale(p, from.width as f32, to.width as f32);
    let clip_scale_y = interpolate_scale(p, from.height as f32, to.height as f32);

    let real_scale_x =
        interpolate_scale_committed(p, from.width as f32, to.width as f32, committed.x);
    let real_scale_y =
        interpolate_scale_committed(p, from.height as f32, to.height as f32, committed.y);

    SlideStep {
        position: Vec2::new(from.x as f32 + dx, from.y as f32 + dy),
        clip_size: Vec2::new(
            to.width as f32 * clip_scale_x,
            to.height as f32 * clip_scale_y,
        ),
        transform: Mat4::scaling(real_scale_x, real_scale_y),
    }
}

/// A single queued animation.
pub struct Animation {
    handle: AnimationHandle,
    definition: AnimationDefinition,
    from: Rect,
    to: Rect,
    clip_area: Rect,
    /// The size the client last committed; slide scales relative to it.
    committed_size: Vec2,
    runtime_seconds: f32,
}

impl Animation {
    /// Build an animation from `from` to `to` for a container currently at
    /// `current`. For slides, the runtime is seeded with how far along the
    /// move `current` already is, so an interrupted slide resumes in place
    /// instead of snapping back.
    pub fn new(
        handle: AnimationHandle,
        definition: AnimationDefinition,
        from: Rect,
        to: Rect,
        current: Rect,
    ) -> Self {
        let mut animation = Animation {
            handle,
            definition,
            from: current,
            to,
            clip_area: current,
            committed_size: Vec2::new(current.width as f32, current.height as f32),
            runtime_seconds: 0.0,
        };

        if animation.definition.kind == AnimationKind::Slide {
            let percent_x =
                percent_complete((to.x - from.x) as f32, (current.x - from.x) as f32);
            let percent_y =
                percent_complete((to.y - from.y) as f32, (current.y - from.y) as f32);
            let percent_w = percent_complete(
                (to.width - from.width) as f32,
                (current.width - from.width) as f32,
            );
            let percent_h = percent_complete(
                (to.height - from.height) as f32,
                (current.height - from.height) as f32,
            );
            let percentage = percent_x
                .min(percent_y)
                .min(percent_w)
                .min(percent_h)
                .clamp(0.0, 1.0);
            animation.runtime_seconds = percentage * animation.definition.duration_seconds;
        }

        animation
    }

    pub fn handle(&self) -> AnimationHandle {
        self.handle
    }

    /// Update the committed client size mid-animation.
    pub fn set_committed_size(&mut self, width: f32, height: f32) {
        self.committed_size = Vec2::new(width, height);
    }

    /// The synchronous first frame, emitted at append time.
    pub fn init(&self) -> AnimationStepResult {
        match self.definition.kind {
            AnimationKind::Grow => AnimationStepResult {
                handle: self.handle,
                is_complete: false,
                clip_area: self.clip_area,
                position: None,
                size: None,
                transform: Some(Mat4::zero()),
            },
            AnimationKind::Shrink => AnimationStepResult {
                handle: self.handle,
                is_complete: false,
                clip_area: self.clip_area,
                position: None,
                size: None,
                transform: Some(Mat4::identity()),
            },
            AnimationKind::Slide => {
                // A slide resizes immediately and fakes the in-between frames
                // with position and transform interpolation.
                let step = slide(0.0, &self.from, &self.to, &self.committed_size);
                AnimationStepResult {
                    handle: self.handle,
                    is_complete: false,
                    clip_area: self.clip_area,
                    position: Some(step.position),
                    size: Some(Vec2::new(self.to.width as f32, self.to.height as f32)),
                    transform: Some(step.transform),
                }
            }
            AnimationKind::Disabled => AnimationStepResult::completed(self.handle, self.to),
        }
    }

    /// Advance by one fixed timestep.
    pub fn step(&mut self) -> AnimationStepResult {
        self.runtime_seconds += TIMESTEP_SECONDS;
        let t = self.runtime_seconds / self.definition.duration_seconds;

        if self.runtime_seconds >= self.definition.duration_seconds {
            return AnimationStepResult::completed(self.handle, self.to);
        }

        match self.definition.kind {
            AnimationKind::Slide => {
                let p = ease(&self.definition, t);
                let step = slide(p, &self.from, &self.to, &self.committed_size);
                self.clip_area = Rect::new(
                    step.position.x as i32,
                    step.position.y as i32,
                    step.clip_size.x as i32,
                    step.clip_size.y as i32,
                );
                AnimationStepResult {
                    handle: self.handle,
                    is_complete: false,
                    clip_area: self.clip_area,
                    position: Some(step.position),
                    size: None,
                    transform: Some(step.transform),
                }
            }
            AnimationKind::Grow => {
                let p = ease(&self.definition, t);
                let transform = Mat4::scale_about(
                    p,
                    p,
                    self.to.width as f32 / 2.0,
                    self.to.height as f32 / 2.0,
                );
                AnimationStepResult {
                    handle: self.handle,
                    is_complete: false,
                    clip_area: self.to,
                    position: None,
                    size: None,
                    transform: Some(transform),
                }
            }
            AnimationKind::Shrink => {
                let p = 1.0 - ease(&self.definition, t);
                let transform = Mat4::scale_about(
                    p,
                    p,
                    self.to.width as f32 / 2.0,
                    self.to.height as f32 / 2.0,
                );
                AnimationStepResult {
                    handle: self.handle,
                    is_complete: false,
                    clip_area: self.to,
                    position: None,
                    size: None,
                    transform: Some(transform),
                }
            }
            AnimationKind::Disabled => AnimationStepResult::completed(self.handle, self.to),
        }
    }
}

struct QueuedAnimation {
    animation: Animation,
    sink: Box<dyn AnimationSink>,
    complete: bool,
}

struct AnimatorInner {
    queued: Vec<QueuedAnimation>,
    lag_seconds: f32,
    running: bool,
}

/// Manages the animation queue.
///
/// At most one animation exists per handle; appending for a handle that
/// already has one erases the previous animation first.
pub struct Animator {
    inner: Mutex<AnimatorInner>,
    idle: Condvar,
    next_handle: AtomicU32,
}

impl Animator {
    pub fn new() -> Self {
        Animator {
            inner: Mutex::new(AnimatorInner {
                queued: Vec::new(),
                lag_seconds: 0.0,
                running: true,
            }),
            idle: Condvar::new(),
            next_handle: AtomicU32::new(1),
        }
    }

    /// Animateable components must register before they can be animated.
    /// Handles are never reused.
    pub fn register_animateable(&self) -> AnimationHandle {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    /// Queue `animation`, erasing any prior animation with the same handle.
    /// The initial step runs synchronously so the caller observes the
    /// starting frame before the next tick.
    pub fn append(&self, animation: Animation, mut sink: Box<dyn AnimationSink>) {
        let init = animation.init();
        let mut inner = self.inner.lock().unwrap();
        inner
            .queued
            .retain(|queued| queued.animation.handle() != animation.handle());
        sink.on_step(&init);
        if !init.is_complete {
            inner.queued.push(QueuedAnimation {
                animation,
                sink,
                complete: false,
            });
        }
        drop(inner);
        self.idle.notify_one();
    }

    /// Drop the animation addressed by `handle`, if any. No completion step
    /// is emitted.
    pub fn remove_by_handle(&self, handle: AnimationHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.queued.retain(|queued| queued.animation.handle() != handle);
    }

    /// Update the committed client size for an in-flight animation.
    pub fn set_committed_size(&self, handle: AnimationHandle, width: f32, height: f32) {
        let mut inner = self.inner.lock().unwrap();
        for queued in &mut inner.queued {
            if queued.animation.handle() == handle {
                queued.animation.set_committed_size(width, height);
            }
        }
    }

    pub fn has_animations(&self) -> bool {
        !self.inner.lock().unwrap().queued.is_empty()
    }

    /// Accumulate `dt_seconds` of real time and run fixed steps while enough
    /// lag has built up. Within a step, animations advance in FIFO append
    /// order; completed ones are dropped after their final result is
    /// delivered.
    pub fn tick(&self, dt_seconds: f32) {
        let mut inner = self.inner.lock().unwrap();
        if inner.queued.is_empty() {
            inner.lag_seconds = 0.0;
            return;
        }

        inner.lag_seconds += dt_seconds;
        while inner.lag_seconds >= TIMESTEP_SECONDS {
            inner.lag_seconds -= TIMESTEP_SECONDS;
            for queued in &mut inner.queued {
                let result = queued.animation.step();
                queued.sink.on_step(&result);
                queued.complete = result.is_complete;
            }
            inner.queued.retain(|queued| !queued.complete);
            if inner.queued.is_empty() {
                inner.lag_seconds = 0.0;
                break;
            }
        }
    }

    fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.running = false;
        drop(inner);
        self.idle.notify_all();
    }
}

impl Default for Animator {
    fn default() -> Self {
        Animator::new()
    }
}

/// Drives [`Animator::tick`] from a dedicated helper thread, sleeping on a
/// condition variable while the queue is empty.
pub struct AnimatorLoop {
    animator: std::sync::Arc<Animator>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl AnimatorLoop {
    pub fn new(animator: std::sync::Arc<Animator>) -> Self {
        AnimatorLoop {
            animator,
            thread: None,
        }
    }

    pub fn start(&mut self) {
        if self.thread.is_some() {
            warn!("animator loop is already running");
            return;
        }

        let animator = self.animator.clone();
        self.thread = Some(std::thread::spawn(move || {
            let mut last = Instant::now();
            loop {
                {
                    let mut inner = animator.inner.lock().unwrap();
                    if !inner.running {
                        return;
                    }
                    if inner.queued.is_empty() {
                        inner = animator
                            .idle
                            .wait_while(inner, |inner| inner.running && inner.queued.is_empty())
                            .unwrap();
                        if !inner.running {
                            return;
                        }
                        last = Instant::now();
                    }
                }

                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f32();
                last = now;
                animator.tick(dt);
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
        }));
    }

    pub fn stop(&mut self) {
        self.animator.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for AnimatorLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn slide_definition(duration: f32) -> AnimationDefinition {
        AnimationDefinition {
            kind: AnimationKind::Slide,
            ease: EaseFunction::Linear,
            duration_seconds: duration,
            ..Default::default()
        }
    }

    #[test]
    fn handles_are_unique_and_nonzero() {
        let animator = Animator::new();
        let a = animator.register_animateable();
        let b = animator.register_animateable();
        assert_ne!(a, NONE_ANIMATION_HANDLE);
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn linear_slide_midpoint_and_completion() {
        // Scenario: slide {0,0,W,H} -> {600,0,W,H}, linear, 1s. At 0.5s the
        // position should be ~{300,0} and incomplete; at >= 1s complete at
        // exactly {600,0}.
        let from = Rect::new(0, 0, 400, 300);
        let to = Rect::new(600, 0, 400, 300);
        let mut animation = Animation::new(1, slide_definition(1.0), from, to, from);

        let steps_to_half = (0.5 / TIMESTEP_SECONDS) as usize;
        let mut last = animation.init();
        for _ in 0..steps_to_half {
            last = animation.step();
        }
        assert!(!last.is_complete);
        let position = last.position.unwrap();
        assert!((position.x - 300.0).abs() < 600.0 * TIMESTEP_SECONDS * 1.5);
        assert_eq!(position.y, 0.0);

        let remaining = (1.0 / TIMESTEP_SECONDS) as usize;
        for _ in 0..remaining {
            last = animation.step();
            if last.is_complete {
                break;
            }
        }
        assert!(last.is_complete);
        assert_eq!(last.position, Some(Vec2::new(600.0, 0.0)));
        assert_eq!(last.transform, Some(Mat4::identity()));
    }

    #[test]
    fn slide_seeds_runtime_from_current_geometry() {
        // A slide interrupted halfway resumes at the current position rather
        // than snapping back to `from`.
        let from = Rect::new(0, 0, 100, 100);
        let to = Rect::new(100, 0, 100, 100);
        let current = Rect::new(50, 0, 100, 100);
        let animation = Animation::new(1, slide_definition(1.0), from, to, current);
        assert!((animation.runtime_seconds - 0.5).abs() < 1e-5);
    }

    #[test]
    fn disabled_completes_immediately() {
        let to = Rect::new(10, 20, 30, 40);
        let animation = Animation::new(
            1,
            AnimationDefinition::default(),
            Rect::new(0, 0, 30, 40),
            to,
            Rect::new(0, 0, 30, 40),
        );
        let init = animation.init();
        assert!(init.is_complete);
        assert_eq!(init.position, Some(Vec2::new(10.0, 20.0)));
    }

    #[test]
    fn grow_first_frame_is_zero_scale() {
        let rect = Rect::new(0, 0, 200, 100);
        let definition = AnimationDefinition {
            kind: AnimationKind::Grow,
            ease: EaseFunction::Linear,
            duration_seconds: 0.5,
            ..Default::default()
        };
        let animation = Animation::new(7, definition, rect, rect, rect);
        let init = animation.init();
        assert!(!init.is_complete);
        assert_eq!(init.transform, Some(Mat4::zero()));
    }

    #[test]
    fn append_replaces_existing_animation_for_handle() {
        let animator = Animator::new();
        let handle = animator.register_animateable();
        let from = Rect::new(0, 0, 100, 100);

        let (tx, rx) = mpsc::channel();
        let sink_tx = tx.clone();
        animator.append(
            Animation::new(handle, slide_definition(1.0), from, Rect::new(500, 0, 100, 100), from),
            Box::new(move |result: &AnimationStepResult| {
                let _ = sink_tx.send(result.clone());
            }),
        );
        animator.append(
            Animation::new(handle, slide_definition(1.0), from, Rect::new(0, 500, 100, 100), from),
            Box::new(move |result: &AnimationStepResult| {
                let _ = tx.send(result.clone());
            }),
        );

        // Initial frames from both appends.
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());

        // Only the second animation remains queued.
        animator.tick(TIMESTEP_SECONDS);
        let step = rx.try_recv().unwrap();
        assert_eq!(step.handle, handle);
        let position = step.position.unwrap();
        assert_eq!(position.x, 0.0);
        assert!(position.y > 0.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn remove_by_handle_is_silent() {
        let animator = Animator::new();
        let handle = animator.register_animateable();
        let from = Rect::new(0, 0, 100, 100);
        let (tx, rx) = mpsc::channel();
        animator.append(
            Animation::new(handle, slide_definition(1.0), from, Rect::new(500, 0, 100, 100), from),
            Box::new(move |result: &AnimationStepResult| {
                let _ = tx.send(result.clone());
            }),
        );
        let _ = rx.try_recv(); // initial frame

        animator.remove_by_handle(handle);
        animator.tick(1.0);
        assert!(rx.try_recv().is_err());
        assert!(!animator.has_animations());
    }

    #[test]
    fn tick_steps_in_fifo_order() {
        let animator = Animator::new();
        let first = animator.register_animateable();
        let second = animator.register_animateable();
        let from = Rect::new(0, 0, 100, 100);
        let to = Rect::new(100, 0, 100, 100);

        let (tx, rx) = mpsc::channel();
        for handle in [first, second] {
            let tx = tx.clone();
            animator.append(
                Animation::new(handle, slide_definition(1.0), from, to, from),
                Box::new(move |result: &AnimationStepResult| {
                    let _ = tx.send(result.handle);
                }),
            );
        }
        let _ = rx.try_recv();
        let _ = rx.try_recv();

        animator.tick(TIMESTEP_SECONDS);
        assert_eq!(rx.try_recv().unwrap(), first);
        assert_eq!(rx.try_recv().unwrap(), second);
    }

    #[test]
    fn animator_loop_runs_animations_to_completion() {
        let animator = std::sync::Arc::new(Animator::new());
        let mut ticker = AnimatorLoop::new(animator.clone());
        ticker.start();

        let handle = animator.register_animateable();
        let from = Rect::new(0, 0, 100, 100);
        let (tx, rx) = mpsc::channel();
        animator.append(
            Animation::new(handle, slide_definition(0.05), from, Rect::new(50, 0, 100, 100), from),
            Box::new(move |result: &AnimationStepResult| {
                let _ = tx.send(result.clone());
            }),
        );

        // The loop wakes from idle and steps the slide to its end.
        let deadline = std::time::Duration::from_secs(5);
        let mut complete = false;
        while let Ok(result) = rx.recv_timeout(deadline) {
            if result.is_complete {
                complete = true;
                break;
            }
        }
        assert!(complete);
        ticker.stop();
    }

    #[test]
    fn tick_accumulates_lag_into_multiple_steps() {
        let animator = Animator::new();
        let handle = animator.register_animateable();
        let from = Rect::new(0, 0, 100, 100);
        let (tx, rx) = mpsc::channel();
        animator.append(
            Animation::new(handle, slide_definition(10.0), from, Rect::new(1000, 0, 100, 100), from),
            Box::new(move |result: &AnimationStepResult| {
                let _ = tx.send(result.clone());
            }),
        );
        let _ = rx.try_recv();

        // Four timesteps of lag in one tick -> four steps.
        animator.tick(TIMESTEP_SECONDS * 4.0);
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 4);
    }
}
