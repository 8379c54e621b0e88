#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Time-parameterised procedural animation of transient shapes.
//!
//! The driver owns its own clock. Callers advance it with the time that
//! actually passed (typically the time spent waiting for input) and the
//! driver fires every frame that became due, then clears every shape whose
//! animation ended. A shape handed to [`AnimationDriver::run`] is cleared
//! exactly once, when its duration has elapsed, however many frames fired.

use std::f32::consts::PI;
use std::time::Duration;

use anyhow::{Context, Result};
use colony_defence_rendering::{translate_point, Canvas, PolygonStyle, ShapeHandle};
use glam::Vec2;
use tracing::{debug, warn};

/// Frame interval used when none is configured, roughly 30 frames per second.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_nanos(33_333_333);

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Per-task animation state threaded through every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameState {
    /// Pose the frame being generated is drawn at.
    pub current_pose: Vec2,
    /// Index of the frame being generated, starting at zero.
    pub frame_index: u32,
}

/// Produces the point set of a shape for one frame.
pub trait FrameGenerator {
    /// Returns the shape's points for the frame described by `state`.
    fn frame(&mut self, state: &FrameState) -> Vec<Vec2>;
}

impl<F> FrameGenerator for F
where
    F: FnMut(&FrameState) -> Vec<Vec2>,
{
    fn frame(&mut self, state: &FrameState) -> Vec<Vec2> {
        self(state)
    }
}

/// Spinning projectile outlines thrown by ants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProjectileShape {
    /// Four-point leaf.
    Leaf {
        /// Length of the leaf.
        length: f32,
    },
    /// Eight-point star.
    Dart {
        /// Length of the dart's long spikes.
        length: f32,
    },
}

impl ProjectileShape {
    /// Rotation applied on every frame.
    pub const SPIN_PER_FRAME: f32 = PI / 8.0;

    /// Outline of the projectile centred on `pos` and rotated by `angle`.
    #[must_use]
    pub fn points(&self, pos: Vec2, angle: f32) -> Vec<Vec2> {
        match *self {
            Self::Leaf { length } => {
                let angles = [angle - PI, angle - PI / 2.0, angle, angle + PI / 2.0];
                let distances = [length / 3.0, length / 2.0, length, length / 2.0];
                outline(pos, &angles, &distances)
            }
            Self::Dart { length } => {
                let angles = [
                    angle - PI,
                    angle - PI * 3.0 / 4.0,
                    angle - PI / 2.0,
                    angle - PI / 4.0,
                    angle,
                    angle + PI / 4.0,
                    angle + PI / 2.0,
                    angle + PI * 3.0 / 4.0,
                ];
                let spike = length / 5.0;
                let distances = [
                    length, spike, length, spike, length, spike, length, spike,
                ];
                outline(pos, &angles, &distances)
            }
        }
    }
}

fn outline(pos: Vec2, angles: &[f32], distances: &[f32]) -> Vec<Vec2> {
    angles
        .iter()
        .zip(distances)
        .map(|(angle, distance)| translate_point(pos, *angle, *distance))
        .collect()
}

impl FrameGenerator for ProjectileShape {
    fn frame(&mut self, state: &FrameState) -> Vec<Vec2> {
        let angle = Self::SPIN_PER_FRAME * state.frame_index as f32;
        self.points(state.current_pose, angle)
    }
}

struct AnimationTask {
    shape: ShapeHandle,
    generator: Box<dyn FrameGenerator>,
    state: FrameState,
    increment: Vec2,
    last_frame: u32,
    started_at: Duration,
}

impl AnimationTask {
    fn finished(&self) -> bool {
        self.state.frame_index > self.last_frame
    }

    /// Generates every frame due at `now` and returns the points of the
    /// latest one.
    fn catch_up(&mut self, now: Duration, frame_interval: Duration) -> Option<Vec<Vec2>> {
        let mut latest = None;
        while !self.finished() && self.started_at + frame_interval * self.state.frame_index <= now
        {
            latest = Some(self.generator.frame(&self.state));
            self.state.current_pose += self.increment;
            self.state.frame_index += 1;
        }
        latest
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ScheduledClear {
    shape: ShapeHandle,
    due: Duration,
}

/// Drives every running animation and deferred clear.
pub struct AnimationDriver {
    clock: Duration,
    frame_interval: Duration,
    tasks: Vec<AnimationTask>,
    clears: Vec<ScheduledClear>,
}

impl std::fmt::Debug for AnimationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationDriver")
            .field("clock", &self.clock)
            .field("frame_interval", &self.frame_interval)
            .field("tasks", &self.tasks.len())
            .field("clears", &self.clears)
            .finish()
    }
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl AnimationDriver {
    /// Creates a driver that fires frames every `frame_interval`.
    #[must_use]
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            clock: Duration::ZERO,
            frame_interval: frame_interval.max(MIN_FRAME_INTERVAL),
            tasks: Vec::new(),
            clears: Vec::new(),
        }
    }

    /// Time between two frames of a task.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Time the driver has been advanced by.
    #[must_use]
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Whether no animation is running and no clear is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty() && self.clears.is_empty()
    }

    /// Number of animations still producing frames.
    #[must_use]
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Number of shapes waiting to be cleared.
    #[must_use]
    pub fn pending_clears(&self) -> usize {
        self.clears.len()
    }

    /// Animates `shape` from `start` to `end` over `duration`.
    ///
    /// The first frame is drawn immediately. The shape is cleared once
    /// `duration` has elapsed.
    pub fn run<C, G>(
        &mut self,
        canvas: &mut C,
        shape: ShapeHandle,
        start: Vec2,
        end: Vec2,
        duration: Duration,
        generator: G,
    ) -> Result<()>
    where
        C: Canvas + ?Sized,
        G: FrameGenerator + 'static,
    {
        let frames = duration.as_nanos() / self.frame_interval.as_nanos();
        let last_frame = u32::try_from(frames).unwrap_or(u32::MAX);
        let increment = if last_frame == 0 {
            Vec2::ZERO
        } else {
            (end - start) / last_frame as f32
        };
        debug!(
            shape = shape.get(),
            frames = last_frame,
            duration_ms = duration.as_millis() as u64,
            "animation_started"
        );

        let mut task = AnimationTask {
            shape,
            generator: Box::new(generator),
            state: FrameState {
                current_pose: start,
                frame_index: 0,
            },
            increment,
            last_frame,
            started_at: self.clock,
        };
        if let Some(points) = task.catch_up(self.clock, self.frame_interval) {
            canvas
                .reshape(shape, &points)
                .context("failed to draw first animation frame")?;
        }
        self.tasks.push(task);
        self.schedule_clear(shape, duration);
        Ok(())
    }

    /// Draws a projectile at `start` and throws it to `end`.
    pub fn launch<C>(
        &mut self,
        canvas: &mut C,
        projectile: ProjectileShape,
        style: PolygonStyle,
        start: Vec2,
        end: Vec2,
        duration: Duration,
    ) -> Result<ShapeHandle>
    where
        C: Canvas + ?Sized,
    {
        let shape = canvas
            .draw_polygon(&projectile.points(start, 0.0), style)
            .context("failed to draw projectile")?;
        self.run(canvas, shape, start, end, duration, projectile)?;
        Ok(shape)
    }

    /// Clears `shape` once `delay` has elapsed.
    pub fn schedule_clear(&mut self, shape: ShapeHandle, delay: Duration) {
        self.clears.push(ScheduledClear {
            shape,
            due: self.clock + delay,
        });
    }

    /// Advances the clock, firing due frames before due clears.
    pub fn advance<C>(&mut self, canvas: &mut C, elapsed: Duration) -> Result<()>
    where
        C: Canvas + ?Sized,
    {
        self.clock += elapsed;
        let now = self.clock;

        for task in &mut self.tasks {
            if let Some(points) = task.catch_up(now, self.frame_interval) {
                canvas
                    .reshape(task.shape, &points)
                    .context("failed to draw animation frame")?;
            }
        }

        let (due, pending): (Vec<_>, Vec<_>) =
            self.clears.drain(..).partition(|clear| clear.due <= now);
        self.clears = pending;
        for clear in due {
            self.tasks.retain(|task| task.shape != clear.shape);
            canvas
                .clear(clear.shape)
                .context("failed to clear finished animation")?;
        }

        self.tasks.retain(|task| !task.finished());
        Ok(())
    }

    /// Clears every outstanding shape immediately. Returns how many shapes
    /// were cleared.
    pub fn finish_all<C>(&mut self, canvas: &mut C) -> Result<usize>
    where
        C: Canvas + ?Sized,
    {
        self.tasks.clear();
        let clears = std::mem::take(&mut self.clears);
        let count = clears.len();
        for clear in clears {
            canvas
                .clear(clear.shape)
                .context("failed to clear animation during teardown")?;
        }
        Ok(count)
    }
}

impl Drop for AnimationDriver {
    fn drop(&mut self) {
        if !self.clears.is_empty() {
            warn!(
                pending = self.clears.len(),
                "animation driver dropped with shapes still on the canvas"
            );
        }
    }
}
