#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless canvas for Colony Defence.
//!
//! The canvas keeps every shape in memory, records every call it receives and
//! replays a script of clicks against a virtual clock. It backs the command
//! line adapter and every integration test that needs a rendering surface.

use anyhow::{bail, Result};
use colony_defence_rendering::{
    AssetKey, Canvas, ClickWait, Color, PolygonStyle, ShapeHandle, TextAnchor,
};
use glam::Vec2;
use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

/// Click delivered `delay` after the wait that receives it started.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScriptedClick {
    /// Time between the start of the wait and the click.
    pub delay: Duration,
    /// Position of the click.
    pub position: Vec2,
}

impl ScriptedClick {
    /// Creates a scripted click.
    #[must_use]
    pub const fn new(delay: Duration, position: Vec2) -> Self {
        Self { delay, position }
    }
}

/// Content of a shape held by the canvas.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    /// An image.
    Image {
        /// Asset drawn.
        asset: AssetKey,
    },
    /// A polygon.
    Polygon {
        /// Current points.
        points: Vec<Vec2>,
        /// Style supplied when the polygon was drawn.
        style: PolygonStyle,
    },
    /// A text label.
    Text {
        /// Current text.
        text: String,
    },
}

/// Shape currently on the canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeRecord {
    /// Content of the shape.
    pub kind: ShapeKind,
    /// Anchor position after the most recent slide.
    pub position: Vec2,
    /// Fill override applied through [`Canvas::set_fill`].
    pub fill: Option<Color>,
    /// Shape this one was stacked behind when drawn.
    pub behind: Option<ShapeHandle>,
}

/// Call received by the canvas, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasCall {
    /// An image was drawn.
    DrawImage {
        /// Handle allocated for the image.
        shape: ShapeHandle,
        /// Asset drawn.
        asset: AssetKey,
        /// Position of the image.
        position: Vec2,
        /// Shape the image was stacked behind.
        behind: Option<ShapeHandle>,
    },
    /// A polygon was drawn.
    DrawPolygon {
        /// Handle allocated for the polygon.
        shape: ShapeHandle,
    },
    /// A text label was drawn.
    DrawText {
        /// Handle allocated for the label.
        shape: ShapeHandle,
        /// Initial text.
        text: String,
    },
    /// A text label was edited.
    EditText {
        /// Edited label.
        shape: ShapeHandle,
        /// New text.
        text: String,
    },
    /// A fill color changed.
    SetFill {
        /// Recolored shape.
        shape: ShapeHandle,
        /// New fill.
        color: Color,
    },
    /// A shape slid to a new position.
    Slide {
        /// Moved shape.
        shape: ShapeHandle,
        /// Destination.
        position: Vec2,
        /// Length of the slide.
        duration: Duration,
    },
    /// A polygon received new points.
    Reshape {
        /// Reshaped polygon.
        shape: ShapeHandle,
    },
    /// A shape was removed.
    Clear {
        /// Removed shape.
        shape: ShapeHandle,
    },
    /// The caller blocked for input.
    Wait {
        /// Requested timeout.
        timeout: Option<Duration>,
        /// Outcome of the wait.
        result: ClickWait,
    },
}

/// In-memory canvas driven by scripted clicks.
#[derive(Debug, Default)]
pub struct HeadlessCanvas {
    next_handle: u64,
    shapes: BTreeMap<ShapeHandle, ShapeRecord>,
    calls: Vec<CanvasCall>,
    clicks: VecDeque<ScriptedClick>,
    clock: Duration,
    draws_before_failure: Option<usize>,
}

impl HeadlessCanvas {
    /// Creates an empty canvas without scripted clicks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a canvas that will deliver the provided clicks in order.
    #[must_use]
    pub fn with_clicks(clicks: impl IntoIterator<Item = ScriptedClick>) -> Self {
        Self {
            clicks: clicks.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Appends a click to the script.
    pub fn push_click(&mut self, delay: Duration, position: Vec2) {
        self.clicks.push_back(ScriptedClick::new(delay, position));
    }

    /// Makes every drawing call fail once `draws` further draws succeeded,
    /// simulating a lost surface.
    pub fn fail_after_draws(&mut self, draws: usize) {
        self.draws_before_failure = Some(draws);
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> &[CanvasCall] {
        &self.calls
    }

    /// Drains the recorded calls.
    pub fn take_calls(&mut self) -> Vec<CanvasCall> {
        std::mem::take(&mut self.calls)
    }

    /// Looks up a shape still on the canvas.
    #[must_use]
    pub fn shape(&self, shape: ShapeHandle) -> Option<&ShapeRecord> {
        self.shapes.get(&shape)
    }

    /// Number of shapes currently on the canvas.
    #[must_use]
    pub fn live_shapes(&self) -> usize {
        self.shapes.len()
    }

    /// Current text of a label.
    #[must_use]
    pub fn text_of(&self, shape: ShapeHandle) -> Option<&str> {
        match &self.shapes.get(&shape)?.kind {
            ShapeKind::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Finds the label whose text starts with `prefix`.
    #[must_use]
    pub fn find_text(&self, prefix: &str) -> Option<&str> {
        self.shapes.values().find_map(|record| match &record.kind {
            ShapeKind::Text { text } if text.starts_with(prefix) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Virtual time consumed by waits.
    #[must_use]
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Number of scripted clicks not delivered yet.
    #[must_use]
    pub fn pending_clicks(&self) -> usize {
        self.clicks.len()
    }

    fn allocate(&mut self, record: ShapeRecord) -> Result<ShapeHandle> {
        if let Some(remaining) = self.draws_before_failure.as_mut() {
            if *remaining == 0 {
                bail!("drawing surface is no longer available");
            }
            *remaining -= 1;
        }
        self.next_handle += 1;
        let handle = ShapeHandle::new(self.next_handle);
        let _ = self.shapes.insert(handle, record);
        Ok(handle)
    }

    fn record_mut(&mut self, shape: ShapeHandle) -> Result<&mut ShapeRecord> {
        match self.shapes.get_mut(&shape) {
            Some(record) => Ok(record),
            None => bail!("shape {} is not on the canvas", shape.get()),
        }
    }
}

impl Canvas for HeadlessCanvas {
    fn draw_image(
        &mut self,
        position: Vec2,
        asset: &AssetKey,
        behind: Option<ShapeHandle>,
    ) -> Result<ShapeHandle> {
        if let Some(behind) = behind {
            let _ = self.record_mut(behind)?;
        }
        let shape = self.allocate(ShapeRecord {
            kind: ShapeKind::Image {
                asset: asset.clone(),
            },
            position,
            fill: None,
            behind,
        })?;
        self.calls.push(CanvasCall::DrawImage {
            shape,
            asset: asset.clone(),
            position,
            behind,
        });
        Ok(shape)
    }

    fn draw_polygon(&mut self, points: &[Vec2], style: PolygonStyle) -> Result<ShapeHandle> {
        let position = points.first().copied().unwrap_or(Vec2::ZERO);
        let shape = self.allocate(ShapeRecord {
            kind: ShapeKind::Polygon {
                points: points.to_vec(),
                style,
            },
            position,
            fill: None,
            behind: None,
        })?;
        self.calls.push(CanvasCall::DrawPolygon { shape });
        Ok(shape)
    }

    fn draw_text(&mut self, text: &str, position: Vec2, _anchor: TextAnchor) -> Result<ShapeHandle> {
        let shape = self.allocate(ShapeRecord {
            kind: ShapeKind::Text {
                text: text.to_owned(),
            },
            position,
            fill: None,
            behind: None,
        })?;
        self.calls.push(CanvasCall::DrawText {
            shape,
            text: text.to_owned(),
        });
        Ok(shape)
    }

    fn edit_text(&mut self, shape: ShapeHandle, text: &str) -> Result<()> {
        match &mut self.record_mut(shape)?.kind {
            ShapeKind::Text { text: current } => text.clone_into(current),
            _ => bail!("shape {} is not a text label", shape.get()),
        }
        self.calls.push(CanvasCall::EditText {
            shape,
            text: text.to_owned(),
        });
        Ok(())
    }

    fn set_fill(&mut self, shape: ShapeHandle, color: Color) -> Result<()> {
        self.record_mut(shape)?.fill = Some(color);
        self.calls.push(CanvasCall::SetFill { shape, color });
        Ok(())
    }

    fn slide_shape(&mut self, shape: ShapeHandle, position: Vec2, duration: Duration) -> Result<()> {
        self.record_mut(shape)?.position = position;
        self.calls.push(CanvasCall::Slide {
            shape,
            position,
            duration,
        });
        Ok(())
    }

    fn reshape(&mut self, shape: ShapeHandle, points: &[Vec2]) -> Result<()> {
        let record = self.record_mut(shape)?;
        match &mut record.kind {
            ShapeKind::Polygon { points: current, .. } => {
                *current = points.to_vec();
            }
            _ => bail!("shape {} is not a polygon", shape.get()),
        }
        record.position = points.first().copied().unwrap_or(record.position);
        self.calls.push(CanvasCall::Reshape { shape });
        Ok(())
    }

    fn clear(&mut self, shape: ShapeHandle) -> Result<()> {
        if self.shapes.remove(&shape).is_none() {
            bail!("shape {} is not on the canvas", shape.get());
        }
        self.calls.push(CanvasCall::Clear { shape });
        Ok(())
    }

    fn wait_for_click(&mut self, timeout: Option<Duration>) -> Result<ClickWait> {
        let next_delay = self.clicks.front().map(|click| click.delay);
        let result = match (next_delay, timeout) {
            (Some(delay), Some(limit)) if delay > limit => {
                if let Some(click) = self.clicks.front_mut() {
                    click.delay -= limit;
                }
                ClickWait::timed_out(limit)
            }
            (Some(_), _) => match self.clicks.pop_front() {
                Some(click) => ClickWait::clicked(click.position, click.delay),
                None => bail!("click script drained while waiting"),
            },
            (None, Some(limit)) => ClickWait::timed_out(limit),
            (None, None) => bail!("no scripted click left to end an unbounded wait"),
        };
        self.clock += result.elapsed;
        self.calls.push(CanvasCall::Wait { timeout, result });
        Ok(result)
    }
}
