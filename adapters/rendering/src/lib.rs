#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Colony Defence adapters.
//!
//! The view layer never draws pixels itself. It issues write-only commands
//! through the [`Canvas`] trait and refers to drawn shapes only through the
//! opaque [`ShapeHandle`] values a backend returns.

pub mod layout;

use anyhow::Result as AnyResult;
use glam::Vec2;
use serde::Deserialize;
use std::{error::Error, fmt, time::Duration};

pub use layout::{LayoutConfig, PanelSlot, PlayAreaLayout};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Plain white, used for idle frames.
    pub const WHITE: Self = Self::from_rgb_u8(0xff, 0xff, 0xff);
    /// Grey used for unaffordable control-panel entries.
    pub const GRAY: Self = Self::from_rgb_u8(0xbe, 0xbe, 0xbe);
    /// Blue used for the armed entry and flooded places.
    pub const BLUE: Self = Self::from_rgb_u8(0x00, 0x00, 0xff);
    /// Black.
    pub const BLACK: Self = Self::from_rgb_u8(0x00, 0x00, 0x00);
    /// Dark green used for projectile outlines.
    pub const DARK_GREEN: Self = Self::from_rgb_u8(0x00, 0x64, 0x00);
    /// Default leaf fill.
    pub const FOREST_GREEN: Self = Self::from_rgb_u8(0x22, 0x8b, 0x22);

    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Parses a `#rrggbb` hex string.
    pub fn from_hex(value: &str) -> Result<Self, ColorParseError> {
        let digits = value
            .strip_prefix('#')
            .filter(|digits| digits.len() == 6 && digits.is_ascii())
            .ok_or_else(|| ColorParseError(value.to_owned()))?;
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| ColorParseError(value.to_owned()))
        };

        Ok(Self::from_rgb_u8(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// Error returned when a color string is not of the form `#rrggbb`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorParseError(String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a #rrggbb color", self.0)
    }
}

impl Error for ColorParseError {}

/// Backend-opaque identifier of one drawn shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeHandle(u64);

impl ShapeHandle {
    /// Wraps a backend-allocated identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Key naming an image asset. Its interpretation belongs to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    /// Creates an asset key from any string-like value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrows the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Point of a text shape that its position refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAnchor {
    /// The position is the top-left corner of the text.
    TopLeft,
    /// The position is the centre of the text.
    Center,
}

/// Outline and fill used when drawing a polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolygonStyle {
    /// Outline color.
    pub outline: Color,
    /// Fill color.
    pub fill: Color,
    /// Whether the backend should smooth the outline into a curve.
    pub smooth: bool,
}

impl PolygonStyle {
    /// Creates a straight-edged style.
    #[must_use]
    pub const fn new(outline: Color, fill: Color) -> Self {
        Self {
            outline,
            fill,
            smooth: false,
        }
    }

    /// Requests a smoothed outline.
    #[must_use]
    pub const fn smoothed(mut self) -> Self {
        self.smooth = true;
        self
    }
}

/// Result of blocking for a click.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClickWait {
    /// Position of the click, `None` when the wait timed out.
    pub position: Option<Vec2>,
    /// Time spent waiting.
    pub elapsed: Duration,
}

impl ClickWait {
    /// A wait that ended with a click.
    #[must_use]
    pub const fn clicked(position: Vec2, elapsed: Duration) -> Self {
        Self {
            position: Some(position),
            elapsed,
        }
    }

    /// A wait that ran out of time.
    #[must_use]
    pub const fn timed_out(elapsed: Duration) -> Self {
        Self {
            position: None,
            elapsed,
        }
    }
}

/// Persistent drawing surface driven by the view layer.
///
/// Every operation may fail when the backend loses its surface; callers treat
/// such failures as fatal.
pub trait Canvas {
    /// Draws an image with its top-left corner at `position`. When `behind`
    /// is set the image is stacked below that shape.
    fn draw_image(
        &mut self,
        position: Vec2,
        asset: &AssetKey,
        behind: Option<ShapeHandle>,
    ) -> AnyResult<ShapeHandle>;

    /// Draws a closed polygon.
    fn draw_polygon(&mut self, points: &[Vec2], style: PolygonStyle) -> AnyResult<ShapeHandle>;

    /// Draws a text label.
    fn draw_text(
        &mut self,
        text: &str,
        position: Vec2,
        anchor: TextAnchor,
    ) -> AnyResult<ShapeHandle>;

    /// Replaces the content of a text label.
    fn edit_text(&mut self, shape: ShapeHandle, text: &str) -> AnyResult<()>;

    /// Changes the fill color of a polygon.
    fn set_fill(&mut self, shape: ShapeHandle, color: Color) -> AnyResult<()>;

    /// Moves a shape so that its anchor reaches `position` after `duration`.
    fn slide_shape(
        &mut self,
        shape: ShapeHandle,
        position: Vec2,
        duration: Duration,
    ) -> AnyResult<()>;

    /// Replaces the points of a polygon.
    fn reshape(&mut self, shape: ShapeHandle, points: &[Vec2]) -> AnyResult<()>;

    /// Removes a shape from the canvas.
    fn clear(&mut self, shape: ShapeHandle) -> AnyResult<()>;

    /// Blocks until the player clicks or `timeout` passes. `None` waits
    /// indefinitely.
    fn wait_for_click(&mut self, timeout: Option<Duration>) -> AnyResult<ClickWait>;
}

/// Moves a point `distance` units along `angle` radians.
#[must_use]
pub fn translate_point(point: Vec2, angle: f32, distance: f32) -> Vec2 {
    point + Vec2::from_angle(angle) * distance
}

/// Corners of an axis-aligned rectangle in drawing order.
#[must_use]
pub fn rectangle_points(origin: Vec2, width: f32, height: f32) -> [Vec2; 4] {
    [
        origin,
        origin + Vec2::new(width, 0.0),
        origin + Vec2::new(width, height),
        origin + Vec2::new(0.0, height),
    ]
}
