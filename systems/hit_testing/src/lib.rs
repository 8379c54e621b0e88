#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spatial registry that routes clicks to the rectangle they landed in.
//!
//! Regions are append-only for the lifetime of a session. Resolution walks
//! them in registration order and the first region containing the point wins;
//! regions are expected not to overlap, so the rule only matters for
//! deliberately overlapping layouts.

use glam::Vec2;

/// Identifier of a registered region, allocated in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(usize);

impl RegionId {
    /// Zero-based registration index of the region.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// Axis-aligned clickable rectangle bound to an action.
#[derive(Clone, Debug, PartialEq)]
pub struct ClickRegion<A> {
    origin: Vec2,
    width: f32,
    height: f32,
    action: A,
}

impl<A> ClickRegion<A> {
    /// Top-left corner of the region.
    #[must_use]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Width of the region.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Height of the region.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Action bound to the region.
    #[must_use]
    pub fn action(&self) -> &A {
        &self.action
    }

    /// Whether the point lies inside the region. All four edges are inclusive.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.width
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.height
    }
}

/// Registry of click regions.
#[derive(Clone, Debug)]
pub struct SpatialRegistry<A> {
    regions: Vec<ClickRegion<A>>,
}

impl<A> Default for SpatialRegistry<A> {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
        }
    }
}

impl<A> SpatialRegistry<A> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a region and returns its identifier.
    pub fn register(&mut self, origin: Vec2, width: f32, height: f32, action: A) -> RegionId {
        self.regions.push(ClickRegion {
            origin,
            width,
            height,
            action,
        });
        RegionId(self.regions.len() - 1)
    }

    /// First region, in registration order, that contains the point.
    #[must_use]
    pub fn hit_test(&self, point: Vec2) -> Option<RegionId> {
        self.regions
            .iter()
            .position(|region| region.contains(point))
            .map(RegionId)
    }

    /// Looks up a region.
    #[must_use]
    pub fn region(&self, id: RegionId) -> Option<&ClickRegion<A>> {
        self.regions.get(id.0)
    }

    /// Action bound to a region.
    #[must_use]
    pub fn action(&self, id: RegionId) -> Option<&A> {
        self.region(id).map(ClickRegion::action)
    }

    /// Action bound to the region hit by the point, if any.
    #[must_use]
    pub fn resolve(&self, point: Vec2) -> Option<&A> {
        self.hit_test(point).and_then(|id| self.action(id))
    }

    /// Number of registered regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no region has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
