#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bookkeeping of which shape represents which insect in which place.
//!
//! Every tracked insect appears in exactly one place. Moving an insect
//! transfers its shape to the new place; retiring it releases the shape.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use colony_defence_core::{InsectId, PlaceName};
use colony_defence_rendering::{AssetKey, Canvas, ShapeHandle};
use colony_defence_system_animation::AnimationDriver;
use glam::Vec2;
use thiserror::Error;
use tracing::{debug, warn};

/// View mutation produced by reconciliation and applied by the tracker.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewCommand {
    /// Draws a new shape for an untracked insect and tracks it in `place`.
    Draw {
        /// Place the insect is tracked in after the draw.
        place: PlaceName,
        /// Insect being drawn.
        insect: InsectId,
        /// Image used for the insect.
        asset: AssetKey,
        /// Where the image is drawn.
        position: Vec2,
        /// Insect whose shape the new one is stacked behind.
        behind: Option<InsectId>,
    },
    /// Moves an insect's existing shape into `place`.
    Slide {
        /// Destination place.
        place: PlaceName,
        /// Insect being moved.
        insect: InsectId,
        /// Destination position.
        position: Vec2,
        /// Length of the slide.
        duration: Duration,
    },
    /// Releases an insect that left the model and slides it off the play
    /// area before clearing it.
    Retire {
        /// Place the insect was tracked in.
        place: PlaceName,
        /// Insect being retired.
        insect: InsectId,
        /// Position the shape slides to.
        crypt: Vec2,
        /// Time the shape stays visible before being cleared.
        grace: Duration,
    },
}

impl ViewCommand {
    /// Insect the command applies to.
    #[must_use]
    pub fn insect(&self) -> InsectId {
        match self {
            Self::Draw { insect, .. } | Self::Slide { insect, .. } | Self::Retire { insect, .. } => {
                *insect
            }
        }
    }
}

/// Violations of the tracker's single-location invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The insect already has a shape.
    #[error("insect {insect} is already tracked in {place}")]
    AlreadyTracked {
        /// Insect that was registered twice.
        insect: InsectId,
        /// Place currently holding the insect.
        place: PlaceName,
    },
    /// The insect has no shape.
    #[error("insect {insect} is not tracked")]
    NotTracked {
        /// Insect that was looked up.
        insect: InsectId,
    },
    /// The insect is tracked, but not in the expected place.
    #[error("insect {insect} is tracked in {actual}, not {expected}")]
    WrongPlace {
        /// Insect that was looked up.
        insect: InsectId,
        /// Place the caller expected.
        expected: PlaceName,
        /// Place actually holding the insect.
        actual: PlaceName,
    },
}

/// Maps every place to the shapes of the insects drawn inside it.
#[derive(Clone, Debug, Default)]
pub struct ViewTracker {
    places: BTreeMap<PlaceName, BTreeMap<InsectId, ShapeHandle>>,
    locations: HashMap<InsectId, PlaceName>,
}

impl ViewTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insects tracked in a place.
    #[must_use]
    pub fn entities_in(&self, place: &PlaceName) -> BTreeSet<InsectId> {
        self.places
            .get(place)
            .map(|entries| entries.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Place an insect is tracked in.
    #[must_use]
    pub fn location(&self, insect: InsectId) -> Option<&PlaceName> {
        self.locations.get(&insect)
    }

    /// Shape representing an insect.
    #[must_use]
    pub fn handle(&self, insect: InsectId) -> Option<ShapeHandle> {
        let place = self.locations.get(&insect)?;
        self.places.get(place)?.get(&insect).copied()
    }

    /// Number of insects with a shape.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.locations.len()
    }

    /// Starts tracking an insect's shape in a place.
    pub fn register(
        &mut self,
        place: &PlaceName,
        insect: InsectId,
        handle: ShapeHandle,
    ) -> Result<(), TrackerError> {
        if let Some(current) = self.locations.get(&insect) {
            return Err(TrackerError::AlreadyTracked {
                insect,
                place: current.clone(),
            });
        }
        let _ = self
            .places
            .entry(place.clone())
            .or_default()
            .insert(insect, handle);
        let _ = self.locations.insert(insect, place.clone());
        Ok(())
    }

    /// Transfers an insect's shape to another place and returns the shape.
    pub fn move_to(
        &mut self,
        place: &PlaceName,
        insect: InsectId,
    ) -> Result<ShapeHandle, TrackerError> {
        let from = self
            .locations
            .get(&insect)
            .cloned()
            .ok_or(TrackerError::NotTracked { insect })?;
        let handle = self
            .take(&from, insect)
            .ok_or(TrackerError::NotTracked { insect })?;
        let _ = self
            .places
            .entry(place.clone())
            .or_default()
            .insert(insect, handle);
        let _ = self.locations.insert(insect, place.clone());
        Ok(handle)
    }

    /// Stops tracking an insect and returns its shape.
    pub fn retire(
        &mut self,
        place: &PlaceName,
        insect: InsectId,
    ) -> Result<ShapeHandle, TrackerError> {
        match self.locations.get(&insect) {
            None => return Err(TrackerError::NotTracked { insect }),
            Some(actual) if actual != place => {
                return Err(TrackerError::WrongPlace {
                    insect,
                    expected: place.clone(),
                    actual: actual.clone(),
                })
            }
            Some(_) => {}
        }
        let handle = self
            .take(place, insect)
            .ok_or(TrackerError::NotTracked { insect })?;
        let _ = self.locations.remove(&insect);
        Ok(handle)
    }

    fn take(&mut self, place: &PlaceName, insect: InsectId) -> Option<ShapeHandle> {
        let entries = self.places.get_mut(place)?;
        let handle = entries.remove(&insect);
        if entries.is_empty() {
            let _ = self.places.remove(place);
        }
        handle
    }

    /// Applies a view command, issuing the canvas calls it implies.
    ///
    /// Commands that would break the single-location invariant are dropped
    /// with a warning after a debug assertion.
    pub fn apply<C>(
        &mut self,
        command: &ViewCommand,
        canvas: &mut C,
        animations: &mut AnimationDriver,
    ) -> Result<()>
    where
        C: Canvas + ?Sized,
    {
        match command {
            ViewCommand::Draw {
                place,
                insect,
                asset,
                position,
                behind,
            } => {
                if let Some(current) = self.locations.get(insect) {
                    debug_assert!(false, "insect {insect} drawn twice");
                    warn!(
                        insect = %insect,
                        place = %place,
                        tracked_in = %current,
                        "duplicate draw ignored"
                    );
                    return Ok(());
                }
                let behind = behind.and_then(|carrier| self.handle(carrier));
                let handle = canvas
                    .draw_image(*position, asset, behind)
                    .with_context(|| format!("failed to draw insect {insect}"))?;
                self.register(place, *insect, handle)?;
                debug!(insect = %insect, place = %place, shape = handle.get(), "insect_drawn");
            }
            ViewCommand::Slide {
                place,
                insect,
                position,
                duration,
            } => {
                let handle = match self.move_to(place, *insect) {
                    Ok(handle) => handle,
                    Err(error) => {
                        debug_assert!(false, "{error}");
                        warn!(%error, "slide ignored");
                        return Ok(());
                    }
                };
                canvas
                    .slide_shape(handle, *position, *duration)
                    .with_context(|| format!("failed to move insect {insect}"))?;
                debug!(insect = %insect, place = %place, "insect_moved");
            }
            ViewCommand::Retire {
                place,
                insect,
                crypt,
                grace,
            } => {
                let handle = match self.retire(place, *insect) {
                    Ok(handle) => handle,
                    Err(error) => {
                        debug_assert!(false, "{error}");
                        warn!(%error, "retirement ignored");
                        return Ok(());
                    }
                };
                canvas
                    .slide_shape(handle, *crypt, *grace)
                    .with_context(|| format!("failed to retire insect {insect}"))?;
                animations.schedule_clear(handle, *grace);
                debug!(insect = %insect, place = %place, "insect_retired");
            }
        }
        Ok(())
    }
}
