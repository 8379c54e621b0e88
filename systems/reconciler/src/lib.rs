#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Converges the view onto a colony snapshot.
//!
//! The model reports no diffs, so every refresh compares the snapshot with
//! the tracker and infers which insects appeared, moved or expired. All
//! draws and slides of a pass are emitted before any retirement so an insect
//! that advanced into a neighbouring place is picked up there instead of
//! being retired from the place it left.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use colony_defence_core::{ColonySnapshot, InsectId, InsectSnapshot, PlaceName, PlaceSnapshot};
use colony_defence_rendering::{LayoutConfig, PlayAreaLayout};
use colony_defence_system_view_tracker::{ViewCommand, ViewTracker};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

/// Timing and randomness used by the reconciler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Duration of the slide that moves a bee into its new place.
    pub arrival: Duration,
    /// Time an expired insect stays visible while sliding to the crypt.
    pub retire_grace: Duration,
    /// Seed of the generator that scatters bees inside the hive.
    pub jitter_seed: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            arrival: Duration::from_secs(3),
            retire_grace: Duration::from_secs(3),
            jitter_seed: 0,
        }
    }
}

/// Diffs snapshots against the tracker and emits view commands.
#[derive(Debug)]
pub struct Reconciler {
    config: ReconcilerConfig,
    layout_config: LayoutConfig,
    layout: PlayAreaLayout,
    rng: ChaCha8Rng,
}

impl Reconciler {
    /// Creates a reconciler for the places of `snapshot`. The place set is
    /// fixed for the rest of the session.
    #[must_use]
    pub fn new(
        layout_config: LayoutConfig,
        snapshot: &ColonySnapshot,
        config: ReconcilerConfig,
    ) -> Self {
        let layout = PlayAreaLayout::compute(&layout_config, snapshot);
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.jitter_seed),
            config,
            layout_config,
            layout,
        }
    }

    /// Geometry of the play area.
    #[must_use]
    pub fn layout(&self) -> &PlayAreaLayout {
        &self.layout
    }

    /// Layout configuration the geometry was computed from.
    #[must_use]
    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    /// Draws every hive bee that has no shape yet, scattered around the hive.
    pub fn populate_reservoir(
        &mut self,
        snapshot: &ColonySnapshot,
        tracker: &ViewTracker,
        out: &mut Vec<ViewCommand>,
    ) {
        let hive = &snapshot.hive;
        let Some(base) = self.layout.insect_position(&hive.name) else {
            warn!(hive = %hive.name, "hive missing from layout");
            return;
        };
        let jitter_x = self.layout_config.hive_jitter.x.abs() as i32;
        let jitter_y = self.layout_config.hive_jitter.y.abs() as i32;

        for bee in &hive.bees {
            if tracker.location(bee.id).is_some() {
                continue;
            }
            let offset = Vec2::new(
                self.rng.gen_range(-jitter_x..=jitter_x) as f32,
                self.rng.gen_range(-jitter_y..=jitter_y) as f32,
            );
            out.push(ViewCommand::Draw {
                place: hive.name.clone(),
                insect: bee.id,
                asset: self.layout_config.asset_for(&bee.kind),
                position: base + offset,
                behind: None,
            });
        }
    }

    /// Emits the commands that converge the tracker onto `snapshot`.
    pub fn refresh(
        &self,
        snapshot: &ColonySnapshot,
        tracker: &ViewTracker,
        out: &mut Vec<ViewCommand>,
    ) {
        let mut planned: HashMap<InsectId, &PlaceName> = HashMap::new();
        let mut stale: Vec<(&PlaceName, InsectId)> = Vec::new();

        for place in &snapshot.places {
            let Some(base) = self.layout.insect_position(&place.name) else {
                warn!(place = %place.name, "place missing from layout");
                continue;
            };
            let tracked = tracker.entities_in(&place.name);

            if let Some(occupant) = &place.occupant {
                let primary = occupant.primary();
                if !tracked.contains(&primary.id) {
                    self.present(place, primary, base, None, tracker, out);
                    let _ = planned.insert(primary.id, &place.name);
                }
                if let Some(passenger) = occupant.passenger() {
                    if !tracked.contains(&passenger.id) {
                        self.present(place, passenger, base, Some(primary.id), tracker, out);
                        let _ = planned.insert(passenger.id, &place.name);
                    }
                }
            }

            for bee in place.bees.iter().filter(|bee| !tracked.contains(&bee.id)) {
                self.arrive(snapshot, place, bee, base, tracker, out);
                let _ = planned.insert(bee.id, &place.name);
            }

            let valid = place.valid_insects();
            stale.extend(
                tracked
                    .difference(&valid)
                    .map(|insect| (&place.name, *insect)),
            );
        }

        let hive = &snapshot.hive;
        let waiting: BTreeSet<InsectId> = hive.bees.iter().map(|bee| bee.id).collect();
        stale.extend(
            tracker
                .entities_in(&hive.name)
                .difference(&waiting)
                .map(|insect| (&hive.name, *insect)),
        );

        for (place, insect) in stale {
            let projected = planned
                .get(&insect)
                .copied()
                .or_else(|| tracker.location(insect));
            if projected != Some(place) {
                debug!(insect = %insect, place = %place, "insect left for another place");
                continue;
            }
            let Some(crypt) = self.layout.crypt_position(place) else {
                continue;
            };
            out.push(ViewCommand::Retire {
                place: place.clone(),
                insect,
                crypt,
                grace: self.config.retire_grace,
            });
        }
    }

    /// Ants are drawn where they stand, or slid there if some other place
    /// still holds their shape.
    fn present(
        &self,
        place: &PlaceSnapshot,
        ant: &InsectSnapshot,
        position: Vec2,
        behind: Option<InsectId>,
        tracker: &ViewTracker,
        out: &mut Vec<ViewCommand>,
    ) {
        if tracker.location(ant.id).is_some() {
            out.push(ViewCommand::Slide {
                place: place.name.clone(),
                insect: ant.id,
                position,
                duration: self.config.arrival,
            });
            return;
        }
        out.push(ViewCommand::Draw {
            place: place.name.clone(),
            insect: ant.id,
            asset: self.layout_config.asset_for(&ant.kind),
            position,
            behind,
        });
    }

    fn arrive(
        &self,
        snapshot: &ColonySnapshot,
        place: &PlaceSnapshot,
        bee: &InsectSnapshot,
        position: Vec2,
        tracker: &ViewTracker,
        out: &mut Vec<ViewCommand>,
    ) {
        let source = source_of(snapshot, &place.name);
        match tracker.location(bee.id) {
            Some(tracked) => {
                if tracked != source {
                    debug!(
                        bee = %bee.id,
                        tracked_in = %tracked,
                        expected = %source,
                        "bee arrived from an unexpected place"
                    );
                }
            }
            None => {
                let origin = self
                    .layout
                    .insect_position(source)
                    .unwrap_or(position);
                out.push(ViewCommand::Draw {
                    place: source.clone(),
                    insect: bee.id,
                    asset: self.layout_config.asset_for(&bee.kind),
                    position: origin,
                    behind: None,
                });
            }
        }
        out.push(ViewCommand::Slide {
            place: place.name.clone(),
            insect: bee.id,
            position,
            duration: self.config.arrival,
        });
    }
}

/// Place a bee entering `place` came from: the first place whose exit leads
/// into it, or the hive when there is none.
#[must_use]
pub fn source_of<'a>(snapshot: &'a ColonySnapshot, place: &'a PlaceName) -> &'a PlaceName {
    let mut entrances = snapshot.entrances_of(place);
    let Some(first) = entrances.next() else {
        return &snapshot.hive.name;
    };
    let extra = entrances.count();
    if extra > 0 {
        warn!(
            place = %place,
            chosen = %first.name,
            candidates = extra + 1,
            "several places lead into the same place"
        );
    }
    &first.name
}
