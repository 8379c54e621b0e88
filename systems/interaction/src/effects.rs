//! Targeting of the projectiles thrown at the end of a turn.

use colony_defence_core::{ColonySnapshot, InsectKind, PlaceName, PlaceSnapshot, TurnEndEffect};
use colony_defence_rendering::{LayoutConfig, PlayAreaLayout, PolygonStyle};
use colony_defence_system_animation::ProjectileShape;
use glam::Vec2;
use std::time::Duration;

use crate::LoopConfig;

/// Nearest place holding a bee, walking from `from` toward the hive through
/// entrance links. Places closer than `min_range` are skipped; the walk
/// stops past `max_range` or when no entrance is left.
#[must_use]
pub fn ranged_target<'a>(
    snapshot: &'a ColonySnapshot,
    from: &PlaceName,
    min_range: u32,
    max_range: Option<u32>,
) -> Option<&'a PlaceSnapshot> {
    let mut current = snapshot.place(from);
    let mut distance = 0_u32;
    let mut steps = 0_usize;

    while let Some(place) = current {
        if max_range.is_some_and(|max| distance > max) || steps > snapshot.places.len() {
            return None;
        }
        if distance >= min_range && !place.bees.is_empty() {
            return Some(place);
        }
        current = snapshot.entrances_of(&place.name).next();
        distance += 1;
        steps += 1;
    }
    None
}

/// Whether a sweeping ant standing in `place` has anything to hit.
#[must_use]
pub fn sweep_fires(place: &PlaceSnapshot) -> bool {
    !place.bees.is_empty()
}

/// Projectile ready to be launched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Throw {
    pub(crate) projectile: ProjectileShape,
    pub(crate) style: PolygonStyle,
    pub(crate) start: Vec2,
    pub(crate) end: Vec2,
    pub(crate) duration: Duration,
}

/// Geometry shared by every throw of a turn.
pub(crate) struct ThrowPlanner<'a> {
    pub(crate) snapshot: &'a ColonySnapshot,
    pub(crate) layout: &'a PlayAreaLayout,
    pub(crate) layout_config: &'a LayoutConfig,
    pub(crate) config: &'a LoopConfig,
}

impl ThrowPlanner<'_> {
    /// Projectile thrown by an ant of `kind` standing in `place`, if its
    /// effect finds a target.
    pub(crate) fn plan(
        &self,
        place: &PlaceSnapshot,
        kind: &InsectKind,
        effect: TurnEndEffect,
    ) -> Option<Throw> {
        let origin = self.layout.place_point(&place.name)?;
        let start = origin + self.layout_config.projectile_start_offset;
        let outline = self.layout_config.projectile_outline;

        match effect {
            TurnEndEffect::Ranged {
                min_range,
                max_range,
            } => {
                let target = ranged_target(self.snapshot, &place.name, min_range, max_range)?;
                let end = self.layout.place_point(&target.name)?
                    + self.layout_config.projectile_end_offset;
                Some(Throw {
                    projectile: ProjectileShape::Leaf {
                        length: self.config.leaf_length,
                    },
                    style: PolygonStyle::new(outline, self.layout_config.leaf_color_for(kind))
                        .smoothed(),
                    start,
                    end,
                    duration: self.config.leaf_duration,
                })
            }
            TurnEndEffect::Sweep => {
                if !sweep_fires(place) {
                    return None;
                }
                let hive = self.layout.place_point(self.layout.hive())?;
                let end = Vec2::new(hive.x, origin.y) + self.layout_config.projectile_end_offset;
                Some(Throw {
                    projectile: ProjectileShape::Dart {
                        length: self.config.dart_length,
                    },
                    style: PolygonStyle::new(outline, self.layout_config.dart_color).smoothed(),
                    start,
                    end,
                    duration: self.config.dart_duration,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_defence_core::{HiveSnapshot, InsectId, InsectSnapshot};

    fn tunnel(bees_at: &[usize]) -> ColonySnapshot {
        let places = (0..6)
            .map(|column| PlaceSnapshot {
                name: PlaceName::new(format!("tunnel_0_{column}")),
                occupant: None,
                bees: if bees_at.contains(&column) {
                    vec![InsectSnapshot::new(
                        InsectId::new(column as u32 + 10),
                        InsectKind::new("Bee"),
                    )]
                } else {
                    Vec::new()
                },
                exit: column
                    .checked_sub(1)
                    .map(|previous| PlaceName::new(format!("tunnel_0_{previous}"))),
                hazard: false,
            })
            .collect();
        ColonySnapshot {
            places,
            hive: HiveSnapshot {
                name: PlaceName::new("Hive"),
                bees: Vec::new(),
            },
            food: 0,
            time: 0,
            outcome: None,
        }
    }

    fn target_of(snapshot: &ColonySnapshot, min: u32, max: Option<u32>) -> Option<&str> {
        let from = PlaceName::new("tunnel_0_0");
        ranged_target(snapshot, &from, min, max).map(|place| place.name.as_str())
    }

    #[test]
    fn ranged_effects_hit_the_nearest_bee_in_range() {
        let snapshot = tunnel(&[2, 4]);

        assert_eq!(target_of(&snapshot, 0, None), Some("tunnel_0_2"));
        assert_eq!(target_of(&snapshot, 3, None), Some("tunnel_0_4"));
        assert_eq!(target_of(&snapshot, 0, Some(1)), None);
        assert_eq!(target_of(&snapshot, 5, None), None);
    }

    #[test]
    fn bees_sharing_the_place_are_in_range_zero() {
        let snapshot = tunnel(&[0]);

        assert_eq!(target_of(&snapshot, 0, Some(0)), Some("tunnel_0_0"));
        assert!(sweep_fires(&snapshot.places[0]));
        assert!(!sweep_fires(&snapshot.places[1]));
    }

    #[test]
    fn sweeps_fly_horizontally_toward_the_hive() {
        let snapshot = tunnel(&[3]);
        let layout_config = LayoutConfig::default();
        let layout = PlayAreaLayout::compute(&layout_config, &snapshot);
        let config = LoopConfig::default();
        let planner = ThrowPlanner {
            snapshot: &snapshot,
            layout: &layout,
            layout_config: &layout_config,
            config: &config,
        };

        let throw = planner
            .plan(&snapshot.places[3], &InsectKind::new("Ninja"), TurnEndEffect::Sweep)
            .expect("ninja fires");

        assert_eq!(throw.start.y, throw.end.y);
        assert!(throw.end.x > throw.start.x);
        assert_eq!(throw.duration, config.dart_duration);
        assert!(planner
            .plan(&snapshot.places[2], &InsectKind::new("Ninja"), TurnEndEffect::Sweep)
            .is_none());
    }
}
