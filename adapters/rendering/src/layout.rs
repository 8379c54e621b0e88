//! Play-area geometry derived from an explicit layout configuration.

use std::collections::{BTreeMap, HashMap};

use colony_defence_core::{ColonySnapshot, InsectKind, PlaceName};
use glam::Vec2;
use serde::Deserialize;

use crate::{AssetKey, Color};

/// Positions, paddings and asset keys used to lay out the view.
///
/// Every field has a default so a configuration file only needs to name the
/// values it overrides.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Top-left corner of the first control-panel frame.
    pub panel_origin: Vec2,
    /// Padding between a control-panel frame and its image.
    pub panel_padding: Vec2,
    /// Horizontal gap between control-panel frames.
    pub panel_spacing: f32,
    /// Top-left corner of the first place of the first tunnel.
    pub place_origin: Vec2,
    /// Padding between a place frame and the insects drawn inside it.
    pub place_padding: Vec2,
    /// Gap between neighbouring places and tunnel rows.
    pub place_margin: f32,
    /// Size of an ant image.
    pub ant_image_size: Vec2,
    /// Width of a bee image.
    pub bee_image_width: f32,
    /// Vertical position expired insects are slid to.
    pub crypt_y: f32,
    /// Vertical position of the hive.
    pub hive_y: f32,
    /// Maximum random offset applied to bees drawn in the hive.
    pub hive_jitter: Vec2,
    /// Position of the food and time status text.
    pub status_position: Vec2,
    /// Position of the armed-type text.
    pub selection_position: Vec2,
    /// Position of the start prompt.
    pub message_position: Vec2,
    /// Offset from a place's corner where projectiles start.
    pub projectile_start_offset: Vec2,
    /// Offset from a place's corner where projectiles land.
    pub projectile_end_offset: Vec2,
    /// Image drawn inside every place.
    pub tunnel_asset: AssetKey,
    /// Image drawn for each insect kind.
    pub assets: BTreeMap<InsectKind, AssetKey>,
    /// Leaf fill colour for each kind with a ranged effect.
    pub leaf_colors: BTreeMap<InsectKind, Color>,
    /// Outline of every projectile.
    pub projectile_outline: Color,
    /// Fill of ninja darts.
    pub dart_color: Color,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let assets = [
            ("Worker", "img/ant_harvester.gif"),
            ("Harvester", "img/ant_harvester.gif"),
            ("Thrower", "img/ant_thrower.gif"),
            ("Long", "img/ant_longthrower.gif"),
            ("Short", "img/ant_shortthrower.gif"),
            ("Fire", "img/ant_fire.gif"),
            ("Bodyguard", "img/ant_weeds.gif"),
            ("Hungry", "img/ant_hungry.gif"),
            ("Slow", "img/ant_freeze.gif"),
            ("Stun", "img/ant_stun.gif"),
            ("Ninja", "img/ant_ninja.gif"),
            ("Wall", "img/ant_wall.gif"),
            ("Scuba", "img/ant_scuba.gif"),
            ("Queen", "img/ant_queen.gif"),
            ("Bee", "img/bee.gif"),
            ("Remover", "img/remover.gif"),
        ]
        .into_iter()
        .map(|(kind, asset)| (InsectKind::new(kind), AssetKey::new(asset)))
        .collect();

        let leaf_colors = [
            ("Thrower", Color::FOREST_GREEN),
            ("Short", Color::from_rgb_u8(0x00, 0x80, 0x00)),
            ("Long", Color::DARK_GREEN),
            ("Slow", Color::from_rgb_u8(0xad, 0xd8, 0xe6)),
            ("Stun", Color::from_rgb_u8(0xff, 0x00, 0x00)),
            ("Scuba", Color::BLUE),
            ("Queen", Color::from_rgb_u8(0xa0, 0x20, 0xf0)),
        ]
        .into_iter()
        .map(|(kind, color)| (InsectKind::new(kind), color))
        .collect();

        Self {
            panel_origin: Vec2::new(20.0, 40.0),
            panel_padding: Vec2::new(2.0, 4.0),
            panel_spacing: 2.0,
            place_origin: Vec2::new(40.0, 180.0),
            place_padding: Vec2::new(10.0, 10.0),
            place_margin: 10.0,
            ant_image_size: Vec2::new(66.0, 71.0),
            bee_image_width: 58.0,
            crypt_y: 650.0,
            hive_y: 300.0,
            hive_jitter: Vec2::new(10.0, 50.0),
            status_position: Vec2::new(20.0, 20.0),
            selection_position: Vec2::new(20.0, 140.0),
            message_position: Vec2::new(120.0, 20.0),
            projectile_start_offset: Vec2::new(30.0, 30.0),
            projectile_end_offset: Vec2::new(35.0, 30.0),
            tunnel_asset: AssetKey::new("img/tunnel.gif"),
            assets,
            leaf_colors,
            projectile_outline: Color::DARK_GREEN,
            dart_color: Color::BLACK,
        }
    }
}

impl LayoutConfig {
    /// Image used for an insect kind. Unlisted kinds fall back to a key
    /// derived from their name.
    #[must_use]
    pub fn asset_for(&self, kind: &InsectKind) -> AssetKey {
        self.assets.get(kind).cloned().unwrap_or_else(|| {
            AssetKey::new(format!("img/{}.gif", kind.as_str().to_lowercase()))
        })
    }

    /// Leaf fill colour for a kind, defaulting to forest green.
    #[must_use]
    pub fn leaf_color_for(&self, kind: &InsectKind) -> Color {
        self.leaf_colors
            .get(kind)
            .copied()
            .unwrap_or(Color::FOREST_GREEN)
    }

    /// Size of a place frame.
    #[must_use]
    pub fn place_size(&self) -> Vec2 {
        Vec2::new(
            self.bee_image_width + 2.0 * self.place_padding.x,
            self.ant_image_size.y + 2.0 * self.place_padding.y,
        )
    }

    /// Size of a control-panel frame.
    #[must_use]
    pub fn panel_frame_size(&self) -> Vec2 {
        Vec2::new(
            self.ant_image_size.x + 2.0 * self.panel_padding.x,
            self.ant_image_size.y + 6.0 + 2.0 * self.panel_padding.y,
        )
    }

    /// Geometry of the `index`-th control-panel frame.
    #[must_use]
    pub fn panel_slot(&self, index: usize) -> PanelSlot {
        let size = self.panel_frame_size();
        let origin = self.panel_origin + Vec2::new(index as f32 * (size.x + self.panel_spacing), 0.0);
        PanelSlot {
            origin,
            size,
            image: origin + self.panel_padding,
            cost_label: origin
                + Vec2::new(
                    size.x / 2.0,
                    self.ant_image_size.y + 4.0 + self.panel_padding.y,
                ),
        }
    }
}

/// Geometry of one control-panel frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelSlot {
    /// Top-left corner of the frame.
    pub origin: Vec2,
    /// Size of the frame.
    pub size: Vec2,
    /// Position of the type's image.
    pub image: Vec2,
    /// Centre of the cost label.
    pub cost_label: Vec2,
}

/// Corner positions of every place, computed once per session.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayAreaLayout {
    place_size: Vec2,
    place_padding: Vec2,
    crypt_y: f32,
    points: HashMap<PlaceName, Vec2>,
    hive: PlaceName,
}

impl PlayAreaLayout {
    /// Lays out the places of `snapshot` in rows. A new row starts at every
    /// place that opens onto the colony base. The hive sits to the right of
    /// the last place.
    #[must_use]
    pub fn compute(config: &LayoutConfig, snapshot: &ColonySnapshot) -> Self {
        let place_size = config.place_size();
        let mut points = HashMap::with_capacity(snapshot.places.len() + 1);
        let mut position = config.place_origin;
        let mut rows = 0_u32;

        for place in &snapshot.places {
            if place.exit.is_none() {
                let row_offset = Vec2::new(0.0, rows as f32 * (place_size.y + config.place_margin));
                position = config.place_origin + row_offset;
                rows += 1;
            }
            let _ = points.insert(place.name.clone(), position);
            position.x += place_size.x + config.place_margin;
        }

        let _ = points.insert(
            snapshot.hive.name.clone(),
            Vec2::new(position.x + place_size.x, config.hive_y),
        );

        Self {
            place_size,
            place_padding: config.place_padding,
            crypt_y: config.crypt_y,
            points,
            hive: snapshot.hive.name.clone(),
        }
    }

    /// Top-left corner of a place or of the hive.
    #[must_use]
    pub fn place_point(&self, place: &PlaceName) -> Option<Vec2> {
        self.points.get(place).copied()
    }

    /// Position at which insects inside a place are drawn.
    #[must_use]
    pub fn insect_position(&self, place: &PlaceName) -> Option<Vec2> {
        self.place_point(place)
            .map(|point| point + self.place_padding)
    }

    /// Position below the play area that expired insects slide to.
    #[must_use]
    pub fn crypt_position(&self, place: &PlaceName) -> Option<Vec2> {
        self.place_point(place)
            .map(|point| Vec2::new(point.x, self.crypt_y))
    }

    /// Size of every place frame.
    #[must_use]
    pub fn place_size(&self) -> Vec2 {
        self.place_size
    }

    /// Name of the hive.
    #[must_use]
    pub fn hive(&self) -> &PlaceName {
        &self.hive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_defence_core::{HiveSnapshot, PlaceSnapshot};

    fn place(name: &str, exit: Option<&str>) -> PlaceSnapshot {
        PlaceSnapshot {
            name: PlaceName::new(name),
            occupant: None,
            bees: Vec::new(),
            exit: exit.map(PlaceName::new),
            hazard: false,
        }
    }

    fn two_tunnels() -> ColonySnapshot {
        ColonySnapshot {
            places: vec![
                place("tunnel_0_0", None),
                place("tunnel_0_1", Some("tunnel_0_0")),
                place("tunnel_1_0", None),
                place("tunnel_1_1", Some("tunnel_1_0")),
            ],
            hive: HiveSnapshot {
                name: PlaceName::new("Hive"),
                bees: Vec::new(),
            },
            food: 0,
            time: 0,
            outcome: None,
        }
    }

    #[test]
    fn places_wrap_into_rows_at_base_exits() {
        let config = LayoutConfig::default();
        let layout = PlayAreaLayout::compute(&config, &two_tunnels());

        assert_eq!(
            layout.place_point(&PlaceName::new("tunnel_0_0")),
            Some(Vec2::new(40.0, 180.0))
        );
        assert_eq!(
            layout.place_point(&PlaceName::new("tunnel_0_1")),
            Some(Vec2::new(128.0, 180.0))
        );
        assert_eq!(
            layout.place_point(&PlaceName::new("tunnel_1_0")),
            Some(Vec2::new(40.0, 281.0))
        );
    }

    #[test]
    fn hive_sits_right_of_the_last_place() {
        let config = LayoutConfig::default();
        let layout = PlayAreaLayout::compute(&config, &two_tunnels());

        assert_eq!(
            layout.place_point(layout.hive()),
            Some(Vec2::new(294.0, 300.0))
        );
    }

    #[test]
    fn insect_and_crypt_positions_derive_from_place_point() {
        let config = LayoutConfig::default();
        let layout = PlayAreaLayout::compute(&config, &two_tunnels());
        let name = PlaceName::new("tunnel_0_1");

        assert_eq!(layout.insect_position(&name), Some(Vec2::new(138.0, 190.0)));
        assert_eq!(layout.crypt_position(&name), Some(Vec2::new(128.0, 650.0)));
        assert_eq!(layout.insect_position(&PlaceName::new("missing")), None);
    }

    #[test]
    fn panel_slots_advance_horizontally() {
        let config = LayoutConfig::default();
        let first = config.panel_slot(0);
        let second = config.panel_slot(1);

        assert_eq!(first.size, Vec2::new(70.0, 85.0));
        assert_eq!(first.image, Vec2::new(22.0, 44.0));
        assert_eq!(second.origin, Vec2::new(92.0, 40.0));
        assert_eq!(first.cost_label, Vec2::new(55.0, 119.0));
    }

    #[test]
    fn unknown_kinds_fall_back_to_derived_assets() {
        let config = LayoutConfig::default();

        assert_eq!(
            config.asset_for(&InsectKind::new("Thrower")).as_str(),
            "img/ant_thrower.gif"
        );
        assert_eq!(
            config.asset_for(&InsectKind::new("Laser")).as_str(),
            "img/laser.gif"
        );
    }
}
