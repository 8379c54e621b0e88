//! Scripted player that feeds clicks to the headless canvas.

use std::time::Duration;

use colony_defence_core::{ColonySnapshot, InsectType, TypeRole};
use colony_defence_rendering::{LayoutConfig, PlayAreaLayout};
use colony_defence_rendering_headless::HeadlessCanvas;
use glam::Vec2;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Arms a random affordable type and deploys it to a random free place
/// every turn.
pub(crate) struct AutoPlayer {
    rng: ChaCha8Rng,
    layout_config: LayoutConfig,
    layout: PlayAreaLayout,
    budget: Duration,
}

impl AutoPlayer {
    pub(crate) fn new(
        seed: u64,
        layout_config: LayoutConfig,
        snapshot: &ColonySnapshot,
        budget: Duration,
    ) -> Self {
        let layout = PlayAreaLayout::compute(&layout_config, snapshot);
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            layout_config,
            layout,
            budget,
        }
    }

    /// Queues the clicks of the coming turn. Returns how many were queued.
    pub(crate) fn plan_turn(
        &mut self,
        snapshot: &ColonySnapshot,
        types: &[InsectType],
        canvas: &mut HeadlessCanvas,
    ) -> usize {
        let affordable: Vec<usize> = types
            .iter()
            .enumerate()
            .filter(|(_, insect_type)| {
                insect_type.role == TypeRole::Deployable && insect_type.food_cost <= snapshot.food
            })
            .map(|(index, _)| index)
            .collect();
        let free: Vec<_> = snapshot
            .places
            .iter()
            .filter(|place| place.occupant.is_none())
            .collect();

        let (Some(&slot), Some(place)) = (affordable.choose(&mut self.rng), free.choose(&mut self.rng))
        else {
            return 0;
        };
        let Some(origin) = self.layout.place_point(&place.name) else {
            return 0;
        };

        let panel = self.layout_config.panel_slot(slot);
        let arm = panel.origin + panel.size / 2.0;
        let deploy = origin + self.layout.place_size() / 2.0;
        debug!(kind = %types[slot].kind, place = %place.name, "scripted deployment");

        for position in [arm, deploy] {
            let delay = self.delay();
            canvas.push_click(delay, position);
        }
        2
    }

    /// Random delay short enough for both clicks to land inside one turn.
    fn delay(&mut self) -> Duration {
        let ceiling = (self.budget.as_secs_f64() / 3.0).max(0.001);
        Duration::from_secs_f64(self.rng.gen_range(0.0..ceiling))
    }

    /// Position of the click that starts the session.
    pub(crate) fn start_click(&self) -> Vec2 {
        self.layout_config.message_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_defence_world::{query, World, WorldConfig};

    fn player(world: &World, seed: u64) -> AutoPlayer {
        AutoPlayer::new(
            seed,
            LayoutConfig::default(),
            &query::snapshot(world),
            Duration::from_secs(3),
        )
    }

    #[test]
    fn clicks_fit_inside_the_turn_budget() {
        let world = World::new();
        let mut canvas = HeadlessCanvas::new();
        let mut autoplayer = player(&world, 3);

        let queued = autoplayer.plan_turn(
            &query::snapshot(&world),
            &query::insect_types(&world),
            &mut canvas,
        );

        assert_eq!(queued, 2);
        assert_eq!(canvas.pending_clicks(), 2);
    }

    #[test]
    fn nothing_is_queued_without_food() {
        let world = World::with_config(WorldConfig {
            food: 0,
            ..WorldConfig::default()
        });
        let mut canvas = HeadlessCanvas::new();
        let mut autoplayer = player(&world, 3);

        let queued = autoplayer.plan_turn(
            &query::snapshot(&world),
            &query::insect_types(&world),
            &mut canvas,
        );

        assert_eq!(queued, 0);
        assert_eq!(canvas.pending_clicks(), 0);
    }
}
