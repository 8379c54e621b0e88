use std::collections::BTreeSet;

use anyhow::Result;
use colony_defence_core::{Command, Event, InsectId, InsectKind, PlaceName};
use colony_defence_rendering::LayoutConfig;
use colony_defence_rendering_headless::{CanvasCall, HeadlessCanvas};
use colony_defence_system_animation::AnimationDriver;
use colony_defence_system_reconciler::{Reconciler, ReconcilerConfig};
use colony_defence_system_view_tracker::{ViewCommand, ViewTracker};
use colony_defence_world::{apply, query, World, WorldConfig};

struct Harness {
    world: World,
    reconciler: Reconciler,
    tracker: ViewTracker,
    canvas: HeadlessCanvas,
    animations: AnimationDriver,
}

impl Harness {
    fn new(config: WorldConfig) -> Result<Self> {
        let world = World::with_config(config);
        let snapshot = query::snapshot(&world);
        let reconciler = Reconciler::new(
            LayoutConfig::default(),
            &snapshot,
            ReconcilerConfig::default(),
        );
        let mut harness = Self {
            world,
            reconciler,
            tracker: ViewTracker::new(),
            canvas: HeadlessCanvas::new(),
            animations: AnimationDriver::default(),
        };
        let mut out = Vec::new();
        harness
            .reconciler
            .populate_reservoir(&snapshot, &harness.tracker, &mut out);
        harness.commit(&out)?;
        Ok(harness)
    }

    fn refresh(&mut self) -> Result<Vec<ViewCommand>> {
        let snapshot = query::snapshot(&self.world);
        let mut out = Vec::new();
        self.reconciler.refresh(&snapshot, &self.tracker, &mut out);
        self.commit(&out)?;
        Ok(out)
    }

    fn commit(&mut self, commands: &[ViewCommand]) -> Result<()> {
        for command in commands {
            self.tracker
                .apply(command, &mut self.canvas, &mut self.animations)?;
        }
        Ok(())
    }

    fn submit(&mut self, command: Command) {
        let mut events = Vec::new();
        apply(&mut self.world, command, &mut events);
    }

    /// Every insect the model reports in a place is tracked exactly there.
    fn assert_converged(&self) {
        let snapshot = query::snapshot(&self.world);
        let mut seen = BTreeSet::new();
        for place in &snapshot.places {
            let valid = place.valid_insects();
            assert_eq!(
                self.tracker.entities_in(&place.name),
                valid,
                "tracker diverged in {}",
                place.name
            );
            for insect in valid {
                assert!(seen.insert(insect), "{insect} represented twice");
            }
        }
        let waiting: BTreeSet<InsectId> = snapshot.hive.bees.iter().map(|bee| bee.id).collect();
        assert_eq!(
            self.tracker.entities_in(&snapshot.hive.name),
            waiting,
            "tracker diverged in the hive"
        );
    }
}

fn single_tunnel() -> WorldConfig {
    WorldConfig {
        tunnels: 1,
        tunnel_length: 4,
        food: 10,
        bees: 2,
        release_count: 1,
        ..WorldConfig::default()
    }
}

#[test]
fn reservoir_is_drawn_once_at_start() -> Result<()> {
    let harness = Harness::new(single_tunnel())?;

    let hive = PlaceName::new("Hive");
    assert_eq!(
        harness.tracker.entities_in(&hive),
        BTreeSet::from([InsectId::new(1), InsectId::new(2)])
    );
    assert_eq!(harness.canvas.live_shapes(), 2);
    Ok(())
}

#[test]
fn converged_view_is_a_fixed_point() -> Result<()> {
    let mut harness = Harness::new(single_tunnel())?;
    harness.submit(Command::Deploy {
        place: PlaceName::new("tunnel_0_1"),
        kind: InsectKind::new("Harvester"),
    });
    harness.submit(Command::AdvanceTurn);

    let first = harness.refresh()?;
    assert!(!first.is_empty());
    let calls_before = harness.canvas.calls().len();

    let second = harness.refresh()?;

    assert!(second.is_empty(), "second pass emitted {second:?}");
    assert_eq!(harness.canvas.calls().len(), calls_before);
    harness.assert_converged();
    Ok(())
}

#[test]
fn bees_walk_the_tunnel_with_a_single_shape() -> Result<()> {
    let mut harness = Harness::new(single_tunnel())?;
    let bee = InsectId::new(2);

    for _ in 0..3 {
        harness.submit(Command::AdvanceTurn);
        let _ = harness.refresh()?;
        harness.assert_converged();
    }

    let handle = harness.tracker.handle(bee).expect("bee keeps its shape");
    let draws = harness
        .canvas
        .calls()
        .iter()
        .filter(|call| matches!(call, CanvasCall::DrawImage { shape, .. } if *shape == handle))
        .count();
    assert_eq!(draws, 1);
    assert_ne!(harness.tracker.location(bee), Some(&PlaceName::new("Hive")));
    Ok(())
}

#[test]
fn expired_ants_are_retired_and_cleared() -> Result<()> {
    let mut harness = Harness::new(WorldConfig {
        tunnels: 1,
        tunnel_length: 2,
        food: 10,
        bees: 1,
        bee_health: 10,
        release_count: 1,
        ..WorldConfig::default()
    })?;
    harness.submit(Command::Deploy {
        place: PlaceName::new("tunnel_0_1"),
        kind: InsectKind::new("Harvester"),
    });
    let _ = harness.refresh()?;
    let ant = InsectId::new(2);
    let handle = harness.tracker.handle(ant).expect("harvester drawn");

    let mut retired = false;
    for _ in 0..4 {
        harness.submit(Command::AdvanceTurn);
        let commands = harness.refresh()?;
        retired |= commands
            .iter()
            .any(|command| matches!(command, ViewCommand::Retire { insect, .. } if *insect == ant));
        harness.assert_converged();
    }

    assert!(retired, "harvester was never retired");
    assert!(harness.tracker.handle(ant).is_none());
    harness
        .animations
        .advance(&mut harness.canvas, ReconcilerConfig::default().retire_grace)?;
    assert!(harness.canvas.shape(handle).is_none());
    Ok(())
}

#[test]
fn bees_killed_on_release_are_retired_from_the_hive() -> Result<()> {
    let mut harness = Harness::new(WorldConfig {
        tunnels: 1,
        tunnel_length: 6,
        food: 10,
        bees: 2,
        bee_health: 1,
        release_count: 1,
        ..WorldConfig::default()
    })?;
    harness.submit(Command::Deploy {
        place: PlaceName::new("tunnel_0_0"),
        kind: InsectKind::new("Thrower"),
    });
    let _ = harness.refresh()?;
    let bee = InsectId::new(2);
    let handle = harness.tracker.handle(bee).expect("bee drawn in the hive");

    let mut events = Vec::new();
    apply(&mut harness.world, Command::AdvanceTurn, &mut events);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::InsectExpired { insect, .. } if *insect == bee)));

    let commands = harness.refresh()?;

    assert!(commands.iter().any(|command| matches!(
        command,
        ViewCommand::Retire { place, insect, .. }
            if *insect == bee && place.as_str() == "Hive"
    )));
    harness.assert_converged();
    assert!(harness.refresh()?.is_empty());
    harness
        .animations
        .advance(&mut harness.canvas, ReconcilerConfig::default().retire_grace)?;
    assert!(harness.canvas.shape(handle).is_none());
    Ok(())
}
