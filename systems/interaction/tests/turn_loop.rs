use std::time::Duration;

use anyhow::Result;
use colony_defence_core::{Command, DeployError, InsectId, InsectKind, PlaceName};
use colony_defence_rendering::{Color, LayoutConfig, PlayAreaLayout};
use colony_defence_rendering_headless::{CanvasCall, HeadlessCanvas, ShapeKind};
use colony_defence_system_interaction::{
    InteractionFeedback, InteractionLoop, LoopConfig, LoopState,
};
use colony_defence_world::{apply, query, World, WorldConfig};
use glam::Vec2;

const HARVESTER: usize = 0;
const THROWER: usize = 1;
const REMOVER: usize = 7;

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value)
}

fn panel_click(index: usize) -> Vec2 {
    let slot = LayoutConfig::default().panel_slot(index);
    slot.origin + slot.size / 2.0
}

fn place_click(world: &World, name: &str) -> Vec2 {
    let layout = PlayAreaLayout::compute(&LayoutConfig::default(), &query::snapshot(world));
    let origin = layout
        .place_point(&PlaceName::new(name))
        .expect("place is laid out");
    origin + layout.place_size() / 2.0
}

fn corridor(food: u32) -> World {
    World::with_config(WorldConfig {
        tunnels: 1,
        tunnel_length: 4,
        food,
        bees: 2,
        release_count: 1,
        ..WorldConfig::default()
    })
}

fn new_loop() -> InteractionLoop {
    InteractionLoop::new(LoopConfig::default(), LayoutConfig::default())
}

fn advance(world: &mut World) {
    let mut events = Vec::new();
    apply(world, Command::AdvanceTurn, &mut events);
}

fn bounded_waits(calls: &[CanvasCall]) -> usize {
    calls
        .iter()
        .filter(|call| matches!(call, CanvasCall::Wait { timeout: Some(_), .. }))
        .count()
}

#[test]
fn start_click_is_consumed_without_dispatch() -> Result<()> {
    let mut world = World::new();
    let mut canvas = HeadlessCanvas::new();
    canvas.push_click(Duration::ZERO, panel_click(HARVESTER));
    let mut interaction = new_loop();
    assert_eq!(interaction.state(), LoopState::Idle);

    let summary = interaction.play_turn(&mut world, &mut canvas)?;

    assert_eq!(interaction.armed(), None);
    assert!(canvas.find_text("CLICK TO START").is_none());
    assert_eq!(canvas.find_text("Ant selected:"), Some("Ant selected: None"));
    assert_eq!(canvas.find_text("Food:"), Some("Food: 2  Time: 0"));
    assert_eq!(interaction.region_count(), 8 + 3 * 8);
    assert_eq!(summary.refreshes, 1);
    assert_eq!(summary.clicks, 0);
    assert_eq!(summary.elapsed, LoopConfig::default().turn_budget);
    assert_eq!(interaction.state(), LoopState::TurnComplete);
    Ok(())
}

#[test]
fn every_wait_is_preceded_by_exactly_one_refresh() -> Result<()> {
    let mut world = corridor(10);
    let mut canvas = HeadlessCanvas::new();
    canvas.push_click(Duration::ZERO, Vec2::ZERO);
    canvas.push_click(secs(1.0), panel_click(HARVESTER));
    canvas.push_click(secs(1.0), place_click(&world, "tunnel_0_3"));
    let mut interaction = new_loop();

    let summary = interaction.play_turn(&mut world, &mut canvas)?;

    assert_eq!(summary.clicks, 2);
    assert_eq!(summary.refreshes, 3);
    assert_eq!(bounded_waits(canvas.calls()), 3);
    assert_eq!(summary.elapsed, secs(3.0));
    assert!(canvas.clock() >= secs(3.0));

    let tracker = interaction.tracker().expect("view initialised");
    assert_eq!(
        tracker.location(InsectId::new(3)),
        Some(&PlaceName::new("tunnel_0_3"))
    );
    assert_eq!(query::food(&world), 8);
    Ok(())
}

#[test]
fn clicks_past_the_budget_roll_into_the_next_turn() -> Result<()> {
    let mut world = corridor(10);
    let mut canvas = HeadlessCanvas::new();
    canvas.push_click(Duration::ZERO, Vec2::ZERO);
    canvas.push_click(secs(2.0), panel_click(HARVESTER));
    canvas.push_click(secs(2.0), panel_click(THROWER));
    let mut interaction = new_loop();

    let first = interaction.play_turn(&mut world, &mut canvas)?;
    assert_eq!(first.clicks, 1);
    assert_eq!(first.refreshes, 2);
    assert_eq!(first.elapsed, secs(3.0));
    assert_eq!(interaction.armed(), Some(&InsectKind::new("Harvester")));

    let second = interaction.play_turn(&mut world, &mut canvas)?;
    assert_eq!(second.clicks, 1);
    assert_eq!(interaction.armed(), Some(&InsectKind::new("Thrower")));
    assert_eq!(canvas.clock(), secs(6.0));
    Ok(())
}

#[test]
fn rejected_deployments_draw_nothing_and_raise_feedback() -> Result<()> {
    let mut world = corridor(2);
    let mut canvas = HeadlessCanvas::new();
    canvas.push_click(Duration::ZERO, Vec2::ZERO);
    let mut interaction = new_loop();
    let _ = interaction.play_turn(&mut world, &mut canvas)?;
    let _ = canvas.take_calls();

    canvas.push_click(secs(0.5), panel_click(THROWER));
    canvas.push_click(secs(0.5), place_click(&world, "tunnel_0_1"));
    let summary = interaction.play_turn(&mut world, &mut canvas)?;

    let draws = canvas
        .calls()
        .iter()
        .filter(|call| {
            matches!(
                call,
                CanvasCall::DrawImage { .. }
                    | CanvasCall::DrawPolygon { .. }
                    | CanvasCall::DrawText { .. }
            )
        })
        .count();
    assert_eq!(draws, 0);
    assert_eq!(summary.rejections, 1);
    assert_eq!(
        interaction.drain_feedback(),
        vec![InteractionFeedback::DeployRejected {
            place: PlaceName::new("tunnel_0_1"),
            kind: InsectKind::new("Thrower"),
            reason: DeployError::InsufficientFood {
                cost: 3,
                available: 2,
            },
        }]
    );
    assert!(interaction.feedback().is_empty());
    assert_eq!(query::food(&world), 2);
    Ok(())
}

#[test]
fn unaffordable_types_are_greyed_and_armed_types_highlighted() -> Result<()> {
    let mut world = corridor(2);
    let mut canvas = HeadlessCanvas::new();
    canvas.push_click(Duration::ZERO, Vec2::ZERO);
    canvas.push_click(secs(0.5), panel_click(HARVESTER));
    let mut interaction = new_loop();

    let _ = interaction.play_turn(&mut world, &mut canvas)?;

    let fills: Vec<Color> = canvas
        .calls()
        .iter()
        .filter_map(|call| match call {
            CanvasCall::SetFill { color, .. } => Some(*color),
            _ => None,
        })
        .collect();
    assert!(fills.contains(&Color::GRAY), "thrower costs more than 2 food");
    assert_eq!(fills.last(), Some(&Color::BLUE));
    assert_eq!(
        canvas.find_text("Ant selected:"),
        Some("Ant selected: Harvester")
    );
    Ok(())
}

#[test]
fn remover_only_acts_on_occupied_places() -> Result<()> {
    let mut world = corridor(10);
    let mut canvas = HeadlessCanvas::new();
    canvas.push_click(Duration::ZERO, Vec2::ZERO);
    canvas.push_click(secs(0.5), panel_click(HARVESTER));
    canvas.push_click(secs(0.5), place_click(&world, "tunnel_0_0"));
    let mut interaction = new_loop();
    let _ = interaction.play_turn(&mut world, &mut canvas)?;
    let ant = InsectId::new(3);
    assert!(interaction
        .tracker()
        .is_some_and(|tracker| tracker.location(ant).is_some()));

    canvas.push_click(secs(0.5), panel_click(REMOVER));
    canvas.push_click(secs(0.5), place_click(&world, "tunnel_0_1"));
    canvas.push_click(secs(0.5), place_click(&world, "tunnel_0_0"));
    let summary = interaction.play_turn(&mut world, &mut canvas)?;

    assert_eq!(summary.rejections, 0);
    assert!(interaction.feedback().is_empty());
    assert!(interaction
        .tracker()
        .is_some_and(|tracker| tracker.location(ant).is_none()));
    Ok(())
}

#[test]
fn clicks_outside_every_region_are_ignored() -> Result<()> {
    let mut world = corridor(10);
    let mut canvas = HeadlessCanvas::new();
    canvas.push_click(Duration::ZERO, Vec2::ZERO);
    canvas.push_click(secs(0.5), Vec2::new(5.0, 5.0));
    canvas.push_click(secs(0.5), Vec2::new(-20.0, 900.0));
    let mut interaction = new_loop();

    let summary = interaction.play_turn(&mut world, &mut canvas)?;

    assert_eq!(summary.clicks, 2);
    assert_eq!(interaction.armed(), None);
    assert_eq!(query::food(&world), 10);
    Ok(())
}

/// Plays three turns in which a thrower shoots at an advancing bee.
fn thrower_session(canvas: &mut HeadlessCanvas) -> Result<(World, InteractionLoop)> {
    let mut world = corridor(10);
    canvas.push_click(Duration::ZERO, Vec2::ZERO);
    canvas.push_click(secs(0.5), panel_click(THROWER));
    canvas.push_click(secs(0.5), place_click(&world, "tunnel_0_0"));
    let mut interaction = new_loop();

    let first = interaction.play_turn(&mut world, canvas)?;
    assert_eq!(first.effects, 0);
    advance(&mut world);
    let second = interaction.play_turn(&mut world, canvas)?;
    assert_eq!(second.effects, 1);
    advance(&mut world);
    let _ = interaction.play_turn(&mut world, canvas)?;
    Ok((world, interaction))
}

#[test]
fn projectiles_are_cleared_exactly_once() -> Result<()> {
    let mut canvas = HeadlessCanvas::new();
    let _ = thrower_session(&mut canvas)?;

    let leaves: Vec<_> = canvas
        .calls()
        .iter()
        .filter_map(|call| match call {
            CanvasCall::DrawPolygon { shape } => canvas
                .calls()
                .iter()
                .any(|other| matches!(other, CanvasCall::Reshape { shape: reshaped } if reshaped == shape))
                .then_some(*shape),
            _ => None,
        })
        .collect();
    assert_eq!(leaves.len(), 2, "one leaf per turn with a bee in range");

    let first_leaf = leaves[0];
    let clears = canvas
        .calls()
        .iter()
        .filter(|call| matches!(call, CanvasCall::Clear { shape } if *shape == first_leaf))
        .count();
    assert_eq!(clears, 1);
    assert!(canvas.shape(first_leaf).is_none());

    let sliced = canvas.calls().iter().any(|call| {
        matches!(
            call,
            CanvasCall::Wait { timeout: Some(timeout), .. }
                if *timeout <= LoopConfig::default().frame_interval
        )
    });
    assert!(sliced, "waits are sliced while a leaf is in flight");
    Ok(())
}

#[test]
fn shutdown_flushes_projectiles_still_in_flight() -> Result<()> {
    let mut canvas = HeadlessCanvas::new();
    let (_, mut interaction) = thrower_session(&mut canvas)?;

    let in_flight = canvas
        .calls()
        .iter()
        .rev()
        .find_map(|call| match call {
            CanvasCall::DrawPolygon { shape } => Some(*shape),
            _ => None,
        })
        .expect("last turn launched a leaf");
    assert!(matches!(
        canvas.shape(in_flight).map(|record| &record.kind),
        Some(ShapeKind::Polygon { .. })
    ));

    assert_eq!(interaction.shutdown(&mut canvas)?, 1);
    assert!(canvas.shape(in_flight).is_none());
    assert_eq!(interaction.shutdown(&mut canvas)?, 0);
    Ok(())
}

#[test]
fn scripted_sessions_replay_identically() -> Result<()> {
    let mut first = HeadlessCanvas::new();
    let mut second = HeadlessCanvas::new();

    let _ = thrower_session(&mut first)?;
    let _ = thrower_session(&mut second)?;

    assert_eq!(first.calls(), second.calls());
    Ok(())
}

#[test]
fn lost_drawing_surface_ends_the_turn_with_an_error() -> Result<()> {
    let mut world = corridor(10);
    let mut canvas = HeadlessCanvas::new();
    canvas.push_click(Duration::ZERO, Vec2::ZERO);
    let mut interaction = new_loop();
    let _ = interaction.play_turn(&mut world, &mut canvas)?;

    canvas.fail_after_draws(0);
    canvas.push_click(secs(0.5), panel_click(HARVESTER));
    canvas.push_click(secs(0.5), place_click(&world, "tunnel_0_3"));

    let error = interaction
        .play_turn(&mut world, &mut canvas)
        .expect_err("drawing the harvester fails");

    assert!(
        format!("{error:#}").contains("failed to draw insect"),
        "unexpected error: {error:#}"
    );
    let snapshot = query::snapshot(&world);
    let place = snapshot
        .place(&PlaceName::new("tunnel_0_3"))
        .expect("place exists");
    assert!(place.occupant.is_some());
    let tracker = interaction.tracker().expect("view survives the failure");
    assert_eq!(tracker.location(InsectId::new(3)), None);
    Ok(())
}

#[test]
fn initialisation_failures_name_the_panel_entry() {
    for (draws, expected) in [
        (3, "failed to draw panel image for Harvester"),
        (4, "failed to draw cost label for Harvester"),
    ] {
        let mut world = World::new();
        let mut canvas = HeadlessCanvas::new();
        canvas.fail_after_draws(draws);
        let mut interaction = new_loop();

        let error = interaction
            .play_turn(&mut world, &mut canvas)
            .expect_err("panel cannot be drawn");

        assert!(
            format!("{error:#}").contains(expected),
            "unexpected error: {error:#}"
        );
        assert!(interaction.tracker().is_none());
    }
}
