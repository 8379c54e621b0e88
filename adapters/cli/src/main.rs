#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a scripted Colony Defence session on the
//! headless canvas.

mod autoplay;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use colony_defence_core::{ColonyModel, Command};
use colony_defence_rendering_headless::HeadlessCanvas;
use colony_defence_system_interaction::{InteractionLoop, SessionConfig};
use colony_defence_world::{query, World, WorldConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use autoplay::AutoPlayer;

/// Command-line arguments for the Colony Defence session runner.
#[derive(Debug, Parser)]
#[command(name = "colony-defence", about = "Plays a scripted Colony Defence session")]
struct CliArgs {
    /// Maximum number of turns to play.
    #[arg(long, default_value_t = 10)]
    turns: u32,
    /// TOML file overriding layout and loop settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed of the scripted player and of the hive scatter.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of parallel tunnels.
    #[arg(long, default_value_t = WorldConfig::default().tunnels)]
    tunnels: u32,
    /// Number of places per tunnel.
    #[arg(long, default_value_t = WorldConfig::default().tunnel_length)]
    tunnel_length: u32,
    /// Food available at the start.
    #[arg(long, default_value_t = WorldConfig::default().food)]
    food: u32,
    /// Number of bees waiting in the hive.
    #[arg(long, default_value_t = WorldConfig::default().bees)]
    bees: u32,
}

/// Entry point for the Colony Defence command-line interface.
fn main() {
    init_tracing();
    let args = CliArgs::parse();
    if let Err(err) = run(args) {
        error!(error = %format!("{err:#}"), "session failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run(args: CliArgs) -> Result<()> {
    let mut session = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SessionConfig::default(),
    };
    let seed = args.seed.unwrap_or(session.interaction.jitter_seed);
    session.interaction.jitter_seed = seed;

    let mut world = World::with_config(WorldConfig {
        tunnels: args.tunnels,
        tunnel_length: args.tunnel_length,
        food: args.food,
        bees: args.bees,
        ..WorldConfig::default()
    });
    info!(
        tunnels = args.tunnels,
        tunnel_length = args.tunnel_length,
        food = query::food(&world),
        bees = args.bees,
        "session starting"
    );

    let mut player = AutoPlayer::new(
        seed,
        session.layout.clone(),
        &world.snapshot(),
        session.interaction.turn_budget,
    );
    let mut canvas = HeadlessCanvas::new();
    canvas.push_click(Duration::ZERO, player.start_click());
    let mut interaction = InteractionLoop::from_session(session);
    let types = world.insect_types();

    let mut played = 0;
    while played < args.turns {
        let _ = player.plan_turn(&world.snapshot(), &types, &mut canvas);
        let summary = interaction.play_turn(&mut world, &mut canvas)?;
        for feedback in interaction.drain_feedback() {
            info!(%feedback, "scripted click refused");
        }
        played += 1;

        let mut events = Vec::new();
        world.submit(Command::AdvanceTurn, &mut events);
        info!(
            time = summary.time,
            clicks = summary.clicks,
            effects = summary.effects,
            events = events.len(),
            "turn played"
        );
        if let Some(outcome) = query::outcome(&world) {
            info!(?outcome, turns = played, "game over");
            break;
        }
    }

    let flushed = interaction.shutdown(&mut canvas)?;
    info!(
        turns = played,
        canvas_calls = canvas.calls().len(),
        live_shapes = canvas.live_shapes(),
        flushed,
        virtual_seconds = canvas.clock().as_secs_f64(),
        "session finished"
    );
    Ok(())
}
