#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-turn interaction loop of the Colony Defence view.
//!
//! Every turn the loop repeatedly converges the view onto the model, then
//! waits for a click or for the rest of the turn budget. Clicks are routed
//! through the spatial registry to the control panel or to a place. Once the
//! budget is spent the ants' turn-end projectiles are launched and control
//! returns to the caller, which advances the model.

pub mod config;
pub mod effects;

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use colony_defence_core::{
    ColonyModel, ColonySnapshot, Command, DeployError, Event, InsectKind, InsectType, PlaceName,
    RemovalError, TypeRole,
};
use colony_defence_rendering::{
    rectangle_points, Canvas, ClickWait, Color, LayoutConfig, PolygonStyle, ShapeHandle,
    TextAnchor,
};
use colony_defence_system_animation::AnimationDriver;
use colony_defence_system_hit_testing::SpatialRegistry;
use colony_defence_system_reconciler::{Reconciler, ReconcilerConfig};
use colony_defence_system_view_tracker::{ViewCommand, ViewTracker};
use glam::Vec2;
use tracing::{debug, info, warn};

pub use config::{ConfigError, LoopConfig, SessionConfig};
use effects::ThrowPlanner;

const START_PROMPT: &str = "CLICK TO START";

/// Action bound to a clickable region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelAction {
    /// Arms an insect type from the control panel.
    Select(InsectKind),
    /// Deploys the armed type into a place, or removes the ant there.
    Place(PlaceName),
}

/// Phase of the interaction loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// No turn is being played.
    Idle,
    /// The view is being refreshed or a click is being dispatched.
    Running,
    /// Blocked on the canvas for a click or the end of the budget.
    WaitingForInput,
    /// The budget was spent and turn-end effects were launched.
    TurnComplete,
}

/// Diagnostic raised when the model refuses a player's command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionFeedback {
    /// A deployment was refused.
    DeployRejected {
        /// Place that was clicked.
        place: PlaceName,
        /// Type that was armed.
        kind: InsectKind,
        /// Why the model refused.
        reason: DeployError,
    },
    /// A removal was refused.
    RemovalRejected {
        /// Place that was clicked.
        place: PlaceName,
        /// Why the model refused.
        reason: RemovalError,
    },
}

impl fmt::Display for InteractionFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeployRejected {
                place,
                kind,
                reason,
            } => write!(f, "cannot deploy {kind} to {place}: {reason}"),
            Self::RemovalRejected { place, reason } => {
                write!(f, "cannot remove ant from {place}: {reason}")
            }
        }
    }
}

/// Account of one played turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TurnSummary {
    /// Model time when the turn was played.
    pub time: u32,
    /// Reconciliation passes run during the turn.
    pub refreshes: u32,
    /// Clicks received during the turn.
    pub clicks: u32,
    /// Commands the model refused.
    pub rejections: u32,
    /// Projectiles launched once the budget was spent.
    pub effects: u32,
    /// Budget consumed, never less than the configured budget.
    pub elapsed: Duration,
}

#[derive(Debug)]
struct PanelFrame {
    insect_type: InsectType,
    frame: ShapeHandle,
    fill: Color,
}

/// Everything drawn on the canvas once the session started.
#[derive(Debug)]
struct SessionView {
    reconciler: Reconciler,
    tracker: ViewTracker,
    animations: AnimationDriver,
    regions: SpatialRegistry<PanelAction>,
    panel: Vec<PanelFrame>,
    status_text: ShapeHandle,
    selection_text: ShapeHandle,
    selection_label: String,
}

impl SessionView {
    fn apply<C>(&mut self, commands: &[ViewCommand], canvas: &mut C) -> Result<()>
    where
        C: Canvas + ?Sized,
    {
        for command in commands {
            self.tracker.apply(command, canvas, &mut self.animations)?;
        }
        Ok(())
    }

    fn insect_type(&self, kind: &InsectKind) -> Option<&InsectType> {
        self.panel
            .iter()
            .map(|entry| &entry.insect_type)
            .find(|insect_type| &insect_type.kind == kind)
    }
}

/// Drives the view through the turns of a session.
///
/// Projectiles and retired insects stay on the canvas until their animation
/// clock runs out. Call [`InteractionLoop::shutdown`] before dropping the
/// loop so each of those shapes is cleared exactly once; dropping without it
/// leaves them drawn and only logs a warning.
#[derive(Debug)]
pub struct InteractionLoop {
    config: LoopConfig,
    layout_config: LayoutConfig,
    state: LoopState,
    view: Option<SessionView>,
    armed: Option<InsectKind>,
    feedback: Vec<InteractionFeedback>,
}

impl InteractionLoop {
    /// Creates a loop that lays the view out with `layout_config`.
    #[must_use]
    pub fn new(config: LoopConfig, layout_config: LayoutConfig) -> Self {
        Self {
            config,
            layout_config,
            state: LoopState::Idle,
            view: None,
            armed: None,
            feedback: Vec::new(),
        }
    }

    /// Creates a loop from a loaded session configuration.
    #[must_use]
    pub fn from_session(session: SessionConfig) -> Self {
        Self::new(session.interaction, session.layout)
    }

    /// Current phase of the loop.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Type clicking a place currently acts with.
    #[must_use]
    pub fn armed(&self) -> Option<&InsectKind> {
        self.armed.as_ref()
    }

    /// Entity tracker of the session, once the view was initialised.
    #[must_use]
    pub fn tracker(&self) -> Option<&ViewTracker> {
        self.view.as_ref().map(|view| &view.tracker)
    }

    /// Number of clickable regions registered so far.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.view.as_ref().map_or(0, |view| view.regions.len())
    }

    /// Diagnostics not collected yet.
    #[must_use]
    pub fn feedback(&self) -> &[InteractionFeedback] {
        &self.feedback
    }

    /// Takes every queued diagnostic.
    pub fn drain_feedback(&mut self) -> Vec<InteractionFeedback> {
        std::mem::take(&mut self.feedback)
    }

    /// Plays one turn: initialises the view on first use, then alternates
    /// refreshes and waits until the turn budget is spent and finally
    /// launches turn-end effects.
    pub fn play_turn<M, C>(&mut self, model: &mut M, canvas: &mut C) -> Result<TurnSummary>
    where
        M: ColonyModel + ?Sized,
        C: Canvas + ?Sized,
    {
        let mut view = match self.view.take() {
            Some(view) => view,
            None => self.initialise(model, canvas)?,
        };
        let summary = self.run_turn(&mut view, model, canvas);
        self.view = Some(view);
        summary
    }

    /// Clears every shape still owned by an animation. Returns the number of
    /// shapes cleared.
    pub fn shutdown<C>(&mut self, canvas: &mut C) -> Result<usize>
    where
        C: Canvas + ?Sized,
    {
        self.state = LoopState::Idle;
        match self.view.as_mut() {
            Some(view) => view.animations.finish_all(canvas),
            None => Ok(0),
        }
    }

    fn initialise<M, C>(&self, model: &M, canvas: &mut C) -> Result<SessionView>
    where
        M: ColonyModel + ?Sized,
        C: Canvas + ?Sized,
    {
        let snapshot = model.snapshot();
        let layout = &self.layout_config;
        info!(
            places = snapshot.places.len(),
            hive_bees = snapshot.hive.bees.len(),
            "initialising colony view"
        );

        let status_text = canvas
            .draw_text(
                &status_line(&snapshot),
                layout.status_position,
                TextAnchor::TopLeft,
            )
            .context("failed to draw status text")?;
        let selection_label = selection_line(None);
        let selection_text = canvas
            .draw_text(&selection_label, layout.selection_position, TextAnchor::TopLeft)
            .context("failed to draw selection text")?;

        let mut regions = SpatialRegistry::new();
        let mut panel = Vec::new();
        for (index, insect_type) in model.insect_types().into_iter().enumerate() {
            let slot = layout.panel_slot(index);
            let frame = canvas
                .draw_polygon(
                    &rectangle_points(slot.origin, slot.size.x, slot.size.y),
                    PolygonStyle::new(Color::BLACK, Color::WHITE),
                )
                .with_context(|| format!("failed to draw panel frame for {}", insect_type.kind))?;
            let _ = regions.register(
                slot.origin,
                slot.size.x,
                slot.size.y,
                PanelAction::Select(insect_type.kind.clone()),
            );
            let _ = canvas
                .draw_image(slot.image, &layout.asset_for(&insect_type.kind), None)
                .with_context(|| format!("failed to draw panel image for {}", insect_type.kind))?;
            let _ = canvas
                .draw_text(
                    &insect_type.food_cost.to_string(),
                    slot.cost_label,
                    TextAnchor::Center,
                )
                .with_context(|| format!("failed to draw cost label for {}", insect_type.kind))?;
            panel.push(PanelFrame {
                insect_type,
                frame,
                fill: Color::WHITE,
            });
        }

        let reconciler = Reconciler::new(
            layout.clone(),
            &snapshot,
            ReconcilerConfig {
                arrival: self.config.turn_budget,
                retire_grace: self.config.retire_grace,
                jitter_seed: self.config.jitter_seed,
            },
        );
        let place_size = reconciler.layout().place_size();
        for place in &snapshot.places {
            let Some(origin) = reconciler.layout().place_point(&place.name) else {
                warn!(place = %place.name, "place has no position");
                continue;
            };
            let fill = if place.hazard {
                Color::BLUE
            } else {
                Color::WHITE
            };
            let _ = canvas
                .draw_polygon(
                    &rectangle_points(origin, place_size.x, place_size.y),
                    PolygonStyle::new(Color::BLACK, fill),
                )
                .with_context(|| format!("failed to draw frame of {}", place.name))?;
            let _ = regions.register(
                origin,
                place_size.x,
                place_size.y,
                PanelAction::Place(place.name.clone()),
            );
            let _ = canvas
                .draw_image(origin, &layout.tunnel_asset, None)
                .with_context(|| format!("failed to draw tunnel of {}", place.name))?;
        }

        let mut view = SessionView {
            reconciler,
            tracker: ViewTracker::new(),
            animations: AnimationDriver::new(self.config.frame_interval),
            regions,
            panel,
            status_text,
            selection_text,
            selection_label,
        };
        let mut commands = Vec::new();
        view.reconciler
            .populate_reservoir(&snapshot, &view.tracker, &mut commands);
        view.apply(&commands, canvas)
            .context("failed to draw the hive")?;

        let prompt = canvas
            .draw_text(START_PROMPT, self.layout_config.message_position, TextAnchor::TopLeft)
            .context("failed to draw start prompt")?;
        let start = canvas
            .wait_for_click(None)
            .context("failed waiting for the start click")?;
        view.animations.advance(canvas, start.elapsed)?;
        canvas.clear(prompt).context("failed to clear start prompt")?;
        info!(regions = view.regions.len(), "colony view ready");
        Ok(view)
    }

    fn run_turn<M, C>(
        &mut self,
        view: &mut SessionView,
        model: &mut M,
        canvas: &mut C,
    ) -> Result<TurnSummary>
    where
        M: ColonyModel + ?Sized,
        C: Canvas + ?Sized,
    {
        let budget = self.config.turn_budget;
        let mut summary = TurnSummary {
            time: model.snapshot().time,
            ..TurnSummary::default()
        };
        info!(
            time = summary.time,
            budget_ms = budget.as_millis() as u64,
            "turn started"
        );

        let mut elapsed = Duration::ZERO;
        while elapsed < budget {
            self.state = LoopState::Running;
            self.refresh(view, &model.snapshot(), canvas)?;
            summary.refreshes += 1;

            self.state = LoopState::WaitingForInput;
            let wait = wait_sliced(view, canvas, budget - elapsed)?;
            let Some(position) = wait.position else {
                elapsed = budget;
                break;
            };
            elapsed += wait.elapsed;
            summary.clicks += 1;
            self.state = LoopState::Running;
            self.dispatch(view, model, position, &mut summary);
        }
        summary.elapsed = elapsed;

        summary.effects = self.launch_effects(view, &model.snapshot(), canvas)?;
        self.state = LoopState::TurnComplete;
        info!(
            time = summary.time,
            refreshes = summary.refreshes,
            clicks = summary.clicks,
            rejections = summary.rejections,
            effects = summary.effects,
            "turn complete"
        );
        Ok(summary)
    }

    fn refresh<C>(
        &self,
        view: &mut SessionView,
        snapshot: &ColonySnapshot,
        canvas: &mut C,
    ) -> Result<()>
    where
        C: Canvas + ?Sized,
    {
        for entry in &mut view.panel {
            let fill = if entry.insect_type.food_cost > snapshot.food {
                Color::GRAY
            } else if self.armed.as_ref() == Some(&entry.insect_type.kind) {
                Color::BLUE
            } else {
                Color::WHITE
            };
            if fill != entry.fill {
                canvas
                    .set_fill(entry.frame, fill)
                    .context("failed to recolour panel frame")?;
                entry.fill = fill;
            }
        }

        let label = selection_line(self.armed.as_ref());
        if label != view.selection_label {
            canvas
                .edit_text(view.selection_text, &label)
                .context("failed to update selection text")?;
            view.selection_label = label;
        }

        let mut commands = Vec::new();
        view.reconciler.refresh(snapshot, &view.tracker, &mut commands);
        debug!(commands = commands.len(), "view reconciled");
        view.apply(&commands, canvas)?;

        canvas
            .edit_text(view.status_text, &status_line(snapshot))
            .context("failed to update status text")?;
        Ok(())
    }

    fn dispatch<M>(
        &mut self,
        view: &SessionView,
        model: &mut M,
        position: Vec2,
        summary: &mut TurnSummary,
    ) where
        M: ColonyModel + ?Sized,
    {
        let Some(action) = view.regions.resolve(position).cloned() else {
            debug!(x = position.x, y = position.y, "click hit no region");
            return;
        };
        match action {
            PanelAction::Select(kind) => {
                info!(kind = %kind, "type armed");
                self.armed = Some(kind);
            }
            PanelAction::Place(place) => {
                let Some(armed) = self.armed.as_ref().and_then(|kind| view.insect_type(kind))
                else {
                    debug!(place = %place, "place clicked with nothing armed");
                    return;
                };
                let command = match armed.role {
                    TypeRole::Remover => {
                        let occupied = model
                            .snapshot()
                            .place(&place)
                            .is_some_and(|snapshot| snapshot.occupant.is_some());
                        if !occupied {
                            debug!(place = %place, "nothing to remove");
                            return;
                        }
                        Command::Remove { place }
                    }
                    TypeRole::Deployable => Command::Deploy {
                        place,
                        kind: armed.kind.clone(),
                    },
                };
                self.submit(model, command, summary);
            }
        }
    }

    fn submit<M>(&mut self, model: &mut M, command: Command, summary: &mut TurnSummary)
    where
        M: ColonyModel + ?Sized,
    {
        let mut events = Vec::new();
        model.submit(command, &mut events);
        for event in events {
            let feedback = match event {
                Event::AntDeployed { ant, kind, place } => {
                    info!(ant = %ant, kind = %kind, place = %place, "ant deployed");
                    continue;
                }
                Event::AntRemoved { ant, place } => {
                    info!(ant = %ant, place = %place, "ant removed");
                    continue;
                }
                Event::DeployRejected {
                    place,
                    kind,
                    reason,
                } => InteractionFeedback::DeployRejected {
                    place,
                    kind,
                    reason,
                },
                Event::RemovalRejected { place, reason } => {
                    InteractionFeedback::RemovalRejected { place, reason }
                }
                other => {
                    debug!(event = ?other, "unexpected event while dispatching a click");
                    continue;
                }
            };
            warn!(%feedback, "command rejected");
            summary.rejections += 1;
            self.feedback.push(feedback);
        }
    }

    fn launch_effects<C>(
        &self,
        view: &mut SessionView,
        snapshot: &ColonySnapshot,
        canvas: &mut C,
    ) -> Result<u32>
    where
        C: Canvas + ?Sized,
    {
        let planner = ThrowPlanner {
            snapshot,
            layout: view.reconciler.layout(),
            layout_config: view.reconciler.layout_config(),
            config: &self.config,
        };
        let mut throws = Vec::new();
        for place in &snapshot.places {
            let Some(occupant) = &place.occupant else {
                continue;
            };
            for ant in occupant.ants() {
                let Some(effect) = view
                    .insect_type(&ant.kind)
                    .and_then(|insect_type| insect_type.effect)
                else {
                    continue;
                };
                match planner.plan(place, &ant.kind, effect) {
                    Some(throw) => throws.push(throw),
                    None => debug!(ant = %ant.id, place = %place.name, "no target in range"),
                }
            }
        }

        let mut launched = 0;
        for throw in throws {
            let _ = view.animations.launch(
                canvas,
                throw.projectile,
                throw.style,
                throw.start,
                throw.end,
                throw.duration,
            )?;
            launched += 1;
        }
        Ok(launched)
    }
}

/// Waits for a click within `remaining`, advancing animations in slices no
/// longer than a frame while any are running.
fn wait_sliced<C>(view: &mut SessionView, canvas: &mut C, remaining: Duration) -> Result<ClickWait>
where
    C: Canvas + ?Sized,
{
    let mut waited = Duration::ZERO;
    loop {
        let left = remaining.saturating_sub(waited);
        let slice = if view.animations.is_idle() {
            left
        } else {
            left.min(view.animations.frame_interval())
        };
        let outcome = canvas
            .wait_for_click(Some(slice))
            .context("failed waiting for input")?;
        waited += outcome.elapsed;
        view.animations.advance(canvas, outcome.elapsed)?;

        if let Some(position) = outcome.position {
            return Ok(ClickWait::clicked(position, waited));
        }
        if waited >= remaining || outcome.elapsed.is_zero() {
            return Ok(ClickWait::timed_out(waited));
        }
    }
}

fn status_line(snapshot: &ColonySnapshot) -> String {
    format!("Food: {}  Time: {}", snapshot.food, snapshot.time)
}

fn selection_line(armed: Option<&InsectKind>) -> String {
    match armed {
        Some(kind) => format!("Ant selected: {kind}"),
        None => "Ant selected: None".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_reports_food_and_time() {
        let snapshot = ColonySnapshot {
            places: Vec::new(),
            hive: colony_defence_core::HiveSnapshot {
                name: PlaceName::new("Hive"),
                bees: Vec::new(),
            },
            food: 7,
            time: 12,
            outcome: None,
        };
        assert_eq!(status_line(&snapshot), "Food: 7  Time: 12");
    }

    #[test]
    fn selection_line_names_the_armed_type() {
        assert_eq!(selection_line(None), "Ant selected: None");
        assert_eq!(
            selection_line(Some(&InsectKind::new("Ninja"))),
            "Ant selected: Ninja"
        );
    }

    #[test]
    fn feedback_reads_like_a_sentence() {
        let feedback = InteractionFeedback::RemovalRejected {
            place: PlaceName::new("tunnel_0_2"),
            reason: RemovalError::Vacant,
        };
        assert_eq!(
            feedback.to_string(),
            "cannot remove ant from tunnel_0_2: place has no ant to remove"
        );
    }

    #[test]
    fn loops_start_idle_without_a_view() {
        let interaction = InteractionLoop::from_session(SessionConfig::default());
        assert_eq!(interaction.state(), LoopState::Idle);
        assert!(interaction.tracker().is_none());
        assert_eq!(interaction.region_count(), 0);
    }
}
