#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Colony Defence engine.
//!
//! This crate defines the message surface that connects the view layer and
//! the authoritative colony model. The view reads immutable
//! [`ColonySnapshot`] values once per refresh, submits [`Command`] values
//! describing desired mutations, and learns about their outcome from the
//! [`Event`] values the model broadcasts in response. The model never reports
//! a diff; the view infers additions, moves and removals from snapshots.

use std::{collections::BTreeSet, error::Error, fmt};

use serde::{Deserialize, Serialize};

/// Stable identifier the model assigns to every insect it creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InsectId(u32);

impl InsectId {
    /// Creates a new insect identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for InsectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique name of a place in the colony. Places are keyed by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceName(String);

impl PlaceName {
    /// Creates a place name from any string-like value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of an insect type, e.g. `Thrower` or `Bee`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsectKind(String);

impl InsectKind {
    /// Creates an insect kind from any string-like value.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// Borrows the kind as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InsectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable view of a single insect.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InsectSnapshot {
    /// Identifier allocated by the model.
    pub id: InsectId,
    /// Type of the insect.
    pub kind: InsectKind,
}

impl InsectSnapshot {
    /// Creates a new insect snapshot.
    #[must_use]
    pub fn new(id: InsectId, kind: InsectKind) -> Self {
        Self { id, kind }
    }
}

/// Stationary ant hosted by a place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Occupant {
    /// A plain ant.
    Simple(InsectSnapshot),
    /// An ant able to carry another ant.
    Carrier {
        /// The carrying ant itself.
        carrier: InsectSnapshot,
        /// The ant carried inside, if any.
        passenger: Option<InsectSnapshot>,
    },
}

impl Occupant {
    /// The ant that owns the place slot.
    #[must_use]
    pub fn primary(&self) -> &InsectSnapshot {
        match self {
            Self::Simple(ant) => ant,
            Self::Carrier { carrier, .. } => carrier,
        }
    }

    /// The carried ant, if the occupant is a loaded carrier.
    #[must_use]
    pub fn passenger(&self) -> Option<&InsectSnapshot> {
        match self {
            Self::Simple(_) => None,
            Self::Carrier { passenger, .. } => passenger.as_ref(),
        }
    }

    /// Iterates the primary ant followed by its passenger.
    pub fn ants(&self) -> impl Iterator<Item = &InsectSnapshot> {
        std::iter::once(self.primary()).chain(self.passenger())
    }
}

/// Immutable view of a place in the tunnel graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaceSnapshot {
    /// Unique name of the place.
    pub name: PlaceName,
    /// Ant stationed in the place, if any.
    pub occupant: Option<Occupant>,
    /// Bees currently inside the place.
    pub bees: Vec<InsectSnapshot>,
    /// Next place along the path toward the colony base. `None` when the
    /// place opens directly onto the base.
    pub exit: Option<PlaceName>,
    /// Whether the place is flooded.
    pub hazard: bool,
}

impl PlaceSnapshot {
    /// Identifiers of every insect the model reports inside the place.
    #[must_use]
    pub fn valid_insects(&self) -> BTreeSet<InsectId> {
        let mut valid: BTreeSet<InsectId> = self.bees.iter().map(|bee| bee.id).collect();
        if let Some(occupant) = &self.occupant {
            valid.extend(occupant.ants().map(|ant| ant.id));
        }
        valid
    }
}

/// Holding area for bees that have not entered the tunnels yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HiveSnapshot {
    /// Name under which the hive is addressed.
    pub name: PlaceName,
    /// Bees waiting inside the hive.
    pub bees: Vec<InsectSnapshot>,
}

/// Final result of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Every bee has been defeated.
    ColonyDefended,
    /// A bee reached the colony base.
    ColonyOverrun,
}

/// Complete snapshot of the model read by the view on every refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColonySnapshot {
    /// Places in model order.
    pub places: Vec<PlaceSnapshot>,
    /// The hive.
    pub hive: HiveSnapshot,
    /// Food available for deployments.
    pub food: u32,
    /// Number of turns elapsed.
    pub time: u32,
    /// Result of the game once it has ended.
    pub outcome: Option<Outcome>,
}

impl ColonySnapshot {
    /// Looks up a place by name.
    #[must_use]
    pub fn place(&self, name: &PlaceName) -> Option<&PlaceSnapshot> {
        self.places.iter().find(|place| &place.name == name)
    }

    /// Places whose exit leads into `name`, in model order.
    pub fn entrances_of<'a>(
        &'a self,
        name: &'a PlaceName,
    ) -> impl Iterator<Item = &'a PlaceSnapshot> + 'a {
        self.places
            .iter()
            .filter(move |place| place.exit.as_ref() == Some(name))
    }
}

/// What selecting an insect type in the control panel arms the player with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRole {
    /// Clicking a place deploys an ant of this type.
    Deployable,
    /// Clicking a place removes the ant stationed there.
    Remover,
}

/// Effect an ant produces at the end of every turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnEndEffect {
    /// Throws a projectile at the nearest bee between the two ranges, measured
    /// in places walked toward the hive.
    Ranged {
        /// Minimum distance of a valid target.
        min_range: u32,
        /// Maximum distance of a valid target, unbounded when `None`.
        max_range: Option<u32>,
    },
    /// Strikes every bee that shares the ant's place.
    Sweep,
}

/// Entry of the model's insect type registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsectType {
    /// Name of the type.
    pub kind: InsectKind,
    /// Food consumed by a deployment.
    pub food_cost: u32,
    /// Behaviour of the type when armed in the control panel.
    pub role: TypeRole,
    /// Turn-end effect produced by ants of this type.
    pub effect: Option<TurnEndEffect>,
}

impl InsectType {
    /// Creates a deployable type without a turn-end effect.
    #[must_use]
    pub fn deployable(kind: impl Into<String>, food_cost: u32) -> Self {
        Self {
            kind: InsectKind::new(kind),
            food_cost,
            role: TypeRole::Deployable,
            effect: None,
        }
    }

    /// Attaches a turn-end effect to the type.
    #[must_use]
    pub fn with_effect(mut self, effect: TurnEndEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    /// Creates the pseudo-type that removes ants.
    #[must_use]
    pub fn remover(kind: impl Into<String>) -> Self {
        Self {
            kind: InsectKind::new(kind),
            food_cost: 0,
            role: TypeRole::Remover,
            effect: None,
        }
    }
}

/// Commands that express all permissible model mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requests deployment of an ant into a place.
    Deploy {
        /// Target place.
        place: PlaceName,
        /// Type of ant to deploy.
        kind: InsectKind,
    },
    /// Requests removal of the ant stationed in a place.
    Remove {
        /// Place whose ant should be removed.
        place: PlaceName,
    },
    /// Advances the simulation by a single turn.
    AdvanceTurn,
}

/// Events broadcast by the model after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that an ant was deployed.
    AntDeployed {
        /// Identifier assigned to the ant.
        ant: InsectId,
        /// Type of the deployed ant.
        kind: InsectKind,
        /// Place now hosting the ant.
        place: PlaceName,
    },
    /// Confirms that an ant was removed.
    AntRemoved {
        /// Identifier of the removed ant.
        ant: InsectId,
        /// Place the ant was removed from.
        place: PlaceName,
    },
    /// Reports that a deployment was rejected.
    DeployRejected {
        /// Place targeted by the request.
        place: PlaceName,
        /// Type requested.
        kind: InsectKind,
        /// Reason the deployment failed.
        reason: DeployError,
    },
    /// Reports that a removal was rejected.
    RemovalRejected {
        /// Place targeted by the request.
        place: PlaceName,
        /// Reason the removal failed.
        reason: RemovalError,
    },
    /// Confirms that a bee moved between places.
    BeeAdvanced {
        /// Identifier of the bee.
        bee: InsectId,
        /// Place the bee left.
        from: PlaceName,
        /// Place the bee entered.
        to: PlaceName,
    },
    /// Reports that an insect ran out of health.
    InsectExpired {
        /// Identifier of the insect.
        insect: InsectId,
        /// Place the insect occupied.
        place: PlaceName,
    },
    /// Indicates that the simulation clock advanced.
    TurnAdvanced {
        /// Turn counter after advancing.
        time: u32,
    },
    /// Announces the end of the game.
    GameOver {
        /// Final result.
        outcome: Outcome,
    },
}

/// Reasons a deployment can be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeployError {
    /// No place with the requested name exists.
    UnknownPlace,
    /// The requested type is not registered.
    UnknownKind,
    /// The type is a tool rather than an ant.
    NotDeployable,
    /// The colony cannot afford the ant.
    InsufficientFood {
        /// Food required by the type.
        cost: u32,
        /// Food available when the request was processed.
        available: u32,
    },
    /// The place already hosts an ant that cannot take another one.
    Occupied,
    /// The game has already ended.
    GameOver,
}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPlace => write!(f, "no such place"),
            Self::UnknownKind => write!(f, "no such ant type"),
            Self::NotDeployable => write!(f, "type cannot be deployed"),
            Self::InsufficientFood { cost, available } => {
                write!(f, "not enough food (costs {cost}, have {available})")
            }
            Self::Occupied => write!(f, "place is already occupied"),
            Self::GameOver => write!(f, "game is over"),
        }
    }
}

impl Error for DeployError {}

/// Reasons a removal can be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RemovalError {
    /// No place with the requested name exists.
    UnknownPlace,
    /// The place hosts no ant.
    Vacant,
    /// The game has already ended.
    GameOver,
}

impl fmt::Display for RemovalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPlace => write!(f, "no such place"),
            Self::Vacant => write!(f, "place has no ant to remove"),
            Self::GameOver => write!(f, "game is over"),
        }
    }
}

impl Error for RemovalError {}

/// Interface the view layer requires from a colony model.
pub trait ColonyModel {
    /// Captures the current state of the colony.
    fn snapshot(&self) -> ColonySnapshot;

    /// Lists the registered insect types in control-panel order.
    fn insect_types(&self) -> Vec<InsectType>;

    /// Executes a command, appending the resulting events to `out`.
    fn submit(&mut self, command: Command, out: &mut Vec<Event>);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insect(id: u32, kind: &str) -> InsectSnapshot {
        InsectSnapshot::new(InsectId::new(id), InsectKind::new(kind))
    }

    #[test]
    fn valid_insects_include_passenger_and_bees() {
        let place = PlaceSnapshot {
            name: PlaceName::new("tunnel_0_0"),
            occupant: Some(Occupant::Carrier {
                carrier: insect(1, "Bodyguard"),
                passenger: Some(insect(2, "Thrower")),
            }),
            bees: vec![insect(3, "Bee"), insect(4, "Bee")],
            exit: None,
            hazard: false,
        };

        let valid: Vec<u32> = place.valid_insects().iter().map(InsectId::get).collect();
        assert_eq!(valid, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_carrier_reports_only_itself() {
        let occupant = Occupant::Carrier {
            carrier: insect(7, "Bodyguard"),
            passenger: None,
        };

        assert_eq!(occupant.primary().id, InsectId::new(7));
        assert!(occupant.passenger().is_none());
        assert_eq!(occupant.ants().count(), 1);
    }

    #[test]
    fn entrances_follow_exit_links() {
        let first = PlaceName::new("tunnel_0_0");
        let second = PlaceName::new("tunnel_0_1");
        let snapshot = ColonySnapshot {
            places: vec![
                PlaceSnapshot {
                    name: first.clone(),
                    occupant: None,
                    bees: Vec::new(),
                    exit: None,
                    hazard: false,
                },
                PlaceSnapshot {
                    name: second.clone(),
                    occupant: None,
                    bees: Vec::new(),
                    exit: Some(first.clone()),
                    hazard: false,
                },
            ],
            hive: HiveSnapshot {
                name: PlaceName::new("Hive"),
                bees: Vec::new(),
            },
            food: 0,
            time: 0,
            outcome: None,
        };

        let entrances: Vec<&PlaceName> = snapshot
            .entrances_of(&first)
            .map(|place| &place.name)
            .collect();
        assert_eq!(entrances, vec![&second]);
        assert_eq!(snapshot.entrances_of(&second).count(), 0);
    }

    #[test]
    fn deploy_error_messages_are_human_readable() {
        let error = DeployError::InsufficientFood {
            cost: 4,
            available: 1,
        };

        assert_eq!(error.to_string(), "not enough food (costs 4, have 1)");
    }
}
