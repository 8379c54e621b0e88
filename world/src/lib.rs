#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative reference colony used to drive the Colony Defence view.
//!
//! The world keeps its rules deliberately small: ants are deployed for food,
//! harvesters produce food, throwers damage the nearest bee in range, ninjas
//! strike bees that share their place, and bees either sting the ant blocking
//! them or advance one place toward the colony base per turn.

use colony_defence_core::{
    ColonyModel, ColonySnapshot, Command, DeployError, Event, HiveSnapshot, InsectId, InsectKind,
    InsectSnapshot, InsectType, Occupant, Outcome, PlaceName, PlaceSnapshot, RemovalError,
    TurnEndEffect, TypeRole,
};

const HIVE_NAME: &str = "Hive";
const BEE_KIND: &str = "Bee";

/// Parameters describing the tunnel layout and the bee assault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldConfig {
    /// Number of parallel tunnels.
    pub tunnels: u32,
    /// Number of places in each tunnel.
    pub tunnel_length: u32,
    /// Every n-th place of a tunnel is flooded when set.
    pub water_every: Option<u32>,
    /// Food available at the start of the game.
    pub food: u32,
    /// Number of bees waiting in the hive.
    pub bees: u32,
    /// Health of every bee.
    pub bee_health: u32,
    /// Number of turns between releases from the hive.
    pub release_interval: u32,
    /// Number of bees released at once.
    pub release_count: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tunnels: 3,
            tunnel_length: 8,
            water_every: None,
            food: 2,
            bees: 8,
            bee_health: 3,
            release_interval: 2,
            release_count: 2,
        }
    }
}

/// Rules applied to ants of a given kind.
#[derive(Clone, Copy, Debug)]
struct AntRules {
    health: u32,
    blocks_bees: bool,
    carrier: bool,
    harvest: u32,
}

impl AntRules {
    const fn new(health: u32) -> Self {
        Self {
            health,
            blocks_bees: true,
            carrier: false,
            harvest: 0,
        }
    }
}

#[derive(Clone, Debug)]
struct Registered {
    insect_type: InsectType,
    rules: AntRules,
}

fn default_registry() -> Vec<Registered> {
    let ranged = |min_range, max_range| TurnEndEffect::Ranged {
        min_range,
        max_range,
    };
    vec![
        Registered {
            insect_type: InsectType::deployable("Harvester", 2),
            rules: AntRules {
                harvest: 1,
                ..AntRules::new(1)
            },
        },
        Registered {
            insect_type: InsectType::deployable("Thrower", 3).with_effect(ranged(0, None)),
            rules: AntRules::new(1),
        },
        Registered {
            insect_type: InsectType::deployable("Short", 2).with_effect(ranged(0, Some(3))),
            rules: AntRules::new(1),
        },
        Registered {
            insect_type: InsectType::deployable("Long", 2).with_effect(ranged(5, None)),
            rules: AntRules::new(1),
        },
        Registered {
            insect_type: InsectType::deployable("Ninja", 5).with_effect(TurnEndEffect::Sweep),
            rules: AntRules {
                blocks_bees: false,
                ..AntRules::new(1)
            },
        },
        Registered {
            insect_type: InsectType::deployable("Wall", 4),
            rules: AntRules::new(4),
        },
        Registered {
            insect_type: InsectType::deployable("Bodyguard", 4),
            rules: AntRules {
                carrier: true,
                ..AntRules::new(2)
            },
        },
        Registered {
            insect_type: InsectType::remover("Remover"),
            rules: AntRules::new(0),
        },
    ]
}

#[derive(Clone, Debug)]
struct Ant {
    id: InsectId,
    kind: InsectKind,
    health: u32,
    rules: AntRules,
    passenger: Option<Box<Ant>>,
}

impl Ant {
    fn snapshot(&self) -> InsectSnapshot {
        InsectSnapshot::new(self.id, self.kind.clone())
    }

    fn occupant(&self) -> Occupant {
        if self.rules.carrier {
            Occupant::Carrier {
                carrier: self.snapshot(),
                passenger: self.passenger.as_ref().map(|ant| ant.snapshot()),
            }
        } else {
            Occupant::Simple(self.snapshot())
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Bee {
    id: InsectId,
    health: u32,
}

#[derive(Clone, Debug)]
struct Place {
    name: PlaceName,
    exit: Option<usize>,
    hazard: bool,
    ant: Option<Ant>,
    bees: Vec<Bee>,
}

/// Represents the authoritative colony state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    registry: Vec<Registered>,
    places: Vec<Place>,
    entrances: Vec<usize>,
    hive: Vec<Bee>,
    food: u32,
    time: u32,
    next_id: u32,
    next_entrance: usize,
    outcome: Option<Outcome>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a colony using the default layout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates a colony using the provided layout and assault parameters.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        let mut world = Self {
            config,
            registry: default_registry(),
            places: Vec::new(),
            entrances: Vec::new(),
            hive: Vec::new(),
            food: config.food,
            time: 0,
            next_id: 1,
            next_entrance: 0,
            outcome: None,
        };
        world.build_tunnels();
        world.fill_hive();
        world
    }

    fn build_tunnels(&mut self) {
        for row in 0..self.config.tunnels {
            let mut previous = None;
            for column in 0..self.config.tunnel_length {
                let hazard = self
                    .config
                    .water_every
                    .filter(|every| *every > 0)
                    .is_some_and(|every| (column + 1) % every == 0);
                let prefix = if hazard { "water" } else { "tunnel" };
                self.places.push(Place {
                    name: PlaceName::new(format!("{prefix}_{row}_{column}")),
                    exit: previous,
                    hazard,
                    ant: None,
                    bees: Vec::new(),
                });
                previous = Some(self.places.len() - 1);
            }
            if let Some(entrance) = previous {
                self.entrances.push(entrance);
            }
        }
    }

    fn fill_hive(&mut self) {
        for _ in 0..self.config.bees {
            let id = self.allocate_id();
            self.hive.push(Bee {
                id,
                health: self.config.bee_health,
            });
        }
    }

    fn allocate_id(&mut self) -> InsectId {
        let id = InsectId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn place_index(&self, name: &PlaceName) -> Option<usize> {
        self.places.iter().position(|place| &place.name == name)
    }

    fn registered(&self, kind: &InsectKind) -> Option<&Registered> {
        self.registry
            .iter()
            .find(|entry| &entry.insect_type.kind == kind)
    }

    fn deploy(&mut self, place: &PlaceName, kind: &InsectKind) -> Result<InsectId, DeployError> {
        if self.outcome.is_some() {
            return Err(DeployError::GameOver);
        }
        let index = self.place_index(place).ok_or(DeployError::UnknownPlace)?;
        let entry = self.registered(kind).ok_or(DeployError::UnknownKind)?;
        if entry.insect_type.role != TypeRole::Deployable {
            return Err(DeployError::NotDeployable);
        }
        let cost = entry.insect_type.food_cost;
        let rules = entry.rules;
        if cost > self.food {
            return Err(DeployError::InsufficientFood {
                cost,
                available: self.food,
            });
        }

        let slot = &self.places[index].ant;
        let fits = match slot {
            None => true,
            Some(existing) if existing.rules.carrier => {
                existing.passenger.is_none() && !rules.carrier
            }
            Some(_) => rules.carrier,
        };
        if !fits {
            return Err(DeployError::Occupied);
        }

        let id = self.allocate_id();
        let ant = Ant {
            id,
            kind: kind.clone(),
            health: rules.health,
            rules,
            passenger: None,
        };
        let slot = &mut self.places[index].ant;
        *slot = Some(match slot.take() {
            None => ant,
            Some(mut carrier) if carrier.rules.carrier => {
                carrier.passenger = Some(Box::new(ant));
                carrier
            }
            Some(carried) => Ant {
                passenger: Some(Box::new(carried)),
                ..ant
            },
        });
        self.food -= cost;
        Ok(id)
    }

    fn remove(&mut self, place: &PlaceName) -> Result<InsectId, RemovalError> {
        if self.outcome.is_some() {
            return Err(RemovalError::GameOver);
        }
        let index = self.place_index(place).ok_or(RemovalError::UnknownPlace)?;
        let slot = &mut self.places[index].ant;
        let mut removed = slot.take().ok_or(RemovalError::Vacant)?;
        *slot = removed.passenger.take().map(|passenger| *passenger);
        Ok(removed.id)
    }

    fn advance_turn(&mut self, out: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }
        self.release_bees();
        self.ants_act(out);
        self.bees_act(out);
        self.time += 1;
        out.push(Event::TurnAdvanced { time: self.time });

        if self.outcome.is_none() && self.hive.is_empty() && self.bees_in_play() == 0 {
            self.outcome = Some(Outcome::ColonyDefended);
        }
        if let Some(outcome) = self.outcome {
            out.push(Event::GameOver { outcome });
        }
    }

    fn release_bees(&mut self) {
        let interval = self.config.release_interval.max(1);
        if self.time % interval != 0 || self.entrances.is_empty() {
            return;
        }
        for _ in 0..self.config.release_count {
            let Some(bee) = self.hive.pop() else {
                return;
            };
            let entrance = self.entrances[self.next_entrance % self.entrances.len()];
            self.next_entrance += 1;
            self.places[entrance].bees.push(bee);
        }
    }

    fn bees_in_play(&self) -> usize {
        self.places.iter().map(|place| place.bees.len()).sum()
    }

    fn ants_act(&mut self, out: &mut Vec<Event>) {
        let mut actors = Vec::new();
        for (index, place) in self.places.iter().enumerate() {
            if let Some(ant) = &place.ant {
                actors.push((index, ant.kind.clone(), ant.rules));
                if let Some(passenger) = &ant.passenger {
                    actors.push((index, passenger.kind.clone(), passenger.rules));
                }
            }
        }

        for (index, kind, rules) in actors {
            self.food += rules.harvest;
            let effect = self
                .registered(&kind)
                .and_then(|entry| entry.insect_type.effect);
            match effect {
                Some(TurnEndEffect::Ranged {
                    min_range,
                    max_range,
                }) => {
                    if let Some((target, bee)) = self.nearest_bee(index, min_range, max_range) {
                        self.sting_bee(target, bee, out);
                    }
                }
                Some(TurnEndEffect::Sweep) => {
                    let bees: Vec<InsectId> =
                        self.places[index].bees.iter().map(|bee| bee.id).collect();
                    for bee in bees {
                        self.sting_bee(index, bee, out);
                    }
                }
                None => {}
            }
        }
    }

    /// Walks from `start` toward the hive and returns the first bee found
    /// within range.
    fn nearest_bee(
        &self,
        start: usize,
        min_range: u32,
        max_range: Option<u32>,
    ) -> Option<(usize, InsectId)> {
        let mut current = Some(start);
        let mut distance = 0;
        while let Some(index) = current {
            if max_range.is_some_and(|max| distance > max) {
                return None;
            }
            if distance >= min_range {
                if let Some(bee) = self.places[index].bees.first() {
                    return Some((index, bee.id));
                }
            }
            current = self.places.iter().position(|place| place.exit == Some(index));
            distance += 1;
        }
        None
    }

    fn sting_bee(&mut self, index: usize, bee: InsectId, out: &mut Vec<Event>) {
        let place = &mut self.places[index];
        let Some(position) = place.bees.iter().position(|candidate| candidate.id == bee) else {
            return;
        };
        let target = &mut place.bees[position];
        target.health = target.health.saturating_sub(1);
        if target.health == 0 {
            let _ = place.bees.remove(position);
            out.push(Event::InsectExpired {
                insect: bee,
                place: place.name.clone(),
            });
        }
    }

    fn bees_act(&mut self, out: &mut Vec<Event>) {
        let mut movers = Vec::new();
        for (index, place) in self.places.iter().enumerate() {
            movers.extend(place.bees.iter().map(|bee| (index, bee.id)));
        }

        for (index, bee) in movers {
            if self.outcome.is_some() {
                return;
            }
            if !self.places[index].bees.iter().any(|candidate| candidate.id == bee) {
                continue;
            }
            let blocked = self.places[index]
                .ant
                .as_ref()
                .is_some_and(|ant| ant.rules.blocks_bees);
            if blocked {
                self.sting_ant(index, out);
                continue;
            }

            let place = &mut self.places[index];
            let Some(position) = place.bees.iter().position(|candidate| candidate.id == bee) else {
                continue;
            };
            match place.exit {
                Some(exit) => {
                    let moving = place.bees.remove(position);
                    let from = place.name.clone();
                    self.places[exit].bees.push(moving);
                    out.push(Event::BeeAdvanced {
                        bee,
                        from,
                        to: self.places[exit].name.clone(),
                    });
                }
                None => self.outcome = Some(Outcome::ColonyOverrun),
            }
        }
    }

    fn sting_ant(&mut self, index: usize, out: &mut Vec<Event>) {
        let place = &mut self.places[index];
        let Some(ant) = place.ant.as_mut() else {
            return;
        };
        ant.health = ant.health.saturating_sub(1);
        if ant.health > 0 {
            return;
        }
        let expired = ant.id;
        let passenger = ant.passenger.take().map(|passenger| *passenger);
        place.ant = passenger;
        out.push(Event::InsectExpired {
            insect: expired,
            place: place.name.clone(),
        });
    }
}

/// Applies the provided command to the world, broadcasting resulting events.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Deploy { place, kind } => match world.deploy(&place, &kind) {
            Ok(ant) => out_events.push(Event::AntDeployed { ant, kind, place }),
            Err(reason) => out_events.push(Event::DeployRejected {
                place,
                kind,
                reason,
            }),
        },
        Command::Remove { place } => match world.remove(&place) {
            Ok(ant) => out_events.push(Event::AntRemoved { ant, place }),
            Err(reason) => out_events.push(Event::RemovalRejected { place, reason }),
        },
        Command::AdvanceTurn => world.advance_turn(out_events),
    }
}

impl ColonyModel for World {
    fn snapshot(&self) -> ColonySnapshot {
        query::snapshot(self)
    }

    fn insect_types(&self) -> Vec<InsectType> {
        query::insect_types(self)
    }

    fn submit(&mut self, command: Command, out: &mut Vec<Event>) {
        apply(self, command, out);
    }
}

/// Read-only queries over the world state.
pub mod query {
    use super::*;

    /// Captures the full colony snapshot consumed by the view.
    #[must_use]
    pub fn snapshot(world: &World) -> ColonySnapshot {
        let bee_kind = InsectKind::new(BEE_KIND);
        let bee_snapshot = |bee: &Bee| InsectSnapshot::new(bee.id, bee_kind.clone());
        let places = world
            .places
            .iter()
            .map(|place| PlaceSnapshot {
                name: place.name.clone(),
                occupant: place.ant.as_ref().map(Ant::occupant),
                bees: place.bees.iter().map(bee_snapshot).collect(),
                exit: place.exit.map(|exit| world.places[exit].name.clone()),
                hazard: place.hazard,
            })
            .collect();

        ColonySnapshot {
            places,
            hive: HiveSnapshot {
                name: PlaceName::new(HIVE_NAME),
                bees: world.hive.iter().map(bee_snapshot).collect(),
            },
            food: world.food,
            time: world.time,
            outcome: world.outcome,
        }
    }

    /// Lists the registered insect types in control-panel order.
    #[must_use]
    pub fn insect_types(world: &World) -> Vec<InsectType> {
        world
            .registry
            .iter()
            .map(|entry| entry.insect_type.clone())
            .collect()
    }

    /// Food currently available.
    #[must_use]
    pub fn food(world: &World) -> u32 {
        world.food
    }

    /// Result of the game, once decided.
    #[must_use]
    pub fn outcome(world: &World) -> Option<Outcome> {
        world.outcome
    }
}
