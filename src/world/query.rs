//! Search and sort over a [`WorldSnapshot`].

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use super::EntityId;
use super::snapshot::{PortView, ShipView, WorldSnapshot};
use super::ship::ShipKind;
use crate::error::{Result, SeaportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKey {
    Index,
    Name,
    Type,
    Skill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Weight,
    Length,
    Width,
    Draft,
    CargoWeight,
    CargoVolume,
    CargoValue,
    Passengers,
    Rooms,
    Occupied,
}

impl SortKey {
    fn is_hull(self) -> bool {
        matches!(
            self,
            SortKey::Weight | SortKey::Length | SortKey::Width | SortKey::Draft
        )
    }

    fn is_cargo(self) -> bool {
        matches!(
            self,
            SortKey::CargoWeight | SortKey::CargoVolume | SortKey::CargoValue
        )
    }

    fn is_passenger(self) -> bool {
        matches!(self, SortKey::Passengers | SortKey::Rooms | SortKey::Occupied)
    }

    /// The numeric attribute this key orders ships by. `None` for `Name`
    /// and for variant keys on ships of another variant.
    pub fn ship_value(self, ship: &ShipView) -> Option<f64> {
        let d = &ship.dimensions;
        match (self, ship.kind) {
            (SortKey::Weight, _) => Some(d.weight),
            (SortKey::Length, _) => Some(d.length),
            (SortKey::Width, _) => Some(d.width),
            (SortKey::Draft, _) => Some(d.draft),
            (SortKey::CargoWeight, ShipKind::Cargo { cargo_weight, .. }) => Some(cargo_weight),
            (SortKey::CargoVolume, ShipKind::Cargo { cargo_volume, .. }) => Some(cargo_volume),
            (SortKey::CargoValue, ShipKind::Cargo { cargo_value, .. }) => Some(cargo_value),
            (SortKey::Passengers, ShipKind::Passenger { passengers, .. }) => {
                Some(f64::from(passengers))
            }
            (SortKey::Rooms, ShipKind::Passenger { rooms, .. }) => Some(f64::from(rooms)),
            (SortKey::Occupied, ShipKind::Passenger { occupied, .. }) => Some(f64::from(occupied)),
            _ => None,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortKey::Name => "name",
            SortKey::Weight => "weight",
            SortKey::Length => "length",
            SortKey::Width => "width",
            SortKey::Draft => "draft",
            SortKey::CargoWeight => "cargo weight",
            SortKey::CargoVolume => "cargo volume",
            SortKey::CargoValue => "cargo value",
            SortKey::Passengers => "passengers",
            SortKey::Rooms => "rooms",
            SortKey::Occupied => "occupied rooms",
        };
        f.write_str(s)
    }
}

/// What a sort request orders. `World` covers ports, docks, ships, jobs and
/// persons in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortTarget {
    World,
    Ports,
    Docks,
    Queue,
    Ships,
    Cargo,
    Passenger,
    Jobs,
    Persons,
}

impl SortTarget {
    fn accepts(self, key: SortKey) -> bool {
        match self {
            SortTarget::Queue | SortTarget::Ships => key == SortKey::Name || key.is_hull(),
            SortTarget::Cargo => key == SortKey::Name || key.is_hull() || key.is_cargo(),
            SortTarget::Passenger => key == SortKey::Name || key.is_hull() || key.is_passenger(),
            SortTarget::World
            | SortTarget::Ports
            | SortTarget::Docks
            | SortTarget::Jobs
            | SortTarget::Persons => key == SortKey::Name,
        }
    }
}

impl fmt::Display for SortTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortTarget::World => "world",
            SortTarget::Ports => "ports",
            SortTarget::Docks => "docks",
            SortTarget::Queue => "queue",
            SortTarget::Ships => "ships",
            SortTarget::Cargo => "cargo ships",
            SortTarget::Passenger => "passenger ships",
            SortTarget::Jobs => "jobs",
            SortTarget::Persons => "persons",
        };
        f.write_str(s)
    }
}

/// One sorted list, e.g. the queue of one port.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedGroup {
    pub heading: String,
    pub entries: Vec<SortedEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortedEntry {
    pub id: EntityId,
    pub name: String,
    /// The sorted attribute, absent when sorting by name.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Port,
    Dock,
    Ship,
    CargoShip,
    PassengerShip,
    Person,
    Job,
}

impl EntityKind {
    fn of_ship(kind: &ShipKind) -> Self {
        match kind {
            ShipKind::Plain => EntityKind::Ship,
            ShipKind::Cargo { .. } => EntityKind::CargoShip,
            ShipKind::Passenger { .. } => EntityKind::PassengerShip,
        }
    }

    /// Whether a `type` search term selects this kind. `ship` matches every
    /// ship variant.
    fn matches(self, term: &str) -> bool {
        match term {
            "port" | "seaport" => self == EntityKind::Port,
            "dock" | "pier" => self == EntityKind::Dock,
            "ship" => matches!(
                self,
                EntityKind::Ship | EntityKind::CargoShip | EntityKind::PassengerShip
            ),
            "cargo" | "cship" | "cargoship" => self == EntityKind::CargoShip,
            "passenger" | "pship" | "passengership" => self == EntityKind::PassengerShip,
            "person" => self == EntityKind::Person,
            "job" => self == EntityKind::Job,
            _ => false,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Port => "Port",
            EntityKind::Dock => "Dock",
            EntityKind::Ship => "Ship",
            EntityKind::CargoShip => "CargoShip",
            EntityKind::PassengerShip => "PassengerShip",
            EntityKind::Person => "Person",
            EntityKind::Job => "Job",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Hit {
    Entity {
        kind: EntityKind,
        id: EntityId,
        name: String,
    },
    Skill(String),
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hit::Entity { kind, id, name } => write!(f, "{kind} {name} ({id})"),
            Hit::Skill(skill) => write!(f, "Skill {skill}"),
        }
    }
}

fn entities(snapshot: &WorldSnapshot) -> Vec<(EntityKind, EntityId, &str)> {
    let mut all = Vec::new();
    for port in &snapshot.ports {
        all.push((EntityKind::Port, port.id, port.name.as_str()));
        for dock in &port.docks {
            all.push((EntityKind::Dock, dock.id, dock.name.as_str()));
        }
        for ship in port.ships() {
            all.push((EntityKind::of_ship(&ship.kind), ship.id, ship.name.as_str()));
            for job in &ship.jobs {
                all.push((EntityKind::Job, job.id, job.name.as_str()));
            }
        }
        for person in &port.persons {
            all.push((EntityKind::Person, person.id, person.name.as_str()));
        }
    }
    all
}

fn hit((kind, id, name): (EntityKind, EntityId, &str)) -> Hit {
    Hit::Entity {
        kind,
        id,
        name: name.to_string(),
    }
}

/// Looks entities up by id, name (case-insensitive), type or skill.
///
/// A `type` search for `skill` lists the distinct skills held by persons.
pub fn search(snapshot: &WorldSnapshot, key: SearchKey, target: &str) -> Vec<Hit> {
    let target = target.trim();
    match key {
        SearchKey::Index => match target.parse::<EntityId>() {
            Ok(id) => entities(snapshot)
                .into_iter()
                .filter(|(_, eid, _)| *eid == id)
                .map(hit)
                .collect(),
            Err(_) => Vec::new(),
        },
        SearchKey::Name => entities(snapshot)
            .into_iter()
            .filter(|(_, _, name)| name.eq_ignore_ascii_case(target))
            .map(hit)
            .collect(),
        SearchKey::Type => {
            let term = target.to_ascii_lowercase();
            if term == "skill" {
                let mut skills: Vec<String> = Vec::new();
                for skill in snapshot
                    .ports
                    .iter()
                    .flat_map(|p| p.persons.iter())
                    .filter_map(|p| p.skill.as_ref())
                {
                    if !skills.contains(skill) {
                        skills.push(skill.clone());
                    }
                }
                return skills.into_iter().map(Hit::Skill).collect();
            }
            entities(snapshot)
                .into_iter()
                .filter(|(kind, _, _)| kind.matches(&term))
                .map(hit)
                .collect()
        }
        SearchKey::Skill => snapshot
            .ports
            .iter()
            .flat_map(|p| p.persons.iter())
            .filter(|p| {
                p.skill
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(target))
            })
            .map(|p| Hit::Entity {
                kind: EntityKind::Person,
                id: p.id,
                name: p.name.clone(),
            })
            .collect(),
    }
}

/// The port's queue ordered by `key`. Ties keep queue order.
pub fn sorted_queue(port: &PortView, key: SortKey) -> Vec<&ShipView> {
    let mut ships: Vec<&ShipView> = port.queue.iter().collect();
    ships.sort_by(|a, b| compare(a, b, key));
    ships
}

fn compare(a: &ShipView, b: &ShipView, key: SortKey) -> Ordering {
    if key == SortKey::Name {
        return a.name.cmp(&b.name);
    }
    let value = |s: &ShipView| key.ship_value(s).unwrap_or_default();
    value(a).total_cmp(&value(b))
}

fn by_name(mut entries: Vec<SortedEntry>) -> Vec<SortedEntry> {
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

fn named(id: EntityId, name: &str) -> SortedEntry {
    SortedEntry {
        id,
        name: name.to_string(),
        value: None,
    }
}

fn per_port(snapshot: &WorldSnapshot, build: impl Fn(&PortView) -> SortedGroup) -> Vec<SortedGroup> {
    snapshot.ports.iter().map(build).collect()
}

fn ship_group<'a>(
    heading: String,
    ships: impl Iterator<Item = &'a ShipView>,
    key: SortKey,
) -> SortedGroup {
    let mut ships: Vec<&ShipView> = ships.collect();
    ships.sort_by(|a, b| compare(a, b, key));
    SortedGroup {
        heading,
        entries: ships
            .into_iter()
            .map(|s| SortedEntry {
                id: s.id,
                name: s.name.clone(),
                value: key.ship_value(s),
            })
            .collect(),
    }
}

/// Sorts `target` by `key`, one group per port (per ship for jobs).
///
/// Fails with [`SeaportError::Query`] when the key does not apply to the
/// target, e.g. docks by weight.
pub fn sort_world(snapshot: &WorldSnapshot, target: SortTarget, key: SortKey) -> Result<Vec<SortedGroup>> {
    if !target.accepts(key) {
        return Err(SeaportError::Query(format!("cannot sort {target} by {key}")));
    }
    let groups = match target {
        SortTarget::World => {
            let mut all = Vec::new();
            for part in [
                SortTarget::Ports,
                SortTarget::Docks,
                SortTarget::Ships,
                SortTarget::Jobs,
                SortTarget::Persons,
            ] {
                all.extend(sort_world(snapshot, part, key)?);
            }
            all
        }
        SortTarget::Ports => vec![SortedGroup {
            heading: "Ports".to_string(),
            entries: by_name(snapshot.ports.iter().map(|p| named(p.id, &p.name)).collect()),
        }],
        SortTarget::Docks => per_port(snapshot, |p| SortedGroup {
            heading: format!("Port of {} docks", p.name),
            entries: by_name(p.docks.iter().map(|d| named(d.id, &d.name)).collect()),
        }),
        SortTarget::Queue => per_port(snapshot, |p| SortedGroup {
            heading: format!("Port of {} queue", p.name),
            entries: sorted_queue(p, key)
                .into_iter()
                .map(|s| SortedEntry {
                    id: s.id,
                    name: s.name.clone(),
                    value: key.ship_value(s),
                })
                .collect(),
        }),
        SortTarget::Ships => per_port(snapshot, |p| {
            ship_group(format!("Port of {} ships", p.name), p.ships(), key)
        }),
        SortTarget::Cargo => per_port(snapshot, |p| {
            ship_group(
                format!("Port of {} cargo ships", p.name),
                p.ships().filter(|s| matches!(s.kind, ShipKind::Cargo { .. })),
                key,
            )
        }),
        SortTarget::Passenger => per_port(snapshot, |p| {
            ship_group(
                format!("Port of {} passenger ships", p.name),
                p.ships().filter(|s| matches!(s.kind, ShipKind::Passenger { .. })),
                key,
            )
        }),
        SortTarget::Jobs => snapshot
            .ships()
            .map(|s| SortedGroup {
                heading: format!("SS {} jobs", s.name),
                entries: by_name(s.jobs.iter().map(|j| named(j.id, &j.name)).collect()),
            })
            .collect(),
        SortTarget::Persons => per_port(snapshot, |p| SortedGroup {
            heading: format!("Port of {} persons", p.name),
            entries: by_name(p.persons.iter().map(|x| named(x.id, &x.name)).collect()),
        }),
    };
    Ok(groups)
}
