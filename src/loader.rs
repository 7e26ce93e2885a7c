//! Builds a [`World`] from line-oriented simulation records.
//!
//! One record per non-empty line; the first token names the record type and
//! the remaining tokens are positional fields. Parents are resolved by id
//! and must appear before their children. Bad lines are reported and
//! skipped; only I/O failures abort a load.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::iter::Peekable;
use std::path::Path;
use std::str::SplitWhitespace;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Result, SeaportError};
use crate::state_machine::Job;
use crate::world::{Counts, Dimensions, Dock, EntityId, Person, Port, Ship, ShipKind, World};

/// Outcome of a load: the world plus every record that was dropped.
#[derive(Debug)]
pub struct LoadReport {
    pub world: World,
    pub skipped: Vec<SeaportError>,
}

impl LoadReport {
    pub fn counts(&self) -> Counts {
        self.world.counts()
    }
}

pub fn load_world(records: &str) -> Result<LoadReport> {
    load_from_reader(records.as_bytes())
}

pub fn load_file(path: &Path) -> Result<LoadReport> {
    let file = std::fs::File::open(path)?;
    load_from_reader(std::io::BufReader::new(file))
}

pub fn load_from_reader<R: BufRead>(reader: R) -> Result<LoadReport> {
    let mut builder = Builder::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let number = idx + 1;
        if let Err(err) = builder.record(number, &line) {
            warn!(line = number, error = %err, "skipping record");
            builder.skipped.push(err);
        }
    }
    let report = builder.finish();
    let counts = report.counts();
    info!(
        ports = counts.ports,
        docks = counts.docks,
        ships = counts.ships,
        jobs = counts.jobs,
        persons = counts.persons,
        skipped = report.skipped.len(),
        "world loaded"
    );
    Ok(report)
}

/// Tokens of one record after the type tag.
struct Fields<'a> {
    line: usize,
    tokens: Peekable<SplitWhitespace<'a>>,
}

impl<'a> Fields<'a> {
    fn error(&self, reason: impl Into<String>) -> SeaportError {
        SeaportError::malformed(self.line, reason)
    }

    /// Reads `<id> <name>`, or the legacy `<name> <id>` order.
    fn identity(&mut self) -> Result<(EntityId, String)> {
        let first = self.tokens.next().ok_or_else(|| self.error("missing id and name"))?;
        let second = self.tokens.next().ok_or_else(|| self.error("missing name"))?;
        if let Ok(id) = first.parse::<EntityId>() {
            Ok((id, second.to_string()))
        } else if let Ok(id) = second.parse::<EntityId>() {
            Ok((id, first.to_string()))
        } else {
            Err(self.error(format!("no integer id in `{first} {second}`")))
        }
    }

    fn parent(&mut self) -> Result<EntityId> {
        let raw = self.tokens.next().ok_or_else(|| self.error("missing parent id"))?;
        raw.parse()
            .map_err(|_| self.error(format!("parent id `{raw}` is not an integer")))
    }

    /// A numeric field that defaults to zero when the line ends early.
    fn number(&mut self, what: &str) -> Result<f64> {
        match self.tokens.next() {
            None => Ok(0.0),
            Some(raw) => raw
                .parse()
                .map_err(|_| self.error(format!("{what} `{raw}` is not a number"))),
        }
    }

    fn count(&mut self, what: &str) -> Result<u32> {
        match self.tokens.next() {
            None => Ok(0),
            Some(raw) => raw
                .parse()
                .map_err(|_| self.error(format!("{what} `{raw}` is not a count"))),
        }
    }

    /// Consumes the next token only if it is a number.
    fn optional_number(&mut self) -> Option<f64> {
        let value = self.tokens.peek()?.parse().ok()?;
        self.tokens.next();
        Some(value)
    }

    fn rest(self) -> Vec<String> {
        self.tokens.map(str::to_string).collect()
    }
}

struct ShipDraft {
    id: EntityId,
    name: String,
    parent: EntityId,
    dimensions: Dimensions,
    kind: ShipKind,
    jobs: Vec<Arc<Job>>,
}

#[derive(Default)]
struct Builder {
    ports: Vec<Port>,
    port_index: HashMap<EntityId, usize>,
    /// Dock id to the index of its port.
    dock_port: HashMap<EntityId, usize>,
    ships: Vec<ShipDraft>,
    ship_index: HashMap<EntityId, usize>,
    ids: HashSet<EntityId>,
    skipped: Vec<SeaportError>,
}

impl Builder {
    fn record(&mut self, line: usize, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() || text.starts_with("//") {
            return Ok(());
        }
        let mut tokens = text.split_whitespace();
        let Some(tag) = tokens.next() else {
            return Ok(());
        };
        let mut fields = Fields {
            line,
            tokens: tokens.peekable(),
        };
        match tag {
            "port" => self.port(&mut fields),
            "dock" => self.dock(&mut fields),
            "ship" | "cship" | "pship" => self.ship(tag, &mut fields),
            "person" => self.person(&mut fields),
            "job" => self.job(fields),
            other => Err(fields.error(format!("unknown record type `{other}`"))),
        }
    }

    fn claim(&mut self, fields: &Fields<'_>, id: EntityId) -> Result<()> {
        if self.ids.insert(id) {
            Ok(())
        } else {
            Err(fields.error(format!("duplicate id {id}")))
        }
    }

    fn port_of(&self, fields: &Fields<'_>, parent: EntityId) -> Result<usize> {
        self.port_index
            .get(&parent)
            .copied()
            .ok_or_else(|| fields.error(format!("unknown port {parent}")))
    }

    fn port(&mut self, fields: &mut Fields<'_>) -> Result<()> {
        let (id, name) = fields.identity()?;
        self.claim(fields, id)?;
        self.port_index.insert(id, self.ports.len());
        self.ports.push(Port::new(id, name));
        Ok(())
    }

    fn dock(&mut self, fields: &mut Fields<'_>) -> Result<()> {
        let (id, name) = fields.identity()?;
        let parent = fields.parent()?;
        let port = self.port_of(fields, parent)?;
        self.claim(fields, id)?;
        self.ports[port].docks.push(Dock::new(id, name, parent));
        self.dock_port.insert(id, port);
        Ok(())
    }

    fn ship(&mut self, tag: &str, fields: &mut Fields<'_>) -> Result<()> {
        let (id, name) = fields.identity()?;
        let parent = fields.parent()?;
        if !self.port_index.contains_key(&parent) && !self.dock_port.contains_key(&parent) {
            return Err(fields.error(format!("unknown dock or port {parent}")));
        }
        let dimensions = Dimensions {
            weight: fields.number("weight")?,
            length: fields.number("length")?,
            width: fields.number("width")?,
            draft: fields.number("draft")?,
        };
        let kind = match tag {
            "cship" => ShipKind::Cargo {
                cargo_weight: fields.number("cargo weight")?,
                cargo_volume: fields.number("cargo volume")?,
                cargo_value: fields.number("cargo value")?,
            },
            "pship" => ShipKind::Passenger {
                passengers: fields.count("passengers")?,
                rooms: fields.count("rooms")?,
                occupied: fields.count("occupied rooms")?,
            },
            _ => ShipKind::Plain,
        };
        self.claim(fields, id)?;
        self.ship_index.insert(id, self.ships.len());
        self.ships.push(ShipDraft {
            id,
            name,
            parent,
            dimensions,
            kind,
            jobs: Vec::new(),
        });
        Ok(())
    }

    fn person(&mut self, fields: &mut Fields<'_>) -> Result<()> {
        let (id, name) = fields.identity()?;
        let parent = fields.parent()?;
        let port = self.port_of(fields, parent)?;
        let skill = fields.tokens.next().map(str::to_string);
        self.claim(fields, id)?;
        self.ports[port].persons.push(Person {
            id,
            name,
            port: parent,
            skill,
        });
        Ok(())
    }

    fn job(&mut self, mut fields: Fields<'_>) -> Result<()> {
        let (id, name) = fields.identity()?;
        let parent = fields.parent()?;
        let Some(&ship) = self.ship_index.get(&parent) else {
            return Err(fields.error(format!("unknown ship {parent}")));
        };
        let duration = fields.optional_number().unwrap_or(0.0);
        if duration < 0.0 {
            return Err(fields.error(format!("negative duration {duration}")));
        }
        self.claim(&fields, id)?;
        let requirements = fields.rest();
        self.ships[ship]
            .jobs
            .push(Arc::new(Job::new(id, name, parent, duration, requirements)));
        Ok(())
    }

    /// Places ships: first those naming a dock, then those naming a port,
    /// each group in record order.
    fn finish(mut self) -> LoadReport {
        let drafts = std::mem::take(&mut self.ships);
        let (docked, portside): (Vec<_>, Vec<_>) = drafts
            .into_iter()
            .partition(|d| self.dock_port.contains_key(&d.parent));

        for draft in docked {
            let port_idx = self.dock_port[&draft.parent];
            let dock = draft.parent;
            let ship = Arc::new(Ship::new(
                draft.id,
                draft.name,
                draft.parent,
                draft.dimensions,
                draft.kind,
                draft.jobs,
            ));
            let port = &mut self.ports[port_idx];
            if let Err(err) = port.assign_to(dock, &ship) {
                warn!(ship = ship.id, dock, error = %err, "berth taken, queueing instead");
                if let Err(err) = port.enqueue(&ship) {
                    self.skipped.push(err);
                    continue;
                }
            }
            port.ships.push(ship);
        }

        for draft in portside {
            let port_idx = self.port_index[&draft.parent];
            let ship = Arc::new(Ship::new(
                draft.id,
                draft.name,
                draft.parent,
                draft.dimensions,
                draft.kind,
                draft.jobs,
            ));
            let port = &mut self.ports[port_idx];
            match port.assign(&ship) {
                Ok(_) => port.ships.push(ship),
                Err(err) => self.skipped.push(err),
            }
        }

        LoadReport {
            world: World::new(self.ports),
            skipped: self.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Location;

    const HARBOR: &str = "
// two ports, three docks
port 10000 Lisbon 0
port 10001 Porto 0
dock 20000 Pier_1 10000
dock 20001 Pier_2 10000
dock 20002 Pier_3 10001

cship 40000 Zephyr 20000 120.5 200 30 10 5000 300 1000000
pship 30000 Aurora 10000 90 150 25 8 400 200 180
ship  30001 Bounty 10000 50 80 12 4
person 50000 Ana 10000 crane
person 50001 Rui 10001
job 60000 Load_Cargo 40000 2.5 crane forklift
job 60001 Clean_Deck 30000
job 60002 Inspect 30000 0.5 inspector
";

    #[test]
    fn load_round_trip_counts() {
        let report = load_world(HARBOR).unwrap();
        assert!(report.skipped.is_empty(), "{:?}", report.skipped);
        assert_eq!(
            report.counts(),
            Counts {
                ports: 2,
                docks: 3,
                ships: 3,
                jobs: 3,
                persons: 2,
            }
        );
    }

    #[test]
    fn every_ship_has_exactly_one_location() {
        let report = load_world(HARBOR).unwrap();
        let world = &report.world;

        assert_eq!(
            world.ship(40000).unwrap().location().unwrap(),
            Location::Docked {
                port: 10000,
                dock: 20000
            }
        );
        // Port-parented ships take the remaining free dock, then queue.
        assert_eq!(
            world.ship(30000).unwrap().location().unwrap(),
            Location::Docked {
                port: 10000,
                dock: 20001
            }
        );
        assert_eq!(
            world.ship(30001).unwrap().location().unwrap(),
            Location::Queued { port: 10000 }
        );

        for ship in world.ships() {
            let queued = world
                .ports()
                .iter()
                .filter(|p| p.queue().unwrap().position(ship.id).is_some())
                .count();
            let docked = world
                .ports()
                .iter()
                .flat_map(|p| p.docks.iter())
                .filter(|d| d.occupant().unwrap().is_some_and(|s| s.id == ship.id))
                .count();
            assert_eq!(queued + docked, 1, "ship {} placed {} times", ship.id, queued + docked);
        }
    }

    #[test]
    fn ship_variants_and_job_fields() {
        let report = load_world(HARBOR).unwrap();
        let world = &report.world;

        let zephyr = world.ship(40000).unwrap();
        assert_eq!(zephyr.dimensions.weight, 120.5);
        assert_eq!(
            zephyr.kind,
            ShipKind::Cargo {
                cargo_weight: 5000.0,
                cargo_volume: 300.0,
                cargo_value: 1000000.0
            }
        );
        assert!(matches!(
            world.ship(30000).unwrap().kind,
            ShipKind::Passenger { passengers: 400, rooms: 200, occupied: 180 }
        ));

        let load = world.job(60000).unwrap();
        assert_eq!(load.duration, 2.5);
        assert_eq!(load.requirements, vec!["crane", "forklift"]);
        assert_eq!(world.job(60001).unwrap().duration, 0.0);

        let aurora = world.ship(30000).unwrap();
        let order: Vec<_> = aurora.jobs.iter().map(|j| j.id).collect();
        assert_eq!(order, vec![60001, 60002]);
    }

    #[test]
    fn legacy_name_first_order_is_accepted() {
        let report = load_world("port Kings_Landing 10000 0\ndock Pier_5 20005 10000\n").unwrap();
        assert!(report.skipped.is_empty());
        let port = report.world.port(10000).unwrap();
        assert_eq!(port.name, "Kings_Landing");
        assert_eq!(port.docks[0].name, "Pier_5");
    }

    #[test]
    fn malformed_records_are_skipped() {
        let input = "
port 10000 Lisbon 0
dock 20000 Pier_1 19999
ship 30000 Ghost 77777
job 60000 Orphan 30000 1.0
port 10000 Duplicate 0
whale 1 Moby 10000
ship 30001 Bad 10000 heavy
port 10001 Porto 0
";
        let report = load_world(input).unwrap();
        assert_eq!(report.skipped.len(), 6);
        assert!(report
            .skipped
            .iter()
            .all(|e| matches!(e, SeaportError::MalformedRecord { .. })));
        assert_eq!(report.counts().ports, 2);
        assert_eq!(report.counts().ships, 0);
    }

    #[test]
    fn skipped_record_reports_line_number() {
        let report = load_world("port 10000 Lisbon 0\ndock 20000 Pier_1 31337\n").unwrap();
        assert!(matches!(
            report.skipped[0],
            SeaportError::MalformedRecord { line: 2, .. }
        ));
    }

    #[test]
    fn occupied_dock_falls_back_to_queue() {
        let input = "
port 10000 Lisbon 0
dock 20000 Pier_1 10000
ship 30000 First 20000
ship 30001 Second 20000
";
        let report = load_world(input).unwrap();
        let world = &report.world;
        assert_eq!(
            world.ship(30001).unwrap().location().unwrap(),
            Location::Queued { port: 10000 }
        );
        assert_eq!(world.counts().ships, 2);
    }

    #[test]
    fn job_without_duration_takes_trailing_tokens_as_requirements() {
        let report = load_world(
            "port 1 P 0\nship 2 S 1\njob 3 J 2 welder painter\n",
        )
        .unwrap();
        let job = report.world.job(3).unwrap();
        assert_eq!(job.duration, 0.0);
        assert_eq!(job.requirements, vec!["welder", "painter"]);
    }

    #[test]
    fn load_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harbor.txt");
        std::fs::write(&path, HARBOR).unwrap();

        let report = load_file(&path).unwrap();
        assert_eq!(report.counts().jobs, 3);
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_file(&dir.path().join("nope.txt")),
            Err(SeaportError::Io(_))
        ));
    }
}
