//! The port/dock/queue/ship/job graph.
//!
//! A [`World`] is built once by the loader and never changes shape
//! afterwards; only dock occupancy, queue contents, ship locations and job
//! run state move while the simulation runs.

mod dock;
mod port;
mod query;
mod ship;
mod snapshot;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

pub use dock::{Berth, Dock, ShipQueue};
pub use port::{Placement, Port};
pub use query::{
    EntityKind, Hit, SearchKey, SortKey, SortTarget, SortedEntry, SortedGroup, search, sort_world,
    sorted_queue,
};
pub use ship::{Dimensions, Location, Person, Ship, ShipKind};
pub use snapshot::{DockView, JobView, PortView, ShipView, WorldSnapshot};

use crate::error::Result;
use crate::state_machine::Job;

/// Integer identity of every entity, as given by the input records.
pub type EntityId = u32;

/// Entity counts, mostly for load reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub ports: usize,
    pub docks: usize,
    pub ships: usize,
    pub jobs: usize,
    pub persons: usize,
}

#[derive(Debug)]
pub struct World {
    ports: Vec<Port>,
    ships: BTreeMap<EntityId, Arc<Ship>>,
    jobs: BTreeMap<EntityId, Arc<Job>>,
}

impl World {
    /// Indexes ships and jobs of fully assembled ports.
    pub fn new(ports: Vec<Port>) -> Self {
        let mut ships = BTreeMap::new();
        let mut jobs = BTreeMap::new();
        for ship in ports.iter().flat_map(|p| p.ships.iter()) {
            ships.insert(ship.id, Arc::clone(ship));
            for job in &ship.jobs {
                jobs.insert(job.id, Arc::clone(job));
            }
        }
        Self { ports, ships, jobs }
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, id: EntityId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    pub fn ship(&self, id: EntityId) -> Option<&Arc<Ship>> {
        self.ships.get(&id)
    }

    pub fn job(&self, id: EntityId) -> Option<&Arc<Job>> {
        self.jobs.get(&id)
    }

    pub fn ships(&self) -> impl Iterator<Item = &Arc<Ship>> {
        self.ships.values()
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Arc<Job>> {
        self.jobs.values()
    }

    pub fn counts(&self) -> Counts {
        Counts {
            ports: self.ports.len(),
            docks: self.ports.iter().map(|p| p.docks.len()).sum(),
            ships: self.ships.len(),
            jobs: self.jobs.len(),
            persons: self.ports.iter().map(|p| p.persons.len()).sum(),
        }
    }

    /// Every port has empty docks and an empty queue.
    pub fn is_idle(&self) -> Result<bool> {
        for port in &self.ports {
            if !port.is_idle()? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
