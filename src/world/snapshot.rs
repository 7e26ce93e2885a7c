//! Read-only, serializable views of the world at one instant.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ship::{Dimensions, Location, Person, Ship, ShipKind};
use super::{EntityId, World};
use crate::error::Result;
use crate::state_machine::{Job, JobStatus};

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub taken_at: DateTime<Utc>,
    pub ports: Vec<PortView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortView {
    pub id: EntityId,
    pub name: String,
    pub docks: Vec<DockView>,
    pub queue: Vec<ShipView>,
    pub departed: Vec<ShipView>,
    pub persons: Vec<Person>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DockView {
    pub id: EntityId,
    pub name: String,
    pub ship: Option<ShipView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipView {
    pub id: EntityId,
    pub name: String,
    pub kind: ShipKind,
    pub dimensions: Dimensions,
    pub location: Location,
    pub arrival_time: Option<DateTime<Utc>>,
    pub dock_time: Option<DateTime<Utc>>,
    pub jobs: Vec<JobView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: EntityId,
    pub name: String,
    pub duration: f64,
    pub requirements: Vec<String>,
    pub status: JobStatus,
    pub percent: u8,
    pub finished: bool,
    pub suspended: bool,
}

impl JobView {
    fn of(job: &Job) -> Self {
        Self {
            id: job.id,
            name: job.name.clone(),
            duration: job.duration,
            requirements: job.requirements.clone(),
            status: job.status(),
            percent: job.percent(),
            finished: job.is_finished(),
            suspended: job.is_suspend_requested(),
        }
    }
}

impl ShipView {
    fn of(ship: &Ship) -> Result<Self> {
        Ok(Self {
            id: ship.id,
            name: ship.name.clone(),
            kind: ship.kind,
            dimensions: ship.dimensions,
            location: ship.location()?,
            arrival_time: ship.arrival_time()?,
            dock_time: ship.dock_time()?,
            jobs: ship.jobs.iter().map(|j| JobView::of(j)).collect(),
        })
    }
}

impl PortView {
    pub fn ships(&self) -> impl Iterator<Item = &ShipView> {
        self.docks
            .iter()
            .filter_map(|d| d.ship.as_ref())
            .chain(self.queue.iter())
            .chain(self.departed.iter())
    }
}

impl WorldSnapshot {
    pub fn ships(&self) -> impl Iterator<Item = &ShipView> {
        self.ports.iter().flat_map(|p| p.ships())
    }

    pub fn jobs(&self) -> impl Iterator<Item = &JobView> {
        self.ships().flat_map(|s| s.jobs.iter())
    }
}

impl World {
    /// Captures every port while holding its queue lock, taking dock locks
    /// in the same order the scheduler does, so a port is never seen half
    /// way through a transition.
    pub fn snapshot(&self) -> Result<WorldSnapshot> {
        let mut ports = Vec::with_capacity(self.ports.len());
        for port in &self.ports {
            let queue = port.queue()?;
            let mut docks = Vec::with_capacity(port.docks.len());
            for dock in &port.docks {
                let berth = dock.lock()?;
                docks.push(DockView {
                    id: dock.id,
                    name: dock.name.clone(),
                    ship: berth.occupant().map(|s| ShipView::of(s)).transpose()?,
                });
            }
            let queued = queue
                .iter()
                .map(|s| ShipView::of(s))
                .collect::<Result<Vec<_>>>()?;

            let mut departed = Vec::new();
            for ship in &port.ships {
                if matches!(ship.location()?, Location::Departed { .. }) {
                    departed.push(ShipView::of(ship)?);
                }
            }
            drop(queue);

            ports.push(PortView {
                id: port.id,
                name: port.name.clone(),
                docks,
                queue: queued,
                departed,
                persons: port.persons.clone(),
            });
        }
        Ok(WorldSnapshot {
            taken_at: Utc::now(),
            ports,
        })
    }
}
