use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::EntityId;
use crate::error::{Result, SeaportError};
use crate::state_machine::{Job, JobContext};

/// Hull measurements shared by every ship variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Dimensions {
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub draft: f64,
}

/// Variant-specific cargo of a ship.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShipKind {
    Plain,
    Cargo {
        cargo_weight: f64,
        cargo_volume: f64,
        cargo_value: f64,
    },
    Passenger {
        passengers: u32,
        rooms: u32,
        occupied: u32,
    },
}

impl ShipKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ShipKind::Plain => "ship",
            ShipKind::Cargo { .. } => "cargo",
            ShipKind::Passenger { .. } => "passenger",
        }
    }
}

/// Where a ship currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "at", rename_all = "snake_case")]
pub enum Location {
    Unassigned,
    Queued { port: EntityId },
    Docked { port: EntityId, dock: EntityId },
    /// Work done and berth released.
    Departed { port: EntityId },
}

#[derive(Debug)]
pub(crate) struct ShipState {
    pub(crate) location: Location,
    pub(crate) arrival_time: Option<DateTime<Utc>>,
    pub(crate) dock_time: Option<DateTime<Utc>>,
}

/// A vessel with an ordered list of work orders.
#[derive(Debug)]
pub struct Ship {
    pub id: EntityId,
    pub name: String,
    /// Dock or port named by the input record.
    pub parent: EntityId,
    pub dimensions: Dimensions,
    pub kind: ShipKind,
    pub jobs: Vec<Arc<Job>>,
    state: Mutex<ShipState>,
}

impl Ship {
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        parent: EntityId,
        dimensions: Dimensions,
        kind: ShipKind,
        jobs: Vec<Arc<Job>>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            dimensions,
            kind,
            jobs,
            state: Mutex::new(ShipState {
                location: Location::Unassigned,
                arrival_time: None,
                dock_time: None,
            }),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, ShipState>> {
        self.state
            .lock()
            .map_err(|_| SeaportError::race(format_args!("ship {}", self.id)))
    }

    pub fn location(&self) -> Result<Location> {
        Ok(self.state()?.location)
    }

    pub fn arrival_time(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.state()?.arrival_time)
    }

    pub fn dock_time(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.state()?.dock_time)
    }

    pub(crate) fn mark_queued(&self, port: EntityId) -> Result<()> {
        let mut state = self.state()?;
        state.location = Location::Queued { port };
        state.arrival_time.get_or_insert_with(Utc::now);
        Ok(())
    }

    pub(crate) fn mark_docked(&self, port: EntityId, dock: EntityId) -> Result<()> {
        let mut state = self.state()?;
        let now = Utc::now();
        state.location = Location::Docked { port, dock };
        state.arrival_time.get_or_insert(now);
        state.dock_time = Some(now);
        Ok(())
    }

    pub(crate) fn mark_departed(&self, port: EntityId) -> Result<()> {
        self.state()?.location = Location::Departed { port };
        Ok(())
    }

    /// True once every job has finished; vacuously true without jobs.
    pub fn is_work_complete(&self) -> bool {
        self.jobs.iter().all(|job| job.is_finished())
    }

    /// Starts every job that is not running yet. Returns how many were
    /// spawned.
    pub fn start_jobs(&self, ctx: &JobContext) -> usize {
        self.jobs.iter().filter_map(|job| job.start(ctx)).count()
    }
}

/// A skill holder working at a port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    pub id: EntityId,
    pub name: String,
    pub port: EntityId,
    pub skill: Option<String>,
}
