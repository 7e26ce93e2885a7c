use std::sync::{Arc, Mutex, MutexGuard};

use super::EntityId;
use super::dock::{Berth, Dock, ShipQueue};
use super::ship::{Person, Ship};
use crate::error::{PreconditionViolation, Result, SeaportError};

/// Where [`Port::assign`] put a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Docked { dock: EntityId },
    Queued { position: usize },
}

/// A site owning docks, one waiting queue, ships and persons.
///
/// Lock order is always queue first, then a dock. Every path that touches
/// both (assignment, promotion, the scheduler, snapshots) follows it.
#[derive(Debug)]
pub struct Port {
    pub id: EntityId,
    pub name: String,
    pub docks: Vec<Dock>,
    pub persons: Vec<Person>,
    /// Every ship ever assigned here, in assignment order.
    pub ships: Vec<Arc<Ship>>,
    queue: Mutex<ShipQueue>,
}

impl Port {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            docks: Vec::new(),
            persons: Vec::new(),
            ships: Vec::new(),
            queue: Mutex::new(ShipQueue::new(id)),
        }
    }

    pub fn queue(&self) -> Result<MutexGuard<'_, ShipQueue>> {
        self.queue
            .lock()
            .map_err(|_| SeaportError::race(format_args!("queue of port {}", self.id)))
    }

    pub fn dock(&self, id: EntityId) -> Option<&Dock> {
        self.docks.iter().find(|d| d.id == id)
    }

    /// Berths the ship at the first free dock, or appends it to the queue.
    /// A ship never overtakes one already waiting: while the queue is not
    /// empty it is queued even if a dock is free.
    ///
    /// Jobs are not started here; the caller owns the runtime.
    pub fn assign(&self, ship: &Arc<Ship>) -> Result<Placement> {
        let mut queue = self.queue()?;
        if !queue.is_empty() {
            return self.enqueue_locked(&mut queue, ship);
        }
        for dock in &self.docks {
            let mut berth = dock.lock()?;
            if berth.is_free() {
                berth.assign(Arc::clone(ship))?;
                ship.mark_docked(self.id, dock.id)?;
                return Ok(Placement::Docked { dock: dock.id });
            }
        }
        self.enqueue_locked(&mut queue, ship)
    }

    /// Berths the ship at one specific dock of this port.
    pub fn assign_to(&self, dock: EntityId, ship: &Arc<Ship>) -> Result<Placement> {
        let target = self
            .dock(dock)
            .ok_or(PreconditionViolation::UnknownDock {
                port: self.id,
                dock,
            })?;
        target.assign(Arc::clone(ship))?;
        ship.mark_docked(self.id, dock)?;
        Ok(Placement::Docked { dock })
    }

    /// Appends to the queue regardless of free docks.
    pub fn enqueue(&self, ship: &Arc<Ship>) -> Result<Placement> {
        let mut queue = self.queue()?;
        self.enqueue_locked(&mut queue, ship)
    }

    fn enqueue_locked(&self, queue: &mut ShipQueue, ship: &Arc<Ship>) -> Result<Placement> {
        ship.mark_queued(self.id)?;
        let position = queue.enqueue(Arc::clone(ship));
        Ok(Placement::Queued { position })
    }

    /// Moves the front of the queue into an already locked, free berth.
    pub fn promote(&self, queue: &mut ShipQueue, berth: &mut Berth<'_>) -> Result<Arc<Ship>> {
        let ship = queue.dequeue_next()?;
        let dock = berth.dock().id;
        if let Err(err) = berth.assign(Arc::clone(&ship)) {
            queue.restore_front(ship);
            return Err(err);
        }
        ship.mark_docked(self.id, dock)?;
        Ok(ship)
    }

    /// Fills every idle dock from the queue, oldest arrival first.
    /// Returns the ships that were berthed with their dock ids.
    pub fn fill_idle_docks(&self) -> Result<Vec<(Arc<Ship>, EntityId)>> {
        let mut queue = self.queue()?;
        let mut berthed = Vec::new();
        for dock in &self.docks {
            if queue.is_empty() {
                break;
            }
            let mut berth = dock.lock()?;
            if berth.is_free() {
                let ship = self.promote(&mut queue, &mut berth)?;
                berthed.push((ship, dock.id));
            }
        }
        Ok(berthed)
    }

    pub fn docked_ships(&self) -> Result<Vec<(Arc<Ship>, EntityId)>> {
        let mut docked = Vec::new();
        for dock in &self.docks {
            if let Some(ship) = dock.occupant()? {
                docked.push((ship, dock.id));
            }
        }
        Ok(docked)
    }

    /// No ship berthed and nobody waiting.
    pub fn is_idle(&self) -> Result<bool> {
        let queue = self.queue()?;
        if !queue.is_empty() {
            return Ok(false);
        }
        for dock in &self.docks {
            if !dock.lock()?.is_free() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
