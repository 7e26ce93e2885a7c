use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::EntityId;
use super::ship::Ship;
use crate::error::{PreconditionViolation, Result, SeaportError};

/// A single berth. Holds at most one ship.
#[derive(Debug)]
pub struct Dock {
    pub id: EntityId,
    pub name: String,
    pub port: EntityId,
    occupant: Mutex<Option<Arc<Ship>>>,
}

/// Exclusive access to a dock's occupant slot.
///
/// Every check-and-transition on a dock happens through a `Berth`, so the
/// slot can never be observed holding two ships.
pub struct Berth<'a> {
    dock: &'a Dock,
    slot: MutexGuard<'a, Option<Arc<Ship>>>,
}

impl Dock {
    pub fn new(id: EntityId, name: impl Into<String>, port: EntityId) -> Self {
        Self {
            id,
            name: name.into(),
            port,
            occupant: Mutex::new(None),
        }
    }

    pub fn lock(&self) -> Result<Berth<'_>> {
        let slot = self
            .occupant
            .lock()
            .map_err(|_| SeaportError::race(format_args!("dock {}", self.id)))?;
        Ok(Berth { dock: self, slot })
    }

    pub fn occupant(&self) -> Result<Option<Arc<Ship>>> {
        Ok(self.lock()?.occupant().cloned())
    }

    pub fn assign(&self, ship: Arc<Ship>) -> Result<()> {
        self.lock()?.assign(ship)
    }

    pub fn release(&self) -> Result<Option<Arc<Ship>>> {
        Ok(self.lock()?.release())
    }
}

impl Berth<'_> {
    pub fn dock(&self) -> &Dock {
        self.dock
    }

    pub fn occupant(&self) -> Option<&Arc<Ship>> {
        self.slot.as_ref()
    }

    pub fn is_free(&self) -> bool {
        self.slot.is_none()
    }

    /// Fails if a ship is already berthed; callers must release first.
    pub fn assign(&mut self, ship: Arc<Ship>) -> Result<()> {
        if let Some(current) = self.slot.as_ref() {
            return Err(PreconditionViolation::DockOccupied {
                dock: self.dock.id,
                occupant: current.id,
            }
            .into());
        }
        *self.slot = Some(ship);
        Ok(())
    }

    pub fn release(&mut self) -> Option<Arc<Ship>> {
        self.slot.take()
    }
}

/// FIFO waiting line of one port.
#[derive(Debug)]
pub struct ShipQueue {
    port: EntityId,
    ships: VecDeque<Arc<Ship>>,
}

impl ShipQueue {
    pub fn new(port: EntityId) -> Self {
        Self {
            port,
            ships: VecDeque::new(),
        }
    }

    /// Appends to the back and returns the ship's zero-based position.
    pub fn enqueue(&mut self, ship: Arc<Ship>) -> usize {
        self.ships.push_back(ship);
        self.ships.len() - 1
    }

    /// Pops the oldest arrival.
    pub fn dequeue_next(&mut self) -> Result<Arc<Ship>> {
        self.ships
            .pop_front()
            .ok_or_else(|| PreconditionViolation::EmptyQueue { port: self.port }.into())
    }

    /// Puts a ship popped by a failed promotion back at the head.
    pub(crate) fn restore_front(&mut self, ship: Arc<Ship>) {
        self.ships.push_front(ship);
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Ship>> {
        self.ships.iter()
    }

    pub fn position(&self, ship: EntityId) -> Option<usize> {
        self.ships.iter().position(|s| s.id == ship)
    }
}
