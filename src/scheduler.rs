use std::sync::Arc;

use tokio::sync::{Notify, watch};
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::{Event, SharedSink};
use crate::state_machine::JobContext;
use crate::world::{EntityId, Port, World};

/// What one scheduler pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// `(ship, dock)` pairs that left their berth.
    pub departures: Vec<(EntityId, EntityId)>,
    /// `(ship, dock)` pairs promoted from a queue.
    pub dockings: Vec<(EntityId, EntityId)>,
    /// Docks skipped because of a local failure.
    pub skipped: usize,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.departures.is_empty() && self.dockings.is_empty()
    }
}

/// Reconciles job completion with dock occupancy.
///
/// Each pass walks every dock of every port, releases berths whose ship has
/// finished all its work and promotes the oldest queued ship into any free
/// berth.
pub struct Scheduler {
    world: Arc<World>,
    jobs: JobContext,
    interval: Duration,
}

impl Scheduler {
    pub fn new(world: Arc<World>, jobs: JobContext, interval: Duration) -> Self {
        Self {
            world,
            jobs,
            interval,
        }
    }

    fn events(&self) -> &SharedSink {
        &self.jobs.events
    }

    /// Runs one pass. Failures are confined to the dock they occur on.
    pub fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        for port in self.world.ports() {
            for index in 0..port.docks.len() {
                if let Err(err) = self.reconcile_dock(port, index, &mut report) {
                    warn!(port = port.id, dock = port.docks[index].id, error = %err, "dock skipped this tick");
                    report.skipped += 1;
                }
            }
        }
        report
    }

    fn reconcile_dock(&self, port: &Port, index: usize, report: &mut TickReport) -> Result<()> {
        let dock = &port.docks[index];
        let mut queue = port.queue()?;
        let mut berth = dock.lock()?;

        if let Some(ship) = berth.occupant() {
            if !ship.is_work_complete() {
                return Ok(());
            }
            let ship = Arc::clone(ship);
            for job in &ship.jobs {
                self.events().emit(Event::JobCompleted {
                    job: job.id,
                    ship: ship.id,
                    dock: dock.id,
                    port: port.id,
                });
            }
            self.events().emit(Event::ShipDeparting {
                ship: ship.id,
                dock: dock.id,
                port: port.id,
            });
            berth.release();
            ship.mark_departed(port.id)?;
            info!(ship = %ship.name, dock = %dock.name, port = %port.name, "ship departing");
            report.departures.push((ship.id, dock.id));
        }

        if queue.is_empty() {
            return Ok(());
        }
        let next = port.promote(&mut queue, &mut berth)?;
        drop(berth);
        drop(queue);

        self.events().emit(Event::ShipDocking {
            ship: next.id,
            dock: dock.id,
            port: port.id,
        });
        let started = next.start_jobs(&self.jobs);
        info!(ship = %next.name, dock = %dock.name, port = %port.name, jobs = started, "ship docking");
        report.dockings.push((next.id, dock.id));
        Ok(())
    }

    /// Ticks until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Sleeps `interval` between passes but wakes early when a job
    /// finishes.
    pub async fn run(&self, completions: Arc<Notify>, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "scheduler running");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let report = self.tick();
            if !report.is_quiet() {
                debug!(?report, "scheduler pass");
            }
            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = completions.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("scheduler stopped");
    }
}
