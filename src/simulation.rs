//! Lifecycle context and control surface of one simulation run.
//!
//! [`Simulation`] owns the world, the scheduler task and the job context.
//! It moves through `Idle → Running → Stopped` and never back.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::config::SeaportConfig;
use crate::error::{PreconditionViolation, Result, SeaportError};
use crate::events::{Event, SharedSink};
use crate::loader::{self, LoadReport};
use crate::scheduler::Scheduler;
use crate::state_machine::{CancelOutcome, JobContext, JobStatus};
use crate::world::{EntityId, World, WorldSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

impl Lifecycle {
    fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Idle => "idle",
            Lifecycle::Running => "running",
            Lifecycle::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Simulation {
    run_id: Uuid,
    config: SeaportConfig,
    world: Arc<World>,
    jobs: JobContext,
    state: Lifecycle,
    launched: bool,
    shutdown: Option<watch::Sender<bool>>,
    runner: Option<JoinHandle<()>>,
}

impl Simulation {
    pub fn new(world: World, config: SeaportConfig, events: SharedSink) -> Self {
        let jobs = JobContext::from_config(&config, events, Arc::new(Notify::new()));
        Self {
            run_id: Uuid::new_v4(),
            config,
            world: Arc::new(world),
            jobs,
            state: Lifecycle::Idle,
            launched: false,
            shutdown: None,
            runner: None,
        }
    }

    /// Builds a simulation from record text. Skipped records are returned
    /// alongside.
    pub fn load_world(
        records: &str,
        config: SeaportConfig,
        events: SharedSink,
    ) -> Result<(Self, Vec<SeaportError>)> {
        Ok(Self::from_report(loader::load_world(records)?, config, events))
    }

    pub fn load_file(
        path: &Path,
        config: SeaportConfig,
        events: SharedSink,
    ) -> Result<(Self, Vec<SeaportError>)> {
        Ok(Self::from_report(loader::load_file(path)?, config, events))
    }

    fn from_report(report: LoadReport, config: SeaportConfig, events: SharedSink) -> (Self, Vec<SeaportError>) {
        (Self::new(report.world, config, events), report.skipped)
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &SeaportConfig {
        &self.config
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// Starts the jobs of every docked ship and fills docks the input left
    /// free. Runs once; later calls return 0.
    pub fn launch(&mut self) -> Result<usize> {
        if self.launched {
            return Ok(0);
        }
        self.launched = true;

        let mut started = 0;
        for port in self.world.ports() {
            let mut docked = port.docked_ships()?;
            docked.extend(port.fill_idle_docks()?);
            for (ship, dock) in docked {
                self.jobs.events.emit(Event::ShipDocking {
                    ship: ship.id,
                    dock,
                    port: port.id,
                });
                started += ship.start_jobs(&self.jobs);
            }
        }
        info!(run = %self.run_id, jobs = started, "initial jobs started");
        Ok(started)
    }

    fn expect_state(&self, expected: Lifecycle) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PreconditionViolation::Lifecycle {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            }
            .into())
        }
    }

    /// Launches if needed and spawns the scheduler loop. Must be called
    /// inside a tokio runtime.
    pub fn start_scheduler(&mut self) -> Result<()> {
        self.expect_state(Lifecycle::Idle)?;
        self.launch()?;

        let (tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(
            Arc::clone(&self.world),
            self.jobs.clone(),
            self.config.scheduler_interval(),
        );
        let completions = Arc::clone(&self.jobs.completions);
        let span = info_span!("simulation", run = %self.run_id);
        self.runner = Some(tokio::spawn(
            async move { scheduler.run(completions, rx).await }.instrument(span),
        ));
        self.shutdown = Some(tx);
        self.state = Lifecycle::Running;
        Ok(())
    }

    /// Signals the scheduler to stop and waits for it. Running jobs are
    /// left alone.
    pub async fn stop_scheduler(&mut self) -> Result<()> {
        self.expect_state(Lifecycle::Running)?;
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(runner) = self.runner.take() {
            runner
                .await
                .map_err(|e| SeaportError::StructuralRace(format!("scheduler task failed: {e}")))?;
        }
        self.state = Lifecycle::Stopped;
        Ok(())
    }

    /// Toggles suspension of a job. Returns whether it is now suspended.
    pub fn request_suspend(&self, job: EntityId) -> Result<bool> {
        let job = self.world.job(job).ok_or(SeaportError::JobNotFound(job))?;
        let suspended = job.request_suspend_toggle();
        info!(job = job.id, suspended, "suspend toggled");
        Ok(suspended)
    }

    pub fn request_cancel(&self, job: EntityId) -> Result<CancelOutcome> {
        let job = self.world.job(job).ok_or(SeaportError::JobNotFound(job))?;
        let outcome = job.request_cancel();
        if outcome == CancelOutcome::Finalized {
            // No task will report this one.
            self.jobs.events.emit(Event::JobProgress {
                job: job.id,
                percent: 100,
                status: JobStatus::Complete,
            });
            self.jobs.completions.notify_one();
        }
        info!(job = job.id, ?outcome, "cancel requested");
        Ok(outcome)
    }

    pub fn snapshot(&self) -> Result<WorldSnapshot> {
        self.world.snapshot()
    }

    /// No ship docked or waiting anywhere.
    pub fn is_idle(&self) -> Result<bool> {
        self.world.is_idle()
    }
}
