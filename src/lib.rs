//! Concurrent seaport simulation.
//!
//! A world of ports, docks, ship queues and jobs is loaded from a record
//! file. Every job runs as its own task; a scheduler releases docks whose
//! ship has finished all its work and promotes the next queued ship.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod loader;
pub mod scheduler;
pub mod simulation;
pub mod state_machine;
pub mod ui;
pub mod world;

pub use config::SeaportConfig;
pub use error::{PreconditionViolation, Result, SeaportError};
pub use events::{ChannelSink, Event, EventSink, NullSink, SharedSink};
pub use simulation::{Lifecycle, Simulation};
