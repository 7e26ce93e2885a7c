//! Command-line interface of the seaport simulator, built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (run, show, search,
//! sort) and the global timing flags.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::world::{SearchKey, SortKey, SortTarget};

/// Seaport simulator: ships queue for docks while their jobs run.
#[derive(Debug, Parser)]
#[command(name = "seaport", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Milliseconds between two progress ticks of a job.
    #[arg(long, global = true)]
    pub tick_ms: Option<u64>,

    /// Milliseconds between two scheduler passes.
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// Enables debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Loads a world file and runs the simulation.
    Run {
        /// Path to the world record file.
        file: PathBuf,

        /// Stops once every dock and queue is empty.
        #[arg(long)]
        until_idle: bool,

        /// Prints events as JSON lines instead of progress bars.
        #[arg(long)]
        json: bool,
    },

    /// Loads a world file and prints its initial layout.
    Show {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Searches the loaded world.
    Search {
        file: PathBuf,

        #[arg(long, value_enum)]
        by: SearchArg,

        target: String,
    },

    /// Prints ports, docks, ships, jobs or persons in sorted order.
    Sort {
        file: PathBuf,

        #[arg(long, value_enum)]
        by: SortArg,

        /// What to sort. Variant keys need `cargo` or `passenger`.
        #[arg(long, value_enum, default_value_t = SortTargetArg::Queue)]
        target: SortTargetArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchArg {
    Index,
    Name,
    Type,
    Skill,
}

impl From<SearchArg> for SearchKey {
    fn from(arg: SearchArg) -> Self {
        match arg {
            SearchArg::Index => SearchKey::Index,
            SearchArg::Name => SearchKey::Name,
            SearchArg::Type => SearchKey::Type,
            SearchArg::Skill => SearchKey::Skill,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
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

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortKey::Name,
            SortArg::Weight => SortKey::Weight,
            SortArg::Length => SortKey::Length,
            SortArg::Width => SortKey::Width,
            SortArg::Draft => SortKey::Draft,
            SortArg::CargoWeight => SortKey::CargoWeight,
            SortArg::CargoVolume => SortKey::CargoVolume,
            SortArg::CargoValue => SortKey::CargoValue,
            SortArg::Passengers => SortKey::Passengers,
            SortArg::Rooms => SortKey::Rooms,
            SortArg::Occupied => SortKey::Occupied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortTargetArg {
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

impl From<SortTargetArg> for SortTarget {
    fn from(arg: SortTargetArg) -> Self {
        match arg {
            SortTargetArg::World => SortTarget::World,
            SortTargetArg::Ports => SortTarget::Ports,
            SortTargetArg::Docks => SortTarget::Docks,
            SortTargetArg::Queue => SortTarget::Queue,
            SortTargetArg::Ships => SortTarget::Ships,
            SortTargetArg::Cargo => SortTarget::Cargo,
            SortTargetArg::Passenger => SortTarget::Passenger,
            SortTargetArg::Jobs => SortTarget::Jobs,
            SortTargetArg::Persons => SortTarget::Persons,
        }
    }
}
