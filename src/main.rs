use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use seaport::cli::{Cli, Command};
use seaport::loader::{self, LoadReport};
use seaport::ui::{Console, render_tree};
use seaport::world::{SearchKey, SortKey, SortTarget, search, sort_world};
use seaport::{ChannelSink, Event, SeaportConfig, Simulation};

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "seaport=debug" } else { "seaport=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = SeaportConfig::load().context("failed to load seaport.toml")?;
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.scheduler_interval_ms = interval_ms;
    }
    config.validate()?;

    match cli.command {
        Command::Run {
            file,
            until_idle,
            json,
        } => run(&file, config, until_idle, json).await,
        Command::Show { file, json } => show(&file, json),
        Command::Search { file, by, target } => search_world(&file, by.into(), &target),
        Command::Sort { file, by, target } => sort_things(&file, target.into(), by.into()),
    }
}

fn load(file: &Path) -> Result<LoadReport> {
    loader::load_file(file).with_context(|| format!("failed to read {}", file.display()))
}

async fn run(file: &Path, config: SeaportConfig, until_idle: bool, json: bool) -> Result<()> {
    let (sink, mut events) = ChannelSink::new();
    let (mut simulation, skipped) = Simulation::load_file(file, config, Arc::new(sink))
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut console = if json {
        Console::hidden(simulation.world())
    } else {
        Console::new(simulation.world())
    };
    for err in &skipped {
        console.warn(err);
    }
    info!(run = %simulation.run_id(), counts = ?simulation.world().counts(), "world loaded");

    let mut emit = |event: &Event| -> Result<()> {
        if json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            console.handle(event);
        }
        Ok(())
    };

    simulation.start_scheduler()?;
    let mut idle_check = tokio::time::interval(simulation.config().scheduler_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(event) = events.recv() => emit(&event)?,
            _ = idle_check.tick(), if until_idle => {
                if simulation.is_idle()? {
                    info!("all ports idle");
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
        }
    }

    simulation.stop_scheduler().await?;
    while let Ok(event) = events.try_recv() {
        emit(&event)?;
    }
    drop(emit);
    console.finish();

    let snapshot = simulation.snapshot()?;
    if json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        print!("{}", render_tree(&snapshot));
    }
    Ok(())
}

fn show(file: &Path, json: bool) -> Result<()> {
    let report = load(file)?;
    let snapshot = report.world.snapshot()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render_tree(&snapshot));
    }
    Ok(())
}

fn search_world(file: &Path, key: SearchKey, target: &str) -> Result<()> {
    let snapshot = load(file)?.world.snapshot()?;
    let hits = search(&snapshot, key, target);
    if hits.is_empty() {
        println!("No match for {target:?}");
    }
    for hit in hits {
        println!("{hit}");
    }
    Ok(())
}

fn sort_things(file: &Path, target: SortTarget, key: SortKey) -> Result<()> {
    let snapshot = load(file)?.world.snapshot()?;
    for group in sort_world(&snapshot, target, key)? {
        println!("{} sorted by {key}:", group.heading);
        for entry in &group.entries {
            match entry.value {
                Some(value) => println!("  {} ({}) {key}: {value:.2}", entry.name, entry.id),
                None => println!("  {} ({})", entry.name, entry.id),
            }
        }
    }
    Ok(())
}
