//! Terminal front end: progress bars and colored dock messages.
//!
//! Uses `indicatif` for one progress bar per running job and `console` for
//! styled output. A [`Console`] consumes [`Event`]s from the simulation
//! core; [`Tree`] renders a [`WorldSnapshot`] as an indented listing.

use std::collections::HashMap;
use std::fmt;

use console::Style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::events::Event;
use crate::state_machine::JobStatus;
use crate::world::{EntityId, ShipView, World, WorldSnapshot};

/// Live view of a running simulation.
pub struct Console {
    names: HashMap<EntityId, String>,
    bars: MultiProgress,
    jobs: HashMap<EntityId, ProgressBar>,
    bar_style: ProgressStyle,
    green: Style,
    red: Style,
    yellow: Style,
    cyan: Style,
}

impl Console {
    pub fn new(world: &World) -> Self {
        Self::with_target(world, ProgressDrawTarget::stderr())
    }

    /// A console that draws nothing. Dock messages are still formatted.
    pub fn hidden(world: &World) -> Self {
        Self::with_target(world, ProgressDrawTarget::hidden())
    }

    fn with_target(world: &World, target: ProgressDrawTarget) -> Self {
        let mut names = HashMap::new();
        for port in world.ports() {
            names.insert(port.id, port.name.clone());
            for dock in &port.docks {
                names.insert(dock.id, dock.name.clone());
            }
        }
        for ship in world.ships() {
            names.insert(ship.id, ship.name.clone());
        }
        for job in world.jobs() {
            names.insert(job.id, job.name.clone());
        }

        let bar_style = ProgressStyle::with_template("{prefix:>9.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        Self {
            names,
            bars: MultiProgress::with_draw_target(target),
            jobs: HashMap::new(),
            bar_style,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            cyan: Style::new().cyan(),
        }
    }

    fn name(&self, id: EntityId) -> String {
        self.names.get(&id).cloned().unwrap_or_else(|| format!("#{id}"))
    }

    /// The one-line message for a dock event. Progress events have none.
    pub fn describe(&self, event: &Event) -> Option<String> {
        match *event {
            Event::ShipDocking { ship, dock, port } => Some(format!(
                ">>> SHIP DOCKING: SS {} docking in {} at Port of {}",
                self.name(ship),
                self.name(dock),
                self.name(port)
            )),
            Event::ShipDeparting { ship, dock, port } => Some(format!(
                ">>> SHIP DEPARTING: SS {} leaving {} at Port of {}",
                self.name(ship),
                self.name(dock),
                self.name(port)
            )),
            Event::JobCompleted {
                job,
                ship,
                dock,
                port,
            } => Some(format!(
                ">>> JOB DONE: Work order {} finished on SS {} at {} in Port of {}",
                self.name(job),
                self.name(ship),
                self.name(dock),
                self.name(port)
            )),
            Event::JobProgress { .. } => None,
        }
    }

    fn style_for(&self, event: &Event) -> &Style {
        match event {
            Event::ShipDeparting { .. } => &self.yellow,
            Event::JobCompleted { .. } => &self.green,
            Event::ShipDocking { .. } | Event::JobProgress { .. } => &self.cyan,
        }
    }

    /// Prints a problem above the bars.
    pub fn warn(&self, message: impl fmt::Display) {
        let _ = self
            .bars
            .println(format!("  {} {message}", self.red.apply_to("✗")));
    }

    pub fn handle(&mut self, event: &Event) {
        if let Event::JobProgress {
            job,
            percent,
            status,
        } = *event
        {
            self.update_bar(job, percent, status);
            return;
        }
        if let Event::JobCompleted { job, .. } = *event
            && let Some(bar) = self.jobs.remove(&job)
        {
            bar.finish_and_clear();
            self.bars.remove(&bar);
        }
        if let Some(line) = self.describe(event) {
            let styled = self.style_for(event).apply_to(line).to_string();
            // Printing fails only when the terminal is gone.
            let _ = self.bars.println(styled);
        }
    }

    fn update_bar(&mut self, job: EntityId, percent: u8, status: JobStatus) {
        let name = self.name(job);
        let bar = self.jobs.entry(job).or_insert_with(|| {
            let bar = self.bars.add(ProgressBar::new(100));
            bar.set_style(self.bar_style.clone());
            bar.set_message(name);
            bar
        });
        bar.set_prefix(status.to_string());
        bar.set_position(u64::from(percent));
        if status == JobStatus::Complete {
            bar.finish();
        }
    }

    /// Jobs with a visible bar. Bars of completed work orders are dropped
    /// when their ship departs.
    pub fn tracked_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Clears every bar, finished or not.
    pub fn finish(&mut self) {
        for (_, bar) in self.jobs.drain() {
            bar.finish_and_clear();
        }
        let _ = self.bars.clear();
    }
}

/// Indented listing of ports, docks, queues and jobs.
pub struct Tree<'a>(pub &'a WorldSnapshot);

impl Tree<'_> {
    fn ship(f: &mut fmt::Formatter<'_>, indent: &str, ship: &ShipView) -> fmt::Result {
        writeln!(f, "{indent}SS {} ({}) [{}]", ship.name, ship.id, ship.kind.kind_name())?;
        for job in &ship.jobs {
            let suspended = if job.suspended { " (suspended)" } else { "" };
            let requirements = if job.requirements.is_empty() {
                "none".to_string()
            } else {
                job.requirements.join(", ")
            };
            writeln!(
                f,
                "{indent}  Job {} ({}) {} {}%{suspended}, {:.2} hours, requires: {requirements}",
                job.name, job.id, job.status, job.percent, job.duration
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Tree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for port in &self.0.ports {
            writeln!(f, "Port of {} ({})", port.name, port.id)?;
            for dock in &port.docks {
                match &dock.ship {
                    Some(ship) => {
                        writeln!(f, "  Dock {} ({}):", dock.name, dock.id)?;
                        Self::ship(f, "    ", ship)?;
                    }
                    None => writeln!(f, "  Dock {} ({}): empty", dock.name, dock.id)?,
                }
            }
            if !port.queue.is_empty() {
                writeln!(f, "  Queue:")?;
                for ship in &port.queue {
                    Self::ship(f, "    ", ship)?;
                }
            }
            if !port.departed.is_empty() {
                writeln!(f, "  Departed:")?;
                for ship in &port.departed {
                    writeln!(f, "    SS {} ({})", ship.name, ship.id)?;
                }
            }
            if !port.persons.is_empty() {
                writeln!(f, "  Persons:")?;
                for person in &port.persons {
                    match &person.skill {
                        Some(skill) => writeln!(f, "    {} ({}) {skill}", person.name, person.id)?,
                        None => writeln!(f, "    {} ({})", person.name, person.id)?,
                    }
                }
            }
        }
        Ok(())
    }
}

pub fn render_tree(snapshot: &WorldSnapshot) -> String {
    Tree(snapshot).to_string()
}
