//! Simulation configuration loaded from `seaport.toml`.
//!
//! [`SeaportConfig`] holds the timing parameters of job tasks and of the
//! scheduler loop. Values missing from the file fall back to defaults.
//! The `SEAPORT_TICK_MS` environment variable takes precedence over the file.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SeaportError};

/// Top-level configuration loaded from `seaport.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SeaportConfig {
    /// Interval between two progress ticks of a job task.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Think time between two scheduler iterations.
    #[serde(default = "default_scheduler_interval_ms")]
    pub scheduler_interval_ms: u64,

    /// Time units a running job accrues per tick.
    #[serde(default = "default_units_per_tick")]
    pub units_per_tick: u64,

    /// Lower bound (inclusive) of the random duration scale.
    #[serde(default = "default_scale_min")]
    pub scale_min: u32,

    /// Upper bound (exclusive) of the random duration scale.
    #[serde(default = "default_scale_max")]
    pub scale_max: u32,
}

fn default_tick_ms() -> u64 {
    100
}

fn default_scheduler_interval_ms() -> u64 {
    100
}

fn default_units_per_tick() -> u64 {
    100
}

fn default_scale_min() -> u32 {
    100
}

fn default_scale_max() -> u32 {
    400
}

impl Default for SeaportConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            scheduler_interval_ms: default_scheduler_interval_ms(),
            units_per_tick: default_units_per_tick(),
            scale_min: default_scale_min(),
            scale_max: default_scale_max(),
        }
    }
}

impl SeaportConfig {
    /// Loads `seaport.toml` from the current directory, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("seaport.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<SeaportConfig>(&contents)?
        } else {
            Self::default()
        };

        config.apply_tick_override(std::env::var("SEAPORT_TICK_MS").ok().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies a raw `SEAPORT_TICK_MS` value. Absent or empty leaves the
    /// file value in place.
    fn apply_tick_override(&mut self, raw: Option<&str>) -> Result<()> {
        let Some(raw) = raw.filter(|r| !r.is_empty()) else {
            return Ok(());
        };
        self.tick_ms = raw
            .parse()
            .map_err(|_| SeaportError::Config(format!("SEAPORT_TICK_MS={raw} is not a number")))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.scale_min == 0 || self.scale_min >= self.scale_max {
            return Err(SeaportError::Config(format!(
                "scale range [{}, {}) is empty",
                self.scale_min, self.scale_max
            )));
        }
        if self.tick_ms == 0 || self.scheduler_interval_ms == 0 {
            return Err(SeaportError::Config("intervals must be non-zero".into()));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler_interval_ms)
    }
}
