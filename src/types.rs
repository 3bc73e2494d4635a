use anyhow::ensure;
use embassy_time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    Idle,
    Heating,
    ReadyToBrew,
    Brewing,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrewStrength {
    Mild,
    Medium,
    Strong,
}

impl BrewStrength {
    /// Next selection in the cycle Mild -> Medium -> Strong -> Mild.
    pub fn next(self) -> Self {
        match self {
            BrewStrength::Mild => BrewStrength::Medium,
            BrewStrength::Medium => BrewStrength::Strong,
            BrewStrength::Strong => BrewStrength::Mild,
        }
    }
}

impl Default for BrewStrength {
    fn default() -> Self {
        BrewStrength::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    Power,
    Brew,
    StrengthSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    SensorFailure,
    OverTemperature,
    HeaterFailure,
    PumpFailure,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::SensorFailure => "SENSOR FAILURE",
            FaultKind::OverTemperature => "OVER TEMPERATURE",
            FaultKind::HeaterFailure => "HEATER FAILURE",
            FaultKind::PumpFailure => "PUMP FAILURE",
        }
    }
}

/// Phase durations in milliseconds. Stored as plain integers so the whole
/// struct round-trips through serde; accessors hand out proper durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    pub heat_duration_ms: u64,
    pub brew_mild_ms: u64,
    pub brew_medium_ms: u64,
    pub brew_strong_ms: u64,
    pub done_timeout_ms: u64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            heat_duration_ms: DEFAULT_HEAT_DURATION_MS,
            brew_mild_ms: DEFAULT_BREW_MILD_MS,
            brew_medium_ms: DEFAULT_BREW_MEDIUM_MS,
            brew_strong_ms: DEFAULT_BREW_STRONG_MS,
            done_timeout_ms: DEFAULT_DONE_TIMEOUT_MS,
        }
    }
}

impl MachineConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.heat_duration_ms > 0, "heat duration must be nonzero");
        ensure!(self.brew_mild_ms > 0, "mild brew duration must be nonzero");
        ensure!(self.brew_medium_ms > 0, "medium brew duration must be nonzero");
        ensure!(self.brew_strong_ms > 0, "strong brew duration must be nonzero");
        ensure!(self.done_timeout_ms > 0, "done timeout must be nonzero");
        Ok(())
    }

    pub fn heat_duration(&self) -> Duration {
        Duration::from_millis(self.heat_duration_ms)
    }

    pub fn brew_duration(&self, strength: BrewStrength) -> Duration {
        let ms = match strength {
            BrewStrength::Mild => self.brew_mild_ms,
            BrewStrength::Medium => self.brew_medium_ms,
            BrewStrength::Strong => self.brew_strong_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn done_timeout(&self) -> Duration {
        Duration::from_millis(self.done_timeout_ms)
    }
}

pub const DEFAULT_HEAT_DURATION_MS: u64 = 45_000;
pub const DEFAULT_BREW_MILD_MS: u64 = 25_000;
pub const DEFAULT_BREW_MEDIUM_MS: u64 = 35_000;
pub const DEFAULT_BREW_STRONG_MS: u64 = 50_000;
pub const DEFAULT_DONE_TIMEOUT_MS: u64 = 30_000;
pub const OUTPUT_QUEUE_DEPTH: usize = 8;
pub const COMMAND_QUEUE_DEPTH: usize = 16;
