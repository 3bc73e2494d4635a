use crate::types::{FaultKind, MachineState};
use embassy_time::Duration;
use log::{error, info};

/// Fault bookkeeping alongside the state machine: latches the active fault,
/// tracks how long the machine has been sitting in it, and produces
/// human-readable health warnings for display layers.
pub struct SafetyMonitor {
    latched: Option<FaultKind>,
    fault_count: u32,
    time_in_fault: Duration,
}

impl SafetyMonitor {
    pub fn new() -> Self {
        Self {
            latched: None,
            fault_count: 0,
            time_in_fault: Duration::from_ticks(0),
        }
    }

    /// Latch a fault reported by the I/O layer. Returns true when the
    /// diagnosis changed (first fault, or a different kind than before).
    pub fn record_fault(&mut self, kind: FaultKind) -> bool {
        self.fault_count += 1;
        let changed = match self.latched {
            None => {
                self.time_in_fault = Duration::from_ticks(0);
                true
            }
            Some(current) => current != kind,
        };
        self.latched = Some(kind);
        if changed {
            error!("SAFETY: fault latched: {}", kind.as_str());
        }
        changed
    }

    /// Accumulate dwell time; only meaningful while a fault is latched.
    pub fn advance(&mut self, elapsed: Duration) {
        if self.latched.is_some() {
            self.time_in_fault += elapsed;
        }
    }

    /// Manual reset acknowledged the fault.
    pub fn clear(&mut self) {
        if self.latched.is_some() {
            info!("SAFETY: fault cleared by manual reset");
        }
        self.latched = None;
        self.time_in_fault = Duration::from_ticks(0);
    }

    /// Full reset, used by controller initialization.
    pub fn reset(&mut self) {
        self.latched = None;
        self.fault_count = 0;
        self.time_in_fault = Duration::from_ticks(0);
    }

    pub fn active_fault(&self) -> Option<FaultKind> {
        self.latched
    }

    pub fn time_in_fault(&self) -> Duration {
        self.time_in_fault
    }

    pub fn check_health(&self, state: MachineState) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(kind) = self.latched {
            warnings.push(format!(
                "fault latched: {} ({}s in fault)",
                kind.as_str(),
                self.time_in_fault.as_secs()
            ));
        }

        if self.fault_count > 1 {
            warnings.push(format!("{} faults since last initialize", self.fault_count));
        }

        if state == MachineState::Error && self.latched.is_none() {
            warnings.push("error state without a latched fault".to_string());
        }

        warnings
    }
}

impl Default for SafetyMonitor {
    fn default() -> Self {
        Self::new()
    }
}
