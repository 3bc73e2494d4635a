use crate::types::{BrewStrength, FaultKind, MachineState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point-in-time view of the controller for display layers. Serializable so
/// a UI shell can ship it onward without touching the controller itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: MachineState,
    pub selected_strength: BrewStrength,
    pub active_strength: Option<BrewStrength>,
    pub progress: Option<f32>,
    pub fault: Option<FaultKind>,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.state)?;
        if let Some(strength) = self.active_strength {
            write!(f, " [{:?}]", strength)?;
        }
        if let Some(progress) = self.progress {
            write!(f, " {:.0}%", progress * 100.0)?;
        }
        if let Some(fault) = self.fault {
            write!(f, " fault={}", fault.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plain_state() {
        let snapshot = StatusSnapshot {
            state: MachineState::Idle,
            selected_strength: BrewStrength::Medium,
            active_strength: None,
            progress: None,
            fault: None,
        };
        assert_eq!(snapshot.to_string(), "Idle");
    }

    #[test]
    fn test_display_brewing_with_progress() {
        let snapshot = StatusSnapshot {
            state: MachineState::Brewing,
            selected_strength: BrewStrength::Strong,
            active_strength: Some(BrewStrength::Strong),
            progress: Some(0.5),
            fault: None,
        };
        assert_eq!(snapshot.to_string(), "Brewing [Strong] 50%");
    }

    #[test]
    fn test_display_fault() {
        let snapshot = StatusSnapshot {
            state: MachineState::Error,
            selected_strength: BrewStrength::Medium,
            active_strength: None,
            progress: None,
            fault: Some(FaultKind::SensorFailure),
        };
        assert_eq!(snapshot.to_string(), "Error fault=SENSOR FAILURE");
    }
}
