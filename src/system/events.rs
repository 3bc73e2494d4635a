//! Event vocabulary shared between the I/O boundary and the state machine.
//! The I/O layer classifies raw electrical transitions into press/hold
//! gestures; the controller only ever sees the two logical kinds.

use crate::types::Button;
use serde::{Deserialize, Serialize};

/// A classified gesture on a physical control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Press(Button),
    Hold(Button),
}

impl ButtonEvent {
    pub fn button(&self) -> Button {
        match self {
            ButtonEvent::Press(button) | ButtonEvent::Hold(button) => *button,
        }
    }
}

/// Actuator commands for the I/O layer. The machine's states are orders,
/// not labels; these are their concrete spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HardwareCommand {
    HeaterOn,
    HeaterOff,
    PumpOn,
    PumpOff,
}

impl HardwareCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            HardwareCommand::HeaterOn => "heater on",
            HardwareCommand::HeaterOff => "heater off",
            HardwareCommand::PumpOn => "pump on",
            HardwareCommand::PumpOff => "pump off",
        }
    }
}
