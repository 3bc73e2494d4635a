//! Operational state machine for the appliance.
//! States: Idle, Heating, ReadyToBrew, Brewing, Done, Error

use crate::system::events::{ButtonEvent, HardwareCommand};
use crate::types::{
    BrewStrength, Button, FaultKind, MachineConfig, MachineState, OUTPUT_QUEUE_DEPTH,
};
use embassy_time::Duration;
use heapless::Vec;
use log::{debug, error, info, warn};
use statig::prelude::*;

/// Input events to the state machine. Gestures arrive pre-classified from
/// the I/O layer; elapsed time arrives through the tick input only, the
/// machine never reads a clock.
#[derive(Debug, Clone)]
pub enum MachineInput {
    Button(ButtonEvent),
    BrewRequested(BrewStrength),
    Tick { elapsed: Duration },
    Fault(FaultKind),
}

/// Output events from the state machine, collected during a single input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineOutput {
    Command(HardwareCommand),
    StateChanged {
        from: MachineState,
        to: MachineState,
    },
}

/// Shared context for the state machine.
#[derive(Debug)]
pub struct MachineContext {
    config: MachineConfig,
    timer: Duration,
    selected_strength: BrewStrength,
    active_strength: Option<BrewStrength>,
    last_fault: Option<FaultKind>,
    outputs: Vec<MachineOutput, OUTPUT_QUEUE_DEPTH>,
}

impl MachineContext {
    fn new(config: MachineConfig) -> Self {
        Self {
            config,
            timer: Duration::from_ticks(0),
            selected_strength: BrewStrength::default(),
            active_strength: None,
            last_fault: None,
            outputs: Vec::new(),
        }
    }

    fn advance_timer(&mut self, elapsed: Duration) -> Duration {
        self.timer += elapsed;
        self.timer
    }

    fn reset_timer(&mut self) {
        self.timer = Duration::from_ticks(0);
    }

    fn cycle_strength(&mut self) {
        self.selected_strength = self.selected_strength.next();
        debug!("strength selection now {:?}", self.selected_strength);
    }

    fn command(&mut self, command: HardwareCommand) {
        if self.outputs.push(MachineOutput::Command(command)).is_err() {
            warn!("output queue full, dropping {}", command.as_str());
        }
    }

    fn reset_runtime(&mut self) {
        self.timer = Duration::from_ticks(0);
        self.selected_strength = BrewStrength::default();
        self.active_strength = None;
        self.last_fault = None;
        self.outputs.clear();
    }
}

#[derive(Debug, Default)]
pub struct CoffeeStateMachine;

#[state_machine(
    initial = "State::idle()",
    state(derive(Debug)),
    on_transition = "Self::on_transition"
)]
impl CoffeeStateMachine {
    /// ⏸️ IDLE STATE - everything off, waiting for power
    #[state]
    fn idle(context: &mut MachineContext, event: &MachineInput) -> Response<State> {
        use Response::*;

        match event {
            MachineInput::Button(ButtonEvent::Press(Button::Power)) => {
                context.reset_timer();
                context.command(HardwareCommand::HeaterOn);
                Transition(State::heating())
            }
            MachineInput::Button(ButtonEvent::Press(Button::StrengthSelect)) => {
                context.cycle_strength();
                Handled
            }
            MachineInput::BrewRequested(strength) => {
                debug!("brew request ignored: machine is off (wanted {:?})", strength);
                Handled
            }
            MachineInput::Fault(kind) => Self::trip_fault(context, *kind),
            _ => Handled,
        }
    }

    /// 🔥 HEATING STATE - heater on until the configured duration elapses
    #[state]
    fn heating(context: &mut MachineContext, event: &MachineInput) -> Response<State> {
        use Response::*;

        match event {
            MachineInput::Tick { elapsed } => {
                if context.advance_timer(*elapsed) >= context.config.heat_duration() {
                    context.reset_timer();
                    Transition(State::ready_to_brew())
                } else {
                    Handled
                }
            }
            MachineInput::Button(ButtonEvent::Press(Button::StrengthSelect)) => {
                context.cycle_strength();
                Handled
            }
            MachineInput::Fault(kind) => Self::trip_fault(context, *kind),
            _ => Handled,
        }
    }

    /// ✅ READY STATE - up to temperature, accepting brew requests
    #[state]
    fn ready_to_brew(context: &mut MachineContext, event: &MachineInput) -> Response<State> {
        use Response::*;

        match event {
            MachineInput::BrewRequested(strength) => Self::start_brew(context, *strength),
            MachineInput::Button(ButtonEvent::Press(Button::Brew)) => {
                let strength = context.selected_strength;
                Self::start_brew(context, strength)
            }
            MachineInput::Button(ButtonEvent::Press(Button::Power)) => {
                info!("brew cancelled, powering down");
                context.reset_timer();
                context.command(HardwareCommand::HeaterOff);
                Transition(State::idle())
            }
            MachineInput::Button(ButtonEvent::Press(Button::StrengthSelect)) => {
                context.cycle_strength();
                Handled
            }
            MachineInput::Fault(kind) => Self::trip_fault(context, *kind),
            _ => Handled,
        }
    }

    /// ☕ BREWING STATE - pump running until the strength's duration elapses
    #[state]
    fn brewing(context: &mut MachineContext, event: &MachineInput) -> Response<State> {
        use Response::*;

        match event {
            MachineInput::Tick { elapsed } => {
                let strength = context
                    .active_strength
                    .unwrap_or(context.selected_strength);
                if context.advance_timer(*elapsed) >= context.config.brew_duration(strength) {
                    context.command(HardwareCommand::PumpOff);
                    context.reset_timer();
                    context.active_strength = None;
                    Transition(State::done())
                } else {
                    Handled
                }
            }
            MachineInput::Button(ButtonEvent::Hold(Button::Power)) => {
                warn!("emergency abort while brewing");
                context.command(HardwareCommand::PumpOff);
                context.command(HardwareCommand::HeaterOff);
                context.reset_timer();
                context.active_strength = None;
                Transition(State::idle())
            }
            MachineInput::BrewRequested(_) => {
                debug!("brew request ignored: brew already in progress");
                Handled
            }
            MachineInput::Fault(kind) => Self::trip_fault(context, *kind),
            // Strength selection is locked while a brew is running.
            _ => Handled,
        }
    }

    /// 🏁 DONE STATE - cup dispensed, auto-resets after the idle timeout
    #[state]
    fn done(context: &mut MachineContext, event: &MachineInput) -> Response<State> {
        use Response::*;

        match event {
            MachineInput::Tick { elapsed } => {
                if context.advance_timer(*elapsed) >= context.config.done_timeout() {
                    context.command(HardwareCommand::HeaterOff);
                    context.reset_timer();
                    Transition(State::idle())
                } else {
                    Handled
                }
            }
            MachineInput::Button(ButtonEvent::Press(Button::StrengthSelect)) => {
                context.cycle_strength();
                Handled
            }
            MachineInput::Fault(kind) => Self::trip_fault(context, *kind),
            _ => Handled,
        }
    }

    /// 🚨 ERROR STATE - latched fault, exits on manual reset only
    #[state]
    fn error(context: &mut MachineContext, event: &MachineInput) -> Response<State> {
        use Response::*;

        match event {
            MachineInput::Button(ButtonEvent::Hold(Button::Power)) => {
                info!("manual reset from error state");
                context.last_fault = None;
                context.reset_timer();
                Transition(State::idle())
            }
            MachineInput::Fault(kind) => {
                // Newest diagnosis wins; no transition, nothing to notify.
                context.last_fault = Some(*kind);
                Handled
            }
            _ => Handled,
        }
    }

    fn on_transition(&mut self, source: &State, target: &State) {
        info!(
            "🔄 machine state transition: {:?} -> {:?}",
            Self::to_operational(source),
            Self::to_operational(target)
        );
    }

    /// Convert internal State to the operational state of the external interface.
    fn to_operational(state: &State) -> MachineState {
        match state {
            State::Idle {} => MachineState::Idle,
            State::Heating {} => MachineState::Heating,
            State::ReadyToBrew {} => MachineState::ReadyToBrew,
            State::Brewing {} => MachineState::Brewing,
            State::Done {} => MachineState::Done,
            State::Error {} => MachineState::Error,
        }
    }
}

// Transition helpers shared between states
impl CoffeeStateMachine {
    fn trip_fault(context: &mut MachineContext, kind: FaultKind) -> Response<State> {
        use Response::*;

        error!("fault: {} - forcing outputs off", kind.as_str());
        context.command(HardwareCommand::HeaterOff);
        context.command(HardwareCommand::PumpOff);
        context.reset_timer();
        context.active_strength = None;
        context.last_fault = Some(kind);
        Transition(State::error())
    }

    fn start_brew(context: &mut MachineContext, strength: BrewStrength) -> Response<State> {
        use Response::*;

        info!("☕ starting brew at {:?}", strength);
        context.selected_strength = strength;
        context.active_strength = Some(strength);
        context.reset_timer();
        context.command(HardwareCommand::PumpOn);
        Transition(State::brewing())
    }
}

/// Main interface for the state machine: drives inputs through statig and
/// collects the outputs produced by a single input, appending a
/// StateChanged marker only when the operational state actually moved.
pub struct MachineCore {
    machine: statig::prelude::StateMachine<CoffeeStateMachine>,
    context: MachineContext,
}

impl MachineCore {
    pub fn new(config: MachineConfig) -> Self {
        Self {
            machine: CoffeeStateMachine::default().state_machine(),
            context: MachineContext::new(config),
        }
    }

    /// Process an input event and return the outputs it produced.
    pub fn handle_input(&mut self, input: MachineInput) -> Vec<MachineOutput, OUTPUT_QUEUE_DEPTH> {
        self.context.outputs.clear();

        let previous = self.operational_state();
        self.machine.handle_with_context(&input, &mut self.context);
        let current = self.operational_state();

        if previous != current {
            let changed = MachineOutput::StateChanged {
                from: previous,
                to: current,
            };
            if self.context.outputs.push(changed).is_err() {
                warn!("output queue full, state change marker dropped");
            }
        }

        std::mem::take(&mut self.context.outputs)
    }

    /// Reset to Idle with all timers cleared, keeping the configuration.
    pub fn reset(&mut self) {
        self.machine = CoffeeStateMachine::default().state_machine();
        self.context.reset_runtime();
    }

    pub fn operational_state(&self) -> MachineState {
        CoffeeStateMachine::to_operational(self.machine.state())
    }

    pub fn selected_strength(&self) -> BrewStrength {
        self.context.selected_strength
    }

    pub fn active_strength(&self) -> Option<BrewStrength> {
        self.context.active_strength
    }

    pub fn last_fault(&self) -> Option<FaultKind> {
        self.context.last_fault
    }

    pub fn timer_elapsed(&self) -> Duration {
        self.context.timer
    }

    /// Completion ratio of the current timed phase, None in untimed states.
    pub fn progress(&self) -> Option<f32> {
        let target = match self.operational_state() {
            MachineState::Heating => self.context.config.heat_duration(),
            MachineState::Brewing => self.context.config.brew_duration(
                self.context
                    .active_strength
                    .unwrap_or(self.context.selected_strength),
            ),
            MachineState::Done => self.context.config.done_timeout(),
            _ => return None,
        };
        let ratio = self.context.timer.as_millis() as f32 / target.as_millis() as f32;
        Some(ratio.min(1.0))
    }
}
