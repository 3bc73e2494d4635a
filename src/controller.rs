use crate::machine::states::{MachineCore, MachineInput, MachineOutput};
use crate::safety::SafetyMonitor;
use crate::state::StatusSnapshot;
use crate::system::events::{ButtonEvent, HardwareCommand};
use crate::types::{
    BrewStrength, Button, FaultKind, MachineConfig, MachineState, COMMAND_QUEUE_DEPTH,
    OUTPUT_QUEUE_DEPTH,
};
use embassy_time::Duration;
use heapless::Deque;
use log::{error, info, warn};

/// Observer invoked with the new operational state after every transition.
pub type StateChangedCallback = Box<dyn FnMut(MachineState)>;

/// Public facade of the appliance: owns the state machine core, the safety
/// monitor and the notification callback, and queues actuator commands for
/// the I/O layer to drain. Single logical thread of control; the entry
/// points are driven by the host loop and never block.
pub struct ApplianceController {
    core: MachineCore,
    safety: SafetyMonitor,
    listener: StateChangedCallback,
    commands: Deque<HardwareCommand, COMMAND_QUEUE_DEPTH>,
}

impl ApplianceController {
    /// The listener is bound for the controller's lifetime; each instance
    /// carries its own, so nothing is process-global.
    pub fn new(
        config: MachineConfig,
        listener: impl FnMut(MachineState) + 'static,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            core: MachineCore::new(config),
            safety: SafetyMonitor::new(),
            listener: Box::new(listener),
            commands: Deque::new(),
        })
    }

    /// Establish the starting state: Idle, timers cleared, fault history
    /// dropped, actuators commanded to the safe baseline. Notifies only if
    /// the operational state actually moved.
    pub fn initialize(&mut self) {
        info!("initializing appliance controller");
        let previous = self.core.operational_state();
        self.core.reset();
        self.safety.reset();
        self.queue_command(HardwareCommand::HeaterOff);
        self.queue_command(HardwareCommand::PumpOff);
        if previous != MachineState::Idle {
            (self.listener)(MachineState::Idle);
        }
    }

    /// Advance time by the amount the host measured since the last call.
    /// Any number of smaller ticks summing to the same total is equivalent.
    pub fn tick(&mut self, elapsed: Duration) {
        self.safety.advance(elapsed);
        let outputs = self.core.handle_input(MachineInput::Tick { elapsed });
        self.dispatch(outputs);
    }

    /// Brew with the given strength; accepted only when ready, silently
    /// ignored everywhere else.
    pub fn request_brew(&mut self, strength: BrewStrength) {
        let outputs = self.core.handle_input(MachineInput::BrewRequested(strength));
        self.dispatch(outputs);
    }

    pub fn on_button_press(&mut self, button: Button) {
        let outputs = self
            .core
            .handle_input(MachineInput::Button(ButtonEvent::Press(button)));
        self.dispatch(outputs);
    }

    pub fn on_button_hold(&mut self, button: Button) {
        let outputs = self
            .core
            .handle_input(MachineInput::Button(ButtonEvent::Hold(button)));
        self.dispatch(outputs);
    }

    /// Fault entry point for the I/O layer; forces Error from any state.
    pub fn signal_fault(&mut self, kind: FaultKind) {
        if self.safety.record_fault(kind) {
            error!("fault signaled by I/O layer: {}", kind.as_str());
        }
        let outputs = self.core.handle_input(MachineInput::Fault(kind));
        self.dispatch(outputs);
    }

    pub fn state(&self) -> MachineState {
        self.core.operational_state()
    }

    pub fn selected_strength(&self) -> BrewStrength {
        self.core.selected_strength()
    }

    /// Drain the actuator commands queued since the last call, oldest first.
    pub fn take_commands(&mut self) -> heapless::Vec<HardwareCommand, COMMAND_QUEUE_DEPTH> {
        let mut drained = heapless::Vec::new();
        while let Some(command) = self.commands.pop_front() {
            let _ = drained.push(command);
        }
        drained
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.core.operational_state(),
            selected_strength: self.core.selected_strength(),
            active_strength: self.core.active_strength(),
            progress: self.core.progress(),
            fault: self.core.last_fault(),
        }
    }

    pub fn health_warnings(&self) -> Vec<String> {
        self.safety.check_health(self.core.operational_state())
    }

    fn dispatch(&mut self, outputs: heapless::Vec<MachineOutput, OUTPUT_QUEUE_DEPTH>) {
        for output in outputs {
            match output {
                MachineOutput::Command(command) => self.queue_command(command),
                MachineOutput::StateChanged { from, to } => {
                    if from == MachineState::Error && to == MachineState::Idle {
                        self.safety.clear();
                    }
                    (self.listener)(to);
                }
            }
        }
    }

    fn queue_command(&mut self, command: HardwareCommand) {
        if let Err(rejected) = self.commands.push_back(command) {
            warn!("command queue full, dropping oldest entry");
            self.commands.pop_front();
            let _ = self.commands.push_back(rejected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn test_config() -> MachineConfig {
        MachineConfig {
            heat_duration_ms: 1_000,
            brew_mild_ms: 500,
            brew_medium_ms: 800,
            brew_strong_ms: 1_200,
            done_timeout_ms: 400,
        }
    }

    fn recording_controller() -> (ApplianceController, Rc<RefCell<Vec<MachineState>>>) {
        let notifications = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&notifications);
        let controller = ApplianceController::new(test_config(), move |state| {
            sink.borrow_mut().push(state)
        })
        .unwrap();
        (controller, notifications)
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = MachineConfig {
            heat_duration_ms: 0,
            ..test_config()
        };
        assert!(ApplianceController::new(config, |_| {}).is_err());
    }

    #[test]
    fn test_initialize_establishes_idle_baseline() {
        let (mut controller, notifications) = recording_controller();
        controller.initialize();
        assert_eq!(controller.state(), MachineState::Idle);
        // Fresh controller was already Idle, so no notification
        assert!(notifications.borrow().is_empty());
        let commands = controller.take_commands();
        assert_eq!(commands.as_slice(), &[
            HardwareCommand::HeaterOff,
            HardwareCommand::PumpOff,
        ]);
    }

    #[test]
    fn test_full_brew_scenario() {
        let (mut controller, notifications) = recording_controller();
        controller.initialize();

        controller.on_button_press(Button::Power);
        controller.tick(Duration::from_millis(1_000));
        controller.request_brew(BrewStrength::Strong);
        controller.tick(Duration::from_millis(1_200));

        assert_eq!(
            notifications.borrow().as_slice(),
            &[
                MachineState::Heating,
                MachineState::ReadyToBrew,
                MachineState::Brewing,
                MachineState::Done,
            ]
        );
    }

    #[test]
    fn test_callback_observes_post_transition_state() {
        let (mut controller, notifications) = recording_controller();
        controller.on_button_press(Button::Power);
        assert_eq!(notifications.borrow().last(), Some(&controller.state()));
        controller.tick(Duration::from_millis(1_000));
        assert_eq!(notifications.borrow().last(), Some(&controller.state()));
    }

    #[test]
    fn test_rejected_brew_never_notifies() {
        let (mut controller, notifications) = recording_controller();
        for strength in [BrewStrength::Mild, BrewStrength::Medium, BrewStrength::Strong] {
            controller.request_brew(strength);
        }
        assert_eq!(controller.state(), MachineState::Idle);
        assert!(notifications.borrow().is_empty());
        assert!(controller.take_commands().is_empty());
    }

    #[test]
    fn test_commands_drain_in_order() {
        let (mut controller, _) = recording_controller();
        controller.on_button_press(Button::Power);
        assert_eq!(
            controller.take_commands().as_slice(),
            &[HardwareCommand::HeaterOn]
        );
        // Draining is destructive
        assert!(controller.take_commands().is_empty());

        controller.tick(Duration::from_millis(1_000));
        controller.request_brew(BrewStrength::Mild);
        controller.on_button_hold(Button::Power);
        assert_eq!(controller.take_commands().as_slice(), &[
            HardwareCommand::PumpOn,
            HardwareCommand::PumpOff,
            HardwareCommand::HeaterOff,
        ]);
    }

    #[test]
    fn test_initialize_mid_brew_resets_and_notifies_once() {
        let (mut controller, notifications) = recording_controller();
        controller.on_button_press(Button::Power);
        controller.tick(Duration::from_millis(1_000));
        controller.request_brew(BrewStrength::Medium);
        notifications.borrow_mut().clear();
        controller.take_commands();

        controller.initialize();
        assert_eq!(controller.state(), MachineState::Idle);
        assert_eq!(notifications.borrow().as_slice(), &[MachineState::Idle]);
        let commands = controller.take_commands();
        assert_eq!(commands.as_slice(), &[
            HardwareCommand::HeaterOff,
            HardwareCommand::PumpOff,
        ]);
        assert_eq!(controller.snapshot().progress, None);
    }

    #[test]
    fn test_fault_notifies_error_and_manual_reset_recovers() {
        let (mut controller, notifications) = recording_controller();
        controller.on_button_press(Button::Power);
        controller.tick(Duration::from_millis(400));

        controller.signal_fault(FaultKind::OverTemperature);
        assert_eq!(controller.state(), MachineState::Error);
        assert_eq!(
            notifications.borrow().last(),
            Some(&MachineState::Error)
        );
        assert!(!controller.health_warnings().is_empty());

        // Dwell time keeps accumulating while latched
        controller.tick(Duration::from_secs(4));
        assert_eq!(controller.state(), MachineState::Error);
        assert!(controller.health_warnings()[0].contains("4s"));

        controller.on_button_hold(Button::Power);
        assert_eq!(controller.state(), MachineState::Idle);
        assert_eq!(controller.snapshot().fault, None);
        assert!(controller.health_warnings().is_empty());
    }

    #[test]
    fn test_repeated_fault_notifies_once() {
        let (mut controller, notifications) = recording_controller();
        controller.signal_fault(FaultKind::SensorFailure);
        controller.signal_fault(FaultKind::SensorFailure);
        controller.signal_fault(FaultKind::PumpFailure);
        let errors = notifications
            .borrow()
            .iter()
            .filter(|state| **state == MachineState::Error)
            .count();
        assert_eq!(errors, 1);
        assert_eq!(controller.snapshot().fault, Some(FaultKind::PumpFailure));
    }

    #[test]
    fn test_snapshot_reflects_brew_in_progress() {
        let (mut controller, _) = recording_controller();
        controller.on_button_press(Button::Power);
        controller.tick(Duration::from_millis(1_000));
        controller.request_brew(BrewStrength::Strong);
        controller.tick(Duration::from_millis(600));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, MachineState::Brewing);
        assert_eq!(snapshot.active_strength, Some(BrewStrength::Strong));
        assert!((snapshot.progress.unwrap() - 0.5).abs() < 1e-6);
        assert!(snapshot.to_string().contains("Brewing"));
    }
}
