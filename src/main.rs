use crema_rs::controller::ApplianceController;
use crema_rs::types::{BrewStrength, Button, FaultKind, MachineConfig, MachineState};
use embassy_time::Duration;
use log::{info, warn};

// Simulated host loop: 250ms poll period, same as a slow firmware timer.
const TICK_MS: u64 = 250;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting coffee appliance controller demo");

    let config = MachineConfig::default();
    let mut controller = ApplianceController::new(config, |state| {
        println!("-> state changed: {:?}", state);
    })?;
    controller.initialize();
    execute_commands(&mut controller);

    // Morning routine: power on, wait for temperature, brew a strong cup.
    controller.on_button_press(Button::Power);
    execute_commands(&mut controller);
    run_until(&mut controller, MachineState::ReadyToBrew);

    controller.on_button_press(Button::StrengthSelect); // Medium -> Strong
    controller.request_brew(BrewStrength::Strong);
    execute_commands(&mut controller);
    run_until(&mut controller, MachineState::Done);
    run_until(&mut controller, MachineState::Idle);

    // Fault path: a sensor failure trips the machine mid-heat, a held power
    // press acknowledges it.
    controller.on_button_press(Button::Power);
    controller.tick(Duration::from_secs(5));
    controller.signal_fault(FaultKind::SensorFailure);
    execute_commands(&mut controller);
    for warning in controller.health_warnings() {
        println!("   health: {}", warning);
    }
    controller.on_button_hold(Button::Power);

    println!("final snapshot: {}", controller.snapshot());
    Ok(())
}

fn run_until(controller: &mut ApplianceController, target: MachineState) {
    // Bounded so a misconfigured demo cannot spin forever
    for _ in 0..2_000 {
        controller.tick(Duration::from_millis(TICK_MS));
        execute_commands(controller);
        if controller.state() == target {
            return;
        }
    }
    warn!("gave up waiting for {:?}", target);
}

fn execute_commands(controller: &mut ApplianceController) {
    // Stand-in for the I/O layer: print instead of driving relays.
    for command in controller.take_commands() {
        println!("   io: {}", command.as_str());
    }
}
