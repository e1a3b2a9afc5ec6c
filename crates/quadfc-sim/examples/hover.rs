//! Hover Demonstration
//!
//! Flies the simulated quad through a short mission:
//! - Take off from the ground to 1.5 m
//! - Translate 2 m forward and 1 m left
//! - Descend to 0.5 m
//!
//! An optional argument names a JSON flight configuration file.

use nalgebra::Vector3;

use quadfc_core::{FlightConfig, Setpoint};
use quadfc_sim::{SimConfig, SimError, Simulator};

fn main() -> Result<(), SimError> {
    println!("=== quadfc hover demonstration ===\n");

    let flight = match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading flight config from {path}");
            FlightConfig::load(path)?
        }
        None => FlightConfig::default(),
    };
    let sim_config = SimConfig::default();

    println!(
        "Hover thrust {:.2} N, hover rotor velocity {:.1} rad/s",
        flight.airframe.hover_thrust(),
        flight.airframe.hover_rotor_velocity()
    );
    println!(
        "Control period {:.4} s ({} physics substeps)\n",
        sim_config.control_period(),
        sim_config.substeps
    );

    let mut sim = Simulator::new(sim_config, flight)?;

    let mission = [
        ("takeoff", Setpoint::hold(0.0, 0.0, 1.5), 8.0),
        ("translate", Setpoint::hold(2.0, 1.0, 1.5), 12.0),
        ("descend", Setpoint::hold(2.0, 1.0, 0.5), 8.0),
    ];

    sim.set_setpoint(mission[0].1);
    sim.arm()?;

    println!("{:>10} {:>8} {:>24} {:>10}", "phase", "t [s]", "position [m]", "error [m]");
    for (name, setpoint, duration) in mission {
        sim.set_setpoint(setpoint);
        sim.run(duration)?;

        let state = sim.quad().state();
        let target = Vector3::new(setpoint.target_x, setpoint.target_y, setpoint.target_altitude);
        println!(
            "{:>10} {:>8.2} {:>24} {:>10.4}",
            name,
            sim.quad().time(),
            format!("({:.3}, {:.3}, {:.3})", state.position.x, state.position.y, state.position.z),
            (state.position - target).norm()
        );
    }

    let history = sim.history();
    let max_tilt = history
        .attitudes
        .iter()
        .map(|a| a.x.abs().max(a.y.abs()))
        .fold(0.0, f64::max);
    println!("\nRecorded {} ticks over {:.2} s", history.len(), history.duration());
    println!("Max tilt: {:.2} deg", max_tilt.to_degrees());
    println!("Final mode: {:?}", sim.mode());

    sim.disarm()?;
    Ok(())
}
