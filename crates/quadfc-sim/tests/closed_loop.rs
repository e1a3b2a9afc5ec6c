//! Closed-loop flight tests
//!
//! The flight controller flies the simulated plant through the host seam:
//! hover hold, climb from the ground, lateral translation, noisy sensors
//! and plant/model mismatch.

use nalgebra::Vector3;

use quadfc_core::{FlightConfig, FlightMode, Setpoint, SharedSetpoint};
use quadfc_sim::{SensorNoise, SimConfig, SimHistory, Simulator};

fn simulator(config: SimConfig, setpoint: Setpoint) -> Simulator {
    let mut sim = Simulator::new(config, FlightConfig::default()).unwrap();
    sim.set_setpoint(setpoint);
    sim.arm().unwrap();
    sim
}

fn max_error_since(history: &SimHistory, t: f64, target: Vector3<f64>) -> f64 {
    history
        .positions_since(t)
        .map(|p| (p - target).norm())
        .fold(0.0, f64::max)
}

#[test]
fn test_hover_hold() {
    let target = Vector3::new(0.0, 0.0, 1.0);
    let mut sim = simulator(SimConfig::ideal(target), Setpoint::hold(0.0, 0.0, 1.0));

    let history = sim.run(5.0).unwrap();

    assert!(history.modes.iter().all(|m| *m == FlightMode::Armed));
    assert!(max_error_since(history, 0.0, target) < 0.05);
    assert!(history.attitudes.iter().all(|a| a.x.abs() < 0.01 && a.y.abs() < 0.01));
}

#[test]
fn test_climb_from_ground() {
    let mut sim = simulator(SimConfig::ideal(Vector3::zeros()), Setpoint::hold(0.0, 0.0, 2.0));

    let history = sim.run(15.0).unwrap();

    let peak = history.positions.iter().map(|p| p.z).fold(f64::MIN, f64::max);
    assert!(peak > 1.9, "never reached altitude: peak {peak}");
    assert!(peak < 3.0, "overshoot: peak {peak}");

    let z = sim.quad().state().position.z;
    assert!((z - 2.0).abs() < 0.15, "final altitude {z}");
    assert_eq!(sim.mode(), FlightMode::Armed);
}

#[test]
fn test_lateral_translation() {
    let start = Vector3::new(0.0, 0.0, 1.0);
    let mut sim = simulator(SimConfig::ideal(start), Setpoint::hold(1.0, -1.0, 1.0));

    sim.run(20.0).unwrap();

    let position = sim.quad().state().position;
    assert!((position - Vector3::new(1.0, -1.0, 1.0)).norm() < 0.15, "final position {position:?}");

    // Tilt stays inside the configured limit the whole way
    let max_tilt = FlightConfig::default().position.max_tilt;
    for attitude in &sim.history().attitudes {
        assert!(attitude.x.abs() < max_tilt + 0.05);
        assert!(attitude.y.abs() < max_tilt + 0.05);
    }
}

#[test]
fn test_hover_with_noisy_sensors() {
    let target = Vector3::new(0.0, 0.0, 1.0);
    let mut config = SimConfig::ideal(target);
    config.sensors = SensorNoise {
        attitude_std: 0.0005,
        gyro_std: 0.001,
        gyro_bias: Vector3::new(0.0, 0.0, 0.01),
        position_std: 0.0005,
    };
    config.seed = 7;
    let mut sim = simulator(config, Setpoint::hold(0.0, 0.0, 1.0));

    let history = sim.run(10.0).unwrap();
    assert!(max_error_since(history, 0.0, target) < 0.3);
    assert_eq!(sim.mode(), FlightMode::Armed);
}

#[test]
fn test_integral_absorbs_mass_mismatch() {
    let target = Vector3::new(0.0, 0.0, 1.0);
    let mut config = SimConfig::ideal(target);
    config.airframe.mass = 1.05;
    let mut sim = simulator(config, Setpoint::hold(0.0, 0.0, 1.0));

    sim.run(30.0).unwrap();

    let z = sim.quad().state().position.z;
    assert!((z - 1.0).abs() < 0.1, "final altitude {z}");
    assert!(sim.controller().position_controller().integrals()[0] > 0.0);
}

#[test]
fn test_setpoint_from_operator_thread() {
    let operator = SharedSetpoint::new();
    let mut sim = Simulator::new(SimConfig::ideal(Vector3::new(0.0, 0.0, 1.0)), FlightConfig::default())
        .unwrap()
        .with_setpoint_source(operator.clone());
    sim.set_setpoint(Setpoint::hold(0.0, 0.0, 1.0));
    sim.arm().unwrap();
    sim.run(1.0).unwrap();

    std::thread::spawn(move || operator.publish(Setpoint::hold(0.0, 0.0, 1.5)))
        .join()
        .unwrap();
    sim.run(15.0).unwrap();

    let z = sim.quad().state().position.z;
    assert!((z - 1.5).abs() < 0.1, "final altitude {z}");
}

#[test]
fn test_rearm_in_flight_keeps_flying() {
    let target = Vector3::new(0.0, 0.0, 1.0);
    let mut sim = simulator(SimConfig::ideal(target), Setpoint::hold(0.0, 0.0, 1.0));
    sim.run(0.5).unwrap();

    sim.arm().unwrap();
    assert_eq!(sim.mode(), FlightMode::Armed);
    assert!(sim.controller().fault().is_none());

    let history = sim.run(1.0).unwrap();
    assert!(history.rotors.iter().all(|r| !r.is_zero()));
    assert!(max_error_since(history, 0.0, target) < 0.05);
}

#[test]
fn test_disarm_drops_to_ground() {
    let mut sim = simulator(SimConfig::ideal(Vector3::new(0.0, 0.0, 1.0)), Setpoint::hold(0.0, 0.0, 1.0));
    sim.run(1.0).unwrap();

    sim.disarm().unwrap();
    let history = sim.run(2.0).unwrap();
    assert!(history.rotors.iter().rev().take(10).all(|r| r.is_zero()));

    assert_eq!(sim.mode(), FlightMode::Idle);
    assert_eq!(sim.quad().state().position.z, 0.0);
}
