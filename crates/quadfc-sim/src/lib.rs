//! # quadfc sim
//!
//! Simulated quad-X host for the quadfc flight-control core.
//!
//! The plant is a rigid body driven by four rotor velocities. Its sensors
//! are exposed through [`quadfc_core::FlightHost`], so the controller runs
//! against it exactly as it would against flight hardware.
//!
//! ## Modules
//!
//! - [`dynamics`]: Rigid-body quad-X model
//! - [`sensors`]: Inertial unit, gyroscope and GPS models
//! - [`config`]: Plant, sensor and initial state configuration
//! - [`simulator`]: Host implementation and closed-loop runner

pub mod config;
pub mod dynamics;
pub mod sensors;
pub mod simulator;

use quadfc_core::FlightError;
use thiserror::Error;

pub use config::{InitialStateConfig, SensorNoise, SimConfig};
pub use dynamics::{QuadDynamics, QuadState};
pub use sensors::SensorSuite;
pub use simulator::{SimHistory, SimulatedQuad, Simulator};

/// Simulation errors
#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation config error: {0}")]
    Config(String),

    #[error("sensor noise error: {0}")]
    Noise(#[from] rand_distr::NormalError),

    #[error(transparent)]
    Flight(#[from] FlightError),
}
