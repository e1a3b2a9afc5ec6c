//! # quadfc core
//!
//! Flight-control core for a quad-X rotorcraft.
//!
//! Each tick one sensor sample flows through the pipeline and one rotor
//! command comes out:
//!
//! ```text
//! sensors ─► estimator ─► position (outer) ─► attitude (inner) ─► mixer ─► rotors
//! ```
//!
//! The core owns no device handles and reads no global clock: samples and
//! commands are plain values, and every stage takes an explicit `dt`.
//!
//! ## Modules
//!
//! - [`types`]: Sensor samples, state estimates, setpoints and commands
//! - [`config`]: Gains, limits and loop timing
//! - [`estimation`]: State estimator
//! - [`control`]: PID, position and attitude controllers, quad-X mixer
//! - [`driver`]: Arming state machine and tick sequencing
//! - [`host`]: Host and setpoint seams, fixed-timestep loop

pub mod types;
pub mod error;
pub mod config;
pub mod estimation;
pub mod control;
pub mod driver;
pub mod host;

pub use config::FlightConfig;
pub use driver::{FlightController, FlightMode, Telemetry};
pub use error::FlightError;
pub use host::{ControlLoop, FlightHost, SetpointSource, SharedSetpoint};
pub use types::{
    AttitudeTarget, ControlCommand, Rotor, RotorCommand, SensorSample, Setpoint, StateEstimate,
};
