//! Flight-control data types
//!
//! Values exchanged between the pipeline stages. Every tick consumes one
//! [`SensorSample`] and produces one [`RotorCommand`]:
//!
//! ```text
//! SensorSample ─► StateEstimate ─► AttitudeTarget ─► ControlCommand ─► RotorCommand
//!   (host)         (estimator)      (outer loop)      (inner loop)        (mixer)
//! ```
//!
//! # Frames
//!
//! World frame is x forward, y left, z up; `position.z` is altitude.
//! Attitude is (roll, pitch, yaw) in radians, Z-Y-X Euler convention.

use std::ops::Index;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::FlightError;

/// One set of raw sensor readings, produced once per tick by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Roll, pitch, yaw [rad] (inertial unit)
    pub attitude: Vector3<f64>,
    /// Body angular rate about x, y, z [rad/s] (gyroscope)
    pub angular_rate: Vector3<f64>,
    /// Position x, y, z [m] (GPS)
    pub position: Vector3<f64>,
    /// Host time [s]
    pub timestamp: f64,
}

impl SensorSample {
    pub fn new(
        attitude: Vector3<f64>,
        angular_rate: Vector3<f64>,
        position: Vector3<f64>,
        timestamp: f64,
    ) -> Self {
        Self { attitude, angular_rate, position, timestamp }
    }

    /// Assemble a sample from raw device triples
    ///
    /// * `imu` - (roll, pitch, yaw) from the inertial unit
    /// * `gyro` - angular velocity about x, y, z from the gyroscope
    /// * `gps` - x, y, z from the GPS
    /// * `time` - host simulation time
    pub fn from_devices(imu: [f64; 3], gyro: [f64; 3], gps: [f64; 3], time: f64) -> Self {
        Self::new(
            Vector3::from(imu),
            Vector3::from(gyro),
            Vector3::from(gps),
            time,
        )
    }

    /// A level, motionless sample at `position`
    pub fn level(position: Vector3<f64>, timestamp: f64) -> Self {
        Self::new(Vector3::zeros(), Vector3::zeros(), position, timestamp)
    }

    pub fn roll(&self) -> f64 {
        self.attitude.x
    }

    pub fn pitch(&self) -> f64 {
        self.attitude.y
    }

    pub fn yaw(&self) -> f64 {
        self.attitude.z
    }

    /// Fails with `InvalidInput` if any field is NaN or infinite
    pub fn validate(&self) -> Result<(), FlightError> {
        let finite = self.attitude.iter().all(|v| v.is_finite())
            && self.angular_rate.iter().all(|v| v.is_finite())
            && self.position.iter().all(|v| v.is_finite())
            && self.timestamp.is_finite();

        if finite {
            Ok(())
        } else {
            Err(FlightError::invalid(format!(
                "non-finite sensor sample at t={}",
                self.timestamp
            )))
        }
    }
}

/// Filtered vehicle state, recomputed every tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StateEstimate {
    /// Roll, pitch, yaw [rad]
    pub attitude: Vector3<f64>,
    /// Body angular rate [rad/s]
    pub angular_rate: Vector3<f64>,
    /// Position [m]
    pub position: Vector3<f64>,
    /// Climb rate [m/s], positive up
    pub vertical_velocity: f64,
}

impl StateEstimate {
    pub fn roll(&self) -> f64 {
        self.attitude.x
    }

    pub fn pitch(&self) -> f64 {
        self.attitude.y
    }

    pub fn yaw(&self) -> f64 {
        self.attitude.z
    }

    pub fn altitude(&self) -> f64 {
        self.position.z
    }
}

/// Operator/planner target, read-only to the control core
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Setpoint {
    /// Feed-forward roll [rad], added to the outer-loop roll demand
    pub target_roll: f64,
    /// Feed-forward pitch [rad], added to the outer-loop pitch demand
    pub target_pitch: f64,
    /// Yaw rate [rad/s]
    pub target_yaw_rate: f64,
    /// Altitude [m]
    pub target_altitude: f64,
    /// World x [m]
    pub target_x: f64,
    /// World y [m]
    pub target_y: f64,
}

impl Setpoint {
    /// Hold position at (x, y, altitude) with zero yaw rate
    pub fn hold(x: f64, y: f64, altitude: f64) -> Self {
        Self {
            target_x: x,
            target_y: y,
            target_altitude: altitude,
            ..Self::default()
        }
    }

    /// Hold the position reported by `estimate`
    pub fn hold_estimate(estimate: &StateEstimate) -> Self {
        Self::hold(estimate.position.x, estimate.position.y, estimate.position.z)
    }
}

/// Outer-loop output: attitude and collective thrust demand
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttitudeTarget {
    /// Desired roll [rad], within ±max_tilt
    pub desired_roll: f64,
    /// Desired pitch [rad], within ±max_tilt
    pub desired_pitch: f64,
    /// Desired collective thrust [N], within [0, max_thrust]
    pub desired_thrust: f64,
}

/// Collective thrust and body torques, consumed only by the mixer
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlCommand {
    /// Collective thrust [N]
    pub thrust: f64,
    /// Torque about body x [N·m]
    pub torque_roll: f64,
    /// Torque about body y [N·m]
    pub torque_pitch: f64,
    /// Torque about body z [N·m]
    pub torque_yaw: f64,
}

impl ControlCommand {
    pub fn new(thrust: f64, torque_roll: f64, torque_pitch: f64, torque_yaw: f64) -> Self {
        Self { thrust, torque_roll, torque_pitch, torque_yaw }
    }

    pub fn torque(&self) -> Vector3<f64> {
        Vector3::new(self.torque_roll, self.torque_pitch, self.torque_yaw)
    }
}

/// Rotor position on the quad-X airframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotor {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Rotor {
    /// Actuation order
    pub const ALL: [Rotor; 4] = [
        Rotor::FrontLeft,
        Rotor::FrontRight,
        Rotor::RearLeft,
        Rotor::RearRight,
    ];

    pub fn index(self) -> usize {
        match self {
            Rotor::FrontLeft => 0,
            Rotor::FrontRight => 1,
            Rotor::RearLeft => 2,
            Rotor::RearRight => 3,
        }
    }

    /// +1 for clockwise rotors (FL, RR), -1 for counter-clockwise (FR, RL)
    pub fn spin(self) -> f64 {
        match self {
            Rotor::FrontLeft | Rotor::RearRight => 1.0,
            Rotor::FrontRight | Rotor::RearLeft => -1.0,
        }
    }

    /// Unit offset from the centre of mass in the body xy-plane (±1, ±1)
    pub fn offset(self) -> (f64, f64) {
        match self {
            Rotor::FrontLeft => (1.0, 1.0),
            Rotor::FrontRight => (1.0, -1.0),
            Rotor::RearLeft => (-1.0, 1.0),
            Rotor::RearRight => (-1.0, -1.0),
        }
    }
}

/// Rotor velocity commands [rad/s], ordered FL, FR, RL, RR
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotorCommand {
    velocities: [f64; 4],
}

impl RotorCommand {
    /// All rotors stopped; emitted whenever the controller is not armed
    pub fn zero() -> Self {
        Self { velocities: [0.0; 4] }
    }

    /// Build a command, clamping every rotor independently to [0, max_velocity]
    pub fn clamped(velocities: [f64; 4], max_velocity: f64) -> Self {
        Self {
            velocities: velocities.map(|v| v.clamp(0.0, max_velocity)),
        }
    }

    pub fn velocities(&self) -> [f64; 4] {
        self.velocities
    }

    pub fn is_zero(&self) -> bool {
        self.velocities.iter().all(|&v| v == 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rotor, f64)> + '_ {
        Rotor::ALL.iter().map(move |&r| (r, self.velocities[r.index()]))
    }
}

impl Index<Rotor> for RotorCommand {
    type Output = f64;

    fn index(&self, rotor: Rotor) -> &f64 {
        &self.velocities[rotor.index()]
    }
}
