//! Attitude controller (inner loop)
//!
//! Converts the outer loop's roll/pitch demand and the operator's yaw-rate
//! demand into body torques:
//!
//! τ_roll  = PID(φ_des - φ)
//! τ_pitch = PID(θ_des - θ)
//! τ_yaw   = PID(r_des - r)
//!
//! Collective thrust is passed through unchanged.

use nalgebra::Vector3;

use crate::config::AttitudeConfig;
use crate::error::{check_dt, FlightError};
use crate::types::{AttitudeTarget, ControlCommand, StateEstimate};

use super::pid::Pid;

/// Attitude controller
#[derive(Debug, Clone)]
pub struct AttitudeController {
    roll: Pid,
    pitch: Pid,
    yaw_rate: Pid,
    max_torque: Option<Vector3<f64>>,
}

impl AttitudeController {
    pub fn new(config: &AttitudeConfig) -> Self {
        Self {
            roll: Pid::new(config.roll),
            pitch: Pid::new(config.pitch),
            yaw_rate: Pid::new(config.yaw_rate),
            max_torque: config.max_torque,
        }
    }

    /// Compute torques for one inner-loop step
    pub fn inner_step(
        &mut self,
        estimate: &StateEstimate,
        desired_roll: f64,
        desired_pitch: f64,
        target_yaw_rate: f64,
        thrust: f64,
        dt: f64,
    ) -> Result<ControlCommand, FlightError> {
        check_dt(dt)?;

        let mut torque = Vector3::new(
            self.roll.update(desired_roll - estimate.roll(), dt)?,
            self.pitch.update(desired_pitch - estimate.pitch(), dt)?,
            self.yaw_rate.update(target_yaw_rate - estimate.angular_rate.z, dt)?,
        );

        if let Some(max) = self.max_torque {
            torque = torque.zip_map(&max, |t, m| t.clamp(-m, m));
        }

        Ok(ControlCommand::new(thrust, torque.x, torque.y, torque.z))
    }

    /// Convenience wrapper taking the outer-loop output directly
    pub fn track(
        &mut self,
        estimate: &StateEstimate,
        target: &AttitudeTarget,
        target_yaw_rate: f64,
        dt: f64,
    ) -> Result<ControlCommand, FlightError> {
        self.inner_step(
            estimate,
            target.desired_roll,
            target.desired_pitch,
            target_yaw_rate,
            target.desired_thrust,
            dt,
        )
    }

    /// Integral accumulators (roll, pitch, yaw rate)
    pub fn integrals(&self) -> [f64; 3] {
        [self.roll.integral(), self.pitch.integral(), self.yaw_rate.integral()]
    }

    pub fn reset(&mut self) {
        self.roll.reset();
        self.pitch.reset();
        self.yaw_rate.reset();
    }
}
