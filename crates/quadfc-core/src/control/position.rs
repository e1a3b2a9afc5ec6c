//! Position controller (outer loop)
//!
//! Three independent PID loops turn altitude and horizontal position error
//! into an attitude and collective thrust demand:
//!
//! - altitude error → thrust correction, on top of the hover thrust trim
//! - heading-frame x error → pitch (positive pitch accelerates toward +x)
//! - heading-frame y error → roll (positive roll accelerates toward -y)
//!
//! Horizontal errors are rotated by the estimated yaw so that the x loop
//! always drives the nose axis.

use nalgebra::{Rotation2, Vector2};

use crate::config::PositionConfig;
use crate::error::{check_dt, FlightError};
use crate::types::{AttitudeTarget, Setpoint, StateEstimate};

use super::pid::Pid;

/// Altitude/position controller
#[derive(Debug, Clone)]
pub struct PositionController {
    altitude: Pid,
    x: Pid,
    y: Pid,
    max_tilt: f64,
    max_thrust: f64,
    hover_thrust: f64,
}

impl PositionController {
    pub fn new(config: &PositionConfig, hover_thrust: f64) -> Self {
        Self {
            altitude: Pid::new(config.altitude),
            x: Pid::new(config.x),
            y: Pid::new(config.y),
            max_tilt: config.max_tilt,
            max_thrust: config.max_thrust,
            hover_thrust,
        }
    }

    /// Compute the attitude/thrust demand for one outer-loop step
    ///
    /// `target_roll`/`target_pitch` of the setpoint are added as feed-forward
    /// before the tilt limit is applied.
    pub fn outer_step(
        &mut self,
        estimate: &StateEstimate,
        setpoint: &Setpoint,
        dt: f64,
    ) -> Result<AttitudeTarget, FlightError> {
        check_dt(dt)?;

        let altitude_error = setpoint.target_altitude - estimate.altitude();

        let world_error = Vector2::new(
            setpoint.target_x - estimate.position.x,
            setpoint.target_y - estimate.position.y,
        );
        let heading_error = Rotation2::new(-estimate.yaw()) * world_error;

        let thrust = self.hover_thrust + self.altitude.update(altitude_error, dt)?;
        let pitch = setpoint.target_pitch + self.x.update(heading_error.x, dt)?;
        let roll = setpoint.target_roll - self.y.update(heading_error.y, dt)?;

        Ok(AttitudeTarget {
            desired_roll: roll.clamp(-self.max_tilt, self.max_tilt),
            desired_pitch: pitch.clamp(-self.max_tilt, self.max_tilt),
            desired_thrust: thrust.clamp(0.0, self.max_thrust),
        })
    }

    /// Integral accumulators (altitude, x, y)
    pub fn integrals(&self) -> [f64; 3] {
        [self.altitude.integral(), self.x.integral(), self.y.integral()]
    }

    pub fn hover_thrust(&self) -> f64 {
        self.hover_thrust
    }

    /// Reset integral accumulators and derivative history
    pub fn reset(&mut self) {
        self.altitude.reset();
        self.x.reset();
        self.y.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PidGains;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::FRAC_PI_2;

    const HOVER: f64 = 9.81;

    fn estimate_at(x: f64, y: f64, z: f64) -> StateEstimate {
        StateEstimate {
            position: Vector3::new(x, y, z),
            ..StateEstimate::default()
        }
    }

    fn proportional_only() -> PositionConfig {
        PositionConfig {
            altitude: PidGains::new(2.0, 0.0, 0.0, 1.0),
            x: PidGains::new(0.1, 0.0, 0.0, 1.0),
            y: PidGains::new(0.1, 0.0, 0.0, 1.0),
            ..PositionConfig::default()
        }
    }

    #[test]
    fn test_at_setpoint_outputs_trim() {
        let mut controller = PositionController::new(&PositionConfig::default(), HOVER);
        let estimate = estimate_at(1.0, -2.0, 3.0);
        let setpoint = Setpoint::hold(1.0, -2.0, 3.0);

        for _ in 0..50 {
            let out = controller.outer_step(&estimate, &setpoint, 0.01).unwrap();
            assert_eq!(out.desired_thrust, HOVER);
            assert_eq!(out.desired_roll, 0.0);
            assert_eq!(out.desired_pitch, 0.0);
        }
    }

    #[test]
    fn test_altitude_error_increases_thrust() {
        let mut controller = PositionController::new(&proportional_only(), HOVER);
        let out = controller
            .outer_step(&estimate_at(0.0, 0.0, 1.0), &Setpoint::hold(0.0, 0.0, 2.0), 0.01)
            .unwrap();
        assert_relative_eq!(out.desired_thrust, HOVER + 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_position_error_tilts_toward_target() {
        let mut controller = PositionController::new(&proportional_only(), HOVER);

        // Target ahead: pitch forward
        let out = controller
            .outer_step(&estimate_at(0.0, 0.0, 1.0), &Setpoint::hold(1.0, 0.0, 1.0), 0.01)
            .unwrap();
        assert_relative_eq!(out.desired_pitch, 0.1, epsilon = 1e-12);
        assert_relative_eq!(out.desired_roll, 0.0, epsilon = 1e-12);

        // Target to the left: roll negative
        controller.reset();
        let out = controller
            .outer_step(&estimate_at(0.0, 0.0, 1.0), &Setpoint::hold(0.0, 1.0, 1.0), 0.01)
            .unwrap();
        assert_relative_eq!(out.desired_roll, -0.1, epsilon = 1e-12);
        assert_relative_eq!(out.desired_pitch, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_error_rotated_into_heading_frame() {
        let mut controller = PositionController::new(&proportional_only(), HOVER);

        // Facing +y: a target at +y is straight ahead
        let mut estimate = estimate_at(0.0, 0.0, 1.0);
        estimate.attitude.z = FRAC_PI_2;

        let out = controller
            .outer_step(&estimate, &Setpoint::hold(0.0, 1.0, 1.0), 0.01)
            .unwrap();
        assert_relative_eq!(out.desired_pitch, 0.1, epsilon = 1e-12);
        assert_relative_eq!(out.desired_roll, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_output_limits() {
        let config = PositionConfig::default();
        let mut controller = PositionController::new(&config, HOVER);

        let out = controller
            .outer_step(&estimate_at(0.0, 0.0, 0.0), &Setpoint::hold(500.0, -500.0, 500.0), 0.01)
            .unwrap();
        assert_eq!(out.desired_thrust, config.max_thrust);
        assert_eq!(out.desired_pitch, config.max_tilt);
        assert_eq!(out.desired_roll, config.max_tilt);

        controller.reset();
        let out = controller
            .outer_step(&estimate_at(0.0, 0.0, 500.0), &Setpoint::hold(-500.0, 500.0, 0.0), 0.01)
            .unwrap();
        assert_eq!(out.desired_thrust, 0.0);
        assert_eq!(out.desired_pitch, -config.max_tilt);
        assert_eq!(out.desired_roll, -config.max_tilt);
    }

    #[test]
    fn test_feed_forward_attitude() {
        let mut controller = PositionController::new(&PositionConfig::default(), HOVER);
        let setpoint = Setpoint {
            target_roll: 0.05,
            target_pitch: -0.1,
            ..Setpoint::hold(0.0, 0.0, 1.0)
        };

        let out = controller.outer_step(&estimate_at(0.0, 0.0, 1.0), &setpoint, 0.01).unwrap();
        assert_relative_eq!(out.desired_roll, 0.05, epsilon = 1e-12);
        assert_relative_eq!(out.desired_pitch, -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_integral_windup_bounded() {
        let config = PositionConfig::default();
        let mut controller = PositionController::new(&config, HOVER);
        let estimate = estimate_at(0.0, 0.0, 0.0);
        let setpoint = Setpoint::hold(50.0, -50.0, 50.0);

        for _ in 0..10_000 {
            controller.outer_step(&estimate, &setpoint, 0.01).unwrap();
            let [alt, x, y] = controller.integrals();
            assert!(alt.abs() <= config.altitude.integral_limit);
            assert!(x.abs() <= config.x.integral_limit);
            assert!(y.abs() <= config.y.integral_limit);
        }
    }

    #[test]
    fn test_negative_dt_rejected() {
        let mut controller = PositionController::new(&PositionConfig::default(), HOVER);
        let result = controller.outer_step(&estimate_at(0.0, 0.0, 0.0), &Setpoint::default(), -0.01);
        assert!(matches!(result, Err(FlightError::InvalidInput(_))));
    }
}
