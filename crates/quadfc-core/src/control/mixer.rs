//! Quad-X mixer
//!
//! Maps collective thrust and body torques onto four rotor velocities:
//!
//! ```text
//!          front
//!    FL (cw)    FR (ccw)
//!         \    /
//!          \  /          ω_FL = T + r - p + y
//!           ><           ω_FR = T - r - p - y
//!          /  \          ω_RL = T + r + p - y
//!         /    \         ω_RR = T - r + p + y
//!    RL (ccw)   RR (cw)
//! ```
//!
//! where T, r, p, y are the thrust, roll, pitch and yaw terms in rad/s.
//! Each rotor is clamped to [0, max_rotor_velocity] on its own; saturation
//! of one rotor is not redistributed to the others, so commanded torque
//! ratios are not preserved once any rotor saturates.

use serde::{Deserialize, Serialize};

use crate::config::AirframeConfig;
use crate::error::FlightError;
use crate::types::{ControlCommand, Rotor, RotorCommand};

const TERM_LIMIT: f64 = f64::MAX / 8.0;

/// Linear mixing gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixerGains {
    /// Rotor velocity per newton of collective thrust [rad/s/N]
    pub thrust: f64,
    /// Rotor velocity per N·m of roll torque [rad/s/(N·m)]
    pub roll: f64,
    /// Rotor velocity per N·m of pitch torque [rad/s/(N·m)]
    pub pitch: f64,
    /// Rotor velocity per N·m of yaw torque [rad/s/(N·m)]
    pub yaw: f64,
}

impl MixerGains {
    /// Linearise f = k_f·ω² and τ_z = k_m·ω² about hover
    ///
    /// Hover thrust maps exactly onto the hover rotor velocity. A small
    /// velocity change δω on a rotor changes its thrust by 2·k_f·ω_h·δω;
    /// four rotors acting through moment arm d give the torque gains.
    pub fn from_airframe(airframe: &AirframeConfig) -> Self {
        let omega_hover = airframe.hover_rotor_velocity();
        let d = airframe.moment_arm();
        let lateral = 1.0 / (8.0 * d * airframe.thrust_coefficient * omega_hover);

        Self {
            thrust: omega_hover / airframe.hover_thrust(),
            roll: lateral,
            pitch: lateral,
            yaw: 1.0 / (8.0 * airframe.torque_coefficient * omega_hover),
        }
    }
}

/// Quad-X mixer
#[derive(Debug, Clone)]
pub struct Mixer {
    gains: MixerGains,
    max_rotor_velocity: f64,
}

impl Mixer {
    pub fn new(gains: MixerGains, max_rotor_velocity: f64) -> Self {
        Self { gains, max_rotor_velocity }
    }

    pub fn from_airframe(airframe: &AirframeConfig) -> Self {
        Self::new(MixerGains::from_airframe(airframe), airframe.max_rotor_velocity)
    }

    /// Mix a control command into clamped rotor velocities
    pub fn mix(&self, command: &ControlCommand) -> Result<RotorCommand, FlightError> {
        if command.thrust < 0.0 {
            return Err(FlightError::invalid(format!(
                "negative thrust {} N",
                command.thrust
            )));
        }
        if !(command.thrust.is_finite() && command.torque().iter().all(|t| t.is_finite())) {
            return Err(FlightError::invalid("non-finite control command"));
        }

        // Bounded so that the four-term sum cannot reach inf - inf
        let term = |value: f64, gain: f64| (value * gain).clamp(-TERM_LIMIT, TERM_LIMIT);
        let thrust = term(command.thrust, self.gains.thrust);
        let roll = term(command.torque_roll, self.gains.roll);
        let pitch = term(command.torque_pitch, self.gains.pitch);
        let yaw = term(command.torque_yaw, self.gains.yaw);

        // Roll torque from +y rotors, pitch torque from -x rotors, yaw
        // torque from the reaction of clockwise rotors.
        let velocities = Rotor::ALL.map(|rotor| {
            let (x, y) = rotor.offset();
            thrust + y * roll - x * pitch + rotor.spin() * yaw
        });

        Ok(RotorCommand::clamped(velocities, self.max_rotor_velocity))
    }

    pub fn gains(&self) -> &MixerGains {
        &self.gains
    }

    pub fn max_rotor_velocity(&self) -> f64 {
        self.max_rotor_velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_mixer() -> Mixer {
        Mixer::new(
            MixerGains { thrust: 10.0, roll: 1.0, pitch: 1.0, yaw: 1.0 },
            1000.0,
        )
    }

    #[test]
    fn test_hover_maps_to_hover_velocity() {
        let airframe = AirframeConfig::default();
        let mixer = Mixer::from_airframe(&airframe);

        let rotors = mixer
            .mix(&ControlCommand::new(airframe.hover_thrust(), 0.0, 0.0, 0.0))
            .unwrap();
        for (_, v) in rotors.iter() {
            assert_relative_eq!(v, airframe.hover_rotor_velocity(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_quad_x_signs() {
        let mixer = unit_mixer();
        let base = 100.0;

        let roll = mixer.mix(&ControlCommand::new(10.0, 5.0, 0.0, 0.0)).unwrap();
        assert_eq!(roll.velocities(), [base + 5.0, base - 5.0, base + 5.0, base - 5.0]);

        let pitch = mixer.mix(&ControlCommand::new(10.0, 0.0, 5.0, 0.0)).unwrap();
        assert_eq!(pitch.velocities(), [base - 5.0, base - 5.0, base + 5.0, base + 5.0]);

        let yaw = mixer.mix(&ControlCommand::new(10.0, 0.0, 0.0, 5.0)).unwrap();
        assert_eq!(yaw.velocities(), [base + 5.0, base - 5.0, base - 5.0, base + 5.0]);
    }

    #[test]
    fn test_torque_terms_cancel_in_sum() {
        let mixer = unit_mixer();
        let rotors = mixer.mix(&ControlCommand::new(10.0, 3.0, -2.0, 7.0)).unwrap();
        let sum: f64 = rotors.velocities().iter().sum();
        assert_relative_eq!(sum, 400.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linearised_torque_matches_model() {
        // A small roll torque should produce (to first order) that torque on
        // the k_f·ω² rotor model.
        let airframe = AirframeConfig::default();
        let mixer = Mixer::from_airframe(&airframe);
        let tau = 0.01;

        let rotors = mixer
            .mix(&ControlCommand::new(airframe.hover_thrust(), tau, 0.0, 0.0))
            .unwrap();

        let d = airframe.moment_arm();
        let roll_torque: f64 = rotors
            .iter()
            .map(|(r, w)| r.offset().1 * d * airframe.thrust_coefficient * w * w)
            .sum();
        assert_relative_eq!(roll_torque, tau, max_relative = 1e-6);
    }

    #[test]
    fn test_output_always_in_range() {
        let airframe = AirframeConfig::default();
        let mixer = Mixer::from_airframe(&airframe);
        let max = airframe.max_rotor_velocity;

        let extremes = [0.0, 1e-6, 1.0, 1e3, 1e12, f64::MAX];
        let torques = [-f64::MAX, -1e6, -1.0, 0.0, 1.0, 1e6, f64::MAX];

        for &thrust in &extremes {
            for &r in &torques {
                for &p in &torques {
                    for &y in &[-1e9, 0.0, 1e9] {
                        let rotors = mixer.mix(&ControlCommand::new(thrust, r, p, y)).unwrap();
                        for v in rotors.velocities() {
                            assert!((0.0..=max).contains(&v), "{v} out of range");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_independent_clamping() {
        let mixer = Mixer::new(MixerGains { thrust: 1.0, roll: 1.0, pitch: 1.0, yaw: 1.0 }, 100.0);
        let rotors = mixer.mix(&ControlCommand::new(90.0, 20.0, 0.0, 0.0)).unwrap();
        // Left rotors saturate, right rotors are left as mixed
        assert_eq!(rotors.velocities(), [100.0, 70.0, 100.0, 70.0]);
    }

    #[test]
    fn test_negative_thrust_rejected() {
        let mixer = unit_mixer();
        let result = mixer.mix(&ControlCommand::new(-1.0, 0.0, 0.0, 0.0));
        assert!(matches!(result, Err(FlightError::InvalidInput(_))));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mixer = unit_mixer();
        assert!(mixer.mix(&ControlCommand::new(f64::NAN, 0.0, 0.0, 0.0)).is_err());
        assert!(mixer.mix(&ControlCommand::new(1.0, f64::INFINITY, 0.0, 0.0)).is_err());
    }
}
