//! Flight controller configuration
//!
//! Gains, limits and loop timing. Every section has a `Default` tuned for a
//! 1 kg quad-X; a full configuration can be read from JSON and is validated
//! before a controller is built.

use std::f64::consts::FRAC_PI_2;
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::FlightError;

/// Main flight controller configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Physical airframe parameters
    pub airframe: AirframeConfig,
    /// Outer loop (altitude/position)
    pub position: PositionConfig,
    /// Inner loop (attitude)
    pub attitude: AttitudeConfig,
    /// Tick timing and sensor freshness
    pub loop_timing: LoopTimingConfig,
}

impl FlightConfig {
    /// Parse a JSON configuration. Missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, FlightError> {
        let config: FlightConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FlightError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String, FlightError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every gain and bound. Fails with `FlightError::Config`.
    pub fn validate(&self) -> Result<(), FlightError> {
        self.airframe.validate()?;

        let p = &self.position;
        p.altitude.validate("position.altitude")?;
        p.x.validate("position.x")?;
        p.y.validate("position.y")?;
        if !(p.max_tilt > 0.0 && p.max_tilt < FRAC_PI_2) {
            return Err(config_error(format!(
                "position.max_tilt must be in (0, pi/2), got {}",
                p.max_tilt
            )));
        }
        positive("position.max_thrust", p.max_thrust)?;
        let hover = self.airframe.hover_thrust();
        if p.max_thrust < hover {
            return Err(config_error(format!(
                "position.max_thrust ({}) is below hover thrust ({hover:.3})",
                p.max_thrust
            )));
        }

        let a = &self.attitude;
        a.roll.validate("attitude.roll")?;
        a.pitch.validate("attitude.pitch")?;
        a.yaw_rate.validate("attitude.yaw_rate")?;
        if let Some(max_torque) = a.max_torque {
            if max_torque.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
                return Err(config_error(format!(
                    "attitude.max_torque must be positive, got {max_torque:?}"
                )));
            }
        }

        let t = &self.loop_timing;
        positive("loop_timing.nominal_dt", t.nominal_dt)?;
        positive("loop_timing.stale_timeout", t.stale_timeout)?;
        if t.inner_loop_multiplier == 0 {
            return Err(config_error("loop_timing.inner_loop_multiplier must be at least 1"));
        }

        Ok(())
    }
}

/// Airframe parameters
///
/// Rotor thrust is modelled as `k_f·ω²` and rotor reaction torque as
/// `k_m·ω²`. The mixer gains are the linearisation of that model about hover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirframeConfig {
    /// Mass [kg]
    pub mass: f64,
    /// Gravity magnitude [m/s²]
    pub gravity: f64,
    /// Distance from centre of mass to each rotor [m]
    pub arm_length: f64,
    /// Rotor thrust coefficient k_f [N/(rad/s)²]
    pub thrust_coefficient: f64,
    /// Rotor drag torque coefficient k_m [N·m/(rad/s)²]
    pub torque_coefficient: f64,
    /// Rotor velocity limit [rad/s]
    pub max_rotor_velocity: f64,
}

impl Default for AirframeConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            gravity: 9.81,
            arm_length: 0.2,
            thrust_coefficient: 2.0e-5,
            torque_coefficient: 3.0e-7,
            max_rotor_velocity: 576.0,
        }
    }
}

impl AirframeConfig {
    /// Collective thrust that balances gravity [N]
    pub fn hover_thrust(&self) -> f64 {
        self.mass * self.gravity
    }

    /// Rotor velocity at hover [rad/s]
    pub fn hover_rotor_velocity(&self) -> f64 {
        (self.hover_thrust() / (4.0 * self.thrust_coefficient)).sqrt()
    }

    /// Moment arm of each rotor about the body x and y axes [m]
    pub fn moment_arm(&self) -> f64 {
        self.arm_length / std::f64::consts::SQRT_2
    }

    pub fn validate(&self) -> Result<(), FlightError> {
        positive("airframe.mass", self.mass)?;
        positive("airframe.gravity", self.gravity)?;
        positive("airframe.arm_length", self.arm_length)?;
        positive("airframe.thrust_coefficient", self.thrust_coefficient)?;
        positive("airframe.torque_coefficient", self.torque_coefficient)?;
        positive("airframe.max_rotor_velocity", self.max_rotor_velocity)?;

        let hover = self.hover_rotor_velocity();
        if hover > self.max_rotor_velocity {
            return Err(config_error(format!(
                "hover rotor velocity ({hover:.1} rad/s) exceeds max_rotor_velocity ({})",
                self.max_rotor_velocity
            )));
        }
        Ok(())
    }
}

/// Gains and limits of a single PID loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Symmetric bound on the integral accumulator (∫e dt)
    pub integral_limit: f64,
    /// Optional symmetric bound on the PID output
    #[serde(default)]
    pub output_limit: Option<f64>,
}

impl PidGains {
    pub fn new(kp: f64, ki: f64, kd: f64, integral_limit: f64) -> Self {
        Self { kp, ki, kd, integral_limit, output_limit: None }
    }

    pub fn with_output_limit(mut self, limit: f64) -> Self {
        self.output_limit = Some(limit);
        self
    }

    pub fn validate(&self, name: &str) -> Result<(), FlightError> {
        for (term, value) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(config_error(format!(
                    "{name}.{term} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !(self.integral_limit.is_finite() && self.integral_limit >= 0.0) {
            return Err(config_error(format!(
                "{name}.integral_limit must be finite and non-negative, got {}",
                self.integral_limit
            )));
        }
        if let Some(limit) = self.output_limit {
            positive(&format!("{name}.output_limit"), limit)?;
        }
        Ok(())
    }
}

/// Outer loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Altitude error [m] → thrust correction [N]
    pub altitude: PidGains,
    /// Heading-frame x error [m] → pitch [rad]
    pub x: PidGains,
    /// Heading-frame y error [m] → roll [rad]
    pub y: PidGains,
    /// Roll/pitch demand limit [rad]
    pub max_tilt: f64,
    /// Collective thrust limit [N]
    pub max_thrust: f64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            altitude: PidGains::new(4.0, 0.5, 3.0, 2.0),
            x: PidGains::new(0.1, 0.01, 0.16, 2.0),
            y: PidGains::new(0.1, 0.01, 0.16, 2.0),
            max_tilt: 0.35,
            max_thrust: 19.62,
        }
    }
}

/// Inner loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttitudeConfig {
    /// Roll error [rad] → roll torque [N·m]
    pub roll: PidGains,
    /// Pitch error [rad] → pitch torque [N·m]
    pub pitch: PidGains,
    /// Yaw-rate error [rad/s] → yaw torque [N·m]
    pub yaw_rate: PidGains,
    /// Optional per-axis torque limit [N·m]
    pub max_torque: Option<Vector3<f64>>,
}

impl Default for AttitudeConfig {
    fn default() -> Self {
        Self {
            roll: PidGains::new(0.4, 0.05, 0.08, 0.5),
            pitch: PidGains::new(0.4, 0.05, 0.08, 0.5),
            yaw_rate: PidGains::new(0.1, 0.01, 0.0, 0.5),
            max_torque: Some(Vector3::new(1.0, 1.0, 0.5)),
        }
    }
}

/// Tick timing and sensor freshness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopTimingConfig {
    /// Expected tick period [s]; arming requires a sample this fresh
    pub nominal_dt: f64,
    /// Largest tolerated gap between consecutive samples while armed [s]
    pub stale_timeout: f64,
    /// Inner-loop ticks per outer-loop update
    pub inner_loop_multiplier: u32,
}

impl Default for LoopTimingConfig {
    fn default() -> Self {
        Self {
            nominal_dt: 0.008, // 125 Hz host step
            stale_timeout: 0.1,
            inner_loop_multiplier: 1,
        }
    }
}

fn config_error(message: impl Into<String>) -> FlightError {
    FlightError::Config(message.into())
}

fn positive(name: &str, value: f64) -> Result<(), FlightError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(config_error(format!("{name} must be positive, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = FlightConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.loop_timing.inner_loop_multiplier, 1);
    }

    #[test]
    fn test_hover_values() {
        let airframe = AirframeConfig::default();
        assert_relative_eq!(airframe.hover_thrust(), 9.81, epsilon = 1e-12);

        // 4 rotors at hover velocity carry the full weight
        let omega = airframe.hover_rotor_velocity();
        let thrust = 4.0 * airframe.thrust_coefficient * omega * omega;
        assert_relative_eq!(thrust, airframe.hover_thrust(), epsilon = 1e-9);
        assert!(omega < airframe.max_rotor_velocity);
    }

    #[test]
    fn test_negative_gain_rejected() {
        let mut config = FlightConfig::default();
        config.attitude.roll.kp = -1.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, FlightError::Config(ref m) if m.contains("attitude.roll.kp")));
    }

    #[test]
    fn test_bad_bounds_rejected() {
        let mut config = FlightConfig::default();
        config.position.max_tilt = 2.0;
        assert!(matches!(config.validate(), Err(FlightError::Config(_))));

        let mut config = FlightConfig::default();
        config.position.max_thrust = 5.0; // below 9.81 N hover
        assert!(matches!(config.validate(), Err(FlightError::Config(_))));

        let mut config = FlightConfig::default();
        config.position.altitude.integral_limit = -1.0;
        assert!(matches!(config.validate(), Err(FlightError::Config(_))));

        let mut config = FlightConfig::default();
        config.loop_timing.inner_loop_multiplier = 0;
        assert!(matches!(config.validate(), Err(FlightError::Config(_))));

        let mut config = FlightConfig::default();
        config.airframe.max_rotor_velocity = 100.0; // hover needs ~350 rad/s
        assert!(matches!(config.validate(), Err(FlightError::Config(_))));

        let mut config = FlightConfig::default();
        config.attitude.max_torque = Some(Vector3::new(1.0, 0.0, 1.0));
        assert!(matches!(config.validate(), Err(FlightError::Config(_))));
    }

    #[test]
    fn test_json_partial_config() {
        let json = r#"{
            "loop_timing": { "stale_timeout": 0.25, "inner_loop_multiplier": 4 },
            "position": {
                "altitude": { "kp": 2.0, "ki": 0.1, "kd": 1.0, "integral_limit": 1.0 }
            }
        }"#;

        let config = FlightConfig::from_json_str(json).unwrap();
        assert_eq!(config.loop_timing.stale_timeout, 0.25);
        assert_eq!(config.loop_timing.inner_loop_multiplier, 4);
        assert_eq!(config.loop_timing.nominal_dt, 0.008);
        assert_eq!(config.position.altitude.kp, 2.0);
        assert_eq!(config.position.altitude.output_limit, None);
        assert_eq!(config.position.x, PositionConfig::default().x);
        assert_eq!(config.airframe, AirframeConfig::default());
    }

    #[test]
    fn test_json_round_trip_and_rejection() {
        let config = FlightConfig::default();
        let json = config.to_json_string().unwrap();
        assert_eq!(FlightConfig::from_json_str(&json).unwrap(), config);

        assert!(matches!(
            FlightConfig::from_json_str("{ not json"),
            Err(FlightError::Parse(_))
        ));
        assert!(matches!(
            FlightConfig::from_json_str(r#"{ "airframe": { "mass": 0.0 } }"#),
            Err(FlightError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = FlightConfig::load("/nonexistent/quadfc.json").unwrap_err();
        assert!(matches!(err, FlightError::Io(_)));
    }
}
