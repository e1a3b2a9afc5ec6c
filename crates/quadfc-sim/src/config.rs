//! Simulation configuration
//!
//! Plant parameters, sensor noise and initial state for a simulated quad-X.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use quadfc_core::config::AirframeConfig;

use crate::SimError;

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Physics integration step [s]
    pub physics_dt: f64,
    /// Physics steps per control tick
    pub substeps: u32,
    /// Plant airframe; may differ from the controller's to model mismatch
    pub airframe: AirframeConfig,
    /// Inertia diagonal [kg·m²]
    pub inertia: Vector3<f64>,
    /// Initial state
    pub initial_state: InitialStateConfig,
    /// Sensor noise model
    pub sensors: SensorNoise,
    /// RNG seed for sensor noise
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            physics_dt: 0.001, // 1 kHz physics
            substeps: 8,       // 125 Hz control
            airframe: AirframeConfig::default(),
            inertia: Vector3::new(0.01, 0.01, 0.02),
            initial_state: InitialStateConfig::default(),
            sensors: SensorNoise::default(),
            seed: 42,
        }
    }
}

impl SimConfig {
    /// Noise-free configuration starting at `position`
    pub fn ideal(position: Vector3<f64>) -> Self {
        Self {
            initial_state: InitialStateConfig { position, ..Default::default() },
            sensors: SensorNoise::ideal(),
            ..Default::default()
        }
    }

    /// Time between control ticks [s]
    pub fn control_period(&self) -> f64 {
        self.physics_dt * f64::from(self.substeps)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.physics_dt.is_finite() && self.physics_dt > 0.0) {
            return Err(SimError::Config(format!(
                "physics_dt must be positive, got {}",
                self.physics_dt
            )));
        }
        if self.substeps == 0 {
            return Err(SimError::Config("substeps must be at least 1".into()));
        }
        if self.inertia.iter().any(|i| !(i.is_finite() && *i > 0.0)) {
            return Err(SimError::Config(format!(
                "inertia must be positive, got {:?}",
                self.inertia
            )));
        }
        self.airframe.validate()?;

        let s = &self.sensors;
        let stds = [s.attitude_std, s.gyro_std, s.position_std];
        if stds.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(SimError::Config(format!("noise std must be non-negative, got {stds:?}")));
        }
        Ok(())
    }
}

/// Initial state configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialStateConfig {
    /// Position [m]
    pub position: Vector3<f64>,
    /// Velocity [m/s]
    pub velocity: Vector3<f64>,
    /// Roll, pitch, yaw [rad]
    pub attitude: Vector3<f64>,
}

impl Default for InitialStateConfig {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            attitude: Vector3::zeros(),
        }
    }
}

/// Gaussian sensor noise and constant gyro bias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorNoise {
    /// Inertial unit noise std dev [rad]
    pub attitude_std: f64,
    /// Gyroscope noise std dev [rad/s]
    pub gyro_std: f64,
    /// Gyroscope bias [rad/s]
    pub gyro_bias: Vector3<f64>,
    /// GPS noise std dev [m]
    pub position_std: f64,
}

impl Default for SensorNoise {
    fn default() -> Self {
        Self {
            attitude_std: 0.0005,
            gyro_std: 0.001,
            gyro_bias: Vector3::zeros(),
            position_std: 0.001,
        }
    }
}

impl SensorNoise {
    /// Perfect sensors
    pub fn ideal() -> Self {
        Self {
            attitude_std: 0.0,
            gyro_std: 0.0,
            gyro_bias: Vector3::zeros(),
            position_std: 0.0,
        }
    }
}
