//! Sensor models for simulation
//!
//! Produces the inertial unit, gyroscope and GPS readings of a simulated
//! quad as one [`SensorSample`], with optional Gaussian noise and a constant
//! gyro bias.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use quadfc_core::SensorSample;

use crate::config::SensorNoise;
use crate::dynamics::QuadState;
use crate::SimError;

/// Inertial unit, gyroscope and GPS
#[derive(Debug, Clone)]
pub struct SensorSuite {
    noise: SensorNoise,
    attitude: Normal<f64>,
    gyro: Normal<f64>,
    position: Normal<f64>,
    rng: StdRng,
}

impl SensorSuite {
    /// Fails with `SimError::Noise` on a negative or non-finite std dev
    pub fn new(noise: SensorNoise, seed: u64) -> Result<Self, SimError> {
        Ok(Self {
            attitude: Normal::new(0.0, noise.attitude_std)?,
            gyro: Normal::new(0.0, noise.gyro_std)?,
            position: Normal::new(0.0, noise.position_std)?,
            noise,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Read every device at once
    pub fn measure(&mut self, state: &QuadState, time: f64) -> SensorSample {
        let attitude = state.attitude() + sample_vec3(&self.attitude, &mut self.rng);
        let angular_rate =
            state.angular_velocity + self.noise.gyro_bias + sample_vec3(&self.gyro, &mut self.rng);
        let position = state.position + sample_vec3(&self.position, &mut self.rng);

        SensorSample::new(attitude, angular_rate, position, time)
    }

    pub fn noise(&self) -> &SensorNoise {
        &self.noise
    }
}

fn sample_vec3(dist: &Normal<f64>, rng: &mut StdRng) -> Vector3<f64> {
    Vector3::from_fn(|_, _| dist.sample(&mut *rng))
}
