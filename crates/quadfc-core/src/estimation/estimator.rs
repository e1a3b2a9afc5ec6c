//! State estimator
//!
//! The inertial unit and GPS are assumed to be fused upstream, so attitude,
//! angular rate and position pass straight through from the sample. Climb
//! rate is the finite difference of altitude against the previous estimate:
//!
//! v_z = (z_k - z_{k-1}) / dt
//!
//! and zero when there is no previous estimate.

use crate::error::{check_dt, FlightError};
use crate::types::{SensorSample, StateEstimate};

/// Compute a state estimate from one sample
///
/// Pure function of its inputs. Fails with `InvalidInput` when `dt <= 0` or
/// the sample contains non-finite values.
pub fn estimate(
    sample: &SensorSample,
    previous: Option<&StateEstimate>,
    dt: f64,
) -> Result<StateEstimate, FlightError> {
    check_dt(dt)?;
    sample.validate()?;

    let vertical_velocity = match previous {
        Some(prev) => (sample.position.z - prev.position.z) / dt,
        None => 0.0,
    };

    Ok(StateEstimate {
        attitude: sample.attitude,
        angular_rate: sample.angular_rate,
        position: sample.position,
        vertical_velocity,
    })
}

/// Estimator owning the single retained previous estimate
#[derive(Debug, Clone, Default)]
pub struct Estimator {
    previous: Option<StateEstimate>,
}

impl Estimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate from `sample` and retain the result for the next tick
    ///
    /// On error the retained estimate is left unchanged.
    pub fn update(&mut self, sample: &SensorSample, dt: f64) -> Result<StateEstimate, FlightError> {
        let next = estimate(sample, self.previous.as_ref(), dt)?;
        self.previous = Some(next);
        Ok(next)
    }

    /// Most recent estimate
    pub fn latest(&self) -> Option<&StateEstimate> {
        self.previous.as_ref()
    }

    /// Forget the retained estimate
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
