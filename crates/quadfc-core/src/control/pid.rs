//! Single-axis PID controller
//!
//! u = kp·e + ki·∫e dt + kd·de/dt
//!
//! The integral accumulator is clamped to ±integral_limit on every update so
//! that sustained error cannot wind it up. The derivative is taken on the
//! error by finite difference and is zero on the first update after a reset.

use crate::config::PidGains;
use crate::error::{check_dt, FlightError};

/// PID loop state
#[derive(Debug, Clone)]
pub struct Pid {
    /// Gains and limits
    pub gains: PidGains,
    /// Integral accumulator
    integral: f64,
    /// Error from the previous update
    prev_error: Option<f64>,
}

impl Pid {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            prev_error: None,
        }
    }

    /// Advance the loop by `dt` with the current `error` and return the output
    pub fn update(&mut self, error: f64, dt: f64) -> Result<f64, FlightError> {
        check_dt(dt)?;
        if !error.is_finite() {
            return Err(FlightError::invalid(format!("non-finite PID error {error}")));
        }

        let limit = self.gains.integral_limit;
        self.integral = (self.integral + error * dt).clamp(-limit, limit);

        let derivative = match self.prev_error {
            Some(prev) => (error - prev) / dt,
            None => 0.0,
        };
        self.prev_error = Some(error);

        let output = self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative;

        Ok(match self.gains.output_limit {
            Some(limit) => output.clamp(-limit, limit),
            None => output,
        })
    }

    /// Current integral accumulator
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Clear the accumulator and derivative history
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }
}
