//! Flight-control errors
//!
//! A single taxonomy shared by every stage of the pipeline. Any error raised
//! while armed is fatal to the tick and moves the controller into `Fault`.

use thiserror::Error;

use crate::driver::FlightMode;

/// Flight-control errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlightError {
    /// Malformed input to a pipeline stage (dt, thrust, non-finite sample)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Gap between consecutive sensor samples exceeded the timeout
    #[error("Stale sensor data: gap of {gap:.3}s exceeds timeout of {timeout:.3}s")]
    StaleSensor { gap: f64, timeout: f64 },
    /// Arm requested before any sensor sample was observed
    #[error("No sensor data observed")]
    NoSensorData,
    /// Gain or bound misconfiguration, detected at construction
    #[error("Configuration error: {0}")]
    Config(String),
    /// Operator command not allowed in the current mode
    #[error("Cannot {action} while {from:?}")]
    InvalidTransition { from: FlightMode, action: &'static str },
    /// Failure reported by the host device layer
    #[error("Host error: {0}")]
    Host(String),
    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(String),
    /// Configuration file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

impl FlightError {
    /// Shorthand for the `InvalidInput` variant
    pub fn invalid(message: impl Into<String>) -> Self {
        FlightError::InvalidInput(message.into())
    }
}

// Sources are flattened to strings: io::Error and serde_json::Error are neither
// Clone nor PartialEq, and faults are stored and compared by value.
impl From<std::io::Error> for FlightError {
    fn from(e: std::io::Error) -> Self {
        FlightError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for FlightError {
    fn from(e: serde_json::Error) -> Self {
        FlightError::Parse(e.to_string())
    }
}

/// Reject a non-positive or non-finite time step
pub(crate) fn check_dt(dt: f64) -> Result<(), FlightError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(FlightError::invalid(format!("dt must be positive and finite, got {dt}")))
    }
}
