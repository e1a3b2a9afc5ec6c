//! State estimation
//!
//! Turns raw sensor samples into the state estimate consumed by the
//! controllers.

pub mod estimator;

pub use estimator::*;
