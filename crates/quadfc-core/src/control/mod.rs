//! Stabilisation control for the quadrotor
//!
//! Cascaded loops, outermost first:
//! - Position controller: altitude/position error → attitude and thrust demand
//! - Attitude controller: attitude/yaw-rate error → body torques
//! - Mixer: thrust and torques → rotor velocities
//!
//! All loops are built from the single-axis [`Pid`].

pub mod pid;
pub mod position;
pub mod attitude;
pub mod mixer;

pub use pid::*;
pub use position::*;
pub use attitude::*;
pub use mixer::*;
