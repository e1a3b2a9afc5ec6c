//! Quad-X rigid-body dynamics
//!
//! World frame is z-up. Each rotor produces thrust `k_f·ω²` along body z
//! and a reaction torque `k_m·ω²` about body z:
//!
//! ṗ = v
//! v̇ = -g·e₃ + (Σfᵢ / m) · R(q)e₃
//! q̇ = ½ q ⊗ [0; ω]
//! Jω̇ = -ω × Jω + τ
//!
//! with body torque
//!
//! τx =  Σ yᵢ·d·fᵢ
//! τy = -Σ xᵢ·d·fᵢ
//! τz =  Σ sᵢ·k_m·ωᵢ²
//!
//! where (xᵢ, yᵢ) is the unit rotor offset, d the moment arm and sᵢ the
//! rotor spin sign.

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use quadfc_core::config::AirframeConfig;
use quadfc_core::RotorCommand;

/// Quadrotor state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadState {
    /// Position [m] (world frame)
    pub position: Vector3<f64>,
    /// Velocity [m/s] (world frame)
    pub velocity: Vector3<f64>,
    /// Orientation (body to world)
    pub orientation: UnitQuaternion<f64>,
    /// Angular velocity [rad/s] (body frame)
    pub angular_velocity: Vector3<f64>,
}

impl Default for QuadState {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
        }
    }
}

impl QuadState {
    /// Roll, pitch, yaw [rad]
    pub fn attitude(&self) -> Vector3<f64> {
        let (roll, pitch, yaw) = self.orientation.euler_angles();
        Vector3::new(roll, pitch, yaw)
    }

    /// Body z-axis in world frame
    pub fn thrust_direction(&self) -> Vector3<f64> {
        self.orientation * Vector3::z()
    }

    /// Resting on the ground
    pub fn on_ground(&self) -> bool {
        self.position.z <= 0.0 && self.velocity.z <= 0.0
    }
}

/// Collective thrust and body torque
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wrench {
    /// Total thrust [N]
    pub thrust: f64,
    /// Body torque [N·m]
    pub torque: Vector3<f64>,
}

/// Quad-X dynamics model
#[derive(Debug, Clone)]
pub struct QuadDynamics {
    pub airframe: AirframeConfig,
    pub inertia: Matrix3<f64>,
    inertia_inv: Matrix3<f64>,
}

impl QuadDynamics {
    /// Model with diagonal inertia
    pub fn new(airframe: AirframeConfig, inertia_diag: Vector3<f64>) -> Self {
        Self {
            airframe,
            inertia: Matrix3::from_diagonal(&inertia_diag),
            inertia_inv: Matrix3::from_diagonal(&inertia_diag.map(|i| 1.0 / i)),
        }
    }

    /// Thrust and torque produced by the given rotor velocities
    pub fn wrench(&self, rotors: &RotorCommand) -> Wrench {
        let k_f = self.airframe.thrust_coefficient;
        let k_m = self.airframe.torque_coefficient;
        let d = self.airframe.moment_arm();

        rotors.iter().fold(
            Wrench { thrust: 0.0, torque: Vector3::zeros() },
            |acc, (rotor, omega)| {
                let (x, y) = rotor.offset();
                let force = k_f * omega * omega;
                Wrench {
                    thrust: acc.thrust + force,
                    torque: acc.torque
                        + Vector3::new(y * d * force, -x * d * force, rotor.spin() * k_m * omega * omega),
                }
            },
        )
    }

    /// Translational acceleration [m/s²]
    pub fn acceleration(&self, state: &QuadState, wrench: &Wrench) -> Vector3<f64> {
        let gravity = Vector3::new(0.0, 0.0, -self.airframe.gravity);
        gravity + state.thrust_direction() * wrench.thrust / self.airframe.mass
    }

    /// Angular acceleration [rad/s²] (body frame)
    pub fn angular_acceleration(&self, state: &QuadState, wrench: &Wrench) -> Vector3<f64> {
        let omega = &state.angular_velocity;
        let gyro = -omega.cross(&(self.inertia * omega));
        self.inertia_inv * (gyro + wrench.torque)
    }

    /// Advance one explicit Euler step
    ///
    /// The ground plane z = 0 is rigid: the vehicle cannot sink below it,
    /// and while resting on it all linear and angular motion stops.
    pub fn step(&self, state: &QuadState, rotors: &RotorCommand, dt: f64) -> QuadState {
        let wrench = self.wrench(rotors);
        let acceleration = self.acceleration(state, &wrench);
        let angular_acceleration = self.angular_acceleration(state, &wrench);

        let omega = state.angular_velocity;
        let q_dot = state.orientation.quaternion() * Quaternion::new(0.0, omega.x, omega.y, omega.z) * 0.5;
        let orientation = UnitQuaternion::from_quaternion(state.orientation.quaternion() + q_dot * dt);

        let mut next = QuadState {
            position: state.position + state.velocity * dt,
            velocity: state.velocity + acceleration * dt,
            orientation,
            angular_velocity: omega + angular_acceleration * dt,
        };

        if next.on_ground() {
            next.position.z = 0.0;
            next.velocity = Vector3::zeros();
            next.angular_velocity = Vector3::zeros();
        }
        next
    }
}
