//! Main simulation runner
//!
//! [`SimulatedQuad`] is the plant seen through the [`FlightHost`] seam.
//! [`Simulator`] drives a [`ControlLoop`] over it: each control tick the
//! plant advances `substeps` physics steps under the latched rotor command,
//! then the loop reads sensors, ticks the controller and actuates.

use log::{debug, info};
use nalgebra::{UnitQuaternion, Vector3};

use quadfc_core::{
    ControlLoop, FlightConfig, FlightController, FlightError, FlightHost, FlightMode, RotorCommand,
    SensorSample, Setpoint, SetpointSource,
};

use crate::config::SimConfig;
use crate::dynamics::{QuadDynamics, QuadState};
use crate::sensors::SensorSuite;
use crate::SimError;

/// Simulated quad-X behind the host seam
#[derive(Debug, Clone)]
pub struct SimulatedQuad {
    dynamics: QuadDynamics,
    sensors: SensorSuite,
    state: QuadState,
    rotors: RotorCommand,
    physics_dt: f64,
    time: f64,
}

impl SimulatedQuad {
    pub fn new(config: &SimConfig) -> Result<Self, SimError> {
        config.validate()?;

        let initial = &config.initial_state;
        let state = QuadState {
            position: initial.position,
            velocity: initial.velocity,
            orientation: UnitQuaternion::from_euler_angles(
                initial.attitude.x,
                initial.attitude.y,
                initial.attitude.z,
            ),
            angular_velocity: Vector3::zeros(),
        };

        Ok(Self {
            dynamics: QuadDynamics::new(config.airframe.clone(), config.inertia),
            sensors: SensorSuite::new(config.sensors.clone(), config.seed)?,
            state,
            rotors: RotorCommand::zero(),
            physics_dt: config.physics_dt,
            time: 0.0,
        })
    }

    /// Integrate `steps` physics steps under the latched rotor command
    pub fn advance(&mut self, steps: u32) {
        for _ in 0..steps {
            self.state = self.dynamics.step(&self.state, &self.rotors, self.physics_dt);
            self.time += self.physics_dt;
        }
    }

    pub fn state(&self) -> &QuadState {
        &self.state
    }

    /// Last actuated rotor command
    pub fn rotors(&self) -> &RotorCommand {
        &self.rotors
    }

    /// Simulation time [s]
    pub fn time(&self) -> f64 {
        self.time
    }
}

impl FlightHost for SimulatedQuad {
    fn read_sensors(&mut self) -> Result<SensorSample, FlightError> {
        Ok(self.sensors.measure(&self.state, self.time))
    }

    fn set_rotor_velocities(&mut self, command: &RotorCommand) -> Result<(), FlightError> {
        let max = self.dynamics.airframe.max_rotor_velocity;
        if command.velocities().iter().any(|v| !(0.0..=max).contains(v)) {
            return Err(FlightError::Host(format!(
                "rotor command {:?} outside [0, {max}]",
                command.velocities()
            )));
        }
        self.rotors = *command;
        Ok(())
    }
}

/// Simulation history, one entry per control tick
#[derive(Debug, Clone, Default)]
pub struct SimHistory {
    /// Time stamps [s]
    pub times: Vec<f64>,
    /// True positions [m]
    pub positions: Vec<Vector3<f64>>,
    /// True roll, pitch, yaw [rad]
    pub attitudes: Vec<Vector3<f64>>,
    /// Actuated rotor commands
    pub rotors: Vec<RotorCommand>,
    /// Controller mode after each tick
    pub modes: Vec<FlightMode>,
}

impl SimHistory {
    fn record(&mut self, quad: &SimulatedQuad, mode: FlightMode) {
        self.times.push(quad.time());
        self.positions.push(quad.state().position);
        self.attitudes.push(quad.state().attitude());
        self.rotors.push(*quad.rotors());
        self.modes.push(mode);
    }

    pub fn duration(&self) -> f64 {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Entries at or after time `t`
    pub fn positions_since(&self, t: f64) -> impl Iterator<Item = &Vector3<f64>> + '_ {
        self.times
            .iter()
            .zip(&self.positions)
            .filter(move |(time, _)| **time >= t)
            .map(|(_, p)| p)
    }
}

/// Closed-loop simulator: flight controller plus plant
pub struct Simulator {
    config: SimConfig,
    control: ControlLoop<SimulatedQuad>,
    history: SimHistory,
}

impl Simulator {
    pub fn new(config: SimConfig, flight: FlightConfig) -> Result<Self, SimError> {
        let quad = SimulatedQuad::new(&config)?;
        let controller = FlightController::new(flight)?;
        let control = ControlLoop::new(quad, controller)?;

        info!(
            "simulator: physics dt {}s x {} substeps, start at {:?}",
            config.physics_dt,
            config.substeps,
            config.initial_state.position.as_slice()
        );

        Ok(Self {
            config,
            control,
            history: SimHistory::default(),
        })
    }

    /// Feed setpoints from an external source, e.g. a [`quadfc_core::SharedSetpoint`]
    pub fn with_setpoint_source(mut self, source: impl SetpointSource + 'static) -> Self {
        self.control = self.control.with_setpoint_source(source);
        self
    }

    pub fn set_setpoint(&mut self, setpoint: Setpoint) {
        self.control.controller_mut().set_setpoint(setpoint);
    }

    /// Arm against the current plant state
    pub fn arm(&mut self) -> Result<(), SimError> {
        self.control.arm()?;
        Ok(())
    }

    pub fn disarm(&mut self) -> Result<(), SimError> {
        self.control.disarm()?;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), SimError> {
        self.control.reset()?;
        Ok(())
    }

    /// Advance the plant one control period, then run one control tick
    pub fn step(&mut self) -> Result<RotorCommand, SimError> {
        self.control.host_mut().advance(self.config.substeps);
        let command = self.control.step()?;
        self.history.record(self.control.host(), self.control.mode());
        Ok(command)
    }

    /// Run for `duration` seconds of simulated time
    pub fn run(&mut self, duration: f64) -> Result<&SimHistory, SimError> {
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(SimError::Config(format!("invalid duration {duration}")));
        }

        let ticks = (duration / self.config.control_period()).round() as u64;
        for _ in 0..ticks {
            self.step()?;
        }

        let state = self.quad().state();
        debug!(
            "ran {ticks} ticks to t={:.3}s, position {:?}, mode {:?}",
            self.quad().time(),
            state.position.as_slice(),
            self.mode()
        );
        Ok(&self.history)
    }

    pub fn mode(&self) -> FlightMode {
        self.control.mode()
    }

    pub fn quad(&self) -> &SimulatedQuad {
        self.control.host()
    }

    pub fn controller(&self) -> &FlightController {
        self.control.controller()
    }

    pub fn history(&self) -> &SimHistory {
        &self.history
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
