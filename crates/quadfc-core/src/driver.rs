//! Control loop driver
//!
//! Sequences one pass of the pipeline per tick and owns the arming state
//! machine:
//!
//! ```text
//!          arm (fresh sample)            any stage error / stale gap
//!   Idle ───────────────────► Armed ─────────────────────────────► Fault
//!    ▲  ◄──────────────────────┘                                     │
//!    │          disarm                                               │
//!    └───────────────────────────── reset ───────────────────────────┘
//! ```
//!
//! Outside `Armed` every tick emits the all-zero rotor command. Leaving
//! `Fault` always takes an explicit operator reset, and a reset never arms.

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::FlightConfig;
use crate::control::{AttitudeController, Mixer, PositionController};
use crate::error::FlightError;
use crate::estimation::Estimator;
use crate::types::{AttitudeTarget, ControlCommand, RotorCommand, SensorSample, Setpoint, StateEstimate};

/// Slack on the arming freshness window for accumulated float error in host clocks
const ARM_TIME_TOLERANCE: f64 = 1e-9;

/// Arming state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightMode {
    /// Disarmed, rotors stopped
    Idle,
    /// Running the control pipeline every tick
    Armed,
    /// A tick failed; rotors stopped until operator reset
    Fault,
}

/// Record of the most recent tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    /// Tick counter since construction
    pub tick: u64,
    /// Mode after the tick completed
    pub mode: FlightMode,
    /// Elapsed time since the previous armed tick [s]
    pub dt: Option<f64>,
    pub estimate: Option<StateEstimate>,
    /// Outer-loop output in effect for this tick
    pub attitude_target: Option<AttitudeTarget>,
    /// Whether the outer loop ran on this tick
    pub outer_updated: bool,
    pub command: Option<ControlCommand>,
    pub rotors: RotorCommand,
}

impl Telemetry {
    fn stopped(tick: u64, mode: FlightMode) -> Self {
        Self {
            tick,
            mode,
            dt: None,
            estimate: None,
            attitude_target: None,
            outer_updated: false,
            command: None,
            rotors: RotorCommand::zero(),
        }
    }
}

/// Flight controller: estimator → outer loop → inner loop → mixer
#[derive(Debug, Clone)]
pub struct FlightController {
    config: FlightConfig,
    estimator: Estimator,
    position: PositionController,
    attitude: AttitudeController,
    mixer: Mixer,
    mode: FlightMode,
    /// Most recently received setpoint (last write wins)
    setpoint: Setpoint,
    /// Most recently received sample, in any mode
    latest_sample: Option<SensorSample>,
    /// Timestamp of the last sample processed while armed
    last_timestamp: Option<f64>,
    /// Outer-loop output held between outer updates
    attitude_target: Option<AttitudeTarget>,
    /// Time accumulated since the last outer update
    outer_elapsed: f64,
    armed_ticks: u64,
    tick: u64,
    fault: Option<FlightError>,
    telemetry: Option<Telemetry>,
}

impl FlightController {
    /// Build a controller from a validated configuration
    ///
    /// Fails with `FlightError::Config` on misconfiguration; such a
    /// controller never exists and so can never arm.
    pub fn new(config: FlightConfig) -> Result<Self, FlightError> {
        config.validate()?;

        let hover_thrust = config.airframe.hover_thrust();
        Ok(Self {
            estimator: Estimator::new(),
            position: PositionController::new(&config.position, hover_thrust),
            attitude: AttitudeController::new(&config.attitude),
            mixer: Mixer::from_airframe(&config.airframe),
            mode: FlightMode::Idle,
            setpoint: Setpoint::default(),
            latest_sample: None,
            last_timestamp: None,
            attitude_target: None,
            outer_elapsed: 0.0,
            armed_ticks: 0,
            tick: 0,
            fault: None,
            telemetry: None,
            config,
        })
    }

    /// Replace the active setpoint; used from the next tick on
    pub fn set_setpoint(&mut self, setpoint: Setpoint) {
        self.setpoint = setpoint;
    }

    /// Run one tick with the sample for this tick
    ///
    /// Always returns exactly one rotor command. Any failure while armed
    /// moves the controller to `Fault` and yields the zero command.
    pub fn tick(&mut self, sample: SensorSample) -> RotorCommand {
        self.tick += 1;

        let telemetry = match self.mode {
            FlightMode::Armed => match self.run_pipeline(&sample) {
                Ok(telemetry) => telemetry,
                Err(error) => {
                    self.enter_fault(error);
                    Telemetry::stopped(self.tick, self.mode)
                }
            },
            FlightMode::Idle | FlightMode::Fault => Telemetry::stopped(self.tick, self.mode),
        };
        self.latest_sample = Some(sample);

        let rotors = telemetry.rotors;
        trace!("tick {} {:?} rotors {:?}", self.tick, self.mode, rotors.velocities());
        self.telemetry = Some(telemetry);
        rotors
    }

    fn run_pipeline(&mut self, sample: &SensorSample) -> Result<Telemetry, FlightError> {
        let last = self.last_timestamp.ok_or(FlightError::NoSensorData)?;
        let dt = sample.timestamp - last;

        let timeout = self.config.loop_timing.stale_timeout;
        if dt > timeout {
            return Err(FlightError::StaleSensor { gap: dt, timeout });
        }

        let estimate = self.estimator.update(sample, dt)?;

        // The outer loop runs on the first armed tick and every N-th after,
        // integrating over the true time since its previous run.
        self.outer_elapsed += dt;
        let multiplier = u64::from(self.config.loop_timing.inner_loop_multiplier);
        let outer_updated = self.armed_ticks % multiplier == 0;
        if outer_updated {
            let target = self.position.outer_step(&estimate, &self.setpoint, self.outer_elapsed)?;
            debug!(
                "outer update: roll {:.4} pitch {:.4} thrust {:.3}",
                target.desired_roll, target.desired_pitch, target.desired_thrust
            );
            self.attitude_target = Some(target);
            self.outer_elapsed = 0.0;
        }
        let target = self
            .attitude_target
            .ok_or_else(|| FlightError::invalid("no outer-loop output available"))?;

        let command = self.attitude.track(&estimate, &target, self.setpoint.target_yaw_rate, dt)?;
        let rotors = self.mixer.mix(&command)?;

        self.last_timestamp = Some(sample.timestamp);
        self.armed_ticks += 1;

        Ok(Telemetry {
            tick: self.tick,
            mode: self.mode,
            dt: Some(dt),
            estimate: Some(estimate),
            attitude_target: Some(target),
            outer_updated,
            command: Some(command),
            rotors,
        })
    }

    /// Operator arm command
    ///
    /// Allowed from `Idle` only, and only when the latest sample is within
    /// one nominal tick of `now`. Arming clears every PID accumulator and
    /// seeds the estimator with that sample.
    pub fn arm(&mut self, now: f64) -> Result<(), FlightError> {
        match self.mode {
            FlightMode::Armed => return Ok(()),
            FlightMode::Fault => {
                return Err(FlightError::InvalidTransition {
                    from: FlightMode::Fault,
                    action: "arm",
                })
            }
            FlightMode::Idle => {}
        }

        let sample = self.latest_sample.ok_or(FlightError::NoSensorData)?;
        sample.validate()?;

        let age = now - sample.timestamp;
        let window = self.config.loop_timing.nominal_dt;
        if !(age.abs() <= window + ARM_TIME_TOLERANCE) {
            warn!("arm rejected: sample age {age:.4}s outside {window:.4}s window");
            return Err(FlightError::StaleSensor { gap: age, timeout: window });
        }

        self.reset_pipeline();
        self.estimator.update(&sample, window)?;
        self.last_timestamp = Some(sample.timestamp);
        self.mode = FlightMode::Armed;
        info!("armed at t={:.3}s", sample.timestamp);
        Ok(())
    }

    /// Operator disarm: `Armed → Idle`
    pub fn disarm(&mut self) -> Result<(), FlightError> {
        match self.mode {
            FlightMode::Armed => {
                self.mode = FlightMode::Idle;
                self.reset_pipeline();
                info!("disarmed");
                Ok(())
            }
            FlightMode::Idle => Ok(()),
            FlightMode::Fault => Err(FlightError::InvalidTransition {
                from: FlightMode::Fault,
                action: "disarm",
            }),
        }
    }

    /// Operator reset: any mode → `Idle`, fault cleared
    pub fn reset(&mut self) {
        if let Some(fault) = self.fault.take() {
            info!("reset from fault: {fault}");
        } else {
            info!("reset from {:?}", self.mode);
        }
        self.mode = FlightMode::Idle;
        self.reset_pipeline();
    }

    /// Report a failure detected outside the pipeline (e.g. a host read)
    ///
    /// Faults the controller when armed; otherwise only logged.
    pub fn report_fault(&mut self, error: FlightError) {
        if self.mode == FlightMode::Armed {
            self.enter_fault(error);
        } else {
            warn!("{:?}: ignoring reported error: {error}", self.mode);
        }
    }

    fn enter_fault(&mut self, error: FlightError) {
        warn!("fault at tick {}: {error}", self.tick);
        self.mode = FlightMode::Fault;
        self.fault = Some(error);
    }

    fn reset_pipeline(&mut self) {
        self.estimator.reset();
        self.position.reset();
        self.attitude.reset();
        self.last_timestamp = None;
        self.attitude_target = None;
        self.outer_elapsed = 0.0;
        self.armed_ticks = 0;
    }

    pub fn mode(&self) -> FlightMode {
        self.mode
    }

    pub fn is_armed(&self) -> bool {
        self.mode == FlightMode::Armed
    }

    /// Error that caused the current fault
    pub fn fault(&self) -> Option<&FlightError> {
        self.fault.as_ref()
    }

    pub fn setpoint(&self) -> &Setpoint {
        &self.setpoint
    }

    pub fn latest_sample(&self) -> Option<&SensorSample> {
        self.latest_sample.as_ref()
    }

    /// Record of the most recent tick
    pub fn telemetry(&self) -> Option<&Telemetry> {
        self.telemetry.as_ref()
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    pub fn position_controller(&self) -> &PositionController {
        &self.position
    }

    pub fn attitude_controller(&self) -> &AttitudeController {
        &self.attitude
    }

    /// Run the outer loop directly against the controller's state
    ///
    /// This advances the live outer-loop PIDs outside a tick: integrators and
    /// derivative history of an armed controller change, and the next tick
    /// continues from them. Any error faults an armed controller, as a
    /// failing tick would.
    pub fn outer_step(
        &mut self,
        estimate: &StateEstimate,
        dt: f64,
    ) -> Result<AttitudeTarget, FlightError> {
        let result = self.position.outer_step(estimate, &self.setpoint, dt);
        if let Err(error) = &result {
            self.report_fault(error.clone());
        }
        result
    }
}
