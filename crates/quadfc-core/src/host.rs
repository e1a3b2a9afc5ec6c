//! Host collaborator seams
//!
//! The control core holds no device handles. A host (simulator or flight
//! hardware) supplies samples and consumes rotor commands through
//! [`FlightHost`]; setpoints arrive through a [`SetpointSource`].
//! [`ControlLoop`] wires one of each to a [`FlightController`].

use std::sync::{Arc, Mutex};

use log::warn;

use crate::driver::{FlightController, FlightMode};
use crate::error::FlightError;
use crate::types::{RotorCommand, SensorSample, Setpoint};

/// Device access provided by the host
pub trait FlightHost {
    /// Read inertial unit, gyroscope, GPS and clock as one sample
    fn read_sensors(&mut self) -> Result<SensorSample, FlightError>;

    /// Command rotor velocities, ordered FL, FR, RL, RR
    fn set_rotor_velocities(&mut self, command: &RotorCommand) -> Result<(), FlightError>;
}

/// Source of operator/planner setpoints
pub trait SetpointSource {
    /// Newest setpoint since the last poll, if any
    fn poll(&mut self) -> Option<Setpoint>;
}

/// Single-slot setpoint mailbox, last write wins
///
/// Clones share the slot, so an operator thread can hold one end while the
/// control loop polls the other.
#[derive(Debug, Clone, Default)]
pub struct SharedSetpoint {
    slot: Arc<Mutex<Option<Setpoint>>>,
}

impl SharedSetpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a setpoint, replacing any not yet consumed
    pub fn publish(&self, setpoint: Setpoint) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(setpoint);
    }
}

impl SetpointSource for SharedSetpoint {
    fn poll(&mut self) -> Option<Setpoint> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.take()
    }
}

/// Fixed-timestep loop over a host
///
/// Each [`step`](ControlLoop::step) reads one sample, applies the newest
/// setpoint, ticks the controller and actuates exactly one rotor command.
pub struct ControlLoop<H: FlightHost> {
    host: H,
    controller: FlightController,
    setpoints: Option<Box<dyn SetpointSource>>,
}

impl<H: FlightHost> ControlLoop<H> {
    /// Wrap a host and stop all rotors
    pub fn new(mut host: H, controller: FlightController) -> Result<Self, FlightError> {
        host.set_rotor_velocities(&RotorCommand::zero())?;
        Ok(Self {
            host,
            controller,
            setpoints: None,
        })
    }

    pub fn with_setpoint_source(mut self, source: impl SetpointSource + 'static) -> Self {
        self.setpoints = Some(Box::new(source));
        self
    }

    /// Run one tick
    ///
    /// A failed sensor read faults an armed controller; zeros are still
    /// actuated. Only an actuation failure is returned as an error.
    pub fn step(&mut self) -> Result<RotorCommand, FlightError> {
        if let Some(setpoint) = self.setpoints.as_mut().and_then(|s| s.poll()) {
            self.controller.set_setpoint(setpoint);
        }

        let command = match self.host.read_sensors() {
            Ok(sample) => self.controller.tick(sample),
            Err(error) => {
                warn!("sensor read failed: {error}");
                self.controller.report_fault(error);
                RotorCommand::zero()
            }
        };

        self.host.set_rotor_velocities(&command)?;
        Ok(command)
    }

    /// Read a fresh sample from the host and arm against its timestamp
    ///
    /// No-op when already armed; the pre-arm tick only runs outside `Armed`.
    pub fn arm(&mut self) -> Result<(), FlightError> {
        if self.controller.is_armed() {
            return Ok(());
        }
        let sample = self.host.read_sensors()?;
        let now = sample.timestamp;
        let command = self.controller.tick(sample);
        self.host.set_rotor_velocities(&command)?;
        self.controller.arm(now)
    }

    pub fn disarm(&mut self) -> Result<(), FlightError> {
        self.controller.disarm()?;
        self.host.set_rotor_velocities(&RotorCommand::zero())
    }

    pub fn reset(&mut self) -> Result<(), FlightError> {
        self.controller.reset();
        self.host.set_rotor_velocities(&RotorCommand::zero())
    }

    pub fn mode(&self) -> FlightMode {
        self.controller.mode()
    }

    pub fn controller(&self) -> &FlightController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut FlightController {
        &mut self.controller
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Give the host back, e.g. to inspect a simulator after a run
    pub fn into_host(self) -> H {
        self.host
    }
}
