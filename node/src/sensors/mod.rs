//! Sensor acquisition boundary.
//!
//! Register-level drivers live outside this crate; the node only needs
//! something that can be brought up and then asked for a full reading.

mod simulated;

pub use simulated::SimulatedSensors;

use telemetry_common::{Result, SensorReadings};

pub trait SensorSource: Send {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Probes and configures the devices. May be called again after a failure.
    fn init(&mut self) -> Result<()>;

    /// Reads every channel in one cycle.
    fn read(&mut self) -> Result<SensorReadings>;
}
