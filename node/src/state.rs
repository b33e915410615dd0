//! Live telemetry shared between the periodic producers and the request path.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use telemetry_common::{SensorReadings, SensorSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorHealth {
    Starting,
    Online,
    Degraded,
}

/// The node's single telemetry record.
///
/// Sensor fields and the timestamp live behind one lock, so a reader always
/// gets the readings of exactly one sampling cycle. Writers hold the lock only
/// for the assignment; readers only for the clone.
pub struct TelemetryState {
    snapshot: RwLock<SensorSnapshot>,
    health: RwLock<SensorHealth>,
    samples: AtomicU64,
}

impl TelemetryState {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(SensorSnapshot::default()),
            health: RwLock::new(SensorHealth::Starting),
            samples: AtomicU64::new(0),
        }
    }

    /// Replaces every sensor field at once. The timestamp is left alone.
    pub fn publish_sensor_snapshot(&self, readings: SensorReadings) {
        self.snapshot.write().readings = readings;
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    /// Last writer wins; the clock tasks do not coordinate with each other.
    pub fn publish_timestamp(&self, timestamp: String) {
        self.snapshot.write().timestamp = timestamp;
    }

    pub fn read_snapshot(&self) -> SensorSnapshot {
        self.snapshot.read().clone()
    }

    pub fn current_timestamp(&self) -> String {
        self.snapshot.read().timestamp.clone()
    }

    pub fn set_health(&self, health: SensorHealth) {
        *self.health.write() = health;
    }

    pub fn health(&self) -> SensorHealth {
        *self.health.read()
    }

    /// Number of snapshots published since startup.
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_common::Vector3;

    #[test]
    fn test_timestamp_and_readings_are_independent() {
        let state = TelemetryState::new();
        state.publish_timestamp("Monday, January 01 2024 00:00:00".to_string());

        let readings = SensorReadings {
            pressure_pa: 100800.0,
            acceleration: Vector3::new(0.1, 0.2, 9.8),
            ..Default::default()
        };
        state.publish_sensor_snapshot(readings);

        let snapshot = state.read_snapshot();
        assert_eq!(snapshot.readings, readings);
        assert_eq!(snapshot.timestamp, "Monday, January 01 2024 00:00:00");
        assert_eq!(state.samples(), 1);

        state.publish_timestamp("Monday, January 01 2024 00:00:01".to_string());
        assert_eq!(state.read_snapshot().readings, readings);
    }

    #[test]
    fn test_health_transitions() {
        let state = TelemetryState::default();
        assert_eq!(state.health(), SensorHealth::Starting);
        state.set_health(SensorHealth::Degraded);
        assert_eq!(state.health(), SensorHealth::Degraded);
        assert_eq!(serde_json::to_string(&state.health()).unwrap(), "\"degraded\"");
    }
}
