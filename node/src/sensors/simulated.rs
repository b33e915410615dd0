use super::SensorSource;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use telemetry_common::{Result, SensorReadings, TelemetryError, Vector3};

const STANDARD_GRAVITY: f32 = 9.81;

/// Plausible readings for hosts without the sensor board attached.
pub struct SimulatedSensors {
    rng: StdRng,
    initialised: bool,
}

impl SimulatedSensors {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            initialised: false,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            initialised: false,
        }
    }

    fn noise(&mut self, amplitude: f32) -> f32 {
        self.rng.gen_range(-amplitude..=amplitude)
    }
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSource for SimulatedSensors {
    fn name(&self) -> &str {
        "simulated"
    }

    fn init(&mut self) -> Result<()> {
        self.initialised = true;
        info!("Simulated pressure, motion and humidity sensors ready");
        Ok(())
    }

    fn read(&mut self) -> Result<SensorReadings> {
        if !self.initialised {
            return Err(TelemetryError::SensorError("sensors not initialised".to_string()));
        }

        let ambient = self.rng.gen_range(20.0..30.0);
        let readings = SensorReadings {
            pressure_pa: self.rng.gen_range(100_000.0..102_000.0),
            ambient_temperature_c: ambient,
            acceleration: Vector3::new(
                self.noise(0.2),
                self.noise(0.2),
                STANDARD_GRAVITY + self.noise(0.2),
            ),
            angular_velocity: Vector3::new(self.noise(0.05), self.noise(0.05), self.noise(0.05)),
            motion_temperature_c: ambient + self.noise(1.0),
            humidity_temperature_c: ambient + self.noise(0.5),
            relative_humidity: self.rng.gen_range(30.0..70.0),
        };
        debug!("Simulated reading: {:?}", readings);
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_requires_init() {
        let mut sensors = SimulatedSensors::with_seed(1);
        assert!(sensors.read().is_err());
        sensors.init().unwrap();

        for _ in 0..100 {
            let r = sensors.read().unwrap();
            assert!((100_000.0..102_000.0).contains(&r.pressure_pa));
            assert!((30.0..70.0).contains(&r.relative_humidity));
            assert!((r.acceleration.z - STANDARD_GRAVITY).abs() < 0.21);
        }
    }
}
