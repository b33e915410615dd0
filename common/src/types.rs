use serde::{Deserialize, Serialize};

/// Raw pressure is reported in pascals; the wire carries hectopascals.
pub const PRESSURE_SCALE: f32 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One full sampling cycle across every attached sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    /// Barometric pressure, Pa
    pub pressure_pa: f32,
    /// Pressure sensor die temperature, °C
    pub ambient_temperature_c: f32,
    /// m/s²
    pub acceleration: Vector3,
    /// rad/s
    pub angular_velocity: Vector3,
    pub motion_temperature_c: f32,
    pub humidity_temperature_c: f32,
    pub relative_humidity: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub readings: SensorReadings,
    pub timestamp: String,
}

/// The plaintext handed to the cipher. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub pressure_bmp: f32,
    pub temp_bmp: f32,
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    pub temp_mpu: f32,
    pub temp_sht4: f32,
    pub humid_sht4: f32,
    pub current_time: String,
}

impl TelemetryPayload {
    pub fn from_snapshot(snapshot: &SensorSnapshot) -> Self {
        let r = &snapshot.readings;
        Self {
            pressure_bmp: r.pressure_pa / PRESSURE_SCALE,
            temp_bmp: r.ambient_temperature_c,
            ax: r.acceleration.x,
            ay: r.acceleration.y,
            az: r.acceleration.z,
            gx: r.angular_velocity.x,
            gy: r.angular_velocity.y,
            gz: r.angular_velocity.z,
            temp_mpu: r.motion_temperature_c,
            temp_sht4: r.humidity_temperature_c,
            humid_sht4: r.relative_humidity,
            current_time: snapshot.timestamp.clone(),
        }
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_field_order_and_formatting() {
        let snapshot = SensorSnapshot {
            readings: SensorReadings {
                pressure_pa: 100800.0,
                ambient_temperature_c: 24.5,
                ..Default::default()
            },
            timestamp: "Monday, January 01 2024 00:00:00".to_string(),
        };
        let json = String::from_utf8(TelemetryPayload::from_snapshot(&snapshot).to_json_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            "{\"pressure_bmp\":1008.0,\"temp_bmp\":24.5,\"ax\":0.0,\"ay\":0.0,\"az\":0.0,\
             \"gx\":0.0,\"gy\":0.0,\"gz\":0.0,\"temp_mpu\":0.0,\"temp_sht4\":0.0,\
             \"humid_sht4\":0.0,\"current_time\":\"Monday, January 01 2024 00:00:00\"}"
        );
    }
}
