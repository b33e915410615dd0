use crate::encryption::{DhGroup, DhParams};
use crate::error::{Result, TelemetryError};
use num_bigint::BigUint;
use std::str::FromStr;
use std::time::Duration;

/// What the node does once sensor initialisation runs out of retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFailurePolicy {
    /// Abort startup so a supervisor restarts the process.
    Fatal,
    /// Keep serving with the last (initially empty) snapshot and keep retrying.
    Degraded,
}

impl FromStr for SensorFailurePolicy {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fatal" => Ok(SensorFailurePolicy::Fatal),
            "degraded" => Ok(SensorFailurePolicy::Degraded),
            other => Err(TelemetryError::ConfigError(format!(
                "Unknown sensor failure policy: {}", other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl BackoffConfig {
    /// Delay before retry number `attempt` (1-based), doubling up to `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map(|d| d.min(self.max_delay))
            .unwrap_or(self.max_delay)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub http_workers: usize,
    pub utc_offset_secs: i32,
    pub sample_interval: Duration,
    pub clock_interval: Duration,
    pub resync_interval: Duration,
    pub resync_settle: Duration,
    pub sensor_backoff: BackoffConfig,
    pub sensor_failure_policy: SensorFailurePolicy,
    pub dh_params: DhParams,
}

impl NodeConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source; `load` reads the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    TelemetryError::ConfigError(format!("{} must be an unsigned integer, got {:?}", key, raw))
                }),
                None => Ok(default),
            }
        };

        let utc_offset_secs = match lookup("UTC_OFFSET_SECS") {
            Some(raw) => raw.trim().parse::<i32>().map_err(|_| {
                TelemetryError::ConfigError(format!("UTC_OFFSET_SECS must be an integer, got {:?}", raw))
            })?,
            None => 7 * 3600,
        };
        if utc_offset_secs.abs() >= 24 * 3600 {
            return Err(TelemetryError::ConfigError(format!(
                "UTC_OFFSET_SECS out of range: {}", utc_offset_secs
            )));
        }

        let sensor_backoff = BackoffConfig {
            max_attempts: u32::try_from(parse("SENSOR_INIT_ATTEMPTS", 5)?.max(1)).map_err(|_| {
                TelemetryError::ConfigError("SENSOR_INIT_ATTEMPTS exceeds u32::MAX".to_string())
            })?,
            base_delay: Duration::from_millis(parse("SENSOR_BACKOFF_BASE_MS", 500)?),
            max_delay: Duration::from_millis(parse("SENSOR_BACKOFF_MAX_MS", 8000)?),
        };

        let sensor_failure_policy = lookup("SENSOR_FAILURE_POLICY")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(SensorFailurePolicy::Degraded);

        let config = Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            http_workers: parse("HTTP_WORKERS", 2)?.max(1) as usize,
            utc_offset_secs,
            sample_interval: Duration::from_secs(parse("SAMPLE_INTERVAL_SECS", 10)?),
            clock_interval: Duration::from_secs(parse("CLOCK_INTERVAL_SECS", 1)?),
            resync_interval: Duration::from_secs(parse("RESYNC_INTERVAL_SECS", 60)?),
            resync_settle: Duration::from_secs(parse("RESYNC_SETTLE_SECS", 2)?),
            sensor_backoff,
            sensor_failure_policy,
            dh_params: Self::dh_params_from(&lookup)?,
        };

        for (name, interval) in [
            ("SAMPLE_INTERVAL_SECS", config.sample_interval),
            ("CLOCK_INTERVAL_SECS", config.clock_interval),
            ("RESYNC_INTERVAL_SECS", config.resync_interval),
        ] {
            if interval.is_zero() {
                return Err(TelemetryError::ConfigError(format!("{} must be positive", name)));
            }
        }

        Ok(config)
    }

    fn dh_params_from<F>(lookup: &F) -> Result<DhParams>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_big = |key: &str| -> Result<Option<BigUint>> {
            lookup(key)
                .map(|raw| {
                    raw.trim().parse::<BigUint>().map_err(|_| {
                        TelemetryError::ConfigError(format!("{} must be a decimal integer", key))
                    })
                })
                .transpose()
        };

        match (parse_big("DH_MODULUS")?, parse_big("DH_GENERATOR")?) {
            (Some(modulus), Some(generator)) => DhParams::new(modulus, generator)
                .map_err(|e| TelemetryError::ConfigError(e.to_string())),
            (None, None) => {
                let group = lookup("DH_GROUP")
                    .map(|v| v.parse::<DhGroup>())
                    .transpose()?
                    .unwrap_or(DhGroup::Modp2048);
                DhParams::from_group(group).map_err(|e| TelemetryError::ConfigError(e.to_string()))
            }
            _ => Err(TelemetryError::ConfigError(
                "DH_MODULUS and DH_GENERATOR must be set together".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<NodeConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NodeConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.sample_interval, Duration::from_secs(10));
        assert_eq!(config.clock_interval, Duration::from_secs(1));
        assert_eq!(config.resync_interval, Duration::from_secs(60));
        assert_eq!(config.resync_settle, Duration::from_secs(2));
        assert_eq!(config.utc_offset_secs, 25200);
        assert_eq!(config.sensor_failure_policy, SensorFailurePolicy::Degraded);
        assert_eq!(config.dh_params.bits(), 2048);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DH_GROUP", "demo"),
            ("SENSOR_FAILURE_POLICY", "FATAL"),
            ("SAMPLE_INTERVAL_SECS", "3"),
            ("UTC_OFFSET_SECS", "-18000"),
        ])
        .unwrap();
        assert_eq!(config.dh_params.modulus, BigUint::from(23u32));
        assert_eq!(config.sensor_failure_policy, SensorFailurePolicy::Fatal);
        assert_eq!(config.sample_interval, Duration::from_secs(3));
        assert_eq!(config.utc_offset_secs, -18000);

        let custom = config_from(&[("DH_MODULUS", "23"), ("DH_GENERATOR", "5")]).unwrap();
        assert_eq!(custom.dh_params.generator, BigUint::from(5u32));
    }

    #[test]
    fn test_malformed_values_rejected() {
        assert!(config_from(&[("SAMPLE_INTERVAL_SECS", "ten")]).is_err());
        assert!(config_from(&[("SAMPLE_INTERVAL_SECS", "0")]).is_err());
        assert!(config_from(&[("SENSOR_FAILURE_POLICY", "ignore")]).is_err());
        assert!(config_from(&[("DH_MODULUS", "23")]).is_err());
        assert!(config_from(&[("DH_MODULUS", "23"), ("DH_GENERATOR", "1")]).is_err());
        assert!(config_from(&[("UTC_OFFSET_SECS", "90000")]).is_err());
    }

    #[test]
    fn test_sensor_attempts_out_of_range() {
        let err = config_from(&[("SENSOR_INIT_ATTEMPTS", "4294967296")]).unwrap_err();
        assert!(matches!(err, TelemetryError::ConfigError(_)));

        let config = config_from(&[("SENSOR_INIT_ATTEMPTS", "4294967295")]).unwrap();
        assert_eq!(config.sensor_backoff.max_attempts, u32::MAX);
        let config = config_from(&[("SENSOR_INIT_ATTEMPTS", "0")]).unwrap();
        assert_eq!(config.sensor_backoff.max_attempts, 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let backoff = BackoffConfig {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(4), Duration::from_millis(800));
        assert_eq!(backoff.delay_for(5), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for(40), Duration::from_millis(1000));
    }
}
