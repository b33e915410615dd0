use crate::retry::retry_with_backoff;
use crate::sensors::SensorSource;
use crate::state::{SensorHealth, TelemetryState};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use telemetry_common::{BackoffConfig, NodeConfig, Result, SensorFailurePolicy, TelemetryError};
use tokio::time::{interval, MissedTickBehavior};

/// Periodically reads the sensors and publishes full snapshots.
pub struct Sampler<S: SensorSource> {
    source: S,
    state: Arc<TelemetryState>,
    interval: Duration,
    backoff: BackoffConfig,
    policy: SensorFailurePolicy,
}

impl<S: SensorSource> Sampler<S> {
    pub fn new(source: S, state: Arc<TelemetryState>, config: &NodeConfig) -> Self {
        Self {
            source,
            state,
            interval: config.sample_interval,
            backoff: config.sensor_backoff,
            policy: config.sensor_failure_policy,
        }
    }

    /// Brings the sensors up with bounded retries.
    ///
    /// Under [`SensorFailurePolicy::Fatal`] exhaustion is returned as an error;
    /// under `Degraded` the node is marked degraded and `run` keeps retrying.
    pub async fn initialise(&mut self) -> Result<()> {
        info!("Initialising {} sensors...", self.source.name());
        let source = &mut self.source;
        match retry_with_backoff("Sensor initialisation", &self.backoff, || source.init()).await {
            Ok(()) => {
                self.state.set_health(SensorHealth::Online);
                info!("✓ Sensors initialised");
                Ok(())
            }
            Err(e) => match self.policy {
                SensorFailurePolicy::Fatal => {
                    error!("Sensors unavailable and failure policy is fatal: {}", e);
                    Err(TelemetryError::SensorError(format!("initialisation failed: {}", e)))
                }
                SensorFailurePolicy::Degraded => {
                    warn!("Sensors unavailable, continuing in degraded mode: {}", e);
                    self.state.set_health(SensorHealth::Degraded);
                    Ok(())
                }
            },
        }
    }

    /// One sampling cycle. A failed read keeps the previous snapshot.
    pub fn sample_once(&mut self) -> Result<()> {
        if self.state.health() == SensorHealth::Degraded {
            self.source.init()?;
            info!("Sensors recovered from degraded mode");
            self.state.set_health(SensorHealth::Online);
        }

        let readings = self.source.read()?;
        self.state.publish_sensor_snapshot(readings);
        Ok(())
    }

    pub async fn run(mut self) -> Result<()> {
        info!("Sensor sampling started with {} second interval", self.interval.as_secs());
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.sample_once() {
                warn!("Sensor sampling failed, keeping previous snapshot: {}", e);
            }
        }
    }
}
