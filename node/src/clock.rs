//! Timestamp producers: a fast local clock refresh and a slow resync.

use crate::retry::retry_with_backoff;
use crate::state::TelemetryState;
use chrono::{DateTime, Datelike, FixedOffset, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use telemetry_common::{BackoffConfig, Result, TelemetryError};
use tokio::time::{interval, MissedTickBehavior};

pub const TIMESTAMP_FORMAT: &str = "%A, %B %d %Y %H:%M:%S";

/// Clocks reading earlier than this have never been synchronised.
const MIN_VALID_YEAR: i32 = 2016;

const RESYNC_BACKOFF: BackoffConfig = BackoffConfig {
    max_attempts: 3,
    base_delay: Duration::from_secs(1),
    max_delay: Duration::from_secs(4),
};

pub trait TimeSource: Send + Sync {
    fn local_time(&self) -> Result<DateTime<FixedOffset>>;

    /// Asks the external time service to refresh the local clock. The new
    /// time may take a moment to settle.
    fn resync(&self) -> Result<()>;
}

/// Host clock shifted to a fixed UTC offset. The host keeps its own clock
/// disciplined, so a resync only checks that it is sane.
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(utc_offset_secs: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_secs).ok_or_else(|| {
            TelemetryError::ConfigError(format!("Invalid UTC offset: {}", utc_offset_secs))
        })?;
        Ok(Self { offset })
    }
}

impl TimeSource for SystemClock {
    fn local_time(&self) -> Result<DateTime<FixedOffset>> {
        let now = Utc::now().with_timezone(&self.offset);
        if now.year() < MIN_VALID_YEAR {
            return Err(TelemetryError::ClockError(format!(
                "clock not synchronised (year {})", now.year()
            )));
        }
        Ok(now)
    }

    fn resync(&self) -> Result<()> {
        self.local_time().map(|_| ())
    }
}

pub fn format_timestamp(time: &DateTime<FixedOffset>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub struct ClockTasks {
    source: Arc<dyn TimeSource>,
    state: Arc<TelemetryState>,
}

impl ClockTasks {
    pub fn new(source: Arc<dyn TimeSource>, state: Arc<TelemetryState>) -> Self {
        Self { source, state }
    }

    /// Reads local time and publishes it.
    pub fn refresh_local(&self) -> Result<String> {
        let timestamp = format_timestamp(&self.source.local_time()?);
        self.state.publish_timestamp(timestamp.clone());
        Ok(timestamp)
    }

    /// Resync, let the clock settle, then publish. On failure nothing is published.
    pub async fn resync_once(&self, settle: Duration, backoff: &BackoffConfig) -> Result<String> {
        let source = &self.source;
        retry_with_backoff("Time resync", backoff, || source.resync()).await?;
        tokio::time::sleep(settle).await;
        self.refresh_local()
    }

    pub async fn run_local(self: Arc<Self>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.refresh_local() {
                Ok(timestamp) => debug!("{}", timestamp),
                Err(e) => warn!("Failed to obtain local time: {}", e),
            }
        }
    }

    pub async fn run_resync(self: Arc<Self>, period: Duration, settle: Duration) {
        info!("Time resync every {} seconds", period.as_secs());
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            info!("Updating time from time service...");
            match self.resync_once(settle, &RESYNC_BACKOFF).await {
                Ok(timestamp) => info!("Time successfully updated: {}", timestamp),
                Err(e) => error!("Failed to obtain updated time after resync: {}", e),
            }
        }
    }
}
