use log::{error, warn};
use telemetry_common::{BackoffConfig, Result};

/// Runs `op` until it succeeds or `backoff.max_attempts` is spent, sleeping
/// with exponential backoff between attempts. Returns the last error.
pub async fn retry_with_backoff<T, F>(what: &str, backoff: &BackoffConfig, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= backoff.max_attempts => {
                error!("{} failed after {} attempt(s): {}", what, attempt, e);
                return Err(e);
            }
            Err(e) => {
                let delay = backoff.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what, attempt, backoff.max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
