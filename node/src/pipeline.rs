use crate::state::TelemetryState;
use log::debug;
use std::sync::Arc;
use telemetry_common::encryption::{encode_envelope, KeyAgreement, TelemetryCipher};
use telemetry_common::{Result, TelemetryError, TelemetryPayload};

/// Turns the current snapshot into a transport-ready ciphertext.
#[derive(Clone)]
pub struct TelemetryPipeline {
    state: Arc<TelemetryState>,
    key_agreement: Arc<KeyAgreement>,
}

impl TelemetryPipeline {
    pub fn new(state: Arc<TelemetryState>, key_agreement: Arc<KeyAgreement>) -> Self {
        Self { state, key_agreement }
    }

    /// Encrypts the current snapshot under a key derived from the current
    /// shared secret and returns `base64(IV || ciphertext)`.
    ///
    /// Fails with [`TelemetryError::KeyNotEstablished`] before any handshake.
    pub fn run(&self) -> Result<String> {
        let shared_secret = self
            .key_agreement
            .shared_secret()
            .ok_or(TelemetryError::KeyNotEstablished)?;

        let snapshot = self.state.read_snapshot();
        let plaintext = TelemetryPayload::from_snapshot(&snapshot).to_json_bytes()?;

        let cipher = TelemetryCipher::from_shared_secret(&shared_secret)?;
        let envelope = cipher.encrypt(&plaintext);
        debug!(
            "Encrypted {} byte payload into {} bytes (key {})",
            plaintext.len(),
            envelope.len(),
            cipher.key_fingerprint()
        );

        Ok(encode_envelope(&envelope))
    }
}
