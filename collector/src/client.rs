//! HTTP client side of the node protocol: handshake, then fetch and decrypt.

use log::{debug, info, warn};
use num_bigint::BigUint;
use reqwest::Client;
use std::time::Duration;
use telemetry_common::encryption::{decode_telemetry, DhParams, KeyAgreement};
use telemetry_common::{Result, TelemetryError, TelemetryPayload};

pub struct CollectorClient {
    http_client: Client,
    node_url: String,
    key_agreement: KeyAgreement,
}

impl CollectorClient {
    /// `params` must match the group the node was started with.
    pub fn new(node_url: &str, params: DhParams) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| TelemetryError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            node_url: node_url.trim_end_matches('/').to_string(),
            key_agreement: KeyAgreement::generate(params),
        })
    }

    pub fn public_value(&self) -> &BigUint {
        self.key_agreement.public_value()
    }

    pub fn shared_secret(&self) -> Option<BigUint> {
        self.key_agreement.shared_secret()
    }

    /// Sends our public value, reads the node's and derives the shared secret.
    /// Calling it again starts a fresh session on both sides.
    pub async fn perform_key_exchange(&self) -> Result<BigUint> {
        let response = self
            .http_client
            .get(format!("{}/dh-key-exchange", self.node_url))
            .query(&[("public_key", self.public_value().to_string())])
            .send()
            .await
            .map_err(|e| TelemetryError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TelemetryError::NetworkError(e.to_string()))?;
        if !status.is_success() {
            return Err(TelemetryError::NetworkError(format!(
                "Key exchange failed: {} {}", status, body.trim()
            )));
        }

        let node_public = body.trim().parse::<BigUint>().map_err(|e| {
            TelemetryError::InvalidParameter(format!("node public value: {}", e))
        })?;
        let shared_secret = self.key_agreement.accept_peer_value(&node_public)?;
        info!("Key exchange with {} completed", self.node_url);
        Ok(shared_secret)
    }

    /// Fetches one telemetry record. Fails with `KeyNotEstablished` before
    /// [`perform_key_exchange`](Self::perform_key_exchange), and with
    /// `SessionStale` once another handshake has replaced our session on the node.
    pub async fn fetch_telemetry(&self) -> Result<TelemetryPayload> {
        let shared_secret = self
            .key_agreement
            .shared_secret()
            .ok_or(TelemetryError::KeyNotEstablished)?;

        let response = self
            .http_client
            .get(format!("{}/sensor", self.node_url))
            .send()
            .await
            .map_err(|e| TelemetryError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TelemetryError::NetworkError(e.to_string()))?;
        if status == reqwest::StatusCode::CONFLICT {
            return Err(TelemetryError::KeyNotEstablished);
        }
        if !status.is_success() {
            return Err(TelemetryError::NetworkError(format!(
                "Telemetry request failed: {} {}", status, body.trim()
            )));
        }

        debug!("Encrypted telemetry: {}", body.trim());
        decode_telemetry(&shared_secret, &body).map_err(|e| match e {
            TelemetryError::EncryptionError(msg) | TelemetryError::SerializationError(msg) => {
                TelemetryError::SessionStale(msg)
            }
            other => other,
        })
    }

    /// Like [`fetch_telemetry`](Self::fetch_telemetry), but repeats the key
    /// exchange and fetches again when we have no usable session.
    pub async fn fetch_or_rekey(&self) -> Result<TelemetryPayload> {
        match self.fetch_telemetry().await {
            Err(TelemetryError::KeyNotEstablished) | Err(TelemetryError::SessionStale(_)) => {
                warn!("No usable session with {}, repeating key exchange", self.node_url);
                self.perform_key_exchange().await?;
                self.fetch_telemetry().await
            }
            result => result,
        }
    }
}
