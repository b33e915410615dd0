pub mod error;
pub mod aes_cbc;
pub mod handshake;

pub use error::EncryptionError;
pub use aes_cbc::{TelemetryCipher, derive_key, pad, remove_padding, BLOCK_SIZE, IV_SIZE, KEY_SIZE};
pub use handshake::{DhGroup, DhParams, KeyAgreement, Session, generate_keypair, mod_exp, parse_public_value};

use crate::error::Result;
use crate::types::TelemetryPayload;
use num_bigint::BigUint;

/// Text form of an `IV || ciphertext` envelope.
pub fn encode_envelope(envelope: &[u8]) -> String {
    base64::encode(envelope)
}

pub fn decode_envelope(text: &str) -> Result<Vec<u8>> {
    Ok(base64::decode(text.trim())?)
}

/// Decodes, decrypts and parses one `/sensor` response body.
pub fn decode_telemetry(shared_secret: &BigUint, text: &str) -> Result<TelemetryPayload> {
    let cipher = TelemetryCipher::from_shared_secret(shared_secret)?;
    let envelope = decode_envelope(text)?;
    let plaintext = cipher.decrypt(&envelope)?;
    Ok(serde_json::from_slice(&plaintext)?)
}
