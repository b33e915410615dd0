use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::net::AddrParseError;
use thiserror::Error;
use crate::encryption::error::EncryptionError;

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("{0}")]
    MissingParameter(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("key not established")]
    KeyNotEstablished,
    /// The peer answered, but not under the key we hold.
    #[error("Session stale: {0}")]
    SessionStale(String),
    #[error("Encryption error: {0}")]
    EncryptionError(String),
    #[error("Sensor error: {0}")]
    SensorError(String),
    #[error("Clock error: {0}")]
    ClockError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::SerializationError(err.to_string())
    }
}

impl From<AddrParseError> for TelemetryError {
    fn from(err: AddrParseError) -> Self {
        TelemetryError::ConfigError(err.to_string())
    }
}

impl From<base64::DecodeError> for TelemetryError {
    fn from(err: base64::DecodeError) -> Self {
        TelemetryError::SerializationError(err.to_string())
    }
}

impl From<EncryptionError> for TelemetryError {
    fn from(err: EncryptionError) -> Self {
        TelemetryError::EncryptionError(err.to_string())
    }
}

impl ResponseError for TelemetryError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::KeyNotEstablished | Self::SessionStale(_) => StatusCode::CONFLICT,
            Self::EncryptionError(_) |
            Self::SensorError(_) |
            Self::ClockError(_) |
            Self::NetworkError(_) |
            Self::SerializationError(_) |
            Self::ConfigError(_) |
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type(ContentType::plaintext())
            .body(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_map_to_client_errors() {
        let missing = TelemetryError::MissingParameter("public key missing".to_string());
        assert_eq!(missing.error_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.to_string(), "public key missing");

        let invalid = TelemetryError::InvalidParameter("not a number".to_string());
        assert_eq!(invalid.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_precondition_error_is_conflict() {
        let err = TelemetryError::KeyNotEstablished;
        assert_eq!(err.error_response().status(), StatusCode::CONFLICT);
        let stale = TelemetryError::SessionStale("Invalid padding".to_string());
        assert_eq!(stale.error_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_encryption_error_conversion() {
        let err: TelemetryError = EncryptionError::InvalidPadding("pad byte 0".to_string()).into();
        assert!(matches!(err, TelemetryError::EncryptionError(_)));
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
