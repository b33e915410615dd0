use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    #[error("Decryption error: {0}")]
    DecryptionError(String),

    #[error("Invalid padding: {0}")]
    InvalidPadding(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}
