//! Transport errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Transport is not open")]
    NotOpen,

    #[error("Send failed: {0}")]
    Send(String),
}
