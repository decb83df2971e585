//! Channel errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connect timed out after {0} ms")]
    ConnectTimeout(u64),

    #[error("Send failed: {0}")]
    SendFailed(String),
}
