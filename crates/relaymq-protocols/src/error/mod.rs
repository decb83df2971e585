//! Error types for the relaymq protocol layer.

mod channel;
mod transport;

pub use channel::*;
pub use transport::*;
