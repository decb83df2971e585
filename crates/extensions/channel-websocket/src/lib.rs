//! # relaymq Channel - WebSocket
//!
//! WebSocket network channel for MQTT clients.
//!
//! This channel lets a message protocol client that expects a byte-stream
//! transport run over a WebSocket connection instead of a raw TCP socket:
//!
//! - Dials `{ws|wss}://host:port/mqtt`, announcing the `mqtt` sub-protocol
//! - Buffers inbound binary frames in a bounded FIFO for timed receives
//! - Exposes the whole thing through the [`NetworkChannel`] contract, so the
//!   protocol layer above stays unaware of WebSockets
//!
//! ## Usage
//!
//! ```ignore
//! use relaymq_channel_websocket::{WebSocketChannel, WebSocketChannelConfig};
//! use relaymq_protocols::NetworkChannel;
//!
//! let config = WebSocketChannelConfig {
//!     host: "broker.example.com".to_string(),
//!     port: 443,
//!     secure: true,
//!     ..Default::default()
//! };
//! let mut channel = WebSocketChannel::new(config);
//! channel.connect().await?;
//! channel.send(&connect_packet).await?;
//! let n = channel.receive(&mut buf).await?;
//! ```

mod inbound;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use relaymq_protocols::{
    ChannelError, NetworkChannel, Transport, TransportEvent, TransportFactory, TransportState,
};

use crate::inbound::Inbound;

pub use transport::{WsTransport, WsTransportFactory};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Sub-protocol announced during the WebSocket handshake.
pub const MQTT_SUBPROTOCOL: &str = "mqtt";

/// Request path brokers serve MQTT-over-WebSocket on.
const MQTT_PATH: &str = "/mqtt";

/// WebSocket channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketChannelConfig {
    /// Broker host to dial (default: "127.0.0.1").
    #[serde(default = "default_host")]
    pub host: String,
    /// Broker port (default: 80).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Dial `wss` (TLS) instead of `ws` (default: false).
    #[serde(default)]
    pub secure: bool,
    /// Connect timeout in milliseconds (default: 10000).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Receive timeout in milliseconds (default: 30000).
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
    /// Maximum buffered inbound deliveries before the oldest is dropped
    /// (default: 32). Capacity 1 keeps only the latest delivery.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    80
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_receive_timeout_ms() -> u64 {
    30_000
}

fn default_queue_capacity() -> usize {
    32
}

impl Default for WebSocketChannelConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secure: false,
            connect_timeout_ms: default_connect_timeout_ms(),
            receive_timeout_ms: default_receive_timeout_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl WebSocketChannelConfig {
    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Receive timeout as a duration.
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

/// WebSocket channel for MQTT clients.
///
/// Owns at most one live transport at a time. Inbound deliveries arrive on
/// the transport's own tasks and are buffered; `receive` drains them on the
/// caller side with a bounded wait.
pub struct WebSocketChannel {
    config: WebSocketChannelConfig,
    url: String,
    factory: Arc<dyn TransportFactory>,
    transport: Option<Arc<dyn Transport>>,
    inbound: Arc<Inbound>,
    pump: Option<JoinHandle<()>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl WebSocketChannel {
    /// Create a channel dialing over `tokio-tungstenite`.
    pub fn new(config: WebSocketChannelConfig) -> Self {
        Self::with_factory(config, Arc::new(WsTransportFactory))
    }

    /// Create a channel over a custom transport factory.
    ///
    /// Any implementation of the transport capability set is a valid
    /// substitute for the built-in WebSocket one.
    pub fn with_factory(
        config: WebSocketChannelConfig,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        let scheme = if config.secure { "wss" } else { "ws" };
        let url = format!("{}://{}:{}{}", scheme, config.host, config.port, MQTT_PATH);
        let inbound = Arc::new(Inbound::new(config.queue_capacity));
        Self {
            config,
            url,
            factory,
            transport: None,
            inbound,
            pump: None,
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    /// The connection URL this channel dials.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Lifecycle state of the underlying transport; `Closed` before the
    /// first connect.
    pub fn state(&self) -> TransportState {
        self.transport
            .as_ref()
            .map_or(TransportState::Closed, |t| t.state())
    }

    /// Most recent transport failure, if any, since the last connect.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Close and discard the previous transport before dialing again.
    async fn teardown_previous(&mut self) {
        if let Some(old) = self.transport.take() {
            if old.state().is_open() {
                if let Err(e) = old.close().await {
                    debug!(error = %e, "previous transport close failed");
                }
            }
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.inbound.clear();
        self.last_error.lock().take();
    }

    /// Wait until the transport reports Open, bounded by the connect
    /// timeout. The receiver must have been subscribed before `open` was
    /// initiated.
    async fn await_open(
        &self,
        transport: &Arc<dyn Transport>,
        mut events: broadcast::Receiver<TransportEvent>,
    ) -> Result<(), ChannelError> {
        let deadline = Instant::now() + self.config.connect_timeout();
        while !transport.state().is_open() {
            let event = tokio::select! {
                event = events.recv() => event,
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(ChannelError::ConnectTimeout(self.config.connect_timeout_ms));
                }
            };
            match event {
                Ok(TransportEvent::Opened) => break,
                Ok(TransportEvent::Error(e)) => return Err(ChannelError::ConnectionFailed(e)),
                Ok(TransportEvent::Closed) => {
                    return Err(ChannelError::ConnectionFailed(
                        "transport closed during connect".to_string(),
                    ));
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(ChannelError::ConnectionFailed(
                        "transport event stream ended".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Translate transport events into channel effects: data is buffered,
/// failures are retained for inspection, everything else is traced.
async fn pump_events(
    mut events: broadcast::Receiver<TransportEvent>,
    inbound: Arc<Inbound>,
    last_error: Arc<Mutex<Option<String>>>,
) {
    loop {
        match events.recv().await {
            Ok(TransportEvent::Opened) => debug!("transport opened"),
            Ok(TransportEvent::Data(payload)) => inbound.push(payload),
            Ok(TransportEvent::Text(text)) => {
                debug!(len = text.len(), "ignoring text delivery");
            }
            Ok(TransportEvent::Error(e)) => {
                warn!(error = %e, "transport error");
                *last_error.lock() = Some(e);
                inbound.wake();
            }
            Ok(TransportEvent::Closed) => {
                debug!("transport closed");
                inbound.wake();
                break;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "transport event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[async_trait]
impl NetworkChannel for WebSocketChannel {
    async fn connect(&mut self) -> Result<(), ChannelError> {
        self.teardown_previous().await;

        let transport = self.factory.create(&self.url, MQTT_SUBPROTOCOL);
        let opened_rx = transport.events();
        self.pump = Some(tokio::spawn(pump_events(
            transport.events(),
            self.inbound.clone(),
            self.last_error.clone(),
        )));
        self.transport = Some(transport.clone());

        debug!(url = %self.url, "connecting");
        transport
            .open()
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;
        self.await_open(&transport, opened_rx).await
    }

    /// No-op: this channel only dials out.
    async fn accept(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn send(&mut self, buf: &[u8]) -> Result<usize, ChannelError> {
        let Some(transport) = &self.transport else {
            return Ok(0);
        };
        transport
            .send(buf)
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        Ok(buf.len())
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        let timeout = self.config.receive_timeout();
        self.receive_within(buf, timeout).await
    }

    async fn receive_within(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, ChannelError> {
        let Some(transport) = &self.transport else {
            return Err(ChannelError::NotConnected);
        };
        let deadline = Instant::now() + timeout;
        loop {
            // Enable the waiter before checking, so a push landing between
            // the check and the await still wakes us.
            let notified = self.inbound.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(n) = self.inbound.copy_into(buf) {
                return Ok(n);
            }
            if !transport.state().is_open() {
                return Ok(0);
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(deadline) => return Ok(0),
            }
        }
    }

    fn data_available(&self) -> bool {
        self.inbound.data_available()
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if let Some(transport) = &self.transport {
            if transport.state().is_open() {
                if let Err(e) = transport.close().await {
                    warn!(error = %e, "close request failed");
                }
            }
        }
        Ok(())
    }
}
