//! WebSocket transport backed by `tokio-tungstenite`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use relaymq_protocols::{
    Transport, TransportError, TransportEvent, TransportFactory, TransportState,
};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Live WebSocket connection exposed through the transport capability.
///
/// `open` performs the handshake (announcing the configured sub-protocol),
/// then splits the stream into a write loop draining an mpsc queue of frames
/// and a read loop translating frames into [`TransportEvent`]s.
pub struct WsTransport {
    url: String,
    subprotocol: String,
    state: Arc<Mutex<TransportState>>,
    events: broadcast::Sender<TransportEvent>,
    writer: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, subprotocol: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            url: url.into(),
            subprotocol: subprotocol.into(),
            state: Arc::new(Mutex::new(TransportState::Closed)),
            events,
            writer: Mutex::new(None),
        }
    }

    /// Write loop: drains the frame queue into the socket. Stops after a
    /// close frame or a failed send.
    async fn run_write_loop(mut sink: WsSink, mut write_rx: mpsc::UnboundedReceiver<Message>) {
        while let Some(msg) = write_rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if let Err(e) = sink.send(msg).await {
                warn!(error = %e, "write failed, stopping write loop");
                break;
            }
            if closing {
                break;
            }
        }
    }

    /// Read loop: translates inbound frames into events. On exit the
    /// transport is Closed and subscribers have seen a `Closed` event.
    async fn run_read_loop(
        mut source: WsSource,
        state: Arc<Mutex<TransportState>>,
        events: broadcast::Sender<TransportEvent>,
    ) {
        while let Some(result) = source.next().await {
            match result {
                Ok(Message::Binary(data)) => {
                    let _ = events.send(TransportEvent::Data(Bytes::from(data)));
                }
                Ok(Message::Text(text)) => {
                    let _ = events.send(TransportEvent::Text(text));
                }
                Ok(Message::Close(_)) => {
                    debug!("received close frame");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "connection error");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break;
                }
            }
        }
        *state.lock() = TransportState::Closed;
        let _ = events.send(TransportEvent::Closed);
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self) -> Result<(), TransportError> {
        *self.state.lock() = TransportState::Connecting;

        let mut request = self.url.as_str().into_client_request().map_err(|e| {
            *self.state.lock() = TransportState::Closed;
            TransportError::Handshake(e.to_string())
        })?;
        let subprotocol = HeaderValue::from_str(&self.subprotocol).map_err(|e| {
            *self.state.lock() = TransportState::Closed;
            TransportError::Handshake(e.to_string())
        })?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, subprotocol);

        let (stream, _response) = match tokio_tungstenite::connect_async(request).await {
            Ok(connected) => connected,
            Err(e) => {
                *self.state.lock() = TransportState::Closed;
                let _ = self.events.send(TransportEvent::Error(e.to_string()));
                return Err(TransportError::Handshake(e.to_string()));
            }
        };

        info!(url = %self.url, "WebSocket connected");

        let (sink, source) = stream.split();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        *self.writer.lock() = Some(write_tx);

        tokio::spawn(Self::run_write_loop(sink, write_rx));
        tokio::spawn(Self::run_read_loop(
            source,
            self.state.clone(),
            self.events.clone(),
        ));

        *self.state.lock() = TransportState::Open;
        let _ = self.events.send(TransportEvent::Opened);
        Ok(())
    }

    async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let writer = self.writer.lock().clone();
        let Some(writer) = writer else {
            return Err(TransportError::NotOpen);
        };
        writer
            .send(Message::Binary(payload.to_vec()))
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        let writer = self.writer.lock().take();
        let Some(writer) = writer else {
            return Ok(());
        };
        *self.state.lock() = TransportState::Closing;
        debug!(url = %self.url, "closing WebSocket");
        writer
            .send(Message::Close(None))
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn state(&self) -> TransportState {
        *self.state.lock()
    }

    fn events(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

/// Factory producing [`WsTransport`] instances; the default for
/// [`WebSocketChannel`](crate::WebSocketChannel).
pub struct WsTransportFactory;

impl TransportFactory for WsTransportFactory {
    fn create(&self, url: &str, subprotocol: &str) -> Arc<dyn Transport> {
        Arc::new(WsTransport::new(url, subprotocol))
    }
}
