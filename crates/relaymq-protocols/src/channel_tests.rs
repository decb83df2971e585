use super::*;

use std::collections::VecDeque;

/// Minimal in-memory channel: everything sent comes back as a delivery.
/// Exists to exercise the trait surface through a trait object.
struct LoopbackChannel {
    connected: bool,
    deliveries: VecDeque<Vec<u8>>,
    cursor: usize,
}

impl LoopbackChannel {
    fn new() -> Self {
        Self {
            connected: false,
            deliveries: VecDeque::new(),
            cursor: 0,
        }
    }
}

#[async_trait]
impl NetworkChannel for LoopbackChannel {
    async fn connect(&mut self) -> Result<(), ChannelError> {
        self.connected = true;
        Ok(())
    }

    async fn accept(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn send(&mut self, buf: &[u8]) -> Result<usize, ChannelError> {
        if !self.connected {
            return Ok(0);
        }
        self.deliveries.push_back(buf.to_vec());
        Ok(buf.len())
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        self.receive_within(buf, Duration::from_secs(30)).await
    }

    async fn receive_within(
        &mut self,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, ChannelError> {
        if !self.connected {
            return Err(ChannelError::NotConnected);
        }
        let Some(front) = self.deliveries.front() else {
            return Ok(0);
        };
        let n = buf.len().min(front.len() - self.cursor);
        buf[..n].copy_from_slice(&front[self.cursor..self.cursor + n]);
        self.cursor += n;
        if self.cursor == front.len() {
            self.deliveries.pop_front();
            self.cursor = 0;
        }
        Ok(n)
    }

    fn data_available(&self) -> bool {
        self.deliveries
            .front()
            .is_some_and(|d| self.cursor < d.len())
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.connected = false;
        Ok(())
    }
}

#[tokio::test]
async fn test_channel_roundtrip_through_trait_object() {
    let mut channel: Box<dyn NetworkChannel> = Box::new(LoopbackChannel::new());
    channel.connect().await.unwrap();

    let sent = channel.send(b"hello").await.unwrap();
    assert_eq!(sent, 5);
    assert!(channel.data_available());

    let mut buf = [0u8; 16];
    let n = channel.receive(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"hello");
    assert!(!channel.data_available());
}

#[tokio::test]
async fn test_send_before_connect_returns_zero() {
    let mut channel = LoopbackChannel::new();
    let sent = channel.send(b"dropped").await.unwrap();
    assert_eq!(sent, 0);
    assert!(!channel.data_available());
}

#[tokio::test]
async fn test_receive_before_connect_is_an_error() {
    let mut channel = LoopbackChannel::new();
    let mut buf = [0u8; 8];
    let result = channel.receive(&mut buf).await;
    assert!(matches!(result, Err(ChannelError::NotConnected)));
}

#[tokio::test]
async fn test_short_read_leaves_remainder_for_next_call() {
    let mut channel = LoopbackChannel::new();
    channel.connect().await.unwrap();
    channel.send(b"abcdef").await.unwrap();

    let mut buf = [0u8; 4];
    let n = channel.receive(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"abcd");
    assert!(channel.data_available());

    let n = channel.receive(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"ef");
    assert!(!channel.data_available());
}

#[tokio::test]
async fn test_accept_is_a_noop() {
    let mut channel = LoopbackChannel::new();
    channel.accept().await.unwrap();
    assert!(!channel.data_available());
}

#[tokio::test]
async fn test_receive_with_nothing_buffered_returns_zero() {
    let mut channel = LoopbackChannel::new();
    channel.connect().await.unwrap();
    let mut buf = [0u8; 8];
    let n = channel
        .receive_within(&mut buf, Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(n, 0);
}
