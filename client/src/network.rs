//! Bincode-over-WebSocket transport with the reconnect policy.
//!
//! A dropped connection is retried three times with exponential backoff
//! (1 s, 2 s, 4 s) before the client gives up. A server close with the
//! normal code means "do not reconnect"; the caller inspects
//! [`Disconnect::Normal`] to tell the cases apart.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use bubble_shared::protocol::{ClientMessage, ServerMessage};

/// Backoff schedule for reconnect attempts.
pub const RECONNECT_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why the receive side ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnect {
    /// Server closed normally; do not reconnect.
    Normal,
    /// Transport dropped or the server used an abnormal/gameplay code; the
    /// reconnect policy applies.
    Abnormal,
}

pub struct Connection {
    sink: SplitSink<Socket, Message>,
    source: SplitStream<Socket>,
}

impl Connection {
    /// Single connection attempt.
    pub async fn connect(url: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let (socket, _) = connect_async(url).await?;
        info!("connected to {}", url);
        let (sink, source) = socket.split();
        Ok(Self { sink, source })
    }

    /// Connect, then retry three more times with exponential backoff before
    /// giving up with the final error.
    pub async fn connect_with_retry(
        url: &str,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        for (attempt, delay) in RECONNECT_DELAYS.iter().enumerate() {
            match Self::connect(url).await {
                Ok(connection) => return Ok(connection),
                Err(e) => {
                    warn!(
                        "connect attempt {} failed: {}; retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }
        Self::connect(url).await
    }

    /// Encode and send one envelope.
    pub async fn send(
        &mut self,
        message: &ClientMessage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let bytes = bincode::serialize(message)?;
        self.sink.send(Message::Binary(bytes)).await?;
        Ok(())
    }

    /// Receive the next server envelope. Pings are answered inline; other
    /// control frames are skipped.
    pub async fn recv(&mut self) -> Result<ServerMessage, Disconnect> {
        loop {
            let frame = match self.source.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    debug!("transport error: {}", e);
                    return Err(Disconnect::Abnormal);
                }
                None => return Err(Disconnect::Abnormal),
            };
            match frame {
                Message::Binary(data) => match bincode::deserialize(&data) {
                    Ok(message) => return Ok(message),
                    Err(e) => {
                        warn!("undecodable server frame: {}", e);
                    }
                },
                Message::Ping(payload) => {
                    let _ = self.sink.send(Message::Pong(payload)).await;
                }
                Message::Close(frame) => {
                    let normal = frame
                        .as_ref()
                        .map(|f| f.code == CloseCode::Normal)
                        .unwrap_or(false);
                    return Err(if normal {
                        Disconnect::Normal
                    } else {
                        Disconnect::Abnormal
                    });
                }
                _ => {}
            }
        }
    }

    /// Graceful goodbye: the leave envelope followed by a normal close.
    pub async fn leave(mut self) {
        let _ = self.send(&ClientMessage::Leave).await;
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}
