//! The duplex transport capability.
//!
//! [`RefundChannel`](crate::RefundChannel) never opens sockets itself; it is
//! handed a [`Transport`] at construction. [`WsTransport`] is the
//! tokio-tungstenite implementation used in production. Tests inject an
//! in-memory one.

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;

/// A frame delivered by a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text message.
    Text(String),
    /// The remote closed the connection.
    Close,
}

/// An open duplex connection.
///
/// `recv` must be cancel-safe: the channel polls it inside `select!` and drops
/// it whenever the heartbeat fires.
#[async_trait]
pub trait Connection: Send {
    /// Sends a text frame.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Waits for the next frame. `None` means the stream ended.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Closes the connection with a normal-closure code.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connects to `url`.
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError>;
}

#[cfg(feature = "websocket")]
pub use ws::WsTransport;

#[cfg(feature = "websocket")]
mod ws {
    use async_trait::async_trait;
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
    use url::Url;

    use super::{Connection, Frame, Transport};
    use crate::error::TransportError;

    /// WebSocket transport over tokio-tungstenite.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WsTransport;

    struct WsConnection {
        stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    }

    #[async_trait]
    impl Transport for WsTransport {
        async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError> {
            let (stream, _response) = connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::Connect(Box::new(e)))?;
            Ok(Box::new(WsConnection { stream }))
        }
    }

    #[async_trait]
    impl Connection for WsConnection {
        async fn send(&mut self, text: String) -> Result<(), TransportError> {
            self.stream
                .send(Message::Text(text.into()))
                .await
                .map_err(|e| TransportError::Send(Box::new(e)))
        }

        async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
            loop {
                let message = match self.stream.next().await? {
                    Ok(message) => message,
                    Err(e) => return Some(Err(TransportError::Receive(Box::new(e)))),
                };
                match message {
                    Message::Text(text) => return Some(Ok(Frame::Text(text.as_str().to_owned()))),
                    Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => return Some(Ok(Frame::Text(text))),
                        Err(_) => tracing::debug!("Ignoring non-UTF-8 binary frame"),
                    },
                    Message::Close(_) => return Some(Ok(Frame::Close)),
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                }
            }
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "client shutdown".into(),
            };
            self.stream
                .close(Some(frame))
                .await
                .map_err(|e| TransportError::Send(Box::new(e)))
        }
    }
}
