//! The reconnecting refund channel.
//!
//! ```text
//! Disconnected -> Connecting -> Connected <-> Executing
//!      ^              |             |
//!      +--------------+-------------+   (close, error, connect failure)
//!
//! any state -> ShuttingDown             (stop; terminal)
//! ```
//!
//! One connection is live at a time; the next attempt is scheduled only after
//! the previous connection ended. Refunds execute inline and in order. While a
//! refund executes the heartbeat keeps ticking and inbound frames wait in the
//! socket. A stop lets an in-flight execution finish, then closes the
//! connection with a normal-closure code and suppresses all reconnects.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::backoff::{ReconnectPolicy, Reconnector};
use crate::error::{ChannelError, TransportError};
use crate::processor::RefundProcessor;
use crate::protocol::{
    ClientMessage, INVALID_REQUEST, Inbound, ServerMessage, decode_server_message, refund_id_hint,
};
use crate::transport::{Connection, Frame, Transport};

/// Default heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Query parameter carrying the API key.
pub const API_KEY_PARAM: &str = "apiKey";

/// Connection state of a [`RefundChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Not connected; a reconnect may be pending.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// Connected and idle.
    Connected,
    /// Connected and executing a refund.
    Executing,
    /// Stopped; no further connection attempts.
    ShuttingDown,
}

/// Channel settings.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// `ws://` or `wss://` endpoint of the refund authority.
    pub url: Url,
    /// Credential appended as the `apiKey` query parameter.
    pub api_key: String,
    /// Interval between heartbeats.
    pub heartbeat_interval: Duration,
    /// Reconnect schedule.
    pub reconnect: ReconnectPolicy,
}

impl ChannelConfig {
    /// Creates a configuration with default heartbeat and reconnect settings.
    pub fn new(url: Url, api_key: impl Into<String>) -> Self {
        Self {
            url,
            api_key: api_key.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// The URL to connect to, with the API key attached.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::UnsupportedScheme`] unless the URL is `ws` or `wss`.
    pub fn connection_url(&self) -> Result<Url, ChannelError> {
        match self.url.scheme() {
            "ws" | "wss" => {}
            other => return Err(ChannelError::UnsupportedScheme(other.to_owned())),
        }
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair(API_KEY_PARAM, &self.api_key);
        Ok(url)
    }
}

/// How a connected session ended.
enum SessionEnd {
    Shutdown,
    Lost(String),
}

impl From<TransportError> for SessionEnd {
    fn from(error: TransportError) -> Self {
        Self::Lost(error.to_string())
    }
}

/// Client side of the refund negotiation protocol.
pub struct RefundChannel {
    config: ChannelConfig,
    transport: Arc<dyn Transport>,
    processor: Arc<RefundProcessor>,
    state: watch::Sender<ChannelState>,
    shutdown: CancellationToken,
    registration_id: Mutex<Option<String>>,
}

impl std::fmt::Debug for RefundChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefundChannel")
            .field("url", &self.config.url.as_str())
            .field("state", &*self.state.borrow())
            .field("registration_id", &*self.registration_id.lock())
            .finish_non_exhaustive()
    }
}

impl RefundChannel {
    /// Creates a channel. Nothing connects until [`run`](Self::run).
    pub fn new(
        config: ChannelConfig,
        transport: impl Transport + 'static,
        processor: Arc<RefundProcessor>,
    ) -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        Self {
            config,
            transport: Arc::new(transport),
            processor,
            state,
            shutdown: CancellationToken::new(),
            registration_id: Mutex::new(None),
        }
    }

    /// Uses an external token for shutdown, e.g. one shared with a signal handler.
    #[must_use]
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    /// The registration id from the last `connected` message.
    #[must_use]
    pub fn registration_id(&self) -> Option<String> {
        self.registration_id.lock().clone()
    }

    /// The refund processor.
    #[must_use]
    pub const fn processor(&self) -> &Arc<RefundProcessor> {
        &self.processor
    }

    /// Stops the channel. Idempotent.
    pub fn stop(&self) {
        self.set_state(ChannelState::ShuttingDown);
        self.shutdown.cancel();
    }

    fn set_state(&self, next: ChannelState) {
        self.state.send_if_modified(|current| {
            if *current == ChannelState::ShuttingDown || *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Connects and serves until stopped, reconnecting on every failure.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] only for configuration that can never connect.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let target = self.config.connection_url()?;
        let mut reconnector = Reconnector::new(self.config.reconnect);

        while !self.shutdown.is_cancelled() {
            self.set_state(ChannelState::Connecting);
            tracing::debug!(url = %self.config.url, "Connecting to refund channel");

            let connected = tokio::select! {
                () = self.shutdown.cancelled() => break,
                result = self.transport.connect(&target) => result,
            };

            match connected {
                Ok(mut conn) => {
                    reconnector.reset();
                    self.set_state(ChannelState::Connected);
                    tracing::info!(url = %self.config.url, "Refund channel connected");
                    match self.serve(conn.as_mut()).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Lost(reason) => {
                            tracing::warn!(%reason, "Refund channel connection lost");
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "Refund channel connection failed");
                }
            }

            self.set_state(ChannelState::Disconnected);
            let delay = reconnector.next_delay();
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ChannelState::ShuttingDown);
        tracing::info!("Refund channel stopped");
        Ok(())
    }

    fn heartbeat(&self) -> Interval {
        let period = self.config.heartbeat_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    async fn send(conn: &mut dyn Connection, message: &ClientMessage) -> Result<(), TransportError> {
        let text = message
            .encode()
            .map_err(|e| TransportError::Send(Box::new(e)))?;
        conn.send(text).await
    }

    async fn serve(&self, conn: &mut dyn Connection) -> SessionEnd {
        let mut heartbeat = self.heartbeat();
        loop {
            let frame = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    if let Err(error) = conn.close().await {
                        tracing::debug!(%error, "Close frame not delivered");
                    }
                    return SessionEnd::Shutdown;
                }
                _ = heartbeat.tick() => {
                    if let Err(error) = Self::send(conn, &ClientMessage::Ping).await {
                        return error.into();
                    }
                    continue;
                }
                frame = conn.recv() => frame,
            };

            let text = match frame {
                Some(Ok(Frame::Text(text))) => text,
                Some(Ok(Frame::Close)) => return SessionEnd::Lost("closed by remote".to_owned()),
                Some(Err(error)) => return error.into(),
                None => return SessionEnd::Lost("stream ended".to_owned()),
            };

            if let Err(end) = self.handle_text(conn, &mut heartbeat, &text).await {
                return end;
            }
        }
    }

    async fn handle_text(
        &self,
        conn: &mut dyn Connection,
        heartbeat: &mut Interval,
        text: &str,
    ) -> Result<(), SessionEnd> {
        let message = match decode_server_message(text) {
            Ok(Inbound::Message(message)) => message,
            Ok(Inbound::Unknown(kind)) => {
                tracing::debug!(%kind, "Ignoring unknown refund channel message");
                return Ok(());
            }
            Err(error) => {
                let Some(refund_id) = refund_id_hint(text) else {
                    tracing::warn!(%error, "Ignoring malformed refund channel frame");
                    return Ok(());
                };
                tracing::warn!(%refund_id, %error, "Rejecting malformed refund instruction");
                let rejected = ClientMessage::rejected(&refund_id, INVALID_REQUEST, error.to_string());
                Self::send(conn, &rejected).await?;
                return Ok(());
            }
        };

        match message {
            ServerMessage::Connected { registration_id } => {
                tracing::info!(%registration_id, "Registered with refund authority");
                *self.registration_id.lock() = Some(registration_id);
            }
            ServerMessage::Pong => tracing::trace!("Heartbeat acknowledged"),
            ServerMessage::RefundRequired { refund } => {
                tracing::info!(
                    refund_id = %refund.id,
                    network = %refund.network,
                    amount_cents = refund.amount_cents,
                    "Refund requested"
                );
                let executing = ClientMessage::RefundExecuting {
                    refund_id: refund.id.clone(),
                };
                Self::send(conn, &executing).await?;

                self.set_state(ChannelState::Executing);
                let mut lost = None;
                let outcome = {
                    let mut execution = pin!(self.processor.process(&refund));
                    loop {
                        if lost.is_some() {
                            break execution.await;
                        }
                        tokio::select! {
                            outcome = &mut execution => break outcome,
                            _ = heartbeat.tick() => {
                                if let Err(error) = Self::send(conn, &ClientMessage::Ping).await {
                                    lost = Some(error);
                                }
                            }
                        }
                    }
                };
                self.set_state(ChannelState::Connected);

                if let Some(error) = lost {
                    return Err(error.into());
                }
                if let Some(reply) = outcome.reply(&refund.id) {
                    Self::send(conn, &reply).await?;
                }
            }
        }
        Ok(())
    }
}
