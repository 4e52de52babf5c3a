//! Echo chat wrapper.
//!
//! `EchoSession` mirrors the chat page's socket object: once connected it
//! polls a caller-supplied message source on a fixed interval and pushes each
//! message to the echo service; inbound frames surface their `message` text.
//! Connect is idempotent and disconnect cancels the send ticker before the
//! transport goes down, so a deliberate close never reconnects.

use std::time::Duration;

use secrecy::SecretString;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::urls::Endpoints;
use crate::ws::client::{self, ConnectionStatus, WsClientError, WsConfig, WsHandle};
use crate::ws::proto::MessageBody;

/// Interval between periodic sends.
pub const SEND_INTERVAL: Duration = Duration::from_millis(1000);

/// Source of outgoing chat messages, polled once per interval tick.
pub trait MessageSource: Send + 'static {
    /// Next message to push, or `None` to skip this tick.
    fn next_message(&mut self) -> Option<String>;
}

impl<F> MessageSource for F
where
    F: FnMut() -> Option<String> + Send + 'static,
{
    fn next_message(&mut self) -> Option<String> {
        (self)()
    }
}

/// Entry point for echo chat sessions.
#[derive(Clone, Debug)]
pub struct EchoClient {
    endpoints: Endpoints,
    endpoint_override: Option<String>,
    auth_token: Option<SecretString>,
    send_interval: Duration,
    reconnect_delay: Duration,
}

impl EchoClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            endpoint_override: None,
            auth_token: None,
            send_interval: SEND_INTERVAL,
            reconnect_delay: client::RECONNECT_DELAY,
        }
    }

    /// Sets an explicit websocket endpoint override.
    ///
    /// The override takes precedence over the configured endpoints.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into().trim_end().to_string());
        self
    }

    /// Attaches a bearer token to the websocket handshake.
    pub fn with_auth_token(mut self, token: SecretString) -> Self {
        self.auth_token = Some(token);
        self
    }

    /// Overrides the periodic send interval.
    pub fn with_send_interval(mut self, interval: Duration) -> Self {
        self.send_interval = interval;
        self
    }

    /// Overrides the fixed reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    fn endpoint(&self) -> String {
        match self.endpoint_override.as_deref() {
            Some(endpoint) => endpoint.to_string(),
            None => self.endpoints.echo_connect(),
        }
    }

    /// Creates a disconnected session for this client.
    pub fn session(&self) -> EchoSession {
        EchoSession {
            client: self.clone(),
            active: None,
        }
    }
}

impl Default for EchoClient {
    fn default() -> Self {
        Self::new(Endpoints::default())
    }
}

struct Active {
    handle: WsHandle,
    ticker: JoinHandle<()>,
}

/// One echo chat connection with periodic sending.
pub struct EchoSession {
    client: EchoClient,
    active: Option<Active>,
}

impl EchoSession {
    /// Opens the connection and starts the send ticker.
    ///
    /// A no-op when already connected.
    pub fn connect(&mut self, source: impl MessageSource) -> Result<(), WsClientError> {
        if self.active.is_some() {
            warn!(event = "echo_already_connected");
            return Ok(());
        }

        let mut config = WsConfig::new(self.client.endpoint())
            .with_reconnect_delay(self.client.reconnect_delay);
        if let Some(token) = self.client.auth_token.clone() {
            config = config.with_auth_token(token);
        }

        let handle = client::connect(config)?;
        let ticker = spawn_send_ticker(handle.sender(), self.client.send_interval, source);
        self.active = Some(Active { handle, ticker });
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Receives the next chat reply text.
    ///
    /// Returns `None` when disconnected or once the connection is closed.
    pub async fn recv(&mut self) -> Option<String> {
        let active = self.active.as_mut()?;
        let frame = active.handle.recv().await?;
        debug!(event = "echo_reply", message = %frame.message);
        Some(frame.message)
    }

    /// Receives the next connection status update.
    pub async fn recv_status(&mut self) -> Option<ConnectionStatus> {
        self.active.as_mut()?.handle.recv_status().await
    }

    /// Stops the send ticker and closes the transport.
    ///
    /// Cancelling the ticker first releases its sender handle, which is what
    /// keeps the worker from scheduling another reconnect. A no-op when not
    /// connected.
    pub fn disconnect(&mut self) {
        let Some(active) = self.active.take() else {
            warn!(event = "echo_not_connected");
            return;
        };
        active.ticker.abort();
        drop(active.handle);
        debug!(event = "echo_disconnected");
    }
}

impl Drop for EchoSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.ticker.abort();
        }
    }
}

fn spawn_send_ticker(
    sender: client::WsSender,
    interval: Duration,
    mut source: impl MessageSource,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // First tick after one full interval, like the page's setInterval.
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match source.next_message() {
                Some(message) => {
                    if sender.send(MessageBody::echo(message)).is_err() {
                        break;
                    }
                }
                None => warn!(event = "echo_nothing_to_send"),
            }
        }
    })
}
