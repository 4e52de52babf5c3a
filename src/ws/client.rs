//! Websocket connection engine shared by the echo and files wrappers.
//!
//! A background worker owns the socket and retries forever: any transport
//! close or error is followed by a fixed delay and a fresh connection
//! attempt. There is no buffering across reconnects; a frame submitted while
//! the transport is down is dropped with a warning, matching the behavior of
//! the service's browser pages. Dropping every handle shuts the worker down
//! and suppresses any pending reconnect.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, warn};

use crate::ws::proto::MessageBody;

/// Delay between a transport failure and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Transport configuration for one websocket wrapper.
#[derive(Clone, Debug)]
pub struct WsConfig {
    url: String,
    auth_token: Option<SecretString>,
    reconnect_delay: Duration,
}

impl WsConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    /// Attaches a bearer token to the websocket handshake.
    pub fn with_auth_token(mut self, token: SecretString) -> Self {
        self.auth_token = Some(token);
        self
    }

    /// Overrides the fixed reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Connection lifecycle updates produced by the worker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionStatus {
    /// Transport is up and frames flow.
    Connected,
    /// Transport dropped; a reconnect is scheduled.
    Reconnecting,
    /// Deliberately closed; no reconnect will follow.
    Closed,
}

/// Errors produced by the websocket transport layer.
#[derive(Debug, Error)]
pub enum WsClientError {
    /// Websocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] WsError),

    /// JSON encoding/decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Auth token could not be converted to a valid HTTP header value.
    #[error("invalid authorization header: {0}")]
    InvalidAuthHeader(#[from] InvalidHeaderValue),

    /// The connection worker is gone.
    #[error("send queue is closed")]
    SendQueueClosed,

    /// Connect was called outside a tokio runtime.
    #[error("no tokio runtime available to drive the connection")]
    NoRuntime,
}

/// Cloneable handle for submitting outbound frames.
#[derive(Clone, Debug)]
pub struct WsSender {
    tx: mpsc::UnboundedSender<MessageBody>,
}

impl WsSender {
    pub fn send(&self, frame: MessageBody) -> Result<(), WsClientError> {
        self.tx
            .send(frame)
            .map_err(|_| WsClientError::SendQueueClosed)
    }
}

/// Inbound frame or lifecycle update, whichever arrives first.
#[derive(Clone, Debug)]
pub enum WsEvent {
    Frame(MessageBody),
    Status(ConnectionStatus),
}

/// Live connection handles returned by [`connect`].
#[derive(Debug)]
pub struct WsHandle {
    sender: WsSender,
    inbound: mpsc::UnboundedReceiver<MessageBody>,
    status: mpsc::UnboundedReceiver<ConnectionStatus>,
}

impl WsHandle {
    /// Returns a cloneable sender for outbound frames.
    pub fn sender(&self) -> WsSender {
        self.sender.clone()
    }

    /// Receives the next inbound frame.
    pub async fn recv(&mut self) -> Option<MessageBody> {
        self.inbound.recv().await
    }

    /// Receives the next connection status update.
    pub async fn recv_status(&mut self) -> Option<ConnectionStatus> {
        self.status.recv().await
    }

    /// Pops a queued status update without waiting.
    pub fn try_status(&mut self) -> Option<ConnectionStatus> {
        self.status.try_recv().ok()
    }

    /// Receives the next frame or status update.
    ///
    /// Returns `None` once the worker has exited and both queues are drained.
    pub async fn recv_event(&mut self) -> Option<WsEvent> {
        // Biased: the worker drops both channel ends together on exit, so
        // polling the frame queue first makes a closed connection terminate
        // here instead of spinning on the closed status queue.
        tokio::select! {
            biased;
            maybe_frame = self.inbound.recv() => maybe_frame.map(WsEvent::Frame),
            maybe_status = self.status.recv() => maybe_status.map(WsEvent::Status),
        }
    }
}

/// Spawns the connection worker and returns its handles.
///
/// The call returns immediately; the first connection attempt runs under the
/// same retry loop as any reconnect, so an unreachable server shows up as
/// `Reconnecting` status updates rather than an error here. Only a malformed
/// URL or auth token fails the call, as does the absence of a tokio runtime
/// to drive the worker.
pub fn connect(config: WsConfig) -> Result<WsHandle, WsClientError> {
    // Surface bad config now instead of once per retry.
    build_request(&config)?;

    let runtime =
        tokio::runtime::Handle::try_current().map_err(|_| WsClientError::NoRuntime)?;

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = mpsc::unbounded_channel();

    runtime.spawn(connection_worker(config, outbound_rx, inbound_tx, status_tx));

    Ok(WsHandle {
        sender: WsSender { tx: outbound_tx },
        inbound: inbound_rx,
        status: status_rx,
    })
}

fn build_request(config: &WsConfig) -> Result<Request, WsClientError> {
    let mut request = config.url.as_str().into_client_request()?;
    if let Some(token) = config.auth_token.as_ref() {
        let header = format!("Bearer {}", token.expose_secret()).parse()?;
        request.headers_mut().insert("authorization", header);
    }
    Ok(request)
}

enum SessionOutcome {
    /// All handles dropped; the socket was closed deliberately.
    Shutdown,
    /// Transport close or error; retry after the fixed delay.
    Reconnect,
}

async fn connection_worker(
    config: WsConfig,
    mut outbound_rx: mpsc::UnboundedReceiver<MessageBody>,
    inbound_tx: mpsc::UnboundedSender<MessageBody>,
    status_tx: mpsc::UnboundedSender<ConnectionStatus>,
) {
    loop {
        match run_session(&config, &mut outbound_rx, &inbound_tx, &status_tx).await {
            Ok(SessionOutcome::Shutdown) => {
                let _ = status_tx.send(ConnectionStatus::Closed);
                return;
            }
            Ok(SessionOutcome::Reconnect) => {
                let _ = status_tx.send(ConnectionStatus::Reconnecting);
            }
            Err(error) => {
                warn!(event = "ws_connect_failed", url = %config.url, %error);
                let _ = status_tx.send(ConnectionStatus::Reconnecting);
            }
        }

        if !drop_frames_during_delay(config.reconnect_delay, &mut outbound_rx).await {
            // Sender side went away mid-delay: a deliberate disconnect.
            let _ = status_tx.send(ConnectionStatus::Closed);
            return;
        }
    }
}

async fn run_session(
    config: &WsConfig,
    outbound_rx: &mut mpsc::UnboundedReceiver<MessageBody>,
    inbound_tx: &mpsc::UnboundedSender<MessageBody>,
    status_tx: &mpsc::UnboundedSender<ConnectionStatus>,
) -> Result<SessionOutcome, WsClientError> {
    let request = build_request(config)?;
    let (mut socket, _) = connect_async(request).await?;

    debug!(event = "ws_connected", url = %config.url);
    let _ = status_tx.send(ConnectionStatus::Connected);

    loop {
        tokio::select! {
            maybe_outbound = outbound_rx.recv() => {
                match maybe_outbound {
                    Some(frame) => {
                        let text = match frame.to_text() {
                            Ok(text) => text,
                            Err(error) => {
                                warn!(event = "ws_frame_encode_failed", %error);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(text)).await.is_err() {
                            // The frame is lost; there is no buffering.
                            warn!(event = "ws_send_failed", url = %config.url);
                            return Ok(SessionOutcome::Reconnect);
                        }
                    }
                    None => {
                        let _ = socket.close(None).await;
                        return Ok(SessionOutcome::Shutdown);
                    }
                }
            }
            maybe_inbound = socket.next() => {
                match maybe_inbound {
                    Some(Ok(Message::Text(text))) => {
                        match MessageBody::from_text(&text) {
                            Ok(frame) => {
                                if inbound_tx.send(frame).is_err() {
                                    let _ = socket.close(None).await;
                                    return Ok(SessionOutcome::Shutdown);
                                }
                            }
                            // Unparseable frames are skipped, not fatal.
                            Err(error) => warn!(event = "ws_frame_parse_failed", %error),
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            return Ok(SessionOutcome::Reconnect);
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        debug!(event = "ws_closed_by_server", frame = ?frame);
                        return Ok(SessionOutcome::Reconnect);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(event = "ws_recv_failed", %error);
                        return Ok(SessionOutcome::Reconnect);
                    }
                    None => return Ok(SessionOutcome::Reconnect),
                }
            }
        }
    }
}

/// Waits out the reconnect delay, discarding any frames submitted meanwhile.
///
/// Returns `false` when the sender side closed, which cancels the reconnect.
async fn drop_frames_during_delay(
    delay: Duration,
    outbound_rx: &mut mpsc::UnboundedReceiver<MessageBody>,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            maybe_frame = outbound_rx.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        warn!(event = "ws_send_while_disconnected", message = %frame.message);
                    }
                    None => return false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::{build_request, connect, WsClientError, WsConfig, RECONNECT_DELAY};

    #[test]
    fn config_defaults_to_one_second_reconnect_delay() {
        let config = WsConfig::new("ws://localhost:8080/echo_connect");
        assert_eq!(config.reconnect_delay, RECONNECT_DELAY);
        assert_eq!(RECONNECT_DELAY, Duration::from_millis(1000));
    }

    #[test]
    fn auth_token_becomes_bearer_header() {
        let config = WsConfig::new("ws://localhost:8080/files_connect")
            .with_auth_token(SecretString::new("tok-123".to_string()));
        let request = build_request(&config).expect("request");
        assert_eq!(
            request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok()),
            Some("Bearer tok-123")
        );
    }

    #[test]
    fn request_without_token_has_no_auth_header() {
        let config = WsConfig::new("ws://localhost:8080/echo_connect");
        let request = build_request(&config).expect("request");
        assert!(request.headers().get("authorization").is_none());
    }

    #[tokio::test]
    async fn connect_rejects_malformed_url() {
        assert!(connect(WsConfig::new("not a url")).is_err());
    }

    #[test]
    fn connect_outside_a_runtime_errors_instead_of_panicking() {
        let result = connect(WsConfig::new("ws://localhost:8080/echo_connect"));
        assert!(matches!(result, Err(WsClientError::NoRuntime)));
    }
}
