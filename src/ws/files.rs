//! Files transfer wrapper.
//!
//! Unlike the echo wrapper, nothing is pushed on a timer: `request` frames
//! one message, sends it, and pairs it with the next inbound frame as the
//! reply. The files service answers every request, so requests issued one at
//! a time through `&mut self` pair correctly. Error replies (`type:"error"`)
//! are mapped to [`FilesError::Server`] with the reason from `value.reason`.

use std::collections::BTreeMap;

use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, warn};

use crate::urls::Endpoints;
use crate::ws::client::{self, ConnectionStatus, WsClientError, WsConfig, WsEvent, WsHandle};
use crate::ws::proto::{
    MessageBody, COND_KEY, FILE_END, FILE_OPEN, FILE_READ_LINE, FILE_SAVE, FILE_WRITE_LINE,
    LINE_KEY, PATH_CREATE, PATH_DELETE, PATH_EACH, PATH_END, PATH_KEY, PATH_SEARCH, VALUE_KEY,
};

/// Errors surfaced by files requests.
#[derive(Debug, Error)]
pub enum FilesError {
    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] WsClientError),

    /// The server answered with an error envelope.
    #[error("{message} failed: {reason}")]
    Server { message: String, reason: String },

    /// The transport dropped while the request was in flight; the frame or
    /// its reply may be lost.
    #[error("connection dropped while waiting for a reply")]
    Dropped,

    /// The session is closed and no reply will arrive.
    #[error("connection closed before a reply arrived")]
    Closed,

    /// `request` was called before `connect`.
    #[error("not connected")]
    NotConnected,
}

/// Entry point for files sessions.
#[derive(Clone, Debug)]
pub struct FilesClient {
    endpoints: Endpoints,
    endpoint_override: Option<String>,
    auth_token: Option<SecretString>,
    reconnect_delay: std::time::Duration,
}

impl FilesClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            endpoint_override: None,
            auth_token: None,
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

    /// Overrides the fixed reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: std::time::Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    fn endpoint(&self) -> String {
        match self.endpoint_override.as_deref() {
            Some(endpoint) => endpoint.to_string(),
            None => self.endpoints.files_connect(),
        }
    }

    /// Creates a disconnected session for this client.
    pub fn session(&self) -> FilesSession {
        FilesSession {
            client: self.clone(),
            handle: None,
        }
    }
}

impl Default for FilesClient {
    fn default() -> Self {
        Self::new(Endpoints::default())
    }
}

/// One files connection issuing request/reply exchanges.
pub struct FilesSession {
    client: FilesClient,
    handle: Option<WsHandle>,
}

impl FilesSession {
    /// Opens the connection. A no-op when already connected.
    pub fn connect(&mut self) -> Result<(), WsClientError> {
        if self.handle.is_some() {
            warn!(event = "files_already_connected");
            return Ok(());
        }

        let mut config = WsConfig::new(self.client.endpoint())
            .with_reconnect_delay(self.client.reconnect_delay);
        if let Some(token) = self.client.auth_token.clone() {
            config = config.with_auth_token(token);
        }

        self.handle = Some(client::connect(config)?);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Receives the next connection status update.
    pub async fn recv_status(&mut self) -> Option<ConnectionStatus> {
        self.handle.as_mut()?.recv_status().await
    }

    /// Closes the transport, suppressing any reconnect. A no-op when not
    /// connected.
    pub fn disconnect(&mut self) {
        if self.handle.take().is_none() {
            warn!(event = "files_not_connected");
            return;
        }
        debug!(event = "files_disconnected");
    }

    /// Sends one framed files message and waits for the paired reply.
    ///
    /// Returns the reply's `value` map on success.
    pub async fn request(
        &mut self,
        message: &str,
        value: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, FilesError> {
        let handle = self.handle.as_mut().ok_or(FilesError::NotConnected)?;

        // Lifecycle updates queued before this request say nothing about it.
        while handle.try_status().is_some() {}

        handle.sender().send(MessageBody::files(message, value))?;
        debug!(event = "files_request_sent", message);

        loop {
            match handle.recv_event().await {
                Some(WsEvent::Frame(reply)) => {
                    if reply.is_error() {
                        let reason = reply.reason().unwrap_or("unknown").to_string();
                        warn!(event = "files_request_failed", message = %reply.message, %reason);
                        return Err(FilesError::Server {
                            message: reply.message,
                            reason,
                        });
                    }
                    debug!(event = "files_reply", message = %reply.message);
                    return Ok(reply.value);
                }
                Some(WsEvent::Status(ConnectionStatus::Reconnecting)) => {
                    return Err(FilesError::Dropped);
                }
                Some(WsEvent::Status(_)) => {}
                None => return Err(FilesError::Closed),
            }
        }
    }

    /// Lists the entries of the current directory.
    pub async fn path_each(&mut self) -> Result<BTreeMap<String, String>, FilesError> {
        self.request(PATH_EACH, BTreeMap::new()).await
    }

    /// Searches the current directory tree with the given condition.
    pub async fn path_search(
        &mut self,
        cond: &str,
    ) -> Result<BTreeMap<String, String>, FilesError> {
        self.request(PATH_SEARCH, single(COND_KEY, cond)).await
    }

    /// Creates the given path.
    pub async fn path_create(
        &mut self,
        path: &str,
    ) -> Result<BTreeMap<String, String>, FilesError> {
        self.request(PATH_CREATE, single(PATH_KEY, path)).await
    }

    /// Deletes the given path.
    pub async fn path_delete(
        &mut self,
        path: &str,
    ) -> Result<BTreeMap<String, String>, FilesError> {
        self.request(PATH_DELETE, single(PATH_KEY, path)).await
    }

    /// Ends the directory walk.
    pub async fn path_end(&mut self) -> Result<BTreeMap<String, String>, FilesError> {
        self.request(PATH_END, BTreeMap::new()).await
    }

    /// Opens a file for line-based access.
    pub async fn file_open(&mut self, path: &str) -> Result<BTreeMap<String, String>, FilesError> {
        self.request(FILE_OPEN, single(PATH_KEY, path)).await
    }

    /// Saves the open file.
    pub async fn file_save(&mut self) -> Result<BTreeMap<String, String>, FilesError> {
        self.request(FILE_SAVE, BTreeMap::new()).await
    }

    /// Closes the open file.
    pub async fn file_end(&mut self) -> Result<BTreeMap<String, String>, FilesError> {
        self.request(FILE_END, BTreeMap::new()).await
    }

    /// Reads one line of the open file.
    pub async fn file_read_line(
        &mut self,
        line: u64,
    ) -> Result<BTreeMap<String, String>, FilesError> {
        self.request(FILE_READ_LINE, single(LINE_KEY, &line.to_string()))
            .await
    }

    /// Writes one line of the open file.
    pub async fn file_write_line(
        &mut self,
        line: u64,
        text: &str,
    ) -> Result<BTreeMap<String, String>, FilesError> {
        let mut value = single(LINE_KEY, &line.to_string());
        value.insert(VALUE_KEY.to_string(), text.to_string());
        self.request(FILE_WRITE_LINE, value).await
    }
}

fn single(key: &str, value: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert(key.to_string(), value.to_string());
    map
}

#[cfg(test)]
mod tests {
    use crate::urls::Endpoints;

    use super::{FilesClient, FilesError};

    #[test]
    fn endpoint_comes_from_configured_host() {
        let client = FilesClient::new(Endpoints::new("share.example.com"));
        assert_eq!(client.endpoint(), "ws://share.example.com/files_connect");
    }

    #[test]
    fn endpoint_override_takes_precedence() {
        let client = FilesClient::default().with_endpoint("ws://127.0.0.1:9999/files_connect");
        assert_eq!(client.endpoint(), "ws://127.0.0.1:9999/files_connect");
    }

    #[tokio::test]
    async fn request_before_connect_is_rejected() {
        let mut session = FilesClient::default().session();
        let error = session.path_each().await.expect_err("not connected");
        assert!(matches!(error, FilesError::NotConnected));
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let mut session = FilesClient::default()
            .with_endpoint("ws://127.0.0.1:1/files_connect")
            .session();

        session.connect().expect("first connect");
        session.connect().expect("second connect");
        assert!(session.is_connected());

        session.disconnect();
        session.disconnect();
        assert!(!session.is_connected());
    }
}
