use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};
use tracing::{debug, warn};

/// Payload relayed to a waiting authorization once the browser flow is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackMessage {
    pub code: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("callback channel connection failed: {0}")]
    Connection(String),
    #[error("callback channel closed before a code was received")]
    Closed,
    #[error("malformed callback message: {0}")]
    Malformed(String),
    #[error("no authorization is waiting for this state")]
    UnknownState,
    #[error("callback wait cancelled")]
    Cancelled,
}

pub fn parse_callback_message(raw: &str) -> Result<CallbackMessage, CallbackError> {
    serde_json::from_str(raw).map_err(|err| CallbackError::Malformed(err.to_string()))
}

/// Delivers the authorization code for a given `state` to whoever waits on it.
#[async_trait]
pub trait CallbackChannel: Send + Sync {
    /// Called before the authorization URL is handed out.
    fn open(&self, _state: &str) {}

    async fn wait_for_code(&self, state: &str) -> Result<CallbackMessage, CallbackError>;

    /// Releases whatever `open` or `wait_for_code` left behind for `state`.
    fn close(&self, _state: &str) {}
}

/// Reads the code from the WebSocket relay at `{host}/ws/{state}`.
#[derive(Debug, Clone)]
pub struct WebSocketCallbackChannel {
    host: String,
}

impl WebSocketCallbackChannel {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn url_for(&self, state: &str) -> String {
        format!("{}/ws/{}", self.host.trim_end_matches('/'), state)
    }
}

#[async_trait]
impl CallbackChannel for WebSocketCallbackChannel {
    async fn wait_for_code(&self, state: &str) -> Result<CallbackMessage, CallbackError> {
        let url = self.url_for(state);
        let (mut socket, _) = connect_async(url.as_str())
            .await
            .map_err(|err| CallbackError::Connection(err.to_string()))?;
        debug!(%url, "callback websocket connected");

        let result = loop {
            match socket.next().await {
                Some(Ok(WsMessage::Text(text))) => break parse_callback_message(&text),
                Some(Ok(WsMessage::Close(_))) | None => break Err(CallbackError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(err)) => break Err(CallbackError::Connection(err.to_string())),
            }
        };

        if let Err(err) = socket.close(None).await {
            debug!(error = %err, "callback websocket already closed");
        }
        result
    }
}

/// In-process channel fed by the service's own redirect route.
#[derive(Default)]
pub struct LocalCallbackChannel {
    senders: DashMap<String, oneshot::Sender<CallbackMessage>>,
    receivers: DashMap<String, oneshot::Receiver<CallbackMessage>>,
}

impl LocalCallbackChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliver(&self, state: &str, message: CallbackMessage) -> Result<(), CallbackError> {
        let (_, sender) = self
            .senders
            .remove(state)
            .ok_or(CallbackError::UnknownState)?;
        sender.send(message).map_err(|_| {
            warn!("authorization listener went away before the code arrived");
            CallbackError::UnknownState
        })
    }

    pub fn is_open(&self, state: &str) -> bool {
        self.senders.contains_key(state)
    }
}

#[async_trait]
impl CallbackChannel for LocalCallbackChannel {
    fn open(&self, state: &str) {
        let (sender, receiver) = oneshot::channel();
        self.senders.insert(state.to_string(), sender);
        self.receivers.insert(state.to_string(), receiver);
    }

    async fn wait_for_code(&self, state: &str) -> Result<CallbackMessage, CallbackError> {
        let (_, receiver) = self
            .receivers
            .remove(state)
            .ok_or(CallbackError::UnknownState)?;
        receiver.await.map_err(|_| CallbackError::Closed)
    }

    fn close(&self, state: &str) {
        self.senders.remove(state);
        self.receivers.remove(state);
    }
}
