// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Link Channel Listener
//!
//! Keeps a WebSocket open to the push-channel service so the requesting
//! application can reach the wallet without a fresh QR scan.
//!
//! ## Lifecycle
//!
//! `Disconnected -> Connecting -> Connected -> Disconnected`, published on a
//! `watch` channel. After a failed attempt or a dropped connection the task
//! waits with exponential backoff (100 ms doubling up to 10 s) and tries again.
//!
//! ## Shutdown
//!
//! The connection task is tied to a `CancellationToken`. Dropping the
//! [`ChannelListener`] handle cancels it.

pub mod message;

use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

pub use message::{MessageDecodeError, SealedMessage};

pub const DEFAULT_SERVICE_URL: &str = "https://cb.anchor.link";

/// Path segment that precedes the channel id in callback URLs.
const LINK_MARKER: &str = "link/";

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("Callback URL has no `link/` segment: {0}")]
    MissingMarker(String),

    #[error("Callback URL has an empty channel id: {0}")]
    EmptyChannelId(String),

    #[error("Invalid channel service URL: {0}")]
    InvalidServiceUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Channel id: the part of `callback_url` after the last `link/`, without
/// query or fragment.
pub fn channel_id_from_callback(callback_url: &str) -> Result<String, ChannelError> {
    let start = callback_url
        .rfind(LINK_MARKER)
        .ok_or_else(|| ChannelError::MissingMarker(callback_url.to_string()))?;
    let tail = &callback_url[start + LINK_MARKER.len()..];
    let id = tail
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    if id.is_empty() {
        return Err(ChannelError::EmptyChannelId(callback_url.to_string()));
    }
    Ok(id.to_string())
}

/// WebSocket URL for `channel_id` on `service_url` (`https` becomes `wss`).
pub fn channel_ws_url(service_url: &str, channel_id: &str) -> Result<String, ChannelError> {
    let service = service_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = service.strip_prefix("http") {
        format!("ws{rest}")
    } else if service.starts_with("ws") {
        service.to_string()
    } else {
        return Err(ChannelError::InvalidServiceUrl(service_url.to_string()));
    };
    let url = format!("{ws_base}/{channel_id}");
    url.parse::<url::Url>()
        .map_err(|e| ChannelError::InvalidServiceUrl(format!("{url}: {e}")))?;
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub service_url: String,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

/// Handle to a running listener. Dropping it stops the connection task.
pub struct ChannelListener {
    channel_id: String,
    state: watch::Receiver<ChannelState>,
    _guard: DropGuard,
}

impl ChannelListener {
    /// Start listening on `channel_id`, forwarding decoded messages to `sink`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(
        config: &ChannelConfig,
        channel_id: &str,
        sink: mpsc::Sender<SealedMessage>,
    ) -> Result<Self, ChannelError> {
        let url = channel_ws_url(&config.service_url, channel_id)?;
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let shutdown = CancellationToken::new();

        let task = ListenerTask {
            url,
            channel_id: channel_id.to_string(),
            state: state_tx,
            sink,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
        };
        tokio::spawn(task.run(shutdown.clone()));

        Ok(Self {
            channel_id: channel_id.to_string(),
            state: state_rx,
            _guard: shutdown.drop_guard(),
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }
}

impl std::fmt::Debug for ChannelListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelListener")
            .field("channel_id", &self.channel_id)
            .field("state", &self.state())
            .finish()
    }
}

type ChannelStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct ListenerTask {
    url: String,
    channel_id: String,
    state: watch::Sender<ChannelState>,
    sink: mpsc::Sender<SealedMessage>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl ListenerTask {
    async fn run(self, shutdown: CancellationToken) {
        info!(channel = %self.channel_id, url = %self.url, "Channel listener starting");
        let mut backoff = self.initial_backoff;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            self.state.send_replace(ChannelState::Connecting);
            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => result,
                _ = shutdown.cancelled() => break,
            };

            match connected {
                Ok((stream, _response)) => {
                    info!(channel = %self.channel_id, "Channel connected");
                    self.state.send_replace(ChannelState::Connected);
                    backoff = self.initial_backoff;

                    self.read_until_closed(stream, &shutdown).await;

                    self.state.send_replace(ChannelState::Disconnected);
                    info!(channel = %self.channel_id, "Channel disconnected");
                }
                Err(e) => {
                    self.state.send_replace(ChannelState::Disconnected);
                    warn!(
                        channel = %self.channel_id,
                        error = %e,
                        retry_ms = backoff.as_millis() as u64,
                        "Channel connect failed"
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(backoff) => {},
                _ = shutdown.cancelled() => break,
            }
            backoff = (backoff * 2).min(self.max_backoff);
        }

        self.state.send_replace(ChannelState::Disconnected);
        info!(channel = %self.channel_id, "Channel listener shutting down");
    }

    async fn read_until_closed(&self, mut stream: ChannelStream, shutdown: &CancellationToken) {
        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                _ = shutdown.cancelled() => {
                    let _ = stream.close(None).await;
                    return;
                }
            };

            match next {
                Some(Ok(Message::Binary(data))) => self.forward(&data),
                Some(Ok(Message::Text(text))) => {
                    debug!(channel = %self.channel_id, len = text.len(), "Ignoring text frame");
                }
                Some(Ok(Message::Close(_))) | None => return,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(channel = %self.channel_id, error = %e, "Channel error");
                    return;
                }
            }
        }
    }

    fn forward(&self, data: &[u8]) {
        match SealedMessage::decode(data) {
            Ok(message) => {
                info!(
                    channel = %self.channel_id,
                    from = %message.from,
                    nonce = message.nonce,
                    "Sealed message received"
                );
                if let Err(e) = self.sink.try_send(message) {
                    warn!(channel = %self.channel_id, error = %e, "Dropping sealed message");
                }
            }
            Err(e) => {
                warn!(
                    channel = %self.channel_id,
                    error = %e,
                    len = data.len(),
                    "Failed to decode channel message"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
    use axum::extract::{Path, State};
    use axum::response::Response;
    use axum::routing::get;
    use axum::Router;
    use tokio::time::timeout;

    use super::message::tests::sample;
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Service {
        frames: Vec<Vec<u8>>,
        close_after_send: bool,
        connections: AtomicUsize,
        channels: Mutex<Vec<String>>,
    }

    async fn upgrade(
        ws: WebSocketUpgrade,
        Path(channel): Path<String>,
        State(service): State<Arc<Service>>,
    ) -> Response {
        ws.on_upgrade(move |mut socket| async move {
            service.connections.fetch_add(1, Ordering::SeqCst);
            service.channels.lock().unwrap().push(channel);
            for frame in &service.frames {
                if socket.send(WsMessage::Binary(frame.clone().into())).await.is_err() {
                    return;
                }
            }
            if service.close_after_send {
                return;
            }
            while let Some(Ok(_)) = socket.recv().await {}
        })
    }

    async fn start_service(frames: Vec<Vec<u8>>, close_after_send: bool) -> (String, Arc<Service>) {
        let service = Arc::new(Service {
            frames,
            close_after_send,
            connections: AtomicUsize::new(0),
            channels: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/{channel}", get(upgrade))
            .with_state(service.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), service)
    }

    fn config(service_url: String) -> ChannelConfig {
        ChannelConfig {
            service_url,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
        }
    }

    #[test]
    fn channel_id_is_suffix_after_last_marker() {
        assert_eq!(
            channel_id_from_callback("https://cb.anchor.link/link/abc-123").unwrap(),
            "abc-123"
        );
        assert_eq!(
            channel_id_from_callback("https://x/link/old/link/new?sig={{sig}}#frag").unwrap(),
            "new"
        );
        assert_eq!(channel_id_from_callback("https://x/link/abc/").unwrap(), "abc");
        assert!(matches!(
            channel_id_from_callback("https://x/callback"),
            Err(ChannelError::MissingMarker(_))
        ));
        assert!(matches!(
            channel_id_from_callback("https://x/link/?a=b"),
            Err(ChannelError::EmptyChannelId(_))
        ));
    }

    #[test]
    fn ws_url_swaps_scheme() {
        assert_eq!(
            channel_ws_url("https://cb.anchor.link", "abc").unwrap(),
            "wss://cb.anchor.link/abc"
        );
        assert_eq!(
            channel_ws_url("http://127.0.0.1:9000/", "abc").unwrap(),
            "ws://127.0.0.1:9000/abc"
        );
        assert_eq!(channel_ws_url("wss://svc", "abc").unwrap(), "wss://svc/abc");
        assert!(channel_ws_url("ftp://svc", "abc").is_err());
    }

    #[tokio::test]
    async fn forwards_decoded_messages_and_skips_garbage() {
        let good = sample().encode().unwrap();
        let (url, service) = start_service(vec![good.clone(), b"garbage".to_vec(), good], false).await;
        let (tx, mut rx) = mpsc::channel(8);

        let listener = ChannelListener::spawn(&config(url), "chan-1", tx).unwrap();
        assert_eq!(listener.channel_id(), "chan-1");

        let first = timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
        let second = timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(first, sample());
        assert_eq!(second, sample());

        let mut state = listener.subscribe();
        timeout(TIMEOUT, state.wait_for(|s| *s == ChannelState::Connected))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(service.channels.lock().unwrap().as_slice(), ["chan-1"]);
    }

    #[tokio::test]
    async fn reconnects_after_server_closes() {
        let good = sample().encode().unwrap();
        let (url, service) = start_service(vec![good], true).await;
        let (tx, mut rx) = mpsc::channel(8);

        let _listener = ChannelListener::spawn(&config(url), "chan-2", tx).unwrap();

        // One message per connection; the second proves a reconnect happened
        timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
        timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
        assert!(service.connections.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn dropping_handle_stops_the_task() {
        let (url, _service) = start_service(Vec::new(), false).await;
        let (tx, mut rx) = mpsc::channel(8);

        let listener = ChannelListener::spawn(&config(url), "chan-3", tx).unwrap();
        let mut state = listener.subscribe();
        timeout(TIMEOUT, state.wait_for(|s| *s == ChannelState::Connected))
            .await
            .unwrap()
            .unwrap();

        drop(listener);

        // The task owned the only sender
        assert!(timeout(TIMEOUT, rx.recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreachable_service_keeps_retrying() {
        // Bind then drop to get a port nobody listens on
        let addr = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let (tx, _rx) = mpsc::channel(8);
        let listener = ChannelListener::spawn(&config(format!("http://{addr}")), "chan-4", tx).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_ne!(listener.state(), ChannelState::Connected);
    }
}
