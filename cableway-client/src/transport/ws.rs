//! Production WebSocket transport over tokio-tungstenite.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message as TungsteniteMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use cableway_core::error::TransportError;

use super::{ReadyState, Transport, TransportEvents, TransportFactory};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, TungsteniteMessage>;
type WsSource = SplitStream<WsStream>;

/// Transport factory backed by tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    /// Creates a connector with the given handshake timeout.
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl TransportFactory for WsConnector {
    fn open(
        &self,
        url: &str,
        subprotocols: &[String],
        events: Arc<dyn TransportEvents>,
    ) -> Arc<dyn Transport> {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let transport = Arc::new(WsTransport {
            state: RwLock::new(ReadyState::Connecting),
            negotiated: RwLock::new(None),
            out_tx,
            shutdown_tx,
        });

        tokio::spawn(WsTransport::run(
            Arc::clone(&transport),
            url.to_string(),
            subprotocols.to_vec(),
            self.connect_timeout,
            events,
            out_rx,
            shutdown_rx,
        ));

        transport
    }
}

/// A single WebSocket, alive from handshake start until closure.
pub struct WsTransport {
    state: RwLock<ReadyState>,
    negotiated: RwLock<Option<String>>,
    out_tx: mpsc::UnboundedSender<String>,
    shutdown_tx: mpsc::Sender<()>,
}

impl WsTransport {
    /// Builds the handshake request carrying the subprotocol offer.
    fn build_request(
        url: &str,
        subprotocols: &[String],
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        if !subprotocols.is_empty() {
            let offer = subprotocols.join(", ");
            let value =
                HeaderValue::from_str(&offer).map_err(|e| TransportError::ConnectionFailed {
                    reason: format!("invalid subprotocol offer: {e}"),
                })?;
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        Ok(request)
    }

    #[allow(clippy::too_many_lines)]
    async fn run(
        this: Arc<Self>,
        url: String,
        subprotocols: Vec<String>,
        connect_timeout: Duration,
        events: Arc<dyn TransportEvents>,
        mut out_rx: mpsc::UnboundedReceiver<String>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let request = match Self::build_request(&url, &subprotocols) {
            Ok(request) => request,
            Err(error) => {
                *this.state.write() = ReadyState::Closed;
                events.on_error(error).await;
                events.on_close().await;
                return;
            }
        };

        let handshake = tokio::select! {
            _ = shutdown_rx.recv() => {
                *this.state.write() = ReadyState::Closed;
                events.on_close().await;
                return;
            }
            result = timeout(connect_timeout, connect_async(request)) => result,
        };

        let (stream, response) = match handshake {
            Ok(Ok(pair)) => pair,
            Ok(Err(error)) => {
                *this.state.write() = ReadyState::Closed;
                events
                    .on_error(TransportError::ConnectionFailed {
                        reason: error.to_string(),
                    })
                    .await;
                events.on_close().await;
                return;
            }
            Err(_) => {
                *this.state.write() = ReadyState::Closed;
                events
                    .on_error(TransportError::Timeout {
                        timeout_ms: connect_timeout.as_millis() as u64,
                    })
                    .await;
                events.on_close().await;
                return;
            }
        };

        let negotiated = response
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        debug!(url = %url, protocol = ?negotiated, "socket handshake complete");
        *this.negotiated.write() = negotiated;
        *this.state.write() = ReadyState::Open;
        events.on_open().await;

        let (sink, source) = stream.split();
        Self::pump(sink, source, &events, &mut out_rx, &mut shutdown_rx).await;

        *this.state.write() = ReadyState::Closed;
        events.on_close().await;
    }

    /// Frame pump: outbound channel to sink, source to the event handler.
    async fn pump(
        mut sink: WsSink,
        mut source: WsSource,
        events: &Arc<dyn TransportEvents>,
        out_rx: &mut mpsc::UnboundedReceiver<String>,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    let _ = sink.send(TungsteniteMessage::Close(None)).await;
                    break;
                }

                Some(text) = out_rx.recv() => {
                    if let Err(error) = sink.send(TungsteniteMessage::Text(text)).await {
                        warn!(%error, "failed to write frame");
                        events.on_error(TransportError::WebSocket {
                            reason: error.to_string(),
                        }).await;
                        break;
                    }
                }

                frame = source.next() => match frame {
                    Some(Ok(TungsteniteMessage::Text(text))) => events.on_message(text).await,
                    Some(Ok(TungsteniteMessage::Ping(payload))) => {
                        if let Err(error) = sink.send(TungsteniteMessage::Pong(payload)).await {
                            warn!(%error, "failed to answer ping frame");
                        }
                    }
                    Some(Ok(TungsteniteMessage::Close(_))) => {
                        debug!("peer sent close frame");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        events.on_error(TransportError::WebSocket {
                            reason: error.to_string(),
                        }).await;
                        break;
                    }
                    None => break,
                }
            }
        }
    }
}

impl Transport for WsTransport {
    fn ready_state(&self) -> ReadyState {
        *self.state.read()
    }

    fn protocol(&self) -> Option<String> {
        self.negotiated.read().clone()
    }

    fn send(&self, text: &str) -> bool {
        if !self.ready_state().is_open() {
            return false;
        }
        self.out_tx.send(text.to_string()).is_ok()
    }

    fn close(&self) -> Result<(), TransportError> {
        {
            let mut state = self.state.write();
            if matches!(*state, ReadyState::Closing | ReadyState::Closed) {
                return Ok(());
            }
            *state = ReadyState::Closing;
        }
        // A full shutdown channel means a close is already in flight.
        let _ = self.shutdown_tx.try_send(());
        Ok(())
    }
}
