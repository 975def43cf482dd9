//! Low-level websocket transport for the realtime feed.
//!
//! Dialing (with bounded retries and greeting validation), command writes,
//! frame reads with peer-close classification, and the normal-closure
//! handshake. Session state lives in [`crate::stream::session`].

use std::borrow::Cow;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::retry::{retry_async, RetryPolicy};
use crate::stream::proto::{ClientMessage, StatusMsg};

/// Realtime endpoint for the stocks cluster.
pub const STOCKS_STREAM_ENDPOINT: &str = "wss://socket.polygon.io/stocks";
/// Realtime endpoint for the forex cluster.
pub const FOREX_STREAM_ENDPOINT: &str = "wss://socket.polygon.io/forex";
/// Realtime endpoint for the crypto cluster.
pub const CRYPTO_STREAM_ENDPOINT: &str = "wss://socket.polygon.io/crypto";

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
/// Write half of a live feed connection.
pub(crate) type WsSink = SplitSink<WsStream, Message>;
/// Read half of a live feed connection.
pub(crate) type WsSource = SplitStream<WsStream>;

/// Errors produced by the realtime stream transport and session.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Websocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] WsError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Every dial attempt failed.
    #[error("could not open stream (max retries exceeded after {attempts} attempts): {source}")]
    MaxRetriesExceeded {
        attempts: usize,
        #[source]
        source: Box<StreamError>,
    },

    /// No auth reply arrived before the deadline.
    #[error("timed out waiting for auth response")]
    AuthTimeout,

    /// The feed answered the auth command with something other than success.
    #[error("failed to authorize stream (status {status:?}): {message}")]
    AuthRejected { status: String, message: String },

    /// The peer closed the connection.
    #[error("connection closed by peer: {reason}")]
    PeerClosed { reason: String },

    /// Unsubscribe was requested before any connection was opened.
    #[error("connection has not been initialized")]
    NotInitialized,

    /// A command was written while no connection is held.
    #[error("stream is not connected")]
    NotConnected,

    /// Re-authentication needs the read half, which the receive loop owns.
    #[error("cannot re-authenticate: the receive loop owns the connection reader")]
    ReaderDetached,

    /// The session was closed.
    #[error("stream is closed")]
    Closed,
}

impl StreamError {
    /// Returns true for the protocol-close class that triggers a reconnect.
    pub fn is_peer_close(&self) -> bool {
        matches!(self, Self::PeerClosed { .. })
    }
}

/// Dials `endpoint` under `policy`, validating the greeting on every attempt.
///
/// A greeting that is not a JSON status array fails the attempt.
pub(crate) async fn open_connection(
    endpoint: &str,
    policy: &RetryPolicy,
) -> Result<(WsSink, WsSource), StreamError> {
    let attempts = policy.max_attempts.max(1);
    retry_async(policy, |attempt| async move {
        debug!(event = "stream_dial_attempt", attempt, endpoint);
        let result = dial(endpoint).await;
        if let Err(err) = &result {
            debug!(event = "stream_dial_failed", attempt, error = %err);
        }
        result
    })
    .await
    .map_err(|source| StreamError::MaxRetriesExceeded {
        attempts,
        source: Box::new(source),
    })
}

async fn dial(endpoint: &str) -> Result<(WsSink, WsSource), StreamError> {
    let (socket, _) = connect_async(endpoint).await?;
    let (sink, mut source) = socket.split();

    // Any status array is a valid greeting, including an empty one.
    let greeting = read_frame(&mut source).await?;
    let statuses = decode_statuses(&greeting)?;
    let status = statuses.first().map_or("", |status| status.status.as_str());
    info!(event = "stream_connected", endpoint, status);
    Ok((sink, source))
}

/// Decodes an array of status messages, as sent in the greeting and auth
/// reply frames.
pub(crate) fn decode_statuses(payload: &[u8]) -> Result<Vec<StatusMsg>, StreamError> {
    serde_json::from_slice(payload).map_err(StreamError::Json)
}

/// Writes one command as a JSON text frame.
pub(crate) async fn send_command(
    sink: &mut WsSink,
    message: &ClientMessage,
) -> Result<(), StreamError> {
    let text = message.to_text()?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}

/// Reads the next data frame, skipping control frames.
///
/// A close frame, end of stream, or a reset without closing handshake is
/// reported as [`StreamError::PeerClosed`].
pub(crate) async fn read_frame(source: &mut WsSource) -> Result<Vec<u8>, StreamError> {
    loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text.into_bytes()),
            Some(Ok(Message::Binary(payload))) => return Ok(payload),
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|frame| format!("{} {}", u16::from(frame.code), frame.reason))
                    .unwrap_or_else(|| "close frame without status".to_string());
                return Err(StreamError::PeerClosed { reason });
            }
            Some(Err(err)) => return Err(classify_read_error(err)),
            None => {
                return Err(StreamError::PeerClosed {
                    reason: "stream ended".to_string(),
                })
            }
        }
    }
}

fn classify_read_error(err: WsError) -> StreamError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => StreamError::PeerClosed {
            reason: err.to_string(),
        },
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            StreamError::PeerClosed {
                reason: err.to_string(),
            }
        }
        other => StreamError::WebSocket(other),
    }
}

/// Sends a normal-closure frame and flushes the write half.
pub(crate) async fn close_connection(sink: &mut WsSink) -> Result<(), StreamError> {
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: Cow::Borrowed(""),
    };
    sink.send(Message::Close(Some(frame))).await?;
    if let Err(err) = sink.close().await {
        debug!(event = "stream_close_flush_failed", error = %err);
    }
    Ok(())
}
