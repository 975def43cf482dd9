//! Shared realtime stream session.
//!
//! A [`Stream`] owns the single live connection to the feed. It performs the
//! auth handshake, writes subscribe/unsubscribe commands, and runs one
//! background receive loop that republishes inbound frames on a bounded
//! message queue, reports asynchronous failures on a bounded error queue, and
//! reconnects when the peer closes the connection.
//!
//! One session exists per [`StreamRegistry`]; [`get_stream`] uses a
//! process-wide registry, so the first caller's credentials apply for the
//! lifetime of the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::retry::{with_timeout, RetryPolicy};
use crate::stream::client::{
    close_connection, decode_statuses, open_connection, read_frame, send_command, StreamError,
    WsSink, WsSource,
};
use crate::stream::proto::ClientMessage;

/// Default tuning for stream sessions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StreamDefaults;

impl StreamDefaults {
    pub const MAX_DIAL_ATTEMPTS: usize = 3;
    pub const DIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
    pub const AUTH_TIMEOUT: Duration = Duration::from_secs(5);
    pub const QUEUE_CAPACITY: usize = 100;
}

/// Tuning applied when a session is created.
#[derive(Clone, Debug)]
pub struct StreamOptions {
    /// Dial policy used for the first connection and every reconnect.
    pub dial_retry: RetryPolicy,
    /// Deadline for the auth reply.
    pub auth_timeout: Duration,
    /// Capacity of each output queue. A full message queue stalls the
    /// receive loop until the consumer catches up.
    pub queue_capacity: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            dial_retry: RetryPolicy::fixed(
                StreamDefaults::MAX_DIAL_ATTEMPTS,
                StreamDefaults::DIAL_RETRY_DELAY,
            ),
            auth_timeout: StreamDefaults::AUTH_TIMEOUT,
            queue_capacity: StreamDefaults::QUEUE_CAPACITY,
        }
    }
}

#[derive(Clone, Debug)]
struct Credentials {
    api_key: SecretString,
    endpoint: String,
}

/// Boolean flag that can be read without taking the session lock.
///
/// Stores use `Release` and loads use `Acquire`: a task that observes a
/// raised flag also observes every write the raising task made before it.
#[derive(Debug, Default)]
struct Flag(AtomicBool);

impl Flag {
    fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, value: bool) {
        self.0.store(value, Ordering::Release);
    }

    /// Raises the flag, returning true only for the call that raised it.
    fn raise_once(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Connection halves guarded by the session lock.
///
/// `reader` moves into the receive loop once it starts.
#[derive(Default)]
struct Link {
    writer: Option<WsSink>,
    reader: Option<WsSource>,
}

struct Outputs {
    messages: mpsc::Sender<Vec<u8>>,
    errors: mpsc::Sender<StreamError>,
}

/// The shared realtime session.
pub struct Stream {
    credentials: Credentials,
    options: StreamOptions,
    link: AsyncMutex<Link>,
    authenticated: Flag,
    closed: Flag,
    receiving: Flag,
    receive_task: Mutex<Option<JoinHandle<()>>>,
    outputs: Mutex<Option<Outputs>>,
    messages: AsyncMutex<mpsc::Receiver<Vec<u8>>>,
    errors: AsyncMutex<mpsc::Receiver<StreamError>>,
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("endpoint", &self.credentials.endpoint)
            .field("authenticated", &self.authenticated.get())
            .field("closed", &self.closed.get())
            .field("receiving", &self.receiving.get())
            .finish_non_exhaustive()
    }
}

impl Stream {
    fn new(credentials: Credentials, options: StreamOptions) -> Self {
        let capacity = options.queue_capacity.max(1);
        let (messages_tx, messages_rx) = mpsc::channel(capacity);
        let (errors_tx, errors_rx) = mpsc::channel(capacity);

        Self {
            credentials,
            options,
            link: AsyncMutex::new(Link::default()),
            authenticated: Flag::default(),
            closed: Flag::default(),
            receiving: Flag::default(),
            receive_task: Mutex::new(None),
            outputs: Mutex::new(Some(Outputs {
                messages: messages_tx,
                errors: errors_tx,
            })),
            messages: AsyncMutex::new(messages_rx),
            errors: AsyncMutex::new(errors_rx),
        }
    }

    /// Endpoint this session dials.
    pub fn endpoint(&self) -> &str {
        &self.credentials.endpoint
    }

    /// Returns true while the current connection has passed the auth
    /// handshake. Cleared on reconnect and close.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.get()
    }

    /// Returns true once [`Stream::close`] has shut the session down.
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Returns true once the background receive loop has been started.
    pub fn is_receiving(&self) -> bool {
        self.receiving.get()
    }

    /// Receives the next inbound payload.
    ///
    /// Payloads are forwarded verbatim; see
    /// [`decode_events`](crate::stream::proto::decode_events). Returns `None`
    /// after [`Stream::close`] once the queue is drained.
    pub async fn next_message(&self) -> Option<Vec<u8>> {
        self.messages.lock().await.recv().await
    }

    /// Receives the next error raised by the receive loop.
    pub async fn next_error(&self) -> Option<StreamError> {
        self.errors.lock().await.recv().await
    }

    /// Opens the connection if none exists yet, then authenticates.
    async fn register(&self) -> Result<(), StreamError> {
        if self.closed.get() {
            return Err(StreamError::Closed);
        }

        {
            let mut link = self.link.lock().await;
            if link.writer.is_none() {
                let (writer, reader) =
                    open_connection(&self.credentials.endpoint, &self.options.dial_retry).await?;
                link.writer = Some(writer);
                link.reader = Some(reader);
            }
        }

        self.authenticate().await
    }

    /// Authenticates the current connection. No-op when already
    /// authenticated.
    pub async fn authenticate(&self) -> Result<(), StreamError> {
        let mut link = self.link.lock().await;
        if self.authenticated.get() {
            return Ok(());
        }

        let Link { writer, reader } = &mut *link;
        let writer = writer.as_mut().ok_or(StreamError::NotInitialized)?;
        let reader = reader.as_mut().ok_or(StreamError::ReaderDetached)?;
        self.handshake_auth(writer, reader).await
    }

    /// Sends the auth command and validates the reply. Callers hold the
    /// session lock.
    async fn handshake_auth(
        &self,
        writer: &mut WsSink,
        reader: &mut WsSource,
    ) -> Result<(), StreamError> {
        let request = ClientMessage::auth(self.credentials.api_key.expose_secret().as_str());
        send_command(writer, &request).await?;

        let reply = with_timeout(self.options.auth_timeout, read_frame(reader))
            .await
            .map_err(|_| StreamError::AuthTimeout)??;
        let statuses = decode_statuses(&reply)?;

        let Some(first) = statuses.first() else {
            return Err(StreamError::AuthRejected {
                status: String::new(),
                message: "empty auth response".to_string(),
            });
        };
        if !first.is_auth_success() {
            warn!(event = "stream_auth_rejected", status = %first.status);
            return Err(StreamError::AuthRejected {
                status: first.status.clone(),
                message: first.message.clone(),
            });
        }

        self.authenticated.set(true);
        info!(event = "stream_authenticated", endpoint = %self.credentials.endpoint);
        Ok(())
    }

    /// Subscribes to a channel pattern such as `T.*` or `Q.AAPL,Q.MSFT`.
    ///
    /// The first call starts the receive loop. Patterns are passed through
    /// to the feed unvalidated.
    pub async fn subscribe(self: &Arc<Self>, channels: &str) -> Result<(), StreamError> {
        if self.closed.get() {
            return Err(StreamError::Closed);
        }
        self.start_receiving().await;
        self.send(&ClientMessage::subscribe(channels)).await?;
        debug!(event = "stream_subscribed", channels);
        Ok(())
    }

    /// Unsubscribes from a channel pattern, re-authenticating first if
    /// needed.
    pub async fn unsubscribe(&self, channels: &str) -> Result<(), StreamError> {
        if self.closed.get() {
            return Err(StreamError::Closed);
        }
        if self.link.lock().await.writer.is_none() {
            return Err(StreamError::NotInitialized);
        }
        self.authenticate().await?;
        self.send(&ClientMessage::unsubscribe(channels)).await?;
        debug!(event = "stream_unsubscribed", channels);
        Ok(())
    }

    async fn send(&self, message: &ClientMessage) -> Result<(), StreamError> {
        let mut link = self.link.lock().await;
        let writer = link.writer.as_mut().ok_or(StreamError::NotConnected)?;
        send_command(writer, message).await
    }

    /// Sends a normal-closure frame, closes both output queues and drops the
    /// connection. Closing a session without a connection is a no-op.
    ///
    /// The receive loop is stopped without waiting for the peer to answer the
    /// close frame, so both halves of the socket are released on return.
    ///
    /// A closed session is terminal: later subscribe, unsubscribe and
    /// registration calls return [`StreamError::Closed`]. The session is
    /// closed even when the close frame cannot be sent; that error is still
    /// returned.
    pub async fn close(&self) -> Result<(), StreamError> {
        let mut link = self.link.lock().await;
        let Some(mut writer) = link.writer.take() else {
            return Ok(());
        };
        link.reader = None;

        self.closed.set(true);
        let sent = close_connection(&mut writer).await;
        self.stop_receiving();
        drop(writer);
        self.close_outputs();
        self.authenticated.set(false);
        info!(event = "stream_closed", endpoint = %self.credentials.endpoint);
        sent
    }

    /// Aborts the receive loop, dropping the read half it owns.
    fn stop_receiving(&self) {
        let task = self
            .receive_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }

    fn close_outputs(&self) {
        let outputs = self
            .outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(outputs);
    }

    async fn start_receiving(self: &Arc<Self>) {
        if !self.receiving.raise_once() {
            return;
        }

        // Handle is stored under the link lock, which close also takes.
        let mut link = self.link.lock().await;
        let Some(reader) = link.reader.take() else {
            warn!(event = "stream_receive_loop_skipped", reason = "no connection reader");
            return;
        };
        let stream = Arc::clone(self);
        let task = tokio::spawn(async move {
            stream.receive_loop(reader).await;
        });
        *self
            .receive_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);
        drop(link);
    }

    async fn receive_loop(self: Arc<Self>, mut reader: WsSource) {
        info!(event = "stream_receive_loop_started", endpoint = %self.credentials.endpoint);

        loop {
            let error = match read_frame(&mut reader).await {
                Ok(payload) => {
                    if !self.deliver_message(payload).await {
                        break;
                    }
                    continue;
                }
                Err(error) => error,
            };

            if self.closed.get() {
                break;
            }

            if error.is_peer_close() {
                warn!(event = "stream_peer_closed", error = %error);
                match self.reconnect().await {
                    Ok(next) => {
                        reader = next;
                        continue;
                    }
                    Err(err) => {
                        if !self.closed.get() {
                            warn!(event = "stream_reconnect_failed", error = %err);
                            self.deliver_error(err).await;
                        }
                        break;
                    }
                }
            }

            debug!(event = "stream_read_error", error = %error);
            self.deliver_error(error).await;
        }

        info!(event = "stream_receive_loop_stopped", endpoint = %self.credentials.endpoint);
    }

    /// Replaces the connection and re-authenticates. Previously subscribed
    /// channels are not resent.
    async fn reconnect(&self) -> Result<WsSource, StreamError> {
        let mut link = self.link.lock().await;
        if self.closed.get() {
            return Err(StreamError::Closed);
        }

        self.authenticated.set(false);
        link.writer = None;
        link.reader = None;
        info!(event = "stream_reconnecting", endpoint = %self.credentials.endpoint);

        let (mut writer, mut reader) =
            open_connection(&self.credentials.endpoint, &self.options.dial_retry).await?;
        let authed = self.handshake_auth(&mut writer, &mut reader).await;
        link.writer = Some(writer);
        match authed {
            Ok(()) => Ok(reader),
            Err(err) => {
                link.reader = Some(reader);
                Err(err)
            }
        }
    }

    fn output_senders(&self) -> Option<(mpsc::Sender<Vec<u8>>, mpsc::Sender<StreamError>)> {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|outputs| (outputs.messages.clone(), outputs.errors.clone()))
    }

    /// Blocks while the message queue is full. Returns false once the
    /// queues have been closed.
    async fn deliver_message(&self, payload: Vec<u8>) -> bool {
        let Some((messages, _)) = self.output_senders() else {
            return false;
        };
        messages.send(payload).await.is_ok()
    }

    async fn deliver_error(&self, error: StreamError) {
        if let Some((_, errors)) = self.output_senders() {
            let _ = errors.send(error).await;
        }
    }
}

/// Lazily creates and hands out a single shared [`Stream`].
///
/// The first acquisition fixes the session's credentials and options; later
/// calls reuse the same session and only re-run registration. [`reset`]
/// forgets the session so a fresh one can be created.
///
/// [`reset`]: StreamRegistry::reset
#[derive(Debug, Default)]
pub struct StreamRegistry {
    slot: Mutex<Option<Arc<Stream>>>,
}

impl StreamRegistry {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Returns the shared session, creating it with default options on first
    /// use, and ensures it is connected and authenticated.
    pub async fn acquire(
        &self,
        api_key: SecretString,
        endpoint: impl Into<String>,
    ) -> Result<Arc<Stream>, StreamError> {
        self.acquire_with_options(api_key, endpoint, StreamOptions::default())
            .await
    }

    /// Like [`StreamRegistry::acquire`], with explicit options for the
    /// session if this call creates it.
    pub async fn acquire_with_options(
        &self,
        api_key: SecretString,
        endpoint: impl Into<String>,
        options: StreamOptions,
    ) -> Result<Arc<Stream>, StreamError> {
        let stream = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            let stream = slot.get_or_insert_with(|| {
                Arc::new(Stream::new(
                    Credentials {
                        api_key,
                        endpoint: endpoint.into(),
                    },
                    options,
                ))
            });
            Arc::clone(stream)
        };

        stream.register().await?;
        Ok(stream)
    }

    /// Returns the current session without registering it.
    pub fn current(&self) -> Option<Arc<Stream>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forgets the current session, returning it if one existed.
    pub fn reset(&self) -> Option<Arc<Stream>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

static GLOBAL_STREAM: StreamRegistry = StreamRegistry::new();

/// Returns the process-wide stream session, connecting and authenticating it
/// as needed.
///
/// Credentials passed after the first call are ignored.
pub async fn get_stream(
    api_key: SecretString,
    endpoint: impl Into<String>,
) -> Result<Arc<Stream>, StreamError> {
    GLOBAL_STREAM.acquire(api_key, endpoint).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use secrecy::SecretString;

    use super::{Credentials, Flag, Stream, StreamDefaults, StreamOptions, StreamRegistry};
    use crate::stream::client::StreamError;

    fn detached_stream() -> Stream {
        Stream::new(
            Credentials {
                api_key: SecretString::new("test-key".to_string()),
                endpoint: "ws://127.0.0.1:9/stocks".to_string(),
            },
            StreamOptions::default(),
        )
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime")
    }

    #[test]
    fn default_options_match_stream_defaults() {
        let options = StreamOptions::default();
        assert_eq!(options.dial_retry.max_attempts, StreamDefaults::MAX_DIAL_ATTEMPTS);
        assert_eq!(options.dial_retry.max_attempts, 3);
        assert_eq!(options.dial_retry.delay, StreamDefaults::DIAL_RETRY_DELAY);
        assert_eq!(options.auth_timeout, StreamDefaults::AUTH_TIMEOUT);
        assert_eq!(options.queue_capacity, 100);
    }

    #[test]
    fn flag_raises_exactly_once_across_threads() {
        let flag = Arc::new(Flag::default());
        let winners: usize = (0..8)
            .map(|_| {
                let flag = Arc::clone(&flag);
                thread::spawn(move || flag.raise_once())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| usize::from(handle.join().expect("join")))
            .sum();

        assert_eq!(winners, 1);
        assert!(flag.get());
        flag.set(false);
        assert!(!flag.get());
    }

    #[test]
    fn close_without_connection_is_a_noop() {
        runtime().block_on(async {
            let stream = detached_stream();
            stream.close().await.expect("first close");
            stream.close().await.expect("second close");
            assert!(!stream.is_closed());
        });
    }

    #[test]
    fn unsubscribe_before_connecting_is_rejected() {
        runtime().block_on(async {
            let stream = detached_stream();
            let err = stream.unsubscribe("T.*").await.expect_err("no connection");
            assert!(matches!(err, StreamError::NotInitialized));
        });
    }

    #[test]
    fn authenticate_without_connection_is_rejected() {
        runtime().block_on(async {
            let stream = detached_stream();
            let err = stream.authenticate().await.expect_err("no connection");
            assert!(matches!(err, StreamError::NotInitialized));
            assert!(!stream.is_authenticated());
        });
    }

    #[test]
    fn closing_outputs_ends_both_queues() {
        runtime().block_on(async {
            let stream = detached_stream();
            stream.close_outputs();
            stream.close_outputs();
            assert!(stream.next_message().await.is_none());
            assert!(stream.next_error().await.is_none());
        });
    }

    #[test]
    fn registry_reset_forgets_the_session() {
        let registry = StreamRegistry::new();
        assert!(registry.current().is_none());
        assert!(registry.reset().is_none());
    }
}
