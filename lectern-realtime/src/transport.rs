//! Transport seam for the update channel.
//!
//! The wire protocol (handshake, framing, keep-alive) lives behind the
//! [`Transport`] trait. A [`TransportConnector`] builds one transport from a
//! [`TransportConfig`]; the client registers its event handlers and lifecycle
//! hooks on it before the first `start`. Reconnection is owned by the
//! transport itself, driven by the [`RetrySchedule`] it was built with.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Connection lifecycle of the channel.
///
/// `Connecting` tracks an explicit `connect` in flight; transport-owned
/// retry cycles report `Reconnecting` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No live connection.
    #[default]
    Disconnected,
    /// An explicit connect is in flight.
    Connecting,
    /// The channel is up.
    Connected,
    /// The transport lost the connection and is retrying on its own.
    Reconnecting,
}

/// Errors surfaced by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("the connection was stopped during negotiation")]
    StartAborted,
    #[error("not connected")]
    NotConnected,
    #[error("negotiation failed: {0}")]
    Handshake(String),
    #[error("remote invoke {method} failed: {reason}")]
    Invoke { method: String, reason: String },
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether this is the benign start/stop race: a `start` aborted because
    /// `stop` was called while the handshake was still in flight.
    ///
    /// [`TransportError::StartAborted`] is the structured signal. The message
    /// probe is a fallback for transports that only report the condition as
    /// text, and breaks if they ever reword it.
    pub fn is_start_aborted(&self) -> bool {
        match self {
            Self::StartAborted => true,
            other => other.to_string().contains("stopped during negotiation"),
        }
    }
}

/// Async closure the transport calls to fetch a bearer token for each
/// (re)connection attempt. Always yields a token; an empty string means
/// connect anonymously.
pub type AccessTokenFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = String> + Send>> + Send + Sync>;

/// Handler for one named inbound event. Receives the raw payload.
pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Hook fired when the connection closes for good (stop requested, or
/// retries exhausted). Carries the closing error, if any.
pub type CloseHook = Arc<dyn Fn(Option<String>) + Send + Sync>;

/// Hook fired when the transport starts an automatic retry cycle.
pub type ReconnectingHook = Arc<dyn Fn(Option<String>) + Send + Sync>;

/// Hook fired when an automatic retry succeeds. Carries the new
/// server-assigned connection id.
pub type ReconnectedHook = Arc<dyn Fn(Option<String>) + Send + Sync>;

/// Delay schedule for transport-owned reconnection attempts.
///
/// Indexed by the transport's retry counter; past the end the last entry
/// repeats, so long outages settle at the longest delay instead of giving up.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    /// Delay before each retry, by zero-based attempt number.
    pub delays: Vec<Duration>,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(10),
            ],
        }
    }
}

impl RetrySchedule {
    /// Delay for the given retry attempt. An empty schedule yields zero.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        match self.delays.get(attempt).or_else(|| self.delays.last()) {
            Some(delay) => *delay,
            None => Duration::ZERO,
        }
    }
}

/// Everything a connector needs to build a transport for the channel.
pub struct TransportConfig {
    /// Full endpoint URL (base URL with the hub path appended).
    pub url: String,
    /// Produces the bearer token for each (re)connection attempt.
    pub access_token: AccessTokenFn,
    /// Delay schedule for transport-owned reconnection.
    pub retry: RetrySchedule,
}

/// One bidirectional connection to the push endpoint.
///
/// Implementations own the wire protocol and the retry loop. Handlers and
/// hooks are registered once, right after construction; the transport keeps
/// them across its own reconnects.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection. Resolves once the handshake completes.
    async fn start(&self) -> Result<(), TransportError>;

    /// Close the connection. The close hook still fires.
    async fn stop(&self) -> Result<(), TransportError>;

    /// Invoke a remote procedure and await its completion.
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<(), TransportError>;

    /// Register the handler for a named inbound event.
    fn on(&self, event: &'static str, handler: EventHandler);

    /// Register the hook fired when the connection closes for good.
    fn on_close(&self, hook: CloseHook);

    /// Register the hook fired when an automatic retry cycle starts.
    fn on_reconnecting(&self, hook: ReconnectingHook);

    /// Register the hook fired when an automatic retry succeeds.
    fn on_reconnected(&self, hook: ReconnectedHook);

    /// Current connection lifecycle state, as the transport sees it.
    fn state(&self) -> ConnectionState;

    /// Server-assigned id of the live connection, if any.
    fn connection_id(&self) -> Option<String>;
}

/// Builds the one transport a client uses for its lifetime.
///
/// Separated from the client so tests and alternative wire stacks can
/// inject their own transport.
pub trait TransportConnector: Send + Sync {
    /// Build a transport for the given endpoint configuration.
    fn build(&self, config: TransportConfig) -> Arc<dyn Transport>;
}
