//! Realtime update channel client.
//!
//! One [`RealtimeClient`] owns one transport connection for its whole
//! lifetime and multiplexes every logical subscription over it. The
//! transport is built lazily on the first `connect` or subscribe call and
//! never replaced; `disconnect` stops it, a later `connect` restarts it.
//!
//! ## Connect semantics
//!
//! `connect` is idempotent and safe to race: concurrent callers share one
//! underlying start, and a call against a live channel only refreshes the
//! visible state. Connect failures never propagate to the caller; they
//! surface through [`RealtimeClient::last_error`] and the `on_error` hook.
//! A start aborted by a near-simultaneous `disconnect` is swallowed
//! entirely: no state change, no error, a debug trace only.
//!
//! ## Reconnection
//!
//! The transport re-establishes the connection on its own, paced by the
//! configured [`RetrySchedule`]. Topic subscriptions are not replayed
//! after a reconnect or a manual disconnect/connect cycle; consumers that
//! need continuity resubscribe from their `on_connected_change(true)`
//! handling.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::OnceCell;

use crate::events::{ALL_EVENTS, EventCallbacks};
use crate::token::{TokenSupplier, access_token_fn};
use crate::topic::Topic;
use crate::transport::{
    ConnectionState, RetrySchedule, Transport, TransportConfig, TransportConnector, TransportError,
};

/// Hub path appended to the configured base URL.
const HUB_PATH: &str = "/hubs/updates";

/// Configuration for the update channel client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the platform API, with or without a trailing slash.
    pub base_url: String,
    /// Bearer-token supplier consulted on every (re)connection attempt.
    /// `None` connects anonymously.
    pub token_supplier: Option<Arc<dyn TokenSupplier>>,
    /// Delay schedule for transport-owned reconnection.
    pub retry: RetrySchedule,
    /// Caller hooks for inbound events and lifecycle transitions.
    pub callbacks: EventCallbacks,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            token_supplier: None,
            retry: RetrySchedule::default(),
            callbacks: EventCallbacks::default(),
        }
    }
}

/// One consistent read of the client's visible state.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    pub state: ConnectionState,
    /// Whether the channel is up.
    pub connected: bool,
    /// Whether an explicit connect is in flight.
    pub connecting: bool,
    /// Message of the most recent connection failure.
    pub last_error: Option<String>,
    /// Server-assigned id of the live connection.
    pub connection_id: Option<String>,
}

#[derive(Default)]
struct StateCell {
    state: ConnectionState,
    connection_id: Option<String>,
    last_error: Option<String>,
}

/// State shared with the transport's lifecycle hooks.
struct Shared {
    state: Mutex<StateCell>,
    callbacks: EventCallbacks,
}

impl Shared {
    /// Fire the connected-change hook. Callers must not hold the state
    /// lock.
    fn notify_connected(&self, connected: bool) {
        if let Some(hook) = &self.callbacks.on_connected_change {
            hook(connected);
        }
    }

    /// Channel is up after an explicit connect: record the id, clear any
    /// stale error, notify.
    fn mark_connected(&self, connection_id: Option<String>) {
        {
            let mut cell = self.state.lock();
            cell.state = ConnectionState::Connected;
            cell.connection_id = connection_id;
            cell.last_error = None;
        }
        self.notify_connected(true);
    }

    /// Explicit connect failed: drop to `Disconnected`, record the error,
    /// tell the consumer. The connected-change hook does not fire; the
    /// channel was never up.
    fn fail_connect(&self, message: String) {
        {
            let mut cell = self.state.lock();
            cell.state = ConnectionState::Disconnected;
            cell.connection_id = None;
            cell.last_error = Some(message.clone());
        }
        if let Some(hook) = &self.callbacks.on_error {
            hook(message);
        }
    }

    /// A start aborted by a concurrent stop: leave everything as it was,
    /// except that the connect is no longer in flight.
    fn clear_connecting(&self) {
        let mut cell = self.state.lock();
        if cell.state == ConnectionState::Connecting {
            cell.state = ConnectionState::Disconnected;
        }
    }

    /// Channel is down: clear the connection identity, notify.
    fn mark_disconnected(&self) {
        {
            let mut cell = self.state.lock();
            cell.state = ConnectionState::Disconnected;
            cell.connection_id = None;
        }
        self.notify_connected(false);
    }

    /// Transport lost the connection and is retrying on its own.
    fn mark_reconnecting(&self) {
        self.state.lock().state = ConnectionState::Reconnecting;
        self.notify_connected(false);
    }

    /// Transport finished an automatic reconnect, possibly under a fresh
    /// server-assigned id.
    fn mark_reconnected(&self, connection_id: Option<String>) {
        {
            let mut cell = self.state.lock();
            cell.state = ConnectionState::Connected;
            cell.connection_id = connection_id;
        }
        self.notify_connected(true);
    }
}

/// Endpoint the transport connects to: the base URL, trailing slashes
/// trimmed, with the hub path appended.
fn hub_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), HUB_PATH)
}

/// Client for the platform's realtime update channel.
///
/// Owned by its consumer; create one per signed-in session and share it
/// via `Arc` where needed. All methods take `&self`.
pub struct RealtimeClient {
    config: ClientConfig,
    connector: Arc<dyn TransportConnector>,
    /// The single transport. Built lazily on first use, never replaced.
    transport: OnceCell<Arc<dyn Transport>>,
    /// Serializes `connect` so concurrent callers share one start.
    start_gate: AsyncMutex<()>,
    shared: Arc<Shared>,
}

impl RealtimeClient {
    /// Create a client. Nothing is opened until [`RealtimeClient::connect`]
    /// or the first subscribe call.
    pub fn new(config: ClientConfig, connector: Arc<dyn TransportConnector>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(StateCell::default()),
            callbacks: config.callbacks.clone(),
        });
        Self {
            config,
            connector,
            transport: OnceCell::new(),
            start_gate: AsyncMutex::new(()),
            shared,
        }
    }

    /// The client's transport, built on first use. Construction wires the
    /// inbound-event handlers and lifecycle hooks exactly once; concurrent
    /// first callers share one build.
    async fn ensure_transport(&self) -> Arc<dyn Transport> {
        self.transport
            .get_or_init(|| async { self.build_transport() })
            .await
            .clone()
    }

    fn build_transport(&self) -> Arc<dyn Transport> {
        let transport = self.connector.build(TransportConfig {
            url: hub_endpoint(&self.config.base_url),
            access_token: access_token_fn(self.config.token_supplier.clone()),
            retry: self.config.retry.clone(),
        });

        for event in ALL_EVENTS {
            let shared = self.shared.clone();
            transport.on(
                event,
                Arc::new(move |payload| {
                    shared.callbacks.dispatch(event, payload);
                }),
            );
        }

        let shared = self.shared.clone();
        transport.on_close(Arc::new(move |error| {
            match &error {
                Some(e) => tracing::warn!(error = %e, "update channel closed"),
                None => tracing::debug!("update channel closed"),
            }
            shared.mark_disconnected();
        }));

        let shared = self.shared.clone();
        transport.on_reconnecting(Arc::new(move |error| {
            tracing::debug!(
                error = error.as_deref().unwrap_or("connection lost"),
                "update channel reconnecting"
            );
            shared.mark_reconnecting();
        }));

        let shared = self.shared.clone();
        transport.on_reconnected(Arc::new(move |connection_id| {
            tracing::debug!(
                connection_id = connection_id.as_deref().unwrap_or(""),
                "update channel reconnected"
            );
            shared.mark_reconnected(connection_id);
        }));

        transport
    }

    /// Open the channel.
    ///
    /// Idempotent: a call against a live channel only refreshes the
    /// visible state, and concurrent callers share a single underlying
    /// start. Failures surface through [`RealtimeClient::last_error`] and
    /// the `on_error` hook, never as a return value; a start aborted by a
    /// concurrent [`RealtimeClient::disconnect`] is swallowed entirely.
    pub async fn connect(&self) {
        let transport = self.ensure_transport().await;
        let _gate = self.start_gate.lock().await;

        if transport.state() == ConnectionState::Connected {
            tracing::debug!("update channel already connected");
            self.shared.mark_connected(transport.connection_id());
            return;
        }

        self.shared.state.lock().state = ConnectionState::Connecting;
        match transport.start().await {
            Ok(()) => {
                tracing::debug!(
                    connection_id = transport.connection_id().as_deref().unwrap_or(""),
                    "update channel connected"
                );
                self.shared.mark_connected(transport.connection_id());
            }
            Err(e) if e.is_start_aborted() => {
                tracing::debug!("start aborted by a concurrent stop, ignoring");
                self.shared.clear_connecting();
            }
            Err(e) => {
                tracing::warn!(error = %e, "update channel connection failed");
                self.shared.fail_connect(e.to_string());
            }
        }
    }

    /// Close the channel.
    ///
    /// Local state drops to disconnected even when the transport refuses
    /// to stop cleanly; stop errors are logged, not surfaced.
    pub async fn disconnect(&self) {
        let live = match self.transport.get() {
            Some(transport) if transport.state() != ConnectionState::Disconnected => {
                Some(transport.clone())
            }
            _ => None,
        };
        if let Some(transport) = live
            && let Err(e) = transport.stop().await
        {
            tracing::warn!(error = %e, "update channel stop failed");
        }
        self.shared.mark_disconnected();
    }

    /// Open a logical subscription, connecting the channel first when it
    /// is not up yet.
    ///
    /// Connect failures stay on the `on_error` path (see
    /// [`RealtimeClient::connect`]); a failed remote invoke is returned,
    /// so callers know the feed never opened.
    pub async fn subscribe(&self, topic: Topic) -> Result<(), TransportError> {
        let transport = self.ensure_transport().await;
        if transport.state() != ConnectionState::Connected {
            self.connect().await;
        }
        tracing::debug!(method = topic.subscribe_method(), "subscribing");
        transport.invoke(topic.subscribe_method(), topic.args()).await
    }

    /// Close a logical subscription.
    ///
    /// A no-op when the channel is down: it never connects just to
    /// unsubscribe.
    pub async fn unsubscribe(&self, topic: Topic) -> Result<(), TransportError> {
        let Some(transport) = self.transport.get() else {
            return Ok(());
        };
        if transport.state() != ConnectionState::Connected {
            return Ok(());
        }
        tracing::debug!(method = topic.unsubscribe_method(), "unsubscribing");
        transport.invoke(topic.unsubscribe_method(), topic.args()).await
    }

    // ── Named subscriptions ──

    /// Follow progress and lifecycle of one job.
    pub async fn subscribe_to_job(&self, job_id: &str) -> Result<(), TransportError> {
        self.subscribe(Topic::Job(job_id.to_string())).await
    }

    pub async fn unsubscribe_from_job(&self, job_id: &str) -> Result<(), TransportError> {
        self.unsubscribe(Topic::Job(job_id.to_string())).await
    }

    /// Follow job updates rolled up per group.
    pub async fn subscribe_to_group_jobs(&self, group_id: &str) -> Result<(), TransportError> {
        self.subscribe(Topic::GroupJobs(group_id.to_string())).await
    }

    pub async fn unsubscribe_from_group_jobs(&self, group_id: &str) -> Result<(), TransportError> {
        self.unsubscribe(Topic::GroupJobs(group_id.to_string())).await
    }

    /// Follow job updates rolled up per assignment.
    pub async fn subscribe_to_assignment_jobs(
        &self,
        assignment_id: &str,
    ) -> Result<(), TransportError> {
        self.subscribe(Topic::AssignmentJobs(assignment_id.to_string())).await
    }

    pub async fn unsubscribe_from_assignment_jobs(
        &self,
        assignment_id: &str,
    ) -> Result<(), TransportError> {
        self.unsubscribe(Topic::AssignmentJobs(assignment_id.to_string())).await
    }

    /// Follow events in one conversation.
    pub async fn subscribe_to_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<(), TransportError> {
        self.subscribe(Topic::Conversation(conversation_id.to_string())).await
    }

    pub async fn unsubscribe_from_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<(), TransportError> {
        self.unsubscribe(Topic::Conversation(conversation_id.to_string())).await
    }

    /// Follow the host-wide system metrics feed.
    pub async fn subscribe_to_system_metrics(&self) -> Result<(), TransportError> {
        self.subscribe(Topic::SystemMetrics).await
    }

    pub async fn unsubscribe_from_system_metrics(&self) -> Result<(), TransportError> {
        self.unsubscribe(Topic::SystemMetrics).await
    }

    /// Follow every job on the platform.
    pub async fn subscribe_to_all_jobs(&self) -> Result<(), TransportError> {
        self.subscribe(Topic::AllJobs).await
    }

    pub async fn unsubscribe_from_all_jobs(&self) -> Result<(), TransportError> {
        self.unsubscribe(Topic::AllJobs).await
    }

    // ── State surface ──

    /// Whether the channel is up.
    pub fn connected(&self) -> bool {
        self.shared.state.lock().state == ConnectionState::Connected
    }

    /// Whether an explicit connect is in flight. Transport-owned retry
    /// cycles report `false` here and
    /// [`ConnectionState::Reconnecting`] in [`RealtimeClient::state`].
    pub fn connecting(&self) -> bool {
        self.shared.state.lock().state == ConnectionState::Connecting
    }

    /// Connection lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.lock().state
    }

    /// Message of the most recent connection failure, kept until the next
    /// successful connect.
    pub fn last_error(&self) -> Option<String> {
        self.shared.state.lock().last_error.clone()
    }

    /// Server-assigned id of the live connection.
    pub fn connection_id(&self) -> Option<String> {
        self.shared.state.lock().connection_id.clone()
    }

    /// All visible state in one consistent read.
    pub fn snapshot(&self) -> StateSnapshot {
        let cell = self.shared.state.lock();
        StateSnapshot {
            state: cell.state,
            connected: cell.state == ConnectionState::Connected,
            connecting: cell.state == ConnectionState::Connecting,
            last_error: cell.last_error.clone(),
            connection_id: cell.connection_id.clone(),
        }
    }
}
