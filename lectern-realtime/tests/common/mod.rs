//! Shared test transport: scripted outcomes, recorded calls, and lifecycle
//! hooks the tests fire by hand. `stop` does not fire the close hook on its
//! own; tests drive hooks explicitly via the `fire_*` helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use lectern_realtime::events::{ConnectedChangeCallback, ErrorCallback};
use lectern_realtime::transport::{
    CloseHook, ConnectionState, EventHandler, ReconnectedHook, ReconnectingHook, Transport,
    TransportConfig, TransportConnector, TransportError,
};
use lectern_realtime::{ClientConfig, EventCallbacks, RealtimeClient};

#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<ConnectionState>,
    connection_id: Mutex<Option<String>>,
    /// Id the next successful `start` assigns.
    next_connection_id: Mutex<String>,
    /// Outcomes consumed by successive `start` calls; empty means success.
    start_script: Mutex<Vec<Result<(), TransportError>>>,
    /// Error the next `stop` returns.
    stop_error: Mutex<Option<TransportError>>,
    /// Error the next `invoke` returns.
    invoke_error: Mutex<Option<TransportError>>,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    /// Every invoke, in order.
    pub invocations: Mutex<Vec<(String, Vec<Value>)>>,
    handlers: Mutex<Vec<(&'static str, EventHandler)>>,
    close_hook: Mutex<Option<CloseHook>>,
    reconnecting_hook: Mutex<Option<ReconnectingHook>>,
    reconnected_hook: Mutex<Option<ReconnectedHook>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        let transport = Self::default();
        *transport.next_connection_id.lock() = "conn-1".to_string();
        Arc::new(transport)
    }

    pub fn script_start(&self, outcome: Result<(), TransportError>) {
        self.start_script.lock().push(outcome);
    }

    pub fn script_stop_error(&self, error: TransportError) {
        *self.stop_error.lock() = Some(error);
    }

    pub fn script_invoke_error(&self, error: TransportError) {
        *self.invoke_error.lock() = Some(error);
    }

    pub fn set_next_connection_id(&self, id: &str) {
        *self.next_connection_id.lock() = id.to_string();
    }

    /// Deliver an inbound event the way the wire would.
    pub fn push_event(&self, event: &str, payload: Value) {
        let handlers: Vec<EventHandler> = self
            .handlers
            .lock()
            .iter()
            .filter(|(name, _)| *name == event)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(payload.clone());
        }
    }

    /// Connection closed for good.
    pub fn fire_close(&self, error: Option<&str>) {
        *self.state.lock() = ConnectionState::Disconnected;
        *self.connection_id.lock() = None;
        let hook = self.close_hook.lock().clone();
        if let Some(hook) = hook {
            hook(error.map(|e| e.to_string()));
        }
    }

    /// Transport began an automatic retry cycle.
    pub fn fire_reconnecting(&self, error: Option<&str>) {
        *self.state.lock() = ConnectionState::Reconnecting;
        let hook = self.reconnecting_hook.lock().clone();
        if let Some(hook) = hook {
            hook(error.map(|e| e.to_string()));
        }
    }

    /// Automatic retry succeeded under a new connection id.
    pub fn fire_reconnected(&self, connection_id: &str) {
        *self.state.lock() = ConnectionState::Connected;
        *self.connection_id.lock() = Some(connection_id.to_string());
        let hook = self.reconnected_hook.lock().clone();
        if let Some(hook) = hook {
            hook(Some(connection_id.to_string()));
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn start(&self) -> Result<(), TransportError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        // One yield so racing callers interleave.
        tokio::task::yield_now().await;
        let outcome = {
            let mut script = self.start_script.lock();
            if script.is_empty() { Ok(()) } else { script.remove(0) }
        };
        match outcome {
            Ok(()) => {
                *self.state.lock() = ConnectionState::Connected;
                *self.connection_id.lock() = Some(self.next_connection_id.lock().clone());
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = ConnectionState::Disconnected;
                *self.connection_id.lock() = None;
                Err(e)
            }
        }
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = ConnectionState::Disconnected;
        *self.connection_id.lock() = None;
        match self.stop_error.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<(), TransportError> {
        if *self.state.lock() != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }
        self.invocations.lock().push((method.to_string(), args));
        match self.invoke_error.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn on(&self, event: &'static str, handler: EventHandler) {
        self.handlers.lock().push((event, handler));
    }

    fn on_close(&self, hook: CloseHook) {
        *self.close_hook.lock() = Some(hook);
    }

    fn on_reconnecting(&self, hook: ReconnectingHook) {
        *self.reconnecting_hook.lock() = Some(hook);
    }

    fn on_reconnected(&self, hook: ReconnectedHook) {
        *self.reconnected_hook.lock() = Some(hook);
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn connection_id(&self) -> Option<String> {
        self.connection_id.lock().clone()
    }
}

/// Hands out one pre-built scripted transport and records every config the
/// client asked to build with.
pub struct ScriptedConnector {
    transport: Arc<ScriptedTransport>,
    pub configs: Mutex<Vec<TransportConfig>>,
}

impl ScriptedConnector {
    pub fn new(transport: Arc<ScriptedTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            configs: Mutex::new(Vec::new()),
        })
    }
}

impl TransportConnector for ScriptedConnector {
    fn build(&self, config: TransportConfig) -> Arc<dyn Transport> {
        self.configs.lock().push(config);
        self.transport.clone()
    }
}

/// Client wired to a fresh scripted transport.
pub fn make_client(
    callbacks: EventCallbacks,
) -> (Arc<ScriptedTransport>, Arc<ScriptedConnector>, RealtimeClient) {
    let transport = ScriptedTransport::new();
    let connector = ScriptedConnector::new(transport.clone());
    let client = RealtimeClient::new(
        ClientConfig {
            base_url: "https://api.lectern.test".to_string(),
            callbacks,
            ..Default::default()
        },
        connector.clone(),
    );
    (transport, connector, client)
}

/// Connected-change hook appending every transition to a shared log.
pub fn connected_log() -> (Arc<Mutex<Vec<bool>>>, ConnectedChangeCallback) {
    let log: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
    let hook: ConnectedChangeCallback = {
        let log = log.clone();
        Arc::new(move |up| log.lock().push(up))
    };
    (log, hook)
}

/// Error hook appending every message to a shared log.
pub fn error_log() -> (Arc<Mutex<Vec<String>>>, ErrorCallback) {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let hook: ErrorCallback = {
        let log = log.clone();
        Arc::new(move |message| log.lock().push(message))
    };
    (log, hook)
}

/// Install a fmt subscriber so `RUST_LOG=debug cargo test` shows traces.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
