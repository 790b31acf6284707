//! Realtime update channel client for the Lectern platform.
//!
//! Lectern services push job progress, system metrics, group and assignment
//! rollups and conversation events to signed-in clients over one persistent
//! bidirectional connection. This crate owns that connection: it multiplexes
//! every logical subscription over it, rides out transient network loss via
//! transport-owned retries, and fans inbound events out verbatim to caller
//! hooks.
//!
//! The wire protocol itself lives behind the [`Transport`] trait; this crate
//! never opens sockets. Production code injects the platform's transport
//! stack through a [`TransportConnector`], tests inject a scripted one.
//!
//! ## Wiring
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lectern_realtime::{ClientConfig, EventCallbacks, RealtimeClient, StaticToken};
//!
//! # async fn example(connector: Arc<dyn lectern_realtime::TransportConnector>) {
//! let config = ClientConfig {
//!     base_url: "https://api.lectern.example".to_string(),
//!     token_supplier: Some(Arc::new(StaticToken("secret".into()))),
//!     callbacks: EventCallbacks {
//!         on_job_progress: Some(Arc::new(|payload| {
//!             println!("progress: {payload}");
//!         })),
//!         on_connected_change: Some(Arc::new(|up| {
//!             println!("channel up: {up}");
//!         })),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! let client = RealtimeClient::new(config, connector);
//! // Connects on first use, then opens the subscription.
//! client.subscribe_to_job("job-123").await.ok();
//! # }
//! ```
//!
//! ## Reconnection caveat
//!
//! The transport re-establishes a lost connection by itself, but topic
//! subscriptions are not replayed afterwards. Consumers that need
//! continuity resubscribe from their `on_connected_change(true)` handling.

pub mod client;
pub mod events;
pub mod token;
pub mod topic;
pub mod transport;

pub use client::{ClientConfig, RealtimeClient, StateSnapshot};
pub use events::EventCallbacks;
pub use token::{StaticToken, TokenSupplier};
pub use topic::Topic;
pub use transport::{
    ConnectionState, RetrySchedule, Transport, TransportConfig, TransportConnector, TransportError,
};
