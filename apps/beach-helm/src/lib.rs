//! beach-helm: a remote controller drives a host UI over a persistent
//! websocket. Inbound command payloads are resolved to live elements, handed
//! to per-command handlers, and answered with exactly one result each.

pub mod backoff;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod effects;
pub mod handlers;
pub mod host;
pub mod metrics;
pub mod overlay;
pub mod target;
pub mod telemetry;

pub use helm_proto as proto;

pub use backoff::{BackoffPolicy, delay_for_attempt};
pub use bridge::{BridgeError, BridgeEvent, ChatbotBridge, Subscription};
pub use config::{ConfigError, HelmConfig};
pub use connection::{
    ConnectionError, ConnectionManager, ConnectionState, Connector, Link, MockConnector,
    TransportError, WebSocketConnector,
};
pub use dispatch::Dispatcher;
pub use handlers::{CommandHandler, HandlerContext, HandlerError, HandlerRegistry, Outcome};
pub use host::{Document, ElementHandle, HostDocument};
pub use overlay::{OverlayConfig, OverlayPatch, OverlayRegistry};
pub use target::TargetResolver;
