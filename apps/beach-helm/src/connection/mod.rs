//! Transport lifecycle: connect, feed the dispatcher, reconnect with capped
//! backoff, tear down on `stop()`.

mod mock;
mod state;
mod websocket;

use std::sync::Arc;

use async_trait::async_trait;
use helm_proto::CommandResult;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::dispatch::{Dispatcher, parse_message};
use crate::metrics;

pub use mock::{MockConnector, MockPeer};
pub use state::{ConnectionEvent, ConnectionState, InvalidTransition};
pub use websocket::WebSocketConnector;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("link closed")]
    Closed,
    #[error("encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("not connected")]
    NotConnected,
    #[error("connection manager already started")]
    AlreadyStarted,
    #[error("connection manager stopped")]
    Stopped,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// One live duplex channel of text frames.
pub struct Link {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Link, TransportError>;
}

struct Inner {
    state: ConnectionState,
    attempt: i64,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Shared {
    fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::Idle,
                attempt: 0,
                outbound: None,
            }),
            state_tx,
        }
    }

    /// Applies `event`; the outbound sender is only retained while `Open`.
    fn transition(
        &self,
        event: ConnectionEvent,
        outbound: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<(ConnectionState, ConnectionState), InvalidTransition> {
        let mut inner = self.inner.lock();
        let previous = inner.state;
        let next = previous.apply(event)?;
        inner.state = next;
        match next {
            ConnectionState::Open => {
                inner.outbound = outbound;
                inner.attempt = 0;
            }
            _ => inner.outbound = None,
        }
        self.state_tx.send_replace(next);
        if previous != next {
            info!(
                target = "helm::connection",
                from = %previous,
                to = %next,
                "connection state changed"
            );
        }
        Ok((previous, next))
    }

    /// Moves to `Reconnecting` and returns the attempt index to back off
    /// for, post-incrementing the counter.
    fn dropped(&self) -> Result<i64, InvalidTransition> {
        self.transition(ConnectionEvent::Dropped, None)?;
        let mut inner = self.inner.lock();
        let attempt = inner.attempt;
        inner.attempt = inner.attempt.saturating_add(1);
        Ok(attempt)
    }
}

pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    dispatcher: Arc<Dispatcher>,
    backoff: BackoffPolicy,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        dispatcher: Arc<Dispatcher>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            connector,
            dispatcher,
            backoff,
            shared: Arc::new(Shared::new()),
            task: Mutex::new(None),
        }
    }

    /// Begins connecting. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), ConnectionError> {
        let mut task = self.task.lock();
        match self.shared.transition(ConnectionEvent::Start, None) {
            Ok(_) => {}
            Err(err) if err.state.is_terminal() => return Err(ConnectionError::Stopped),
            Err(_) => return Err(ConnectionError::AlreadyStarted),
        }
        *task = Some(tokio::spawn(run(
            Arc::clone(&self.shared),
            Arc::clone(&self.connector),
            Arc::clone(&self.dispatcher),
            self.backoff.clone(),
        )));
        Ok(())
    }

    /// Writes one frame to the open link. Never buffers.
    pub fn send(&self, message: impl Into<String>) -> Result<(), ConnectionError> {
        let inner = self.shared.inner.lock();
        match (&inner.state, &inner.outbound) {
            (ConnectionState::Open, Some(outbound)) => outbound
                .send(message.into())
                .map_err(|_| ConnectionError::Transport(TransportError::Closed)),
            _ => Err(ConnectionError::NotConnected),
        }
    }

    pub fn send_result(&self, result: &CommandResult) -> Result<(), ConnectionError> {
        let text = serde_json::to_string(result).map_err(TransportError::from)?;
        self.send(text)
    }

    /// Moves to `Closed` and cancels the connection task, including any
    /// pending reconnect delay. Safe to call repeatedly.
    pub fn stop(&self) {
        // Stop is valid from every state.
        let _ = self.shared.transition(ConnectionEvent::Stop, None);
        if let Some(task) = self.task.lock().take() {
            debug!(target = "helm::connection", "aborting connection task");
            task.abort();
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Reconnect attempts since the last successful open.
    pub fn attempt(&self) -> i64 {
        self.shared.inner.lock().attempt
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

async fn run(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    dispatcher: Arc<Dispatcher>,
    backoff: BackoffPolicy,
) {
    loop {
        match connector.connect().await {
            Ok(Link {
                outbound,
                mut inbound,
            }) => {
                if shared
                    .transition(ConnectionEvent::Opened, Some(outbound.clone()))
                    .is_err()
                {
                    return;
                }
                while let Some(frame) = inbound.recv().await {
                    let result = handle_frame(&dispatcher, &frame);
                    match serde_json::to_string(&result) {
                        Ok(text) => {
                            if outbound.send(text).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(
                                target = "helm::connection",
                                error = %err,
                                "failed to encode command result"
                            );
                        }
                    }
                }
                info!(target = "helm::connection", "link closed");
            }
            Err(err) => {
                warn!(target = "helm::connection", error = %err, "connect attempt failed");
            }
        }

        let Ok(attempt) = shared.dropped() else {
            return;
        };
        let delay = backoff.delay(attempt);
        metrics::RECONNECT_ATTEMPTS.inc();
        warn!(
            target = "helm::connection",
            attempt,
            ?delay,
            "scheduling reconnect"
        );
        tokio::time::sleep(delay).await;
        if shared
            .transition(ConnectionEvent::RetryElapsed, None)
            .is_err()
        {
            return;
        }
    }
}

fn handle_frame(dispatcher: &Dispatcher, frame: &str) -> CommandResult {
    match parse_message(frame) {
        Ok(payload) => dispatcher.dispatch(payload),
        Err(rejected) => {
            metrics::MALFORMED_MESSAGES.inc();
            warn!(
                target = "helm::connection",
                request_id = rejected.request_id.as_deref().unwrap_or(""),
                details = %rejected.details,
                "rejected malformed message"
            );
            rejected
        }
    }
}
