//! In-process connector for tests. Each successful `connect` hands the far
//! end of the link to the test as a [`MockPeer`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Connector, Link, TransportError};

/// Controller side of a mock link.
pub struct MockPeer {
    to_helm: Option<mpsc::UnboundedSender<String>>,
    from_helm: mpsc::UnboundedReceiver<String>,
}

impl MockPeer {
    /// Delivers a raw frame to the helm. Returns false once the helm side is gone.
    pub fn send(&self, frame: impl Into<String>) -> bool {
        self.to_helm
            .as_ref()
            .is_some_and(|tx| tx.send(frame.into()).is_ok())
    }

    /// Next frame the helm wrote, or `None` once the helm dropped the link.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_helm.recv().await
    }

    /// Simulates the controller closing the connection.
    pub fn close(&mut self) {
        self.to_helm = None;
    }
}

#[derive(Default)]
struct Script {
    failures: VecDeque<String>,
    peers: Option<mpsc::UnboundedSender<MockPeer>>,
}

/// Connector whose outcomes are scripted by the test.
#[derive(Clone, Default)]
pub struct MockConnector {
    script: Arc<Mutex<Script>>,
    attempts: Arc<AtomicUsize>,
}

impl MockConnector {
    /// Returns the connector plus the stream of peers it accepts.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self::default();
        connector.script.lock().peers = Some(tx);
        (connector, rx)
    }

    /// The next `count` connect attempts fail before any succeeds.
    pub fn fail_next(&self, count: usize) {
        let mut script = self.script.lock();
        for _ in 0..count {
            script.failures.push_back("scripted connect failure".to_string());
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock();
        if let Some(reason) = script.failures.pop_front() {
            return Err(TransportError::Connect {
                endpoint: "mock://helm".to_string(),
                reason,
            });
        }

        let (to_helm, inbound) = mpsc::unbounded_channel();
        let (outbound, from_helm) = mpsc::unbounded_channel();
        let peer = MockPeer {
            to_helm: Some(to_helm),
            from_helm,
        };
        let accepted = script
            .peers
            .as_ref()
            .is_some_and(|peers| peers.send(peer).is_ok());
        if !accepted {
            return Err(TransportError::Closed);
        }
        Ok(Link { outbound, inbound })
    }
}
