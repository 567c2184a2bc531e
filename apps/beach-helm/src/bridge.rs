//! Contract for the chatbot bridge the `open`/`close` commands drive. The helm
//! only produces calls and prompts; the bridge UI lives with the host.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("chatbot bridge unavailable: {0}")]
    Unavailable(String),
    #[error("chatbot bridge rejected prompt: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Opened,
    Closed,
    PromptReceived {
        prompt: String,
        metadata: Option<Value>,
    },
}

pub type EventCallback = Arc<dyn Fn(&BridgeEvent) + Send + Sync>;

/// Handle returned by [`ChatbotBridge::on_event`]. The callback stays
/// registered until [`Subscription::unsubscribe`] is called.
#[must_use = "dropping a Subscription keeps the callback registered; call unsubscribe to remove it"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

pub trait ChatbotBridge: Send + Sync {
    fn open(&self) -> Result<(), BridgeError>;

    fn close(&self) -> Result<(), BridgeError>;

    fn is_open(&self) -> bool;

    fn receive_prompt(&self, prompt: &str, metadata: Option<Value>) -> Result<(), BridgeError>;

    fn on_event(&self, callback: EventCallback) -> Subscription;
}
