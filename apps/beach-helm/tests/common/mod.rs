#![allow(dead_code)]

use std::sync::Arc;

use beach_helm::bridge::{BridgeError, BridgeEvent, ChatbotBridge, EventCallback, Subscription};
use beach_helm::host::{Document, ElementKind, ElementSpec, SelectOption};
use parking_lot::Mutex;
use serde_json::Value;

/// A signup page: an email field, a plan picker, a submit button, and two
/// elements that share the id `dup`.
pub fn signup_page() -> Arc<Document> {
    let document = Document::new();
    document.insert(ElementSpec::new(ElementKind::TextInput).with_id("email"));
    document.insert(
        ElementSpec::new(ElementKind::Select)
            .with_id("plan")
            .with_options(vec![
                SelectOption::new("free", "Free"),
                SelectOption::new("pro", "Professional"),
            ]),
    );
    document.insert(ElementSpec::new(ElementKind::Button).with_id("submit"));
    document.insert(ElementSpec::new(ElementKind::Container).with_id("dup"));
    document.insert(ElementSpec::new(ElementKind::Container).with_id("dup"));
    Arc::new(document)
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCall {
    Open,
    Close,
    Prompt(String, Option<Value>),
}

/// Bridge double that records every call and fans events out to subscribers.
#[derive(Default)]
pub struct RecordingBridge {
    open: Mutex<bool>,
    calls: Mutex<Vec<BridgeCall>>,
    listeners: Arc<Mutex<Vec<(usize, EventCallback)>>>,
    next_listener: Mutex<usize>,
}

impl RecordingBridge {
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.lock().clone()
    }

    fn emit(&self, event: BridgeEvent) {
        let listeners: Vec<EventCallback> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in listeners {
            callback(&event);
        }
    }
}

impl ChatbotBridge for RecordingBridge {
    fn open(&self) -> Result<(), BridgeError> {
        *self.open.lock() = true;
        self.calls.lock().push(BridgeCall::Open);
        self.emit(BridgeEvent::Opened);
        Ok(())
    }

    fn close(&self) -> Result<(), BridgeError> {
        *self.open.lock() = false;
        self.calls.lock().push(BridgeCall::Close);
        self.emit(BridgeEvent::Closed);
        Ok(())
    }

    fn is_open(&self) -> bool {
        *self.open.lock()
    }

    fn receive_prompt(&self, prompt: &str, metadata: Option<Value>) -> Result<(), BridgeError> {
        if !self.is_open() {
            return Err(BridgeError::Unavailable("bridge is closed".into()));
        }
        self.calls
            .lock()
            .push(BridgeCall::Prompt(prompt.to_string(), metadata.clone()));
        self.emit(BridgeEvent::PromptReceived {
            prompt: prompt.to_string(),
            metadata,
        });
        Ok(())
    }

    fn on_event(&self, callback: EventCallback) -> Subscription {
        let id = {
            let mut next = self.next_listener.lock();
            *next += 1;
            *next
        };
        self.listeners.lock().push((id, callback));
        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || listeners.lock().retain(|(other, _)| *other != id))
    }
}
