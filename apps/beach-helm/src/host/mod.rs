//! Host UI model the helm drives: elements, their mutable state, and the
//! lookup surface the resolver and handlers query.

pub mod document;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

pub use document::{Document, DocumentError, DocumentSpec, ElementSpec};

/// Shared handle to a live element. Identity is the element's [`NodeId`].
pub type ElementHandle = Arc<Element>;
/// Non-owning reference to an element; upgrading fails once the host drops it.
pub type WeakElement = Weak<Element>;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique element identity. Ids are never reused, so a stale id can
/// never alias a newer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lookup surface over the live host UI. Implementations must answer from
/// current state on every call.
pub trait HostDocument: Send + Sync {
    fn find_by_element_id(&self, element_id: &str) -> Vec<ElementHandle>;

    fn active_element(&self) -> Option<ElementHandle>;

    fn elements(&self) -> Vec<ElementHandle>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Button,
    Link,
    TextInput,
    TextArea,
    ContentEditable,
    Checkbox,
    Select,
    Container,
}

impl ElementKind {
    pub fn is_fillable(self) -> bool {
        matches!(
            self,
            ElementKind::TextInput | ElementKind::TextArea | ElementKind::ContentEditable
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Button => "button",
            ElementKind::Link => "link",
            ElementKind::TextInput => "text-input",
            ElementKind::TextArea => "text-area",
            ElementKind::ContentEditable => "content-editable",
            ElementKind::Checkbox => "checkbox",
            ElementKind::Select => "select",
            ElementKind::Container => "container",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(MouseButton::Left),
            "middle" => Some(MouseButton::Middle),
            "right" => Some(MouseButton::Right),
            _ => None,
        }
    }
}

/// A synthetic event dispatched on an element by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticEvent {
    pub name: &'static str,
    pub button: Option<MouseButton>,
    pub modifiers: Modifiers,
}

impl SyntheticEvent {
    pub fn plain(name: &'static str) -> Self {
        Self {
            name,
            button: None,
            modifiers: Modifiers::default(),
        }
    }

    pub fn mouse(name: &'static str, button: MouseButton, modifiers: Modifiers) -> Self {
        Self {
            name,
            button: Some(button),
            modifiers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Auto,
    Smooth,
    Instant,
}

impl ScrollBehavior {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(ScrollBehavior::Auto),
            "smooth" => Some(ScrollBehavior::Smooth),
            "instant" => Some(ScrollBehavior::Instant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAlignment {
    Start,
    Center,
    End,
    Nearest,
}

impl ScrollAlignment {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "start" => Some(ScrollAlignment::Start),
            "center" => Some(ScrollAlignment::Center),
            "end" => Some(ScrollAlignment::End),
            "nearest" => Some(ScrollAlignment::Nearest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub behavior: ScrollBehavior,
    pub block: ScrollAlignment,
    pub inline: ScrollAlignment,
}

#[derive(Debug, Clone, Default)]
pub struct ElementState {
    pub value: String,
    pub checked: bool,
    pub disabled: bool,
    pub hidden: bool,
    pub read_only: bool,
    pub focused: bool,
    pub hovered: bool,
    pub selected_index: Option<usize>,
    pub options: Vec<SelectOption>,
    pub styles: BTreeMap<String, String>,
    pub scrolled_into_view: Option<ScrollRequest>,
    pub events: Vec<SyntheticEvent>,
}

impl ElementState {
    pub fn dispatch(&mut self, event: SyntheticEvent) {
        self.events.push(event);
    }
}

#[derive(Debug)]
pub struct Element {
    node_id: NodeId,
    element_id: Option<String>,
    kind: ElementKind,
    state: Mutex<ElementState>,
}

impl Element {
    pub fn new(element_id: Option<String>, kind: ElementKind, state: ElementState) -> Self {
        Self {
            node_id: NodeId::next(),
            element_id,
            kind,
            state: Mutex::new(state),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn element_id(&self) -> Option<&str> {
        self.element_id.as_deref()
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn state(&self) -> MutexGuard<'_, ElementState> {
        self.state.lock()
    }

    pub fn snapshot(&self) -> ElementState {
        self.state.lock().clone()
    }

    /// Hidden or disabled elements do not accept simulated interaction.
    pub fn is_interactable(&self) -> bool {
        let state = self.state.lock();
        !state.hidden && !state.disabled
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.state.lock().events.iter().map(|event| event.name).collect()
    }

    /// Human-readable label used in result details.
    pub fn describe(&self) -> String {
        match &self.element_id {
            Some(id) => format!("\"{id}\""),
            None => format!("<{} #{}>", self.kind.as_str(), self.node_id.0),
        }
    }
}
