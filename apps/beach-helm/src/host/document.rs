use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Element, ElementHandle, ElementKind, ElementState, HostDocument, NodeId, SelectOption};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read document fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document fixture: {0}")]
    Fixture(#[from] serde_json::Error),
}

/// JSON fixture describing an initial set of elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSpec {
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    pub kind: ElementKind,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub styles: BTreeMap<String, String>,
}

impl ElementSpec {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            element_id: None,
            kind,
            value: String::new(),
            checked: false,
            disabled: false,
            hidden: false,
            read_only: false,
            options: Vec::new(),
            styles: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(name.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    fn into_element(self) -> Element {
        let selected_index = self
            .options
            .iter()
            .position(|option| !self.value.is_empty() && option.value == self.value);
        let state = ElementState {
            value: self.value,
            checked: self.checked,
            disabled: self.disabled,
            hidden: self.hidden,
            read_only: self.read_only,
            selected_index,
            options: self.options,
            styles: self.styles,
            ..ElementState::default()
        };
        Element::new(self.element_id, self.kind, state)
    }
}

/// In-memory host document. Element order is insertion order.
#[derive(Debug, Default)]
pub struct Document {
    elements: RwLock<Vec<ElementHandle>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_spec(spec: DocumentSpec) -> Self {
        let document = Self::new();
        for element in spec.elements {
            document.insert(element);
        }
        document
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let spec: DocumentSpec = serde_json::from_str(&raw)?;
        Ok(Self::from_spec(spec))
    }

    pub fn insert(&self, spec: ElementSpec) -> ElementHandle {
        let element = Arc::new(spec.into_element());
        self.elements.write().push(Arc::clone(&element));
        element
    }

    /// Detaches an element. Handles held elsewhere stay valid but the element
    /// no longer resolves.
    pub fn remove(&self, node_id: NodeId) -> Option<ElementHandle> {
        let mut elements = self.elements.write();
        let index = elements.iter().position(|el| el.node_id() == node_id)?;
        Some(elements.remove(index))
    }

    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }
}

impl HostDocument for Document {
    fn find_by_element_id(&self, element_id: &str) -> Vec<ElementHandle> {
        self.elements
            .read()
            .iter()
            .filter(|el| el.element_id() == Some(element_id))
            .cloned()
            .collect()
    }

    fn active_element(&self) -> Option<ElementHandle> {
        self.elements
            .read()
            .iter()
            .find(|el| el.state().focused)
            .cloned()
    }

    fn elements(&self) -> Vec<ElementHandle> {
        self.elements.read().clone()
    }
}
