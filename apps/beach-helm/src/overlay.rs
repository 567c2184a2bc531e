//! Overlay registry: at most one overlay per target and per element id,
//! reachable by target identity, overlay id, and element id.
//!
//! The by-id index owns every [`OverlayConfig`]; the by-element-id index maps
//! onto it. The by-target index is a non-owning back-reference (it holds a
//! [`WeakElement`]) and is pruned only by explicit unregister/clear calls.
//! Every mutation goes through [`OverlayIndices::apply`] under a single write
//! lock, so callers never observe a half-applied register or unregister.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;

use crate::host::{ElementHandle, NodeId, WeakElement};

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub overlay_id: String,
    pub element_id: String,
    pub attributes: Map<String, Value>,
    target: WeakElement,
    target_node: Option<NodeId>,
}

impl OverlayConfig {
    /// A detached config; the registry binds it to a target on registration.
    pub fn new(overlay_id: impl Into<String>, element_id: impl Into<String>) -> Self {
        Self {
            overlay_id: overlay_id.into(),
            element_id: element_id.into(),
            attributes: Map::new(),
            target: WeakElement::new(),
            target_node: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// The anchored target, if the host still holds it.
    pub fn target(&self) -> Option<ElementHandle> {
        self.target.upgrade()
    }

    pub fn target_node(&self) -> Option<NodeId> {
        self.target_node
    }

    fn bind(mut self, target: &ElementHandle) -> Self {
        self.target = std::sync::Arc::downgrade(target);
        self.target_node = Some(target.node_id());
        self
    }
}

/// Fields merged by [`OverlayRegistry::update_overlay`]. An attribute set to
/// `null` is removed.
#[derive(Debug, Clone, Default)]
pub struct OverlayPatch {
    pub element_id: Option<String>,
    pub attributes: Map<String, Value>,
}

impl OverlayPatch {
    pub fn attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn element_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }
}

#[derive(Debug)]
struct TargetLink {
    target: WeakElement,
    overlay_id: String,
}

#[derive(Debug)]
pub enum OverlayOp {
    Register {
        target: ElementHandle,
        config: OverlayConfig,
    },
    Unregister {
        overlay_id: String,
    },
    Update {
        overlay_id: String,
        patch: OverlayPatch,
    },
    Clear,
}

#[derive(Debug)]
pub enum OverlayOutcome {
    Registered { superseded: Vec<OverlayConfig> },
    Unregistered(Option<OverlayConfig>),
    Updated(bool),
    Cleared(usize),
}

#[derive(Debug, Default)]
pub struct OverlayIndices {
    by_id: HashMap<String, OverlayConfig>,
    by_element_id: HashMap<String, String>,
    by_target: HashMap<NodeId, TargetLink>,
}

impl OverlayIndices {
    /// The single state-transition function over the three indices.
    pub fn apply(&mut self, op: OverlayOp) -> OverlayOutcome {
        match op {
            OverlayOp::Register { target, config } => {
                let config = config.bind(&target);
                let node = target.node_id();

                let mut conflicting: Vec<String> = Vec::new();
                if let Some(link) = self.by_target.get(&node) {
                    conflicting.push(link.overlay_id.clone());
                }
                if let Some(id) = self.by_element_id.get(&config.element_id) {
                    conflicting.push(id.clone());
                }
                if self.by_id.contains_key(&config.overlay_id) {
                    conflicting.push(config.overlay_id.clone());
                }
                conflicting.sort();
                conflicting.dedup();

                let superseded = conflicting
                    .iter()
                    .filter_map(|id| self.remove(id))
                    .collect();

                self.by_target.insert(
                    node,
                    TargetLink {
                        target: config.target.clone(),
                        overlay_id: config.overlay_id.clone(),
                    },
                );
                self.by_element_id
                    .insert(config.element_id.clone(), config.overlay_id.clone());
                self.by_id.insert(config.overlay_id.clone(), config);
                OverlayOutcome::Registered { superseded }
            }
            OverlayOp::Unregister { overlay_id } => {
                OverlayOutcome::Unregistered(self.remove(&overlay_id))
            }
            OverlayOp::Update { overlay_id, patch } => {
                OverlayOutcome::Updated(self.update(&overlay_id, patch))
            }
            OverlayOp::Clear => {
                let cleared = self.by_id.len();
                self.by_id.clear();
                self.by_element_id.clear();
                self.by_target.clear();
                OverlayOutcome::Cleared(cleared)
            }
        }
    }

    fn remove(&mut self, overlay_id: &str) -> Option<OverlayConfig> {
        let config = self.by_id.remove(overlay_id)?;
        if self.by_element_id.get(&config.element_id).map(String::as_str) == Some(overlay_id) {
            self.by_element_id.remove(&config.element_id);
        }
        if let Some(node) = config.target_node {
            if self
                .by_target
                .get(&node)
                .is_some_and(|link| link.overlay_id == overlay_id)
            {
                self.by_target.remove(&node);
            }
        }
        Some(config)
    }

    fn update(&mut self, overlay_id: &str, patch: OverlayPatch) -> bool {
        let Some(current) = self.by_id.get(overlay_id) else {
            return false;
        };
        let rekey = match patch.element_id.as_deref() {
            Some(next) if next != current.element_id => {
                if self.by_element_id.contains_key(next) {
                    return false;
                }
                Some((current.element_id.clone(), next.to_string()))
            }
            _ => None,
        };

        let Some(config) = self.by_id.get_mut(overlay_id) else {
            return false;
        };
        for (key, value) in patch.attributes {
            if value.is_null() {
                config.attributes.remove(&key);
            } else {
                config.attributes.insert(key, value);
            }
        }
        if let Some((previous, next)) = rekey {
            config.element_id = next.clone();
            self.by_element_id.remove(&previous);
            self.by_element_id.insert(next, overlay_id.to_string());
        }
        true
    }

    fn get_by_target(&self, node: NodeId) -> Option<&OverlayConfig> {
        let link = self.by_target.get(&node)?;
        self.by_id.get(&link.overlay_id)
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let ids_match = self.by_id.len() == self.by_element_id.len()
            && self.by_id.len() == self.by_target.len();
        let element_ids = self.by_element_id.iter().all(|(element_id, id)| {
            self.by_id
                .get(id)
                .is_some_and(|config| &config.element_id == element_id)
        });
        let targets = self.by_target.iter().all(|(node, link)| {
            self.by_id
                .get(&link.overlay_id)
                .is_some_and(|config| config.target_node == Some(*node))
                && link.target.ptr_eq(
                    &self
                        .by_id
                        .get(&link.overlay_id)
                        .map(|config| config.target.clone())
                        .unwrap_or_default(),
                )
        });
        ids_match && element_ids && targets
    }
}

#[derive(Debug, Default)]
pub struct OverlayRegistry {
    indices: RwLock<OverlayIndices>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `config` on `target`, first unregistering whatever held the
    /// same target, element id, or overlay id. Returns the superseded configs.
    pub fn register_overlay(
        &self,
        target: &ElementHandle,
        config: OverlayConfig,
    ) -> Vec<OverlayConfig> {
        let overlay_id = config.overlay_id.clone();
        let outcome = self.indices.write().apply(OverlayOp::Register {
            target: ElementHandle::clone(target),
            config,
        });
        match outcome {
            OverlayOutcome::Registered { superseded } => {
                debug!(
                    target = "helm::overlay",
                    overlay_id = %overlay_id,
                    node = target.node_id().0,
                    superseded = superseded.len(),
                    "overlay registered"
                );
                superseded
            }
            _ => Vec::new(),
        }
    }

    pub fn unregister_overlay(&self, overlay_id: &str) -> bool {
        let outcome = self.indices.write().apply(OverlayOp::Unregister {
            overlay_id: overlay_id.to_string(),
        });
        let removed = matches!(outcome, OverlayOutcome::Unregistered(Some(_)));
        debug!(
            target = "helm::overlay",
            overlay_id,
            removed,
            "overlay unregister requested"
        );
        removed
    }

    pub fn update_overlay(&self, overlay_id: &str, patch: OverlayPatch) -> bool {
        let outcome = self.indices.write().apply(OverlayOp::Update {
            overlay_id: overlay_id.to_string(),
            patch,
        });
        matches!(outcome, OverlayOutcome::Updated(true))
    }

    pub fn clear_all_overlays(&self) -> usize {
        match self.indices.write().apply(OverlayOp::Clear) {
            OverlayOutcome::Cleared(count) => {
                debug!(target = "helm::overlay", cleared = count, "overlays cleared");
                count
            }
            _ => 0,
        }
    }

    pub fn get_overlay_by_element(&self, target: &ElementHandle) -> Option<OverlayConfig> {
        self.indices.read().get_by_target(target.node_id()).cloned()
    }

    pub fn get_overlay_by_id(&self, overlay_id: &str) -> Option<OverlayConfig> {
        self.indices.read().by_id.get(overlay_id).cloned()
    }

    pub fn get_overlay_by_element_id(&self, element_id: &str) -> Option<OverlayConfig> {
        let indices = self.indices.read();
        let overlay_id = indices.by_element_id.get(element_id)?;
        indices.by_id.get(overlay_id).cloned()
    }

    pub fn has_overlay(&self, target: &ElementHandle) -> bool {
        self.indices.read().get_by_target(target.node_id()).is_some()
    }

    /// Live overlays ordered by overlay id.
    pub fn get_all_overlays(&self) -> Vec<OverlayConfig> {
        let mut overlays: Vec<OverlayConfig> =
            self.indices.read().by_id.values().cloned().collect();
        overlays.sort_by(|a, b| a.overlay_id.cmp(&b.overlay_id));
        overlays
    }

    pub fn len(&self) -> usize {
        self.indices.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.read().by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Document, ElementKind, ElementSpec};
    use serde_json::json;
    use std::sync::Arc;

    fn element(document: &Document, id: &str) -> ElementHandle {
        document.insert(ElementSpec::new(ElementKind::Button).with_id(id))
    }

    #[test]
    fn register_replaces_existing_overlay_on_target() {
        let document = Document::new();
        let target = element(&document, "cta");
        let registry = OverlayRegistry::new();

        registry.register_overlay(&target, OverlayConfig::new("cfg1", "cta"));
        let superseded = registry.register_overlay(
            &target,
            OverlayConfig::new("cfg2", "cta").with_attribute("label", json!("Try me")),
        );

        assert_eq!(superseded.len(), 1);
        assert_eq!(superseded[0].overlay_id, "cfg1");
        let all = registry.get_all_overlays();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].overlay_id, "cfg2");
        assert!(!registry.unregister_overlay("cfg1"));
        assert!(registry.indices.read().is_consistent());
    }

    #[test]
    fn lookups_agree_across_indices() {
        let document = Document::new();
        let target = element(&document, "search");
        let registry = OverlayRegistry::new();
        registry.register_overlay(&target, OverlayConfig::new("ov-1", "search"));

        let by_target = registry.get_overlay_by_element(&target).expect("by target");
        let by_id = registry.get_overlay_by_id("ov-1").expect("by id");
        let by_element_id = registry
            .get_overlay_by_element_id("search")
            .expect("by element id");
        assert_eq!(by_target.overlay_id, by_id.overlay_id);
        assert_eq!(by_id.overlay_id, by_element_id.overlay_id);
        assert!(registry.has_overlay(&target));
        let anchored = by_id.target().expect("target alive");
        assert!(Arc::ptr_eq(&anchored, &target));
    }

    #[test]
    fn unregister_is_idempotent_and_clears_every_index() {
        let document = Document::new();
        let target = element(&document, "nav");
        let registry = OverlayRegistry::new();
        registry.register_overlay(&target, OverlayConfig::new("ov-nav", "nav"));

        assert!(registry.unregister_overlay("ov-nav"));
        assert!(!registry.unregister_overlay("ov-nav"));
        assert!(registry.get_overlay_by_element(&target).is_none());
        assert!(registry.get_overlay_by_element_id("nav").is_none());
        assert!(!registry.has_overlay(&target));
        assert!(registry.indices.read().is_consistent());
    }

    #[test]
    fn element_id_is_unique_across_targets() {
        let document = Document::new();
        let first = element(&document, "a");
        let second = element(&document, "b");
        let registry = OverlayRegistry::new();
        registry.register_overlay(&first, OverlayConfig::new("one", "shared"));
        let superseded = registry.register_overlay(&second, OverlayConfig::new("two", "shared"));

        assert_eq!(superseded.len(), 1);
        assert!(!registry.has_overlay(&first));
        assert!(registry.has_overlay(&second));
        assert_eq!(
            registry
                .get_overlay_by_element_id("shared")
                .expect("present")
                .overlay_id,
            "two"
        );
        assert!(registry.indices.read().is_consistent());
    }

    #[test]
    fn reusing_an_overlay_id_moves_it() {
        let document = Document::new();
        let first = element(&document, "a");
        let second = element(&document, "b");
        let registry = OverlayRegistry::new();
        registry.register_overlay(&first, OverlayConfig::new("ov", "a"));
        registry.register_overlay(&second, OverlayConfig::new("ov", "b"));

        assert_eq!(registry.len(), 1);
        assert!(!registry.has_overlay(&first));
        assert!(registry.get_overlay_by_element_id("a").is_none());
        assert!(registry.indices.read().is_consistent());
    }

    #[test]
    fn update_merges_in_place_or_reports_missing() {
        let document = Document::new();
        let target = element(&document, "hero");
        let registry = OverlayRegistry::new();
        registry.register_overlay(
            &target,
            OverlayConfig::new("ov-hero", "hero")
                .with_attribute("label", json!("old"))
                .with_attribute("tone", json!("warm")),
        );

        let patch = OverlayPatch::default()
            .attribute("label", json!("new"))
            .attribute("tone", Value::Null)
            .attribute("pinned", json!(true));
        assert!(registry.update_overlay("ov-hero", patch));
        let config = registry.get_overlay_by_id("ov-hero").expect("present");
        assert_eq!(config.attributes["label"], "new");
        assert_eq!(config.attributes["pinned"], true);
        assert!(!config.attributes.contains_key("tone"));

        assert!(!registry.update_overlay("nope", OverlayPatch::default()));
    }

    #[test]
    fn update_rekeys_element_id_unless_taken() {
        let document = Document::new();
        let a = element(&document, "a");
        let b = element(&document, "b");
        let registry = OverlayRegistry::new();
        registry.register_overlay(&a, OverlayConfig::new("ov-a", "a"));
        registry.register_overlay(&b, OverlayConfig::new("ov-b", "b"));

        assert!(!registry.update_overlay("ov-a", OverlayPatch::default().element_id("b")));
        assert_eq!(
            registry.get_overlay_by_id("ov-a").expect("a").element_id,
            "a"
        );

        assert!(registry.update_overlay("ov-a", OverlayPatch::default().element_id("a2")));
        assert!(registry.get_overlay_by_element_id("a").is_none());
        assert_eq!(
            registry
                .get_overlay_by_element_id("a2")
                .expect("rekeyed")
                .overlay_id,
            "ov-a"
        );
        assert!(registry.indices.read().is_consistent());
    }

    #[test]
    fn clear_all_empties_everything() {
        let document = Document::new();
        let registry = OverlayRegistry::new();
        for id in ["x", "y", "z"] {
            let target = element(&document, id);
            registry.register_overlay(&target, OverlayConfig::new(format!("ov-{id}"), id));
        }
        assert_eq!(registry.clear_all_overlays(), 3);
        assert!(registry.get_all_overlays().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_does_not_keep_targets_alive() {
        let registry = OverlayRegistry::new();
        let target: ElementHandle = Arc::new(crate::host::Element::new(
            Some("temp".into()),
            ElementKind::Container,
            Default::default(),
        ));
        registry.register_overlay(&target, OverlayConfig::new("ov-temp", "temp"));
        assert_eq!(Arc::strong_count(&target), 1);
        drop(target);

        let config = registry.get_overlay_by_id("ov-temp").expect("still indexed");
        assert!(config.target().is_none());
        assert!(registry.unregister_overlay("ov-temp"));
    }
}
