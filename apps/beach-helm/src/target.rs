//! Element identifier → live target resolution.

use std::sync::Arc;

use helm_proto::{TargetResolutionWarning, WarningReason};
use tracing::trace;

use crate::host::{ElementHandle, HostDocument};

pub const MAX_ELEMENT_ID_LEN: usize = 256;

const FORBIDDEN_KEY_CHARS: &[char] = &['"', '\'', '[', ']', '\\', '#', '`'];

/// Resolves element identifiers against the current host state. Nothing is
/// cached: the host may mutate between commands.
#[derive(Clone)]
pub struct TargetResolver {
    document: Arc<dyn HostDocument>,
}

impl TargetResolver {
    pub fn new(document: Arc<dyn HostDocument>) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Arc<dyn HostDocument> {
        &self.document
    }

    pub fn resolve(
        &self,
        element_id: Option<&str>,
    ) -> Result<ElementHandle, TargetResolutionWarning> {
        let Some(element_id) = element_id.filter(|id| !id.is_empty()) else {
            return Err(TargetResolutionWarning::new(WarningReason::NoTargetProvided));
        };

        let selector = selector_for(element_id);
        if !is_valid_lookup_key(element_id) {
            return Err(
                TargetResolutionWarning::for_element(WarningReason::InvalidSelector, element_id)
                    .with_selector(selector),
            );
        }

        let mut matches = self.document.find_by_element_id(element_id);
        trace!(
            target = "helm::target",
            element_id,
            matches = matches.len(),
            "resolved element id"
        );
        match matches.len() {
            0 => Err(
                TargetResolutionWarning::for_element(WarningReason::NotFound, element_id)
                    .with_selector(selector),
            ),
            1 => Ok(matches.remove(0)),
            _ => Err(
                TargetResolutionWarning::for_element(WarningReason::MultipleMatches, element_id)
                    .with_selector(selector),
            ),
        }
    }
}

/// Whether `element_id` can be used as a lookup key: bounded length, no
/// whitespace or control characters, and none of the selector metacharacters.
pub fn is_valid_lookup_key(element_id: &str) -> bool {
    !element_id.is_empty()
        && element_id.chars().count() <= MAX_ELEMENT_ID_LEN
        && !element_id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_KEY_CHARS.contains(&c))
}

fn selector_for(element_id: &str) -> String {
    format!("[data-element-id=\"{element_id}\"]")
}
