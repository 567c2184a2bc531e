//! `open` and `close`: overlay registration plus the chatbot bridge.

use serde_json::{Map, Value, json};
use tracing::debug;
use uuid::Uuid;

use super::{CommandHandler, HandlerContext, HandlerError, Options, Outcome, require_target};
use crate::host::ElementHandle;
use crate::overlay::OverlayConfig;

pub const OVERLAY_SOURCE: &str = "overlay";

/// Options consumed by `open` rather than stored as overlay attributes.
const RESERVED: [&str; 2] = ["overlayId", "prompt"];

pub struct OpenHandler;

impl CommandHandler for OpenHandler {
    fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        let options = Options::parse(options)?;
        let overlay_id = match options.string("overlayId")? {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let prompt = options.string("prompt")?;
        let target = match require_target("open", target) {
            Ok(target) => target,
            Err(outcome) => return Ok(outcome.with_source(OVERLAY_SOURCE)),
        };

        let attributes: Map<String, Value> = options
            .raw()
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let element_id = target
            .element_id()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node-{}", target.node_id().0));

        // The bridge goes first so a failed open leaves the registry untouched.
        if let Some(bridge) = ctx.bridge {
            if !bridge.is_open() {
                bridge.open()?;
            }
            if let Some(prompt) = prompt {
                bridge.receive_prompt(
                    prompt,
                    Some(json!({ "overlayId": overlay_id, "elementId": element_id })),
                )?;
            }
        } else if prompt.is_some() {
            debug!(
                target = "helm::handlers",
                overlay_id = %overlay_id,
                "no chatbot bridge attached; prompt dropped"
            );
        }

        let config =
            OverlayConfig::new(overlay_id.clone(), element_id).with_attributes(attributes);
        let superseded = ctx.overlays.register_overlay(target, config);

        let mut details = format!(
            "Opened overlay \"{overlay_id}\" on element {}",
            target.describe()
        );
        if !superseded.is_empty() {
            let replaced: Vec<&str> = superseded.iter().map(|c| c.overlay_id.as_str()).collect();
            details.push_str(&format!(" (replaced {})", replaced.join(", ")));
        }
        Ok(Outcome::ok(details).with_source(OVERLAY_SOURCE))
    }
}

pub struct CloseHandler;

impl CommandHandler for CloseHandler {
    fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        let options = Options::parse(options)?;

        if let Some(target) = target {
            let outcome = match ctx.overlays.get_overlay_by_element(target) {
                Some(config) => {
                    ctx.overlays.unregister_overlay(&config.overlay_id);
                    Outcome::ok(format!(
                        "Closed overlay \"{}\" on element {}",
                        config.overlay_id,
                        target.describe()
                    ))
                }
                None => Outcome::warning(format!(
                    "element {} has no open overlay",
                    target.describe()
                )),
            };
            return Ok(outcome.with_source(OVERLAY_SOURCE));
        }

        if let Some(overlay_id) = options.string("overlayId")? {
            let outcome = if ctx.overlays.unregister_overlay(overlay_id) {
                Outcome::ok(format!("Closed overlay \"{overlay_id}\""))
            } else {
                Outcome::warning(format!("overlay \"{overlay_id}\" is not open"))
            };
            return Ok(outcome.with_source(OVERLAY_SOURCE));
        }

        let outcome = match ctx.bridge {
            Some(bridge) => {
                bridge.close()?;
                Outcome::ok("Closed chatbot")
            }
            None => Outcome::warning("no chatbot bridge attached"),
        };
        Ok(outcome.with_source(OVERLAY_SOURCE))
    }
}
