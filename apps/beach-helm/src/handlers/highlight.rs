use std::sync::Arc;

use serde_json::Value;

use super::{CommandHandler, HandlerContext, HandlerError, Options, Outcome, require_target};
use crate::effects::EffectKind;
use crate::host::ElementHandle;

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#ff9800";
pub const DEFAULT_HIGHLIGHT_THICKNESS: u64 = 3;

const STYLE_KEYS: [&str; 2] = ["outline", "outline-offset"];

/// Draws an outline around the target and restores the previous inline
/// styles once the duration elapses.
pub struct HighlightHandler;

impl CommandHandler for HighlightHandler {
    fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        let options = Options::parse(options)?;
        let color = options.string("color")?.unwrap_or(DEFAULT_HIGHLIGHT_COLOR);
        let thickness = options
            .unsigned("thickness")?
            .unwrap_or(DEFAULT_HIGHLIGHT_THICKNESS);
        let duration = options
            .duration("duration")?
            .unwrap_or(ctx.settings.highlight_duration);
        let target = match require_target("highlight", target) {
            Ok(target) => target,
            Err(outcome) => return Ok(outcome),
        };
        if target.state().hidden {
            return Ok(Outcome::warning(format!(
                "cannot highlight element {}: element is hidden",
                target.describe()
            )));
        }

        let superseded = ctx.effects.start(target, EffectKind::Highlight, duration, || {
            let previous: Vec<(&'static str, Option<String>)> = {
                let mut state = target.state();
                let previous = STYLE_KEYS
                    .iter()
                    .map(|key| (*key, state.styles.get(*key).cloned()))
                    .collect();
                state
                    .styles
                    .insert("outline".into(), format!("{thickness}px solid {color}"));
                state.styles.insert("outline-offset".into(), "2px".into());
                previous
            };
            let element = Arc::clone(target);
            move || {
                let mut state = element.state();
                for (key, value) in previous {
                    match value {
                        Some(value) => state.styles.insert(key.to_string(), value),
                        None => state.styles.remove(key),
                    };
                }
            }
        });

        let mut details = format!(
            "Highlighted element {} for {}ms",
            target.describe(),
            duration.as_millis()
        );
        if superseded {
            details.push_str(" (replaced previous highlight)");
        }
        Ok(Outcome::ok(details))
    }
}
