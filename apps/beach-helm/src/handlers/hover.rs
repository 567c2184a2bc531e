use std::sync::Arc;

use serde_json::Value;

use super::{CommandHandler, HandlerContext, HandlerError, Options, Outcome, require_target};
use crate::effects::EffectKind;
use crate::host::{ElementHandle, SyntheticEvent};

/// Pointer enters the target now and leaves once `duration` ms elapse.
pub struct HoverHandler;

impl CommandHandler for HoverHandler {
    fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        let options = Options::parse(options)?;
        let duration = options
            .duration("duration")?
            .unwrap_or(ctx.settings.hover_duration);
        let target = match require_target("hover", target) {
            Ok(target) => target,
            Err(outcome) => return Ok(outcome),
        };
        if !target.is_interactable() {
            return Ok(Outcome::not_interactable("hover", target));
        }

        ctx.effects.start(target, EffectKind::Hover, duration, || {
            {
                let mut state = target.state();
                state.hovered = true;
                state.dispatch(SyntheticEvent::plain("mouseover"));
                state.dispatch(SyntheticEvent::plain("mouseenter"));
            }
            let element = Arc::clone(target);
            move || {
                let mut state = element.state();
                state.hovered = false;
                state.dispatch(SyntheticEvent::plain("mouseout"));
                state.dispatch(SyntheticEvent::plain("mouseleave"));
            }
        });

        Ok(Outcome::ok(format!(
            "Hovering element {} for {}ms",
            target.describe(),
            duration.as_millis()
        )))
    }
}
