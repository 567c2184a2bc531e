use std::sync::Arc;

use serde_json::Value;

use super::{CommandHandler, HandlerContext, HandlerError, Options, Outcome, require_target};
use crate::host::{ElementHandle, SyntheticEvent};

pub struct FocusHandler;

impl CommandHandler for FocusHandler {
    fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        Options::parse(options)?;
        let target = match require_target("focus", target) {
            Ok(target) => target,
            Err(outcome) => return Ok(outcome),
        };
        if !target.is_interactable() {
            return Ok(Outcome::not_interactable("focus", target));
        }
        move_focus(ctx, target);
        Ok(Outcome::ok(format!("Focused element {}", target.describe())))
    }
}

/// Blurs whatever holds focus and focuses `target`. A no-op when `target`
/// already has focus.
pub(crate) fn move_focus(ctx: &HandlerContext<'_>, target: &ElementHandle) {
    if let Some(active) = ctx.document.active_element() {
        if Arc::ptr_eq(&active, target) {
            return;
        }
        let mut state = active.state();
        state.focused = false;
        state.dispatch(SyntheticEvent::plain("blur"));
    }
    let mut state = target.state();
    state.focused = true;
    state.dispatch(SyntheticEvent::plain("focus"));
}
