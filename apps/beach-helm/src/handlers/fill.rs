use serde_json::Value;

use super::{CommandHandler, HandlerContext, HandlerError, Options, Outcome, require_target};
use crate::host::{ElementHandle, SyntheticEvent};

/// Replaces a text control's value and fires `focus`, `input`, `change`.
pub struct FillHandler;

impl CommandHandler for FillHandler {
    fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        let options = Options::parse(options)?;
        let value = options.required_string("value")?;
        let target = match require_target("fill", target) {
            Ok(target) => target,
            Err(outcome) => return Ok(outcome),
        };

        if !target.kind().is_fillable() {
            return Ok(Outcome::warning(format!(
                "element {} is a {} and cannot be filled",
                target.describe(),
                target.kind().as_str()
            )));
        }
        if !target.is_interactable() {
            return Ok(Outcome::not_interactable("fill", target));
        }
        if target.state().read_only {
            return Ok(Outcome::warning(format!(
                "element {} is read-only",
                target.describe()
            )));
        }

        super::focus::move_focus(ctx, target);
        {
            let mut state = target.state();
            state.value = value.to_string();
            state.dispatch(SyntheticEvent::plain("input"));
            state.dispatch(SyntheticEvent::plain("change"));
        }

        Ok(Outcome::ok(format!(
            "Filled element {} with {} characters",
            target.describe(),
            value.chars().count()
        )))
    }
}
