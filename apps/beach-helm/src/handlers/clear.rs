use serde_json::Value;

use super::{CommandHandler, HandlerContext, HandlerError, Options, Outcome, require_target};
use crate::host::{ElementHandle, SyntheticEvent};

pub struct ClearHandler;

impl CommandHandler for ClearHandler {
    fn handle(
        &self,
        _ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        Options::parse(options)?;
        let target = match require_target("clear", target) {
            Ok(target) => target,
            Err(outcome) => return Ok(outcome),
        };
        if !target.kind().is_fillable() {
            return Ok(Outcome::warning(format!(
                "element {} is a {} and has no value to clear",
                target.describe(),
                target.kind().as_str()
            )));
        }
        if !target.is_interactable() {
            return Ok(Outcome::not_interactable("clear", target));
        }

        let mut state = target.state();
        if state.read_only {
            return Ok(Outcome::warning(format!(
                "element {} is read-only",
                target.describe()
            )));
        }
        state.value.clear();
        state.dispatch(SyntheticEvent::plain("input"));
        state.dispatch(SyntheticEvent::plain("change"));
        drop(state);

        Ok(Outcome::ok(format!("Cleared element {}", target.describe())))
    }
}
