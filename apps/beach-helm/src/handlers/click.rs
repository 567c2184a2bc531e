use serde_json::Value;

use super::{CommandHandler, HandlerContext, HandlerError, Options, Outcome, require_target};
use crate::host::{ElementHandle, Modifiers, MouseButton, SyntheticEvent};

/// Simulates a full pointer click: `mousedown`, `mouseup`, then the
/// button-specific activation event.
pub struct ClickHandler;

impl CommandHandler for ClickHandler {
    fn handle(
        &self,
        _ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        let options = Options::parse(options)?;
        let target = match require_target("click", target) {
            Ok(target) => target,
            Err(outcome) => return Ok(outcome),
        };

        let button = match options.string("button")? {
            None => MouseButton::Left,
            Some(raw) => MouseButton::parse(raw).ok_or_else(|| HandlerError::InvalidOption {
                name: "button",
                reason: format!("unknown mouse button `{raw}`"),
            })?,
        };
        let modifiers = Modifiers {
            shift: options.flag("shiftKey")?,
            ctrl: options.flag("ctrlKey")?,
            alt: options.flag("altKey")?,
            meta: options.flag("metaKey")?,
        };

        if !target.is_interactable() {
            return Ok(Outcome::not_interactable("click", target));
        }

        let activation = match button {
            MouseButton::Left => "click",
            MouseButton::Middle => "auxclick",
            MouseButton::Right => "contextmenu",
        };
        {
            let mut state = target.state();
            for name in ["mousedown", "mouseup", activation] {
                state.dispatch(SyntheticEvent::mouse(name, button, modifiers));
            }
        }

        let details = match button {
            MouseButton::Left => format!("Clicked element {}", target.describe()),
            MouseButton::Middle => format!("Middle-clicked element {}", target.describe()),
            MouseButton::Right => format!("Right-clicked element {}", target.describe()),
        };
        Ok(Outcome::ok(details))
    }
}
