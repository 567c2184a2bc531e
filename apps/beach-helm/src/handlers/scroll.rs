use serde_json::Value;

use super::{CommandHandler, HandlerContext, HandlerError, Options, Outcome, require_target};
use crate::host::{ElementHandle, ScrollAlignment, ScrollBehavior, ScrollRequest, SyntheticEvent};

pub struct ScrollHandler;

impl CommandHandler for ScrollHandler {
    fn handle(
        &self,
        _ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        let options = Options::parse(options)?;
        let behavior = parse_with(&options, "behavior", ScrollBehavior::parse)?
            .unwrap_or(ScrollBehavior::Smooth);
        let block =
            parse_with(&options, "block", ScrollAlignment::parse)?.unwrap_or(ScrollAlignment::Center);
        let inline = parse_with(&options, "inline", ScrollAlignment::parse)?
            .unwrap_or(ScrollAlignment::Nearest);

        let target = match require_target("scroll", target) {
            Ok(target) => target,
            Err(outcome) => return Ok(outcome),
        };
        if target.state().hidden {
            return Ok(Outcome::warning(format!(
                "cannot scroll to element {}: element is hidden",
                target.describe()
            )));
        }

        {
            let mut state = target.state();
            state.scrolled_into_view = Some(ScrollRequest {
                behavior,
                block,
                inline,
            });
            state.dispatch(SyntheticEvent::plain("scroll"));
        }
        Ok(Outcome::ok(format!(
            "Scrolled element {} into view",
            target.describe()
        )))
    }
}

fn parse_with<T>(
    options: &Options<'_>,
    name: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, HandlerError> {
    match options.string(name)? {
        None => Ok(None),
        Some(raw) => parse(raw).map(Some).ok_or_else(|| HandlerError::InvalidOption {
            name,
            reason: format!("unsupported value `{raw}`"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Harness;
    use crate::host::{ElementKind, ElementSpec};
    use serde_json::json;

    #[test]
    fn defaults_to_smooth_centered_scroll() {
        let harness = Harness::new();
        let footer = harness
            .document
            .insert(ElementSpec::new(ElementKind::Container).with_id("footer"));
        ScrollHandler
            .handle(&harness.ctx(), Some(&footer), &Value::Null)
            .expect("scroll");
        assert_eq!(
            footer.snapshot().scrolled_into_view,
            Some(ScrollRequest {
                behavior: ScrollBehavior::Smooth,
                block: ScrollAlignment::Center,
                inline: ScrollAlignment::Nearest,
            })
        );
    }

    #[test]
    fn explicit_alignment_is_honoured() {
        let harness = Harness::new();
        let footer = harness
            .document
            .insert(ElementSpec::new(ElementKind::Container).with_id("footer"));
        ScrollHandler
            .handle(
                &harness.ctx(),
                Some(&footer),
                &json!({"behavior": "instant", "block": "start", "inline": "end"}),
            )
            .expect("scroll");
        let request = footer.snapshot().scrolled_into_view.expect("scrolled");
        assert_eq!(request.behavior, ScrollBehavior::Instant);
        assert_eq!(request.block, ScrollAlignment::Start);
        assert_eq!(request.inline, ScrollAlignment::End);
    }

    #[test]
    fn bad_alignment_is_an_error() {
        let harness = Harness::new();
        let footer = harness
            .document
            .insert(ElementSpec::new(ElementKind::Container).with_id("footer"));
        let err = ScrollHandler
            .handle(&harness.ctx(), Some(&footer), &json!({"block": "middle"}))
            .expect_err("invalid block");
        assert!(matches!(err, HandlerError::InvalidOption { name: "block", .. }));
        assert!(footer.snapshot().scrolled_into_view.is_none());
    }
}
