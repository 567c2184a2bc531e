use serde_json::Value;

use super::{CommandHandler, HandlerContext, HandlerError, Options, Outcome, require_target};
use crate::host::{ElementHandle, ElementKind, SyntheticEvent};

/// Picks an option of a select control by `value`, `index`, or `label`,
/// checked in that order.
pub struct SelectHandler;

enum Choice<'a> {
    Value(&'a str),
    Index(u64),
    Label(&'a str),
}

impl Choice<'_> {
    fn describe(&self) -> String {
        match self {
            Choice::Value(value) => format!("value \"{value}\""),
            Choice::Index(index) => format!("index {index}"),
            Choice::Label(label) => format!("label \"{label}\""),
        }
    }
}

impl CommandHandler for SelectHandler {
    fn handle(
        &self,
        _ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        let options = Options::parse(options)?;
        let choice = if let Some(value) = options.string("value")? {
            Choice::Value(value)
        } else if let Some(index) = options.unsigned("index")? {
            Choice::Index(index)
        } else if let Some(label) = options.string("label")? {
            Choice::Label(label)
        } else {
            return Err(HandlerError::MissingOption("value"));
        };

        let target = match require_target("select", target) {
            Ok(target) => target,
            Err(outcome) => return Ok(outcome),
        };
        if target.kind() != ElementKind::Select {
            return Ok(Outcome::warning(format!(
                "element {} is a {}, not a select",
                target.describe(),
                target.kind().as_str()
            )));
        }
        if !target.is_interactable() {
            return Ok(Outcome::not_interactable("select", target));
        }

        let mut state = target.state();
        let position = match &choice {
            Choice::Value(value) => state.options.iter().position(|o| o.value == *value),
            Choice::Index(index) => usize::try_from(*index)
                .ok()
                .filter(|index| *index < state.options.len()),
            Choice::Label(label) => state.options.iter().position(|o| o.label == *label),
        };
        let Some(position) = position.filter(|i| !state.options[*i].disabled) else {
            return Ok(Outcome::warning(format!(
                "element {} has no selectable option with {}",
                target.describe(),
                choice.describe()
            )));
        };

        let selected = state.options[position].clone();
        state.selected_index = Some(position);
        state.value = selected.value.clone();
        state.dispatch(SyntheticEvent::plain("input"));
        state.dispatch(SyntheticEvent::plain("change"));
        drop(state);

        Ok(Outcome::ok(format!(
            "Selected option \"{}\" in element {}",
            selected.value,
            target.describe()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Harness;
    use crate::host::{ElementSpec, SelectOption};
    use helm_proto::ResultStatus;
    use serde_json::json;

    fn plan_picker(harness: &Harness) -> ElementHandle {
        let mut retired = SelectOption::new("legacy", "Legacy");
        retired.disabled = true;
        harness.document.insert(
            ElementSpec::new(ElementKind::Select)
                .with_id("plan")
                .with_options(vec![
                    SelectOption::new("free", "Free"),
                    SelectOption::new("pro", "Professional"),
                    retired,
                ]),
        )
    }

    #[test]
    fn selects_by_value_index_and_label() {
        let harness = Harness::new();
        let plan = plan_picker(&harness);

        for (options, expected) in [
            (json!({"value": "pro"}), 1),
            (json!({"index": 0}), 0),
            (json!({"label": "Professional"}), 1),
        ] {
            let outcome = SelectHandler
                .handle(&harness.ctx(), Some(&plan), &options)
                .expect("select");
            assert_eq!(outcome.status, ResultStatus::Ok, "{options}");
            assert_eq!(plan.snapshot().selected_index, Some(expected));
        }
        assert_eq!(plan.snapshot().value, "pro");
    }

    #[test]
    fn unmatched_or_disabled_option_warns() {
        let harness = Harness::new();
        let plan = plan_picker(&harness);
        for options in [json!({"value": "gold"}), json!({"index": 9}), json!({"value": "legacy"})] {
            let outcome = SelectHandler
                .handle(&harness.ctx(), Some(&plan), &options)
                .expect("handled");
            assert_eq!(outcome.status, ResultStatus::Warning, "{options}");
        }
        assert!(plan.event_names().is_empty());
    }

    #[test]
    fn requires_a_choice() {
        let harness = Harness::new();
        let plan = plan_picker(&harness);
        let err = SelectHandler
            .handle(&harness.ctx(), Some(&plan), &json!({}))
            .expect_err("choice required");
        assert!(matches!(err, HandlerError::MissingOption(_)));
    }

    #[test]
    fn non_select_target_warns() {
        let harness = Harness::new();
        let input = harness
            .document
            .insert(ElementSpec::new(ElementKind::TextInput).with_id("plan-text"));
        let outcome = SelectHandler
            .handle(&harness.ctx(), Some(&input), &json!({"value": "pro"}))
            .expect("handled");
        assert_eq!(outcome.status, ResultStatus::Warning);
        assert!(outcome.details.contains("not a select"));
    }
}
