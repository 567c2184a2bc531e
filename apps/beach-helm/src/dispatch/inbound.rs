//! Raw transport frame → [`CommandPayload`].

use helm_proto::{CommandPayload, CommandResult, SOURCE_CONNECTION};
use serde_json::Value;

/// Parses one inbound frame. A frame that is not a JSON object with a string
/// `command` is rejected with a connection-sourced error result carrying the
/// frame's `requestId` when one can be recovered.
pub fn parse_message(raw: &str) -> Result<CommandPayload, CommandResult> {
    let value: Value = serde_json::from_str(raw).map_err(|err| {
        CommandResult::error(format!("malformed message: {err}")).with_source(SOURCE_CONNECTION)
    })?;

    let request_id = value
        .get("requestId")
        .and_then(Value::as_str)
        .map(str::to_string);
    let reject = |details: String| {
        CommandResult::error(details)
            .with_source(SOURCE_CONNECTION)
            .with_request_id(request_id.clone())
    };

    match value.get("command") {
        Some(Value::String(_)) => {}
        Some(_) => return Err(reject("malformed message: `command` must be a string".into())),
        None if value.is_object() => {
            return Err(reject(
                "malformed message: missing required field `command`".into(),
            ));
        }
        None => return Err(reject("malformed message: expected a JSON object".into())),
    }

    serde_json::from_value(value).map_err(|err| reject(format!("malformed message: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_proto::ResultStatus;

    #[test]
    fn well_formed_message_parses() {
        let payload = parse_message(r#"{"command":"click","elementId":"go","requestId":"r"}"#)
            .expect("valid payload");
        assert_eq!(payload.command, "click");
        assert_eq!(payload.element_id.as_deref(), Some("go"));
    }

    #[test]
    fn missing_command_keeps_request_id() {
        let rejected = parse_message(r#"{"elementId":"go","requestId":"r9"}"#)
            .expect_err("command required");
        assert_eq!(rejected.status, ResultStatus::Error);
        assert_eq!(rejected.source.as_deref(), Some(SOURCE_CONNECTION));
        assert_eq!(rejected.request_id.as_deref(), Some("r9"));
        assert!(rejected.details.contains("command"));
    }

    #[test]
    fn invalid_json_and_non_objects_are_rejected() {
        for raw in ["{not json", "[1,2]", "\"click\"", r#"{"command": 7}"#] {
            let rejected = parse_message(raw).expect_err(raw);
            assert_eq!(rejected.source.as_deref(), Some(SOURCE_CONNECTION), "{raw}");
            assert!(rejected.request_id.is_none(), "{raw}");
        }
    }

    #[test]
    fn wrongly_typed_optional_field_is_rejected() {
        let rejected = parse_message(r#"{"command":"click","elementId":5,"requestId":"r1"}"#)
            .expect_err("elementId must be a string");
        assert_eq!(rejected.request_id.as_deref(), Some("r1"));
    }
}
