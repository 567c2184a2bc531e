//! Wire definitions for controller ↔ helm communication.
//! Kept in a dedicated crate so controllers written in other languages can
//! mirror the JSON shapes without pulling in the runtime.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source tag stamped on results produced by the dispatcher.
pub const SOURCE_DISPATCHER: &str = "dispatcher";
/// Source tag stamped on results produced before a payload reaches the dispatcher.
pub const SOURCE_CONNECTION: &str = "connection";

/// Inbound command sent by the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandPayload {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl CommandPayload {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// The `options` sub-field of `payload`, or `Value::Null` when absent.
    pub fn options(&self) -> &Value {
        self.payload
            .as_ref()
            .and_then(|payload| payload.get("options"))
            .unwrap_or(&Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Ok,
    Warning,
    Error,
}

impl ResultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Ok => "ok",
            ResultStatus::Warning => "warning",
            ResultStatus::Error => "error",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningReason {
    NotFound,
    InvalidSelector,
    NoTargetProvided,
    MultipleMatches,
}

impl WarningReason {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningReason::NotFound => "not-found",
            WarningReason::InvalidSelector => "invalid-selector",
            WarningReason::NoTargetProvided => "no-target-provided",
            WarningReason::MultipleMatches => "multiple-matches",
        }
    }
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a command's element identifier did not yield exactly one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResolutionWarning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    pub reason: WarningReason,
}

impl TargetResolutionWarning {
    pub fn new(reason: WarningReason) -> Self {
        Self {
            element_id: None,
            selector: None,
            reason,
        }
    }

    pub fn for_element(reason: WarningReason, element_id: impl Into<String>) -> Self {
        Self {
            element_id: Some(element_id.into()),
            selector: None,
            reason,
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}

impl fmt::Display for TargetResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element_id {
            Some(id) => write!(f, "{} for element \"{}\"", self.reason, id),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// Outbound result; exactly one is produced per inbound command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub details: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TargetResolutionWarning>,
}

impl CommandResult {
    /// Builds a result stamped with the current wall-clock time.
    pub fn new(status: ResultStatus, details: impl Into<String>) -> Self {
        Self {
            status,
            request_id: None,
            details: details.into(),
            timestamp: epoch_millis(),
            source: None,
            warnings: Vec::new(),
        }
    }

    pub fn ok(details: impl Into<String>) -> Self {
        Self::new(ResultStatus::Ok, details)
    }

    pub fn warning(details: impl Into<String>) -> Self {
        Self::new(ResultStatus::Warning, details)
    }

    pub fn error(details: impl Into<String>) -> Self {
        Self::new(ResultStatus::Error, details)
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<TargetResolutionWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }
}

/// Milliseconds since the Unix epoch; clamps to zero if the clock is before it.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_accepts_camel_case_fields() {
        let payload: CommandPayload = serde_json::from_value(json!({
            "command": "fill",
            "elementId": "email",
            "payload": {"options": {"value": "hi"}},
            "requestId": "r1"
        }))
        .expect("payload");
        assert_eq!(payload.command, "fill");
        assert_eq!(payload.element_id.as_deref(), Some("email"));
        assert_eq!(payload.request_id.as_deref(), Some("r1"));
        assert_eq!(payload.options()["value"], "hi");
    }

    #[test]
    fn payload_without_command_is_rejected() {
        let err = serde_json::from_value::<CommandPayload>(json!({"requestId": "r9"}))
            .expect_err("command is required");
        assert!(err.to_string().contains("command"));
    }

    #[test]
    fn options_default_to_null() {
        let payload = CommandPayload::new("focus").with_payload(json!({"other": 1}));
        assert!(payload.options().is_null());
        assert!(CommandPayload::new("focus").options().is_null());
    }

    #[test]
    fn result_serializes_wire_names() {
        let result = CommandResult::warning("missing")
            .with_request_id(Some("r2".into()))
            .with_source(SOURCE_DISPATCHER)
            .with_warnings(vec![TargetResolutionWarning::for_element(
                WarningReason::NotFound,
                "missing",
            )]);
        let value = serde_json::to_value(&result).expect("json");
        assert_eq!(value["status"], "warning");
        assert_eq!(value["requestId"], "r2");
        assert_eq!(value["source"], "dispatcher");
        assert_eq!(value["warnings"][0]["reason"], "not-found");
        assert_eq!(value["warnings"][0]["elementId"], "missing");
        assert!(value["timestamp"].as_u64().expect("timestamp") > 0);
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let value = serde_json::to_value(CommandResult::ok("done")).expect("json");
        let object = value.as_object().expect("object");
        assert!(!object.contains_key("requestId"));
        assert!(!object.contains_key("source"));
        assert!(!object.contains_key("warnings"));
    }
}
