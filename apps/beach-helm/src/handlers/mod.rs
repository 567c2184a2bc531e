//! Leaf command handlers. Each performs one host-UI side effect and reports a
//! partial outcome; the dispatcher turns that into a full result.

mod clear;
mod click;
mod fill;
mod focus;
mod highlight;
mod hover;
mod overlay;
mod scroll;
mod select;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use helm_proto::{ResultStatus, TargetResolutionWarning, WarningReason};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::bridge::{BridgeError, ChatbotBridge};
use crate::effects::ActiveEffects;
use crate::host::{ElementHandle, HostDocument};
use crate::overlay::OverlayRegistry;

pub use clear::ClearHandler;
pub use click::ClickHandler;
pub use fill::FillHandler;
pub use focus::FocusHandler;
pub use highlight::HighlightHandler;
pub use hover::HoverHandler;
pub use overlay::{CloseHandler, OpenHandler};
pub use scroll::ScrollHandler;
pub use select::SelectHandler;

pub const DEFAULT_HIGHLIGHT_MS: u64 = 2_000;
pub const DEFAULT_HOVER_MS: u64 = 1_500;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("missing required option `{0}`")]
    MissingOption(&'static str),
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// What a handler reports back; the dispatcher adds correlation and timing.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: ResultStatus,
    pub details: String,
    pub source: Option<String>,
    pub warnings: Vec<TargetResolutionWarning>,
}

impl Outcome {
    pub fn ok(details: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Ok,
            details: details.into(),
            source: None,
            warnings: Vec::new(),
        }
    }

    pub fn warning(details: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Warning,
            ..Self::ok(details)
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_warning(mut self, warning: TargetResolutionWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn no_target(command: &str) -> Self {
        Self::warning(format!("{command} requires a target element"))
            .with_warning(TargetResolutionWarning::new(WarningReason::NoTargetProvided))
    }

    pub fn not_interactable(command: &str, target: &ElementHandle) -> Self {
        Self::warning(format!(
            "cannot {command} element {}: element is not interactable",
            target.describe()
        ))
    }
}

/// Timing defaults for effects whose duration the controller may omit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSettings {
    pub highlight_duration: Duration,
    pub hover_duration: Duration,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            highlight_duration: Duration::from_millis(DEFAULT_HIGHLIGHT_MS),
            hover_duration: Duration::from_millis(DEFAULT_HOVER_MS),
        }
    }
}

/// Everything a handler may touch besides its target.
pub struct HandlerContext<'a> {
    pub document: &'a dyn HostDocument,
    pub overlays: &'a OverlayRegistry,
    pub effects: &'a ActiveEffects,
    pub bridge: Option<&'a dyn ChatbotBridge>,
    pub settings: &'a HandlerSettings,
}

pub trait CommandHandler: Send + Sync {
    fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError>;
}

impl<F> CommandHandler for F
where
    F: Fn(&HandlerContext<'_>, Option<&ElementHandle>, &Value) -> Result<Outcome, HandlerError>
        + Send
        + Sync,
{
    fn handle(
        &self,
        ctx: &HandlerContext<'_>,
        target: Option<&ElementHandle>,
        options: &Value,
    ) -> Result<Outcome, HandlerError> {
        (self)(ctx, target, options)
    }
}

/// Routing table from command name to handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference handler set: clear, click, close, fill, focus, highlight,
    /// hover, open, scroll, select.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("clear", ClearHandler);
        registry.register("click", ClickHandler);
        registry.register("close", CloseHandler);
        registry.register("fill", FillHandler);
        registry.register("focus", FocusHandler);
        registry.register("highlight", HighlightHandler);
        registry.register("hover", HoverHandler);
        registry.register("open", OpenHandler);
        registry.register("scroll", ScrollHandler);
        registry.register("select", SelectHandler);
        registry
    }

    /// Installs `handler` for `command`, returning any handler it replaced.
    pub fn register(
        &mut self,
        command: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.insert(command.into(), Arc::new(handler))
    }

    pub fn get(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(command).cloned()
    }

    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Typed accessors over a handler's `options` object. `null` reads as empty.
pub(crate) struct Options<'a> {
    fields: Option<&'a Map<String, Value>>,
}

impl<'a> Options<'a> {
    pub(crate) fn parse(options: &'a Value) -> Result<Self, HandlerError> {
        match options {
            Value::Null => Ok(Self { fields: None }),
            Value::Object(fields) => Ok(Self {
                fields: Some(fields),
            }),
            other => Err(HandlerError::InvalidOption {
                name: "options",
                reason: format!("expected an object, got {}", kind_of(other)),
            }),
        }
    }

    pub(crate) fn raw(&self) -> Option<&'a Map<String, Value>> {
        self.fields
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.fields
            .and_then(|fields| fields.get(name))
            .filter(|value| !value.is_null())
    }

    pub(crate) fn flag(&self, name: &'static str) -> Result<bool, HandlerError> {
        match self.get(name) {
            None => Ok(false),
            Some(Value::Bool(value)) => Ok(*value),
            Some(other) => Err(invalid(name, "a boolean", other)),
        }
    }

    pub(crate) fn string(&self, name: &'static str) -> Result<Option<&'a str>, HandlerError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(invalid(name, "a string", other)),
        }
    }

    pub(crate) fn required_string(&self, name: &'static str) -> Result<&'a str, HandlerError> {
        self.string(name)?.ok_or(HandlerError::MissingOption(name))
    }

    pub(crate) fn unsigned(&self, name: &'static str) -> Result<Option<u64>, HandlerError> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| invalid(name, "a non-negative integer", value)),
        }
    }

    pub(crate) fn duration(&self, name: &'static str) -> Result<Option<Duration>, HandlerError> {
        Ok(self.unsigned(name)?.map(Duration::from_millis))
    }
}

fn invalid(name: &'static str, expected: &str, got: &Value) -> HandlerError {
    HandlerError::InvalidOption {
        name,
        reason: format!("expected {expected}, got {}", kind_of(got)),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolves the target or produces the standard "no target" warning.
pub(crate) fn require_target<'t>(
    command: &str,
    target: Option<&'t ElementHandle>,
) -> Result<&'t ElementHandle, Outcome> {
    target.ok_or_else(|| Outcome::no_target(command))
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_cover_every_command_kind() {
        let registry = HandlerRegistry::with_defaults();
        assert_eq!(
            registry.commands(),
            vec![
                "clear",
                "click",
                "close",
                "fill",
                "focus",
                "highlight",
                "hover",
                "open",
                "scroll",
                "select"
            ]
        );
    }

    #[test]
    fn closures_are_handlers() {
        let mut registry = HandlerRegistry::new();
        registry.register(
            "ping",
            |_: &HandlerContext<'_>, _: Option<&ElementHandle>, _: &Value| -> Result<Outcome, HandlerError> {
                Ok(Outcome::ok("pong"))
            },
        );
        assert!(registry.contains("ping"));
    }

    #[test]
    fn options_reject_non_objects() {
        let err = Options::parse(&json!([1, 2])).err().expect("array rejected");
        assert!(err.to_string().contains("options"));
        assert!(Options::parse(&Value::Null).is_ok());
    }

    #[test]
    fn option_accessors_validate_types() {
        let value = json!({"flag": true, "name": "x", "count": 3, "bad": "nope", "gone": null});
        let options = Options::parse(&value).expect("object");
        assert!(options.flag("flag").expect("bool"));
        assert!(!options.flag("missing").expect("default"));
        assert_eq!(options.string("name").expect("str"), Some("x"));
        assert_eq!(options.unsigned("count").expect("u64"), Some(3));
        assert!(options.unsigned("bad").is_err());
        assert_eq!(options.string("gone").expect("null reads as absent"), None);
        assert!(matches!(
            options.required_string("gone"),
            Err(HandlerError::MissingOption("gone"))
        ));
    }
}
