//! Command dispatcher: validate, resolve, route, normalize.
//!
//! [`Dispatcher::dispatch`] is total. Every payload yields exactly one
//! [`CommandResult`], including when the handler errors or panics.

pub mod inbound;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use helm_proto::{CommandPayload, CommandResult, SOURCE_DISPATCHER};
use tracing::{debug, warn};

use crate::bridge::ChatbotBridge;
use crate::effects::ActiveEffects;
use crate::handlers::{CommandHandler, HandlerContext, HandlerRegistry, HandlerSettings};
use crate::host::HostDocument;
use crate::metrics;
use crate::overlay::OverlayRegistry;
use crate::target::TargetResolver;

pub use inbound::parse_message;

const UNKNOWN_COMMAND_LABEL: &str = "unknown";

pub struct Dispatcher {
    resolver: TargetResolver,
    handlers: HandlerRegistry,
    overlays: Arc<OverlayRegistry>,
    effects: ActiveEffects,
    bridge: Option<Arc<dyn ChatbotBridge>>,
    settings: HandlerSettings,
}

impl Dispatcher {
    /// A dispatcher over `document` with the reference handler set.
    pub fn new(document: Arc<dyn HostDocument>) -> Self {
        Self {
            resolver: TargetResolver::new(document),
            handlers: HandlerRegistry::with_defaults(),
            overlays: Arc::new(OverlayRegistry::new()),
            effects: ActiveEffects::new(),
            bridge: None,
            settings: HandlerSettings::default(),
        }
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_bridge(mut self, bridge: Arc<dyn ChatbotBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn with_settings(mut self, settings: HandlerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Shares an overlay registry owned elsewhere instead of a private one.
    pub fn with_overlays(mut self, overlays: Arc<OverlayRegistry>) -> Self {
        self.overlays = overlays;
        self
    }

    pub fn register_handler(
        &mut self,
        command: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) {
        self.handlers.register(command, handler);
    }

    pub fn overlays(&self) -> &Arc<OverlayRegistry> {
        &self.overlays
    }

    pub fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn dispatch(&self, payload: CommandPayload) -> CommandResult {
        let command = payload.command.trim();
        let label = if self.handlers.contains(command) {
            command
        } else {
            UNKNOWN_COMMAND_LABEL
        };
        let result = self.route(command, &payload);
        metrics::COMMANDS
            .with_label_values(&[label, result.status.as_str()])
            .inc();
        debug!(
            target = "helm::dispatch",
            command,
            request_id = payload.request_id.as_deref().unwrap_or(""),
            status = %result.status,
            "command dispatched"
        );
        result.with_request_id(payload.request_id)
    }

    fn route(&self, command: &str, payload: &CommandPayload) -> CommandResult {
        if command.is_empty() {
            return CommandResult::error("missing required field `command`")
                .with_source(SOURCE_DISPATCHER);
        }

        let target = match payload.element_id.as_deref() {
            None => None,
            Some(element_id) => match self.resolver.resolve(Some(element_id)) {
                Ok(target) => Some(target),
                Err(warning) => {
                    return CommandResult::warning(format!("cannot {command}: {warning}"))
                        .with_source(SOURCE_DISPATCHER)
                        .with_warnings(vec![warning]);
                }
            },
        };

        let Some(handler) = self.handlers.get(command) else {
            return CommandResult::error(format!("unknown command `{command}`"))
                .with_source(SOURCE_DISPATCHER);
        };

        let ctx = HandlerContext {
            document: self.resolver.document().as_ref(),
            overlays: &self.overlays,
            effects: &self.effects,
            bridge: self.bridge.as_deref(),
            settings: &self.settings,
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            handler.handle(&ctx, target.as_ref(), payload.options())
        }));

        match outcome {
            Ok(Ok(outcome)) => CommandResult::new(outcome.status, outcome.details)
                .with_source(
                    outcome
                        .source
                        .unwrap_or_else(|| SOURCE_DISPATCHER.to_string()),
                )
                .with_warnings(outcome.warnings),
            Ok(Err(err)) => {
                warn!(
                    target = "helm::dispatch",
                    command,
                    error = %err,
                    "handler failed"
                );
                CommandResult::error(format!("{command} failed: {err}"))
                    .with_source(SOURCE_DISPATCHER)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(
                    target = "helm::dispatch",
                    command,
                    panic = %message,
                    "handler panicked"
                );
                CommandResult::error(format!("{command} handler panicked: {message}"))
                    .with_source(SOURCE_DISPATCHER)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
