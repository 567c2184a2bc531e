use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static COMMANDS: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new(
            "helm_commands_total",
            "dispatched commands by command kind and result status",
        ),
        &["command", "status"],
    )
    .expect("static metric definition");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static RECONNECT_ATTEMPTS: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::with_opts(Opts::new(
        "helm_reconnect_attempts_total",
        "scheduled transport reconnect attempts",
    ))
    .expect("static metric definition");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static MALFORMED_MESSAGES: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::with_opts(Opts::new(
        "helm_malformed_messages_total",
        "inbound messages rejected before dispatch",
    ))
    .expect("static metric definition");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub fn gather() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(target = "helm::metrics", error = %err, "metrics encode error");
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gathered_text_names_every_family() {
        COMMANDS.with_label_values(&["click", "ok"]).inc();
        RECONNECT_ATTEMPTS.inc();
        MALFORMED_MESSAGES.inc();
        let text = String::from_utf8(gather()).expect("utf8");
        assert!(text.contains("helm_commands_total"));
        assert!(text.contains("helm_reconnect_attempts_total"));
        assert!(text.contains("helm_malformed_messages_total"));
    }
}
