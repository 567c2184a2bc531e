use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. An unparseable filter falls back to `info`.
/// Calling this twice is harmless; the second install is ignored.
pub fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let _ = Registry::default().with(env_filter).with(fmt_layer).try_init();
}
