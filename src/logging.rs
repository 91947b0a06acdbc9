use std::env;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn,fengshui=info";

fn filter_directives(fengshui_log: Option<String>, rust_log: Option<String>) -> String {
    [fengshui_log, rust_log]
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Logs go to stderr; stdout is reserved for command reports.
pub fn init() {
    let directives = filter_directives(env::var("FENGSHUI_LOG").ok(), env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
