// src/logging.rs

use std::env;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` directives plus `LOG_LEVEL` (default `info`).
pub fn init() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
}
