use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LOG_LEVEL: &str = "warn";

static INIT: Once = Once::new();

/// Installs the stderr subscriber once. `RUST_LOG` wins over `level` when set.
pub fn init(level: &str) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::try_new(format!("modpath={level}"))
                .unwrap_or_else(|_| EnvFilter::new(format!("modpath={DEFAULT_LOG_LEVEL}")))
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}
