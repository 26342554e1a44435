use std::{path::PathBuf, sync::Once};

use once_cell::sync::Lazy;

static TRACING_INIT: Once = Once::new();

/// Filter used when neither `RUST_LOG` nor the config provides one.
pub const DEFAULT_LOG_FILTER: &str = "tto_ledger=info,tto_core=info,tto_storage_json=info";

/// Base directory holding `config/config.json`.
pub static DEFAULT_CONFIG_BASE: Lazy<PathBuf> = Lazy::new(|| {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tto-ledger")
});

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    init_tracing_with(None);
}

/// Installs the fmt subscriber once. `RUST_LOG` wins over `directives`, which
/// win over [`DEFAULT_LOG_FILTER`].
pub fn init_tracing_with(directives: Option<&str>) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(directives.unwrap_or(DEFAULT_LOG_FILTER)))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        let _ = fmt().with_env_filter(filter).try_init();
    });
}
