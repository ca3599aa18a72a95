//! tracing-subscriber の初期化
//!
//! - `RUST_LOG` があればそれを使う。なければ `[logging] level`
//! - `json = true` なら 1 行 1 JSON で出す
//! - 2 回目以降の呼び出しは何もしない（テストから何度呼んでもよい）

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Filter used when `RUST_LOG` is unset. `verbose` forces `debug`.
pub fn default_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        config.level.clone()
    }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(config: &LoggingConfig, verbose: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config, verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
