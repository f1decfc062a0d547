use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` overrides the default filter;
/// `LOG_JSON` switches to JSON lines.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("solana_boost_bot=info,warn"));

    if std::env::var_os("LOG_JSON").is_some() {
        fmt().json().with_env_filter(env_filter).with_target(true).init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
