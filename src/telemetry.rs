use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` picks the filter (default
/// `info`), `LOG_FORMAT=json` switches to structured output.
pub fn init_tracing() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        let subscriber = fmt().with_env_filter(filter).json().finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = fmt().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)
    }
}
