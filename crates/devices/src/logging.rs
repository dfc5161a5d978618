use shared::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when RUST_LOG is unset. Pretty runs are interactive, so the
/// nearby crate's callback traffic is shown too.
fn default_filter(format: LogFormat) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match format {
        LogFormat::Json => EnvFilter::new("info"),
        LogFormat::Pretty => EnvFilter::new("info,nearby=debug"),
    })
}

/// Install the global subscriber in the configured format
pub fn init(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(default_filter(format));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt_layer.with_thread_ids(true).json())
            .try_init(),
        LogFormat::Pretty => registry.with(fmt_layer.pretty()).try_init(),
    };

    if installed.is_ok() {
        tracing::info!(format = ?format, "Logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_keeps_first_subscriber() {
        init(LogFormat::Pretty);
        init(LogFormat::Json);
    }
}
