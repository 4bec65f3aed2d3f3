use crm_core::LogFormat;
use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const DEFAULT_FILTER: &str = "crm_api=debug,crm_services=debug,crm_db=info,tower_http=debug";

/// Initialize tracing. `RUST_LOG` overrides the default filter.
///
/// Compact console output suits development; JSON lines suit log shippers.
/// Calling this twice (as tests do) keeps the first subscriber.
pub fn init_telemetry(format: LogFormat) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let compact = (format == LogFormat::Compact).then(|| {
        tracing_subscriber::fmt::layer().event_format(
            Format::default()
                .compact()
                .with_target(false)
                .without_time(),
        )
    });
    let json = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .flatten_event(true)
    });

    if tracing_subscriber::registry()
        .with(filter)
        .with(compact)
        .with(json)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }

    Ok(())
}
