use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::{log::SetLoggerError, LogTracer};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to redirect `log` records to tracing.")]
    Logger(#[from] SetLoggerError),
    #[error("Failed to set the global tracing subscriber.")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Compose multiple layers into a bunyan formatted subscriber. `RUST_LOG`
/// takes precedence over `env_filter`.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Register a subscriber as global default to process span data.
///
/// It should only be called once!
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> Result<(), TelemetryError> {
    // sqlx logs through `log`
    LogTracer::init()?;
    set_global_default(subscriber)?;

    Ok(())
}
