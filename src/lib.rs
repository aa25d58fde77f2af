pub mod config;
pub mod domain;
pub mod eligibility;
pub mod issuance;
pub mod notification_client;
pub mod promo_generator;
pub mod scheduler;
pub mod seed;
pub mod startup;
pub mod store;
pub mod telemetry;

/// Writes an error followed by each of its sources, one per line.
pub fn error_chain_fmt(
    error: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}", error)?;
    let mut current = error.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
