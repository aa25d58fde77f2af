use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::{DatabaseSettings, Settings};
use crate::eligibility::EligibilitySelector;
use crate::error_chain_fmt;
use crate::issuance::IssuanceOrchestrator;
use crate::notification_client::TwilioClient;
use crate::scheduler::Scheduler;
use crate::seed::{seed_users, SeedError};
use crate::store::PgStore;

#[derive(thiserror::Error)]
pub enum StartupError {
    #[error("The scheduler tick period must be at least one second.")]
    InvalidTickPeriod,
    #[error("Failed to connect to the database.")]
    Connect(#[source] sqlx::Error),
    #[error("Failed to drop the existing schema.")]
    Reset(#[source] sqlx::Error),
    #[error("Failed to run database migrations.")]
    Migrate(#[from] MigrateError),
    #[error("Failed to seed the database.")]
    Seed(#[from] SeedError),
    #[error("Notification sender is not valid: {0}")]
    InvalidSender(String),
    #[error("Failed to build the notification client.")]
    NotificationClient(#[from] reqwest::Error),
}

impl std::fmt::Debug for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub struct Application {
    scheduler: Scheduler,
}

impl Application {
    /// Connects to and prepares the store, then wires the pipeline. Any error
    /// here is fatal: no tick has run yet.
    pub async fn build(config: Settings) -> Result<Self, StartupError> {
        let tick_period = config.get_tick_period();
        if tick_period.is_zero() {
            return Err(StartupError::InvalidTickPeriod);
        }

        let db_pool = get_connection_db_pool(&config.database)
            .await
            .map_err(StartupError::Connect)?;
        let store = PgStore::new(db_pool, config.database.get_timeout());

        init_store(&store, &config).await?;

        let sender = config
            .notification_client
            .get_sender()
            .map_err(StartupError::InvalidSender)?;
        let twilio_client = TwilioClient::new(
            config.notification_client.base_url.clone(),
            config.notification_client.account_sid.clone(),
            sender,
            config.notification_client.auth_token.clone(),
            Some(config.notification_client.get_timeout()),
        )?;

        let store = Arc::new(store);
        let orchestrator = IssuanceOrchestrator::new(
            EligibilitySelector::new(store.clone(), config.promo.eligibility),
            store,
            Arc::new(twilio_client),
            config.get_promo_policy(),
        );
        let scheduler = Scheduler::new(Arc::new(orchestrator), tick_period);

        Ok(Self { scheduler })
    }

    pub fn get_tick_period(&self) -> Duration {
        self.scheduler.period()
    }

    pub async fn run_until_stopped<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.scheduler.run_until_stopped(shutdown).await
    }
}

pub async fn get_connection_db_pool(config: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_with(config.get_db_options())
        .await
}

/// Migrates the schema. With `database.refresh` set, the schema is dropped
/// first and the seed users are loaded afterwards.
#[tracing::instrument(name = "Initialising the store", skip_all, fields(refresh = config.database.refresh))]
pub async fn init_store(store: &PgStore, config: &Settings) -> Result<(), StartupError> {
    if config.database.refresh {
        store.reset().await.map_err(StartupError::Reset)?;
    }

    store.migrate().await?;

    if config.database.refresh {
        seed_users(store, &config.seed.path).await?;
    }

    Ok(())
}
