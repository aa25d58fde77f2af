use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, File};
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::{
    postgres::{PgConnectOptions, PgSslMode},
    ConnectOptions,
};

use crate::domain::{NotificationChannel, PhoneNumber};
use crate::eligibility::EligibilityWindow;
use crate::issuance::PromoPolicy;

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub scheduler: SchedulerSettings,
    pub database: DatabaseSettings,
    pub notification_client: NotificationClientSettings,
    pub promo: PromoSettings,
    pub seed: SeedSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct SchedulerSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub tick_period_seconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    // secrecy protects secret information and prevents them to be exposed (eg: via logs)
    pub password: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub name: String,
    pub require_ssl: bool,
    /// Drop the schema, migrate it again and reseed on startup.
    pub refresh: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct NotificationClientSettings {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: Secret<String>,
    pub sender: String,
    pub channel: NotificationChannel,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct PromoSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub amount: f64,
    pub eligibility: EligibilityWindow,
}

#[derive(serde::Deserialize, Clone)]
pub struct SeedSettings {
    pub path: PathBuf,
}

impl Settings {
    pub fn get_tick_period(&self) -> Duration {
        Duration::from_secs(self.scheduler.tick_period_seconds)
    }

    pub fn get_promo_policy(&self) -> PromoPolicy {
        PromoPolicy {
            amount: self.promo.amount,
            channel: self.notification_client.channel,
        }
    }

    pub fn set_db_name(&mut self, db_name: String) {
        self.database.name = db_name
    }

    pub fn set_db_port(&mut self, port: u16) {
        self.database.port = port
    }
}

impl DatabaseSettings {
    pub fn get_db_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        let mut db_options = PgConnectOptions::new()
            .host(&self.host)
            .password(self.password.expose_secret())
            .username(&self.username)
            .port(self.port)
            .database(&self.name)
            .ssl_mode(ssl_mode);

        db_options.log_statements(tracing::log::LevelFilter::Trace);

        db_options
    }

    /// Options for the server itself, without selecting a database.
    pub fn get_server_options(&self) -> PgConnectOptions {
        self.get_db_options().database("postgres")
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl NotificationClientSettings {
    pub fn get_sender(&self) -> Result<PhoneNumber, String> {
        PhoneNumber::parse(self.sender.clone())
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let root_path = std::env::current_dir().map_err(|err| {
        ConfigError::Message(format!("Failed to determine the current directory: {}", err))
    })?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(environment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_DATABASE__REFRESH would set Settings.database.refresh
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    tracing::info!("Application environment = {:?}", environment);

    // Try to convert the value from the configuration file into a Settings type
    settings.try_deserialize()
}
