use birthday_promo::config::get_configuration;
use birthday_promo::startup::{Application, StartupError};

#[tokio::test]
async fn build_fails_when_the_database_is_unreachable() {
    let mut config = get_configuration().expect("Missing configuration file.");
    // Nothing listens on port 1.
    config.database.host = "127.0.0.1".to_string();
    config.set_db_port(1);

    let result = Application::build(config).await;

    assert!(matches!(result, Err(StartupError::Connect(_))));
}

#[tokio::test]
async fn build_rejects_a_zero_tick_period() {
    let mut config = get_configuration().expect("Missing configuration file.");
    config.scheduler.tick_period_seconds = 0;
    // The period is checked before the database is touched.
    config.set_db_port(1);

    let result = Application::build(config).await;

    assert!(matches!(result, Err(StartupError::InvalidTickPeriod)));
}
