use birthday_promo::config::get_configuration;
use birthday_promo::startup::Application;
use birthday_promo::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() {
    let subscriber = get_subscriber(
        String::from("birthday_promo"),
        String::from("info"),
        std::io::stdout,
    );
    if let Err(err) = init_subscriber(subscriber) {
        eprintln!("{}", err);
        std::process::exit(1);
    }

    let config = match get_configuration() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Missing or invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let application = match Application::build(config).await {
        Ok(application) => application,
        Err(err) => {
            tracing::error!("Failed to initialise the application: {:?}", err);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Issuing birthday promos every {}s",
        application.get_tick_period().as_secs()
    );

    application.run_until_stopped(shutdown_signal()).await;
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
        Err(err) => {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await
        }
    }
}
