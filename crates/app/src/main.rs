use std::env;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod flow;

#[tokio::main]
async fn main() {
    // Install global log collector.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|err| {
        error!("env variable CONFIG_PATH should be set: {}", err);
        process::exit(1);
    });

    let app_config = config::AppConfig::load(&config_path).unwrap_or_else(|err| {
        error!("{}", err);
        process::exit(1);
    });

    app::App { config: app_config }
        .start()
        .await
        .unwrap_or_else(|err| {
            error!("{}", err);
            process::exit(1);
        });
}
