use mensa_bot::config::load_config;
use mensa_bot::notifier::MattermostNotifier;
use mensa_bot::notifier::mattermost::command_handler::CommandHandler;
use mensa_bot::scraper::ScraperImpl;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt::init();

    std::panic::set_hook(Box::new(|panic_info| {
        error!("😱 Panic occurred: {}", panic_info);
    }));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = match load_config(&config_path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            return ExitCode::FAILURE;
        }
    };

    let scraper = match ScraperImpl::new(
        Duration::from_secs(config.request_timeout_seconds),
        config.retry.clone(),
    ) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to initialize scraper: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let notifier = match MattermostNotifier::connect(config.clone()).await {
        Ok(n) => Arc::new(n),
        Err(e) => {
            error!("There was a problem connecting to the Mattermost server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let handler = Arc::new(CommandHandler::new(scraper, config.clone()));
    let shutdown = Arc::new(Notify::new());

    info!("Sending startup message...");
    let started = format!("_[{}] has **started** running_", config.display_name);
    if let Err(e) = notifier.notify_debug(&started).await {
        warn!("Startup notification failed: {}", e);
    }

    let listener = MattermostNotifier::spawn_listener(notifier.clone(), handler, shutdown.clone());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the interrupt signal: {}", e);
    }
    info!("Interrupt received, stopping...");
    shutdown.notify_one();
    if let Err(e) = listener.await {
        warn!("Listener task ended abnormally: {:?}", e);
    }

    let stopped = format!("_[{}] has **stopped** running_", config.display_name);
    if let Err(e) = notifier.notify_debug(&stopped).await {
        warn!("Shutdown notification failed: {}", e);
    }

    ExitCode::SUCCESS
}
