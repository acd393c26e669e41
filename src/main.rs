use community_deployer::config::DEFAULT_CONFIG_PATH;
use community_deployer::logging::setup_logging;
use community_deployer::runner::ShellRunner;
use community_deployer::{AppState, build_router, load_config};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("WEBHOOK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Keep the guard alive so file logs are flushed on exit
    let _log_guard = match setup_logging(config.log_dir.clone()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            std::process::exit(1);
        }
    };

    let bind_address = config.bind_address();
    let state = Arc::new(AppState::new(config, Arc::new(ShellRunner::new())));
    info!("Deploy command: {}", state.deploy_command);
    info!("Deploy policy: {:?}", state.config.deploy_policy);

    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    info!("Webhook listener on {}", bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
