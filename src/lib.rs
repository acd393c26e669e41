pub mod api;
pub mod config;
pub mod deployment;
pub mod error;
pub mod logging;
pub mod runner;
pub mod utils;
pub mod webhook;

use axum::{Router, routing};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

pub use config::{WebhookConfig, load_config};
use deployment::DeploymentStore;
use runner::DeployRunner;

pub struct AppState {
    pub config: WebhookConfig,
    /// Command chain run for every qualifying delivery
    pub deploy_command: String,
    pub runner: Arc<dyn DeployRunner>,
    /// Held for the whole run so overlapping deliveries deploy one at a time
    pub deploy_lock: Mutex<()>,
    pub deployments: Mutex<DeploymentStore>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: WebhookConfig, runner: Arc<dyn DeployRunner>) -> Self {
        Self {
            deploy_command: utils::build_deploy_command(&config),
            deployments: Mutex::new(DeploymentStore::new(config.max_deployments)),
            config,
            runner,
            deploy_lock: Mutex::new(()),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Routes served on the webhook port
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(api::root))
        .route("/status", routing::get(api::status))
        .route(
            "/webhook",
            routing::get(api::webhook_status).post(api::handle_webhook),
        )
        .with_state(state)
}
