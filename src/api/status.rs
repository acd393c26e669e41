//! Health and status endpoints

use axum::{Json, extract::State as AxumState};
use serde::Serialize;

use crate::SharedState;
use crate::deployment::DeploymentSummary;
use crate::webhook::DeployPolicy;

const RECENT_DEPLOYMENTS: usize = 10;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub manager_version: String,
    pub started_at: String,
    pub uptime_seconds: u64,
    pub deploy_policy: DeployPolicy,
    pub deploy_in_progress: bool,
    pub deployments: Vec<DeploymentSummary>,
}

/// Root health check endpoint
pub async fn root() -> &'static str {
    "community_deployer - healthy"
}

/// GET /status - server info and recent deployments, newest first
pub async fn status(AxumState(state): AxumState<SharedState>) -> Json<StatusResponse> {
    let deployments = state.deployments.lock().await.recent_summaries(RECENT_DEPLOYMENTS);

    Json(StatusResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        manager_version: state.config.manager_version.clone(),
        started_at: state.started_at.to_rfc3339(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        deploy_policy: state.config.deploy_policy,
        deploy_in_progress: state.deploy_lock.try_lock().is_err(),
        deployments,
    })
}
