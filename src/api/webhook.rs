//! Webhook handler for GitHub release and tag deliveries

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::deployment::Deployment;
use crate::error::WebhookError;
use crate::utils::verify_github_signature;
use crate::webhook::{DeployTrigger, EVENT_HEADER, GithubEvent, SIGNATURE_HEADER};
use crate::SharedState;

/// Successful outcomes of a webhook delivery, all answered with 200
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookReply {
    PingReceived,
    NoActionNeeded,
    DeploymentTriggered,
}

impl WebhookReply {
    pub fn body(&self) -> &'static str {
        match self {
            WebhookReply::PingReceived => "Ping received",
            WebhookReply::NoActionNeeded => "No action needed",
            WebhookReply::DeploymentTriggered => "Deployment triggered",
        }
    }
}

impl IntoResponse for WebhookReply {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

/// GET /webhook - liveness probe
pub async fn webhook_status(AxumState(state): AxumState<SharedState>) -> String {
    format!("Webhook endpoint is active: {}", state.config.manager_version)
}

/// POST /webhook - verifies the delivery and redeploys when it qualifies.
///
/// The body is taken as raw bytes because the signature covers the exact
/// payload GitHub sent.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<WebhookReply, WebhookError> {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("Rejected delivery without a readable {} header", SIGNATURE_HEADER);
        return Err(WebhookError::InvalidRequest);
    };

    match verify_github_signature(&state.config.webhook_secret, &body, signature) {
        Ok(true) => {}
        Ok(false) => {
            warn!("Signature verification failed for webhook delivery");
            return Err(WebhookError::InvalidSignature);
        }
        Err(e) => {
            error!("{}", e);
            return Err(e);
        }
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!("Could not parse JSON body: {}", e);
        WebhookError::from(e)
    })?;

    let event = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(GithubEvent::from_header);
    debug!("Verified {:?} delivery", event);

    if event == Some(GithubEvent::Ping) {
        info!("Ping received");
        return Ok(WebhookReply::PingReceived);
    }

    let config = &state.config;
    let Some(trigger) = config
        .deploy_policy
        .evaluate(event.as_ref(), &payload, &config.deploy_branch)
    else {
        info!(
            "No deployment for {} event",
            event.as_ref().map(GithubEvent::as_str).unwrap_or("<none>")
        );
        return Ok(WebhookReply::NoActionNeeded);
    };

    run_deployment(state, trigger).await
}

/// Runs the deploy command under the deploy lock and records the outcome.
///
/// The run happens on its own task so a client that disconnects mid-deploy
/// cannot release the lock or leave the record unfinished.
async fn run_deployment(
    state: SharedState,
    trigger: DeployTrigger,
) -> Result<WebhookReply, WebhookError> {
    let task = tokio::spawn(async move {
        let _guard = state.deploy_lock.lock().await;

        let mut deployment = Deployment::from_trigger(&trigger);
        state.deployments.lock().await.record(deployment.clone());
        info!(
            "Deployment {} started for {} event ({})",
            deployment.id,
            trigger.event,
            trigger.reference.as_deref().unwrap_or("no ref")
        );

        let result = match state.runner.run(&state.deploy_command).await {
            Ok(output) if output.success() => {
                info!("Deployment {} succeeded:\n{}", deployment.id, output.stdout);
                deployment.mark_success(output.stdout);
                Ok(WebhookReply::DeploymentTriggered)
            }
            Ok(output) => {
                error!(
                    "Deployment {} failed with exit code {:?}:\n{}",
                    deployment.id, output.exit_code, output.stderr
                );
                let reason = format!("exit code {:?}", output.exit_code);
                deployment.mark_failed(output.stderr);
                Err(WebhookError::DeploymentFailed(reason))
            }
            Err(e) => {
                error!("Deployment {} could not start: {}", deployment.id, e);
                deployment.mark_failed(e.to_string());
                Err(WebhookError::DeploymentFailed(e.to_string()))
            }
        };

        state.deployments.lock().await.update(&deployment);
        result
    });

    task.await.unwrap_or_else(|e| {
        error!("Deployment task aborted: {}", e);
        Err(WebhookError::DeploymentFailed(e.to_string()))
    })
}
