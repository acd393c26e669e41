use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::webhook::DeployTrigger;

/// Maximum size for deploy output before truncation (64KB)
pub const MAX_OUTPUT_SIZE: usize = 64 * 1024;

/// Represents the status of a deployment run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Running,
    Success,
    Failed,
}

/// One run of the deploy command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub event: String,
    pub reference: Option<String>,
    pub status: DeploymentStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output: Option<String>,
    pub output_truncated: bool,
    pub error: Option<String>,
}

impl Deployment {
    /// Create a new deployment in Running status
    pub fn from_trigger(trigger: &DeployTrigger) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            event: trigger.event.to_string(),
            reference: trigger.reference.clone(),
            status: DeploymentStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            output: None,
            output_truncated: false,
            error: None,
        }
    }

    /// Mark deployment as successful with output (truncates if too large)
    pub fn mark_success(&mut self, output: String) {
        self.status = DeploymentStatus::Success;
        self.completed_at = Some(Utc::now());
        let (output, truncated) = truncate_output(output);
        self.output = Some(output);
        self.output_truncated = truncated;
    }

    /// Mark deployment as failed with error
    pub fn mark_failed(&mut self, error: String) {
        self.status = DeploymentStatus::Failed;
        self.completed_at = Some(Utc::now());
        let (error, truncated) = truncate_output(error);
        self.error = Some(error);
        self.output_truncated = truncated;
    }
}

/// Deployment as listed by the status endpoint, without command output
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentSummary {
    pub id: String,
    pub event: String,
    pub reference: Option<String>,
    pub status: DeploymentStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output_truncated: bool,
}

impl From<&Deployment> for DeploymentSummary {
    fn from(deployment: &Deployment) -> Self {
        Self {
            id: deployment.id.clone(),
            event: deployment.event.clone(),
            reference: deployment.reference.clone(),
            status: deployment.status.clone(),
            started_at: deployment.started_at,
            completed_at: deployment.completed_at,
            output_truncated: deployment.output_truncated,
        }
    }
}

fn truncate_output(mut output: String) -> (String, bool) {
    if output.len() <= MAX_OUTPUT_SIZE {
        return (output, false);
    }
    let mut cut = MAX_OUTPUT_SIZE;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    output.truncate(cut);
    output.push_str("\n... (output truncated)");
    (output, true)
}

/// Bounded in-memory history of deployments, oldest evicted first
#[derive(Debug)]
pub struct DeploymentStore {
    deployments: VecDeque<Deployment>,
    max_deployments: usize,
}

impl DeploymentStore {
    pub fn new(max_deployments: usize) -> Self {
        Self {
            deployments: VecDeque::with_capacity(max_deployments),
            max_deployments: max_deployments.max(1),
        }
    }

    pub fn record(&mut self, deployment: Deployment) {
        while self.deployments.len() >= self.max_deployments {
            self.deployments.pop_front();
        }
        self.deployments.push_back(deployment);
    }

    /// Replaces the stored deployment with the same id, if still retained.
    pub fn update(&mut self, deployment: &Deployment) {
        if let Some(existing) = self.deployments.iter_mut().find(|d| d.id == deployment.id) {
            *existing = deployment.clone();
        }
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&Deployment> {
        self.deployments.iter().find(|d| d.id == id)
    }

    /// Most recent first, stripped of output
    pub fn recent_summaries(&self, limit: usize) -> Vec<DeploymentSummary> {
        self.deployments
            .iter()
            .rev()
            .take(limit)
            .map(DeploymentSummary::from)
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.deployments.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }
}
