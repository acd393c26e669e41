//! GitHub event parsing and the redeploy decision

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::DeployerError;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";

const TAG_REF_PREFIX: &str = "refs/tags/";
const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Value of the `x-github-event` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GithubEvent {
    Push,
    Release,
    Ping,
    Other(String),
}

impl GithubEvent {
    pub fn from_header(value: &str) -> Self {
        match value {
            "push" => GithubEvent::Push,
            "release" => GithubEvent::Release,
            "ping" => GithubEvent::Ping,
            other => GithubEvent::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GithubEvent::Push => "push",
            GithubEvent::Release => "release",
            GithubEvent::Ping => "ping",
            GithubEvent::Other(name) => name,
        }
    }
}

impl fmt::Display for GithubEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which deliveries cause a redeploy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployPolicy {
    /// A published release, or a pushed tag.
    #[default]
    Release,
    /// A push to the configured deploy branch.
    Branch,
}

impl FromStr for DeployPolicy {
    type Err = DeployerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "release" => Ok(DeployPolicy::Release),
            "branch" => Ok(DeployPolicy::Branch),
            other => Err(DeployerError::ConfigError(format!(
                "Unknown deploy policy '{}', expected 'release' or 'branch'",
                other
            ))),
        }
    }
}

/// A delivery that qualified for a redeploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTrigger {
    pub event: GithubEvent,
    /// The pushed ref, or the release tag name when present
    pub reference: Option<String>,
}

impl DeployPolicy {
    /// Evaluates the redeploy predicate for one delivery.
    ///
    /// `payload` fields of the wrong JSON type count as absent.
    pub fn evaluate(
        &self,
        event: Option<&GithubEvent>,
        payload: &Value,
        deploy_branch: &str,
    ) -> Option<DeployTrigger> {
        let event = event?;
        let git_ref = payload.get("ref").and_then(Value::as_str);

        let qualifies = match (self, event) {
            (DeployPolicy::Release, GithubEvent::Release) => {
                payload.get("action").and_then(Value::as_str) == Some("published")
            }
            (DeployPolicy::Release, GithubEvent::Push) => {
                git_ref.is_some_and(|r| r.starts_with(TAG_REF_PREFIX))
            }
            (DeployPolicy::Branch, GithubEvent::Push) => git_ref
                .and_then(|r| r.strip_prefix(BRANCH_REF_PREFIX))
                .is_some_and(|branch| branch == deploy_branch),
            _ => false,
        };
        if !qualifies {
            return None;
        }

        let reference = match event {
            GithubEvent::Release => payload
                .get("release")
                .and_then(|r| r.get("tag_name"))
                .and_then(Value::as_str),
            _ => git_ref,
        };

        Some(DeployTrigger {
            event: event.clone(),
            reference: reference.map(String::from),
        })
    }

    #[cfg(test)]
    pub fn should_deploy(
        &self,
        event: Option<&GithubEvent>,
        payload: &Value,
        deploy_branch: &str,
    ) -> bool {
        self.evaluate(event, payload, deploy_branch).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn release(event: &str, payload: Value) -> bool {
        DeployPolicy::Release.should_deploy(Some(&GithubEvent::from_header(event)), &payload, "main")
    }

    #[test]
    fn test_release_policy_truth_table() {
        assert!(!release("push", json!({"ref": "refs/heads/main"})));
        assert!(release("push", json!({"ref": "refs/tags/v1.0.0"})));
        assert!(release(
            "release",
            json!({"action": "published", "release": {"tag_name": "v2.0.0"}})
        ));
        assert!(!release("release", json!({"action": "created"})));
    }

    #[test]
    fn test_release_policy_ignores_tag_name() {
        assert!(release(
            "release",
            json!({"action": "published", "release": {"tag_name": ""}})
        ));
        assert!(release("release", json!({"action": "published"})));
    }

    #[test]
    fn test_wrong_types_and_other_events_do_not_deploy() {
        assert!(!release("push", json!({"ref": 42})));
        assert!(!release("push", json!({})));
        assert!(!release("push", json!(null)));
        assert!(!release("release", json!({"action": ["published"]})));
        assert!(!release("create", json!({"ref": "refs/tags/v1.0.0"})));
        assert!(!release("ping", json!({"zen": "Keep it logically awesome."})));
        assert!(!DeployPolicy::Release.should_deploy(None, &json!({"ref": "refs/tags/v1"}), "main"));
    }

    #[test]
    fn test_branch_policy() {
        let push = GithubEvent::Push;
        let policy = DeployPolicy::Branch;
        assert!(policy.should_deploy(Some(&push), &json!({"ref": "refs/heads/main"}), "main"));
        assert!(!policy.should_deploy(Some(&push), &json!({"ref": "refs/heads/dev"}), "main"));
        assert!(!policy.should_deploy(Some(&push), &json!({"ref": "refs/tags/v1.0.0"}), "main"));
        assert!(policy.should_deploy(Some(&push), &json!({"ref": "refs/heads/dev"}), "dev"));
        assert!(!policy.should_deploy(
            Some(&GithubEvent::Release),
            &json!({"action": "published"}),
            "main"
        ));
    }

    #[test]
    fn test_trigger_reference() {
        let trigger = DeployPolicy::Release
            .evaluate(
                Some(&GithubEvent::Release),
                &json!({"action": "published", "release": {"tag_name": "v2.0.0"}}),
                "main",
            )
            .unwrap();
        assert_eq!(trigger.event, GithubEvent::Release);
        assert_eq!(trigger.reference.as_deref(), Some("v2.0.0"));

        let trigger = DeployPolicy::Release
            .evaluate(Some(&GithubEvent::Push), &json!({"ref": "refs/tags/v9.9.9"}), "main")
            .unwrap();
        assert_eq!(trigger.reference.as_deref(), Some("refs/tags/v9.9.9"));
    }

    #[test]
    fn test_event_header_parsing() {
        assert_eq!(GithubEvent::from_header("push"), GithubEvent::Push);
        assert_eq!(GithubEvent::from_header("ping"), GithubEvent::Ping);
        assert_eq!(
            GithubEvent::from_header("issues"),
            GithubEvent::Other("issues".to_string())
        );
        assert_eq!(GithubEvent::from_header("issues").to_string(), "issues");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("release".parse::<DeployPolicy>().unwrap(), DeployPolicy::Release);
        assert_eq!(" Branch ".parse::<DeployPolicy>().unwrap(), DeployPolicy::Branch);
        assert!("tags".parse::<DeployPolicy>().is_err());
    }
}
