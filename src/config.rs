//! Listener configuration: optional TOML file overlaid with environment variables

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::error::{DeployerError, Result};
use crate::webhook::DeployPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "webhook_config.toml";
pub const DEFAULT_WEBHOOK_PORT: u16 = 3001;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_PM2_NAME: &str = "community-server";
pub const DEFAULT_REPO_DIR: &str = ".";
pub const DEFAULT_DEPLOY_BRANCH: &str = "main";
pub const DEFAULT_MAX_DEPLOYMENTS: usize = 24;

/// Shape of the TOML config file; every key is optional
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    webhook_secret: Option<String>,
    webhook_port: Option<u16>,
    bind_host: Option<String>,
    pm2_name: Option<String>,
    manager_version: Option<String>,
    repo_dir: Option<String>,
    deploy_branch: Option<String>,
    deploy_policy: Option<DeployPolicy>,
    log_dir: Option<PathBuf>,
    max_deployments: Option<usize>,
}

/// Immutable listener configuration, resolved once at startup
#[derive(Clone)]
pub struct WebhookConfig {
    pub webhook_secret: String,
    pub webhook_port: u16,
    pub bind_host: String,
    pub pm2_name: String,
    pub manager_version: String,
    pub repo_dir: String,
    pub deploy_branch: String,
    pub deploy_policy: DeployPolicy,
    pub log_dir: Option<PathBuf>,
    pub max_deployments: usize,
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("webhook_secret", &"<redacted>")
            .field("webhook_port", &self.webhook_port)
            .field("bind_host", &self.bind_host)
            .field("pm2_name", &self.pm2_name)
            .field("manager_version", &self.manager_version)
            .field("repo_dir", &self.repo_dir)
            .field("deploy_branch", &self.deploy_branch)
            .field("deploy_policy", &self.deploy_policy)
            .field("log_dir", &self.log_dir)
            .field("max_deployments", &self.max_deployments)
            .finish()
    }
}

impl WebhookConfig {
    /// Config with defaults for everything but the secret.
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            webhook_port: DEFAULT_WEBHOOK_PORT,
            bind_host: DEFAULT_BIND_HOST.to_string(),
            pm2_name: DEFAULT_PM2_NAME.to_string(),
            manager_version: env!("CARGO_PKG_VERSION").to_string(),
            repo_dir: DEFAULT_REPO_DIR.to_string(),
            deploy_branch: DEFAULT_DEPLOY_BRANCH.to_string(),
            deploy_policy: DeployPolicy::default(),
            log_dir: None,
            max_deployments: DEFAULT_MAX_DEPLOYMENTS,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.webhook_port)
    }

    /// Resolves the config from optional TOML contents and an environment
    /// lookup. Environment values win over file values; empty values count
    /// as unset.
    pub fn resolve<F>(file_contents: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ConfigFile = match file_contents {
            Some(contents) => toml::from_str(contents)?,
            None => ConfigFile::default(),
        };
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let webhook_secret = env("WEBHOOK_SECRET")
            .or(file.webhook_secret)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                DeployerError::ConfigError(
                    "webhook_secret is required (set WEBHOOK_SECRET or webhook_secret)".to_string(),
                )
            })?;

        let mut config = Self::new(webhook_secret);

        if let Some(port) = parse_env::<u16>(&env, "WEBHOOK_PORT")?.or(file.webhook_port) {
            config.webhook_port = port;
        }
        if let Some(host) = env("WEBHOOK_HOST").or(file.bind_host) {
            config.bind_host = host;
        }
        if let Some(name) = env("PM2_NAME").or(file.pm2_name) {
            config.pm2_name = name;
        }
        if let Some(version) = env("MANAGER_VERSION").or(file.manager_version) {
            config.manager_version = version;
        }
        if let Some(dir) = env("REPO_DIR").or(file.repo_dir) {
            config.repo_dir = dir;
        }
        if let Some(branch) = env("DEPLOY_BRANCH").or(file.deploy_branch) {
            config.deploy_branch = branch;
        }
        if let Some(policy) = parse_env::<DeployPolicy>(&env, "DEPLOY_POLICY")?.or(file.deploy_policy)
        {
            config.deploy_policy = policy;
        }
        config.log_dir = env("LOG_DIR").map(PathBuf::from).or(file.log_dir);
        if let Some(max) = parse_env::<usize>(&env, "MAX_DEPLOYMENTS")?.or(file.max_deployments) {
            config.max_deployments = max;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pm2_name.is_empty() {
            return Err(DeployerError::ConfigError(
                "pm2_name must not be empty".to_string(),
            ));
        }
        if self.deploy_branch.is_empty() {
            return Err(DeployerError::ConfigError(
                "deploy_branch must not be empty".to_string(),
            ));
        }
        if self.max_deployments == 0 {
            return Err(DeployerError::ConfigError(
                "max_deployments must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                DeployerError::ConfigError(format!("Invalid value '{}' for {}: {}", raw, key, e))
            })
        })
        .transpose()
}

/// Loads the config file at `path` (if it exists) and overlays the process
/// environment.
pub fn load_config(path: impl AsRef<Path>) -> Result<WebhookConfig> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(
                "Config file {:?} not found, using environment variables only",
                path
            );
            None
        }
        Err(e) => {
            return Err(DeployerError::ConfigError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            )));
        }
    };

    WebhookConfig::resolve(contents.as_deref(), |key| std::env::var(key).ok())
}
