//! Execution of the deploy command chain

use async_trait::async_trait;
use std::io;
use tokio::process::Command;
use tracing::info;

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a shell command line to completion.
///
/// An `Err` means the process could not be spawned; a process that ran and
/// exited non-zero is an `Ok` with `success() == false`.
#[async_trait]
pub trait DeployRunner: Send + Sync {
    async fn run(&self, command: &str) -> io::Result<CommandOutput>;
}

/// Runs commands through `sh -c`
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeployRunner for ShellRunner {
    async fn run(&self, command: &str) -> io::Result<CommandOutput> {
        info!("Running: {} -c {:?}", self.shell, command);
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .output()
            .await?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_runner_captures_output() {
        let output = ShellRunner::new()
            .run("echo deployed && echo warn >&2")
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "deployed");
        assert_eq!(output.stderr.trim(), "warn");
    }

    #[tokio::test]
    async fn test_shell_runner_reports_failure() {
        let output = ShellRunner::new().run("exit 3").await.unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
    }

    #[tokio::test]
    async fn test_missing_shell_is_spawn_error() {
        let result = ShellRunner::with_shell("/nonexistent/shell").run("true").await;
        assert!(result.is_err());
    }
}
