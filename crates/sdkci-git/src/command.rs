//! Git command execution abstraction

use async_trait::async_trait;
use sdkci_core::{Result, SdkciError};
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Output from a git command
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Lossily decoded stdout
    pub stdout: String,
    /// Stdout exactly as git wrote it
    pub stdout_bytes: Vec<u8>,
    pub stderr: String,
    pub success: bool,
}

impl GitOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        let stdout = stdout.into();
        Self {
            stdout_bytes: stdout.clone().into_bytes(),
            stdout,
            stderr: String::new(),
            success: true,
        }
    }

    /// Successful output with stdout that need not be UTF-8
    pub fn ok_bytes(stdout: impl Into<Vec<u8>>) -> Self {
        let stdout_bytes = stdout.into();
        Self {
            stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
            stdout_bytes,
            stderr: String::new(),
            success: true,
        }
    }

    /// Failed output with the given stderr
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stdout_bytes: Vec::new(),
            stderr: stderr.into(),
            success: false,
        }
    }
}

impl From<Output> for GitOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            stdout_bytes: output.stdout,
        }
    }
}

/// Trait for executing git commands (allows mocking in tests)
#[async_trait]
pub trait GitExecutor: Send + Sync {
    /// Execute a git command with the given arguments
    async fn exec(&self, args: &[&str]) -> Result<GitOutput>;
}

/// Real git command executor
#[derive(Clone)]
pub struct GitCommand {
    repo_root: PathBuf,
}

impl GitCommand {
    /// Create a new git command executor for the given repository
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

}

#[async_trait]
impl GitExecutor for GitCommand {
    #[instrument(skip(self), fields(repo = %self.repo_root.display()))]
    async fn exec(&self, args: &[&str]) -> Result<GitOutput> {
        debug!("Executing git {:?}", args);

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .await
            .map_err(|e| SdkciError::Git(format!("Failed to execute git: {}", e)))?;

        let git_output = GitOutput::from(output);

        if !git_output.success {
            debug!("Git command failed: {}", git_output.stderr);
        }

        Ok(git_output)
    }
}

/// Mock git executor for testing
///
/// Responses are keyed by the space-joined argument list. A key may be given
/// several responses; they are returned in order and the last one repeats.
#[derive(Default)]
pub struct MockGitExecutor {
    responses: std::sync::Mutex<std::collections::HashMap<String, Vec<GitOutput>>>,
    calls: std::sync::Mutex<Vec<String>>,
}

impl MockGitExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, command: &str, output: GitOutput) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(command.to_string())
            .or_default()
            .push(output);
        self
    }

    /// Commands executed so far, space-joined
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl GitExecutor for MockGitExecutor {
    async fn exec(&self, args: &[&str]) -> Result<GitOutput> {
        let key = args.join(" ");
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(key.clone());

        let mut responses = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let queue = responses
            .get_mut(&key)
            .ok_or_else(|| SdkciError::Git(format!("No mock response for: {}", key)))?;

        if queue.len() > 1 {
            Ok(queue.remove(0))
        } else {
            queue
                .first()
                .cloned()
                .ok_or_else(|| SdkciError::Git(format!("No mock response for: {}", key)))
        }
    }
}
