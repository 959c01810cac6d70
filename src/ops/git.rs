#![allow(async_fn_in_trait)]

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tokio::process::Command;
use tracing::instrument;

/// Diagnostic git prints when a commit has nothing staged.
pub const NOTHING_TO_COMMIT: &str = "nothing to commit";

// -----------------------------------------------------------------------------
// GitOps trait

/// Operations for interacting with Git working trees
#[cfg_attr(test, automock)]
pub trait GitOps {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Create `branch` at the current HEAD and switch to it.
    async fn create_branch(&self, repo: &Path, branch: &str) -> Result<()>;
    async fn stage_all(&self, repo: &Path) -> Result<()>;

    /// Commit whatever is staged. A clean index is not an error.
    async fn commit(&self, repo: &Path, message: &str) -> Result<CommitOutcome>;
    async fn push_branch(&self, repo: &Path, remote: &str, branch: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    NothingToCommit,
}

/// A git invocation that did not finish within the configured limit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{command} timed out after {}s", .after.as_secs())]
pub struct CommandTimeout {
    pub command: String,
    pub after: Duration,
}

// -----------------------------------------------------------------------------
// RealGit

/// Real implementation that calls the git CLI
#[derive(Debug, Clone, Default)]
pub struct RealGit {
    timeout: Option<Duration>,
    envs: Vec<(String, String)>,
}

impl RealGit {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            envs: Vec::new(),
        }
    }

    /// Set an extra environment variable on every git invocation.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    async fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<Output> {
        let mut command = Command::new("git");
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        command
            .args(args)
            // Keep diagnostics in English so they can be matched
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| CommandTimeout {
                    command: format!("git {}", args.join(" ")),
                    after: limit,
                })?,
            None => command.output().await,
        }
        .context("Failed to execute git command")?;

        Ok(output)
    }

    async fn run_checked(&self, dir: Option<&Path>, args: &[&str]) -> Result<Output> {
        let output = self.run(dir, args).await?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(output)
    }
}

impl GitOps for RealGit {
    #[instrument(skip(self))]
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = dest.to_str().context("Clone destination is not valid UTF-8")?;
        self.run_checked(None, &["clone", url, dest]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        // -B so a rerun in the same working tree lands on the existing branch
        self.run_checked(Some(repo), &["checkout", "-B", branch])
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stage_all(&self, repo: &Path) -> Result<()> {
        self.run_checked(Some(repo), &["add", "."]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn commit(&self, repo: &Path, message: &str) -> Result<CommitOutcome> {
        let output = self.run(Some(repo), &["commit", "-m", message]).await?;

        if output.status.success() {
            return Ok(CommitOutcome::Committed);
        }

        // git reports a clean index on stdout, other failures on stderr
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if combined.contains(NOTHING_TO_COMMIT) {
            return Ok(CommitOutcome::NothingToCommit);
        }

        Err(anyhow!("git commit failed: {}", combined.trim()))
    }

    #[instrument(skip(self))]
    async fn push_branch(&self, repo: &Path, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
        self.run_checked(Some(repo), &["push", "-u", remote, &refspec])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_timeout_display() {
        let err = CommandTimeout {
            command: "git clone x".to_string(),
            after: Duration::from_secs(300),
        };
        assert_eq!(err.to_string(), "git clone x timed out after 300s");
    }

    #[test]
    fn test_command_timeout_survives_context() {
        let err = anyhow::Error::new(CommandTimeout {
            command: "git push".to_string(),
            after: Duration::from_secs(1),
        })
        .context("Failed to execute git command");

        let timeout = err.downcast_ref::<CommandTimeout>().unwrap();
        assert_eq!(timeout.command, "git push");
    }

    #[tokio::test]
    async fn test_clone_of_missing_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let git = RealGit::new(Some(Duration::from_secs(30)));

        let err = git
            .clone_repo(
                &dir.path().join("does-not-exist.git").display().to_string(),
                &dir.path().join("dest"),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("git command failed"));
    }

    #[tokio::test]
    async fn test_commit_in_clean_repository_is_nothing_to_commit() {
        let dir = tempfile::tempdir().unwrap();
        let git = RealGit::new(None)
            .with_env("GIT_AUTHOR_NAME", "Test User")
            .with_env("GIT_AUTHOR_EMAIL", "test@example.com")
            .with_env("GIT_COMMITTER_NAME", "Test User")
            .with_env("GIT_COMMITTER_EMAIL", "test@example.com");
        git.run_checked(Some(dir.path()), &["init"]).await.unwrap();

        let outcome = git.commit(dir.path(), "empty").await.unwrap();

        assert_eq!(outcome, CommitOutcome::NothingToCommit);
    }
}
