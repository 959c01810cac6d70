use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;

use crate::target::Repo;

pub const DEFAULT_GITHUB_URL: &str = "https://github.com";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL repositories are cloned from and compare links point at.
    pub github_url: String,
    pub remote: String,
    /// Directory the per-PR workspace is created in.
    pub workspace_root: PathBuf,
    /// Limit for a single git invocation; `None` waits forever.
    pub command_timeout: Option<Duration>,
    pub keep_workspace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_url: DEFAULT_GITHUB_URL.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            workspace_root: PathBuf::from("."),
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            keep_workspace: false,
        }
    }
}

impl Config {
    /// Load config from git config (`prepWaldo.*`), falling back to defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = read_git_config("prepWaldo.githubUrl")? {
            config.github_url = url;
        }
        if let Some(remote) = read_git_config("prepWaldo.remote")? {
            config.remote = remote;
        }
        if let Some(secs) = read_git_config("prepWaldo.commandTimeout")? {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("Invalid prepWaldo.commandTimeout: {}", secs))?;
            config.command_timeout = timeout_from_secs(secs);
        }

        Ok(config)
    }

    /// Default config for tests
    pub fn default_for_tests() -> Self {
        Self {
            github_url: "https://github.example".to_string(),
            command_timeout: None,
            ..Self::default()
        }
    }

    pub fn clone_url(&self, org: &str, repo: Repo) -> String {
        format!("{}/{}/{}.git", self.base_url(), org, repo)
    }

    /// Page for opening a pull request from `branch` by hand.
    pub fn compare_url(&self, org: &str, repo: Repo, branch: &str) -> String {
        format!("{}/{}/{}/compare/{}", self.base_url(), org, repo, branch)
    }

    fn base_url(&self) -> &str {
        self.github_url.trim_end_matches('/')
    }
}

/// `0` disables the timeout.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn read_git_config(key: &str) -> Result<Option<String>> {
    let output = std::process::Command::new("git")
        .args(["config", "--get", key])
        .output()
        .context("Failed to execute git command")?;

    // Exit code 1 means the key is not set
    if !output.status.success() {
        return Ok(None);
    }

    let value = String::from_utf8(output.stdout)?.trim().to_string();
    Ok((!value.is_empty()).then_some(value))
}
