use std::path::Path;

use log::info;
use thiserror::Error;

use crate::config::Config;
use crate::error::PrepError;
use crate::ops::git::CommandTimeout;
use crate::ops::git::CommitOutcome;
use crate::ops::git::GitOps;
use crate::report::BranchOutcome;

pub struct App<G: GitOps> {
    pub config: Config,
    pub git: G,
}

impl<G: GitOps> App<G> {
    pub fn new(config: Config, git: G) -> Self {
        Self { config, git }
    }
}

/// A failed branch/stage/commit/push sequence.
///
/// `outcome` is set once a commit exists locally, so a failed push still
/// reports `committed == true, pushed == false`.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PublishFailure {
    pub error: PrepError,
    pub outcome: Option<BranchOutcome>,
}

impl From<PrepError> for PublishFailure {
    fn from(error: PrepError) -> Self {
        Self {
            error,
            outcome: None,
        }
    }
}

/// Convert a failed git invocation into a step error, keeping timeouts distinct.
fn git_failure(err: anyhow::Error, into: impl FnOnce(String) -> PrepError) -> PrepError {
    match err.downcast_ref::<CommandTimeout>() {
        Some(timeout) => PrepError::Timeout {
            command: timeout.command.clone(),
            after: timeout.after,
        },
        None => into(format!("{:#}", err)),
    }
}

/// Shared helper methods for App
impl<G: GitOps> App<G> {
    pub(crate) async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), PrepError> {
        self.git
            .clone_repo(url, dest)
            .await
            .map_err(|err| {
                git_failure(err, |detail| PrepError::CloneFailed {
                    url: url.to_string(),
                    detail,
                })
            })
    }

    /// Create `branch` in `repo_dir`, stage everything, commit and push.
    ///
    /// A clean working tree yields `committed == false` and nothing is pushed.
    /// A failed push leaves the local branch and commit in place.
    pub async fn create_branch_commit_push(
        &self,
        repo_dir: &Path,
        branch: &str,
        message: &str,
    ) -> Result<BranchOutcome, PublishFailure> {
        info!("Creating branch: {}", branch);
        self.git
            .create_branch(repo_dir, branch)
            .await
            .map_err(|err| {
                git_failure(err, |detail| PrepError::BranchCreateFailed {
                    branch: branch.to_string(),
                    detail,
                })
            })?;

        info!("Adding changes...");
        self.git.stage_all(repo_dir).await.map_err(|err| {
            git_failure(err, |detail| PrepError::StageFailed {
                repo: repo_dir.to_path_buf(),
                detail,
            })
        })?;

        info!("Committing changes...");
        let commit = self.git.commit(repo_dir, message).await.map_err(|err| {
            git_failure(err, |detail| PrepError::CommitFailed {
                branch: branch.to_string(),
                detail,
            })
        })?;

        let mut outcome = BranchOutcome::new(branch);
        if commit == CommitOutcome::NothingToCommit {
            info!("No changes to commit - files may already be up to date");
            return Ok(outcome);
        }
        outcome.committed = true;

        info!("Pushing branch...");
        if let Err(err) = self
            .git
            .push_branch(repo_dir, &self.config.remote, branch)
            .await
        {
            return Err(PublishFailure {
                error: git_failure(err, |detail| PrepError::PushFailed {
                    branch: branch.to_string(),
                    detail,
                }),
                outcome: Some(outcome),
            });
        }
        outcome.pushed = true;

        Ok(outcome)
    }
}
