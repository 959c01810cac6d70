use serde::Serialize;

use crate::error::PrepError;
use crate::target::EditTarget;
use crate::target::Repo;

/// A step of a preview environment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum Step {
    Workspace,
    Clone { repo: Repo },
    Patch { repo: Repo },
    Publish { repo: Repo },
    Cleanup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StepStatus {
    Succeeded {
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        kind: &'static str,
        exit_code: i32,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    #[serde(flatten)]
    pub step: Step,
    #[serde(flatten)]
    pub status: StepStatus,
}

/// Result of a branch/stage/commit/push sequence.
///
/// `committed == false` means there was nothing to commit, which is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchOutcome {
    pub branch_name: String,
    pub committed: bool,
    pub pushed: bool,
}

impl BranchOutcome {
    pub fn new(branch_name: &str) -> Self {
        Self {
            branch_name: branch_name.to_string(),
            committed: false,
            pushed: false,
        }
    }
}

/// Machine-readable summary of a run, in step order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: EditTarget,
    pub steps: Vec<StepRecord>,
    pub branches: Vec<BranchOutcome>,
}

impl RunReport {
    pub fn new(target: &EditTarget) -> Self {
        Self {
            target: target.clone(),
            steps: Vec::new(),
            branches: Vec::new(),
        }
    }

    pub fn succeeded(&mut self, step: Step, detail: Option<String>) {
        self.push(step, StepStatus::Succeeded { detail });
    }

    pub fn skipped(&mut self, step: Step, reason: &str) {
        self.push(
            step,
            StepStatus::Skipped {
                reason: reason.to_string(),
            },
        );
    }

    pub fn failed(&mut self, step: Step, err: &PrepError) {
        self.push(
            step,
            StepStatus::Failed {
                kind: err.kind(),
                exit_code: err.exit_code(),
                message: err.to_string(),
            },
        );
    }

    pub fn branch(&mut self, repo: Repo, outcome: BranchOutcome) {
        let detail = if outcome.committed {
            format!("pushed {}", outcome.branch_name)
        } else {
            format!("nothing to commit on {}", outcome.branch_name)
        };
        self.succeeded(Step::Publish { repo }, Some(detail));
        self.branches.push(outcome);
    }

    /// Keep a branch whose publish step already failed.
    pub fn unpushed(&mut self, outcome: BranchOutcome) {
        self.branches.push(outcome);
    }

    fn push(&mut self, step: Step, status: StepStatus) {
        self.steps.push(StepRecord { step, status });
    }

    pub fn status_of(&self, step: Step) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|record| record.step == step)
            .map(|record| &record.status)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|record| matches!(record.status, StepStatus::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Exit code of the first failed step, or 0.
    pub fn exit_code(&self) -> i32 {
        self.failures()
            .find_map(|record| match record.status {
                StepStatus::Failed { exit_code, .. } => Some(exit_code),
                _ => None,
            })
            .unwrap_or(0)
    }
}
