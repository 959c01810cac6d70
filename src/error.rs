use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a document could not be patched.
///
/// The document is left untouched whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("endpoint {endpoint} not found")]
    EndpointNotFound { endpoint: String },

    #[error("host {host} not found")]
    HostNotFound { host: String },

    #[error("replacing host {host} left the document unchanged")]
    ReplaceNoop { host: String },

    #[error("no krakend section found")]
    KrakendSectionNotFound,
}

impl PatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EndpointNotFound { .. } => "endpoint-not-found",
            Self::HostNotFound { .. } => "host-not-found",
            Self::ReplaceNoop { .. } => "replace-noop",
            Self::KrakendSectionNotFound => "krakend-section-not-found",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EndpointNotFound { .. } => 20,
            Self::HostNotFound { .. } => 21,
            Self::ReplaceNoop { .. } => 22,
            Self::KrakendSectionNotFound => 23,
        }
    }
}

/// A failed step of a preview environment run.
///
/// `detail` fields hold the rendered underlying error (git output, I/O error).
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("failed to create workspace {}: {detail}", .path.display())]
    WorkspaceCreateFailed { path: PathBuf, detail: String },

    #[error("failed to clone {url}: {detail}")]
    CloneFailed { url: String, detail: String },

    #[error("failed to read {}: {detail}", .path.display())]
    ReadFailed { path: PathBuf, detail: String },

    #[error("{}: {source}", .path.display())]
    Patch {
        path: PathBuf,
        #[source]
        source: PatchError,
    },

    #[error("failed to write {}: {detail}", .path.display())]
    WriteFailed { path: PathBuf, detail: String },

    #[error("failed to create branch {branch}: {detail}")]
    BranchCreateFailed { branch: String, detail: String },

    #[error("failed to stage changes in {}: {detail}", .repo.display())]
    StageFailed { repo: PathBuf, detail: String },

    #[error("failed to commit on {branch}: {detail}")]
    CommitFailed { branch: String, detail: String },

    #[error("failed to push {branch}: {detail}")]
    PushFailed { branch: String, detail: String },

    #[error("{command} timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("failed to clean up workspace {}: {detail}", .path.display())]
    CleanupFailed { path: PathBuf, detail: String },
}

impl PrepError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkspaceCreateFailed { .. } => "workspace-create-failed",
            Self::CloneFailed { .. } => "clone-failed",
            Self::ReadFailed { .. } => "read-failed",
            Self::Patch { source, .. } => source.kind(),
            Self::WriteFailed { .. } => "write-failed",
            Self::BranchCreateFailed { .. } => "branch-create-failed",
            Self::StageFailed { .. } => "stage-failed",
            Self::CommitFailed { .. } => "commit-failed",
            Self::PushFailed { .. } => "push-failed",
            Self::Timeout { .. } => "timeout",
            Self::CleanupFailed { .. } => "cleanup-failed",
        }
    }

    /// Process exit code for this failure category.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::WorkspaceCreateFailed { .. } => 10,
            Self::CloneFailed { .. } => 11,
            Self::ReadFailed { .. } => 12,
            Self::WriteFailed { .. } => 13,
            Self::CleanupFailed { .. } => 14,
            Self::Patch { source, .. } => source.exit_code(),
            Self::BranchCreateFailed { .. } => 30,
            Self::StageFailed { .. } => 31,
            Self::CommitFailed { .. } => 32,
            Self::PushFailed { .. } => 33,
            Self::Timeout { .. } => 40,
        }
    }
}
