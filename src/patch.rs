//! Targeted rewrites of configuration files.
//!
//! Documents are never parsed into an object graph. The patchers locate
//! recognized substrings or lines and rewrite only those, so everything else
//! passes through byte-for-byte.
//!
//! - [`matcher`]: literal lookups used to confirm a target exists
//! - [`krakend`]: host rewrite in the gateway routing config
//! - [`values`]: instance/override insertion in the Kubernetes values override

pub mod krakend;
pub mod matcher;
pub mod values;

use std::fmt::Display;
use std::io::Write as _;
use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::error::PatchError;
use crate::error::PrepError;

/// A single change made (or confirmed) by a patcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "edit", rename_all = "kebab-case")]
pub enum AppliedEdit {
    /// The endpoint declaration guarding a host rewrite was found.
    EndpointConfirmed { endpoint: String },
    HostRewritten { from: String, to: String },
    /// An override line was inserted after input line `line` (1-based).
    OverrideInserted { line: usize },
    /// An instance line was inserted after the section header on input line `line`.
    InstanceInserted { line: usize, instance: String },
    StaleInstanceDropped { line: usize },
}

impl Display for AppliedEdit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndpointConfirmed { endpoint } => {
                write!(f, "Found target endpoint: {}", endpoint)
            }
            Self::HostRewritten { from, to } => write!(f, "Updated host: {} -> {}", from, to),
            Self::OverrideInserted { line } => write!(
                f,
                "Added {} after line {}",
                values::ENDPOINT_OVERRIDE_LINE.trim(),
                line
            ),
            Self::InstanceInserted { line, instance } => write!(
                f,
                "Added instance: {} to krakend section (line {})",
                instance, line
            ),
            Self::StaleInstanceDropped { line } => {
                write!(f, "Dropped stale instance on line {}", line)
            }
        }
    }
}

/// The rewritten document and what changed in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Raw bytes; documents need not be valid UTF-8.
    pub content: Vec<u8>,
    pub edits: Vec<AppliedEdit>,
}

/// Read `path`, run `patch` over its content and persist the result.
///
/// The file is replaced atomically and only when `patch` succeeds, so on any
/// error the original bytes are still on disk.
pub async fn rewrite_file(
    path: &Path,
    patch: impl FnOnce(&[u8]) -> Result<PatchOutcome, PatchError>,
) -> Result<PatchOutcome, PrepError> {
    let original = tokio::fs::read(path)
        .await
        .map_err(|err| PrepError::ReadFailed {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;

    let outcome = patch(&original).map_err(|source| PrepError::Patch {
        path: path.to_path_buf(),
        source,
    })?;

    let target = path.to_path_buf();
    let content = outcome.content.clone();
    tokio::task::spawn_blocking(move || atomic_write(&target, &content))
        .await
        .map_err(std::io::Error::other)
        .and_then(|written| written)
        .map_err(|err| PrepError::WriteFailed {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;
    debug!("Wrote {} ({} edits)", path.display(), outcome.edits.len());

    Ok(outcome)
}

/// Atomic file write: tempfile + fsync + rename, keeping the target's mode.
///
/// The temp file gets a fresh random name and is created exclusively, so
/// nothing already in the directory can redirect the write.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        )
    })?;
    let permissions = std::fs::metadata(path)?.permissions();

    // Dropping the temp file on an early return deletes it
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().set_permissions(permissions)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;

    Ok(())
}
