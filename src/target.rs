use std::fmt::Display;
use std::path::Path;

use serde::Serialize;

/// Segment the gateway mounts every service endpoint under.
pub const ENDPOINT_PREFIX: &str = "/app";

/// A repository taking part in a preview environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Repo {
    Krakend,
    GwIngress,
}

impl Repo {
    pub const ALL: [Repo; 2] = [Repo::Krakend, Repo::GwIngress];

    pub fn name(self) -> &'static str {
        match self {
            Self::Krakend => "krakend",
            Self::GwIngress => "gw-ingress",
        }
    }

    /// The file patched in this repository, relative to its root.
    pub fn config_file(self) -> &'static Path {
        match self {
            Self::Krakend => Path::new("config.json"),
            Self::GwIngress => Path::new("kube/values-staging-override.yaml"),
        }
    }
}

impl Display for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a single run must change. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditTarget {
    pub pr_number: String,
    pub service_name: String,
    /// Endpoint path including [`ENDPOINT_PREFIX`].
    pub endpoint_path: String,
    pub repo_org: String,
}

impl EditTarget {
    /// Build a target from CLI input; `endpoint_url` gets the `/app` prefix.
    pub fn new(pr_number: &str, service_name: &str, endpoint_url: &str, repo_org: &str) -> Self {
        Self {
            pr_number: pr_number.to_string(),
            service_name: service_name.to_string(),
            endpoint_path: format!("{}{}", ENDPOINT_PREFIX, endpoint_url),
            repo_org: repo_org.to_string(),
        }
    }

    pub fn branch_for(&self, repo: Repo) -> String {
        match repo {
            Repo::Krakend => format!("update-{}-pr-{}", self.service_name, self.pr_number),
            Repo::GwIngress => format!("update-instance-pr-{}", self.pr_number),
        }
    }

    pub fn commit_message_for(&self, repo: Repo) -> String {
        match repo {
            Repo::Krakend => format!(
                "Update {} host for PR-{}",
                self.service_name, self.pr_number
            ),
            Repo::GwIngress => format!("Add krakend instance {}", self.pr_number),
        }
    }

    /// Suggested title for the pull request a human opens from the branch.
    pub fn pr_title_for(&self, repo: Repo) -> String {
        match repo {
            Repo::Krakend => format!(
                "Update {} endpoint for PR-{}",
                self.service_name, self.pr_number
            ),
            Repo::GwIngress => format!("Update krakend instance for PR-{}", self.pr_number),
        }
    }
}
