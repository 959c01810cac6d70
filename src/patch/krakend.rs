//! Host rewrite for the gateway routing config (`krakend/config.json`).

use log::warn;

use super::AppliedEdit;
use super::PatchOutcome;
use super::matcher;
use crate::error::PatchError;

/// Field naming a route path in the routing config.
pub const ENDPOINT_FIELD: &str = "endpoint";

/// Quoted host literal as it appears in a backend `host` list.
pub fn host_literal(service_name: &str) -> String {
    format!(r#""http://{}""#, service_name)
}

/// Quoted host literal for the PR-specific instance of a service.
pub fn preview_host_literal(service_name: &str, pr_identifier: &str) -> String {
    format!(r#""http://{}-{}""#, service_name, pr_identifier)
}

/// Point the first `"http://<service>"` host at `"http://<service>-<pr>"`.
///
/// The endpoint declaration `"endpoint": "<endpoint_path>"` must exist before
/// any rewrite is attempted. Only the first occurrence of the host literal is
/// replaced, even when other backends share it.
pub fn patch_host(
    document: &[u8],
    service_name: &str,
    pr_identifier: &str,
    endpoint_path: &str,
) -> Result<PatchOutcome, PatchError> {
    if !matcher::exists_structured(document, ENDPOINT_FIELD, endpoint_path) {
        return Err(PatchError::EndpointNotFound {
            endpoint: endpoint_path.to_string(),
        });
    }

    let old_host = host_literal(service_name);
    let new_host = preview_host_literal(service_name, pr_identifier);

    if !matcher::exists(document, &old_host) {
        return Err(PatchError::HostNotFound { host: old_host });
    }

    let occurrences = matcher::count(document, &old_host);
    if occurrences > 1 {
        warn!(
            "Host {} occurs {} times; only the first occurrence is rewritten",
            old_host, occurrences
        );
    }

    let content = matcher::replace_first(document, &old_host, &new_host);
    if content.as_slice() == document {
        return Err(PatchError::ReplaceNoop { host: old_host });
    }

    Ok(PatchOutcome {
        content,
        edits: vec![
            AppliedEdit::EndpointConfirmed {
                endpoint: endpoint_path.to_string(),
            },
            AppliedEdit::HostRewritten {
                from: old_host,
                to: new_host,
            },
        ],
    })
}
