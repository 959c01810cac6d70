use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use log::debug;

use crate::App;
use crate::error::PrepError;
use crate::ops::git::GitOps;
use crate::patch::krakend;
use crate::patch::rewrite_file;
use crate::patch::values;
use crate::report::RunReport;
use crate::report::Step;
use crate::target::EditTarget;
use crate::target::Repo;
use crate::workspace::Workspace;

const NOT_CLONED: &str = "repository was not cloned";

pub fn write_usage(stdout: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        stdout,
        "Usage: prep-waldo <pr-number> <service-name> <endpoint-url> <repo-org>"
    )?;
    writeln!(
        stdout,
        "Example: prep-waldo 654 home-depot /v1/fair-lock mycompany"
    )?;
    writeln!(
        stdout,
        "  Note: endpoint-url will be prefixed with '/app' automatically"
    )?;
    writeln!(
        stdout,
        "  Requires: git access to <repo-org>/krakend and <repo-org>/gw-ingress repos"
    )?;
    Ok(())
}

impl<G: GitOps> App<G> {
    /// Set up a preview environment for a pull request.
    ///
    /// 1. Create the workspace and clone both repositories into it.
    /// 2. Patch the krakend routing config, then the gw-ingress values file.
    /// 3. Branch, commit and push each repository.
    /// 4. Remove the workspace.
    ///
    /// A failed step is reported and the run moves on; only steps that need a
    /// missing clone are skipped. Only a missing workspace ends the run early.
    pub async fn cmd_prepare(
        &self,
        target: &EditTarget,
        stdout: &mut impl Write,
    ) -> Result<RunReport> {
        let mut report = RunReport::new(target);

        writeln!(stdout, "Automating PR env setup for:")?;
        writeln!(stdout, "  PR: {}", target.pr_number)?;
        writeln!(stdout, "  Service: {}", target.service_name)?;
        writeln!(stdout, "  Endpoint: {}", target.endpoint_path)?;
        writeln!(stdout, "  Org: {}", target.repo_org)?;

        // -------------------------------------------------------------------------
        // Workspace

        writeln!(
            stdout,
            "Setting up workspace: {}",
            self.config
                .workspace_root
                .join(Workspace::dir_name(&target.pr_number))
                .display()
        )?;
        let workspace = match Workspace::create(&self.config.workspace_root, &target.pr_number)
            .await
        {
            Ok(workspace) => {
                report.succeeded(Step::Workspace, None);
                workspace
            }
            Err(err) => {
                fail(stdout, &mut report, Step::Workspace, "Failed to setup workspace", &err)?;
                return Ok(report);
            }
        };

        let mut cloned = Vec::new();
        for repo in Repo::ALL {
            let url = self.config.clone_url(&target.repo_org, repo);
            writeln!(stdout, "Cloning {} repo: {}", repo, url)?;
            match self.clone_repo(&url, &workspace.repo_dir(repo)).await {
                Ok(()) => {
                    report.succeeded(Step::Clone { repo }, None);
                    cloned.push(repo);
                }
                Err(err) => fail(
                    stdout,
                    &mut report,
                    Step::Clone { repo },
                    &format!("Failed to clone {} repo", repo),
                    &err,
                )?,
            }
        }
        if cloned.len() == Repo::ALL.len() {
            writeln!(stdout, "{} Workspace setup complete", "✓".green())?;
        }

        // -------------------------------------------------------------------------
        // Patch

        for repo in Repo::ALL {
            let step = Step::Patch { repo };
            if !cloned.contains(&repo) {
                skip(stdout, &mut report, step, &format!("{} config", repo))?;
                continue;
            }

            let path = workspace.repo_dir(repo).join(repo.config_file());
            let result = match repo {
                Repo::Krakend => {
                    writeln!(
                        stdout,
                        "Updating krakend config for {}-{}",
                        target.service_name, target.pr_number
                    )?;
                    rewrite_file(&path, |doc| {
                        krakend::patch_host(
                            doc,
                            &target.service_name,
                            &target.pr_number,
                            &target.endpoint_path,
                        )
                    })
                    .await
                }
                Repo::GwIngress => {
                    writeln!(
                        stdout,
                        "Updating gw-ingress values with instance: {}",
                        target.pr_number
                    )?;
                    rewrite_file(&path, |doc| values::patch_instance(doc, &target.pr_number)).await
                }
            };

            match result {
                Ok(outcome) => {
                    for edit in &outcome.edits {
                        writeln!(stdout, "  {}", edit)?;
                    }
                    writeln!(
                        stdout,
                        "{} Successfully updated {}",
                        "✓".green(),
                        path.display()
                    )?;
                    report.succeeded(
                        step,
                        Some(format!(
                            "{} edits to {}",
                            outcome.edits.len(),
                            repo.config_file().display()
                        )),
                    );
                }
                Err(err) => fail(
                    stdout,
                    &mut report,
                    step,
                    &format!("Error updating {} config", repo),
                    &err,
                )?,
            }
        }

        // -------------------------------------------------------------------------
        // Publish

        for repo in Repo::ALL {
            let step = Step::Publish { repo };
            if !cloned.contains(&repo) {
                skip(stdout, &mut report, step, &format!("{} branch", repo))?;
                continue;
            }

            let branch = target.branch_for(repo);
            writeln!(stdout, "Creating {} branch and pushing changes...", repo)?;
            let result = self
                .create_branch_commit_push(
                    &workspace.repo_dir(repo),
                    &branch,
                    &target.commit_message_for(repo),
                )
                .await;

            match result {
                Ok(outcome) if outcome.pushed => {
                    writeln!(
                        stdout,
                        "{} Branch created and pushed: {}",
                        "✓".green(),
                        branch
                    )?;
                    writeln!(
                        stdout,
                        "   Create PR manually at: {}",
                        self.config.compare_url(&target.repo_org, repo, &branch)
                    )?;
                    writeln!(stdout, "   Title: {}", target.pr_title_for(repo))?;
                    writeln!(stdout, "   Add 'Preview' label after creating the PR")?;
                    report.branch(repo, outcome);
                }
                Ok(outcome) => {
                    writeln!(
                        stdout,
                        "{} No changes to commit on {}, nothing pushed",
                        "↷".yellow(),
                        branch
                    )?;
                    report.branch(repo, outcome);
                }
                Err(failure) => {
                    fail(
                        stdout,
                        &mut report,
                        step,
                        &format!("Error creating {} branch", repo),
                        &failure.error,
                    )?;
                    if let Some(outcome) = failure.outcome {
                        writeln!(
                            stdout,
                            "   Committed locally on {} but not pushed",
                            outcome.branch_name
                        )?;
                        report.unpushed(outcome);
                    }
                }
            }
        }

        // -------------------------------------------------------------------------
        // Cleanup

        if self.config.keep_workspace {
            let path = workspace.keep();
            writeln!(stdout, "Keeping workspace: {}", path.display())?;
            report.skipped(Step::Cleanup, "workspace kept");
        } else {
            writeln!(
                stdout,
                "Cleaning up workspace: {}",
                workspace.path().display()
            )?;
            match workspace.remove().await {
                Ok(()) => report.succeeded(Step::Cleanup, None),
                Err(err) => fail(stdout, &mut report, Step::Cleanup, "Warning", &err)?,
            }
        }

        Ok(report)
    }
}

fn fail(
    stdout: &mut impl Write,
    report: &mut RunReport,
    step: Step,
    context: &str,
    err: &PrepError,
) -> Result<()> {
    debug!("{:?} failed: {:?}", step, err);
    writeln!(stdout, "{} {}: {}", "✗".red(), context, err)?;
    report.failed(step, err);
    Ok(())
}

fn skip(stdout: &mut impl Write, report: &mut RunReport, step: Step, what: &str) -> Result<()> {
    writeln!(stdout, "{} Skipping {}: {}", "↷".yellow(), what, NOT_CLONED)?;
    report.skipped(step, NOT_CLONED);
    Ok(())
}
