use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use prep_waldo::App;
use prep_waldo::Config;
use prep_waldo::commands::prepare::write_usage;
use prep_waldo::config::timeout_from_secs;
use prep_waldo::ops::git::RealGit;
use prep_waldo::target::EditTarget;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "prep-waldo")]
#[command(about = "Prepare a preview environment: patch krakend and gw-ingress configs and push PR branches", long_about = None)]
pub struct Cli {
    /// Pull request number (e.g. 654)
    pub pr_number: Option<String>,
    /// Service whose krakend host is redirected (e.g. home-depot)
    pub service_name: Option<String>,
    /// Endpoint path without the /app prefix (e.g. /v1/fair-lock)
    pub endpoint_url: Option<String>,
    /// GitHub organization owning the krakend and gw-ingress repos
    pub repo_org: Option<String>,
    /// Anything after the org is ignored
    #[arg(hide = true)]
    pub extra: Vec<String>,

    /// Directory to create the workspace in
    #[arg(long)]
    pub workspace_root: Option<PathBuf>,
    /// Base URL to clone from (defaults to https://github.com)
    #[arg(long)]
    pub github_url: Option<String>,
    /// Timeout in seconds for each git invocation (0 disables)
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Leave the workspace on disk after the run
    #[arg(long)]
    pub keep_workspace: bool,
    /// Print a JSON summary of the run
    #[arg(long)]
    pub json: bool,
}

fn setup_logging() -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env()?;
    tracing_subscriber::fmt()
        .with_timer(timer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();

    let (Some(pr_number), Some(service_name), Some(endpoint_url), Some(repo_org)) = (
        cli.pr_number.as_deref(),
        cli.service_name.as_deref(),
        cli.endpoint_url.as_deref(),
        cli.repo_org.as_deref(),
    ) else {
        write_usage(&mut stdout)?;
        return Ok(());
    };

    setup_logging()?;

    let mut config = Config::load()?;
    if let Some(root) = cli.workspace_root {
        config.workspace_root = root;
    }
    if let Some(url) = cli.github_url {
        config.github_url = url;
    }
    if let Some(secs) = cli.timeout {
        config.command_timeout = timeout_from_secs(secs);
    }
    config.keep_workspace |= cli.keep_workspace;

    let target = EditTarget::new(pr_number, service_name, endpoint_url, repo_org);
    let app = App::new(config.clone(), RealGit::new(config.command_timeout));
    let report = app.cmd_prepare(&target, &mut stdout).await?;

    if cli.json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&report)?)?;
    }

    let code = report.exit_code();
    if code != 0 {
        stdout.flush()?;
        std::process::exit(code);
    }

    Ok(())
}
