use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

pub const AUTHOR_NAME: &str = "Test User";
pub const AUTHOR_EMAIL: &str = "test@example.com";

async fn git(dir: &Path, args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    anyhow::ensure!(status.success(), "git {} failed", args.join(" "));
    Ok(())
}

/// Creates a git repository in the given directory.
///
/// This initializes the repo and sets basic git config needed for commits.
/// The directory should already exist.
pub async fn create_git_repo(dir: &Path) -> anyhow::Result<()> {
    git(dir, &["init", "--initial-branch=main"]).await?;
    git(dir, &["config", "user.name", AUTHOR_NAME]).await?;
    git(dir, &["config", "user.email", AUTHOR_EMAIL]).await?;
    Ok(())
}

/// Writes a file and commits it.
pub async fn commit_file(
    dir: &Path,
    message: &str,
    filename: &str,
    contents: &str,
) -> anyhow::Result<()> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&file_path, contents).await?;

    git(dir, &["add", filename]).await?;
    git(dir, &["commit", "-m", message]).await?;
    Ok(())
}

/// Publishes a single-file repository as a bare repo at `bare`.
pub async fn create_remote(
    bare: &Path,
    filename: &str,
    contents: &str,
) -> anyhow::Result<()> {
    let seed = tempfile::tempdir()?;
    create_git_repo(seed.path()).await?;
    commit_file(seed.path(), "Initial commit", filename, contents).await?;

    if let Some(parent) = bare.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bare = bare.to_str().ok_or_else(|| anyhow::anyhow!("non-utf8 path"))?;
    git(seed.path(), &["clone", "--bare", ".", bare]).await?;
    Ok(())
}

/// Clones `source` into `dest`.
pub async fn clone(source: &Path, dest: &Path) -> anyhow::Result<()> {
    let status = Command::new("git")
        .arg("clone")
        .arg(source)
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    anyhow::ensure!(status.success(), "git clone failed");
    Ok(())
}

/// Reads `path` as it is stored on `branch` of a bare repository.
pub async fn show_file(bare: &Path, branch: &str, path: &str) -> anyhow::Result<String> {
    let output = Command::new("git")
        .arg("--git-dir")
        .arg(bare)
        .args(["show", &format!("{}:{}", branch, path)])
        .output()
        .await?;
    anyhow::ensure!(output.status.success(), "git show {}:{} failed", branch, path);

    Ok(String::from_utf8(output.stdout)?)
}

/// Subject lines on `branch` of a bare repository, newest first.
pub async fn log_subjects(bare: &Path, branch: &str) -> anyhow::Result<String> {
    let output = Command::new("git")
        .arg("--git-dir")
        .arg(bare)
        .args(["log", "--format=%s", branch])
        .output()
        .await?;
    anyhow::ensure!(output.status.success(), "git log failed");

    Ok(String::from_utf8(output.stdout)?)
}

pub fn setup_logging() -> anyhow::Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_test_writer()
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).try_init()?;
    Ok(())
}

pub enum TestDir {
    Temp(tempfile::TempDir),
    Kept(std::path::PathBuf),
}

impl TestDir {
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;

        if std::env::var("DEBUG_TESTS").is_ok() {
            let path = temp_dir.keep();
            eprintln!("Test directory kept at: {}", path.display());
            Ok(TestDir::Kept(path))
        } else {
            Ok(TestDir::Temp(temp_dir))
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            TestDir::Temp(t) => t.path(),
            TestDir::Kept(p) => p.as_path(),
        }
    }
}
