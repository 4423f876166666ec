//! Command-line interface and orchestration.
//!
//! Two commands:
//! - `run` - clone or pull a model repository, inspect every entity file
//!   under `model/`, and commit+push the annotated files when drift was
//!   detected (unless `--no-commit`)
//! - `file` - inspect a single entity file, write the annotated form to a
//!   separate output path, and show what would change; a debugging aid for
//!   models and resolver configuration
//!
//! Inspection failures for one entity are reported and the run continues
//! with the next entity; only environment-level failures (unusable config,
//! git missing, clone failures) abort the run.

use crate::config::Config;
use crate::git::command_builder::GitCommand;
use crate::git::GitRepo;
use crate::inspect::Inspector;
use crate::resolver::ResolverRegistry;
use crate::utils::redact_url;
use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use walkdir::WalkDir;

/// Drift inspector for Archi models kept in git.
#[derive(Parser)]
#[command(name = "archi-inspector", version, about)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a model repository and commit detected drift
    Run(RunArgs),
    /// Inspect a single entity file (writes the result next to it)
    File(FileArgs),
}

#[derive(Args)]
struct RunArgs {
    /// URL of the git repository holding the model in coArchi format
    repo_url: String,

    /// Local directory to clone into (pulled when it already exists)
    clone_dir: PathBuf,

    /// Inspect and annotate, but do not commit or push
    #[arg(long)]
    no_commit: bool,
}

#[derive(Args)]
struct FileArgs {
    /// Path of the entity file to inspect
    file: PathBuf,

    /// Where to write the annotated form
    #[arg(short, long, default_value = "processed.xml")]
    output: PathBuf,
}

impl Cli {
    /// Executes the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = Config::load_or_default()?;
        match self.command {
            Commands::Run(args) => run(&args, &config).await,
            Commands::File(args) => inspect_single_file(&args, &config).await,
        }
    }
}

async fn run(args: &RunArgs, config: &Config) -> Result<()> {
    info!("Processing coArchi repo: {}", redact_url(&args.repo_url));
    info!("Local clone dir: {}", args.clone_dir.display());

    let repo = prepare_clone(&args.repo_url, &args.clone_dir).await?;

    let registry = ResolverRegistry::with_defaults(config);
    let inspector = Inspector::new(registry);

    let mut changes_detected = false;
    for file in entity_files(&args.clone_dir) {
        match inspector.inspect_file(&file).await {
            Ok(changed) => changes_detected |= changed,
            // Keep going; one malformed entity must not block the rest of
            // the model.
            Err(e) => error!("{}: {e:#}", file.display()),
        }
    }

    if changes_detected && !args.no_commit {
        info!("Preparing git commit...");
        repo.commit_updated(
            "model",
            "Report detected changes",
            &config.commit_author,
            &config.commit_email,
        )
        .await?;
        info!("Pushing to the origin...");
        repo.push().await?;
    }

    info!("Done");
    Ok(())
}

async fn prepare_clone(repo_url: &str, clone_dir: &Path) -> Result<GitRepo> {
    if clone_dir.exists() {
        if !clone_dir.is_dir() || !GitRepo::is_repo(clone_dir) {
            bail!(
                "Can not use {} as local clone dir: not a git repository",
                clone_dir.display()
            );
        }
        info!("Local clone dir exists. Pulling...");
        let repo = GitRepo::new(clone_dir);
        repo.pull().await?;
        info!("... Pulled");
        Ok(repo)
    } else {
        info!("Local clone dir does not exist. Cloning...");
        let repo = GitRepo::clone(repo_url, &redact_url(repo_url), clone_dir).await?;
        info!("... Cloned");
        Ok(repo)
    }
}

/// Entity files under `<clone_dir>/model`, in deterministic order.
fn entity_files(clone_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(clone_dir.join("model"))
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "xml"))
        .collect()
}

async fn inspect_single_file(args: &FileArgs, config: &Config) -> Result<()> {
    let registry = ResolverRegistry::with_defaults(config);
    let inspector = Inspector::new(registry);

    let changed = inspector.inspect_file_to(&args.file, &args.output).await?;
    println!("Changes detected: {changed}");
    if changed {
        let diff = GitCommand::new()
            .args([
                "diff",
                "--no-index",
                "--no-color",
                args.file.display().to_string().as_str(),
                args.output.display().to_string().as_str(),
            ])
            .execute_lenient()
            .await?;
        println!("{}", String::from_utf8_lossy(&diff.stdout));
    }
    Ok(())
}
