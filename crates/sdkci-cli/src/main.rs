//! sdkci - SDK build orchestration for CI
//!
//! Usage:
//!   sdkci init       Write a default .sdkci/config.toml
//!   sdkci build      Submit a build and wait for its outcomes
//!   sdkci preview    Build a pull request preview against its merge base
//!   sdkci merge      Build main with a merged preview branch

mod ci;

use anyhow::{Context, Result};
use ci::{clear_summary, end_group, post_summary, start_group, write_outputs, CommentArgs, SummaryKind};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sdkci_api::HttpBuildService;
use sdkci_core::{Revision, SdkciConfig};
use sdkci_git::{GitCommand, GitRepo};
use sdkci_github::StepOutputs;
use sdkci_orchestrator::{check_results, run_builds, FailOn, PollConfig, RunRequest, RunResult, RunSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "sdkci")]
#[command(author, version, about = "SDK build orchestration for CI")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Repository root holding .sdkci/config.toml
    #[arg(long, global = true, default_value = ".")]
    repo_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that talks to the build service
#[derive(Args, Debug, Clone)]
struct ServiceArgs {
    /// Build service project
    #[arg(long, env = "SDKCI_PROJECT")]
    project: String,

    /// API key (defaults to the variable named by api.api_key_env)
    #[arg(long)]
    api_key: Option<String>,

    /// Override the build service URL
    #[arg(long, env = "SDKCI_API_URL")]
    api_url: Option<String>,

    /// Override the polling deadline in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    max_polling_seconds: Option<u64>,

    /// Override the sleep between polling passes in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_seconds: Option<u64>,

    /// Directory for the documented spec
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// When the run should fail
    #[arg(long, value_enum, default_value = "error")]
    fail_on: CliFailOn,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Submit a build and wait for its outcomes
    Build {
        #[command(flatten)]
        service: ServiceArgs,

        /// Candidate parent branch (repeatable, in order of preference)
        #[arg(long = "parent-branch")]
        parent_branches: Vec<String>,

        /// Candidate parent file hash as file=hash (repeatable; tried first)
        #[arg(long = "parent-hash", value_parser = parse_file_hash)]
        parent_hashes: Vec<(String, String)>,

        /// Service branch to build on
        #[arg(long)]
        branch: Option<String>,

        /// Build branch..merge_branch instead of local files
        #[arg(long)]
        merge_branch: Option<String>,

        /// Branch for a comparison build of the primary parent
        #[arg(long)]
        base_branch: Option<String>,

        /// OpenAPI spec file
        #[arg(long)]
        spec_path: Option<PathBuf>,

        /// Config file
        #[arg(long)]
        config_path: Option<PathBuf>,

        /// Guess a config from the spec if the branch is reset
        #[arg(long)]
        guess_config: bool,

        /// Conventional commit message for generated SDK commits
        #[arg(long)]
        commit_message: Option<String>,
    },

    /// Build a pull request preview against its merge base
    Preview {
        #[command(flatten)]
        service: ServiceArgs,

        #[command(flatten)]
        comment: CommentArgs,

        /// OpenAPI spec file
        #[arg(long)]
        spec_path: PathBuf,

        /// Config file
        #[arg(long)]
        config_path: Option<PathBuf>,

        /// Base commit of the pull request
        #[arg(long)]
        base_sha: String,

        /// Head commit of the pull request
        #[arg(long)]
        head_sha: String,

        /// Base branch of the pull request
        #[arg(long, env = "GITHUB_BASE_REF")]
        base_ref: String,

        /// Head branch of the pull request
        #[arg(long, env = "GITHUB_HEAD_REF")]
        head_ref: String,

        /// Repository default branch (defaults to preview.main_branch)
        #[arg(long)]
        default_branch: Option<String>,

        /// Preview branch (defaults to the prefixed head ref)
        #[arg(long)]
        branch: Option<String>,

        /// Branch for the base comparison build (defaults to the prefixed base/head ref)
        #[arg(long)]
        base_branch: Option<String>,

        /// Conventional commit message for generated SDK commits
        #[arg(long)]
        commit_message: Option<String>,
    },

    /// Build main with a merged preview branch
    Merge {
        #[command(flatten)]
        service: ServiceArgs,

        #[command(flatten)]
        comment: CommentArgs,

        /// OpenAPI spec file, used to detect changes
        #[arg(long)]
        spec_path: PathBuf,

        /// Config file, used to detect changes
        #[arg(long)]
        config_path: Option<PathBuf>,

        /// Head branch of the merged pull request
        #[arg(long)]
        head_ref: String,

        /// Commit message, usually the pull request title
        #[arg(long)]
        commit_message: Option<String>,
    },
}

/// CLI-friendly failure threshold
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFailOn {
    Never,
    Error,
    Warning,
    Note,
}

impl From<CliFailOn> for FailOn {
    fn from(f: CliFailOn) -> Self {
        match f {
            CliFailOn::Never => FailOn::Never,
            CliFailOn::Error => FailOn::Error,
            CliFailOn::Warning => FailOn::Warning,
            CliFailOn::Note => FailOn::Note,
        }
    }
}

fn parse_file_hash(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((file, hash)) if !file.is_empty() && !hash.is_empty() => {
            Ok((file.to_string(), hash.to_string()))
        }
        _ => Err(format!("expected file=hash, got {}", s)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Init = cli.command {
        return cmd_init(&cli.repo_root);
    }

    let config = SdkciConfig::load_or_default(&cli.repo_root)
        .with_context(|| format!("Failed to load config from {}", cli.repo_root.display()))?;

    let passed = match cli.command {
        Commands::Init => true,
        Commands::Build {
            service,
            parent_branches,
            parent_hashes,
            branch,
            merge_branch,
            base_branch,
            spec_path,
            config_path,
            guess_config,
            commit_message,
        } => {
            let mut parent_revisions = Vec::new();
            if !parent_hashes.is_empty() {
                parent_revisions.push(Revision::hashes(parent_hashes));
            }
            parent_revisions.extend(parent_branches.into_iter().map(Revision::Branch));

            let request = RunRequest {
                project: service.project.clone(),
                parent_revisions,
                branch,
                merge_branch,
                base_branch,
                spec_path,
                config_path,
                guess_config,
                commit_message,
            };
            cmd_build(&config, &service, request).await?
        }
        Commands::Preview {
            service,
            comment,
            spec_path,
            config_path,
            base_sha,
            head_sha,
            base_ref,
            head_ref,
            default_branch,
            branch,
            base_branch,
            commit_message,
        } => {
            let preview = PreviewArgs {
                spec_path,
                config_path,
                base_sha,
                head_sha,
                base_ref,
                head_ref,
                default_branch,
                branch,
                base_branch,
                commit_message,
            };
            cmd_preview(&cli.repo_root, &config, &service, &comment, preview).await?
        }
        Commands::Merge {
            service,
            comment,
            spec_path,
            config_path,
            head_ref,
            commit_message,
        } => {
            cmd_merge(
                &cli.repo_root,
                &config,
                &service,
                &comment,
                spec_path,
                config_path,
                head_ref,
                commit_message,
            )
            .await?
        }
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_init(repo_root: &Path) -> Result<()> {
    SdkciConfig::write_default(repo_root)
        .with_context(|| format!("Failed to write config in {}", repo_root.display()))?;
    println!("Created .sdkci/config.toml in {}", repo_root.display());
    Ok(())
}

fn connect(config: &SdkciConfig, args: &ServiceArgs) -> Result<HttpBuildService> {
    let api_key = match &args.api_key {
        Some(key) => key.clone(),
        None => std::env::var(&config.api.api_key_env).with_context(|| {
            format!(
                "No API key: pass --api-key or set {}",
                config.api.api_key_env
            )
        })?,
    };
    let base_url = args
        .api_url
        .clone()
        .unwrap_or_else(|| config.api.base_url.clone());

    Ok(HttpBuildService::new(
        base_url,
        api_key,
        config.api.request_timeout(),
    )?)
}

fn run_settings(config: &SdkciConfig, args: &ServiceArgs) -> RunSettings {
    let mut poll = PollConfig::from(&config.polling);
    if let Some(seconds) = args.max_polling_seconds {
        poll.max_polling = Duration::from_secs(seconds);
    }
    if let Some(seconds) = args.poll_interval_seconds {
        poll.interval = Duration::from_secs(seconds);
    }
    RunSettings {
        poll,
        files: config.files.clone(),
        output_dir: args.output_dir.clone().unwrap_or_else(std::env::temp_dir),
    }
}

/// Write outputs, then report whether the run passes `fail_on`
fn finish(result: &RunResult, fail_on: FailOn) -> Result<bool> {
    write_outputs(&StepOutputs::from_env(), result)?;
    if result.is_skipped() {
        info!("No new build was created; nothing to evaluate");
    }
    Ok(check_results(&result.outcomes, fail_on))
}

async fn cmd_build(config: &SdkciConfig, args: &ServiceArgs, request: RunRequest) -> Result<bool> {
    request.validate()?;
    let service = connect(config, args)?;

    start_group("Running builds");
    let result = run_builds(&service, &request, &run_settings(config, args)).await?;
    end_group();

    finish(&result, args.fail_on.into())
}

struct PreviewArgs {
    spec_path: PathBuf,
    config_path: Option<PathBuf>,
    base_sha: String,
    head_sha: String,
    base_ref: String,
    head_ref: String,
    default_branch: Option<String>,
    branch: Option<String>,
    base_branch: Option<String>,
    commit_message: Option<String>,
}

async fn cmd_preview(
    repo_root: &Path,
    config: &SdkciConfig,
    args: &ServiceArgs,
    comment: &CommentArgs,
    preview: PreviewArgs,
) -> Result<bool> {
    let comments = comment.target()?;
    let branch = preview
        .branch
        .clone()
        .unwrap_or_else(|| config.preview.branch_for(&preview.head_ref));
    let base_branch = preview
        .base_branch
        .clone()
        .unwrap_or_else(|| config.preview.branch_for(&format!("base/{}", preview.head_ref)));
    let default_branch = preview
        .default_branch
        .clone()
        .unwrap_or_else(|| config.preview.main_branch.clone());

    let request = RunRequest {
        project: args.project.clone(),
        branch: Some(branch),
        base_branch: Some(base_branch),
        spec_path: Some(preview.spec_path.clone()),
        config_path: preview.config_path.clone(),
        guess_config: preview.config_path.is_none(),
        commit_message: preview.commit_message.clone(),
        ..Default::default()
    };
    request.validate()?;
    let service = connect(config, args)?;
    let git = GitRepo::new(GitCommand::new(repo_root));

    start_group("Getting parent revision");
    let merge_base = git.merge_base(&preview.base_sha, &preview.head_sha).await?;

    let spec = path_str(&preview.spec_path)?;
    let config_file = preview.config_path.as_deref().map(path_str).transpose()?;
    let changed = git
        .is_config_changed(&merge_base, &preview.head_sha, Some(spec), config_file)
        .await?;
    if !changed {
        info!("No config files changed, skipping preview");
        end_group();
        clear_summary(comments.as_ref(), SummaryKind::Preview).await?;
        return Ok(true);
    }

    let mut tracked = vec![(spec, config.files.spec_name.as_str())];
    if let Some(path) = config_file {
        tracked.push((path, config.files.config_name.as_str()));
    }
    let hashes = git.file_hashes_at(&merge_base, &tracked).await?;

    let mut parent_revisions = Vec::new();
    if !hashes.is_empty() {
        parent_revisions.push(Revision::Hashes(hashes));
    }
    if preview.base_ref != default_branch {
        let base_preview = config.preview.branch_for(&preview.base_ref);
        info!("Non-default base ref: {}", base_preview);
        parent_revisions.push(Revision::Branch(base_preview));
    }
    parent_revisions.push(Revision::Branch(default_branch));
    end_group();

    start_group("Running builds");
    git.checkout(&preview.head_sha).await?;
    let request = RunRequest {
        parent_revisions,
        ..request
    };
    let result = run_builds(&service, &request, &run_settings(config, args)).await?;
    end_group();

    let passed = finish(&result, args.fail_on.into())?;
    post_summary(comments.as_ref(), SummaryKind::Preview, &result).await?;
    Ok(passed)
}

#[allow(clippy::too_many_arguments)]
async fn cmd_merge(
    repo_root: &Path,
    config: &SdkciConfig,
    args: &ServiceArgs,
    comment: &CommentArgs,
    spec_path: PathBuf,
    config_path: Option<PathBuf>,
    head_ref: String,
    commit_message: Option<String>,
) -> Result<bool> {
    let comments = comment.target()?;
    let request = RunRequest {
        project: args.project.clone(),
        branch: Some(config.preview.main_branch.clone()),
        merge_branch: Some(config.preview.branch_for(&head_ref)),
        commit_message,
        ..Default::default()
    };
    request.validate()?;
    let service = connect(config, args)?;
    let git = GitRepo::new(GitCommand::new(repo_root));

    let spec = path_str(&spec_path)?;
    let config_file = config_path.as_deref().map(path_str).transpose()?;
    if !git
        .is_config_changed("HEAD^1", "HEAD", Some(spec), config_file)
        .await?
    {
        info!("No config files changed, skipping merge build");
        return Ok(true);
    }

    start_group("Running builds");
    let result = run_builds(&service, &request, &run_settings(config, args)).await?;
    end_group();

    let passed = finish(&result, args.fail_on.into())?;
    post_summary(comments.as_ref(), SummaryKind::Merge, &result).await?;
    Ok(passed)
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_file_hash() {
        assert_eq!(
            parse_file_hash("openapi.yml=abc123").unwrap(),
            ("openapi.yml".to_string(), "abc123".to_string())
        );
        assert!(parse_file_hash("openapi.yml").is_err());
        assert!(parse_file_hash("=abc").is_err());
    }

    #[test]
    fn test_build_arguments() {
        let cli = Cli::try_parse_from([
            "sdkci",
            "build",
            "--project",
            "acme",
            "--parent-branch",
            "main",
            "--parent-hash",
            "openapi.yml=abc123",
            "--branch",
            "preview/feature-x",
            "--spec-path",
            "openapi.yml",
            "--fail-on",
            "warning",
        ])
        .unwrap();

        match cli.command {
            Commands::Build {
                service,
                parent_branches,
                parent_hashes,
                ..
            } => {
                assert_eq!(service.project, "acme");
                assert_eq!(parent_branches, vec!["main".to_string()]);
                assert_eq!(parent_hashes.len(), 1);
                assert_eq!(FailOn::from(service.fail_on), FailOn::Warning);
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_poll_interval_must_be_positive() {
        let result = Cli::try_parse_from([
            "sdkci",
            "build",
            "--project",
            "acme",
            "--poll-interval-seconds",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_settings_override_deadline() {
        let cli = Cli::try_parse_from([
            "sdkci",
            "build",
            "--project",
            "acme",
            "--max-polling-seconds",
            "30",
            "--output-dir",
            "/tmp/specs",
        ])
        .unwrap();
        let Commands::Build { service, .. } = cli.command else {
            panic!("expected build command");
        };

        let settings = run_settings(&SdkciConfig::default(), &service);
        assert_eq!(settings.poll.max_polling, Duration::from_secs(30));
        assert_eq!(settings.poll.interval, Duration::from_secs(5));
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/specs"));
    }

    #[test]
    fn test_run_settings_override_interval() {
        let cli = Cli::try_parse_from([
            "sdkci",
            "build",
            "--project",
            "acme",
            "--poll-interval-seconds",
            "2",
        ])
        .unwrap();
        let Commands::Build { service, .. } = cli.command else {
            panic!("expected build command");
        };

        let settings = run_settings(&SdkciConfig::default(), &service);
        assert_eq!(settings.poll.interval, Duration::from_secs(2));
    }
}
