//! End-to-end orchestration of one build run

use crate::poller::{BuildPoller, PollConfig, PollResult};
use crate::reconciler::{reconcile_branch, ConfigPreservation};
use crate::resolver::resolve_parents;
use crate::submitter::{submit_build, BuildInputs};
use sdkci_api::BuildService;
use sdkci_core::config::FileNames;
use sdkci_core::{is_valid_conventional_commit, Outcomes, Result, Revision, SdkciError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Inputs for one orchestration run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub project: String,
    /// Candidate ancestors, most preferred first
    pub parent_revisions: Vec<Revision>,
    /// Service branch the build targets
    pub branch: Option<String>,
    /// Build `branch..merge_branch` instead of local files
    pub merge_branch: Option<String>,
    /// Branch for a comparison build of the primary parent
    pub base_branch: Option<String>,
    pub spec_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub guess_config: bool,
    pub commit_message: Option<String>,
}

impl RunRequest {
    /// Reject contradictory inputs before any remote call
    pub fn validate(&self) -> Result<()> {
        if self.merge_branch.is_some() && (self.spec_path.is_some() || self.config_path.is_some())
        {
            return Err(SdkciError::InvalidInput(
                "Cannot specify both merge_branch and spec_path or config_path".to_string(),
            ));
        }
        if self.merge_branch.is_some() && self.branch.is_none() {
            return Err(SdkciError::InvalidInput(
                "merge_branch requires a target branch".to_string(),
            ));
        }
        if self.guess_config && (self.config_path.is_some() || self.spec_path.is_none()) {
            return Err(SdkciError::InvalidInput(
                "If guess_config is true, must have spec_path and no config_path".to_string(),
            ));
        }
        if let Some(message) = &self.commit_message {
            if !is_valid_conventional_commit(message) {
                return Err(SdkciError::InvalidInput(format!(
                    "Invalid commit message: {}. Please follow the Conventional Commits format: https://www.conventionalcommits.org/en/v1.0.0/",
                    message
                )));
            }
        }
        Ok(())
    }
}

/// Settings shared by every run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub poll: PollConfig,
    pub files: FileNames,
    /// Where the documented spec is written
    pub output_dir: PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            files: FileNames::default(),
            output_dir: std::env::temp_dir(),
        }
    }
}

/// What a run produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    /// `None` when the service declined to create a build
    pub build_id: Option<String>,
    pub outcomes: Outcomes,
    pub base_outcomes: Option<Outcomes>,
    pub parent_outcomes: Vec<Option<Outcomes>>,
    pub documented_spec_path: Option<PathBuf>,
}

impl RunResult {
    /// Nothing was built
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn is_skipped(&self) -> bool {
        self.build_id.is_none()
    }
}

/// Resolve parents, reconcile, submit, and poll
///
/// A base build is only submitted when `base_branch` is set and a primary
/// parent was found; it is polled alongside the head build.
#[instrument(skip(service, request, settings), fields(project = %request.project, branch = ?request.branch))]
pub async fn run_builds<S>(
    service: &S,
    request: &RunRequest,
    settings: &RunSettings,
) -> Result<RunResult>
where
    S: BuildService + ?Sized,
{
    request.validate()?;

    let spec = read_optional(request.spec_path.as_deref()).await?;
    let config = read_optional(request.config_path.as_deref()).await?;
    let preservation =
        ConfigPreservation::new(config.is_some(), request.guess_config, spec.as_deref())?;

    let parents = resolve_parents(service, &request.project, &request.parent_revisions).await?;
    let primary = parents.primary();

    let mut config = config;
    if let (Some(parent), Some(branch)) = (primary, request.branch.as_deref()) {
        let reconciliation =
            reconcile_branch(service, &request.project, branch, parent, &preservation).await?;
        if config.is_none() {
            config = reconciliation.preserved_config().map(str::to_string);
        }
    }

    let inputs = match (&request.merge_branch, &request.branch) {
        (Some(merge_branch), Some(branch)) => BuildInputs::Compare {
            branch: branch.clone(),
            merge_branch: merge_branch.clone(),
        },
        _ => BuildInputs::Files { spec, config },
    };

    let head = match submit_build(
        service,
        &request.project,
        request.branch.as_deref(),
        &inputs,
        request.commit_message.as_deref(),
        &settings.files,
    )
    .await?
    {
        Some(build) => build,
        None => return Ok(RunResult::skipped()),
    };

    let base = match (request.base_branch.as_deref(), primary) {
        (Some(base_branch), Some(parent)) => {
            reconcile_branch(
                service,
                &request.project,
                base_branch,
                parent,
                &ConfigPreservation::Explicit,
            )
            .await?;
            submit_build(
                service,
                &request.project,
                Some(base_branch),
                &BuildInputs::ConfigCommit(parent.config_commit.clone()),
                request.commit_message.as_deref(),
                &settings.files,
            )
            .await?
        }
        _ => None,
    };

    let poller = BuildPoller::new(service, settings.poll);
    let (head_result, base_result) = match &base {
        Some(base) => {
            let (head_result, base_result) =
                tokio::try_join!(poller.poll(&head), poller.poll(base))?;
            (head_result, Some(base_result))
        }
        None => (poller.poll(&head).await?, None),
    };

    let documented_spec_path =
        persist_documented_spec(&head_result, &settings.output_dir).await?;

    Ok(RunResult {
        build_id: Some(head_result.build_id),
        outcomes: head_result.outcomes,
        base_outcomes: base_result.map(|result| result.outcomes),
        parent_outcomes: parents.outcomes(),
        documented_spec_path,
    })
}

async fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(path) => Ok(Some(tokio::fs::read_to_string(path).await?)),
        None => Ok(None),
    }
}

async fn persist_documented_spec(result: &PollResult, output_dir: &Path) -> Result<Option<PathBuf>> {
    let Some(content) = &result.documented_spec else {
        return Ok(None);
    };

    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(format!("{}-documented-spec.yml", result.build_id));
    tokio::fs::write(&path, content).await?;
    info!("Wrote documented spec to {}", path.display());
    Ok(Some(path))
}
