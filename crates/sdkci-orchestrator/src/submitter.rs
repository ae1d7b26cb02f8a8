//! Build submission

use sdkci_api::{BuildRevision, BuildService, CreateBuildParams};
use sdkci_core::config::FileNames;
use sdkci_core::{Build, Result};
use tracing::{info, instrument};

/// What a build is generated from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildInputs {
    /// Literal spec and/or config content
    Files {
        spec: Option<String>,
        config: Option<String>,
    },
    /// Merge `merge_branch` into `branch` on the service side
    Compare { branch: String, merge_branch: String },
    /// Rebuild a config commit as-is
    ConfigCommit(String),
}

impl BuildInputs {
    /// Revision payload, keyed by the logical file names
    pub fn to_revision(&self, files: &FileNames) -> BuildRevision {
        match self {
            Self::Files { spec, config } => BuildRevision::files(
                [
                    (files.spec_name.as_str(), spec),
                    (files.config_name.as_str(), config),
                ]
                .into_iter()
                .filter_map(|(name, content)| content.clone().map(|content| (name, content))),
            ),
            Self::Compare {
                branch,
                merge_branch,
            } => BuildRevision::compare(branch, merge_branch),
            Self::ConfigCommit(commit) => BuildRevision::Ref(commit.clone()),
        }
    }
}

/// Submit one build; `None` when the service declined to create it
#[instrument(skip(service, inputs, commit_message, files))]
pub async fn submit_build<S>(
    service: &S,
    project: &str,
    branch: Option<&str>,
    inputs: &BuildInputs,
    commit_message: Option<&str>,
    files: &FileNames,
) -> Result<Option<Build>>
where
    S: BuildService + ?Sized,
{
    let params = CreateBuildParams {
        project: project.to_string(),
        revision: inputs.to_revision(files),
        branch: branch.map(str::to_string),
        commit_message: commit_message.map(str::to_string),
        allow_empty: true,
    };

    let created = service.create_build(&params).await?;
    match &created {
        Some(build) => info!(
            "Created build with ID {} for languages: {}",
            build.id,
            build.languages().join(", ")
        ),
        None => info!("No new build was created"),
    }
    Ok(created)
}
