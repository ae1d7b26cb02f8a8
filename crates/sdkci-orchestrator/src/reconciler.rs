//! Branch reconciliation against the primary parent build

use sdkci_api::{first_file_content, BuildService, CreateBranchParams};
use sdkci_core::{Build, Result, SdkciError};
use tracing::{info, instrument};

/// Where the config of a reset branch comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigPreservation {
    /// The caller supplies a config file; nothing to preserve
    Explicit,
    /// Ask the service to synthesize a config from this spec
    Guess { spec: String },
    /// Snapshot the branch config before resetting it
    Snapshot,
}

impl ConfigPreservation {
    /// Pick a strategy; guessing requires a spec and no explicit config
    pub fn new(has_explicit_config: bool, guess_config: bool, spec: Option<&str>) -> Result<Self> {
        if has_explicit_config {
            if guess_config {
                return Err(SdkciError::InvalidInput(
                    "Cannot guess a config when a config file is provided".to_string(),
                ));
            }
            return Ok(Self::Explicit);
        }

        if guess_config {
            return match spec {
                Some(spec) => Ok(Self::Guess {
                    spec: spec.to_string(),
                }),
                None => Err(SdkciError::InvalidInput(
                    "Guessing a config requires a spec file".to_string(),
                )),
            };
        }

        Ok(Self::Snapshot)
    }
}

/// What reconciliation did to the branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Branch did not exist; created from the parent's config commit
    Created,
    /// Branch exists but has never been built; left alone
    NoPreviousBuild,
    /// Branch's latest build is the parent; left alone
    UpToDate,
    /// Branch was force-reset onto the parent
    Reset { preserved_config: Option<String> },
}

impl Reconciliation {
    pub fn preserved_config(&self) -> Option<&str> {
        match self {
            Self::Reset { preserved_config } => preserved_config.as_deref(),
            _ => None,
        }
    }
}

/// Make `branch` descend from `parent` before a build is submitted
///
/// A branch whose latest build is not the parent is reset onto the parent's
/// config commit. Its config is preserved first, either by snapshotting it
/// or by guessing a fresh one from the spec, so the caller can resubmit it.
#[instrument(skip(service, parent, preservation), fields(parent_build = %parent.id))]
pub async fn reconcile_branch<S>(
    service: &S,
    project: &str,
    branch: &str,
    parent: &Build,
    preservation: &ConfigPreservation,
) -> Result<Reconciliation>
where
    S: BuildService + ?Sized,
{
    let info = match service.retrieve_branch(project, branch).await {
        Ok(info) => info,
        Err(e) if e.is_not_found() => {
            info!(
                "Branch {} does not exist, creating it from {}",
                branch, parent.config_commit
            );
            service
                .create_branch(
                    project,
                    &CreateBranchParams {
                        branch: branch.to_string(),
                        branch_from: parent.config_commit.clone(),
                        force: false,
                    },
                )
                .await?;
            return Ok(Reconciliation::Created);
        }
        Err(e) => return Err(e),
    };

    let latest = match &info.latest_build {
        Some(latest) => latest,
        None => {
            info!("Branch {} has no previous build", branch);
            return Ok(Reconciliation::NoPreviousBuild);
        }
    };

    if latest.id == parent.id {
        info!("Branch {} is already at parent build {}", branch, parent.id);
        return Ok(Reconciliation::UpToDate);
    }

    let preserved_config = match preservation {
        ConfigPreservation::Explicit => None,
        ConfigPreservation::Guess { spec } => {
            info!("Guessing config for {}", branch);
            first_file_content(service.guess_config(project, branch, spec).await?)
        }
        ConfigPreservation::Snapshot => {
            info!("Saving config of {} before reset", branch);
            first_file_content(service.retrieve_config(project, branch).await?)
        }
    };

    info!(
        "Resetting branch {} (latest build {}) to parent build {}",
        branch, latest.id, parent.id
    );
    service
        .create_branch(
            project,
            &CreateBranchParams {
                branch: branch.to_string(),
                branch_from: parent.config_commit.clone(),
                force: true,
            },
        )
        .await?;

    Ok(Reconciliation::Reset { preserved_config })
}
