//! Workflow plumbing shared by the subcommands

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Args;
use sdkci_core::Outcomes;
use sdkci_github::{
    merge_summary, preview_summary, remove_comment, upsert_comment, GitHubComments, StepOutputs,
};
use sdkci_orchestrator::RunResult;
use tracing::info;

/// Open a collapsible log group
pub fn start_group(title: &str) {
    println!("::group::{}", title);
}

pub fn end_group() {
    println!("::endgroup::");
}

/// Pull request comment options
#[derive(Args, Debug, Clone)]
pub struct CommentArgs {
    /// Post or update a summary comment on the pull request
    #[arg(long)]
    pub make_comment: bool,

    /// Token used to post the comment
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Repository as owner/repo
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub github_repository: Option<String>,

    /// Pull request number
    #[arg(long)]
    pub pr_number: Option<u64>,
}

impl CommentArgs {
    /// Comment target, or `None` when commenting is off
    ///
    /// Fails when commenting is requested without the details it needs.
    pub fn target(&self) -> Result<Option<GitHubComments>> {
        if !self.make_comment {
            return Ok(None);
        }
        let Some(token) = &self.github_token else {
            bail!("github_token is required to make a comment");
        };
        let Some(repository) = &self.github_repository else {
            bail!("github_repository is required to make a comment");
        };
        let Some(pr_number) = self.pr_number else {
            bail!("pr_number is required to make a comment");
        };
        Ok(Some(GitHubComments::from_repository(
            token.clone(),
            repository,
            pr_number,
        )?))
    }
}

/// Which summary a comment carries
#[derive(Debug, Clone, Copy)]
pub enum SummaryKind {
    Preview,
    Merge,
}

impl SummaryKind {
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Preview => sdkci_github::PREVIEW_MARKER,
            Self::Merge => sdkci_github::MERGE_MARKER,
        }
    }

    fn body(&self, outcomes: &Outcomes, base_outcomes: Option<&Outcomes>) -> String {
        match self {
            Self::Preview => preview_summary(outcomes, base_outcomes, Utc::now()),
            Self::Merge => merge_summary(outcomes),
        }
    }
}

/// Upsert the summary comment for a finished run
pub async fn post_summary(
    target: Option<&GitHubComments>,
    kind: SummaryKind,
    result: &RunResult,
) -> Result<()> {
    let Some(target) = target else {
        return Ok(());
    };

    start_group("Creating comment");
    let body = kind.body(&result.outcomes, result.base_outcomes.as_ref());
    upsert_comment(target, &body).await?;
    end_group();
    Ok(())
}

/// Remove a stale summary comment when a run is skipped
pub async fn clear_summary(target: Option<&GitHubComments>, kind: SummaryKind) -> Result<()> {
    if let Some(target) = target {
        if remove_comment(target, kind.marker()).await? {
            info!("Removed stale comment");
        }
    }
    Ok(())
}

/// Emit every output of a run
pub fn write_outputs(outputs: &StepOutputs, result: &RunResult) -> Result<()> {
    outputs.set("build_id", result.build_id.as_deref().unwrap_or_default())?;
    outputs.set_json("outcomes", &result.outcomes)?;
    outputs.set_json("base_outcomes", &result.base_outcomes)?;
    outputs.set_json("parent_outcomes", &result.parent_outcomes)?;
    let documented_spec_path = result
        .documented_spec_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    outputs.set("documented_spec_path", &documented_spec_path)?;
    Ok(())
}
