//! Build service abstraction

use async_trait::async_trait;
use sdkci_core::hashing::content_hash;
use sdkci_core::{Build, Result, Revision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trait for talking to the build service (allows mocking in tests)
#[async_trait]
pub trait BuildService: Send + Sync {
    /// Most recent builds matching the query, newest first
    async fn list_builds(&self, query: &ListBuildsQuery) -> Result<Vec<Build>>;

    /// Submit a build; `None` when the server declined to create one
    async fn create_build(&self, params: &CreateBuildParams) -> Result<Option<Build>>;

    /// Re-fetch a build by id
    async fn retrieve_build(&self, build_id: &str) -> Result<Build>;

    /// Branch state; fails with `NotFound` when the branch does not exist
    async fn retrieve_branch(&self, project: &str, branch: &str) -> Result<BranchInfo>;

    /// Create a branch, or reset an existing one when `force` is set
    async fn create_branch(&self, project: &str, params: &CreateBranchParams)
        -> Result<BranchInfo>;

    /// Ask the service to synthesize a config from a spec
    async fn guess_config(&self, project: &str, branch: &str, spec: &str) -> Result<ConfigFiles>;

    /// Current config files of a branch
    async fn retrieve_config(&self, project: &str, branch: &str) -> Result<ConfigFiles>;
}

/// How to match builds when listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildFilter {
    Branch(String),
    /// Logical file name -> content hash
    Revision(BTreeMap<String, String>),
}

impl From<&Revision> for BuildFilter {
    fn from(revision: &Revision) -> Self {
        match revision {
            Revision::Branch(name) => Self::Branch(name.clone()),
            Revision::Hashes(hashes) => Self::Revision(hashes.clone()),
            Revision::Content(files) => Self::Revision(
                files
                    .iter()
                    .map(|(file, content)| (file.clone(), content_hash(content)))
                    .collect(),
            ),
        }
    }
}

/// Query for listing builds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBuildsQuery {
    pub project: String,
    pub filter: BuildFilter,
    pub limit: u32,
}

impl ListBuildsQuery {
    /// Latest build matching a revision
    pub fn latest(project: impl Into<String>, revision: &Revision) -> Self {
        Self {
            project: project.into(),
            filter: BuildFilter::from(revision),
            limit: 1,
        }
    }

    /// Query-string pairs in the form the service expects
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("project".to_string(), self.project.clone()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        match &self.filter {
            BuildFilter::Branch(branch) => pairs.push(("branch".to_string(), branch.clone())),
            BuildFilter::Revision(hashes) => {
                for (file, hash) in hashes {
                    pairs.push((format!("revision[{}][hash]", file), hash.clone()));
                }
            }
        }
        pairs
    }
}

/// File content wrapper used in revisions and config payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
}

/// Config files keyed by file name
pub type ConfigFiles = BTreeMap<String, FileContent>;

/// Content of the first config file, if any
pub fn first_file_content(files: ConfigFiles) -> Option<String> {
    files.into_values().next().map(|file| file.content)
}

/// What a new build is generated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BuildRevision {
    /// Declarative ref: a config commit, or `"{branch}..{merge_branch}"`
    Ref(String),
    /// Literal file contents keyed by logical file name
    Files(BTreeMap<String, FileContent>),
}

impl BuildRevision {
    /// Compare expression merging `merge_branch` into `branch`
    pub fn compare(branch: &str, merge_branch: &str) -> Self {
        Self::Ref(format!("{}..{}", branch, merge_branch))
    }

    /// Revision from `(file name, content)` pairs
    pub fn files<I, K>(files: I) -> Self
    where
        I: IntoIterator<Item = (K, String)>,
        K: Into<String>,
    {
        Self::Files(
            files
                .into_iter()
                .map(|(name, content)| (name.into(), FileContent { content }))
                .collect(),
        )
    }
}

/// Parameters for creating a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateBuildParams {
    pub project: String,
    pub revision: BuildRevision,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,

    pub allow_empty: bool,
}

/// Parameters for creating or resetting a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateBranchParams {
    pub branch: String,
    /// Config commit to anchor the branch at
    pub branch_from: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force: bool,
}

/// Branch state reported by the service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BranchInfo {
    #[serde(default)]
    pub branch: String,

    #[serde(default)]
    pub config_commit: Option<String>,

    #[serde(default)]
    pub latest_build: Option<Build>,
}
