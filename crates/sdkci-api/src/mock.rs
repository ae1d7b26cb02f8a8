//! Scripted build service for testing

use crate::service::{
    BranchInfo, BuildFilter, BuildService, ConfigFiles, CreateBranchParams, CreateBuildParams,
    ListBuildsQuery,
};
use async_trait::async_trait;
use sdkci_core::{Build, Result, SdkciError};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// Failure a mock endpoint should report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    NotFound,
    Api(u16),
}

impl MockFailure {
    fn to_error(self, what: &str) -> SdkciError {
        match self {
            Self::NotFound => SdkciError::NotFound(what.to_string()),
            Self::Api(status) => SdkciError::Api {
                status,
                message: format!("mock failure for {}", what),
            },
        }
    }
}

/// A call made against the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    ListBuilds(ListBuildsQuery),
    CreateBuild(CreateBuildParams),
    RetrieveBuild(String),
    RetrieveBranch(String),
    CreateBranch(CreateBranchParams),
    GuessConfig { branch: String, spec: String },
    RetrieveConfig(String),
}

#[derive(Default)]
struct MockState {
    branch_builds: HashMap<String, Build>,
    revision_builds: Vec<(BTreeMap<String, String>, Build)>,
    list_failures: Vec<(BuildFilter, MockFailure)>,
    created: VecDeque<Option<Build>>,
    snapshots: HashMap<String, VecDeque<Build>>,
    branches: HashMap<String, BranchInfo>,
    branch_failures: HashMap<String, MockFailure>,
    configs: HashMap<String, ConfigFiles>,
    guessed: ConfigFiles,
    calls: Vec<ServiceCall>,
}

/// Mock build service
///
/// `retrieve_build` walks through the snapshots registered for a build id
/// and keeps returning the last one once they run out.
#[derive(Default)]
pub struct MockBuildService {
    state: Mutex<MockState>,
}

impl MockBuildService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest build for a branch lookup
    pub fn with_branch_build(self, branch: &str, build: Build) -> Self {
        self.lock().branch_builds.insert(branch.to_string(), build);
        self
    }

    /// Latest build for a content-hash lookup
    pub fn with_revision_build(self, hashes: BTreeMap<String, String>, build: Build) -> Self {
        self.lock().revision_builds.push((hashes, build));
        self
    }

    /// Make a list lookup for the given filter fail
    pub fn with_list_failure(self, filter: BuildFilter, failure: MockFailure) -> Self {
        self.lock().list_failures.push((filter, failure));
        self
    }

    /// Next `create_build` response; `None` means the server declined
    pub fn with_created_build(self, build: Option<Build>) -> Self {
        self.lock().created.push_back(build);
        self
    }

    /// Successive states returned by `retrieve_build` for `build.id`
    pub fn with_snapshots(self, snapshots: Vec<Build>) -> Self {
        {
            let mut state = self.lock();
            for build in snapshots {
                state
                    .snapshots
                    .entry(build.id.clone())
                    .or_default()
                    .push_back(build);
            }
        }
        self
    }

    pub fn with_branch(self, info: BranchInfo) -> Self {
        self.lock().branches.insert(info.branch.clone(), info);
        self
    }

    pub fn with_branch_failure(self, branch: &str, failure: MockFailure) -> Self {
        self.lock()
            .branch_failures
            .insert(branch.to_string(), failure);
        self
    }

    pub fn with_config(self, branch: &str, files: ConfigFiles) -> Self {
        self.lock().configs.insert(branch.to_string(), files);
        self
    }

    pub fn with_guessed_config(self, files: ConfigFiles) -> Self {
        self.lock().guessed = files;
        self
    }

    /// All calls made so far
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.lock().calls.clone()
    }

    /// Branch creations/resets issued so far
    pub fn branch_mutations(&self) -> Vec<CreateBranchParams> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ServiceCall::CreateBranch(params) => Some(params.clone()),
                _ => None,
            })
            .collect()
    }

    /// Build submissions issued so far
    pub fn submitted_builds(&self) -> Vec<CreateBuildParams> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ServiceCall::CreateBuild(params) => Some(params.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BuildService for MockBuildService {
    async fn list_builds(&self, query: &ListBuildsQuery) -> Result<Vec<Build>> {
        let mut state = self.lock();
        state.calls.push(ServiceCall::ListBuilds(query.clone()));

        if let Some((_, failure)) = state
            .list_failures
            .iter()
            .find(|(filter, _)| *filter == query.filter)
        {
            return Err(failure.to_error("list builds"));
        }

        let found = match &query.filter {
            BuildFilter::Branch(branch) => state.branch_builds.get(branch).cloned(),
            BuildFilter::Revision(hashes) => state
                .revision_builds
                .iter()
                .find(|(registered, _)| registered == hashes)
                .map(|(_, build)| build.clone()),
        };

        Ok(found
            .into_iter()
            .take(query.limit as usize)
            .collect())
    }

    async fn create_build(&self, params: &CreateBuildParams) -> Result<Option<Build>> {
        let mut state = self.lock();
        state.calls.push(ServiceCall::CreateBuild(params.clone()));
        state
            .created
            .pop_front()
            .ok_or_else(|| SdkciError::Other("No mock build queued for create".to_string()))
    }

    async fn retrieve_build(&self, build_id: &str) -> Result<Build> {
        let mut state = self.lock();
        state
            .calls
            .push(ServiceCall::RetrieveBuild(build_id.to_string()));

        let queue = state
            .snapshots
            .get_mut(build_id)
            .ok_or_else(|| SdkciError::NotFound(format!("build {}", build_id)))?;

        let snapshot = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        snapshot.ok_or_else(|| SdkciError::NotFound(format!("build {}", build_id)))
    }

    async fn retrieve_branch(&self, _project: &str, branch: &str) -> Result<BranchInfo> {
        let mut state = self.lock();
        state
            .calls
            .push(ServiceCall::RetrieveBranch(branch.to_string()));

        if let Some(failure) = state.branch_failures.get(branch) {
            return Err(failure.to_error(branch));
        }
        state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| SdkciError::NotFound(format!("branch {}", branch)))
    }

    async fn create_branch(
        &self,
        _project: &str,
        params: &CreateBranchParams,
    ) -> Result<BranchInfo> {
        let mut state = self.lock();
        state.calls.push(ServiceCall::CreateBranch(params.clone()));

        let info = BranchInfo {
            branch: params.branch.clone(),
            config_commit: Some(params.branch_from.clone()),
            latest_build: None,
        };
        state.branch_failures.remove(&params.branch);
        state.branches.insert(params.branch.clone(), info.clone());
        Ok(info)
    }

    async fn guess_config(&self, _project: &str, branch: &str, spec: &str) -> Result<ConfigFiles> {
        let mut state = self.lock();
        state.calls.push(ServiceCall::GuessConfig {
            branch: branch.to_string(),
            spec: spec.to_string(),
        });
        Ok(state.guessed.clone())
    }

    async fn retrieve_config(&self, _project: &str, branch: &str) -> Result<ConfigFiles> {
        let mut state = self.lock();
        state
            .calls
            .push(ServiceCall::RetrieveConfig(branch.to_string()));
        state
            .configs
            .get(branch)
            .cloned()
            .ok_or_else(|| SdkciError::NotFound(format!("config for {}", branch)))
    }
}
