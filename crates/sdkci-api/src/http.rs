//! HTTP implementation of the build service

use crate::service::{
    BranchInfo, BuildService, ConfigFiles, CreateBranchParams, CreateBuildParams,
    ListBuildsQuery,
};
use async_trait::async_trait;
use sdkci_core::{Build, Result, SdkciError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const API_VERSION_PREFIX: &str = "v0";

/// Build service client over HTTP
#[derive(Debug, Clone)]
pub struct HttpBuildService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct BuildPage {
    #[serde(default)]
    data: Vec<Build>,
}

#[derive(Debug, Serialize)]
struct GuessConfigRequest<'a> {
    branch: &'a str,
    spec: &'a str,
}

impl HttpBuildService {
    /// Create a client for the given base URL and API key
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkciError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Endpoint URL; each segment is percent-encoded so branch names like
    /// `preview/feature-x` stay a single path segment
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SdkciError::Http(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SdkciError::Http(format!("Base URL cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .push(API_VERSION_PREFIX)
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SdkciError::Http(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(SdkciError::NotFound(error_text));
            }
            return Err(SdkciError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SdkciError::Http(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl BuildService for HttpBuildService {
    #[instrument(skip(self), fields(project = %query.project))]
    async fn list_builds(&self, query: &ListBuildsQuery) -> Result<Vec<Build>> {
        debug!("Listing builds with {:?}", query.filter);
        let page: BuildPage = self
            .send(
                self.client
                    .get(self.url(&["builds"])?)
                    .query(&query.to_query_pairs()),
            )
            .await?;
        Ok(page.data)
    }

    #[instrument(skip(self, params), fields(project = %params.project, branch = ?params.branch))]
    async fn create_build(&self, params: &CreateBuildParams) -> Result<Option<Build>> {
        let build: Build = self
            .send(self.client.post(self.url(&["builds"])?).json(params))
            .await?;

        if build.is_created() {
            Ok(Some(build))
        } else {
            Ok(None)
        }
    }

    #[instrument(skip(self))]
    async fn retrieve_build(&self, build_id: &str) -> Result<Build> {
        self.send(self.client.get(self.url(&["builds", build_id])?))
            .await
    }

    #[instrument(skip(self))]
    async fn retrieve_branch(&self, project: &str, branch: &str) -> Result<BranchInfo> {
        self.send(
            self.client
                .get(self.url(&["projects", project, "branches", branch])?),
        )
        .await
    }

    #[instrument(skip(self, params), fields(branch = %params.branch, force = params.force))]
    async fn create_branch(
        &self,
        project: &str,
        params: &CreateBranchParams,
    ) -> Result<BranchInfo> {
        self.send(
            self.client
                .post(self.url(&["projects", project, "branches"])?)
                .json(params),
        )
        .await
    }

    #[instrument(skip(self, spec))]
    async fn guess_config(&self, project: &str, branch: &str, spec: &str) -> Result<ConfigFiles> {
        self.send(
            self.client
                .post(self.url(&["projects", project, "configs", "guess"])?)
                .json(&GuessConfigRequest { branch, spec }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn retrieve_config(&self, project: &str, branch: &str) -> Result<ConfigFiles> {
        self.send(
            self.client
                .get(self.url(&["projects", project, "configs"])?)
                .query(&[("branch", branch)]),
        )
        .await
    }
}
