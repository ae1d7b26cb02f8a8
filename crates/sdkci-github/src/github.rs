//! GitHub REST implementation of the comment target

use crate::comments::{Comment, CommentTarget};
use async_trait::async_trait;
use sdkci_core::{Result, SdkciError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("sdkci/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: usize = 100;

/// Comments on one pull request
#[derive(Debug, Clone)]
pub struct GitHubComments {
    client: reqwest::Client,
    api_url: String,
    token: String,
    owner: String,
    repo: String,
    issue_number: u64,
}

#[derive(Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

impl GitHubComments {
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        issue_number: u64,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: GITHUB_API_URL.to_string(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            issue_number,
        }
    }

    /// From an `owner/repo` pair as found in `GITHUB_REPOSITORY`
    pub fn from_repository(
        token: impl Into<String>,
        repository: &str,
        issue_number: u64,
    ) -> Result<Self> {
        let (owner, repo) = repository.split_once('/').ok_or_else(|| {
            SdkciError::InvalidInput(format!(
                "Expected repository as owner/repo, got {}",
                repository
            ))
        })?;
        Ok(Self::new(token, owner, repo, issue_number))
    }

    /// Point at a different API host (GitHub Enterprise)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn issue_comments_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, self.owner, self.repo, self.issue_number
        )
    }

    fn comment_url(&self, id: u64) -> String {
        format!(
            "{}/repos/{}/{}/issues/comments/{}",
            self.api_url, self.owner, self.repo, id
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    async fn checked(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| SdkciError::Http(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown".to_string());
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SdkciError::NotFound(error_text));
        }
        Err(SdkciError::Comment(format!(
            "GitHub API error {}: {}",
            status, error_text
        )))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        self.checked(request)
            .await?
            .json()
            .await
            .map_err(|e| SdkciError::Http(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl CommentTarget for GitHubComments {
    #[instrument(skip(self), fields(issue = self.issue_number))]
    async fn list_comments(&self) -> Result<Vec<Comment>> {
        let mut comments = Vec::new();
        let mut page = 1u32;
        loop {
            let batch: Vec<Comment> = self
                .send(self.client.get(self.issue_comments_url()).query(&[
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ]))
                .await?;
            let done = batch.len() < PAGE_SIZE;
            comments.extend(batch);
            if done {
                break;
            }
            page += 1;
        }
        debug!("Found {} comments", comments.len());
        Ok(comments)
    }

    #[instrument(skip(self, body), fields(issue = self.issue_number))]
    async fn create_comment(&self, body: &str) -> Result<Comment> {
        self.send(
            self.client
                .post(self.issue_comments_url())
                .json(&CommentRequest { body }),
        )
        .await
    }

    #[instrument(skip(self, body))]
    async fn update_comment(&self, id: u64, body: &str) -> Result<Comment> {
        self.send(
            self.client
                .patch(self.comment_url(id))
                .json(&CommentRequest { body }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_comment(&self, id: u64) -> Result<()> {
        self.checked(self.client.delete(self.comment_url(id)))
            .await?;
        Ok(())
    }
}
