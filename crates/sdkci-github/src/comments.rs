//! Idempotent marker comments
//!
//! A run owns at most one comment per pull request. It is recognized by the
//! first non-empty line of its body, so re-runs update it in place.

use async_trait::async_trait;
use sdkci_core::{Result, SdkciError};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

/// A comment on the pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
}

/// Where comments are posted (allows mocking in tests)
#[async_trait]
pub trait CommentTarget: Send + Sync {
    async fn list_comments(&self) -> Result<Vec<Comment>>;
    async fn create_comment(&self, body: &str) -> Result<Comment>;
    async fn update_comment(&self, id: u64, body: &str) -> Result<Comment>;
    async fn delete_comment(&self, id: u64) -> Result<()>;
}

fn marker_line(body: &str) -> Option<&str> {
    body.lines().map(str::trim).find(|line| !line.is_empty())
}

async fn find_marked<T>(target: &T, marker: &str) -> Result<Option<Comment>>
where
    T: CommentTarget + ?Sized,
{
    Ok(target.list_comments().await?.into_iter().find(|comment| {
        comment
            .body
            .as_deref()
            .is_some_and(|body| body.contains(marker))
    }))
}

/// Update the comment carrying `body`'s marker line, or create one
pub async fn upsert_comment<T>(target: &T, body: &str) -> Result<Comment>
where
    T: CommentTarget + ?Sized,
{
    let marker = marker_line(body)
        .ok_or_else(|| SdkciError::Comment("Comment body is empty".to_string()))?;

    match find_marked(target, marker).await? {
        Some(existing) => {
            info!("Updating existing comment: {}", existing.id);
            target.update_comment(existing.id, body).await
        }
        None => {
            info!("Creating new comment");
            target.create_comment(body).await
        }
    }
}

/// Delete the comment carrying `marker`; returns whether one was found
pub async fn remove_comment<T>(target: &T, marker: &str) -> Result<bool>
where
    T: CommentTarget + ?Sized,
{
    match find_marked(target, marker).await? {
        Some(existing) => {
            info!("Removing stale comment: {}", existing.id);
            target.delete_comment(existing.id).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// In-memory comment thread for testing
#[derive(Default)]
pub struct MockCommentTarget {
    comments: Mutex<Vec<Comment>>,
}

impl MockCommentTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing comment
    pub fn with_comment(self, id: u64, body: &str) -> Self {
        self.lock().push(Comment {
            id,
            body: Some(body.to_string()),
        });
        self
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Comment>> {
        self.comments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CommentTarget for MockCommentTarget {
    async fn list_comments(&self) -> Result<Vec<Comment>> {
        Ok(self.comments())
    }

    async fn create_comment(&self, body: &str) -> Result<Comment> {
        let mut comments = self.lock();
        let id = comments.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let comment = Comment {
            id,
            body: Some(body.to_string()),
        };
        comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: u64, body: &str) -> Result<Comment> {
        let mut comments = self.lock();
        let comment = comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| SdkciError::NotFound(format!("comment {}", id)))?;
        comment.body = Some(body.to_string());
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: u64) -> Result<()> {
        let mut comments = self.lock();
        let before = comments.len();
        comments.retain(|c| c.id != id);
        if comments.len() == before {
            return Err(SdkciError::NotFound(format!("comment {}", id)));
        }
        Ok(())
    }
}
