//! # sdkci-github
//!
//! CI-facing side effects of a run: the idempotent pull request comment and
//! the step outputs consumed by later workflow steps.

pub mod comments;
mod github;
pub mod outputs;
pub mod summary;

pub use comments::{remove_comment, upsert_comment, Comment, CommentTarget, MockCommentTarget};
pub use github::GitHubComments;
pub use outputs::StepOutputs;
pub use summary::{merge_summary, preview_summary, MERGE_MARKER, PREVIEW_MARKER};
