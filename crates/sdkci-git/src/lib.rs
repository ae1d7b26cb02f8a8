//! # sdkci-git
//!
//! Git integration layer for sdkci.
//!
//! This crate provides:
//! - Git command execution abstraction (with a mock for tests)
//! - Change detection between two revisions
//! - Merge-base discovery on shallow CI clones
//! - Content hashes of files at a given revision

mod command;
mod repo;

pub use command::{GitCommand, GitExecutor, GitOutput, MockGitExecutor};
pub use repo::{GitRepo, MAX_MERGE_BASE_ATTEMPTS};
