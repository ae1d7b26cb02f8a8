//! # sdkci-core
//!
//! Core types for the sdkci build orchestrator.
//!
//! sdkci drives a remote SDK generation service from CI: it finds a parent
//! build to compare against, makes sure the target branch reflects that
//! parent, submits a new build and waits for every target language to finish.
//!
//! ## Core Paradigm
//!
//! - Builds are owned by the server; locally they are only ever re-fetched
//! - A build's language set is fixed when it is created
//! - Outcomes are terminal: the first completed result observed wins

pub mod commit_message;
pub mod config;
mod error;
pub mod hashing;
mod types;

pub use commit_message::is_valid_conventional_commit;
pub use config::SdkciConfig;
pub use error::{Result, SdkciError};
pub use types::*;
