//! # sdkci-api
//!
//! Client for the remote SDK build service.
//!
//! Everything the orchestrator needs from the service goes through the
//! [`BuildService`] trait so that the polling and reconciliation logic can be
//! exercised against [`MockBuildService`] in tests:
//! - build listing, creation and retrieval
//! - branch retrieval and (forced) creation
//! - config retrieval and guessing

mod http;
mod mock;
mod service;

pub use http::HttpBuildService;
pub use mock::{MockBuildService, MockFailure, ServiceCall};
pub use service::{
    first_file_content, BranchInfo, BuildFilter, BuildRevision, BuildService, ConfigFiles,
    CreateBranchParams, CreateBuildParams, FileContent, ListBuildsQuery,
};
