//! # sdkci-orchestrator
//!
//! Drives one build through the remote service:
//!
//! 1. [`resolve_parents`] finds the latest build for each candidate ancestor
//! 2. [`reconcile_branch`] resets the target branch to the primary parent
//! 3. [`submit_build`] creates the build (and an optional base build)
//! 4. [`BuildPoller`] waits for every target language, head and base concurrently
//! 5. [`check_results`] turns the outcomes into a pass/fail verdict
//!
//! [`run_builds`] wires steps 1-4 together.

mod evaluator;
mod poller;
mod reconciler;
mod resolver;
mod runner;
mod submitter;
#[cfg(test)]
mod test_support;

pub use evaluator::{check_results, failing_languages, FailOn};
pub use poller::{merge_outcome, BuildPoller, PollConfig, PollResult};
pub use reconciler::{reconcile_branch, ConfigPreservation, Reconciliation};
pub use resolver::{resolve_parents, ParentBuilds};
pub use runner::{run_builds, RunRequest, RunResult, RunSettings};
pub use submitter::{submit_build, BuildInputs};
