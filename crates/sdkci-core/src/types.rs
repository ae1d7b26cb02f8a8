//! Core type definitions for sdkci orchestration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Target language name as reported by the build service (e.g. `python`)
pub type Language = String;

/// Outcomes map: one terminal outcome per target language
pub type Outcomes = BTreeMap<Language, Outcome>;

/// A point-in-time state of the API spec and config inputs
///
/// Revisions are computed inputs; they are never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    /// Latest state of a build service branch
    Branch(String),
    /// Logical file name -> content hash
    Hashes(BTreeMap<String, String>),
    /// Logical file name -> literal file content
    Content(BTreeMap<String, String>),
}

impl Revision {
    /// Convenience constructor for a branch revision
    pub fn branch(name: impl Into<String>) -> Self {
        Self::Branch(name.into())
    }

    /// Build a hash revision from `(file, hash)` pairs
    pub fn hashes<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Hashes(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Branch(name) => write!(f, "branch {}", name),
            Self::Hashes(hashes) => {
                let parts: Vec<String> = hashes
                    .iter()
                    .map(|(file, hash)| format!("{}@{}", file, hash))
                    .collect();
                write!(f, "hashes [{}]", parts.join(", "))
            }
            Self::Content(files) => {
                let names: Vec<&str> = files.keys().map(String::as_str).collect();
                write!(f, "inline content [{}]", names.join(", "))
            }
        }
    }
}

/// A server-owned build, only ever re-fetched locally
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Build {
    /// Opaque identifier; empty when the server declined to create a build
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub project: Option<String>,

    #[serde(default)]
    pub branch: Option<String>,

    /// Config commit this build was generated from
    #[serde(default)]
    pub config_commit: String,

    #[serde(default)]
    pub targets: BTreeMap<Language, BuildTarget>,

    /// Documented API spec, when the server produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documented_spec: Option<DocumentedSpec>,
}

impl Build {
    /// Whether the server actually created this build
    pub fn is_created(&self) -> bool {
        !self.id.is_empty()
    }

    /// Target languages, fixed at creation time
    pub fn languages(&self) -> Vec<Language> {
        self.targets.keys().cloned().collect()
    }

    /// Status of the commit step for a language, if the language is targeted
    pub fn commit_status(&self, language: &str) -> Option<&StepStatus> {
        self.targets.get(language).map(|target| &target.commit)
    }

    /// Terminal outcome for a language, if its commit step has completed
    pub fn completed_outcome(&self, language: &str) -> Option<&Outcome> {
        self.commit_status(language).and_then(StepStatus::outcome)
    }

    /// Outcomes for every language whose commit step has already completed
    pub fn completed_outcomes(&self) -> Outcomes {
        self.targets
            .iter()
            .filter_map(|(language, target)| {
                target
                    .commit
                    .outcome()
                    .map(|outcome| (language.clone(), outcome.clone()))
            })
            .collect()
    }

    /// Documented spec content; URL references are not supported
    pub fn documented_spec_content(&self) -> Option<&str> {
        match &self.documented_spec {
            Some(DocumentedSpec::Content { content }) => Some(content.as_str()),
            _ => None,
        }
    }
}

/// Per-language sub-record of a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildTarget {
    pub commit: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<StepStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<StepStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<StepStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<StepStatus>,
}

impl BuildTarget {
    /// Target whose commit step is in the given state, other steps absent
    pub fn with_commit(commit: StepStatus) -> Self {
        Self {
            commit,
            lint: None,
            test: None,
            upload: None,
            build: None,
        }
    }
}

/// Progress of a single build step
///
/// Failure is not a separate state: a failed step is `Completed` with a
/// conclusion that signals it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    #[serde(alias = "not_started", alias = "queued")]
    Pending,
    #[serde(alias = "in_progress")]
    Running,
    Completed {
        completed: Outcome,
    },
    #[serde(other)]
    Unknown,
}

impl StepStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Self::Completed { completed } => Some(completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed { .. } => write!(f, "completed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Terminal result of one language's build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub conclusion: Conclusion,

    #[serde(default)]
    pub commit: Option<Commit>,

    #[serde(default)]
    pub merge_conflict_pr: Option<MergeConflictPr>,
}

impl Outcome {
    /// Synthetic outcome for a language that never completed before the deadline
    pub fn timed_out() -> Self {
        Self {
            conclusion: Conclusion::TimedOut,
            commit: None,
            merge_conflict_pr: None,
        }
    }

    /// Neither a commit nor a merge conflict reference was produced
    pub fn is_unresolved(&self) -> bool {
        self.commit.is_none() && self.merge_conflict_pr.is_none()
    }
}

/// Build conclusion reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Conclusion {
    Success,
    Error,
    Warning,
    Note,
    TimedOut,
    MergeConflict,
    UpstreamMergeConflict,
    Fatal,
    Cancelled,
    Noop,
    Other(String),
}

impl Conclusion {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
            Self::TimedOut => "timed_out",
            Self::MergeConflict => "merge_conflict",
            Self::UpstreamMergeConflict => "upstream_merge_conflict",
            Self::Fatal => "fatal",
            Self::Cancelled => "cancelled",
            Self::Noop => "noop",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for Conclusion {
    fn from(s: String) -> Self {
        match s.as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            "warning" => Self::Warning,
            "note" => Self::Note,
            "timed_out" => Self::TimedOut,
            "merge_conflict" => Self::MergeConflict,
            "upstream_merge_conflict" => Self::UpstreamMergeConflict,
            "fatal" => Self::Fatal,
            "cancelled" => Self::Cancelled,
            "noop" => Self::Noop,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Conclusion {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Conclusion> for String {
    fn from(c: Conclusion) -> Self {
        c.as_str().to_string()
    }
}

impl std::fmt::Display for Conclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commit pushed to an SDK repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub repo: CommitRepo,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRepo {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

/// Pull request that needs manual conflict resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConflictPr {
    pub number: u64,
    pub repo: PrRepo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrRepo {
    pub owner: String,
    pub name: String,
}

/// Documented API spec attached to a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentedSpec {
    Content {
        content: String,
    },
    Url {
        url: String,
    },
    #[serde(other)]
    Unsupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_build_json() -> &'static str {
        r#"{
            "id": "bui_123",
            "project": "acme",
            "branch": "preview/feature-x",
            "config_commit": "cfg_abc",
            "targets": {
                "python": {
                    "commit": {
                        "status": "completed",
                        "completed": {
                            "conclusion": "success",
                            "commit": {
                                "repo": {"owner": "acme", "name": "acme-python", "branch": "preview/feature-x"},
                                "sha": "deadbeef"
                            },
                            "merge_conflict_pr": null
                        }
                    },
                    "lint": {"status": "in_progress"}
                },
                "node": {
                    "commit": {"status": "queued"}
                }
            },
            "documented_spec": {"type": "content", "content": "openapi: 3.1.0"}
        }"#
    }

    #[test]
    fn test_build_deserialization() {
        let build: Build = serde_json::from_str(sample_build_json()).unwrap();

        assert!(build.is_created());
        assert_eq!(build.languages(), vec!["node".to_string(), "python".to_string()]);
        assert_eq!(build.commit_status("node"), Some(&StepStatus::Pending));
        assert_eq!(
            build.targets["python"].lint,
            Some(StepStatus::Running)
        );

        let outcome = build.completed_outcome("python").unwrap();
        assert_eq!(outcome.conclusion, Conclusion::Success);
        assert_eq!(outcome.commit.as_ref().unwrap().sha, "deadbeef");
        assert!(build.completed_outcome("node").is_none());
        assert_eq!(build.documented_spec_content(), Some("openapi: 3.1.0"));
    }

    #[test]
    fn test_completed_outcomes_skips_pending() {
        let build: Build = serde_json::from_str(sample_build_json()).unwrap();
        let outcomes = build.completed_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes.contains_key("python"));
    }

    #[test]
    fn test_declined_build_has_no_id() {
        let build: Build = serde_json::from_str(r#"{"targets": {}}"#).unwrap();
        assert!(!build.is_created());
    }

    #[test]
    fn test_unknown_step_status() {
        let status: StepStatus = serde_json::from_str(r#"{"status": "postponed"}"#).unwrap();
        assert_eq!(status, StepStatus::Unknown);
        assert!(!status.is_completed());
    }

    #[test]
    fn test_url_documented_spec_is_absent() {
        let build: Build = serde_json::from_str(
            r#"{"id": "b", "documented_spec": {"type": "url", "url": "https://example.com/spec"}}"#,
        )
        .unwrap();
        assert!(build.documented_spec.is_some());
        assert_eq!(build.documented_spec_content(), None);
    }

    #[test]
    fn test_timed_out_outcome_serialization() {
        let value = serde_json::to_value(Outcome::timed_out()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "conclusion": "timed_out",
                "commit": null,
                "merge_conflict_pr": null
            })
        );
    }

    #[test]
    fn test_conclusion_preserves_unknown_values() {
        let c: Conclusion = serde_json::from_str(r#""payment_required""#).unwrap();
        assert_eq!(c, Conclusion::Other("payment_required".to_string()));
        assert_eq!(serde_json::to_string(&c).unwrap(), r#""payment_required""#);
        assert_eq!(Conclusion::from("warning"), Conclusion::Warning);
    }

    #[test]
    fn test_revision_display() {
        assert_eq!(Revision::branch("main").to_string(), "branch main");
        assert_eq!(
            Revision::hashes([("openapi.yml", "abc123")]).to_string(),
            "hashes [openapi.yml@abc123]"
        );
    }
}
