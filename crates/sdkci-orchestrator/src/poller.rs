//! Per-language build polling
//!
//! Every language is tracked on its own: a fast target is recorded as soon
//! as its commit step completes, and a slow one never blocks it. The loop
//! stops once all languages have an outcome or the deadline passes, and
//! whatever is still missing is recorded as `timed_out`.

use futures::future::try_join_all;
use sdkci_api::BuildService;
use sdkci_core::config::{PollingConfig, MIN_INTERVAL_SECONDS};
use sdkci_core::{Build, Language, Outcome, Outcomes, Result};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Polling deadline and pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Global deadline for one polling loop
    pub max_polling: Duration,
    /// Sleep between passes
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_polling: Duration::from_secs(600),
            interval: Duration::from_secs(5),
        }
    }
}

impl From<&PollingConfig> for PollConfig {
    fn from(config: &PollingConfig) -> Self {
        Self {
            max_polling: config.max_polling(),
            interval: config
                .interval()
                .max(Duration::from_secs(MIN_INTERVAL_SECONDS)),
        }
    }
}

/// Terminal state of a polled build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollResult {
    pub build_id: String,
    pub outcomes: Outcomes,
    /// First documented spec content seen while polling
    #[serde(skip)]
    pub documented_spec: Option<String>,
}

/// Record an outcome unless the language already has one
///
/// Returns whether the outcome was recorded.
pub fn merge_outcome(outcomes: &mut Outcomes, language: &str, outcome: Outcome) -> bool {
    if outcomes.contains_key(language) {
        return false;
    }
    outcomes.insert(language.to_string(), outcome);
    true
}

/// Far enough out to never be reached by a CI job
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Deadline `max_polling` from now, saturating instead of overflowing
fn deadline_after(max_polling: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(max_polling)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Polls one build until every language resolves or the deadline passes
pub struct BuildPoller<'a, S: BuildService + ?Sized> {
    service: &'a S,
    config: PollConfig,
}

impl<'a, S: BuildService + ?Sized> BuildPoller<'a, S> {
    pub fn new(service: &'a S, config: PollConfig) -> Self {
        Self { service, config }
    }

    /// Poll `build` to completion; never fails on a timeout
    #[instrument(skip(self, build), fields(build_id = %build.id))]
    pub async fn poll(&self, build: &Build) -> Result<PollResult> {
        let languages = build.languages();
        let deadline = deadline_after(self.config.max_polling);
        let mut outcomes = Outcomes::new();
        let mut documented_spec: Option<String> = None;

        info!(
            "Polling build {} for languages: {}",
            build.id,
            languages.join(", ")
        );

        while outcomes.len() < languages.len() && Instant::now() < deadline {
            let pending: Vec<&Language> = languages
                .iter()
                .filter(|language| !outcomes.contains_key(*language))
                .collect();

            let snapshots = try_join_all(
                pending
                    .iter()
                    .map(|_| self.service.retrieve_build(&build.id)),
            )
            .await?;

            for (language, snapshot) in pending.into_iter().zip(snapshots) {
                if documented_spec.is_none() {
                    if let Some(content) = snapshot.documented_spec_content() {
                        debug!("Captured documented spec from build {}", build.id);
                        documented_spec = Some(content.to_string());
                    }
                }

                match snapshot.completed_outcome(language) {
                    Some(outcome) => {
                        info!(
                            "Build {} language {} completed: {}",
                            build.id,
                            language,
                            outcome.conclusion.as_str()
                        );
                        merge_outcome(&mut outcomes, language, outcome.clone());
                    }
                    None => match snapshot.commit_status(language) {
                        Some(status) => info!(
                            "Build {} language {} status: {}",
                            build.id, language, status
                        ),
                        None => info!(
                            "Build {} language {} has no commit step yet",
                            build.id, language
                        ),
                    },
                }
            }

            if outcomes.len() < languages.len() {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        for language in &languages {
            if merge_outcome(&mut outcomes, language, Outcome::timed_out()) {
                warn!("Build {} language {} timed out", build.id, language);
            }
        }

        Ok(PollResult {
            build_id: build.id.clone(),
            outcomes,
            documented_spec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build, completed, outcome, with_commit};
    use sdkci_api::MockBuildService;
    use sdkci_core::{Conclusion, DocumentedSpec, StepStatus};

    fn config(max_secs: u64, interval_secs: u64) -> PollConfig {
        PollConfig {
            max_polling: Duration::from_secs(max_secs),
            interval: Duration::from_secs(interval_secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_language_times_out() {
        let handle = build("b1", &[("python", StepStatus::Pending), ("node", StepStatus::Pending)]);
        let service = MockBuildService::new().with_snapshots(vec![build(
            "b1",
            &[
                ("python", completed(with_commit(outcome("success")))),
                ("node", StepStatus::Running),
            ],
        )]);

        let started = Instant::now();
        let result = BuildPoller::new(&service, config(10, 5))
            .poll(&handle)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(
            result.outcomes.keys().collect::<Vec<_>>(),
            vec!["node", "python"]
        );
        assert_eq!(result.outcomes["python"].conclusion, Conclusion::Success);
        assert_eq!(result.outcomes["node"], Outcome::timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_once_all_languages_complete() {
        let handle = build("b1", &[("python", StepStatus::Pending), ("go", StepStatus::Pending)]);
        let service = MockBuildService::new().with_snapshots(vec![
            build("b1", &[("python", StepStatus::Pending), ("go", StepStatus::Pending)]),
            build("b1", &[("python", StepStatus::Pending), ("go", StepStatus::Pending)]),
            build(
                "b1",
                &[
                    ("python", completed(with_commit(outcome("warning")))),
                    ("go", completed(with_commit(outcome("success")))),
                ],
            ),
        ]);

        let started = Instant::now();
        let result = BuildPoller::new(&service, config(600, 5))
            .poll(&handle)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(600));
        assert_eq!(result.outcomes.len(), 2);
        assert!(result.outcomes.values().all(|o| !o.is_unresolved()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_completed_outcome_wins() {
        let handle = build("b1", &[("python", StepStatus::Pending), ("node", StepStatus::Pending)]);
        let service = MockBuildService::new().with_snapshots(vec![
            build(
                "b1",
                &[
                    ("python", completed(with_commit(outcome("success")))),
                    ("node", StepStatus::Pending),
                ],
            ),
            build(
                "b1",
                &[
                    ("python", completed(with_commit(outcome("success")))),
                    ("node", StepStatus::Pending),
                ],
            ),
            build(
                "b1",
                &[
                    ("python", completed(with_commit(outcome("error")))),
                    ("node", completed(with_commit(outcome("note")))),
                ],
            ),
        ]);

        let result = BuildPoller::new(&service, config(60, 1))
            .poll(&handle)
            .await
            .unwrap();

        assert_eq!(result.outcomes["python"].conclusion, Conclusion::Success);
        assert_eq!(result.outcomes["node"].conclusion, Conclusion::Note);
    }

    #[tokio::test(start_paused = true)]
    async fn test_captures_documented_spec_content() {
        let handle = build("b1", &[("python", StepStatus::Pending)]);
        let mut with_url = build("b1", &[("python", StepStatus::Pending)]);
        with_url.documented_spec = Some(DocumentedSpec::Url {
            url: "https://example.com/spec.yml".into(),
        });
        let mut with_content = build("b1", &[("python", completed(with_commit(outcome("success"))))]);
        with_content.documented_spec = Some(DocumentedSpec::Content {
            content: "openapi: 3.1.0".into(),
        });
        let service = MockBuildService::new().with_snapshots(vec![with_url, with_content]);

        let result = BuildPoller::new(&service, config(60, 5))
            .poll(&handle)
            .await
            .unwrap();

        assert_eq!(result.documented_spec.as_deref(), Some("openapi: 3.1.0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_documented_spec_is_ignored() {
        let handle = build("b1", &[("python", StepStatus::Pending)]);
        let mut snapshot = build("b1", &[("python", completed(with_commit(outcome("success"))))]);
        snapshot.documented_spec = Some(DocumentedSpec::Url {
            url: "https://example.com/spec.yml".into(),
        });
        let service = MockBuildService::new().with_snapshots(vec![snapshot]);

        let result = BuildPoller::new(&service, config(60, 5))
            .poll(&handle)
            .await
            .unwrap();
        assert!(result.documented_spec.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_propagate() {
        let handle = build("missing", &[("python", StepStatus::Pending)]);
        let service = MockBuildService::new();

        let result = BuildPoller::new(&service, config(60, 5)).poll(&handle).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_without_languages_finishes_immediately() {
        let handle = build("b1", &[]);
        let service = MockBuildService::new();

        let result = BuildPoller::new(&service, config(60, 5))
            .poll(&handle)
            .await
            .unwrap();
        assert!(result.outcomes.is_empty());
        assert!(service.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_deadline_does_not_overflow() {
        let handle = build("b1", &[("python", StepStatus::Pending)]);
        let service = MockBuildService::new().with_snapshots(vec![build(
            "b1",
            &[("python", completed(with_commit(outcome("success"))))],
        )]);

        let config = PollConfig {
            max_polling: Duration::MAX,
            interval: Duration::from_secs(5),
        };
        let result = BuildPoller::new(&service, config).poll(&handle).await.unwrap();
        assert_eq!(result.outcomes["python"].conclusion, Conclusion::Success);
    }

    #[test]
    fn test_merge_outcome_is_insert_if_absent() {
        let mut outcomes = Outcomes::new();
        assert!(merge_outcome(&mut outcomes, "python", outcome("success")));
        assert!(!merge_outcome(&mut outcomes, "python", outcome("error")));
        assert_eq!(outcomes["python"].conclusion, Conclusion::Success);
    }

    #[test]
    fn test_poll_config_from_settings() {
        let settings = PollingConfig::default();
        assert_eq!(PollConfig::from(&settings), PollConfig::default());

        let busy = PollingConfig {
            interval_seconds: 0,
            ..PollingConfig::default()
        };
        assert_eq!(PollConfig::from(&busy).interval, Duration::from_secs(1));
    }
}
