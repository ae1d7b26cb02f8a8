//! Builders shared by the unit tests

use sdkci_core::{
    Build, BuildTarget, Commit, CommitRepo, Conclusion, MergeConflictPr, Outcome, Outcomes,
    PrRepo, StepStatus,
};

pub fn outcome(conclusion: &str) -> Outcome {
    Outcome {
        conclusion: Conclusion::from(conclusion),
        commit: None,
        merge_conflict_pr: None,
    }
}

pub fn with_commit(mut outcome: Outcome) -> Outcome {
    outcome.commit = Some(Commit {
        repo: CommitRepo {
            owner: "acme".into(),
            name: "acme-sdk".into(),
            branch: "preview/feature-x".into(),
        },
        sha: "deadbeef".into(),
    });
    outcome
}

pub fn with_merge_conflict(mut outcome: Outcome) -> Outcome {
    outcome.merge_conflict_pr = Some(MergeConflictPr {
        number: 7,
        repo: PrRepo {
            owner: "acme".into(),
            name: "acme-sdk".into(),
        },
    });
    outcome
}

pub fn outcomes<const N: usize>(entries: [(&str, Outcome); N]) -> Outcomes {
    entries
        .into_iter()
        .map(|(language, outcome)| (language.to_string(), outcome))
        .collect()
}

pub fn completed(outcome: Outcome) -> StepStatus {
    StepStatus::Completed { completed: outcome }
}

/// Build with the given commit step state per language
pub fn build(id: &str, targets: &[(&str, StepStatus)]) -> Build {
    Build {
        id: id.to_string(),
        config_commit: format!("cfg_{}", id),
        targets: targets
            .iter()
            .map(|(language, status)| {
                (language.to_string(), BuildTarget::with_commit(status.clone()))
            })
            .collect(),
        ..Default::default()
    }
}
