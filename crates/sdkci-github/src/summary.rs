//! Plain-text comment bodies

use chrono::{DateTime, Utc};
use sdkci_core::{Conclusion, Outcome, Outcomes};

/// First line of the preview comment
pub const PREVIEW_MARKER: &str = "### SDK Previews";

/// First line of the merge comment
pub const MERGE_MARKER: &str = "### SDK Build Status";

fn describe(outcome: &Outcome) -> String {
    if let Some(commit) = &outcome.commit {
        return format!(
            "{} ({}/{}@{})",
            outcome.conclusion, commit.repo.owner, commit.repo.name, commit.repo.branch
        );
    }
    if let Some(pr) = &outcome.merge_conflict_pr {
        let reason = if outcome.conclusion == Conclusion::UpstreamMergeConflict {
            "conflict on the parent branch"
        } else {
            "merge conflict"
        };
        return format!(
            "{} ({}, resolve {}/{}#{} and re-run)",
            outcome.conclusion, reason, pr.repo.owner, pr.repo.name, pr.number
        );
    }
    outcome.conclusion.to_string()
}

/// Preview comment listing head outcomes next to their base outcomes
pub fn preview_summary(
    outcomes: &Outcomes,
    base_outcomes: Option<&Outcomes>,
    updated_at: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        PREVIEW_MARKER.to_string(),
        format!("Last updated: {}", updated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        String::new(),
    ];

    for (language, outcome) in outcomes {
        let base = match base_outcomes.and_then(|base| base.get(language)) {
            Some(base) => format!("base: {}", base.conclusion),
            None => "base: not found".to_string(),
        };
        lines.push(format!("- {}: {}; {}", language, describe(outcome), base));
    }

    lines.join("\n")
}

/// Merge comment listing the outcome per language
pub fn merge_summary(outcomes: &Outcomes) -> String {
    let mut lines = vec![MERGE_MARKER.to_string(), String::new()];
    lines.extend(
        outcomes
            .iter()
            .map(|(language, outcome)| format!("- {}: {}", language, describe(outcome))),
    );
    lines.join("\n")
}
