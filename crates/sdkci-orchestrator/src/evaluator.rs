//! Result evaluation against a failure threshold

use sdkci_core::{Conclusion, Language, Outcome, Outcomes};
use tracing::info;

/// Threshold at which a run fails, from most to least permissive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailOn {
    Never,
    #[default]
    Error,
    Warning,
    Note,
}

impl FailOn {
    /// Whether a single outcome fails at this threshold
    pub fn fails(&self, outcome: &Outcome) -> bool {
        if *self == Self::Never {
            return false;
        }
        // No commit and no merge conflict PR: timed out or otherwise unresolved.
        if outcome.is_unresolved() {
            return true;
        }
        match outcome.conclusion {
            Conclusion::Error => true,
            Conclusion::Warning => *self >= Self::Warning,
            Conclusion::Note => *self >= Self::Note,
            _ => false,
        }
    }
}

impl std::fmt::Display for FailOn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Note => write!(f, "note"),
        }
    }
}

impl std::str::FromStr for FailOn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "note" => Ok(Self::Note),
            _ => Err(format!(
                "Invalid fail_on value: {}. Use never, error, warning, or note.",
                s
            )),
        }
    }
}

/// Languages whose outcome fails at the given threshold
pub fn failing_languages(outcomes: &Outcomes, fail_on: FailOn) -> Vec<Language> {
    outcomes
        .iter()
        .filter(|(_, outcome)| fail_on.fails(outcome))
        .map(|(language, _)| language.clone())
        .collect()
}

/// Pass/fail verdict for a set of outcomes; `false` means the run should fail
pub fn check_results(outcomes: &Outcomes, fail_on: FailOn) -> bool {
    let failed = failing_languages(outcomes, fail_on);
    if failed.is_empty() {
        return true;
    }

    info!(
        "The following languages did not build successfully: {}",
        failed.join(", ")
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{outcome, outcomes, with_commit, with_merge_conflict};

    const ALL: [FailOn; 4] = [FailOn::Never, FailOn::Error, FailOn::Warning, FailOn::Note];

    #[test]
    fn test_never_always_passes() {
        let set = outcomes([
            ("python", Outcome::timed_out()),
            ("node", with_commit(outcome("error"))),
            ("go", outcome("fatal")),
        ]);
        assert!(check_results(&set, FailOn::Never));
    }

    #[test]
    fn test_unresolved_fails_every_threshold_but_never() {
        let set = outcomes([("python", Outcome::timed_out())]);
        for fail_on in ALL {
            assert_eq!(check_results(&set, fail_on), fail_on == FailOn::Never);
        }

        let success_without_commit = outcomes([("python", outcome("success"))]);
        assert!(!check_results(&success_without_commit, FailOn::Error));
    }

    #[test]
    fn test_merge_conflict_reference_counts_as_resolved() {
        let set = outcomes([("python", with_merge_conflict(outcome("merge_conflict")))]);
        assert!(check_results(&set, FailOn::Note));
    }

    #[test]
    fn test_warning_threshold_fails_on_warning() {
        let set = outcomes([
            ("a", with_commit(outcome("warning"))),
            ("b", with_commit(outcome("success"))),
        ]);
        assert!(!check_results(&set, FailOn::Warning));
        assert!(check_results(&set, FailOn::Error));
        assert_eq!(failing_languages(&set, FailOn::Warning), vec!["a".to_string()]);
    }

    #[test]
    fn test_note_threshold() {
        let set = outcomes([("a", with_commit(outcome("note")))]);
        assert!(check_results(&set, FailOn::Error));
        assert!(check_results(&set, FailOn::Warning));
        assert!(!check_results(&set, FailOn::Note));
    }

    #[test]
    fn test_thresholds_are_monotonic() {
        let conclusions = ["success", "error", "warning", "note", "fatal", "noop"];
        for conclusion in conclusions {
            for resolved in [true, false] {
                let o = if resolved {
                    with_commit(outcome(conclusion))
                } else {
                    outcome(conclusion)
                };
                let set = outcomes([("lang", o)]);
                let verdicts: Vec<bool> = ALL.iter().map(|f| check_results(&set, *f)).collect();
                // Once a threshold fails, every stricter one fails too.
                for pair in verdicts.windows(2) {
                    assert!(pair[0] || !pair[1], "{} resolved={}", conclusion, resolved);
                }
            }
        }
    }

    #[test]
    fn test_fail_on_parsing() {
        assert_eq!("warning".parse::<FailOn>().unwrap(), FailOn::Warning);
        assert_eq!("NEVER".parse::<FailOn>().unwrap(), FailOn::Never);
        assert!("sometimes".parse::<FailOn>().is_err());
        assert_eq!(FailOn::default(), FailOn::Error);
        assert_eq!(FailOn::Note.to_string(), "note");
    }
}
