//! Conventional Commits validation for build commit messages
//!
//! See <https://www.conventionalcommits.org/en/v1.0.0/>.

use regex::Regex;
use std::sync::OnceLock;

static CONVENTIONAL_COMMIT: OnceLock<Regex> = OnceLock::new();

fn conventional_commit_regex() -> &'static Regex {
    CONVENTIONAL_COMMIT.get_or_init(|| {
        Regex::new(
            r"^(build|chore|ci|docs|feat|fix|perf|refactor|revert|style|test)(\(.*\))?(!?): .*$",
        )
        .expect("conventional commit pattern is valid")
    })
}

/// Check whether a message follows the Conventional Commits format
pub fn is_valid_conventional_commit(message: &str) -> bool {
    conventional_commit_regex().is_match(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_messages() {
        assert!(is_valid_conventional_commit("feat: add pagination"));
        assert!(is_valid_conventional_commit("fix(api): handle 404"));
        assert!(is_valid_conventional_commit("feat!: drop v1 endpoints"));
        assert!(is_valid_conventional_commit("chore(deps)!: bump spec"));
    }

    #[test]
    fn test_invalid_messages() {
        assert!(!is_valid_conventional_commit("add pagination"));
        assert!(!is_valid_conventional_commit("feature: add pagination"));
        assert!(!is_valid_conventional_commit("feat:no space"));
        assert!(!is_valid_conventional_commit(""));
    }
}
