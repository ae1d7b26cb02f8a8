//! Git operations used by the CI flows

use crate::command::{GitExecutor, GitOutput};
use sdkci_core::hashing::content_hash;
use sdkci_core::{Result, SdkciError};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// How many times merge-base is retried, deepening the clone in between
pub const MAX_MERGE_BASE_ATTEMPTS: usize = 10;

const DEEPEN_BY: &str = "--deepen=10";

/// Git operations over an executor
pub struct GitRepo<E: GitExecutor> {
    executor: E,
}

impl<E: GitExecutor> GitRepo<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run a command that must succeed, returning its stdout
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.executor.exec(args).await?;
        if !output.success {
            return Err(SdkciError::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    /// Files changed between two revisions
    #[instrument(skip(self))]
    pub async fn changed_files(&self, before: &str, after: &str) -> Result<Vec<String>> {
        let stdout = self.run(&["diff", "--name-only", before, after]).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Whether the spec or config file changed between two revisions
    pub async fn is_config_changed(
        &self,
        before: &str,
        after: &str,
        spec_path: Option<&str>,
        config_path: Option<&str>,
    ) -> Result<bool> {
        let changed_files = self.changed_files(before, after).await?;
        let mut changed = false;

        if let Some(path) = spec_path {
            if changed_files.iter().any(|f| f == normalize(path)) {
                info!("Spec file changed");
                changed = true;
            }
        }

        if let Some(path) = config_path {
            if changed_files.iter().any(|f| f == normalize(path)) {
                info!("Config file changed");
                changed = true;
            }
        }

        Ok(changed)
    }

    /// Common ancestor of two commits on a shallow clone
    ///
    /// Fetches the base commit, then deepens history until `merge-base`
    /// succeeds or the attempts run out.
    #[instrument(skip(self))]
    pub async fn merge_base(&self, base_sha: &str, head_sha: &str) -> Result<String> {
        self.run(&["fetch", "--depth=1", "origin", base_sha]).await?;

        for attempt in 1..=MAX_MERGE_BASE_ATTEMPTS {
            let output: GitOutput = self.executor.exec(&["merge-base", head_sha, base_sha]).await?;
            let merge_base = output.stdout.trim();
            if output.success && !merge_base.is_empty() {
                info!("Merge base: {}", merge_base);
                return Ok(merge_base.to_string());
            }

            debug!(
                "No merge base yet (attempt {}/{}), deepening history",
                attempt, MAX_MERGE_BASE_ATTEMPTS
            );
            self.run(&["fetch", "--quiet", DEEPEN_BY, "origin", base_sha, head_sha])
                .await?;
        }

        Err(SdkciError::Git(
            "Could not determine merge base SHA".to_string(),
        ))
    }

    /// Check out a revision
    #[instrument(skip(self))]
    pub async fn checkout(&self, rev: &str) -> Result<()> {
        self.run(&["checkout", rev]).await?;
        Ok(())
    }

    /// MD5 of a file's content at a revision; `None` if it does not exist there
    pub async fn file_hash_at(&self, rev: &str, path: &str) -> Result<Option<String>> {
        let spec = format!("{}:{}", rev, normalize(path));
        let output = self.executor.exec(&["show", &spec]).await?;
        if !output.success {
            info!("File {} does not exist at {}", path, rev);
            return Ok(None);
        }
        Ok(Some(content_hash(&output.stdout_bytes)))
    }

    /// Hashes of several files at a revision, keyed by logical file name
    ///
    /// `files` pairs a path in the repository with its logical name. Files
    /// missing at `rev` are left out.
    pub async fn file_hashes_at(
        &self,
        rev: &str,
        files: &[(&str, &str)],
    ) -> Result<BTreeMap<String, String>> {
        let mut hashes = BTreeMap::new();
        for (path, logical_name) in files {
            if let Some(hash) = self.file_hash_at(rev, path).await? {
                hashes.insert(logical_name.to_string(), hash);
            }
        }
        Ok(hashes)
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches("./")
}
