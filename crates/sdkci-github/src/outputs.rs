//! CI step outputs
//!
//! Values are appended to the file named by `GITHUB_OUTPUT` using the
//! heredoc form, so multi-line JSON survives intact. Outside CI they are
//! printed as `name=value` lines instead.

use sdkci_core::Result;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

const OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Writer for step outputs
#[derive(Debug, Clone, Default)]
pub struct StepOutputs {
    file: Option<PathBuf>,
}

impl StepOutputs {
    /// Outputs go to `GITHUB_OUTPUT` when set, stdout otherwise
    pub fn from_env() -> Self {
        Self {
            file: std::env::var_os(OUTPUT_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
        }
    }

    pub fn stdout() -> Self {
        Self { file: None }
    }

    /// Set a raw string output
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        match &self.file {
            Some(path) => {
                let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                writeln!(file, "{}<<{}", name, delimiter)?;
                writeln!(file, "{}", value)?;
                writeln!(file, "{}", delimiter)?;
                debug!("Set output {}", name);
            }
            None => println!("{}={}", name, value),
        }
        Ok(())
    }

    /// Set an output to the JSON encoding of `value`
    pub fn set_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        self.set(name, &serde_json::to_string(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_outputs_use_heredoc_blocks() {
        let file = NamedTempFile::new().unwrap();
        let outputs = StepOutputs::to_file(file.path());

        outputs.set("documented_spec_path", "/tmp/b1-documented-spec.yml").unwrap();
        let mut outcomes = BTreeMap::new();
        outcomes.insert("python", "success");
        outputs.set_json("outcomes", &outcomes).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 6);

        let (name, delimiter) = lines[0].split_once("<<").unwrap();
        assert_eq!(name, "documented_spec_path");
        assert!(delimiter.starts_with("ghadelimiter_"));
        assert_eq!(lines[1], "/tmp/b1-documented-spec.yml");
        assert_eq!(lines[2], delimiter);

        assert!(lines[3].starts_with("outcomes<<"));
        assert_eq!(lines[4], r#"{"python":"success"}"#);
        assert_ne!(lines[5], delimiter);
    }
}
