//! Configuration for the processor module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::stage::{BackgroundConfig, ComposeConfig, RetryConfig, ShadowConfig};

/// Configuration for the processing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory for intermediate files; each batch gets a subdirectory.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Keep intermediate files after a successful batch.
    #[serde(default)]
    pub keep_work_files: bool,

    /// Retry policy for external-service stages.
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub background: BackgroundConfig,

    #[serde(default)]
    pub shadow: ShadowConfig,

    #[serde(default)]
    pub compose: ComposeConfig,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("work")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            keep_work_files: false,
            retry: RetryConfig::default(),
            background: BackgroundConfig::default(),
            shadow: ShadowConfig::default(),
            compose: ComposeConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Sets the work directory.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Keeps intermediate files after success.
    pub fn with_keep_work_files(mut self, keep: bool) -> Self {
        self.keep_work_files = keep;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.work_dir, PathBuf::from("work"));
        assert!(!config.keep_work_files);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff_ms, 5_000);
    }

    #[test]
    fn test_builder_methods() {
        let config = PipelineConfig::default()
            .with_work_dir("/tmp/w")
            .with_retry(RetryConfig::default().with_max_attempts(5))
            .with_keep_work_files(true);

        assert_eq!(config.work_dir, PathBuf::from("/tmp/w"));
        assert_eq!(config.retry.max_attempts, 5);
        assert!(config.keep_work_files);
    }

    #[test]
    fn test_nested_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
work_dir = "/var/autocanvas/work"

[retry]
max_attempts = 4

[background]
api_key = "sk-live"

[compose]
columns = 2
"#,
        )
        .unwrap();

        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.backoff_ms, 5_000);
        assert_eq!(config.background.api_key.as_deref(), Some("sk-live"));
        assert_eq!(config.compose.columns, 2);
        assert_eq!(config.compose.rows, 3);
    }
}
