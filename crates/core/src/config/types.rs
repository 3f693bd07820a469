use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::drive::DriveConfig;
use crate::orchestrator::WatchConfig;
use crate::processor::{PipelineConfig, RetryConfig};
use crate::sink::{SinkConfig, SinkKind};
use crate::source::{SourceConfig, SourceKind};
use crate::stage::{ComposeConfig, ShadowConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub drive: DriveConfig,
}

impl Config {
    /// Whether any configured component talks to Drive.
    pub fn uses_drive(&self) -> bool {
        self.source.kind == SourceKind::Drive || self.sink.kind == SinkKind::Drive
    }
}

/// Sanitized config for display (secrets reported as configured/missing)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub watch: WatchConfig,
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub pipeline: SanitizedPipelineConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive: Option<SanitizedDriveConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPipelineConfig {
    pub work_dir: PathBuf,
    pub keep_work_files: bool,
    pub retry: RetryConfig,
    pub background_endpoint: String,
    pub background_api_key_configured: bool,
    /// Shadow settings, or `None` when the stage is disabled.
    pub shadow: Option<ShadowConfig>,
    pub compose: ComposeConfig,
}

/// Sanitized Drive config (access token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDriveConfig {
    pub api_url: String,
    pub access_token_configured: bool,
    pub timeout_secs: u64,
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let pipeline = &config.pipeline;
        Self {
            watch: config.watch.clone(),
            source: config.source.clone(),
            sink: config.sink.clone(),
            pipeline: SanitizedPipelineConfig {
                work_dir: pipeline.work_dir.clone(),
                keep_work_files: pipeline.keep_work_files,
                retry: pipeline.retry.clone(),
                background_endpoint: pipeline.background.endpoint.clone(),
                background_api_key_configured: is_set(&pipeline.background.api_key),
                shadow: pipeline
                    .shadow
                    .enabled
                    .then(|| pipeline.shadow.clone()),
                compose: pipeline.compose.clone(),
            },
            drive: config.uses_drive().then(|| SanitizedDriveConfig {
                api_url: config.drive.api_url.clone(),
                access_token_configured: is_set(&config.drive.access_token),
                timeout_secs: config.drive.timeout_secs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.watch.batch_size, 9);
        assert_eq!(config.source.kind, SourceKind::Local);
        assert_eq!(config.sink.output_dir, PathBuf::from("output"));
        assert_eq!(config.pipeline.compose.per_page(), 9);
        assert!(!config.uses_drive());
    }

    #[test]
    fn test_deserialize_drive_config() {
        let toml = r#"
[source]
kind = "drive"
drive_folder_id = "in-folder"

[sink]
kind = "drive"
drive_folder_id = "out-folder"

[drive]
access_token = "ya29.token"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.source.kind, SourceKind::Drive);
        assert_eq!(config.sink.drive_folder_id.as_deref(), Some("out-folder"));
        assert!(config.uses_drive());
    }

    #[test]
    fn test_unknown_source_kind_fails() {
        let toml = r#"
[source]
kind = "ftp"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let mut config = Config::default();
        config.pipeline.background.api_key = Some("sk-secret".to_string());
        config.source.kind = SourceKind::Drive;
        config.drive.access_token = Some("ya29.secret".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.pipeline.background_api_key_configured);
        assert!(sanitized.drive.as_ref().unwrap().access_token_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(!json.contains("ya29.secret"));
    }

    #[test]
    fn test_sanitized_config_local_omits_drive() {
        let mut config = Config::default();
        config.pipeline.shadow.enabled = false;

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.drive.is_none());
        assert!(sanitized.pipeline.shadow.is_none());
        assert!(!sanitized.pipeline.background_api_key_configured);
    }
}
