use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Config file read when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "autocanvas.toml";

const ENV_PREFIX: &str = "AUTOCANVAS_";

/// Plain environment variables mapped onto config keys.
const STRING_ENV: &[(&str, &str)] = &[
    ("PHOTOROOM_API_KEY", "pipeline.background.api_key"),
    ("GDRIVE_ACCESS_TOKEN", "drive.access_token"),
    ("GDRIVE_INPUT_FOLDER_ID", "source.drive_folder_id"),
    ("GDRIVE_OUTPUT_FOLDER_ID", "sink.drive_folder_id"),
    ("INPUT_DIR", "source.input_dir"),
    ("OUTPUT_PDF_DIR", "sink.output_dir"),
    ("WORK_DIR", "pipeline.work_dir"),
    ("STATE_FILE", "watch.state_file"),
];

/// Load configuration with environment variable overrides.
///
/// An explicit `path` must exist. Without one, `autocanvas.toml` in the
/// working directory is read if present, otherwise defaults apply.
/// Overrides are applied in order: `AUTOCANVAS_*` variables (`__` nests),
/// then the well-known variables such as `PHOTOROOM_API_KEY`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) if !path.exists() => {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            default.exists().then(|| default.to_path_buf())
        }
    };

    let mut figment = Figment::new();
    if let Some(file) = &file {
        figment = figment.merge(Toml::file(file));
    }
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&["config"]));
    figment = merge_well_known(figment, |name| std::env::var(name).ok())?;

    figment
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Merges the well-known variables found by `lookup`.
///
/// Values are merged as strings so that numeric-looking ids stay strings.
fn merge_well_known(
    mut figment: Figment,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Figment, ConfigError> {
    let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    for (name, key) in STRING_ENV {
        if let Some(value) = present(name) {
            figment = figment.merge(Serialized::default(key, value));
        }
    }

    if let Some(value) = present("PHOTOROOM_RETRY_MAX") {
        let attempts: u32 = value.trim().parse().map_err(|_| {
            ConfigError::ParseError(format!("PHOTOROOM_RETRY_MAX is not a number: {}", value))
        })?;
        figment = figment.merge(Serialized::default("pipeline.retry.max_attempts", attempts));
    }

    if let Some(value) = present("PHOTOROOM_RETRY_BACKOFF") {
        let secs: u64 = value.trim().parse().map_err(|_| {
            ConfigError::ParseError(format!("PHOTOROOM_RETRY_BACKOFF is not a number: {}", value))
        })?;
        figment = figment.merge(Serialized::default(
            "pipeline.retry.backoff_ms",
            secs.saturating_mul(1000),
        ));
    }

    Ok(figment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[watch]
batch_size = 4

[pipeline.retry]
max_attempts = 5
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.watch.batch_size, 4);
        assert_eq!(config.pipeline.retry.max_attempts, 5);
    }

    #[test]
    fn test_load_config_from_str_invalid_type() {
        let toml = r#"
[watch]
batch_size = "nine"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Some(Path::new("/nonexistent/autocanvas.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[watch]
poll_interval_ms = 250

[sink]
output_dir = "/srv/pdf"
"#
        )
        .unwrap();

        let config = load_config(Some(temp_file.path())).unwrap();
        assert_eq!(config.watch.poll_interval_ms, 250);
        assert_eq!(config.sink.output_dir, PathBuf::from("/srv/pdf"));
    }

    #[test]
    fn test_well_known_env_overrides_file() {
        let figment = Figment::new().merge(Toml::string(
            r#"
[pipeline.background]
api_key = "from-file"
"#,
        ));
        let figment = merge_well_known(
            figment,
            env(&[
                ("PHOTOROOM_API_KEY", "from-env"),
                ("GDRIVE_INPUT_FOLDER_ID", "12345"),
                ("STATE_FILE", "/var/lib/autocanvas/state.json"),
            ]),
        )
        .unwrap();

        let config: Config = figment.extract().unwrap();
        assert_eq!(
            config.pipeline.background.api_key.as_deref(),
            Some("from-env")
        );
        assert_eq!(config.source.drive_folder_id.as_deref(), Some("12345"));
        assert_eq!(
            config.watch.state_file,
            PathBuf::from("/var/lib/autocanvas/state.json")
        );
    }

    #[test]
    fn test_retry_env_converts_seconds() {
        let figment = merge_well_known(
            Figment::new(),
            env(&[("PHOTOROOM_RETRY_MAX", "5"), ("PHOTOROOM_RETRY_BACKOFF", "2")]),
        )
        .unwrap();

        let config: Config = figment.extract().unwrap();
        assert_eq!(config.pipeline.retry.max_attempts, 5);
        assert_eq!(config.pipeline.retry.backoff_ms, 2000);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let figment = merge_well_known(Figment::new(), env(&[("PHOTOROOM_API_KEY", "  ")])).unwrap();
        let config: Config = figment.extract().unwrap();
        assert!(config.pipeline.background.api_key.is_none());
    }

    #[test]
    fn test_bad_retry_env() {
        let result = merge_well_known(Figment::new(), env(&[("PHOTOROOM_RETRY_MAX", "lots")]));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
