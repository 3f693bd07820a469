use super::{types::Config, ConfigError};
use crate::sink::SinkKind;
use crate::source::SourceKind;

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

fn missing(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Validate configuration
/// Rejects settings the watcher cannot start with: zero batch size,
/// a stability sample longer than the window, a zero retry budget,
/// missing credentials and an empty page grid.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let watch = &config.watch;
    if watch.batch_size == 0 {
        return Err(invalid("watch.batch_size cannot be 0"));
    }
    if watch.stability_sample_ms > watch.stability_window_ms {
        return Err(invalid(
            "watch.stability_sample_ms cannot exceed watch.stability_window_ms",
        ));
    }

    let pipeline = &config.pipeline;
    if pipeline.retry.max_attempts == 0 {
        return Err(invalid("pipeline.retry.max_attempts cannot be 0"));
    }
    if missing(&pipeline.background.api_key) {
        return Err(invalid(
            "pipeline.background.api_key is required (or set PHOTOROOM_API_KEY)",
        ));
    }
    if pipeline.compose.columns == 0 || pipeline.compose.rows == 0 {
        return Err(invalid("pipeline.compose grid needs at least one row and column"));
    }

    if config.source.kind == SourceKind::Drive && missing(&config.source.drive_folder_id) {
        return Err(invalid(
            "source.drive_folder_id is required for the drive source (or set GDRIVE_INPUT_FOLDER_ID)",
        ));
    }
    if config.sink.kind == SinkKind::Drive && missing(&config.sink.drive_folder_id) {
        return Err(invalid(
            "sink.drive_folder_id is required for the drive sink (or set GDRIVE_OUTPUT_FOLDER_ID)",
        ));
    }
    if config.uses_drive() && missing(&config.drive.access_token) {
        return Err(invalid(
            "drive.access_token is required when Drive is used (or set GDRIVE_ACCESS_TOKEN)",
        ));
    }

    Ok(())
}
