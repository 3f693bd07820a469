//! Types for the sink module.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which sink implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Local,
    Drive,
}

/// Sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,

    /// Directory the composed PDFs are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Drive folder artifacts are uploaded to.
    #[serde(default)]
    pub drive_folder_id: Option<String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            output_dir: default_output_dir(),
            drive_folder_id: None,
        }
    }
}
