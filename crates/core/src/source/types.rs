//! Types for the source module.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One image available in a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    /// Source-scoped stable key: a filesystem path or a remote file id.
    pub identity: String,
    /// Human-readable file name.
    pub name: String,
    /// Size in bytes at listing time.
    pub size: u64,
    /// Content signature; empty when it could not be determined.
    pub signature: String,
    /// Arrival rank: creation time locally, modification time remotely.
    pub arrival: DateTime<Utc>,
    /// Mime type, when the source reports one.
    pub mime_type: Option<String>,
}

impl SourceItem {
    /// Orders items oldest first, ties broken by identity.
    pub fn sort_by_arrival(items: &mut [SourceItem]) {
        items.sort_by(|a, b| {
            a.arrival
                .cmp(&b.arrival)
                .then_with(|| a.identity.cmp(&b.identity))
        });
    }
}

/// Which source implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Local,
    Drive,
}

/// Source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    /// Directory watched by the local source.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Drive folder watched by the drive source.
    #[serde(default)]
    pub drive_folder_id: Option<String>,

    /// Where drive items are downloaded before processing.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("work/staging")
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            input_dir: default_input_dir(),
            drive_folder_id: None,
            staging_dir: default_staging_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(identity: &str, secs: i64) -> SourceItem {
        SourceItem {
            identity: identity.to_string(),
            name: identity.to_string(),
            size: 1,
            signature: "1:1:1".to_string(),
            arrival: Utc.timestamp_opt(secs, 0).unwrap(),
            mime_type: None,
        }
    }

    #[test]
    fn test_sort_by_arrival_with_identity_tiebreak() {
        let mut items = vec![item("c", 20), item("b", 10), item("a", 10)];
        SourceItem::sort_by_arrival(&mut items);
        let ids: Vec<_> = items.iter().map(|i| i.identity.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_source_config_from_toml() {
        let config: SourceConfig = toml::from_str(
            r#"
kind = "drive"
drive_folder_id = "folder-1"
"#,
        )
        .unwrap();
        assert_eq!(config.kind, SourceKind::Drive);
        assert_eq!(config.drive_folder_id.as_deref(), Some("folder-1"));
        assert_eq!(config.input_dir, PathBuf::from("input"));
    }
}
