//! Content signatures.
//!
//! A signature is a cheap fingerprint of an item's content derived from its
//! metadata. It changes when a file is truncated, rewritten or replaced under
//! the same name. An empty signature means "unknown": the item vanished
//! while it was being inspected.

use std::fs::Metadata;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

/// Signature of a local file: `size:mtime:ctime` in whole seconds.
pub fn local_signature(meta: &Metadata) -> String {
    let mtime = meta.modified().map(epoch_secs).unwrap_or(0);
    format!("{}:{}:{}", meta.len(), mtime, change_time_secs(meta))
}

/// Signature of the file at `path`, or an empty string if it cannot be read.
pub async fn signature_of(path: &Path) -> String {
    match tokio::fs::metadata(path).await {
        Ok(meta) => local_signature(&meta),
        Err(_) => String::new(),
    }
}

/// Signature of a remote file: `size:version`.
///
/// Empty when the remote reports neither.
pub fn remote_signature(size: Option<u64>, version: Option<&str>) -> String {
    match (size, version) {
        (None, None) => String::new(),
        (size, version) => format!(
            "{}:{}",
            size.map(|s| s.to_string()).unwrap_or_default(),
            version.unwrap_or_default()
        ),
    }
}

/// Arrival time of a local file: birth time where the platform records
/// one, modification time otherwise.
pub fn arrival_time(meta: &Metadata) -> DateTime<Utc> {
    let time = meta
        .created()
        .or_else(|_| meta.modified())
        .unwrap_or(UNIX_EPOCH);
    DateTime::<Utc>::from(time)
}

fn epoch_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

#[cfg(unix)]
fn change_time_secs(meta: &Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.ctime()
}

#[cfg(not(unix))]
fn change_time_secs(meta: &Metadata) -> i64 {
    meta.created().map(epoch_secs).unwrap_or(0)
}
