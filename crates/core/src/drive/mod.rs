//! Google Drive REST client shared by the drive source and the drive sink.

mod client;
mod types;

pub use client::DriveClient;
pub(crate) use types::extension_for;
pub use types::{DriveConfig, DriveError, DriveFile, FileList};
