//! Ingestion sources.
//!
//! A source lists the items currently available in arrival order and can
//! materialize an item as a local file. Two implementations exist:
//! - [`LocalDirectorySource`]: images in a local directory, ordered by creation time
//! - [`DriveSource`]: images in a Drive folder, ordered by modification time
//!
//! The watcher only sees the [`Source`] trait; the concrete source is picked
//! at startup from configuration.

mod drive;
mod error;
mod local;
pub mod signature;
mod traits;
mod types;

pub use drive::DriveSource;
pub use error::SourceError;
pub use local::{is_image_path, LocalDirectorySource, IMAGE_EXTENSIONS};
pub use traits::Source;
pub use types::{SourceConfig, SourceItem, SourceKind};
