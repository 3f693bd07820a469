//! Artifact sinks.
//!
//! A sink receives the composed artifact after the batch is committed.
//! The local sink leaves it in the output directory; the drive sink uploads
//! it to a Drive folder.

mod drive;
mod error;
mod local;
mod traits;
mod types;

pub use drive::DriveSink;
pub use error::SinkError;
pub use local::LocalSink;
pub use traits::Sink;
pub use types::{SinkConfig, SinkKind};
