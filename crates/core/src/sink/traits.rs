//! Trait definitions for sinks.

use std::path::Path;

use async_trait::async_trait;

use super::error::SinkError;

/// Destination for composed artifacts.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Returns the name of this sink implementation.
    fn name(&self) -> &str;

    /// Publishes the artifact and returns an identifier for it.
    async fn publish(&self, artifact: &Path) -> Result<String, SinkError>;
}
