//! Pipeline stages.
//!
//! The pipeline runs three stages in fixed order:
//! 1. **remove-background**: external segmentation service (rate limited, retried)
//! 2. **add-shadow**: local image tool
//! 3. **compose-artifact**: local PDF layout, never retried
//!
//! Stage errors carry a [`FailureKind`] that the runner uses to decide
//! between retrying and aborting the batch.

mod background;
mod compose;
mod config;
mod error;
mod retry;
mod shadow;
mod traits;

pub use background::RemoveBackgroundStage;
pub use compose::PdfComposer;
pub use config::{BackgroundConfig, ComposeConfig, ShadowConfig};
pub use error::{FailureKind, StageError};
pub use retry::{with_retry, RetryConfig};
pub use shadow::ShadowStage;
pub use traits::{ComposedArtifact, Composer, ImageStage};
