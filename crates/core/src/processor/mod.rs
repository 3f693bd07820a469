//! Processor module: runs one batch through the stage sequence.
//!
//! The `PipelineRunner` executes `remove-background` -> `add-shadow` ->
//! `compose-artifact` over a batch of local image paths. A failure at any
//! stage aborts the batch; no partial artifact is produced.
//!
//! # Example
//!
//! ```ignore
//! use autocanvas_core::processor::{PipelineConfig, PipelineRunner};
//!
//! let runner = PipelineRunner::from_config(PipelineConfig::default(), "output".as_ref())?;
//! let result = runner.run("batch-1", &paths).await?;
//! println!("Generated PDF: {}", result.artifact.display());
//! ```

mod config;
mod pipeline;
mod types;

pub use crate::stage::RetryConfig;
pub use config::PipelineConfig;
pub use pipeline::{PipelineError, PipelineRunner};
pub use types::PipelineResult;
