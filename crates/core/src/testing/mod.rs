//! Testing utilities and mock implementations.
//!
//! Mocks for every seam of the watcher, so batching, ledger and failure
//! handling can be exercised without a segmentation service, an image tool
//! or a Drive account.
//!
//! # Example
//!
//! ```rust,ignore
//! use autocanvas_core::testing::{MockComposer, MockSink, MockSource, MockStage};
//!
//! let source = MockSource::new();
//! source.add_items(9).await;
//!
//! let stage = MockStage::new("remove-background");
//! stage.fail_on_call(5, StageError::from_status("remove-background", 402, "quota")).await;
//! ```

mod mock_sink;
mod mock_source;
mod mock_stage;

pub use mock_sink::MockSink;
pub use mock_source::MockSource;
pub use mock_stage::{MockComposer, MockStage};
