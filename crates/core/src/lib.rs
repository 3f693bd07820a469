pub mod config;
pub mod drive;
pub mod ledger;
pub mod orchestrator;
pub mod processor;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod stability;
pub mod stage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use ledger::{Ledger, LedgerError, StateStore};
pub use orchestrator::{BatchReport, BatchWatcher, TickOutcome, WatchConfig, WatchError};
pub use processor::{PipelineConfig, PipelineError, PipelineResult, PipelineRunner};
pub use sink::{DriveSink, LocalSink, Sink, SinkKind};
pub use source::{DriveSource, LocalDirectorySource, Source, SourceItem, SourceKind};
