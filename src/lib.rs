pub mod bootstrap;
pub mod config;
pub mod decoder;
pub mod error;
pub mod events;
pub mod filter;
pub mod metadata;
pub mod models;
pub mod monitor;
pub mod reporter;
pub mod rpc;
pub mod source;

#[cfg(test)]
mod testing;

pub use decoder::{DecimalsConfig, ScaleFactor, TransferDecoder, decode};
pub use error::{DecodeError, MonitorError, RpcError};
pub use filter::EventFilter;
pub use models::{RawLogEntry, TransferKind, TransferRecord};
pub use monitor::{CancelHandle, CancelSignal, Monitor, MonitorState, RunSummary, Termination};
pub use reporter::{ConsoleReporter, OutputFormat, Reporter};
pub use rpc::{ChainClient, EntryStream, RpcClient};
pub use source::{HistoricalRange, LiveSubscription, LogSource, LogStream, ReconnectPolicy};
