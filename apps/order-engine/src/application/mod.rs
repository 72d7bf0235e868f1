//! Application Layer
//!
//! Orchestrates venue calls whose outcomes arrive asynchronously:
//!
//! - **Ports**: The venue interface, the shared outcome feed and the
//!   execution context venue calls run on
//! - **Command**: Immutable commands and their builder
//! - **Executor**: Correlates a command's call with its outcome events
//! - **Commands**: One command constructor per venue operation
//! - **Batch / Merge**: Multi-order workflows composed from commands
//! - **Position**: Per-instrument order grouping with a single-flight guard

pub mod batch;
pub mod command;
pub mod commands;
pub mod executor;
pub mod merge;
pub mod ports;
pub mod position;

pub use batch::{BatchMode, OrderBatch};
pub use command::{Command, CommandBuilder, RetryPolicy};
pub use commands::OrderCommands;
pub use executor::{CommandExecutor, CommandStream};
pub use merge::{MergeStream, MergeWorkflow};
pub use position::{
    AdmitOutcome, Position, PositionDirectory, PositionOutcome, PositionServices,
};
