// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Order Engine - Rust Core Library
//!
//! Command orchestration for venue orders whose outcomes arrive
//! asynchronously on a shared event feed.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Pure types and rules
//!   - `order_execution`: Outcome events, call reasons, event classification
//!   - `position`: Entries, direction, restore policies, notifications
//!
//! - **Application**: Orchestration
//!   - `ports`: Venue port, outcome feed, execution context
//!   - `command` / `executor`: Commands and their correlated execution
//!   - `commands`: One command constructor per venue operation
//!   - `batch` / `merge`: Multi-order workflows
//!   - `position`: Per-instrument grouping with a single-flight guard
//!
//! - **Infrastructure**: Adapters
//!   - `venue`: In-process paper venue
//!
//! # Example
//!
//! ```rust,ignore
//! let feed = Arc::new(OutcomeFeed::default());
//! let venue = Arc::new(PaperVenue::new(Arc::clone(&feed)));
//! let commands = OrderCommands::new(venue, RetryPolicy::none());
//! let executor = CommandExecutor::new(feed, ExecutionContext::Blocking);
//!
//! executor.run(commands.close(&order)).finish().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core types with no I/O.
pub mod domain;

/// Application layer - Command orchestration and port definitions.
pub mod application;

/// Infrastructure layer - Adapters.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Error types and codes.
pub mod error;

/// Metrics.
pub mod observability;

/// Logging and trace export.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{
    CallReason, Classification, EventClassification, OrderParams, OrderSide, OrderSnapshot,
    OrderState, OutcomeEvent, OutcomeKind,
};
pub use domain::position::{PositionDirection, PositionEvent, PositionOperation, RestorePolicy};
pub use domain::shared::{InstrumentId, OrderId, Timestamp};

// Application re-exports
pub use application::ports::{ExecutionContext, OutcomeFeed, Venue, VenueError};
pub use application::{
    AdmitOutcome, BatchMode, Command, CommandBuilder, CommandExecutor, CommandStream,
    MergeWorkflow, OrderBatch, OrderCommands, Position, PositionDirectory, PositionOutcome,
    PositionServices, RetryPolicy,
};

// Error re-exports
pub use error::{CommandError, ErrorCode, PositionError};

// Infrastructure re-exports
pub use infrastructure::venue::PaperVenue;
