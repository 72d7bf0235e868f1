//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driven Ports** (Secondary/Outbound): the venue call surface
//! - **In-process collaborators**: the shared outcome feed and the
//!   execution context venue calls run on

mod execution_context;
mod outcome_feed;
mod venue_port;

pub use execution_context::{ExecutionContext, VenueAction};
pub use outcome_feed::{DEFAULT_FEED_CAPACITY, OutcomeFeed};
pub use venue_port::{Venue, VenueError};
