//! Order Execution Bounded Context
//!
//! Describes venue orders, the calls made against them and the outcome
//! events the venue reports back asynchronously.
//!
//! # Key Concepts
//!
//! - **Outcome Events**: One event per state transition of one order
//! - **Classification**: Done / Reject / Other buckets per call reason
//! - **Snapshots**: Read-only copies of venue order state

pub mod classification;
pub mod errors;
pub mod events;
pub mod value_objects;

pub use classification::{Classification, EventClassification};
pub use errors::ClassificationError;
pub use events::{OutcomeEvent, OutcomeKind};
pub use value_objects::{
    CallReason, CallRequest, OrderParams, OrderSide, OrderSnapshot, OrderState,
};
