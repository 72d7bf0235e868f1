//! Domain Layer
//!
//! The innermost layer containing business rules with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Events**: Records of venue and position state transitions
//! - **Domain Rules**: Event classification per call reason
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: Venue orders, calls and outcome events
//! - [`position`]: Order groupings, processing state and restore policies

pub mod order_execution;
pub mod position;
pub mod shared;
