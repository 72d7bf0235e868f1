//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.

mod identifiers;
mod timestamp;

pub use identifiers::{InstrumentId, OrderId};
pub use timestamp::Timestamp;
