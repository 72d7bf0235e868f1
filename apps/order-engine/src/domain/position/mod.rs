//! Position Bounded Context
//!
//! Types describing a logical grouping of venue orders (one per
//! instrument) and the structural operations run against it:
//! - Entry membership and Idle/Active processing state
//! - Net direction of the filled exposure
//! - Protective-price restore policies for merges
//! - Notifications published by a position

pub mod events;
pub mod value_objects;

pub use events::{PositionEvent, PositionOperation};
pub use value_objects::{
    FixedLevels, NoRestore, PositionDirection, PositionEntry, ProcessingState, RestoreLevels,
    RestorePolicy,
};
