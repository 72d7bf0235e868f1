//! Position value objects.

mod direction;
mod entry;
mod restore;

pub use direction::PositionDirection;
pub use entry::{PositionEntry, ProcessingState};
pub use restore::{FixedLevels, NoRestore, RestoreLevels, RestorePolicy};
