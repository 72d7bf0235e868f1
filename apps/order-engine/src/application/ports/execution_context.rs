//! Execution Context
//!
//! Where blocking venue calls run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::venue_port::VenueError;
use crate::domain::shared::OrderId;

/// A blocking venue call returning the identity of the order it targets.
pub type VenueAction = Arc<dyn Fn() -> Result<OrderId, VenueError> + Send + Sync>;

/// Execution strategy for venue actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContext {
    /// Run on tokio's blocking pool.
    #[default]
    Blocking,
    /// Run on the calling task. Only for venues whose calls never block.
    Inline,
}

impl ExecutionContext {
    /// Run `action` and return its result.
    ///
    /// A call already handed to the blocking pool is not interrupted when
    /// the returned future is dropped.
    pub async fn run(self, action: VenueAction) -> Result<OrderId, VenueError> {
        match self {
            Self::Inline => action(),
            Self::Blocking => tokio::task::spawn_blocking(move || action())
                .await
                .unwrap_or_else(|e| {
                    Err(VenueError::Unknown {
                        message: format!("Venue call did not complete: {e}"),
                    })
                }),
        }
    }
}
