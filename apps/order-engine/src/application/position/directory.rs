//! One position per instrument.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::{Position, PositionOutcome, PositionServices};
use crate::domain::shared::InstrumentId;
use crate::error::PositionError;

/// Creates positions lazily and keeps them keyed by instrument.
#[derive(Debug)]
pub struct PositionDirectory {
    services: PositionServices,
    notification_capacity: usize,
    sweep_interval: Option<Duration>,
    positions: RwLock<HashMap<InstrumentId, Arc<Position>>>,
}

impl PositionDirectory {
    /// Create an empty directory.
    ///
    /// Positions created by it start a sweeper when `sweep_interval` is set.
    #[must_use]
    pub fn new(
        services: PositionServices,
        notification_capacity: usize,
        sweep_interval: Option<Duration>,
    ) -> Self {
        Self {
            services,
            notification_capacity,
            sweep_interval,
            positions: RwLock::new(HashMap::new()),
        }
    }

    /// The position for `instrument`, created on first use.
    ///
    /// Must be called within a Tokio runtime.
    pub fn position(&self, instrument: &InstrumentId) -> Arc<Position> {
        if let Some(position) = self.get(instrument) {
            return position;
        }

        let mut positions = self
            .positions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let position = positions.entry(instrument.clone()).or_insert_with(|| {
            let position = Arc::new(Position::with_notification_capacity(
                instrument.clone(),
                self.services.clone(),
                self.notification_capacity,
            ));
            if let Some(period) = self.sweep_interval {
                position.spawn_sweeper(period);
            }
            tracing::debug!(instrument = %instrument, "Position created");
            position
        });
        Arc::clone(position)
    }

    /// The position for `instrument`, if one exists.
    #[must_use]
    pub fn get(&self, instrument: &InstrumentId) -> Option<Arc<Position>> {
        self.positions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(instrument)
            .cloned()
    }

    /// Forget the position for `instrument`.
    pub fn remove(&self, instrument: &InstrumentId) -> Option<Arc<Position>> {
        self.positions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(instrument)
    }

    /// Instruments with a position, sorted.
    #[must_use]
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut instruments: Vec<_> = self
            .positions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        instruments.sort();
        instruments
    }

    /// Close every position concurrently.
    pub async fn close_all(&self) -> Vec<(InstrumentId, Result<PositionOutcome, PositionError>)> {
        let positions = self.all();
        let closes = positions.iter().map(|position| async move {
            (position.instrument().clone(), position.close().await)
        });
        futures::future::join_all(closes).await
    }

    /// Merge every position concurrently, naming each merged order with
    /// `label_for(instrument)`.
    pub async fn merge_all<F>(
        &self,
        label_for: F,
    ) -> Vec<(InstrumentId, Result<PositionOutcome, PositionError>)>
    where
        F: Fn(&InstrumentId) -> String,
    {
        let positions = self.all();
        let merges = positions.iter().map(|position| {
            let label = label_for(position.instrument());
            async move { (position.instrument().clone(), position.merge(&label).await) }
        });
        futures::future::join_all(merges).await
    }

    fn all(&self) -> Vec<Arc<Position>> {
        self.instruments()
            .iter()
            .filter_map(|instrument| self.get(instrument))
            .collect()
    }
}
