//! Core projection trait and progress tracking.

use async_trait::async_trait;
use event_channel::EventEnvelope;

use crate::Result;

/// How far a projection has got, counting redeliveries separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    /// Events that changed the read model.
    pub events_applied: u64,
    /// Events recognised as already applied and ignored.
    pub duplicates_skipped: u64,
}

impl ProjectionPosition {
    /// Creates a new position at zero.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Records one applied event.
    pub fn applied(&self) -> Self {
        Self {
            events_applied: self.events_applied + 1,
            ..*self
        }
    }

    /// Records one ignored redelivery.
    pub fn skipped(&self) -> Self {
        Self {
            duplicates_skipped: self.duplicates_skipped + 1,
            ..*self
        }
    }

    /// Total events seen, duplicates included.
    pub fn events_seen(&self) -> u64 {
        self.events_applied + self.duplicates_skipped
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "position(applied={}, skipped={})",
            self.events_applied, self.duplicates_skipped
        )
    }
}

/// A projection that folds events into a read model.
///
/// Events arrive at least once, so `handle` must tolerate seeing the same
/// envelope again without double-counting it. Events the projection does
/// not care about are ignored without touching its position.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Returns the name of this projection.
    fn name(&self) -> &'static str;

    /// Handles a single event, updating the projection's read model.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    /// Returns the current position of this projection.
    async fn position(&self) -> ProjectionPosition;

    /// Resets the projection to its initial state.
    async fn reset(&self) -> Result<()>;
}
