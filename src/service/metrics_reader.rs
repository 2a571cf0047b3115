//! Per-event metrics snapshots for a ranking pass.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{EventMetricsSnapshot, EventRecord};
use crate::error::RankingError;
use crate::persistence::EventRepository;

/// Reads engagement counters and derives time-to-event facts.
///
/// Pure read: nothing is written and nothing is cached.
#[derive(Debug, Clone)]
pub struct MetricsReader {
    repository: Arc<dyn EventRepository>,
}

impl MetricsReader {
    /// Creates a reader over `repository`.
    #[must_use]
    pub fn new(repository: Arc<dyn EventRepository>) -> Self {
        Self { repository }
    }

    /// Builds the metrics snapshot of `event` relative to the pass's `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] when the counters cannot be
    /// read.
    pub async fn snapshot(
        &self,
        event: &EventRecord,
        now: DateTime<Utc>,
    ) -> Result<EventMetricsSnapshot, RankingError> {
        let counts = self.repository.engagement_counts(event.id).await?;
        Ok(EventMetricsSnapshot::new(event, counts, now))
    }
}
