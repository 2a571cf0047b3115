//! Domain layer: event identity, engagement metrics, scoring and ranking.
//!
//! Everything here is synchronous and free of I/O. The service layer reads
//! rows through [`crate::persistence::EventRepository`] and feeds them
//! through these types.

pub mod clock;
pub mod event;
pub mod event_id;
pub mod metrics;
pub mod ranking;
pub mod scoring;

pub use clock::{Clock, FixedClock, SystemClock};
pub use event::{EventListFilter, EventRecord, EventSort, EventStatus, EventSummary};
pub use event_id::EventId;
pub use metrics::{EngagementCounts, EventMetricsSnapshot, TimeToEvent};
pub use ranking::{EventRanking, RankedEvent, ScoredEvent, assign_ranks};
pub use scoring::{ScoreBreakdown, score, score_breakdown};
