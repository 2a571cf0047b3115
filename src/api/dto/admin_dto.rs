//! Cache and ranking administration DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::{PassOutcome, RecomputeReport};

/// Request body of `POST /cache/invalidate`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvalidatePatternRequest {
    /// Key prefix, e.g. `highlights` or `events:list`.
    pub prefix: String,
}

/// Response body of `POST /rankings/recalculate`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecalculateResponse {
    /// `completed`, or `skipped` when a pass was already running.
    pub status: String,
    /// Report of the pass, when it ran.
    pub report: Option<RecomputeReport>,
}

impl From<PassOutcome> for RecalculateResponse {
    fn from(outcome: PassOutcome) -> Self {
        match outcome {
            PassOutcome::Completed(report) => Self {
                status: "completed".to_string(),
                report: Some(report),
            },
            PassOutcome::Skipped => Self {
                status: "skipped".to_string(),
                report: None,
            },
        }
    }
}
