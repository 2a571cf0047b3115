//! Highlight list DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::RankedEvent;

/// Query parameters of `GET /highlights`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HighlightsQuery {
    /// Requested list size; clamped to `[1, max]`. Defaults to the maximum.
    pub limit: Option<i64>,
}

/// Response body of `GET /highlights`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HighlightListResponse {
    /// List size actually applied after clamping.
    pub limit: u32,
    /// Ranked events, best first.
    pub data: Vec<RankedEvent>,
}
