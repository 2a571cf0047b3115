//! # event-ranking
//!
//! Popularity ranking and cache-aside read layer for an event discovery
//! platform.
//!
//! A periodic job scores every published event from its engagement
//! counters (registrations, views, likes, shares, favorites), how soon it
//! starts and how recently it was created, then persists contiguous rank
//! positions. Read endpoints (top-N highlights, per-event ranking, filtered
//! event lists) are served through a TTL cache that write paths and the
//! job invalidate by key prefix.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── EventReadService ── CacheLayer ── CacheStore (cache/)
//!     ├── RankingJob ◄── RankingScheduler (scheduler)
//!     │      └── MetricsReader, scoring, rank assignment (service/, domain/)
//!     │
//!     └── EventRepository (persistence/)
//!            ├── PostgreSQL
//!            └── in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod scheduler;
pub mod service;
