//! PostgreSQL implementation of [`EventRepository`].
//!
//! Reads the events subsystem's tables (`events`, `registrations`,
//! `event_views`, `event_likes`, `event_shares`, `event_favorites`) and owns
//! `event_rankings` (see `migrations/`).

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::EventRepository;
use super::models::{EventRow, EventSummaryRow, RankedEventRow, to_bigint, to_count};
use crate::domain::{
    EngagementCounts, EventId, EventListFilter, EventRanking, EventRecord, EventSort, EventStatus,
    EventSummary, RankedEvent,
};
use crate::error::RankingError;

const RANKED_EVENT_COLUMNS: &str = "r.event_id, e.title, e.city, e.event_date, r.score, \
     r.registration_count, r.view_count, r.like_count, r.share_count, r.favorite_count, \
     r.days_until_event, r.hours_until_event, r.rank_position, r.calculated_at";

/// PostgreSQL-backed repository using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    /// Creates a repository over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the crate's migrations (creates `event_rankings`).
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), RankingError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RankingError::DataSource(e.to_string()))
    }
}

fn data_source(err: sqlx::Error) -> RankingError {
    RankingError::DataSource(err.to_string())
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn list_eligible_events(&self) -> Result<Vec<EventRecord>, RankingError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT id, title, city, status, event_date, event_time, created_at \
             FROM events WHERE status = $1 ORDER BY id ASC",
        )
        .bind(EventStatus::Published.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(data_source)?;

        rows.into_iter().map(EventRecord::try_from).collect()
    }

    async fn engagement_counts(&self, event_id: EventId) -> Result<EngagementCounts, RankingError> {
        let (registrations, views, likes, shares, favorites) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                "SELECT \
                   (SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status <> 'cancelled'), \
                   (SELECT COUNT(*) FROM event_views WHERE event_id = $1), \
                   (SELECT COUNT(*) FROM event_likes WHERE event_id = $1), \
                   (SELECT COUNT(*) FROM event_shares WHERE event_id = $1), \
                   (SELECT COUNT(*) FROM event_favorites WHERE event_id = $1)",
            )
            .bind(event_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(data_source)?;

        Ok(EngagementCounts {
            registrations: to_count(registrations),
            views: to_count(views),
            likes: to_count(likes),
            shares: to_count(shares),
            favorites: to_count(favorites),
        })
    }

    async fn upsert_ranking(&self, ranking: &EventRanking) -> Result<(), RankingError> {
        sqlx::query(
            "INSERT INTO event_rankings (event_id, score, registration_count, view_count, \
               like_count, share_count, favorite_count, days_until_event, hours_until_event, \
               rank_position, calculated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (event_id) DO UPDATE SET \
               score = EXCLUDED.score, \
               registration_count = EXCLUDED.registration_count, \
               view_count = EXCLUDED.view_count, \
               like_count = EXCLUDED.like_count, \
               share_count = EXCLUDED.share_count, \
               favorite_count = EXCLUDED.favorite_count, \
               days_until_event = EXCLUDED.days_until_event, \
               hours_until_event = EXCLUDED.hours_until_event, \
               rank_position = EXCLUDED.rank_position, \
               calculated_at = EXCLUDED.calculated_at",
        )
        .bind(ranking.event_id.get())
        .bind(ranking.score)
        .bind(to_bigint(ranking.registration_count))
        .bind(to_bigint(ranking.view_count))
        .bind(to_bigint(ranking.like_count))
        .bind(to_bigint(ranking.share_count))
        .bind(to_bigint(ranking.favorite_count))
        .bind(ranking.days_until_event)
        .bind(ranking.hours_until_event)
        .bind(i32::try_from(ranking.rank_position).unwrap_or(i32::MAX))
        .bind(ranking.calculated_at)
        .execute(&self.pool)
        .await
        .map_err(data_source)?;

        Ok(())
    }

    async fn prune_rankings(&self, keep: &[EventId]) -> Result<u64, RankingError> {
        let keep: Vec<i64> = keep.iter().map(|id| id.get()).collect();
        let result = sqlx::query("DELETE FROM event_rankings WHERE NOT (event_id = ANY($1))")
            .bind(keep)
            .execute(&self.pool)
            .await
            .map_err(data_source)?;

        Ok(result.rows_affected())
    }

    async fn top_rankings(&self, limit: u32) -> Result<Vec<RankedEvent>, RankingError> {
        let rows = sqlx::query_as::<_, RankedEventRow>(&format!(
            "SELECT {RANKED_EVENT_COLUMNS} FROM event_rankings r \
             JOIN events e ON e.id = r.event_id \
             WHERE e.status = $1 \
             ORDER BY r.rank_position ASC LIMIT $2"
        ))
        .bind(EventStatus::Published.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(data_source)?;

        Ok(rows.into_iter().map(RankedEvent::from).collect())
    }

    async fn ranking_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<RankedEvent>, RankingError> {
        let row = sqlx::query_as::<_, RankedEventRow>(&format!(
            "SELECT {RANKED_EVENT_COLUMNS} FROM event_rankings r \
             JOIN events e ON e.id = r.event_id \
             WHERE r.event_id = $1"
        ))
        .bind(event_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(data_source)?;

        Ok(row.map(RankedEvent::from))
    }

    async fn list_events(
        &self,
        filter: &EventListFilter,
    ) -> Result<Vec<EventSummary>, RankingError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT e.id, e.title, e.city, e.status, e.event_date, e.event_time, e.created_at, \
             r.score, r.rank_position \
             FROM events e LEFT JOIN event_rankings r ON r.event_id = e.id WHERE TRUE",
        );
        if let Some(status) = filter.status {
            qb.push(" AND e.status = ").push_bind(status.as_str());
        }
        if let Some(city) = &filter.city {
            qb.push(" AND LOWER(e.city) = LOWER(")
                .push_bind(city.clone())
                .push(")");
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND e.event_date >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND e.event_date <= ").push_bind(to);
        }
        if let Some(search) = &filter.search {
            qb.push(" AND e.title ILIKE ")
                .push_bind(format!("%{}%", escape_like(search)));
        }
        qb.push(match filter.sort {
            EventSort::Date => " ORDER BY e.event_date ASC NULLS LAST, e.id ASC",
            EventSort::Popularity => " ORDER BY r.score DESC NULLS LAST, e.id ASC",
            EventSort::Newest => " ORDER BY e.created_at DESC, e.id ASC",
        });
        qb.push(" LIMIT ")
            .push_bind(i64::from(filter.per_page))
            .push(" OFFSET ")
            .push_bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<EventSummaryRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(data_source)?;

        rows.into_iter().map(EventSummary::try_from).collect()
    }
}

/// Escapes `LIKE` wildcards so user search text matches literally.
fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
