use async_trait::async_trait;
use chrono::NaiveDate;
use common::{BookingId, CorrelationId, DateRange, IdempotencyKey, RequesterId, ResourceId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{BookingStore, InsertOutcome, Result};
use crate::attempt::{BookingAttempt, BookingStatus};
use crate::error::BookingStoreError;

const ATTEMPT_COLUMNS: &str = "id, request_id, requester_id, resource_id, start_date, end_date, \
                               status, correlation_id, created_at";

/// PostgreSQL-backed booking store.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the booking migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations/booking")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_attempt(row: PgRow) -> Result<BookingAttempt> {
        let request_id: String = row.try_get("request_id")?;
        let request_id = IdempotencyKey::new(request_id)
            .map_err(|e| BookingStoreError::CorruptRow(e.to_string()))?;

        let start: NaiveDate = row.try_get("start_date")?;
        let end: NaiveDate = row.try_get("end_date")?;
        let period = DateRange::new(start, end)
            .map_err(|e| BookingStoreError::CorruptRow(e.to_string()))?;

        let status: String = row.try_get("status")?;
        let status = BookingStatus::parse(&status).ok_or_else(|| {
            BookingStoreError::CorruptRow(format!("unknown booking status {status}"))
        })?;

        Ok(BookingAttempt {
            id: BookingId::from_uuid(row.try_get::<Uuid, _>("id")?),
            request_id,
            requester_id: RequesterId::new(row.try_get("requester_id")?),
            resource_id: ResourceId::new(row.try_get("resource_id")?),
            period,
            status,
            correlation_id: CorrelationId::from_header(row.try_get::<String, _>("correlation_id")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn find_by_key(&self, key: &IdempotencyKey) -> Result<Option<BookingAttempt>> {
        let row = sqlx::query(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM booking_attempts WHERE request_id = $1"
        ))
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_attempt).transpose()
    }

    async fn insert_if_absent(&self, attempt: BookingAttempt) -> Result<InsertOutcome> {
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO booking_attempts ({ATTEMPT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (request_id) DO NOTHING
            RETURNING {ATTEMPT_COLUMNS}
            "#
        ))
        .bind(attempt.id.as_uuid())
        .bind(attempt.request_id.as_str())
        .bind(attempt.requester_id.as_i64())
        .bind(attempt.resource_id.as_i64())
        .bind(attempt.period.start())
        .bind(attempt.period.end())
        .bind(attempt.status.as_str())
        .bind(attempt.correlation_id.as_str())
        .bind(attempt.created_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Inserted(Self::row_to_attempt(row)?));
        }

        let existing = self.find_by_key(&attempt.request_id).await?.ok_or_else(|| {
            BookingStoreError::CorruptRow(format!(
                "attempt {} missing after key conflict",
                attempt.request_id
            ))
        })?;
        Ok(InsertOutcome::Existing(existing))
    }

    async fn finish(
        &self,
        key: &IdempotencyKey,
        status: BookingStatus,
    ) -> Result<Option<BookingAttempt>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE booking_attempts
            SET status = $2
            WHERE request_id = $1 AND status = 'PENDING'
            RETURNING {ATTEMPT_COLUMNS}
            "#
        ))
        .bind(key.as_str())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_attempt(row).map(Some),
            None => self.find_by_key(key).await,
        }
    }

    async fn find_by_requester(&self, requester_id: RequesterId) -> Result<Vec<BookingAttempt>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS} FROM booking_attempts
            WHERE requester_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(requester_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_attempt).collect()
    }
}
