use async_trait::async_trait;
use chrono::NaiveDate;
use common::{DateRange, IdempotencyKey, LockId, ResourceId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    HoldOutcome, LockStatus, LockStoreError, ReservationLock, ResourceUsage, Result,
    store::LockStore,
};

const LOCK_COLUMNS: &str =
    "id, request_id, resource_id, start_date, end_date, status, created_at, updated_at";

/// PostgreSQL-backed lock store.
///
/// Holds on one resource are serialized with a transaction-scoped advisory
/// lock keyed by the resource id, so the overlap scan and the insert see
/// the same snapshot of that resource's locks.
#[derive(Clone)]
pub struct PostgresLockStore {
    pool: PgPool,
}

impl PostgresLockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the resource owner migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations/resource_owner")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_lock(row: PgRow) -> Result<ReservationLock> {
        let request_id: String = row.try_get("request_id")?;
        let request_id = IdempotencyKey::new(request_id)
            .map_err(|e| LockStoreError::CorruptRow(e.to_string()))?;

        let start: NaiveDate = row.try_get("start_date")?;
        let end: NaiveDate = row.try_get("end_date")?;
        let period =
            DateRange::new(start, end).map_err(|e| LockStoreError::CorruptRow(e.to_string()))?;

        let status: String = row.try_get("status")?;
        let status = LockStatus::parse(&status)
            .ok_or_else(|| LockStoreError::CorruptRow(format!("unknown lock status {status}")))?;

        Ok(ReservationLock {
            id: LockId::from_uuid(row.try_get::<Uuid, _>("id")?),
            request_id,
            resource_id: ResourceId::new(row.try_get("resource_id")?),
            period,
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl LockStore for PostgresLockStore {
    async fn find_by_key(&self, key: &IdempotencyKey) -> Result<Option<ReservationLock>> {
        let row = sqlx::query(&format!(
            "SELECT {LOCK_COLUMNS} FROM reservation_locks WHERE request_id = $1"
        ))
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_lock).transpose()
    }

    async fn insert_if_available(&self, lock: ReservationLock) -> Result<HoldOutcome> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(lock.resource_id.as_i64())
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query(&format!(
            "SELECT {LOCK_COLUMNS} FROM reservation_locks WHERE request_id = $1"
        ))
        .bind(lock.request_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(row) = existing {
            tx.commit().await?;
            return Ok(HoldOutcome::Existing(Self::row_to_lock(row)?));
        }

        let conflicts = sqlx::query(&format!(
            r#"
            SELECT {LOCK_COLUMNS} FROM reservation_locks
            WHERE resource_id = $1
              AND status IN ('HELD', 'CONFIRMED')
              AND start_date <= $2
              AND end_date >= $3
            ORDER BY created_at ASC
            "#
        ))
        .bind(lock.resource_id.as_i64())
        .bind(lock.period.end())
        .bind(lock.period.start())
        .fetch_all(&mut *tx)
        .await?;
        if !conflicts.is_empty() {
            tx.rollback().await?;
            tracing::debug!(
                resource_id = %lock.resource_id,
                conflicts = conflicts.len(),
                "hold rejected by overlap scan"
            );
            let conflicts = conflicts
                .into_iter()
                .map(Self::row_to_lock)
                .collect::<Result<Vec<_>>>()?;
            return Ok(HoldOutcome::Conflict(conflicts));
        }

        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO reservation_locks ({LOCK_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (request_id) DO NOTHING
            RETURNING {LOCK_COLUMNS}
            "#
        ))
        .bind(lock.id.as_uuid())
        .bind(lock.request_id.as_str())
        .bind(lock.resource_id.as_i64())
        .bind(lock.period.start())
        .bind(lock.period.end())
        .bind(lock.status.as_str())
        .bind(lock.created_at)
        .bind(lock.updated_at)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match inserted {
            Some(row) => HoldOutcome::Inserted(Self::row_to_lock(row)?),
            None => {
                // Same key raced in through a hold on a different resource.
                let row = sqlx::query(&format!(
                    "SELECT {LOCK_COLUMNS} FROM reservation_locks WHERE request_id = $1"
                ))
                .bind(lock.request_id.as_str())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    LockStoreError::CorruptRow(format!(
                        "lock {} missing after key conflict",
                        lock.request_id
                    ))
                })?;
                HoldOutcome::Existing(Self::row_to_lock(row)?)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn transition(
        &self,
        key: &IdempotencyKey,
        from: LockStatus,
        to: LockStatus,
    ) -> Result<Option<ReservationLock>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE reservation_locks
            SET status = $3, updated_at = NOW()
            WHERE request_id = $1 AND status = $2
            RETURNING {LOCK_COLUMNS}
            "#
        ))
        .bind(key.as_str())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let lock = Self::row_to_lock(row)?;

        if to == LockStatus::Confirmed {
            sqlx::query(
                r#"
                INSERT INTO resource_usage (resource_id, times_booked)
                VALUES ($1, 1)
                ON CONFLICT (resource_id)
                DO UPDATE SET times_booked = resource_usage.times_booked + 1
                "#,
            )
            .bind(lock.resource_id.as_i64())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(lock))
    }

    async fn find_by_resource(&self, resource_id: ResourceId) -> Result<Vec<ReservationLock>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LOCK_COLUMNS} FROM reservation_locks
            WHERE resource_id = $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(resource_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_lock).collect()
    }

    async fn usage(&self, resource_id: ResourceId) -> Result<u64> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT times_booked FROM resource_usage WHERE resource_id = $1")
                .bind(resource_id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

        to_count(count.unwrap_or(0))
    }

    async fn most_booked(&self, limit: usize) -> Result<Vec<ResourceUsage>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT resource_id, times_booked FROM resource_usage
            ORDER BY times_booked DESC, resource_id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ResourceUsage> {
                Ok(ResourceUsage {
                    resource_id: ResourceId::new(row.try_get("resource_id")?),
                    times_booked: to_count(row.try_get("times_booked")?)?,
                })
            })
            .collect()
    }
}

fn to_count(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| LockStoreError::CorruptRow(format!("negative count {value}")))
}
