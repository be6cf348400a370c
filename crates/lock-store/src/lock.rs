use chrono::{DateTime, Utc};
use common::{DateRange, IdempotencyKey, LockId, ResourceId};
use serde::{Deserialize, Serialize};

/// Status of a reservation lock.
///
/// State transitions:
/// ```text
/// Held ──┬──► Confirmed
///        └──► Released
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockStatus {
    /// Provisional claim awaiting confirmation.
    Held,

    /// The booking went through (terminal).
    Confirmed,

    /// The claim was given back (terminal).
    Released,
}

impl LockStatus {
    /// Returns true if a lock in this status blocks overlapping holds.
    pub fn blocks_availability(&self) -> bool {
        matches!(self, LockStatus::Held | LockStatus::Confirmed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockStatus::Held => "HELD",
            LockStatus::Confirmed => "CONFIRMED",
            LockStatus::Released => "RELEASED",
        }
    }

    /// Parses the persisted representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "HELD" => Some(LockStatus::Held),
            "CONFIRMED" => Some(LockStatus::Confirmed),
            "RELEASED" => Some(LockStatus::Released),
            _ => None,
        }
    }
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exclusive claim on a resource for a date interval.
///
/// This is also the JSON body returned by the hold/confirm/release endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationLock {
    pub id: LockId,
    pub request_id: IdempotencyKey,
    pub resource_id: ResourceId,
    #[serde(flatten)]
    pub period: DateRange,
    pub status: LockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReservationLock {
    /// Builds a fresh lock in `Held`.
    pub fn held(request_id: IdempotencyKey, resource_id: ResourceId, period: DateRange) -> Self {
        let now = Utc::now();
        Self {
            id: LockId::new(),
            request_id,
            resource_id,
            period,
            status: LockStatus::Held,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if this lock prevents a hold of `period` on the same resource.
    pub fn blocks(&self, period: &DateRange) -> bool {
        self.status.blocks_availability() && self.period.overlaps(period)
    }
}

/// Confirmed-booking counter for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub resource_id: ResourceId,
    pub times_booked: u64,
}
