//! Booking attempts and their status machine.

use chrono::{DateTime, Utc};
use common::{BookingId, CorrelationId, DateRange, IdempotencyKey, RequesterId, ResourceId};
use serde::{Deserialize, Serialize};

/// The status of a booking attempt.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed
///           └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// The saga is running.
    #[default]
    Pending,

    /// Hold and confirm both succeeded (terminal state).
    Confirmed,

    /// A step failed and the hold was released (terminal state).
    Cancelled,
}

impl BookingStatus {
    /// Returns true if the attempt can still be finished.
    pub fn can_finish(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parses the persisted representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command to book one resource for a date range.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub requester_id: RequesterId,
    pub resource_id: ResourceId,
    pub period: DateRange,
    pub request_id: IdempotencyKey,
}

impl CreateBooking {
    pub fn new(
        requester_id: RequesterId,
        resource_id: ResourceId,
        period: DateRange,
        request_id: IdempotencyKey,
    ) -> Self {
        Self {
            requester_id,
            resource_id,
            period,
            request_id,
        }
    }
}

/// One customer reservation request, one-to-one with a reservation lock on
/// the resource owner through the shared idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingAttempt {
    pub id: BookingId,
    pub request_id: IdempotencyKey,
    pub requester_id: RequesterId,
    pub resource_id: ResourceId,
    #[serde(flatten)]
    pub period: DateRange,
    pub status: BookingStatus,
    pub correlation_id: CorrelationId,
    pub created_at: DateTime<Utc>,
}

impl BookingAttempt {
    /// Starts a new attempt in `Pending` with a fresh correlation id.
    pub fn pending(cmd: CreateBooking) -> Self {
        Self {
            id: BookingId::new(),
            request_id: cmd.request_id,
            requester_id: cmd.requester_id,
            resource_id: cmd.resource_id,
            period: cmd.period,
            status: BookingStatus::Pending,
            correlation_id: CorrelationId::generate(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(BookingStatus::default(), BookingStatus::Pending);
    }

    #[test]
    fn test_only_pending_can_finish() {
        assert!(BookingStatus::Pending.can_finish());
        assert!(!BookingStatus::Confirmed.can_finish());
        assert!(!BookingStatus::Cancelled.can_finish());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(BookingStatus::Confirmed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_parse_matches_display() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::parse(&status.to_string()), Some(status));
        }
        assert_eq!(BookingStatus::parse("HELD"), None);
    }

    #[test]
    fn test_pending_attempt_wire_format() {
        let day = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let attempt = BookingAttempt::pending(CreateBooking::new(
            RequesterId::new(1),
            ResourceId::new(10),
            DateRange::new(day, day.succ_opt().unwrap()).unwrap(),
            IdempotencyKey::new("req-1").unwrap(),
        ));

        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["requestId"], "req-1");
        assert_eq!(json["requesterId"], 1);
        assert_eq!(json["resourceId"], 10);
        assert_eq!(json["startDate"], "2026-04-01");
        assert_eq!(json["endDate"], "2026-04-02");
        assert_eq!(json["status"], "PENDING");
        assert_ne!(json["correlationId"], json["requestId"]);
    }
}
